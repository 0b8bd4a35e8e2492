//! Core game logic for the 24 card puzzle. Keep this crate free of IO.

pub mod cards;
pub mod config;
pub mod judge;
pub mod picker;
pub mod puzzle;
pub mod rng;
pub mod sandbox;
pub mod validate;

pub use cards::*;
pub use config::*;
pub use judge::*;
pub use picker::*;
pub use puzzle::*;
pub use rng::*;
pub use sandbox::{
    evaluate, extract_literals, preprocess, substitute_ranks, BinaryOp, Expr, Formula, SandboxError,
    UnaryOp,
};
pub use validate::*;
