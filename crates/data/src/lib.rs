//! Data loading and validation for the puzzle corpus and game config.

pub mod load;
pub mod schema;

pub use load::*;
pub use schema::*;
