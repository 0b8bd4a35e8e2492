use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub target: f64,
    pub tolerance: f64,
    pub picker: PickerConfig,
    pub limits: SandboxLimits,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            target: 24.0,
            tolerance: 1e-9,
            picker: PickerConfig::default(),
            limits: SandboxLimits::default(),
        }
    }
}

impl GameConfig {
    pub fn hits_target(&self, value: f64) -> bool {
        (value - self.target).abs() < self.tolerance
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PickerConfig {
    /// How many served value-multisets are remembered for repeat avoidance.
    pub recent_window: usize,
    /// Long-run share of unsolvable puzzles served at medium difficulty.
    pub medium_no_solution_target: f64,
    /// Slope of the steering rule; see `PuzzlePicker::no_solution_bias`.
    pub steering_gain: f64,
    pub seed: Option<u64>,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            recent_window: 60,
            medium_no_solution_target: 0.10,
            steering_gain: 4.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SandboxLimits {
    pub max_input_len: usize,
    pub max_exponent: f64,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_input_len: 200,
            max_exponent: 1000.0,
        }
    }
}
