use thiserror::Error;

use super::config::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Atom {atom} has no van der Waals parameters (class {class:?})")]
    MissingVdwType { atom: usize, class: Option<u32> },

    #[error("Lambda {0} lies outside [0, 1]")]
    InvalidLambda(f64),

    #[error("Born radius chain-rule term for atom {atom} is not finite ({value})")]
    NonFiniteBornGradient { atom: usize, value: f64 },

    #[error("Worker thread {thread} failed: {message}")]
    WorkerFailed { thread: usize, message: String },

    #[error("Cutoff {cutoff:.3} exceeds half the narrowest cell width ({half_width:.3})")]
    CellTooSmall { cutoff: f64, half_width: f64 },

    #[error("Topology mismatch for {what}: expected {expected}, found {found}")]
    TopologyMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}
