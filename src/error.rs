// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient points for operation: expected at least {expected}, got {actual}")]
    InsufficientPoints { expected: usize, actual: usize },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Missing dimension '{name}' in point view")]
    MissingDimension { name: String },

    #[error(
        "Boundary walk did not close after {steps} steps (started at cell {col}/{row}, side {side})"
    )]
    TraceDiverged {
        col: i32,
        row: i32,
        side: usize,
        steps: usize,
    },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
