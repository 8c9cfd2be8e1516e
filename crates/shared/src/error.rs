use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidStep,
    InvalidStage,
    InvalidSpeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Contract violations raised by the catalog, the resolvers and speed control.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum VisualizerError {
    #[error("step {step} is outside 0..{total}")]
    InvalidStep { step: usize, total: usize },
    #[error("stage {stage} is outside 0..9")]
    InvalidStage { stage: u8 },
    #[error("speed {value} must be a finite value within {min}..={max}")]
    InvalidSpeed { value: f64, min: f64, max: f64 },
}

impl VisualizerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VisualizerError::InvalidStep { .. } => ErrorCode::InvalidStep,
            VisualizerError::InvalidStage { .. } => ErrorCode::InvalidStage,
            VisualizerError::InvalidSpeed { .. } => ErrorCode::InvalidSpeed,
        }
    }
}

impl From<VisualizerError> for ApiError {
    fn from(value: VisualizerError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}
