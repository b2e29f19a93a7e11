use serde::{Deserialize, Serialize};

/// Coarse classification of a failed cascade step, used for logs and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Transport,
    Status,
    Decode,
    NotAvailable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Transport => "transport",
            ErrorCode::Status => "status",
            ErrorCode::Decode => "decode",
            ErrorCode::NotAvailable => "not_available",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    pub code: ErrorCode,
    pub message: String,
}

impl StepError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
