use std::fmt::{self, Display};

/// Errors raised by model constructors and wire-code parsers.
#[derive(Debug)]
pub enum ModelError {
    InvalidCode(String),
    InvalidTarget(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidCode(msg) => write!(f, "invalid code: {msg}"),
            ModelError::InvalidTarget(msg) => {
                write!(f, "invalid target: {msg}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
