use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug)]
pub enum ModelError {
    UnknownRole(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownRole(value) => {
                write!(f, "unknown person role: {value}")
            }
        }
    }
}

impl std::error::Error for ModelError {}
