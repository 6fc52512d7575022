use crate::CliError;
use std::fmt::{Display, Formatter};

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::BadArgs(message) => write!(f, "argument error: {}", message),
            CliError::Io { path, source } => {
                write!(f, "could not open '{}': {}", path, source)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::BadArgs(_) => None,
            CliError::Io { source, .. } => Some(source),
        }
    }
}
