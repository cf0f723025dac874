use crate::context::{HookType, Method};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PalisadeError {
    #[error("{0}")]
    Other(anyhow::Error),

    #[error("Missing proper capabilities for this action: {hook}: {path} - {method}")]
    NotAuthorized {
        hook: HookType,
        path: String,
        method: Method,
    },

    #[error("Could not authenticate caller: {0}")]
    NotAuthenticated(String),

    #[error("Caller does not hold the capabilities being granted or revoked")]
    InsufficientAuthority,

    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<anyhow::Error> for PalisadeError {
    fn from(error: anyhow::Error) -> Self {
        PalisadeError::Other(error)
    }
}
