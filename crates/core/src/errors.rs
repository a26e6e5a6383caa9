use thiserror::Error;

use crate::config::ConfigError;
use crate::currency::UnsupportedCurrency;
use crate::domain::policy::PolicyError;
use crate::loader::LoadError;

/// The only failures that abort an evaluation. Shortfalls, missing rates and
/// unmatched amounts are reported inside the result instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Currency(#[from] UnsupportedCurrency),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } | Self::Internal { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

const UNASSIGNED_CORRELATION_ID: &str = "unassigned";

impl ApplicationError {
    /// Bad caller input, as opposed to broken configuration or data.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::Currency(_))
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let message = self.to_string();
        let correlation_id = correlation_id.into();
        if self.is_client_error() {
            InterfaceError::BadRequest { message, correlation_id }
        } else {
            InterfaceError::Internal { message, correlation_id }
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        value.into_interface(UNASSIGNED_CORRELATION_ID)
    }
}
