//! Error types for the combined policy lifecycle.

use thiserror::Error;

use crate::ram::{ApiError, ErrorClass};

#[derive(Error, Debug)]
pub enum RamPolicyError {
    /// A transient RAM error that kept recurring until the retry ceiling was reached.
    #[error("{operation} failed after {attempts} attempts: {source}")]
    TransientApi {
        operation: String,
        attempts: u32,
        source: ApiError,
    },

    #[error("{operation} failed: {source}")]
    PermanentApi { operation: String, source: ApiError },

    #[error("Failed to parse policy document of '{policy_name}': {source}")]
    Parse {
        policy_name: String,
        source: serde_json::Error,
    },

    #[error("Policy document of '{policy_name}' is invalid: {reason}")]
    Schema { policy_name: String, reason: String },

    #[error("The {0} policy not found.")]
    PolicyNotFound(String),

    #[error("Statements of policy '{policy_name}' take {length} characters, more than the {budget} available in a combined policy")]
    OversizedPolicy {
        policy_name: String,
        length: usize,
        budget: usize,
    },

    #[error("None of the attached policies contain a statement")]
    NoStatements,

    #[error("Invalid import id '{0}': expected comma-separated combined policy names")]
    InvalidImportId(String),

    #[error("None of the policies '{0}' is attached to a user")]
    ImportUserNotFound(String),
}

impl RamPolicyError {
    pub fn schema(policy_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            policy_name: policy_name.into(),
            reason: reason.into(),
        }
    }

    /// The RAM error behind this failure, if it came from the API.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::TransientApi { source, .. } | Self::PermanentApi { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn error_class(&self) -> Option<ErrorClass> {
        match self {
            Self::TransientApi { .. } => Some(ErrorClass::Transient),
            Self::PermanentApi { .. } => Some(ErrorClass::Permanent),
            _ => None,
        }
    }
}

pub type RamPolicyResult<T> = Result<T, RamPolicyError>;
