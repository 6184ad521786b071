//! RAM API integration: client capability trait, error classification, retry policy, policy naming.

pub mod client;
#[cfg(any(test, feature = "integ-test"))]
pub mod memory;
pub mod policy_naming;
pub mod retry;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ERR_CLOSE_DNS_SLB_FAILED: &str = "CloseDnsSlbFailed";
pub const ERR_DISABLE_DNS_SLB: &str = "DisableDNSSLB";
pub const ERR_ENABLE_DNS_SLB_FAILED: &str = "EnableDnsSlbFailed";
pub const ERR_DNS_SYSTEM_BUSYNESS: &str = "DnsSystemBusyness";
pub const ERR_SERVICE_UNAVAILABLE: &str = "ServiceUnavailable";
pub const ERR_THROTTLING_USER: &str = "Throttling.User";
pub const ERR_THROTTLING_API: &str = "Throttling.API";
pub const ERR_THROTTLING: &str = "Throttling";
pub const ERR_UNKNOWN_ERROR: &str = "UnknownError";
pub const ERR_INTERNAL_ERROR: &str = "InternalError";
/// Gateway timeout reported by some backends. Not retried.
pub const ERR_BACKEND_TIMEOUT: &str = "D504TO";

/// Error codes the RAM API may return for conditions that clear up on their own.
const RETRYABLE_CODES: &[&str] = &[
    ERR_CLOSE_DNS_SLB_FAILED,
    ERR_DISABLE_DNS_SLB,
    ERR_ENABLE_DNS_SLB_FAILED,
    ERR_DNS_SYSTEM_BUSYNESS,
    ERR_SERVICE_UNAVAILABLE,
    ERR_THROTTLING_USER,
    ERR_THROTTLING_API,
    ERR_THROTTLING,
    ERR_UNKNOWN_ERROR,
    ERR_INTERNAL_ERROR,
];

/// Returns true when an API error code is known to be transient.
pub fn is_able_to_retry(code: &str) -> bool {
    RETRYABLE_CODES.contains(&code)
}

/// Whether a failed call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

/// An error reported by the RAM API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn class(&self) -> ErrorClass {
        if is_able_to_retry(&self.code) {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// `EntityNotExist.*`: the policy, user or attachment is already gone.
    pub fn is_not_found(&self) -> bool {
        self.code.starts_with("EntityNotExist")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// RAM distinguishes customer-managed policies from the built-in ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    Custom,
    System,
}

impl PolicyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyType::Custom => "Custom",
            PolicyType::System => "System",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
