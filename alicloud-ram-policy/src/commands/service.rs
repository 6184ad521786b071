//! RAM Policy Service Layer
//!
//! The service holds a RAM API client and the retry configuration, and provides the resource
//! operations (create, read, update, delete, import) used by the provider adapter.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::ram::client::RamApi;
use crate::ram::retry::RetryPolicy;
use crate::types::AttachmentPhase;

/// Retry settings of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RamPolicyConfig {
    /// Used for lookups, create and attach calls.
    pub retry: RetryPolicy,
    /// Used for detach and delete calls.
    pub teardown_retry: RetryPolicy,
}

impl Default for RamPolicyConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            teardown_retry: RetryPolicy::teardown(),
        }
    }
}

/// Manages the combined policies of one `ram_policy` resource through a [`RamApi`].
pub struct RamPolicyService<C> {
    pub(crate) client: C,
    pub(crate) config: RamPolicyConfig,
}

impl<C: RamApi> RamPolicyService<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, RamPolicyConfig::default())
    }

    pub fn with_config(client: C, config: RamPolicyConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &RamPolicyConfig {
        &self.config
    }

    // create() and update() are in create.rs
    // read() is in read.rs
    // delete() is in delete.rs
    // import() is in import.rs
}

pub(crate) fn log_transition(user_name: &str, from: AttachmentPhase, to: AttachmentPhase) {
    debug!("Combined policies of '{}': {} -> {}", user_name, from, to);
}
