//! This crate provides the core logic of the AliCloud `ram_policy` resource:
//! - Packing the statements of attached RAM policies into combined policies under the RAM
//!   document size limit
//! - Creating, attaching, refreshing, replacing and removing those combined policies
//! - Retrying RAM API calls that fail with transient error codes
//!

pub mod commands;
mod error;
pub mod packing;
pub mod ram;
mod types;

// Re-exports for a small, focused public API
pub use commands::{RamPolicyConfig, RamPolicyService};
pub use error::{RamPolicyError, RamPolicyResult};
pub use packing::{
    build_combined_policies, pack, CombinedPolicy, PackedGroup, SourcePolicy, MAX_LENGTH,
    OVERHEAD_RESERVE,
};
pub use ram::client::{AttachedPolicy, PolicyEntities, PolicyRecord, RamApi};
pub use ram::retry::RetryPolicy;
pub use ram::{ApiError, ApiResult, ErrorClass, PolicyType};
pub use types::{
    AttachmentPhase, Outcome, PolicyDetail, RamPolicyPlan, RamPolicyState, Warning, WarningKind,
};
