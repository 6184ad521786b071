//! Combined policy packing (deterministic JSON generation)
//!
//! RAM rejects policy documents longer than [`MAX_LENGTH`] characters. The packer concatenates
//! the statements of the attached policies, in order, into as few documents as a greedy
//! left-to-right fill allows, never splitting one source policy across documents.

pub mod packer;

pub use packer::{
    build_combined_policies, pack, pack_fragments, CombinedPolicy, PackedGroup, SourcePolicy,
};

/// Maximum length of a RAM policy document.
pub const MAX_LENGTH: usize = 6144;

/// Characters reserved for the `{"Version":"1","Statement":[` ... `]}` wrapper.
pub const OVERHEAD_RESERVE: usize = 30;

/// Policy language version written into every combined policy.
pub const POLICY_VERSION: &str = "1";

/// Room left for statement content in a single combined policy.
pub const STATEMENT_BUDGET: usize = MAX_LENGTH - OVERHEAD_RESERVE;

/// Wrap comma-joined statement content into a policy document.
pub fn wrap_statements(content: &str) -> String {
    format!(
        r#"{{"Version":"{}","Statement":[{}]}}"#,
        POLICY_VERSION, content
    )
}
