//! Commands module - service layer for the RAM combined policy resource

mod create;
mod delete;
mod import;
mod read;
pub(crate) mod service;
mod sources;

pub use service::{RamPolicyConfig, RamPolicyService};
