//! State model of the `ram_policy` resource.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::packing::CombinedPolicy;

/// Desired configuration: the policies to combine and the user to attach them to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamPolicyPlan {
    pub user_name: String,
    pub attached_policies: Vec<String>,
}

impl RamPolicyPlan {
    pub fn new(user_name: impl Into<String>, attached_policies: Vec<String>) -> Self {
        Self {
            user_name: user_name.into(),
            attached_policies,
        }
    }
}

/// One combined policy as recorded in state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDetail {
    pub policy_name: String,
    pub policy_document: String,
}

impl From<&CombinedPolicy> for PolicyDetail {
    fn from(policy: &CombinedPolicy) -> Self {
        Self {
            policy_name: policy.name.clone(),
            policy_document: policy.document.clone(),
        }
    }
}

/// Recorded state of the resource.
///
/// `attached_policies` is `None` when the recorded combined policies no longer match what is
/// attached to the user, or after an import; the next apply then rebuilds everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamPolicyState {
    pub user_name: String,
    pub attached_policies: Option<Vec<String>>,
    pub policies: Vec<PolicyDetail>,
}

impl RamPolicyState {
    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.policies.iter().map(|p| p.policy_name.as_str())
    }

    pub fn phase(&self) -> AttachmentPhase {
        if self.attached_policies.is_some() {
            AttachmentPhase::Attached
        } else {
            AttachmentPhase::Reconciling
        }
    }
}

/// Lifecycle of the combined policies of one user.
///
/// `Absent -> Creating -> Attached -> (Reconciling <-> Attached) -> Detaching -> Absent`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentPhase {
    Absent,
    Creating,
    Attached,
    Reconciling,
    Detaching,
}

impl fmt::Display for AttachmentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttachmentPhase::Absent => "absent",
            AttachmentPhase::Creating => "creating",
            AttachmentPhase::Attached => "attached",
            AttachmentPhase::Reconciling => "reconciling",
            AttachmentPhase::Detaching => "detaching",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Recorded combined policies are missing or detached.
    Drift,
    /// `attached_policies` cannot be recovered on import.
    ImportIncomplete,
}

/// A non-fatal condition reported alongside a successful operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub summary: String,
    pub detail: String,
}

impl Warning {
    pub fn drift(recorded: usize, found: usize) -> Self {
        Self {
            kind: WarningKind::Drift,
            summary: "Combined policies not found.".to_string(),
            detail: format!(
                "Expected {recorded} combined policies attached to the user but found {found}. \
                 They may have been deleted or detached outside of Terraform; the next apply recreates them."
            ),
        }
    }

    pub fn import_incomplete() -> Self {
        Self {
            kind: WarningKind::ImportIncomplete,
            summary: "Unable to Set the attached_policies Attribute".to_string(),
            detail: "After running terraform import, Terraform will not automatically set the attached_policies attribute. \
                     Run terraform apply to set it according to your configuration."
                .to_string(),
        }
    }
}

/// A state together with the warnings produced while computing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub state: RamPolicyState,
    pub warnings: Vec<Warning>,
}

impl Outcome {
    pub fn has_drift(&self) -> bool {
        self.warnings.iter().any(|w| w.kind == WarningKind::Drift)
    }
}
