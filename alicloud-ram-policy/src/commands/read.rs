//! Read (refresh and drift detection) for the RAM policy service

use std::collections::HashSet;

use log::warn;

use super::service::log_transition;
use crate::error::RamPolicyResult;
use crate::ram::client::{find_policy, RamApi};
use crate::ram::PolicyType;
use crate::types::{AttachmentPhase, Outcome, PolicyDetail, RamPolicyState, Warning};

impl<C: RamApi> super::service::RamPolicyService<C> {
    /// Refresh the recorded combined policies from RAM.
    ///
    /// Policies that no longer exist are dropped from the returned state. When fewer recorded
    /// policies are still attached to the user than were recorded, a drift warning is returned
    /// and `attached_policies` is cleared so the next apply rebuilds the whole set.
    pub async fn read(&self, prior: &RamPolicyState) -> RamPolicyResult<Outcome> {
        let client = &self.client;
        let user_name = prior.user_name.as_str();

        let attached = self
            .config
            .retry
            .run("ListPoliciesForUser", || async move {
                client.list_policies_for_user(user_name).await
            })
            .await?;
        let attached: HashSet<&str> = attached
            .iter()
            .filter(|policy| policy.policy_type == PolicyType::Custom)
            .map(|policy| policy.policy_name.as_str())
            .collect();

        let mut policies = Vec::with_capacity(prior.policies.len());
        let mut still_attached = 0;
        for name in prior.policy_names() {
            let record = self
                .config
                .retry
                .run("GetPolicy", || async move {
                    find_policy(client, name, PolicyType::Custom).await
                })
                .await?;

            let Some(record) = record else {
                warn!("Combined policy '{}' no longer exists", name);
                continue;
            };
            if attached.contains(name) {
                still_attached += 1;
            } else {
                warn!(
                    "Combined policy '{}' is no longer attached to user '{}'",
                    name, user_name
                );
            }
            policies.push(PolicyDetail {
                policy_name: record.policy_name,
                policy_document: record.policy_document,
            });
        }

        let mut state = RamPolicyState {
            user_name: prior.user_name.clone(),
            attached_policies: prior.attached_policies.clone(),
            policies,
        };
        let mut warnings = Vec::new();

        if still_attached != prior.policies.len() {
            warnings.push(Warning::drift(prior.policies.len(), still_attached));
            state.attached_policies = None;
            log_transition(user_name, prior.phase(), AttachmentPhase::Reconciling);
        }

        Ok(Outcome { state, warnings })
    }
}
