//! Detach and delete logic for the RAM policy service

use log::{debug, info};

use super::service::log_transition;
use crate::error::RamPolicyResult;
use crate::ram::client::RamApi;
use crate::ram::PolicyType;
use crate::types::{AttachmentPhase, RamPolicyState};

impl<C: RamApi> super::service::RamPolicyService<C> {
    /// Detach every recorded combined policy from the user and delete it.
    ///
    /// Policies or attachments that are already gone count as removed. A failed detach skips
    /// the delete of that policy and aborts the operation.
    pub async fn delete(&self, state: &RamPolicyState) -> RamPolicyResult<()> {
        log_transition(&state.user_name, state.phase(), AttachmentPhase::Detaching);

        let client = &self.client;
        let retry = &self.config.teardown_retry;
        let user_name = state.user_name.as_str();

        for name in state.policy_names() {
            let detached = retry
                .run("DetachPolicyFromUser", || async move {
                    match client
                        .detach_policy_from_user(PolicyType::Custom, name, user_name)
                        .await
                    {
                        Err(err) if err.is_not_found() => Ok(false),
                        other => other.map(|()| true),
                    }
                })
                .await?;
            if !detached {
                debug!("Combined policy '{}' was not attached to '{}'", name, user_name);
            }

            let deleted = retry
                .run("DeletePolicy", || async move {
                    match client.delete_policy(name).await {
                        Err(err) if err.is_not_found() => Ok(false),
                        other => other.map(|()| true),
                    }
                })
                .await?;
            if !deleted {
                debug!("Combined policy '{}' was already deleted", name);
            }
        }

        log_transition(&state.user_name, AttachmentPhase::Detaching, AttachmentPhase::Absent);
        info!(
            "Removed {} combined policies of user '{}'",
            state.policies.len(),
            state.user_name
        );
        Ok(())
    }
}
