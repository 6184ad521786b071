//! Lookup of the attached source policies

use log::{debug, info};

use crate::error::{RamPolicyError, RamPolicyResult};
use crate::packing::{build_combined_policies, CombinedPolicy, SourcePolicy};
use crate::ram::client::{find_policy, RamApi};
use crate::ram::PolicyType;
use crate::types::RamPolicyPlan;

impl<C: RamApi> super::service::RamPolicyService<C> {
    /// Fetch one source policy, trying the custom policy first and the system policy second.
    pub async fn fetch_source_policy(&self, policy_name: &str) -> RamPolicyResult<SourcePolicy> {
        let client = &self.client;
        let name = policy_name.trim();

        let record = self
            .config
            .retry
            .run("GetPolicy", || async move {
                match find_policy(client, name, PolicyType::Custom).await {
                    Ok(Some(record)) => return Ok(Some(record)),
                    Ok(None) => {}
                    Err(err) if err.is_transient() => return Err(err),
                    Err(err) => {
                        debug!("Custom policy lookup of '{}' failed ({}), trying System", name, err);
                    }
                }
                find_policy(client, name, PolicyType::System).await
            })
            .await?
            .ok_or_else(|| RamPolicyError::PolicyNotFound(name.to_string()))?;

        debug!(
            "Fetched {} policy '{}' ({} characters)",
            record.policy_type,
            record.policy_name,
            record.policy_document.len()
        );
        SourcePolicy::from_document(record.policy_name, &record.policy_document)
    }

    /// Fetch every source policy of `names`, in order. The first failure aborts.
    pub async fn fetch_source_policies(
        &self,
        names: &[String],
    ) -> RamPolicyResult<Vec<SourcePolicy>> {
        let mut sources = Vec::with_capacity(names.len());
        for name in names {
            sources.push(self.fetch_source_policy(name).await?);
        }
        Ok(sources)
    }

    /// Compute the combined policies for `plan` without changing anything.
    pub async fn plan_combined_policies(
        &self,
        plan: &RamPolicyPlan,
    ) -> RamPolicyResult<Vec<CombinedPolicy>> {
        let sources = self.fetch_source_policies(&plan.attached_policies).await?;
        let combined = build_combined_policies(&plan.user_name, &sources)?;
        info!(
            "Combining {} policies into {} policies for user '{}'",
            sources.len(),
            combined.len(),
            plan.user_name
        );
        Ok(combined)
    }
}
