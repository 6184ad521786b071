//! Import of existing combined policies

use log::warn;

use crate::error::{RamPolicyError, RamPolicyResult};
use crate::ram::client::{find_policy, PolicyEntities, RamApi};
use crate::ram::policy_naming::parse_import_id;
use crate::ram::PolicyType;
use crate::types::{Outcome, PolicyDetail, RamPolicyState, Warning};

impl<C: RamApi> super::service::RamPolicyService<C> {
    /// Rebuild state from comma-separated combined policy names.
    ///
    /// The user is the first one found attached to any of the policies. The source policy
    /// list cannot be recovered, so `attached_policies` stays unset and a warning says so.
    pub async fn import(&self, id: &str) -> RamPolicyResult<Outcome> {
        let names = parse_import_id(id);
        if names.is_empty() {
            return Err(RamPolicyError::InvalidImportId(id.to_string()));
        }

        let client = &self.client;
        let mut policies = Vec::with_capacity(names.len());
        let mut user_name: Option<String> = None;

        for name in &names {
            let name = name.as_str();
            let record = self
                .config
                .retry
                .run("GetPolicy", || async move {
                    find_policy(client, name, PolicyType::Custom).await
                })
                .await?;

            let Some(record) = record else {
                warn!("Combined policy '{}' not found, skipping it", name);
                continue;
            };

            let entities: PolicyEntities = self
                .config
                .retry
                .run("ListEntitiesForPolicy", || async move {
                    client.list_entities_for_policy(name, PolicyType::Custom).await
                })
                .await?;
            if user_name.is_none() {
                user_name = entities.users.into_iter().next();
            }

            policies.push(PolicyDetail {
                policy_name: record.policy_name,
                policy_document: record.policy_document,
            });
        }

        if policies.is_empty() {
            return Err(RamPolicyError::PolicyNotFound(names.join(",")));
        }
        let user_name = user_name.ok_or_else(|| RamPolicyError::ImportUserNotFound(names.join(",")))?;

        Ok(Outcome {
            state: RamPolicyState {
                user_name,
                attached_policies: None,
                policies,
            },
            warnings: vec![Warning::import_incomplete()],
        })
    }
}
