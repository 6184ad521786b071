//! Create and update logic for the RAM policy service

use log::info;

use super::service::log_transition;
use crate::error::RamPolicyResult;
use crate::packing::CombinedPolicy;
use crate::ram::client::RamApi;
use crate::ram::PolicyType;
use crate::types::{AttachmentPhase, Outcome, PolicyDetail, RamPolicyPlan, RamPolicyState};

impl<C: RamApi> super::service::RamPolicyService<C> {
    /// Build the combined policies for `plan`, create them and attach them to the user.
    ///
    /// Policies created before a failure are not rolled back and are recorded nowhere. Running
    /// `create` again for the same plan then fails with `EntityAlreadyExists.Policy` on the
    /// first leftover `{user}-{n}` policy; pass a state naming the leftovers to
    /// [`delete`](Self::delete) before retrying.
    pub async fn create(&self, plan: &RamPolicyPlan) -> RamPolicyResult<Outcome> {
        log_transition(&plan.user_name, AttachmentPhase::Absent, AttachmentPhase::Creating);

        let combined = self.plan_combined_policies(plan).await?;
        self.create_combined_policies(&combined).await?;

        let state = RamPolicyState {
            user_name: plan.user_name.clone(),
            attached_policies: Some(plan.attached_policies.clone()),
            policies: combined.iter().map(PolicyDetail::from).collect(),
        };
        self.attach_policies_to_user(&state.user_name, &state.policies)
            .await?;

        log_transition(&plan.user_name, AttachmentPhase::Creating, AttachmentPhase::Attached);
        info!(
            "Attached {} combined policies to user '{}'",
            state.policies.len(),
            state.user_name
        );
        self.read(&state).await
    }

    /// Replace all combined policies of `prior` with ones built from `plan`.
    ///
    /// Statement boundaries move whenever any source policy changes, so nothing is reused.
    pub async fn update(
        &self,
        prior: &RamPolicyState,
        plan: &RamPolicyPlan,
    ) -> RamPolicyResult<Outcome> {
        self.delete(prior).await?;
        self.create(plan).await
    }

    pub(crate) async fn create_combined_policies(
        &self,
        combined: &[CombinedPolicy],
    ) -> RamPolicyResult<()> {
        let client = &self.client;
        for policy in combined {
            let name = policy.name.as_str();
            let document = policy.document.as_str();
            self.config
                .retry
                .run("CreatePolicy", || async move {
                    client.create_policy(name, document).await
                })
                .await?;
        }
        Ok(())
    }

    /// Attach each policy in order. The first permanent failure stops the loop; earlier
    /// attachments stay in place.
    pub async fn attach_policies_to_user(
        &self,
        user_name: &str,
        policies: &[PolicyDetail],
    ) -> RamPolicyResult<()> {
        let client = &self.client;
        for policy in policies {
            let name = policy.policy_name.as_str();
            self.config
                .retry
                .run("AttachPolicyToUser", || async move {
                    client
                        .attach_policy_to_user(PolicyType::Custom, name, user_name)
                        .await
                })
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::RamPolicyService;
    use crate::error::RamPolicyError;
    use crate::ram::memory::{InMemoryRamClient, OP_ATTACH_POLICY_TO_USER, OP_CREATE_POLICY};
    use crate::ram::{ApiError, PolicyType, ERR_THROTTLING};
    use crate::types::{AttachmentPhase, PolicyDetail, RamPolicyPlan, RamPolicyState};
    use serde_json::json;

    fn policy_document(actions: usize, prefix: &str) -> String {
        let statements: Vec<_> = (0..actions)
            .map(|i| {
                json!({
                    "Effect": "Allow",
                    "Action": format!("{prefix}:Action{i:04}{}", "x".repeat(200)),
                    "Resource": "*"
                })
            })
            .collect();
        json!({ "Version": "1", "Statement": statements }).to_string()
    }

    fn client_with_sources() -> InMemoryRamClient {
        InMemoryRamClient::new()
            .with_policy(PolicyType::Custom, "oss", &policy_document(20, "oss"))
            .with_policy(PolicyType::Custom, "ecs", &policy_document(20, "ecs"))
            .with_policy(PolicyType::System, "AliyunVPCReadOnlyAccess", &policy_document(2, "vpc"))
    }

    fn plan(names: &[&str]) -> RamPolicyPlan {
        RamPolicyPlan::new("alice", names.iter().map(|n| n.to_string()).collect())
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_attaches_combined_policies() {
        let service = RamPolicyService::new(client_with_sources());

        let outcome = service
            .create(&plan(&["oss", "ecs", "AliyunVPCReadOnlyAccess"]))
            .await
            .unwrap();

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.state.phase(), AttachmentPhase::Attached);
        let names: Vec<&str> = outcome.state.policy_names().collect();
        assert_eq!(names, vec!["alice-1", "alice-2"]);
        assert_eq!(
            service.client().attached_policy_names("alice"),
            vec!["alice-1", "alice-2"]
        );
        for detail in &outcome.state.policies {
            assert!(detail.policy_document.len() <= crate::packing::MAX_LENGTH);
            assert_eq!(
                service
                    .client()
                    .policy_document(PolicyType::Custom, &detail.policy_name)
                    .as_deref(),
                Some(detail.policy_document.as_str())
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_throttled_attach() {
        let client = client_with_sources();
        client.fail_next(OP_ATTACH_POLICY_TO_USER, ApiError::new(ERR_THROTTLING, "slow"), 2);
        let service = RamPolicyService::new(client);

        let outcome = service.create(&plan(&["oss"])).await.unwrap();
        assert_eq!(outcome.state.policies.len(), 1);
        assert_eq!(service.client().attached_policy_names("alice"), vec!["alice-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_is_not_rolled_back() {
        let client = client_with_sources();
        client.fail_for(
            OP_CREATE_POLICY,
            "alice-2",
            ApiError::new("LimitExceeded.Policy", "too many policies"),
            1,
        );
        let service = RamPolicyService::new(client);

        let err = service.create(&plan(&["oss", "ecs"])).await.unwrap_err();
        assert!(matches!(err, RamPolicyError::PermanentApi { ref operation, .. } if operation == "CreatePolicy"));
        assert_eq!(service.client().custom_policy_names(), vec!["alice-1", "ecs", "oss"]);
        assert!(service.client().attached_policy_names("alice").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_after_partial_failure_needs_cleanup() {
        let client = client_with_sources();
        client.fail_for(
            OP_CREATE_POLICY,
            "alice-2",
            ApiError::new("LimitExceeded.Policy", "too many policies"),
            1,
        );
        let service = RamPolicyService::new(client);
        let desired = plan(&["oss", "ecs"]);
        assert!(service.create(&desired).await.is_err());

        let err = service.create(&desired).await.unwrap_err();
        match err {
            RamPolicyError::PermanentApi { operation, source } => {
                assert_eq!(operation, "CreatePolicy");
                assert_eq!(source.code, "EntityAlreadyExists.Policy");
            }
            other => panic!("Expected PermanentApi, got {:?}", other),
        }

        let leftovers = RamPolicyState {
            user_name: "alice".to_string(),
            attached_policies: None,
            policies: vec![PolicyDetail {
                policy_name: "alice-1".to_string(),
                policy_document: String::new(),
            }],
        };
        service.delete(&leftovers).await.unwrap();
        let outcome = service.create(&desired).await.unwrap();
        assert_eq!(outcome.state.policies.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_failure_keeps_earlier_attachments() {
        let client = client_with_sources();
        client.fail_for(
            OP_ATTACH_POLICY_TO_USER,
            "alice-2",
            ApiError::new("EntityNotExist.User", "no such user"),
            1,
        );
        let service = RamPolicyService::new(client);

        assert!(service.create(&plan(&["oss", "ecs"])).await.is_err());
        assert_eq!(service.client().attached_policy_names("alice"), vec!["alice-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_replaces_everything() {
        let service = RamPolicyService::new(client_with_sources());
        let created = service.create(&plan(&["oss", "ecs"])).await.unwrap();
        assert_eq!(created.state.policies.len(), 2);

        let updated = service
            .update(&created.state, &plan(&["AliyunVPCReadOnlyAccess"]))
            .await
            .unwrap();

        let names: Vec<&str> = updated.state.policy_names().collect();
        assert_eq!(names, vec!["alice-1"]);
        assert_eq!(
            updated.state.attached_policies,
            Some(vec!["AliyunVPCReadOnlyAccess".to_string()])
        );
        assert_eq!(service.client().attached_policy_names("alice"), vec!["alice-1"]);
        assert_eq!(service.client().custom_policy_names(), vec!["alice-1", "ecs", "oss"]);
        assert!(service
            .client()
            .policy_document(PolicyType::Custom, "alice-1")
            .unwrap()
            .contains("vpc:Action"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_with_same_sources_reuses_names() {
        let service = RamPolicyService::new(client_with_sources());
        let sources = plan(&["oss", "ecs"]);
        let first = service.create(&sources).await.unwrap();
        let second = service.update(&first.state, &sources).await.unwrap();
        let third = service.update(&second.state, &sources).await.unwrap();

        assert_eq!(first.state, second.state);
        assert_eq!(second.state, third.state);
    }
}
