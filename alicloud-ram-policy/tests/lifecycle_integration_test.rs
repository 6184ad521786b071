//! End-to-end lifecycle of a `ram_policy` resource against the in-memory RAM API.

use alicloud_ram_policy::ram::memory::{InMemoryRamClient, OP_GET_POLICY};
use alicloud_ram_policy::{
    ApiError, AttachmentPhase, PolicyType, RamPolicyConfig, RamPolicyError, RamPolicyPlan,
    RamPolicyService, RetryPolicy, WarningKind, MAX_LENGTH,
};
use serde_json::{json, Value};

/// A policy with one statement per action, each roughly `width` characters long.
fn policy(service: &str, actions: usize, width: usize) -> String {
    let statements: Vec<Value> = (0..actions)
        .map(|i| {
            json!({
                "Effect": "Allow",
                "Action": [format!("{service}:Action{i}")],
                "Resource": [format!("acs:{service}:*:*:{}", "r".repeat(width))]
            })
        })
        .collect();
    serde_json::to_string_pretty(&json!({ "Version": "1", "Statement": statements }))
        .expect("policy serializes")
}

fn client() -> InMemoryRamClient {
    InMemoryRamClient::new()
        .with_policy(PolicyType::Custom, "oss-team", &policy("oss", 10, 350))
        .with_policy(PolicyType::Custom, "ecs-team", &policy("ecs", 10, 350))
        .with_policy(PolicyType::Custom, "rds-team", &policy("rds", 10, 350))
        .with_policy(PolicyType::System, "AliyunLogReadOnlyAccess", &policy("log", 1, 10))
}

fn plan(user: &str, names: &[&str]) -> RamPolicyPlan {
    RamPolicyPlan::new(user, names.iter().map(|name| name.to_string()).collect())
}

fn statements(document: &str) -> Vec<Value> {
    let parsed: Value = serde_json::from_str(document).expect("valid document");
    parsed["Statement"].as_array().cloned().unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn test_full_lifecycle() {
    let _ = env_logger::builder().is_test(true).try_init();
    let service = RamPolicyService::new(client());
    let desired = plan("alice", &["oss-team", "ecs-team", "rds-team"]);

    let created = service.create(&desired).await.expect("create succeeds");
    let names: Vec<&str> = created.state.policy_names().collect();
    assert_eq!(names, vec!["alice-1", "alice-2", "alice-3"]);
    assert_eq!(
        service.client().attached_policy_names("alice"),
        vec!["alice-1", "alice-2", "alice-3"]
    );

    let refreshed = service.read(&created.state).await.expect("read succeeds");
    assert!(refreshed.warnings.is_empty());
    assert_eq!(refreshed.state, created.state);

    let updated = service
        .update(
            &refreshed.state,
            &plan("alice", &["oss-team", "AliyunLogReadOnlyAccess"]),
        )
        .await
        .expect("update succeeds");
    let names: Vec<&str> = updated.state.policy_names().collect();
    assert_eq!(names, vec!["alice-1"]);
    assert_eq!(
        service.client().custom_policy_names(),
        vec!["alice-1", "ecs-team", "oss-team", "rds-team"]
    );

    service.delete(&updated.state).await.expect("delete succeeds");
    assert!(service.client().attached_policy_names("alice").is_empty());
    assert_eq!(
        service.client().custom_policy_names(),
        vec!["ecs-team", "oss-team", "rds-team"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_combined_policies_conserve_statements() {
    let service = RamPolicyService::new(client());
    let desired = plan(
        "bob",
        &["oss-team", "AliyunLogReadOnlyAccess", "ecs-team", "rds-team"],
    );

    let outcome = service.create(&desired).await.expect("create succeeds");

    let mut expected = Vec::new();
    for name in &desired.attached_policies {
        let document = service
            .client()
            .policy_document(PolicyType::Custom, name)
            .or_else(|| service.client().policy_document(PolicyType::System, name))
            .expect("source exists");
        expected.extend(statements(&document));
    }
    let actual: Vec<Value> = outcome
        .state
        .policies
        .iter()
        .flat_map(|policy| statements(&policy.policy_document))
        .collect();

    assert_eq!(actual, expected);
    for policy in &outcome.state.policies {
        assert!(policy.policy_document.len() <= MAX_LENGTH);
        assert!(!policy.policy_document.contains(' '));
    }
}

#[tokio::test(start_paused = true)]
async fn test_drift_is_reported_and_repaired() {
    let service = RamPolicyService::new(client());
    let desired = plan("carol", &["oss-team", "ecs-team", "rds-team"]);
    let created = service.create(&desired).await.expect("create succeeds");
    assert_eq!(created.state.policies.len(), 3);

    service.client().remove_policy_out_of_band("carol-2");

    let refreshed = service.read(&created.state).await.expect("read succeeds");
    assert!(refreshed.has_drift());
    assert_eq!(refreshed.warnings[0].kind, WarningKind::Drift);
    assert_eq!(refreshed.state.attached_policies, None);
    assert_eq!(refreshed.state.phase(), AttachmentPhase::Reconciling);
    assert_eq!(refreshed.state.policies.len(), 2);

    let repaired = service
        .update(&refreshed.state, &desired)
        .await
        .expect("update succeeds");
    assert!(repaired.warnings.is_empty());
    assert_eq!(repaired.state.phase(), AttachmentPhase::Attached);
    assert_eq!(repaired.state.policies, created.state.policies);
}

#[tokio::test(start_paused = true)]
async fn test_import_then_apply() {
    let service = RamPolicyService::new(client());
    let desired = plan("dave", &["oss-team", "ecs-team"]);
    let created = service.create(&desired).await.expect("create succeeds");

    let imported = service.import("dave-1, dave-2").await.expect("import succeeds");
    assert_eq!(imported.state.user_name, "dave");
    assert_eq!(imported.state.policies, created.state.policies);
    assert_eq!(imported.warnings[0].kind, WarningKind::ImportIncomplete);

    let applied = service
        .update(&imported.state, &desired)
        .await
        .expect("update succeeds");
    assert_eq!(applied.state, created.state);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_gives_up_after_retry_ceiling() {
    let client = client();
    client.fail_next(OP_GET_POLICY, ApiError::new("Throttling.User", "slow down"), usize::MAX);
    let config = RamPolicyConfig {
        retry: RetryPolicy::new().with_max_elapsed_ms(2_000),
        ..RamPolicyConfig::default()
    };
    let service = RamPolicyService::with_config(client, config);

    let err = service
        .create(&plan("erin", &["oss-team"]))
        .await
        .expect_err("create fails");
    assert!(matches!(err, RamPolicyError::TransientApi { .. }));
    assert!(service.client().custom_policy_names().iter().all(|n| !n.starts_with("erin")));
}

#[tokio::test(start_paused = true)]
async fn test_oversized_source_is_rejected_before_any_change() {
    let client = client().with_policy(PolicyType::Custom, "huge", &policy("oss", 1, 7000));
    let service = RamPolicyService::new(client);

    let err = service
        .create(&plan("frank", &["oss-team", "huge"]))
        .await
        .expect_err("create fails");
    assert!(matches!(err, RamPolicyError::OversizedPolicy { ref policy_name, .. } if policy_name == "huge"));
    assert_eq!(
        service.client().custom_policy_names(),
        vec!["ecs-team", "huge", "oss-team", "rds-team"]
    );
}
