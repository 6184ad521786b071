//! RAM API capability consumed by the combined policy lifecycle
//!
//! Only the seven calls the lifecycle needs are modelled. A concrete implementation wraps the
//! vendor SDK client; tests use [`InMemoryRamClient`](super::memory::InMemoryRamClient).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ram::{ApiResult, PolicyType};

/// A policy as returned by `GetPolicy`, reduced to its default version document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub policy_name: String,
    pub policy_type: PolicyType,
    pub policy_document: String,
}

/// One entry of `ListPoliciesForUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedPolicy {
    pub policy_name: String,
    pub policy_type: PolicyType,
}

/// Principals a policy is attached to, as returned by `ListEntitiesForPolicy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntities {
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub roles: Vec<String>,
}

#[async_trait]
pub trait RamApi: Send + Sync {
    /// Fetch a policy and its default version document. `Ok(None)` when it does not exist.
    async fn get_policy(
        &self,
        policy_name: &str,
        policy_type: PolicyType,
    ) -> ApiResult<Option<PolicyRecord>>;

    async fn create_policy(&self, policy_name: &str, policy_document: &str) -> ApiResult<()>;

    async fn delete_policy(&self, policy_name: &str) -> ApiResult<()>;

    async fn attach_policy_to_user(
        &self,
        policy_type: PolicyType,
        policy_name: &str,
        user_name: &str,
    ) -> ApiResult<()>;

    async fn detach_policy_from_user(
        &self,
        policy_type: PolicyType,
        policy_name: &str,
        user_name: &str,
    ) -> ApiResult<()>;

    async fn list_policies_for_user(&self, user_name: &str) -> ApiResult<Vec<AttachedPolicy>>;

    async fn list_entities_for_policy(
        &self,
        policy_name: &str,
        policy_type: PolicyType,
    ) -> ApiResult<PolicyEntities>;
}

/// `get_policy` with `EntityNotExist.*` errors folded into `Ok(None)`.
///
/// Some RAM endpoints report a missing policy as an error rather than an empty result.
pub async fn find_policy<C: RamApi + ?Sized>(
    client: &C,
    policy_name: &str,
    policy_type: PolicyType,
) -> ApiResult<Option<PolicyRecord>> {
    match client.get_policy(policy_name, policy_type).await {
        Err(err) if err.is_not_found() => Ok(None),
        other => other,
    }
}

#[async_trait]
impl<T> RamApi for std::sync::Arc<T>
where
    T: RamApi + ?Sized,
{
    async fn get_policy(
        &self,
        policy_name: &str,
        policy_type: PolicyType,
    ) -> ApiResult<Option<PolicyRecord>> {
        (**self).get_policy(policy_name, policy_type).await
    }

    async fn create_policy(&self, policy_name: &str, policy_document: &str) -> ApiResult<()> {
        (**self).create_policy(policy_name, policy_document).await
    }

    async fn delete_policy(&self, policy_name: &str) -> ApiResult<()> {
        (**self).delete_policy(policy_name).await
    }

    async fn attach_policy_to_user(
        &self,
        policy_type: PolicyType,
        policy_name: &str,
        user_name: &str,
    ) -> ApiResult<()> {
        (**self)
            .attach_policy_to_user(policy_type, policy_name, user_name)
            .await
    }

    async fn detach_policy_from_user(
        &self,
        policy_type: PolicyType,
        policy_name: &str,
        user_name: &str,
    ) -> ApiResult<()> {
        (**self)
            .detach_policy_from_user(policy_type, policy_name, user_name)
            .await
    }

    async fn list_policies_for_user(&self, user_name: &str) -> ApiResult<Vec<AttachedPolicy>> {
        (**self).list_policies_for_user(user_name).await
    }

    async fn list_entities_for_policy(
        &self,
        policy_name: &str,
        policy_type: PolicyType,
    ) -> ApiResult<PolicyEntities> {
        (**self)
            .list_entities_for_policy(policy_name, policy_type)
            .await
    }
}
