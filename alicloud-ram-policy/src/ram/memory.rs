//! In-memory RAM API with scripted failures, for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::packing::MAX_LENGTH;
use crate::ram::client::{AttachedPolicy, PolicyEntities, PolicyRecord, RamApi};
use crate::ram::{ApiError, ApiResult, PolicyType};

pub const OP_GET_POLICY: &str = "GetPolicy";
pub const OP_CREATE_POLICY: &str = "CreatePolicy";
pub const OP_DELETE_POLICY: &str = "DeletePolicy";
pub const OP_ATTACH_POLICY_TO_USER: &str = "AttachPolicyToUser";
pub const OP_DETACH_POLICY_FROM_USER: &str = "DetachPolicyFromUser";
pub const OP_LIST_POLICIES_FOR_USER: &str = "ListPoliciesForUser";
pub const OP_LIST_ENTITIES_FOR_POLICY: &str = "ListEntitiesForPolicy";

#[derive(Debug)]
struct Fault {
    operation: &'static str,
    target: Option<String>,
    error: ApiError,
    remaining: usize,
}

#[derive(Debug, Default)]
struct Inner {
    policies: BTreeMap<(PolicyType, String), String>,
    attachments: HashMap<String, Vec<(PolicyType, String)>>,
    faults: Vec<Fault>,
    calls: Vec<String>,
}

impl Inner {
    /// Record the call and return the scripted failure for it, if any.
    fn enter(&mut self, operation: &'static str, target: &str) -> ApiResult<()> {
        self.calls.push(format!("{operation} {target}"));

        let fault = self.faults.iter_mut().find(|fault| {
            fault.operation == operation
                && fault.remaining > 0
                && fault.target.as_deref().map_or(true, |t| t == target)
        });
        match fault {
            Some(fault) => {
                fault.remaining -= 1;
                Err(fault.error.clone())
            }
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRamClient {
    inner: Mutex<Inner>,
}

impl InMemoryRamClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn with_policy(self, policy_type: PolicyType, name: &str, document: &str) -> Self {
        self.insert_policy(policy_type, name, document);
        self
    }

    pub fn insert_policy(&self, policy_type: PolicyType, name: &str, document: &str) {
        self.lock()
            .policies
            .insert((policy_type, name.to_string()), document.to_string());
    }

    /// Delete a custom policy behind the manager's back, detaching it from everyone first.
    pub fn remove_policy_out_of_band(&self, name: &str) {
        let mut inner = self.lock();
        inner
            .policies
            .remove(&(PolicyType::Custom, name.to_string()));
        for attached in inner.attachments.values_mut() {
            attached.retain(|(t, n)| !(*t == PolicyType::Custom && n == name));
        }
    }

    /// Detach a custom policy from a user behind the manager's back.
    pub fn detach_out_of_band(&self, user_name: &str, name: &str) {
        if let Some(attached) = self.lock().attachments.get_mut(user_name) {
            attached.retain(|(t, n)| !(*t == PolicyType::Custom && n == name));
        }
    }

    pub fn policy_document(&self, policy_type: PolicyType, name: &str) -> Option<String> {
        self.lock()
            .policies
            .get(&(policy_type, name.to_string()))
            .cloned()
    }

    /// Sorted names of all custom policies.
    pub fn custom_policy_names(&self) -> Vec<String> {
        self.lock()
            .policies
            .keys()
            .filter(|(t, _)| *t == PolicyType::Custom)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Names of the policies attached to `user_name`, in attach order.
    pub fn attached_policy_names(&self, user_name: &str) -> Vec<String> {
        self.lock()
            .attachments
            .get(user_name)
            .map(|attached| attached.iter().map(|(_, n)| n.clone()).collect())
            .unwrap_or_default()
    }

    /// Make the next `times` calls of `operation` fail with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ApiError, times: usize) {
        self.lock().faults.push(Fault {
            operation,
            target: None,
            error,
            remaining: times,
        });
    }

    /// Make the next `times` calls of `operation` on `target` (a policy or user name) fail.
    pub fn fail_for(&self, operation: &'static str, target: &str, error: ApiError, times: usize) {
        self.lock().faults.push(Fault {
            operation,
            target: Some(target.to_string()),
            error,
            remaining: times,
        });
    }

    /// Every call made so far, formatted as `"<Operation> <target>"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

fn not_exist(what: &str, name: &str) -> ApiError {
    ApiError::new(
        format!("EntityNotExist.{what}"),
        format!("The {} does not exist: {}", what.to_lowercase(), name),
    )
}

#[async_trait]
impl RamApi for InMemoryRamClient {
    async fn get_policy(
        &self,
        policy_name: &str,
        policy_type: PolicyType,
    ) -> ApiResult<Option<PolicyRecord>> {
        let mut inner = self.lock();
        inner.enter(OP_GET_POLICY, policy_name)?;
        Ok(inner
            .policies
            .get(&(policy_type, policy_name.to_string()))
            .map(|document| PolicyRecord {
                policy_name: policy_name.to_string(),
                policy_type,
                policy_document: document.clone(),
            }))
    }

    async fn create_policy(&self, policy_name: &str, policy_document: &str) -> ApiResult<()> {
        let mut inner = self.lock();
        inner.enter(OP_CREATE_POLICY, policy_name)?;

        if policy_document.len() > MAX_LENGTH {
            return Err(ApiError::new(
                "LimitExceeded.Policy.Document",
                format!("The policy document of {policy_name} exceeds {MAX_LENGTH} characters"),
            ));
        }
        let key = (PolicyType::Custom, policy_name.to_string());
        if inner.policies.contains_key(&key) {
            return Err(ApiError::new(
                "EntityAlreadyExists.Policy",
                format!("The policy already exists: {policy_name}"),
            ));
        }
        inner.policies.insert(key, policy_document.to_string());
        Ok(())
    }

    async fn delete_policy(&self, policy_name: &str) -> ApiResult<()> {
        let mut inner = self.lock();
        inner.enter(OP_DELETE_POLICY, policy_name)?;

        let still_attached = inner.attachments.values().any(|attached| {
            attached
                .iter()
                .any(|(t, n)| *t == PolicyType::Custom && n == policy_name)
        });
        if still_attached {
            return Err(ApiError::new(
                "DeleteConflict.Policy.User",
                format!("The policy is still attached to a user: {policy_name}"),
            ));
        }
        inner
            .policies
            .remove(&(PolicyType::Custom, policy_name.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_exist("Policy", policy_name))
    }

    async fn attach_policy_to_user(
        &self,
        policy_type: PolicyType,
        policy_name: &str,
        user_name: &str,
    ) -> ApiResult<()> {
        let mut inner = self.lock();
        inner.enter(OP_ATTACH_POLICY_TO_USER, policy_name)?;

        let key = (policy_type, policy_name.to_string());
        if !inner.policies.contains_key(&key) {
            return Err(not_exist("Policy", policy_name));
        }
        let attached = inner.attachments.entry(user_name.to_string()).or_default();
        if attached.contains(&key) {
            return Err(ApiError::new(
                "EntityAlreadyExists.User.Policy",
                format!("The policy {policy_name} is already attached to {user_name}"),
            ));
        }
        attached.push(key);
        Ok(())
    }

    async fn detach_policy_from_user(
        &self,
        policy_type: PolicyType,
        policy_name: &str,
        user_name: &str,
    ) -> ApiResult<()> {
        let mut inner = self.lock();
        inner.enter(OP_DETACH_POLICY_FROM_USER, policy_name)?;

        let key = (policy_type, policy_name.to_string());
        let attached = inner.attachments.entry(user_name.to_string()).or_default();
        match attached.iter().position(|entry| *entry == key) {
            Some(index) => {
                attached.remove(index);
                Ok(())
            }
            None => Err(not_exist("User.Policy", policy_name)),
        }
    }

    async fn list_policies_for_user(&self, user_name: &str) -> ApiResult<Vec<AttachedPolicy>> {
        let mut inner = self.lock();
        inner.enter(OP_LIST_POLICIES_FOR_USER, user_name)?;
        Ok(inner
            .attachments
            .get(user_name)
            .map(|attached| {
                attached
                    .iter()
                    .map(|(policy_type, policy_name)| AttachedPolicy {
                        policy_name: policy_name.clone(),
                        policy_type: *policy_type,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_entities_for_policy(
        &self,
        policy_name: &str,
        policy_type: PolicyType,
    ) -> ApiResult<PolicyEntities> {
        let mut inner = self.lock();
        inner.enter(OP_LIST_ENTITIES_FOR_POLICY, policy_name)?;

        let key = (policy_type, policy_name.to_string());
        if !inner.policies.contains_key(&key) {
            return Err(not_exist("Policy", policy_name));
        }
        let mut users: Vec<String> = inner
            .attachments
            .iter()
            .filter(|(_, attached)| attached.contains(&key))
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        Ok(PolicyEntities {
            users,
            ..PolicyEntities::default()
        })
    }
}
