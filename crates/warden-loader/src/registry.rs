// registry.rs — Holds the single active access policy.
//
// Only one policy is active at a time; registering a new one replaces the
// previous reference. Components that need the policy take a
// `&PolicyRegistry` explicitly. A process-wide registry backs the
// `register_policy` shortcut for applications that want one.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use warden_policy::{AccessPolicy, PolicyError};

static GLOBAL: OnceLock<PolicyRegistry> = OnceLock::new();

/// The slot for the active access policy.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    active: RwLock<Option<Arc<AccessPolicy>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`register_policy`].
    pub fn global() -> &'static PolicyRegistry {
        GLOBAL.get_or_init(PolicyRegistry::new)
    }

    /// Make `policy` the active policy, replacing any previous one.
    pub fn register(&self, policy: AccessPolicy) -> Arc<AccessPolicy> {
        self.register_shared(Arc::new(policy))
    }

    /// Like `register`, for a policy that is already shared.
    pub fn register_shared(&self, policy: Arc<AccessPolicy>) -> Arc<AccessPolicy> {
        let mut slot = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.as_ref() {
            tracing::info!(
                previous = %previous.policy_id,
                policy_id = %policy.policy_id,
                "replacing active access policy"
            );
        } else {
            tracing::info!(policy_id = %policy.policy_id, "registered access policy");
        }
        *slot = Some(Arc::clone(&policy));
        policy
    }

    /// The active policy, if one was registered.
    pub fn active(&self) -> Option<Arc<AccessPolicy>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The active policy, or `MissingPolicy`.
    pub fn require(&self) -> Result<Arc<AccessPolicy>, PolicyError> {
        self.active().ok_or(PolicyError::MissingPolicy)
    }

    /// Forget the active policy.
    pub fn unregister(&self) -> Option<Arc<AccessPolicy>> {
        self.active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Register `policy` with the process-wide registry.
pub fn register_policy(policy: AccessPolicy) {
    PolicyRegistry::global().register(policy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_policy::ErrorCategory;

    #[test]
    fn empty_registry_requires_registration() {
        let registry = PolicyRegistry::new();
        assert!(registry.active().is_none());
        let err = registry.require().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::RuntimeError);
    }

    #[test]
    fn register_replaces_previous_policy() {
        let registry = PolicyRegistry::new();
        let first = registry.register(AccessPolicy::new(["a"], ["x"]));
        let second = registry.register(AccessPolicy::new(["b"], ["y"]));

        let active = registry.require().unwrap();
        assert!(Arc::ptr_eq(&active, &second));
        assert!(!Arc::ptr_eq(&active, &first));
        assert!(active.is_restricted("b"));
    }

    #[test]
    fn unregister_clears_slot() {
        let registry = PolicyRegistry::new();
        registry.register(AccessPolicy::new(["a"], ["x"]));
        assert!(registry.unregister().is_some());
        assert!(registry.active().is_none());
    }

    #[test]
    fn global_registry_is_shared() {
        register_policy(AccessPolicy::new(["global-only"], ["x"]));
        let active = PolicyRegistry::global().require().unwrap();
        assert!(active.is_restricted("global-only"));
    }
}
