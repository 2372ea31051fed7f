// manager.rs — Installs the gatekeeper and keeps the cache honest.
//
// A module cached under a trusted call chain would otherwise be handed to
// any later caller without the gatekeeper ever running. The manager evicts
// restricted identifiers so that guarded entry points always re-resolve,
// and therefore re-authorize, the restricted modules they touch.
//
// Install and reset only ever look at pipeline position 0, each as one
// critical section on the host. Defining a component restores a gatekeeper
// that was reset, then evicts.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;
use warden_policy::{AccessPolicy, PolicyError};

use crate::gatekeeper::Gatekeeper;
use crate::host::{Finder, ModuleHost};
use crate::lifecycle::LifecycleHook;
use crate::registry::PolicyRegistry;

/// Owns the gatekeeper lifecycle for one host.
#[derive(Clone)]
pub struct GuardManager {
    host: Arc<ModuleHost>,
    policy: Arc<AccessPolicy>,
}

fn is_gatekeeper(finder: &Arc<dyn Finder>) -> bool {
    finder.as_any().is::<Gatekeeper>()
}

/// Policy enforced by the gatekeeper at position 0, if there is one.
fn front_policy_id(pipeline: &[Arc<dyn Finder>]) -> Option<Uuid> {
    pipeline
        .first()
        .and_then(|finder| finder.as_any().downcast_ref::<Gatekeeper>())
        .map(|gate| gate.policy().policy_id)
}

enum Install {
    Present,
    Inserted,
    Replaced(Uuid),
}

impl GuardManager {
    /// Install the gatekeeper for the registry's active policy.
    ///
    /// Fails with `MissingPolicy` when nothing is registered. A gatekeeper
    /// for the same policy at position 0 is left in place; one built from
    /// an older policy is replaced, so the gatekeeper always enforces the
    /// identifiers this manager evicts.
    pub fn install(host: Arc<ModuleHost>, registry: &PolicyRegistry) -> Result<Self, PolicyError> {
        let policy = registry.require()?;
        let outcome = host.update_pipeline(|pipeline| match front_policy_id(pipeline) {
            Some(id) if id == policy.policy_id => Install::Present,
            Some(previous) => {
                let gate: Arc<dyn Finder> = Arc::new(Gatekeeper::new(Arc::clone(&policy)));
                pipeline[0] = gate;
                Install::Replaced(previous)
            }
            None => {
                pipeline.insert(0, Arc::new(Gatekeeper::new(Arc::clone(&policy))));
                Install::Inserted
            }
        });
        match outcome {
            Install::Present => tracing::debug!("gatekeeper already installed at position 0"),
            Install::Inserted => tracing::info!(
                policy_id = %policy.policy_id,
                restricted = policy.restricted().len(),
                allowed = policy.allowed().len(),
                "gatekeeper installed"
            ),
            Install::Replaced(previous) => tracing::info!(
                policy_id = %policy.policy_id,
                %previous,
                "gatekeeper replaced for new policy"
            ),
        }
        Ok(Self { host, policy })
    }

    /// Put this manager's gatekeeper back at position 0 if none is there.
    fn ensure_installed(&self) {
        let inserted = self.host.update_pipeline(|pipeline| {
            if pipeline.first().is_some_and(is_gatekeeper) {
                return false;
            }
            pipeline.insert(0, Arc::new(Gatekeeper::new(Arc::clone(&self.policy))));
            true
        });
        if inserted {
            tracing::info!(policy_id = %self.policy.policy_id, "gatekeeper restored");
        }
    }

    /// Remove the gatekeeper from position 0 if it is there.
    pub fn reset(&self) {
        let removed = self.host.update_pipeline(|pipeline| {
            if pipeline.first().is_some_and(is_gatekeeper) {
                pipeline.remove(0);
                true
            } else {
                false
            }
        });
        if removed {
            tracing::info!(policy_id = %self.policy.policy_id, "gatekeeper removed");
        }
    }

    /// Reset, then install again with the registry's current policy.
    pub fn reinstall(&mut self, registry: &PolicyRegistry) -> Result<(), PolicyError> {
        self.reset();
        *self = Self::install(Arc::clone(&self.host), registry)?;
        Ok(())
    }

    /// True when position 0 of the pipeline is a gatekeeper.
    pub fn is_installed(&self) -> bool {
        self.host
            .finder_at(0)
            .is_some_and(|finder| is_gatekeeper(&finder))
    }

    pub fn policy(&self) -> &Arc<AccessPolicy> {
        &self.policy
    }

    pub fn host(&self) -> &Arc<ModuleHost> {
        &self.host
    }

    /// Evict every restricted identifier from the cache.
    ///
    /// Other entries, including submodules of restricted identifiers, are
    /// left alone. Returns the identifiers that were evicted.
    pub fn clear(&self) -> Vec<String> {
        let evicted = self.host.evict_all(self.policy.restricted());
        if !evicted.is_empty() {
            tracing::debug!(evicted = ?evicted, "evicted restricted modules");
        }
        evicted
    }

    /// Evict one identifier regardless of the policy.
    pub fn clear_cache_with_name(host: &ModuleHost, name: &str) -> bool {
        host.evict(name)
    }

    /// Clear, then run `f`, returning its result unchanged.
    pub fn guarded<R>(&self, f: impl FnOnce() -> R) -> R {
        self.clear();
        f()
    }

    /// Wrap `f` so that every call clears the cache first.
    ///
    /// Arguments travel as a single value; use a tuple for several.
    pub fn wrap<A, R, F>(&self, f: F) -> impl Fn(A) -> R
    where
        F: Fn(A) -> R,
    {
        let manager = self.clone();
        move |args| {
            manager.clear();
            f(args)
        }
    }
}

impl fmt::Debug for GuardManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardManager")
            .field("policy_id", &self.policy.policy_id)
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl LifecycleHook for GuardManager {
    fn on_component_defined(&self, component: &str) {
        self.ensure_installed();
        let evicted = self.clear();
        tracing::trace!(
            component = component,
            evicted = evicted.len(),
            "cache cleared on definition"
        );
    }
}
