// lifecycle.rs — Explicit component-definition hooks.
//
// Applications call `ComponentRegistry::define` when they set up a new
// component. Every subscribed hook is notified, in subscription order, on
// each definition (redefinitions included). `GuardManager` subscribes to
// evict restricted modules whenever a component comes up.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receives component-definition events.
pub trait LifecycleHook: Send + Sync {
    fn on_component_defined(&self, component: &str);
}

/// Tracks defined components and notifies hooks.
#[derive(Default)]
pub struct ComponentRegistry {
    components: Mutex<Vec<String>>,
    hooks: Mutex<Vec<Arc<dyn LifecycleHook>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, hook: Arc<dyn LifecycleHook>) {
        lock(&self.hooks).push(hook);
    }

    /// Record `component` and notify every hook.
    ///
    /// Hooks run without any registry lock held, so a hook may define
    /// further components.
    pub fn define(&self, component: impl Into<String>) {
        let component = component.into();
        lock(&self.components).push(component.clone());
        let hooks = lock(&self.hooks).clone();
        tracing::debug!(component = %component, hooks = hooks.len(), "component defined");
        for hook in hooks {
            hook.on_component_defined(&component);
        }
    }

    /// Components defined so far, in definition order.
    pub fn components(&self) -> Vec<String> {
        lock(&self.components).clone()
    }

    pub fn is_defined(&self, component: &str) -> bool {
        lock(&self.components).iter().any(|c| c == component)
    }
}
