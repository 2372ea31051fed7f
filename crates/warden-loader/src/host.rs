// host.rs — The module host: resolution pipeline plus loaded-module cache.
//
// Loading a module works the way an interpreter's import system does:
//
// 1. Dotted names load their parents first ("pkg.sub" loads "pkg").
// 2. A cache hit returns immediately. The pipeline is NOT consulted, so a
//    module cached under a permissive call chain is handed out to anyone
//    until it is evicted. `GuardManager::clear` exists for this reason.
// 3. Otherwise finders run in pipeline order. The first `Some(spec)` wins
//    and is cached; `Ok(None)` means "no opinion"; an error aborts the load
//    and nothing is cached.
//
// Pipeline and cache share one mutex so that check-then-modify sequences
// (install, reset, eviction) are atomic. Finders run without the lock held.

use std::any::Any;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_policy::PolicyError;

use crate::provenance::CallChain;

/// A single resolution attempt, as seen by each finder.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    /// Full identifier being resolved (e.g. "secretlib.sub").
    pub name: &'a str,
    /// Provenance of the request.
    pub chain: &'a CallChain,
}

/// What a finder returns when it can resolve an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: String,
    pub origin: PathBuf,
}

/// A resolved module, as stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedModule {
    pub module_id: Uuid,
    pub name: String,
    pub origin: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModule {
    fn from_spec(spec: ModuleSpec) -> Self {
        Self {
            module_id: Uuid::new_v4(),
            name: spec.name,
            origin: spec.origin,
            loaded_at: Utc::now(),
        }
    }
}

/// One stage of the resolution pipeline.
pub trait Finder: Send + Sync {
    /// Short name for logs and `finder_names()`.
    fn name(&self) -> &str;

    /// Resolve `request`, decline with `Ok(None)`, or abort with an error.
    fn find(&self, request: &LoadRequest<'_>) -> Result<Option<ModuleSpec>, PolicyError>;

    /// Used to check the concrete type at a pipeline position.
    fn as_any(&self) -> &dyn Any;
}

/// A finder backed by a fixed table of known modules.
#[derive(Debug, Clone, Default)]
pub struct StaticFinder {
    label: String,
    modules: HashMap<String, PathBuf>,
}

impl StaticFinder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            modules: HashMap::new(),
        }
    }

    /// Add a module and return self (builder style).
    pub fn with_module(mut self, name: impl Into<String>, origin: impl Into<PathBuf>) -> Self {
        self.register(name, origin);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, origin: impl Into<PathBuf>) {
        self.modules.insert(name.into(), origin.into());
    }
}

impl Finder for StaticFinder {
    fn name(&self) -> &str {
        &self.label
    }

    fn find(&self, request: &LoadRequest<'_>) -> Result<Option<ModuleSpec>, PolicyError> {
        Ok(self.modules.get(request.name).map(|origin| ModuleSpec {
            name: request.name.to_string(),
            origin: origin.clone(),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct HostState {
    pipeline: Vec<Arc<dyn Finder>>,
    cache: HashMap<String, Arc<LoadedModule>>,
}

/// Owns the resolution pipeline and the loaded-module cache.
pub struct ModuleHost {
    state: Mutex<HostState>,
}

impl ModuleHost {
    /// A host with an empty pipeline; every load fails with NotFound.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                pipeline: Vec::new(),
                cache: HashMap::new(),
            }),
        }
    }

    /// Append a finder at the end of the pipeline (builder style).
    pub fn with_finder(self, finder: impl Finder + 'static) -> Self {
        self.state().pipeline.push(Arc::new(finder));
        self
    }

    // The protected data is consistent between statements, so a panic in
    // another thread does not invalidate it.
    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load `name` and its parents on behalf of `chain`.
    pub fn load(&self, name: &str, chain: &CallChain) -> Result<Arc<LoadedModule>, PolicyError> {
        if name.is_empty() || name.split('.').any(str::is_empty) {
            return Err(PolicyError::NotFound {
                identifier: name.to_string(),
            });
        }

        let mut loaded = None;
        for (end, _) in name
            .match_indices('.')
            .chain(std::iter::once((name.len(), "")))
        {
            loaded = Some(self.load_one(&name[..end], chain)?);
        }
        loaded.ok_or_else(|| PolicyError::NotFound {
            identifier: name.to_string(),
        })
    }

    /// Load `name` using the current thread's frame stack as provenance.
    pub fn load_current(&self, name: &str) -> Result<Arc<LoadedModule>, PolicyError> {
        self.load(name, &CallChain::capture())
    }

    fn load_one(&self, name: &str, chain: &CallChain) -> Result<Arc<LoadedModule>, PolicyError> {
        let pipeline = {
            let state = self.state();
            if let Some(module) = state.cache.get(name) {
                tracing::trace!(module = name, "module cache hit");
                return Ok(Arc::clone(module));
            }
            state.pipeline.clone()
        };

        let request = LoadRequest { name, chain };
        for finder in &pipeline {
            if let Some(spec) = finder.find(&request)? {
                tracing::debug!(
                    module = name,
                    finder = finder.name(),
                    origin = %spec.origin.display(),
                    "module resolved"
                );
                let module = Arc::new(LoadedModule::from_spec(spec));
                let mut state = self.state();
                // Another thread may have resolved it meanwhile; first one wins.
                let cached = state.cache.entry(name.to_string()).or_insert(module);
                return Ok(Arc::clone(cached));
            }
        }

        Err(PolicyError::NotFound {
            identifier: name.to_string(),
        })
    }

    /// Insert a finder at `index` (clamped to the pipeline length).
    pub fn insert_finder(&self, index: usize, finder: Arc<dyn Finder>) {
        let mut state = self.state();
        let index = index.min(state.pipeline.len());
        state.pipeline.insert(index, finder);
    }

    /// Remove and return the finder at `index`, if any.
    pub fn remove_finder(&self, index: usize) -> Option<Arc<dyn Finder>> {
        let mut state = self.state();
        (index < state.pipeline.len()).then(|| state.pipeline.remove(index))
    }

    pub fn finder_at(&self, index: usize) -> Option<Arc<dyn Finder>> {
        self.state().pipeline.get(index).cloned()
    }

    pub fn finder_names(&self) -> Vec<String> {
        self.state()
            .pipeline
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Run `f` on the pipeline while holding the host lock.
    ///
    /// Used for check-then-modify sequences that must not interleave with
    /// other pipeline changes.
    pub fn update_pipeline<R>(&self, f: impl FnOnce(&mut Vec<Arc<dyn Finder>>) -> R) -> R {
        f(&mut self.state().pipeline)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.state().cache.contains_key(name)
    }

    /// Cached identifiers, sorted.
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().cache.keys().cloned().collect();
        names.sort();
        names
    }

    /// Evict one identifier. Returns true if it was cached.
    pub fn evict(&self, name: &str) -> bool {
        self.state().cache.remove(name).is_some()
    }

    /// Evict every listed identifier in one critical section.
    ///
    /// Returns the identifiers that were actually present, in input order.
    pub fn evict_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let mut state = self.state();
        let mut evicted = Vec::new();
        for name in names {
            let name: &str = name.as_ref();
            if state.cache.remove(name).is_some() {
                evicted.push(name.to_string());
            }
        }
        evicted
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new()
    }
}
