//! # warden-loader
//!
//! Module host and provenance gatekeeper for Warden.
//!
//! A [`ModuleHost`] resolves identifiers through a pipeline of [`Finder`]s
//! and caches the result. [`GuardManager::install`] puts a [`Gatekeeper`]
//! at the front of that pipeline: loads of restricted identifiers are
//! allowed only when some frame of the request's [`CallChain`] lies under a
//! trusted origin of the active policy.
//!
//! ## Quick Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_loader::{CallChain, GuardManager, ModuleHost, PolicyRegistry, StaticFinder};
//! use warden_policy::AccessPolicy;
//!
//! let host = Arc::new(
//!     ModuleHost::new()
//!         .with_finder(StaticFinder::new("builtin").with_module("secretlib", "/lib/secretlib.rs")),
//! );
//! let registry = PolicyRegistry::new();
//! registry.register(AccessPolicy::new(["secretlib"], ["app.trusted"]));
//! let guard = GuardManager::install(Arc::clone(&host), &registry).unwrap();
//!
//! let trusted = CallChain::from_origins(["/srv/app/trusted/x.rs"]);
//! assert!(guard.guarded(|| host.load("secretlib", &trusted)).is_ok());
//!
//! let untrusted = CallChain::from_origins(["/srv/app/untrusted/y.rs"]);
//! assert!(guard.guarded(|| host.load("secretlib", &untrusted)).is_err());
//! ```
//!
//! ## Key invariants
//!
//! - **Single gatekeeper**: installing twice never stacks a second one.
//! - **Denials are never cached**: a denied load leaves the cache untouched.
//! - **Guarded calls re-authorize**: restricted identifiers are evicted
//!   before every guarded call, so a stale authorized load cannot leak.

pub mod gatekeeper;
pub mod host;
pub mod lifecycle;
pub mod manager;
pub mod provenance;
pub mod registry;

pub use gatekeeper::{GateDecision, GateStep, GateTrace, Gatekeeper, GATEKEEPER_NAME};
pub use host::{Finder, LoadRequest, LoadedModule, ModuleHost, ModuleSpec, StaticFinder};
pub use lifecycle::{ComponentRegistry, LifecycleHook};
pub use manager::GuardManager;
pub use provenance::{enter_frame, enter_labeled_frame, CallChain, CallerFrame, FrameGuard};
pub use registry::{register_policy, PolicyRegistry};
