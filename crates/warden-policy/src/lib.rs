//! # warden-policy
//!
//! Access policies for the Warden module gatekeeper.
//!
//! An [`AccessPolicy`] names the identifiers whose loads are restricted and
//! the trusted origins ([`OriginPath`]) allowed to load them. Policies are
//! declared in code or in a `.warden/policy.yaml` file ([`PolicyStore`]).
//!
//! ## Key invariants
//!
//! - **Normalized origins**: dotted entries (`app.trusted`) are stored as
//!   host paths (`app/trusted`) before any comparison.
//! - **Whole-segment matching**: by default an origin only matches complete
//!   path components, so `app/trusted` never covers `app/trusted_evil`.
//! - **Typed failures**: every error maps to one [`ErrorCategory`].

pub mod config;
pub mod error;
pub mod origin;
pub mod policy;

pub use config::{PolicyFile, PolicyStore};
pub use error::{ErrorCategory, PolicyError};
pub use origin::{MatchMode, OriginPath};
pub use policy::AccessPolicy;
