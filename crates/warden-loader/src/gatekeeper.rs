// gatekeeper.rs — The provenance check, installed as a pipeline finder.
//
// The Gatekeeper sees every resolution attempt that misses the cache:
//
// 1. Is the identifier restricted? → No → no opinion (pipeline continues)
// 2. Does any frame of the call chain, innermost to outermost, fall under
//    any allowed origin? → Yes → no opinion (granted)
// 3. No match → Denied (the load aborts, nothing is cached)
//
// The check is transitive: a trusted frame anywhere on the chain grants the
// load, not just the immediate caller. The Gatekeeper never resolves a
// module itself; it only vetoes.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warden_policy::{AccessPolicy, PolicyError};

use crate::host::{Finder, LoadRequest, ModuleSpec};
use crate::provenance::CallChain;

/// Name reported by `Finder::name` for the installed gatekeeper.
pub const GATEKEEPER_NAME: &str = "warden-gatekeeper";

/// Outcome of evaluating one load request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// The identifier is not restricted; the gatekeeper has no opinion.
    Passthrough,
    /// A trusted frame was found on the chain.
    Granted { frame: PathBuf, origin: String },
    /// No frame matched any allowed origin.
    Denied { reason: String },
}

/// A step in the gate evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateStep {
    /// Which check was performed ("restriction_lookup", "frame_scan").
    pub check: String,
    /// What it found.
    pub outcome: String,
    /// Whether this step decided the request.
    pub terminal: bool,
}

/// Full evaluation record, for `warden check` and debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateTrace {
    pub identifier: String,
    pub decision: GateDecision,
    pub steps: Vec<GateStep>,
    /// Frame origins inspected, innermost first.
    pub frames_checked: Vec<String>,
}

/// Vetoes restricted loads whose call chain holds no trusted frame.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    policy: Arc<AccessPolicy>,
}

impl Gatekeeper {
    pub fn new(policy: Arc<AccessPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &Arc<AccessPolicy> {
        &self.policy
    }

    /// Evaluate a request for `identifier` made through `chain`.
    pub fn evaluate(&self, identifier: &str, chain: &CallChain) -> GateDecision {
        if !self.policy.is_restricted(identifier) {
            return GateDecision::Passthrough;
        }

        for frame in chain.frames() {
            if let Some(origin) = self.policy.trusted_origin_for(&frame.origin) {
                return GateDecision::Granted {
                    frame: frame.origin.clone(),
                    origin: origin.to_string(),
                };
            }
        }

        let reason = if chain.is_empty() {
            "empty call chain".to_string()
        } else {
            format!("none of {} frame(s) under an allowed origin", chain.len())
        };
        GateDecision::Denied { reason }
    }

    /// Evaluate and turn a denial into `PolicyError::Denied`.
    pub fn check(&self, identifier: &str, chain: &CallChain) -> Result<(), PolicyError> {
        match self.evaluate(identifier, chain) {
            GateDecision::Passthrough => Ok(()),
            GateDecision::Granted { frame, origin } => {
                tracing::debug!(
                    module = identifier,
                    frame = %frame.display(),
                    origin = %origin,
                    "restricted load granted"
                );
                Ok(())
            }
            GateDecision::Denied { reason } => {
                tracing::warn!(
                    module = identifier,
                    policy_id = %self.policy.policy_id,
                    frames = chain.len(),
                    %reason,
                    "restricted load denied"
                );
                Err(PolicyError::Denied {
                    identifier: identifier.to_string(),
                })
            }
        }
    }

    /// Same logic as `evaluate()`, recording every step.
    pub fn evaluate_with_trace(&self, identifier: &str, chain: &CallChain) -> GateTrace {
        let mut steps = Vec::new();
        let frames_checked = chain
            .origins()
            .map(|p| p.display().to_string())
            .collect();

        let decision = self.evaluate(identifier, chain);
        match &decision {
            GateDecision::Passthrough => {
                steps.push(GateStep {
                    check: "restriction_lookup".to_string(),
                    outcome: format!("'{}' is not restricted", identifier),
                    terminal: true,
                });
            }
            GateDecision::Granted { frame, origin } => {
                steps.push(GateStep {
                    check: "restriction_lookup".to_string(),
                    outcome: format!("'{}' is restricted", identifier),
                    terminal: false,
                });
                steps.push(GateStep {
                    check: "frame_scan".to_string(),
                    outcome: format!(
                        "granted: frame '{}' is under '{}'",
                        frame.display(),
                        origin
                    ),
                    terminal: true,
                });
            }
            GateDecision::Denied { .. } => {
                steps.push(GateStep {
                    check: "restriction_lookup".to_string(),
                    outcome: format!("'{}' is restricted", identifier),
                    terminal: false,
                });
                steps.push(GateStep {
                    check: "frame_scan".to_string(),
                    outcome: self.denial_summary(chain),
                    terminal: true,
                });
            }
        }

        GateTrace {
            identifier: identifier.to_string(),
            decision,
            steps,
            frames_checked,
        }
    }

    fn denial_summary(&self, chain: &CallChain) -> String {
        let allowed = self.policy.allowed().len();
        let mode = self.policy.match_mode();
        if chain.is_empty() {
            format!(
                "denied: empty call chain, {} allowed origin(s), {} matching",
                allowed, mode
            )
        } else {
            format!(
                "denied: none of {} frame(s) under {} allowed origin(s), {} matching",
                chain.len(),
                allowed,
                mode
            )
        }
    }
}

impl Finder for Gatekeeper {
    fn name(&self) -> &str {
        GATEKEEPER_NAME
    }

    fn find(&self, request: &LoadRequest<'_>) -> Result<Option<ModuleSpec>, PolicyError> {
        self.check(request.name, request.chain)?;
        Ok(None)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_policy::MatchMode;

    fn gatekeeper(restricted: &[&str], allowed: &[&str]) -> Gatekeeper {
        Gatekeeper::new(Arc::new(AccessPolicy::new(
            restricted.iter().copied(),
            allowed.iter().copied(),
        )))
    }

    #[test]
    fn trusted_frame_grants_restricted_load() {
        let gate = gatekeeper(&["secretlib"], &["app.trusted"]);
        let chain = CallChain::from_origins(["/srv/app/trusted/x.rs"]);
        assert!(gate.check("secretlib", &chain).is_ok());
        assert!(matches!(
            gate.evaluate("secretlib", &chain),
            GateDecision::Granted { .. }
        ));
    }

    #[test]
    fn untrusted_chain_is_denied() {
        let gate = gatekeeper(&["secretlib"], &["app.trusted"]);
        let chain = CallChain::from_origins(["/srv/app/untrusted/y.rs"]);
        match gate.check("secretlib", &chain) {
            Err(PolicyError::Denied { identifier }) => assert_eq!(identifier, "secretlib"),
            other => panic!("expected Denied, got {:?}", other),
        }
    }

    #[test]
    fn any_ancestor_frame_counts() {
        let gate = gatekeeper(&["secretlib"], &["app.trusted"]);
        let chain = CallChain::from_origins([
            "/srv/vendor/helper.rs",
            "/srv/app/untrusted/y.rs",
            "/srv/app/trusted/entry.rs",
        ]);
        assert!(gate.check("secretlib", &chain).is_ok());
    }

    #[test]
    fn unrestricted_identifier_passes_any_chain() {
        let gate = gatekeeper(&["secretlib"], &["app.trusted"]);
        assert_eq!(
            gate.evaluate("json", &CallChain::empty()),
            GateDecision::Passthrough
        );
        assert!(gate.check("json", &CallChain::empty()).is_ok());
    }

    #[test]
    fn empty_chain_is_denied() {
        let gate = gatekeeper(&["secretlib"], &["app.trusted"]);
        assert!(gate.check("secretlib", &CallChain::empty()).is_err());
    }

    #[test]
    fn lookalike_directory_denied_in_segment_mode_only() {
        let chain = CallChain::from_origins(["/srv/app/trusted_evil/x.rs"]);
        let strict = gatekeeper(&["secretlib"], &["app/trusted"]);
        assert!(strict.check("secretlib", &chain).is_err());

        let legacy = Gatekeeper::new(Arc::new(
            AccessPolicy::new(["secretlib"], ["app/trusted"]).with_match_mode(MatchMode::Substring),
        ));
        assert!(legacy.check("secretlib", &chain).is_ok());
    }

    #[test]
    fn trace_records_steps() {
        let gate = gatekeeper(&["secretlib"], &["app.trusted"]);
        let chain = CallChain::from_origins(["/srv/app/untrusted/y.rs"]);
        let trace = gate.evaluate_with_trace("secretlib", &chain);

        assert_eq!(trace.steps.len(), 2);
        assert_eq!(trace.steps[0].check, "restriction_lookup");
        assert!(trace.steps[1].terminal);
        assert_eq!(
            trace.steps[1].outcome,
            "denied: none of 1 frame(s) under 1 allowed origin(s), segment matching"
        );
        assert_eq!(
            trace.decision,
            GateDecision::Denied {
                reason: "none of 1 frame(s) under an allowed origin".to_string(),
            }
        );

        let empty = gate.evaluate_with_trace("secretlib", &CallChain::empty());
        assert_eq!(
            empty.steps[1].outcome,
            "denied: empty call chain, 1 allowed origin(s), segment matching"
        );
        assert_eq!(trace.frames_checked, vec!["/srv/app/untrusted/y.rs"]);

        let passthrough = gate.evaluate_with_trace("json", &chain);
        assert_eq!(passthrough.steps.len(), 1);
        assert_eq!(passthrough.decision, GateDecision::Passthrough);
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(GateDecision::Denied {
            reason: "x".to_string(),
        })
        .unwrap();
        assert_eq!(json["decision"], "denied");
    }
}
