// check.rs — Evaluate one load request against the project policy.

use std::path::{Path, PathBuf};

use warden_loader::{CallChain, GateDecision, Gatekeeper, PolicyRegistry};
use warden_policy::PolicyError;

/// Evaluate `module` as if requested through `frames` (innermost first).
///
/// Prints the evaluation trace. A denial is returned as
/// `PolicyError::Denied` so the caller reports it and exits non-zero.
pub fn execute(
    project_root: &Path,
    policy_path: Option<&PathBuf>,
    module: &str,
    frames: &[PathBuf],
    json: bool,
) -> anyhow::Result<()> {
    let registry = PolicyRegistry::new();
    if let Some(policy) = super::load_policy(project_root, policy_path)? {
        registry.register(policy);
    }
    let policy = registry.require()?;

    let chain = CallChain::from_origins(frames.iter().cloned());
    let trace = Gatekeeper::new(policy).evaluate_with_trace(module, &chain);

    if json {
        println!("{}", serde_json::to_string_pretty(&trace)?);
    } else {
        println!("Module: {}", trace.identifier);
        for step in &trace.steps {
            println!("  [{}] {}", step.check, step.outcome);
        }
    }

    match trace.decision {
        GateDecision::Denied { .. } => Err(PolicyError::Denied {
            identifier: module.to_string(),
        }
        .into()),
        GateDecision::Passthrough | GateDecision::Granted { .. } => Ok(()),
    }
}
