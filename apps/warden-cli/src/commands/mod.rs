pub mod check;
pub mod init;
pub mod show;

use std::path::{Path, PathBuf};

use warden_policy::{AccessPolicy, PolicyError, PolicyFile, PolicyStore};

/// Load the policy named by `--policy`, or the project's `.warden/` policy.
///
/// Returns None when the project has no policy file.
pub fn load_policy(
    project_root: &Path,
    explicit: Option<&PathBuf>,
) -> Result<Option<AccessPolicy>, PolicyError> {
    match explicit {
        Some(path) => Ok(Some(PolicyFile::load(path)?.into_policy())),
        None => PolicyStore::for_project(project_root).load(),
    }
}
