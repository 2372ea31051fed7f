// show.rs — Print the normalized policy.

use std::path::{Path, PathBuf};

use warden_policy::PolicyError;

pub fn execute(project_root: &Path, policy_path: Option<&PathBuf>) -> anyhow::Result<()> {
    let policy =
        super::load_policy(project_root, policy_path)?.ok_or(PolicyError::MissingPolicy)?;
    println!("{}", serde_json::to_string_pretty(&policy)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use warden_policy::ErrorCategory;

    #[test]
    fn explicit_policy_file_is_used() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, r#"{"restricted": ["vault"], "allowed": ["app.core"]}"#).unwrap();
        assert!(execute(dir.path(), Some(&path)).is_ok());
    }

    #[test]
    fn malformed_policy_surfaces_type_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "restricted = \"not-a-list\"\nallowed = [\"x\"]\n").unwrap();
        let err = execute(dir.path(), Some(&path)).unwrap_err();
        let policy_err = err.downcast_ref::<PolicyError>().unwrap();
        assert_eq!(policy_err.category(), ErrorCategory::TypeError);
    }
}
