// init.rs — Write a starter policy under `.warden/`.

use std::path::Path;

use warden_policy::{PolicyFile, PolicyStore};

pub fn execute(project_root: &Path, force: bool) -> anyhow::Result<()> {
    let store = PolicyStore::for_project(project_root);
    let existing = store.policy_path();
    if existing.exists() && !force {
        println!(
            "Policy already exists at {} (use --force to overwrite)",
            existing.display()
        );
        return Ok(());
    }

    let path = store.save(&PolicyFile::starter())?;
    tracing::info!(path = %path.display(), "wrote starter policy");
    println!("Wrote starter policy to {}", path.display());
    Ok(())
}
