//! Writing scripts to disk
//!
//! A batch is written to a hidden staging directory first and only moved
//! into place once every file is complete, so a failed run leaves nothing
//! behind.

use crate::generator::GeneratedScript;
use crate::{Result, ScriptError};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Write every script into `dir`, all or nothing. Returns the final paths.
pub fn write_scripts(
    dir: impl AsRef<Path>,
    scripts: &[GeneratedScript],
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if scripts.is_empty() {
        return Err(ScriptError::NothingToWrite);
    }

    let mut names = HashSet::new();
    for script in scripts {
        if !names.insert(script.file_name.as_str()) {
            return Err(ScriptError::DuplicateName(script.file_name.clone()));
        }
    }

    fs::create_dir_all(dir)?;
    let staging = dir.join(format!(".staging-{}", uuid::Uuid::new_v4()));
    fs::create_dir(&staging)?;

    if let Err(err) = stage(&staging, scripts) {
        discard(&staging);
        return Err(err);
    }

    let mut written = Vec::with_capacity(scripts.len());
    for script in scripts {
        let target = dir.join(&script.file_name);
        if let Err(err) = fs::rename(staging.join(&script.file_name), &target) {
            tracing::warn!(path = %target.display(), error = %err, "rolling back script batch");
            for path in &written {
                let _ = fs::remove_file(path);
            }
            discard(&staging);
            return Err(err.into());
        }
        written.push(target);
    }

    discard(&staging);
    tracing::info!(dir = %dir.display(), scripts = written.len(), "scripts written");
    Ok(written)
}

fn stage(staging: &Path, scripts: &[GeneratedScript]) -> Result<()> {
    for script in scripts {
        fs::write(staging.join(&script.file_name), &script.content)?;
    }
    Ok(())
}

fn discard(staging: &Path) {
    if let Err(err) = fs::remove_dir_all(staging) {
        tracing::debug!(path = %staging.display(), error = %err, "staging directory not removed");
    }
}
