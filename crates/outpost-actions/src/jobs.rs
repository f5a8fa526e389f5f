//! Job script discovery under the configured jobs directory.
//!
//! Layout: `<jobs dir>/<job>/bin/<script>`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// A script shipped by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScript {
    pub job: String,
    pub path: PathBuf,
}

/// Reject names that would escape the jobs directory.
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0') {
        bail!("Invalid {kind} name '{name}'");
    }
    Ok(())
}

/// Path of `script` in `job`, whether or not it exists.
pub fn script_path(jobs_dir: &Path, job: &str, script: &str) -> PathBuf {
    jobs_dir.join(job).join("bin").join(script)
}

pub fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

/// Every job carrying `bin/<script>`, sorted by job name.
/// A missing jobs directory has no scripts.
pub fn scripts_named(jobs_dir: &Path, script: &str) -> Result<Vec<JobScript>> {
    validate_name("script", script)?;
    if !jobs_dir.exists() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(jobs_dir)
        .with_context(|| format!("Reading jobs directory {}", jobs_dir.display()))?;

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Reading jobs directory {}", jobs_dir.display()))?;
        let Ok(job) = entry.file_name().into_string() else {
            continue;
        };
        let path = script_path(jobs_dir, &job, script);
        if is_file(&path) {
            scripts.push(JobScript { job, path });
        }
    }
    scripts.sort_by(|a, b| a.job.cmp(&b.job));
    Ok(scripts)
}
