use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use jd_core::Job;

/// Read a JSON array of jobs to seed the in-memory backend.
pub async fn load_fixture(path: &Path) -> Result<Vec<Job>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read fixture failed: {}", path.display()))?;
    let jobs: Vec<Job> = serde_json::from_str(&raw)
        .with_context(|| format!("parse fixture failed: {}", path.display()))?;
    info!(path = %path.display(), jobs = jobs.len(), "loaded fixture");
    Ok(jobs)
}
