//! Report job progress and hand finished artifacts back to the orchestrator

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use serde::Serialize;

use crate::collect::ArtifactDescriptor;

/// Step updates for a running job (the orchestrator's job-step endpoint)
pub trait ProgressReporter {
    fn update_step(&self, message: &str);
}

/// Default reporter: step updates go to the log
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn update_step(&self, message: &str) {
        info!("{message}");
    }
}

#[derive(Serialize)]
struct Registration<'a> {
    job_id: &'a str,
    completed_at: String,
    artifacts: &'a [ArtifactDescriptor],
}

/// Write the artifact registration payload for the orchestrator to pick up
pub fn write_registration(
    work_dir: &Path,
    job_id: &str,
    artifacts: &[ArtifactDescriptor],
) -> Result<PathBuf> {
    let registration = Registration {
        job_id,
        completed_at: Utc::now().to_rfc3339(),
        artifacts,
    };

    let out_path = work_dir.join("artifacts.json");
    info!("Writing artifact registration to {}", out_path.display());
    let json = serde_json::to_string_pretty(&registration)
        .context("serialising registration payload")?;
    fs::write(&out_path, json)
        .with_context(|| format!("can't write {}", out_path.display()))?;

    Ok(out_path)
}
