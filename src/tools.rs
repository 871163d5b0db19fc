//! Tool adapters: generate commands, run them, and collect output artifacts

pub mod kneaddata;
pub mod shogun;
pub mod sortmerna;
pub mod trim;

use std::path::PathBuf;

use anyhow::Result;

use crate::collect::ArtifactDescriptor;
use crate::mapping::sample_names_by_run_prefix;
use crate::pairing::{resolve_read_pairs, WorkUnit};
use crate::report::ProgressReporter;
use crate::request::message::{JobRequest, ToolKind};

/// Explicit per-job configuration shared by every adapter
///
/// Reference database locations are passed in here rather than read from the
/// process environment, so a job is reproducible from its request and CLI
/// arguments alone.
pub struct ToolContext {
    pub out_dir: PathBuf,
    pub reference_dir: PathBuf,
}

/// Run one job end to end: resolve pairing, execute the tool, collect artifacts
pub fn run_job(
    request: &JobRequest,
    ctx: &ToolContext,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<ArtifactDescriptor>> {
    match request.tool {
        ToolKind::Sortmerna => sortmerna::run(request, ctx, reporter),
        ToolKind::Kneaddata => kneaddata::run(request, ctx, reporter),
        ToolKind::Trim => trim::run(request, ctx, reporter),
        ToolKind::Shogun => shogun::run(request, ctx, reporter),
    }
}

/// Generate the commands a job would run, without executing anything
pub fn generate_commands(
    request: &JobRequest,
    ctx: &ToolContext,
) -> Result<(Vec<String>, Vec<WorkUnit>)> {
    match request.tool {
        ToolKind::Sortmerna => sortmerna::generate_commands(request, ctx),
        ToolKind::Kneaddata => kneaddata::generate_commands(request, ctx),
        ToolKind::Trim => trim::generate_commands(request, ctx),
        ToolKind::Shogun => shogun::generate_commands(request, ctx),
    }
}

/// Reconstruct the per-sample work units a request describes
fn resolve_units(request: &JobRequest) -> Result<Vec<WorkUnit>> {
    let samples_by_prefix = sample_names_by_run_prefix(&request.mapping_file)?;
    let units = resolve_read_pairs(
        &request.files.raw_forward_seqs,
        &request.files.raw_reverse_seqs,
        &samples_by_prefix,
    )?;
    Ok(units)
}
