//! Adapters that run external shotgun sequencing QC tools on behalf of a
//! workflow orchestrator: reconstruct per-sample read pairs, generate and
//! execute tool commands, and collect the output files into typed artifacts.

use std::path::PathBuf;

pub mod collect;
pub mod exec;
pub mod mapping;
pub mod pairing;
pub mod params;
pub mod report;
pub mod request;
pub mod tools;

/// Parent directory for job output and the artifact registration payload
pub struct WorkingDirectory {
    pub path: PathBuf,
}
