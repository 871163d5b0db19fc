//! Collect tool output files into typed artifacts
//!
//! After a tool has run, each adapter knows which files it should have written
//! per work unit (suffix templates keyed by run prefix). This module scans the
//! output directory for them, classifies each hit as a forward/reverse/other
//! read file, optionally gzips it, and wraps the survivors into an artifact
//! descriptor. A sample losing some of its outputs (e.g. all reverse reads
//! filtered away upstream) is fine; a tool producing nothing at all is fatal.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::pairing::WorkUnit;

/// Semantic slot of an output file within an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    Forward,
    Reverse,
    Other,
}

/// An output artifact handed back to the orchestrator for registration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactDescriptor {
    pub name: String,
    pub artifact_type: String,
    pub files: Vec<(PathBuf, FileRole)>,
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("No sequences left after {0}")]
    NoOutput(String),

    #[error("File {0} has an unexpected name")]
    UnexpectedFileName(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What one artifact of a tool run should look like on disk
///
/// Each suffix template contains a `{run_prefix}` placeholder and is resolved
/// against the output directory for every work unit. With `compress` set,
/// matched files are gzipped and the `.gz` path is the one recorded.
pub struct OutputSpec<'a> {
    pub name: &'a str,
    pub artifact_type: &'a str,
    pub suffixes: &'a [&'a str],
    pub tool: &'a str,
    pub compress: bool,
}

/// Reconcile the files a tool actually produced with the files it should have
///
/// Missing candidates are tolerated per sample, but if no candidate exists for
/// the whole batch the tool consumed every read and the job must fail.
pub fn collect_artifact(
    out_dir: &Path,
    units: &[WorkUnit],
    spec: &OutputSpec,
) -> Result<ArtifactDescriptor, CollectError> {
    let mut files: Vec<(PathBuf, FileRole)> = Vec::new();
    let mut missing: Vec<PathBuf> = Vec::new();

    for unit in units {
        for suffix in spec.suffixes {
            let candidate = out_dir.join(suffix.replace("{run_prefix}", &unit.run_prefix));
            if candidate.exists() {
                let role = classify(&candidate)?;
                let path = if spec.compress {
                    gzip_file(&candidate)?
                } else {
                    candidate
                };
                files.push((path, role));
            } else {
                missing.push(candidate);
            }
        }
    }

    for path in &missing {
        debug!("{} did not produce {}", spec.tool, path.display());
    }

    if files.is_empty() {
        return Err(CollectError::NoOutput(spec.tool.to_string()));
    }

    Ok(ArtifactDescriptor {
        name: spec.name.to_string(),
        artifact_type: spec.artifact_type.to_string(),
        files,
    })
}

/// Classify an output file by its read designator.
///
/// The suffix templates are controlled by the adapters, so every candidate
/// must name a FASTQ (optionally gzipped): `R1.fastq`/`_1.fastq` endings mark
/// forward reads, `R2.fastq`/`_2.fastq` reverse reads, and a plain `.fastq`
/// with no designator is an unpaired output. Anything else is a caller bug.
fn classify(path: &Path) -> Result<FileRole, CollectError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".gz").unwrap_or(&name);

    if !stem.ends_with(".fastq") {
        return Err(CollectError::UnexpectedFileName(path.display().to_string()));
    }
    if stem.ends_with("R2.fastq") || stem.ends_with("_2.fastq") {
        Ok(FileRole::Reverse)
    } else if stem.ends_with("R1.fastq") || stem.ends_with("_1.fastq") {
        Ok(FileRole::Forward)
    } else {
        Ok(FileRole::Other)
    }
}

/// Gzip a matched output file, returning the `.gz` path to record.
///
/// The uncompressed original is left in place; the recorded artifact always
/// points at the compressed copy.
fn gzip_file(path: &Path) -> Result<PathBuf, CollectError> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let mut input = File::open(path)?;
    let output = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    Ok(gz_path)
}
