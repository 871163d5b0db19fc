//! Recover read pairing information from raw file lists
//!
//! The orchestrator hands over unordered collections of forward and reverse
//! read filepaths plus a run prefix -> sample name table. This module
//! reconstructs the (run prefix, sample, forward, reverse) work units that
//! every adapter generates commands from. Pairing is conservative: any layout
//! that is ambiguous or inconsistent with the metadata fails the whole batch.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// One physical sequencing run for one sample
///
/// The filenames of `forward` and `reverse` (when present) always start with
/// `run_prefix`, and a resolved batch never contains the same prefix twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub run_prefix: String,
    pub sample_id: String,
    pub forward: PathBuf,
    pub reverse: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("Your reverse and forward files are of different length. \
             Forward: {forward}. Reverse: {reverse}.")]
    LengthMismatch { forward: String, reverse: String },

    #[error("No run prefix matching this fwd read: {0}")]
    NoPrefixMatch(String),

    #[error("Multiple run prefixes match this fwd read: {0}")]
    AmbiguousPrefix(String),

    #[error("This run prefix matches multiple fwd reads: {0}")]
    PrefixReused(String),

    #[error("Reverse read does not match this run prefix.\n\
             Run prefix: {run_prefix}\nForward read: {forward}\nReverse read: {reverse}")]
    ReverseMismatch {
        run_prefix: String,
        forward: String,
        reverse: String,
    },
}

/// Match forward reads (and their positional reverse mates) to run prefixes.
///
/// Both file lists are sorted lexicographically and paired positionally, so
/// the result does not depend on input order. Each forward filename must
/// start with exactly one run prefix from the table, each prefix may be used
/// at most once, and a paired reverse filename must start with the same
/// prefix. Returns one work unit per forward read, ordered by forward path;
/// any violation fails the whole batch with no partial result.
pub fn resolve_read_pairs(
    forward_seqs: &[PathBuf],
    reverse_seqs: &[PathBuf],
    samples_by_prefix: &BTreeMap<String, String>,
) -> Result<Vec<WorkUnit>, PairingError> {
    let mut forward = forward_seqs.to_vec();
    forward.sort();

    let mut reverse = reverse_seqs.to_vec();
    if !reverse.is_empty() {
        if forward.len() != reverse.len() {
            return Err(PairingError::LengthMismatch {
                forward: join_paths(&forward),
                reverse: join_paths(&reverse),
            });
        }
        reverse.sort();
    }

    let mut units: Vec<WorkUnit> = Vec::with_capacity(forward.len());
    let mut used_prefixes: BTreeSet<&str> = BTreeSet::new();

    for (i, fwd_fp) in forward.iter().enumerate() {
        let fwd_fn = base_name(fwd_fp);

        // exactly one run prefix may match the forward filename
        let mut matched: Option<(&str, &str)> = None;
        for (prefix, sample) in samples_by_prefix {
            if fwd_fn.starts_with(prefix.as_str()) {
                if matched.is_some() {
                    return Err(PairingError::AmbiguousPrefix(fwd_fn));
                }
                matched = Some((prefix.as_str(), sample.as_str()));
            }
        }
        let (run_prefix, sample_id) = match matched {
            Some(pair) => pair,
            None => return Err(PairingError::NoPrefixMatch(fwd_fn)),
        };

        if !used_prefixes.insert(run_prefix) {
            return Err(PairingError::PrefixReused(run_prefix.to_string()));
        }

        let rev_fp = reverse.get(i).cloned();
        if let Some(ref rev) = rev_fp {
            let rev_fn = base_name(rev);
            if !rev_fn.starts_with(run_prefix) {
                return Err(PairingError::ReverseMismatch {
                    run_prefix: run_prefix.to_string(),
                    forward: fwd_fn,
                    reverse: rev_fn,
                });
            }
        }

        units.push(WorkUnit {
            run_prefix: run_prefix.to_string(),
            sample_id: sample_id.to_string(),
            forward: fwd_fp.clone(),
            reverse: rev_fp,
        });
    }

    Ok(units)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
