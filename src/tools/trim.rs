//! Adapter and quality trimming with Atropos
//!
//! One command per work unit. The adapter owns the output filenames (passed
//! to atropos via -o/-p), so trimmed files follow the shared read-designator
//! convention and come out of the tool already gzipped.

use anyhow::{Context, Result};
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::collect::{collect_artifact, ArtifactDescriptor, OutputSpec};
use crate::exec::run_commands;
use crate::pairing::WorkUnit;
use crate::params::format_params;
use crate::report::ProgressReporter;
use crate::request::message::JobRequest;
use crate::tools::{resolve_units, ToolContext};

/// atropos flags and the parameter names the orchestrator uses for them
const PARAMS: &[(&str, &str)] = &[
    ("adapter", "Fwd read adapter"),
    ("A", "Rev read adapter"),
    ("quality-cutoff", "Trim low-quality bases"),
    ("minimum-length", "Minimum trimmed read length"),
    ("pair-filter", "Pair-end read required to match"),
    ("max-n", "Maximum number of N bases in a read to keep it"),
    ("trim-n", "Trim Ns on ends of reads"),
    ("threads", "Number of threads used"),
    ("nextseq-trim", "NextSeq-specific quality trimming"),
];

static TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/trim.txt"));

#[derive(Serialize)]
struct CommandContext {
    params: String,
    forward: String,
    reverse: Option<String>,
    forward_out: String,
    reverse_out: String,
}

pub fn run(
    request: &JobRequest,
    ctx: &ToolContext,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<ArtifactDescriptor>> {
    reporter.update_step("Step 1 of 3: Generating Atropos commands");
    let (commands, units) = generate_commands(request, ctx)?;

    run_commands(
        &commands,
        "Atropos",
        "Step 2 of 3: Executing read trimming",
        reporter,
    )?;

    reporter.update_step("Step 3 of 3: Generating new artifacts");
    let artifact = collect_artifact(
        &ctx.out_dir,
        &units,
        &OutputSpec {
            name: "Adapter trimmed reads",
            artifact_type: "per_sample_FASTQ",
            suffixes: &[
                "{run_prefix}.trimmed.R1.fastq.gz",
                "{run_prefix}.trimmed.R2.fastq.gz",
            ],
            tool: "Atropos",
            // atropos writes gzipped output directly
            compress: false,
        },
    )?;

    Ok(vec![artifact])
}

pub fn generate_commands(
    request: &JobRequest,
    ctx: &ToolContext,
) -> Result<(Vec<String>, Vec<WorkUnit>)> {
    let units = resolve_units(request)?;
    let param_string = format_params(&request.parameters, PARAMS)?;

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("trim", TEMPLATE)
        .context("trim command template")?;

    let mut commands = Vec::new();
    for unit in &units {
        let context = CommandContext {
            params: param_string.clone(),
            forward: unit.forward.display().to_string(),
            reverse: unit.reverse.as_ref().map(|r| r.display().to_string()),
            forward_out: ctx
                .out_dir
                .join(format!("{}.trimmed.R1.fastq.gz", unit.run_prefix))
                .display()
                .to_string(),
            reverse_out: ctx
                .out_dir
                .join(format!("{}.trimmed.R2.fastq.gz", unit.run_prefix))
                .display()
                .to_string(),
        };
        commands.push(tt.render("trim", &context)?.trim().to_string());
    }

    Ok((commands, units))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::request::message::{InputFiles, ToolKind};

    use super::*;

    const MAPPING_FILE: &str = "\
#SampleID\tplatform\trun_prefix\tDescription
SKB8.640193\tILLUMINA\ts1\tdesc2
";

    fn request(dir: &TempDir, reverse: &[&str]) -> JobRequest {
        let mapping_file = dir.path().join("mapping.txt");
        fs::write(&mapping_file, MAPPING_FILE).unwrap();

        let parameters: BTreeMap<String, String> = [
            ("Fwd read adapter", "GATCGGAAGAGCACACGTCTGAACTCCAGTCAC"),
            ("Rev read adapter", "GATCGGAAGAGCGTCGTGTAGGGAAAGAGTGT"),
            ("Trim low-quality bases", "15"),
            ("Minimum trimmed read length", "80"),
            ("Pair-end read required to match", "any"),
            ("Maximum number of N bases in a read to keep it", "80"),
            ("Trim Ns on ends of reads", "True"),
            ("Number of threads used", "5"),
            ("NextSeq-specific quality trimming", "False"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        JobRequest {
            job_id: "job-3".to_string(),
            tool: ToolKind::Trim,
            parameters,
            files: InputFiles {
                raw_forward_seqs: vec![PathBuf::from("fastq/s1.fastq.gz")],
                raw_reverse_seqs: reverse.iter().map(PathBuf::from).collect(),
            },
            mapping_file,
        }
    }

    #[test]
    fn paired_command_uses_pe_arguments_and_prefix_named_outputs() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir, &["fastq/s1.R2.fastq.gz"]);
        let ctx = ToolContext {
            out_dir: PathBuf::from("output"),
            reference_dir: PathBuf::from("/db"),
        };

        let (commands, _) = generate_commands(&request, &ctx).unwrap();
        assert_eq!(
            commands,
            vec![
                "atropos trim -A GATCGGAAGAGCGTCGTGTAGGGAAAGAGTGT \
                 --adapter GATCGGAAGAGCACACGTCTGAACTCCAGTCAC --max-n 80 --minimum-length 80 \
                 --pair-filter any --quality-cutoff 15 --threads 5 --trim-n \
                 -o output/s1.trimmed.R1.fastq.gz -p output/s1.trimmed.R2.fastq.gz \
                 -pe1 fastq/s1.fastq.gz -pe2 fastq/s1.R2.fastq.gz"
                    .to_string()
            ]
        );
    }

    #[test]
    fn single_end_command_uses_se_argument() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir, &[]);
        let ctx = ToolContext {
            out_dir: PathBuf::from("output"),
            reference_dir: PathBuf::from("/db"),
        };

        let (commands, _) = generate_commands(&request, &ctx).unwrap();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].contains("-se fastq/s1.fastq.gz"));
        assert!(commands[0].contains("-o output/s1.trimmed.R1.fastq.gz"));
        assert!(!commands[0].contains("-pe1"));
    }
}
