//! Ribosomal read filtering with SortMeRNA
//!
//! One command per read orientation per work unit. The tool splits each input
//! into ribosomal (aligned) and non-ribosomal (other) reads, which become two
//! separate artifacts.

use std::path::Path;

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

/// sortmerna flags and the parameter names the orchestrator uses for them
const PARAMS: &[(&str, &str)] = &[
    ("a", "Number of threads"),
    ("blast", "Output blast format"),
    ("m", "Memory"),
    ("num_alignments", "Number of alignments"),
];

/// rRNA databases screened against, as fasta/index basenames under the reference directory
const RNA_REF_DBS: &[&str] = &[
    "silva-arc-23s-id98",
    "silva-bac-16s-id90",
    "silva-bac-23s-id98",
    "silva-arc-16s-id95",
    "silva-euk-18s-id95",
    "silva-euk-28s-id98",
    "rfam-5s-database-id98",
    "rfam-5.8s-database-id98",
];

static TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/sortmerna.txt"));

#[derive(Serialize)]
struct CommandContext {
    ref_db: String,
    reads: String,
    aligned: String,
    other: String,
    params: String,
}

pub fn run(
    request: &JobRequest,
    ctx: &ToolContext,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<ArtifactDescriptor>> {
    reporter.update_step("Step 1 of 4: Generating SortMeRNA commands");
    let (commands, units) = generate_commands(request, ctx)?;

    run_commands(
        &commands,
        "Sortmerna",
        "Step 2 of 4: Executing ribosomal read filtering",
        reporter,
    )?;

    reporter.update_step("Step 3 of 4: Generating artifacts for Nonribosomal reads");
    let nonribosomal = collect_artifact(
        &ctx.out_dir,
        &units,
        &OutputSpec {
            name: "Non-ribosomal reads",
            artifact_type: "per_sample_FASTQ",
            suffixes: &[
                "{run_prefix}.nonribosomal.R1.fastq",
                "{run_prefix}.nonribosomal.R2.fastq",
            ],
            tool: "Sortmerna",
            compress: true,
        },
    )?;

    reporter.update_step("Step 4 of 4: Generating artifacts for Ribosomal reads");
    let ribosomal = collect_artifact(
        &ctx.out_dir,
        &units,
        &OutputSpec {
            name: "Ribosomal reads",
            artifact_type: "per_sample_FASTQ",
            suffixes: &[
                "{run_prefix}.ribosomal.R1.fastq",
                "{run_prefix}.ribosomal.R2.fastq",
            ],
            tool: "Sortmerna",
            compress: true,
        },
    )?;

    Ok(vec![nonribosomal, ribosomal])
}

pub fn generate_commands(
    request: &JobRequest,
    ctx: &ToolContext,
) -> Result<(Vec<String>, Vec<WorkUnit>)> {
    let units = resolve_units(request)?;
    let param_string = format_params(&request.parameters, PARAMS)?;
    let ref_db = ref_db_arg(&ctx.reference_dir);

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("sortmerna", TEMPLATE)
        .context("sortmerna command template")?;

    let mut commands = Vec::new();
    for unit in &units {
        commands.push(render(&tt, &ref_db, &param_string, &unit.forward, ctx, &unit.run_prefix, "R1")?);
        if let Some(ref reverse) = unit.reverse {
            commands.push(render(&tt, &ref_db, &param_string, reverse, ctx, &unit.run_prefix, "R2")?);
        }
    }

    Ok((commands, units))
}

fn render(
    tt: &TinyTemplate,
    ref_db: &str,
    params: &str,
    reads: &Path,
    ctx: &ToolContext,
    run_prefix: &str,
    orientation: &str,
) -> Result<String> {
    let context = CommandContext {
        ref_db: ref_db.to_string(),
        reads: reads.display().to_string(),
        aligned: ctx
            .out_dir
            .join(format!("{run_prefix}.ribosomal.{orientation}"))
            .display()
            .to_string(),
        other: ctx
            .out_dir
            .join(format!("{run_prefix}.nonribosomal.{orientation}"))
            .display()
            .to_string(),
        params: params.to_string(),
    };
    Ok(tt.render("sortmerna", &context)?.trim().to_string())
}

/// Colon-separated fasta,index pairs (the sortmerna --ref argument)
fn ref_db_arg(reference_dir: &Path) -> String {
    RNA_REF_DBS
        .iter()
        .map(|db| format!("{0}/{1}.fasta,{0}/{1}.idx", reference_dir.display(), db))
        .collect::<Vec<_>>()
        .join(":")
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
SKD8.640184\tILLUMINA\ts2\tdesc3
";

    fn request(dir: &TempDir, forward: &[&str], reverse: &[&str]) -> JobRequest {
        let mapping_file = dir.path().join("mapping.txt");
        fs::write(&mapping_file, MAPPING_FILE).unwrap();

        let parameters: BTreeMap<String, String> = [
            ("Output blast format", "1"),
            ("Number of alignments", "1"),
            ("Memory", "29696"),
            ("Number of threads", "5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        JobRequest {
            job_id: "job-1".to_string(),
            tool: ToolKind::Sortmerna,
            parameters,
            files: InputFiles {
                raw_forward_seqs: forward.iter().map(PathBuf::from).collect(),
                raw_reverse_seqs: reverse.iter().map(PathBuf::from).collect(),
            },
            mapping_file,
        }
    }

    #[test]
    fn generates_one_command_per_orientation() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir, &["fastq/s1.fastq.gz"], &["fastq/s1.R2.fastq.gz"]);
        let ctx = ToolContext {
            out_dir: PathBuf::from("output"),
            reference_dir: PathBuf::from("/db"),
        };

        let (commands, units) = generate_commands(&request, &ctx).unwrap();

        let ref_db = ref_db_arg(&ctx.reference_dir);
        assert_eq!(
            commands,
            vec![
                format!(
                    "sortmerna --ref {ref_db} --reads fastq/s1.fastq.gz \
                     --aligned output/s1.ribosomal.R1 --other output/s1.nonribosomal.R1 \
                     --fastx -a 5 --blast 1 -m 29696 --num_alignments 1"
                ),
                format!(
                    "sortmerna --ref {ref_db} --reads fastq/s1.R2.fastq.gz \
                     --aligned output/s1.ribosomal.R2 --other output/s1.nonribosomal.R2 \
                     --fastx -a 5 --blast 1 -m 29696 --num_alignments 1"
                ),
            ]
        );

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].run_prefix, "s1");
        assert_eq!(units[0].sample_id, "SKB8.640193");
    }

    #[test]
    fn reference_databases_live_under_the_reference_dir() {
        let ref_db = ref_db_arg(&PathBuf::from("/db"));
        assert!(ref_db.starts_with("/db/silva-arc-23s-id98.fasta,/db/silva-arc-23s-id98.idx:"));
        assert!(ref_db.ends_with("/db/rfam-5.8s-database-id98.fasta,/db/rfam-5.8s-database-id98.idx"));
        assert_eq!(ref_db.matches(':').count(), 7);
    }

    #[test]
    fn forward_only_batch_generates_no_reverse_commands() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir, &["fastq/s1.fastq.gz", "fastq/s2.fastq.gz"], &[]);
        let ctx = ToolContext {
            out_dir: PathBuf::from("output"),
            reference_dir: PathBuf::from("/db"),
        };

        let (commands, units) = generate_commands(&request, &ctx).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(units.len(), 2);
        assert!(commands.iter().all(|c| !c.contains(".R2")));
    }
}
