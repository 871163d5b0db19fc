//! Sequence QC and host read removal with KneadData
//!
//! One command per work unit, writing into a per-sample subdirectory named
//! after the run prefix. Paired runs produce paired and unmatched outputs for
//! both orientations; single-end runs produce one cleaned file.

use anyhow::{Context, Result};
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::collect::{collect_artifact, ArtifactDescriptor, OutputSpec};
use crate::exec::run_commands;
use crate::pairing::WorkUnit;
use crate::params::format_flag_params;
use crate::report::ProgressReporter;
use crate::request::message::JobRequest;
use crate::tools::{resolve_units, ToolContext};

const PAIRED_SUFFIXES: &[&str] = &[
    "{run_prefix}/{run_prefix}_paired_1.fastq",
    "{run_prefix}/{run_prefix}_paired_2.fastq",
    "{run_prefix}/{run_prefix}_unmatched_1.fastq",
    "{run_prefix}/{run_prefix}_unmatched_2.fastq",
];

const SINGLE_SUFFIXES: &[&str] = &["{run_prefix}/{run_prefix}.fastq"];

static TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/kneaddata.txt"));

#[derive(Serialize)]
struct CommandContext {
    forward: String,
    reverse: Option<String>,
    output: String,
    run_prefix: String,
    reference_db: Option<String>,
    params: String,
}

pub fn run(
    request: &JobRequest,
    ctx: &ToolContext,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<ArtifactDescriptor>> {
    reporter.update_step("Step 1 of 3: Generating KneadData commands");
    let (commands, units) = generate_commands(request, ctx)?;

    run_commands(
        &commands,
        "KneadData",
        "Step 2 of 3: Executing KneadData job",
        reporter,
    )?;

    reporter.update_step("Step 3 of 3: Generating new artifacts");
    let paired = !request.files.raw_reverse_seqs.is_empty();
    let artifact = collect_artifact(
        &ctx.out_dir,
        &units,
        &OutputSpec {
            name: "Filtered reads",
            artifact_type: "per_sample_FASTQ",
            suffixes: if paired { PAIRED_SUFFIXES } else { SINGLE_SUFFIXES },
            tool: "KneadData",
            compress: true,
        },
    )?;

    Ok(vec![artifact])
}

pub fn generate_commands(
    request: &JobRequest,
    ctx: &ToolContext,
) -> Result<(Vec<String>, Vec<WorkUnit>)> {
    let units = resolve_units(request)?;

    // the named reference db is resolved against the explicit reference dir
    let mut parameters = request.parameters.clone();
    let reference_db = parameters
        .remove("reference-db")
        .map(|db| ctx.reference_dir.join(db).display().to_string());
    let param_string = format_flag_params(&parameters);

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("kneaddata", TEMPLATE)
        .context("kneaddata command template")?;

    let mut commands = Vec::new();
    for unit in &units {
        let context = CommandContext {
            forward: unit.forward.display().to_string(),
            reverse: unit.reverse.as_ref().map(|r| r.display().to_string()),
            output: ctx.out_dir.join(&unit.run_prefix).display().to_string(),
            run_prefix: unit.run_prefix.clone(),
            reference_db: reference_db.clone(),
            params: param_string.clone(),
        };
        commands.push(tt.render("kneaddata", &context)?.trim().to_string());
    }

    Ok((commands, units))
}
