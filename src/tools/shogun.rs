//! Taxonomic and functional profiling with Shogun
//!
//! Paired reads are concatenated per work unit before profiling, and each
//! unit gets its own output subdirectory. Profiles are table files rather
//! than FASTQs, so this adapter gathers its outputs directly instead of going
//! through the read-designator collector; the emptiness guard is the same.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::collect::{ArtifactDescriptor, CollectError, FileRole};
use crate::exec::run_commands;
use crate::pairing::WorkUnit;
use crate::params::format_params;
use crate::report::ProgressReporter;
use crate::request::message::JobRequest;
use crate::tools::{resolve_units, ToolContext};

/// shogun flags and the parameter names the orchestrator uses for them
const PARAMS: &[(&str, &str)] = &[
    ("aligner", "Aligner tool"),
    ("capitalist", "Capitalist"),
    ("percent-id", "Percent identity"),
    ("threads", "Number of threads"),
];

/// taxonomy levels the strain-level profile is redistributed to
const LEVELS: &[&str] = &["phylum", "genus", "species"];

static PIPELINE_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/shogun.txt"));
static REDISTRIBUTE_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/data/templates/shogun_redistribute.txt"
));

#[derive(Serialize)]
struct PipelineContext {
    input: String,
    database: String,
    output: String,
    params: String,
}

#[derive(Serialize)]
struct RedistributeContext {
    database: String,
    level: String,
    input: String,
    output: String,
}

pub fn run(
    request: &JobRequest,
    ctx: &ToolContext,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<ArtifactDescriptor>> {
    reporter.update_step("Step 1 of 3: Generating Shogun commands");
    let (commands, units) = generate_commands(request, ctx)?;
    for unit in &units {
        let sample_dir = ctx.out_dir.join(&unit.run_prefix);
        fs::create_dir_all(&sample_dir)
            .with_context(|| format!("can't create {}", sample_dir.display()))?;
    }

    run_commands(
        &commands,
        "Shogun",
        "Step 2 of 3: Executing taxonomic profiling",
        reporter,
    )?;

    reporter.update_step("Step 3 of 3: Generating profile artifacts");
    let aligner = aligner_name(request)?;
    let artifacts = collect_profiles(&ctx.out_dir, &units, &aligner)?;
    Ok(artifacts)
}

pub fn generate_commands(
    request: &JobRequest,
    ctx: &ToolContext,
) -> Result<(Vec<String>, Vec<WorkUnit>)> {
    let units = resolve_units(request)?;

    // the named database is resolved against the explicit reference dir
    let mut parameters = request.parameters.clone();
    let database = parameters
        .remove("Database")
        .map(|db| ctx.reference_dir.join(db).display().to_string())
        .ok_or_else(|| anyhow!("Missing value for parameter: Database"))?;
    let param_string = format_params(&parameters, PARAMS)?;

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("pipeline", PIPELINE_TEMPLATE)
        .context("shogun pipeline template")?;
    tt.add_template("redistribute", REDISTRIBUTE_TEMPLATE)
        .context("shogun redistribute template")?;

    let mut commands = Vec::new();
    for unit in &units {
        let sample_dir = ctx.out_dir.join(&unit.run_prefix);

        // paired reads are profiled together: gzip members concatenate cleanly
        let input = match unit.reverse {
            Some(ref reverse) => {
                let combined = ctx
                    .out_dir
                    .join(format!("{}.combined.fastq.gz", unit.run_prefix));
                commands.push(format!(
                    "cat \"{}\" \"{}\" > \"{}\"",
                    unit.forward.display(),
                    reverse.display(),
                    combined.display()
                ));
                combined
            }
            None => unit.forward.clone(),
        };

        let pipeline = PipelineContext {
            input: input.display().to_string(),
            database: database.clone(),
            output: sample_dir.display().to_string(),
            params: param_string.clone(),
        };
        commands.push(tt.render("pipeline", &pipeline)?.trim().to_string());

        for level in LEVELS {
            let redistribute = RedistributeContext {
                database: database.clone(),
                level: level.to_string(),
                input: sample_dir.join("taxatable.txt").display().to_string(),
                output: sample_dir
                    .join(format!("taxatable.{level}.txt"))
                    .display()
                    .to_string(),
            };
            commands.push(tt.render("redistribute", &redistribute)?.trim().to_string());
        }
    }

    Ok((commands, units))
}

fn aligner_name(request: &JobRequest) -> Result<String> {
    request
        .parameters
        .get("Aligner tool")
        .cloned()
        .ok_or_else(|| anyhow!("Missing value for parameter: Aligner tool"))
}

fn alignment_file(aligner: &str) -> String {
    match aligner {
        "bowtie2" => "alignment.bowtie2.sam".to_string(),
        "utree" => "alignment.utree.tsv".to_string(),
        "burst" => "alignment.burst.b6".to_string(),
        other => format!("alignment.{other}.txt"),
    }
}

/// Gather the profile tables each work unit produced.
///
/// A unit missing an output is tolerated; an artifact with no files anywhere
/// is dropped; a batch where nothing was produced at all aborts the job.
fn collect_profiles(
    out_dir: &Path,
    units: &[WorkUnit],
    aligner: &str,
) -> Result<Vec<ArtifactDescriptor>, CollectError> {
    let mut outputs: Vec<(String, String)> = vec![(
        "Shogun Alignment Profile".to_string(),
        alignment_file(aligner),
    )];
    for level in LEVELS {
        outputs.push((
            format!("Taxonomic Predictions - {level}"),
            format!("taxatable.{level}.txt"),
        ));
    }

    let mut artifacts = Vec::new();
    for (name, file_name) in outputs {
        let files: Vec<(PathBuf, FileRole)> = units
            .iter()
            .map(|unit| out_dir.join(&unit.run_prefix).join(&file_name))
            .filter(|path| path.exists())
            .map(|path| (path, FileRole::Other))
            .collect();

        if !files.is_empty() {
            artifacts.push(ArtifactDescriptor {
                name,
                artifact_type: "BIOM".to_string(),
                files,
            });
        }
    }

    if artifacts.is_empty() {
        return Err(CollectError::NoOutput("Shogun".to_string()));
    }

    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;

    use crate::request::message::{InputFiles, ToolKind};

    use super::*;

    const MAPPING_FILE: &str = "\
#SampleID\tplatform\trun_prefix\tDescription
SKB8.640193\tILLUMINA\ts1\tdesc2
";

    fn request(dir: &TempDir) -> JobRequest {
        let mapping_file = dir.path().join("mapping.txt");
        fs::write(&mapping_file, MAPPING_FILE).unwrap();

        let parameters: BTreeMap<String, String> = [
            ("Database", "wol"),
            ("Aligner tool", "bowtie2"),
            ("Number of threads", "5"),
            ("Capitalist", "False"),
            ("Percent identity", "0.95"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        JobRequest {
            job_id: "job-4".to_string(),
            tool: ToolKind::Shogun,
            parameters,
            files: InputFiles {
                raw_forward_seqs: vec![PathBuf::from("fastq/s1.fastq.gz")],
                raw_reverse_seqs: vec![PathBuf::from("fastq/s1.R2.fastq.gz")],
            },
            mapping_file,
        }
    }

    #[test]
    fn paired_unit_concatenates_then_profiles_and_redistributes() {
        let dir = TempDir::new().unwrap();
        let request = request(&dir);
        let ctx = ToolContext {
            out_dir: PathBuf::from("output"),
            reference_dir: PathBuf::from("/db"),
        };

        let (commands, units) = generate_commands(&request, &ctx).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(commands.len(), 5);
        assert_eq!(
            commands[0],
            "cat \"fastq/s1.fastq.gz\" \"fastq/s1.R2.fastq.gz\" > \"output/s1.combined.fastq.gz\""
        );
        assert_eq!(
            commands[1],
            "shogun pipeline --input output/s1.combined.fastq.gz --database /db/wol \
             --output output/s1 --aligner bowtie2 --percent-id 0.95 --threads 5"
        );
        assert_eq!(
            commands[2],
            "shogun redistribute --database /db/wol --level phylum \
             --input output/s1/taxatable.txt --output output/s1/taxatable.phylum.txt"
        );
    }

    #[test]
    fn profile_collection_tolerates_missing_levels_but_not_total_emptiness() {
        let dir = TempDir::new().unwrap();
        let unit = WorkUnit {
            run_prefix: "s1".to_string(),
            sample_id: "SKB8.640193".to_string(),
            forward: PathBuf::from("fastq/s1.fastq.gz"),
            reverse: None,
        };

        let err = collect_profiles(dir.path(), &[unit.clone()], "bowtie2").unwrap_err();
        assert!(matches!(err, CollectError::NoOutput(ref tool) if tool == "Shogun"));

        fs::create_dir_all(dir.path().join("s1")).unwrap();
        fs::write(dir.path().join("s1/alignment.bowtie2.sam"), "sam").unwrap();
        fs::write(dir.path().join("s1/taxatable.species.txt"), "table").unwrap();

        let artifacts = collect_profiles(dir.path(), &[unit], "bowtie2").unwrap();
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Shogun Alignment Profile", "Taxonomic Predictions - species"]
        );
        assert!(artifacts
            .iter()
            .all(|a| a.artifact_type == "BIOM"
                && a.files.iter().all(|(_, role)| *role == FileRole::Other)));
    }
}
