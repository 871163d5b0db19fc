use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use seula::report::{write_registration, LogReporter};
use seula::request::message::Message;
use seula::request::schema::load_schema;
use seula::tools::{self, ToolContext};
use seula::WorkingDirectory;

/// Run one orchestrator job: validate the request, invoke the tool, register artifacts
#[derive(Parser, Debug)]
#[command(name = "seula")]
#[command(about = "Adapters for shotgun sequencing QC and profiling tools")]
struct Args {
    /// Path to the job request message (JSON)
    #[arg(long)]
    request: PathBuf,

    /// Directory containing the job request JSON schemas
    #[arg(long)]
    schema_dir: PathBuf,

    /// Job working directory: tool output and the artifact registration land here
    #[arg(long)]
    work_dir: PathBuf,

    /// Directory containing the reference databases
    #[arg(long)]
    reference_dir: PathBuf,

    /// Print the generated commands without executing anything
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let schema = load_schema(&args.schema_dir)?;
    let message = Message {
        path: args.request,
        compiled_schema: schema,
    };
    let request = message.read()?;
    info!("Starting job {} ({})", request.job_id, request.tool);

    let wd = WorkingDirectory { path: args.work_dir };
    let out_dir = wd.path.join(&request.job_id);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("can't create {}", out_dir.display()))?;

    let ctx = ToolContext {
        out_dir,
        reference_dir: args.reference_dir,
    };

    if args.dry_run {
        let (commands, units) = tools::generate_commands(&request, &ctx)?;
        info!(
            "--dry-run set, {} commands for {} work units",
            commands.len(),
            units.len()
        );
        for cmd in commands {
            println!("{cmd}");
        }
        return Ok(());
    }

    let reporter = LogReporter;
    let artifacts = tools::run_job(&request, &ctx, &reporter)?;
    let registration = write_registration(&wd.path, &request.job_id, &artifacts)?;
    info!(
        "Job {} finished, artifacts registered at {}",
        request.job_id,
        registration.display()
    );

    Ok(())
}
