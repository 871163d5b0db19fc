//! Run generated tool commands through the shell
//!
//! Commands run sequentially; the step message is reported before each one so
//! the orchestrator can show progress. A non-zero exit aborts the job with the
//! command's stdout, stderr, and the command text in the error message.

use std::process::Command;

use anyhow::{bail, Context, Result};
use log::info;

use crate::report::ProgressReporter;

pub fn run_commands(
    commands: &[String],
    tool: &str,
    step_msg: &str,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let total = commands.len();
    for (i, cmd) in commands.iter().enumerate() {
        reporter.update_step(&format!("{step_msg} ({}/{total})", i + 1));
        info!("Running command: {cmd}");

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .with_context(|| format!("failed to execute {tool} process"))?;

        if !output.status.success() {
            let std_out = String::from_utf8_lossy(&output.stdout);
            let std_err = String::from_utf8_lossy(&output.stderr);
            bail!(
                "Error running {tool}:\nStd out: {std_out}\nStd err: {std_err}\
                 \n\nCommand run was:\n{cmd}"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct RecordingReporter {
        steps: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn update_step(&self, message: &str) {
            self.steps.lock().unwrap().push(message.to_string());
        }
    }

    fn reporter() -> RecordingReporter {
        RecordingReporter { steps: Mutex::new(Vec::new()) }
    }

    #[test]
    fn reports_progress_per_command() {
        let reporter = reporter();
        let commands = vec!["true".to_string(), "true".to_string()];

        run_commands(&commands, "Sortmerna", "Step 2 of 4: Executing", &reporter).unwrap();

        assert_eq!(
            *reporter.steps.lock().unwrap(),
            vec![
                "Step 2 of 4: Executing (1/2)".to_string(),
                "Step 2 of 4: Executing (2/2)".to_string(),
            ]
        );
    }

    #[test]
    fn failing_command_aborts_with_its_output() {
        let reporter = reporter();
        let commands = vec![
            "echo before".to_string(),
            "echo boom >&2; exit 3".to_string(),
            "echo never".to_string(),
        ];

        let err = run_commands(&commands, "KneadData", "Executing", &reporter).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Error running KneadData"));
        assert!(message.contains("boom"));
        assert!(message.contains("exit 3"));
        // third command never ran
        assert_eq!(reporter.steps.lock().unwrap().len(), 2);
    }
}
