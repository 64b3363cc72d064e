use std::fs;
use std::process::Command;
use std::time::Duration;

use eyre::{bail, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};

use packdown_core::script::{self, ENV_CONCURRENCY, ENV_PROGRESS_LOG};
use packdown_core::units::format_size;

use crate::cli::ApplyArgs;

/// Outcome of one transfer-script execution.
pub struct ExecutorResult {
    pub success: bool,
    pub output: String,
}

pub fn run_apply(args: &ApplyArgs) -> Result<()> {
    let contents = fs::read_to_string(&args.plan_file)
        .wrap_err_with(|| format!("reading plan file {}", args.plan_file.display()))?;
    let meta = script::parse_script_metadata(&contents)?;

    println!(
        "Plan from {}: {} pending move(s), {} ({} source volume(s))",
        meta.generated,
        meta.pending_moves,
        format_size(meta.total_bytes),
        meta.sources.len()
    );

    if args.dry_run {
        print!("{}", contents);
        return Ok(());
    }

    let concurrency = args.concurrency.unwrap_or(meta.concurrency).max(1);
    let progress_log = std::env::temp_dir().join("packdown-progress.log");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap()
            .tick_strings(&["-", "\\", "|", "/"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!(
        "Applying {} move(s) with concurrency {}",
        meta.pending_moves, concurrency
    ));

    let result = execute_script(args, concurrency, &progress_log)?;

    spinner.finish_and_clear();

    if !result.output.is_empty() {
        print!("{}", result.output);
    }
    if let Ok(progress) = fs::read_to_string(&progress_log) {
        for line in progress.lines() {
            println!("{}", line);
        }
    }

    if !result.success {
        bail!("transfer script failed; see output above");
    }
    println!("Applied {} move(s)", meta.pending_moves);
    Ok(())
}

fn execute_script(
    args: &ApplyArgs,
    concurrency: usize,
    progress_log: &std::path::Path,
) -> Result<ExecutorResult> {
    // Start the side-channel log fresh so the tail reflects this run only.
    let _ = fs::remove_file(progress_log);

    let output = Command::new("bash")
        .arg(&args.plan_file)
        .env(ENV_CONCURRENCY, concurrency.to_string())
        .env(ENV_PROGRESS_LOG, progress_log)
        .output()
        .wrap_err("launching bash")?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(ExecutorResult {
        success: output.status.success(),
        output: combined,
    })
}
