use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

fn size_arg(value: &str) -> Result<u64, String> {
    packdown_core::units::parse_size(value).map_err(|err| err.to_string())
}

fn threshold_arg(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("not a decimal: {}", value))?;
    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("{} is outside [0, 1]", parsed))
    }
}

#[derive(Parser)]
#[command(name = "packdown")]
#[command(about = "Consolidate files across JBOD volumes by planning bulk moves")]
#[command(after_help = "Run '<command> --help' for detailed options on each command.")]
pub struct Cli {
    /// Emit debug-level log output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute a consolidation plan and persist its transfer script
    Plan(PlanArgs),
    /// Execute a persisted transfer script
    Apply(ApplyArgs),
    /// Print a persisted transfer script
    Show(ShowArgs),
    /// Serve the planner over HTTP for the browser UI
    Web(WebArgs),
}

#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Volume mount points participating in the consolidation set
    #[arg(required = true)]
    pub volumes: Vec<PathBuf>,
    /// Only evacuate these source volumes (repeatable)
    #[arg(long = "src", value_name = "VOLUME")]
    pub src: Vec<String>,
    /// Only place files onto these destination volumes (repeatable)
    #[arg(long = "dest", value_name = "VOLUME")]
    pub dest: Vec<String>,
    /// Stop once the next source holds less than this much placeable data
    #[arg(long, value_parser = size_arg, default_value = "0", value_name = "SIZE")]
    pub min_space: u64,
    /// Ignore files smaller than this
    #[arg(long, value_parser = size_arg, default_value = "0", value_name = "SIZE")]
    pub min_file_size: u64,
    /// Only consider files under these path prefixes (repeatable)
    #[arg(long = "path-filter", value_name = "PREFIX")]
    pub path_filter: Vec<String>,
    /// Only consider files matching these glob patterns (repeatable)
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,
    /// Drop files matching these glob patterns (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,
    /// Folders totalling less than this are moved whole
    #[arg(long, value_parser = size_arg, default_value = "1GB", value_name = "SIZE")]
    pub min_split_size: u64,
    /// Move a folder whole when its largest file reaches this share of its total
    #[arg(long, value_parser = threshold_arg, default_value = "0.9", value_name = "RATIO")]
    pub move_as_folder_threshold: f64,
    /// Free space to leave untouched on every destination
    #[arg(long, value_parser = size_arg, default_value = "1GB", value_name = "SIZE")]
    pub reserve: u64,
    /// Use first-fit target selection instead of best-fit
    #[arg(long)]
    pub first_fit: bool,
    /// Where to write the transfer script
    #[arg(long, default_value = "packdown-plan.sh", value_name = "PATH")]
    pub plan_file: PathBuf,
    /// Overwrite an existing plan file
    #[arg(long)]
    pub force: bool,
    /// Also write the audit trail JSON next to the plan file
    #[arg(long)]
    pub debug: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ApplyArgs {
    /// Transfer script to execute
    #[arg(long, default_value = "packdown-plan.sh", value_name = "PATH")]
    pub plan_file: PathBuf,
    /// Simultaneous copy batches (defaults to the value recorded in the plan)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
    /// Print what would run without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    /// Transfer script to print
    #[arg(long, default_value = "packdown-plan.sh", value_name = "PATH")]
    pub plan_file: PathBuf,
}

#[derive(Args, Clone, Debug)]
pub struct WebArgs {
    /// Volume mount points participating in the consolidation set
    #[arg(required = true)]
    pub volumes: Vec<PathBuf>,
    /// Port to listen on
    #[arg(long, default_value_t = 8720)]
    pub port: u16,
}
