use std::fs;
use std::path::{Path, PathBuf};

use eyre::{bail, Result, WrapErr};

use packdown_core::filter::FilterCriteria;
use packdown_core::model::WorldView;
use packdown_core::probe::SpaceProbe;
use packdown_core::scan::{scan_volumes, ScanOptions};
use packdown_core::script;
use packdown_core::units::format_size;
use packdown_core::{audit, packer, FitPolicy, PlanOptions};

use crate::cli::PlanArgs;

/// Probe and scan the volume set into a planner input snapshot.
pub fn build_world(volume_paths: &[PathBuf]) -> Result<WorldView> {
    let probe = SpaceProbe::new();
    let mut volumes = Vec::with_capacity(volume_paths.len());
    for path in volume_paths {
        let Some(state) = probe.volume_state(path) else {
            bail!("no mount hosts volume {}", path.display());
        };
        volumes.push(state);
    }

    let files = scan_volumes(volume_paths, &ScanOptions::default())?;
    log::info!(
        "scanned {} file(s) across {} volume(s)",
        files.len(),
        volumes.len()
    );

    Ok(WorldView { volumes, files })
}

pub fn plan_options(args: &PlanArgs) -> PlanOptions {
    PlanOptions {
        filter: FilterCriteria {
            min_size_bytes: args.min_file_size,
            path_prefixes: args.path_filter.clone(),
            include_patterns: args.include.clone(),
            exclude_patterns: args.exclude.clone(),
        },
        min_split_size: args.min_split_size,
        folder_threshold: args.move_as_folder_threshold,
        min_free_reserve: args.reserve,
        min_space: args.min_space,
        source_volumes: args.src.clone(),
        target_volumes: args.dest.clone(),
        fit_policy: if args.first_fit {
            FitPolicy::FirstFit
        } else {
            FitPolicy::BestFit
        },
        ..Default::default()
    }
}

pub fn run_plan(args: &PlanArgs) -> Result<()> {
    if args.plan_file.exists() && !args.force {
        bail!(
            "plan file {} already exists (pass --force to overwrite)",
            args.plan_file.display()
        );
    }

    let world = build_world(&args.volumes)?;
    let options = plan_options(args);
    let outcome = packer::plan_moves(&world, &options)?;

    // The scanner snapshot can race against reality; drop moves whose source
    // vanished instead of shipping a script that would abort mid-run.
    let mut moves = outcome.plan.moves;
    let demoted = script::mark_missing_sources(&mut moves, |path| Path::new(path).exists());
    if demoted > 0 {
        log::warn!("{} planned move(s) lost their source file since scanning", demoted);
    }
    let plan = script::materialize(moves);

    let concurrency = plan.summary.moves_by_target.len().max(1);
    let generated = chrono::Local::now().format("%Y-%m-%d").to_string();
    let contents = script::render_script(&plan, &generated, concurrency);
    script::write_script(&args.plan_file, &contents)?;

    if args.debug {
        let audit_path = PathBuf::from(format!("{}.audit.json", args.plan_file.display()));
        let json = audit::export_json(&outcome.audit).wrap_err("rendering audit trail")?;
        fs::write(&audit_path, json)
            .wrap_err_with(|| format!("writing audit trail {}", audit_path.display()))?;
        log::info!("audit trail written to {}", audit_path.display());
    }

    println!(
        "Planned {} move(s), {} total -> {}",
        plan.summary.total_files,
        format_size(plan.summary.total_bytes),
        args.plan_file.display()
    );
    for (target, count) in &plan.summary.moves_by_target {
        let bytes = plan.summary.bytes_by_target.get(target).copied().unwrap_or(0);
        println!("  {}: {} file(s), {}", target, count, format_size(bytes));
    }
    let skipped = plan.skipped_count();
    if skipped > 0 {
        log::warn!("{} move(s) skipped for lack of space", skipped);
    }

    Ok(())
}
