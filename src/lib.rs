// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod project;
pub mod registry;
pub mod template;
pub mod tools;
pub mod types;
pub mod version;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::engine::{ComposerBackend, LoopEvent, LoopOptions, WatchCore, WatchLoop};
use crate::errors::{PipewrightError, Result};
use crate::pipeline::{Plan, RunReport};
use crate::project::Project;
use crate::version::{BumpReport, VersionRequest};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let project = Project::load(&PathBuf::from(&args.config))?;

    match args.command {
        Command::Run { pipelines, strict } => run_pipelines(&project, pipelines, strict).await,
        Command::Plan { pipeline } => {
            let plan = project.composer(false)?.plan(&pipeline)?;
            print_plan(&plan);
            Ok(())
        }
        Command::Version {
            version,
            rules,
            strict,
        } => {
            let request: VersionRequest = version.parse()?;
            let reports = project.sync_versions(&request, &rules, strict)?;
            print_version_reports(&reports);
            Ok(())
        }
        Command::Watch { initial } => watch_project(&project, initial.as_deref()).await,
    }
}

/// Run each named pipeline in turn, stopping at the first failure.
pub async fn run_pipelines(project: &Project, pipelines: Vec<String>, strict: bool) -> Result<()> {
    let composer = project.composer(strict)?;

    let pipelines = if pipelines.is_empty() {
        vec![project.settings().default_pipeline.clone()]
    } else {
        pipelines
    };

    for name in &pipelines {
        let report = composer.run(name).await?;
        log_run_report(&report);
    }

    Ok(())
}

/// Watch the project root and rebuild bound pipelines until cancelled.
pub async fn watch_project(project: &Project, initial: Option<&str>) -> Result<()> {
    let settings = project.settings();
    let composer = Arc::new(project.composer(settings.strict_sources)?);

    let rules = project.watch_rules()?;
    if rules.is_empty() {
        return Err(PipewrightError::ConfigError(
            "no [watch] rules configured".to_string(),
        ));
    }
    // Every bound pipeline must at least plan before we start watching.
    for rule in &rules {
        composer.plan(&rule.pipeline)?;
    }

    if let Some(pipeline) = initial {
        match composer.run(pipeline).await {
            Ok(report) => log_run_report(&report),
            Err(err) => error!(pipeline, error = %err, "initial run failed; watching anyway"),
        }
    }

    let profiles = watch::build_profiles(&rules)?;
    let (events_tx, events_rx) = mpsc::channel::<LoopEvent>(64);
    let _watcher = watch::spawn_watcher(project.root(), profiles, events_tx.clone())?;

    // Ctrl-C → cancel; a second Ctrl-C stops without waiting.
    {
        let tx = events_tx.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                if tx.send(LoopEvent::CancelRequested).await.is_err() {
                    return;
                }
            }
        });
    }

    let backend = ComposerBackend::new(composer, events_tx.clone());
    let core = WatchCore::new(LoopOptions::from_settings(settings));
    let core = WatchLoop::new(core, events_rx, events_tx, backend).run().await?;

    info!(
        completed = core.completed_runs(),
        failed = core.failed_runs(),
        "watch stopped"
    );
    Ok(())
}

fn log_run_report(report: &RunReport) {
    info!(
        pipeline = %report.pipeline,
        steps = report.steps.len(),
        invocations = report.invocation_count(),
        produced = report.produced().count(),
        "pipeline finished"
    );
}

fn print_plan(plan: &Plan) {
    println!("pipeline {} ({} steps)", plan.pipeline, plan.steps.len());
    for step in &plan.steps {
        let spec = &step.target.spec;
        println!("  {:>2}. {}  [tool: {}]", step.index + 1, step.identity(), step.target.tool);
        if !spec.src.is_empty() {
            println!("        src:  {}", spec.src.join(", "));
        }
        if let Some(dest) = &spec.dest {
            println!("        dest: {dest}");
        }
        if spec.expand {
            println!("        expand: one invocation per destination");
        }
    }
}

fn print_version_reports(reports: &[BumpReport]) {
    for report in reports {
        println!(
            "{}: {} ({} replacements)",
            report.rule,
            report.version,
            report.total()
        );
        for file in &report.files {
            println!("  {}: {}", file.path.display(), file.replacements);
        }
    }
}
