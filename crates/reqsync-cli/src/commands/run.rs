//! `reqsync run` implementation
//!
//! Builds the run configuration from defaults, project config files and the
//! command line, runs the engine, and renders the result.

use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;
use reqsync_core::{
    Environment, ExitCode, JsonReport, RunConfig, SyncEngine, VersionCache, load_project_config,
    to_json, write_json_report,
};

use crate::cli::RunArgs;
use crate::error::Result;

/// Number of package updates listed in the human summary.
const PREVIEW_LIMIT: usize = 8;

/// Fully layered settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRun {
    pub config: RunConfig,
    pub json_report: Option<PathBuf>,
}

/// Layer defaults, project config found in `cwd`, then explicit flags.
///
/// A relative root path is taken relative to `cwd`.
pub fn resolve_run(args: &RunArgs, cwd: &Path) -> ResolvedRun {
    let project = if args.no_config {
        Default::default()
    } else {
        load_project_config(cwd)
    };
    let layered = project.merge(args.overrides());

    let mut config = RunConfig::default();
    config.apply(&layered);
    if config.path.is_relative() {
        config.path = cwd.join(&config.path);
    }

    ResolvedRun {
        config,
        json_report: layered.json_report.map(|p| if p.is_relative() { cwd.join(p) } else { p }),
    }
}

/// Run the sync command
///
/// Returns the exit code for a completed run: [`ExitCode::ChangesWouldBeMade`]
/// in check mode when something would change, [`ExitCode::Ok`] otherwise.
pub fn run_sync(args: &RunArgs, cwd: &Path, env: &dyn Environment) -> Result<ExitCode> {
    let ResolvedRun {
        config,
        json_report,
    } = resolve_run(args, cwd);
    tracing::debug!("Resolved configuration: {:?}", config);

    let engine = SyncEngine::new(config);
    let result = engine.run(env, &mut VersionCache::new())?;
    let config = engine.config();

    let report = to_json(&result);
    let report_path = json_report
        .map(|path| write_json_report(&report, &path))
        .transpose()?;

    if args.output.human() {
        print!("{}", render_human(&report, mode_tag(config), report_path.as_deref()));
        if let Some(diff) = &result.diff {
            println!("{diff}");
        }
    }
    if args.output.json() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if config.check && result.changed {
        Ok(ExitCode::ChangesWouldBeMade)
    } else {
        Ok(ExitCode::Ok)
    }
}

fn mode_tag(config: &RunConfig) -> &'static str {
    if config.check {
        "check"
    } else if config.dry_run {
        "dry-run"
    } else {
        "apply"
    }
}

/// Human summary of a finished run, one line per item.
pub fn render_human(report: &JsonReport, mode: &str, report_path: Option<&Path>) -> String {
    HumanSummary {
        report,
        mode,
        report_path,
    }
    .to_string()
}

struct HumanSummary<'a> {
    report: &'a JsonReport,
    mode: &'a str,
    report_path: Option<&'a Path>,
}

impl fmt::Display for HumanSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let mode = self.mode;
        let files_changed = report.files.iter().filter(|file| file.changed).count();

        let headline = if report.changed {
            format!("reqsync [{mode}] -> changes detected").yellow()
        } else {
            format!("reqsync [{mode}] -> already in sync").green()
        };
        writeln!(f, "{headline}")?;
        writeln!(
            f,
            "files scanned: {} | files changed: {} | package updates: {}",
            report.files.len(),
            files_changed,
            report.changes.len()
        )?;

        if !report.changes.is_empty() {
            writeln!(f, "top package updates:")?;
            for change in report.changes.iter().take(PREVIEW_LIMIT) {
                let file_name = Path::new(&change.file)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| change.file.clone());
                writeln!(
                    f,
                    "  {} {} -> {} ({})",
                    "-".cyan(),
                    change.package.bold(),
                    change.installed_version,
                    file_name.dimmed()
                )?;
            }
            if report.changes.len() > PREVIEW_LIMIT {
                writeln!(f, "  ... and {} more", report.changes.len() - PREVIEW_LIMIT)?;
            }
        }

        if let Some(path) = self.report_path {
            writeln!(f, "json report written: {}", path.display())?;
        }
        Ok(())
    }
}
