mod cli;
mod output;
mod rc_config;
mod watch;

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use colored::control;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use output::OutputFormat;
use rc_config::RcConfig;
use shibfilter::config;
use shibfilter::model::request::FilterRequest;
use shibfilter::report::{FilterReport, PolicyOutline, ReportSummary};

/// Exit code for requests that could not be filtered.
const EXIT_FILTER_ERRORS: i32 = 1;
/// Exit code for tool failures such as an invalid policy.
const EXIT_TOOL_FAILURE: i32 = 2;

struct Settings {
    verbose: bool,
    format: OutputFormat,
}

fn main() {
    let cli = Cli::parse();
    let rc = RcConfig::load(&std::env::current_dir().unwrap_or_default());

    let verbose = cli.verbose || rc.verbose.unwrap_or(false);
    let json = cli.json || rc.json.unwrap_or(false);
    if cli.no_color || rc.no_color.unwrap_or(false) {
        control::set_override(false);
    }

    init_logging(verbose, rc.log.as_deref());

    let settings = Settings {
        verbose,
        format: if json { OutputFormat::Json } else { OutputFormat::Terminal },
    };

    match cli.command {
        Command::Check { policy } => process::exit(check(&policy, &settings)),
        Command::Run {
            policy,
            requests,
            watch,
        } => {
            if watch || rc.watch.unwrap_or(false) {
                let mut watched = vec![policy.clone()];
                watched.extend(requests.iter().cloned());
                let result = watch::watch_and_run(&watched, || {
                    run(&policy, &requests, &settings);
                });
                if let Err(e) = result {
                    eprintln!("Error: watch failed: {:#}", e);
                    process::exit(EXIT_TOOL_FAILURE);
                }
            } else {
                process::exit(run(&policy, &requests, &settings));
            }
        }
    }
}

fn init_logging(verbose: bool, rc_directive: Option<&str>) {
    let default = if verbose {
        "shibfilter=debug"
    } else {
        rc_directive.unwrap_or("warn")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn check(policy: &Path, settings: &Settings) -> i32 {
    match config::load_policy(policy) {
        Ok(loaded) => {
            let outline = PolicyOutline::from_config(&loaded.config);
            output::print_outline(&outline, settings.format, &loaded.path);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_TOOL_FAILURE
        }
    }
}

/// Loads the policy and every request, filters them and prints the reports.
/// Returns the process exit code.
fn run(policy: &Path, inputs: &[PathBuf], settings: &Settings) -> i32 {
    let loaded = match config::load_policy(policy) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_TOOL_FAILURE;
        }
    };

    let paths = match config::discover_requests(inputs) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_TOOL_FAILURE;
        }
    };

    let mut reports = Vec::with_capacity(paths.len());
    for path in &paths {
        let request = match FilterRequest::load(path) {
            Ok(request) => request,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return EXIT_TOOL_FAILURE;
            }
        };
        tracing::debug!(request = %path.display(), "filtering");
        reports.push(FilterReport::run(&loaded.engine, path.display().to_string(), &request));
    }

    output::print_reports(&reports, settings.verbose, settings.format, &loaded.path);

    if ReportSummary::from_reports(&reports).has_errors() {
        EXIT_FILTER_ERRORS
    } else {
        0
    }
}
