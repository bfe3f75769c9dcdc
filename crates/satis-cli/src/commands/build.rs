//! Build command implementation

use colored::Colorize;
use satis_core::{BuildConfig, BuildReport};
use satis_fs::NormalizedPath;
use satis_git::{ClonedRepository, redact_uri};

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Clone the repository named on the command line and build its catalog.
pub fn run_build(cli: &Cli) -> Result<BuildReport> {
    let config = build_config(cli)?;

    println!(
        "{} {} into {}",
        "=>".blue().bold(),
        redact_uri(&cli.repo_uri).cyan(),
        config.out_dir.as_str().yellow()
    );

    let source = ClonedRepository::clone_from(&cli.repo_uri)?;
    let report = satis_core::build(&source, &config)?;

    print_summary(&config, &report);
    Ok(report)
}

/// Check the arguments and turn them into a [`BuildConfig`].
pub fn build_config(cli: &Cli) -> Result<BuildConfig> {
    if cli.repo_uri.trim().is_empty() {
        return Err(CliError::user("repository URI must not be empty"));
    }
    if cli.public_uri.trim().is_empty() {
        return Err(CliError::user("public URI must not be empty"));
    }
    if cli.out.trim().is_empty() {
        return Err(CliError::user("output directory must not be empty"));
    }

    let config = BuildConfig::new(NormalizedPath::new(&cli.out), cli.public_uri.trim())
        .with_manifest_name(cli.manifest_name.as_str())
        .with_checkout_policy(cli.on_checkout_error);
    config.validate()?;
    Ok(config)
}

fn print_summary(config: &BuildConfig, report: &BuildReport) {
    println!(
        "{} Wrote {} ({} entries from {} references)",
        "OK".green().bold(),
        config.catalog_path().as_str().cyan(),
        report.entries_written,
        report.refs_processed
    );
    println!(
        "   Archives: {} built, {} reused",
        report.archives_built, report.archives_reused
    );
    if report.refs_skipped > 0 {
        println!(
            "   {} {} references could not be checked out",
            "warning:".yellow().bold(),
            report.refs_skipped
        );
    }
    if report.manifests_skipped > 0 {
        println!(
            "   {} manifests skipped (run with --verbose for details)",
            report.manifests_skipped
        );
    }
}
