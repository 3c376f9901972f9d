//! Command line interface for staged_image_release.
//!
//! Parses arguments, loads the publish plan, picks a registry backend and
//! runs the publisher. Every failure is reported here and turned into exit
//! code 1.

mod args;
mod output;

pub use args::Args;
pub use output::OutputManager;

use crate::error::{ReleaseError, Result};
use crate::plan::PublishPlan;
use crate::publish::{PublishSummary, Publisher, ReleaseParameters};
use crate::registry::{DockerRegistry, DryRunRegistry, RegistryOperations};
use clap::error::ErrorKind;

/// Main CLI entry point. Returns the process exit code.
pub async fn run() -> i32 {
    match Args::try_parse_args() {
        Ok(args) => execute(args).await,
        Err(e) => report_parse_error(e),
    }
}

fn report_parse_error(e: clap::Error) -> i32 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = e.print();
            0
        }
        _ => {
            let _ = e.print();
            1
        }
    }
}

/// Execute a release for already parsed arguments
pub async fn execute(args: Args) -> i32 {
    let output = OutputManager::new(args.verbose, args.quiet);

    let params = match args.release_parameters() {
        Ok(params) => params,
        Err(e) => {
            output.error(&e.to_string());
            eprintln!("\n{}", Args::usage());
            return 1;
        }
    };

    if !args.release_is_semver() {
        log::warn!(
            "release tag '{}' is not a semantic version; publishing it as given",
            params.release_tag
        );
    }

    match publish(&args, &params, &output).await {
        Ok(summary) => {
            output.section("Summary");
            output.success(&format!(
                "Release {} published: {} tags, {} manifests",
                params.release_tag,
                summary.tags.len(),
                summary.manifests.len()
            ));
            0
        }
        Err(e) => {
            report_failure(&output, &e);
            1
        }
    }
}

async fn publish(
    args: &Args,
    params: &ReleaseParameters,
    output: &OutputManager,
) -> Result<PublishSummary> {
    let plan = match &args.config {
        Some(path) => {
            output.info(&format!("Using publish plan {}", path.display()));
            PublishPlan::load(path)?
        }
        None => PublishPlan::default(),
    };

    output.info(&format!(
        "Publishing commit {} as {} to {}/{}",
        params.source_reference,
        params.release_tag,
        plan.registry(),
        plan.namespace()
    ));

    if args.dry_run {
        output.warn("Dry run: no registry operation will be executed");
        let registry = DryRunRegistry::new(output);
        publish_with(&registry, &plan, params, output).await
    } else {
        let registry = DockerRegistry::locate()?;
        output.verbose(&format!(
            "Using container tool {}",
            registry.program().display()
        ));
        publish_with(&registry, &plan, params, output).await
    }
}

/// Run the publisher against any registry backend
pub async fn publish_with<R: RegistryOperations>(
    registry: &R,
    plan: &PublishPlan,
    params: &ReleaseParameters,
    output: &OutputManager,
) -> Result<PublishSummary> {
    Publisher::new(registry, plan, params, output).run().await
}

fn report_failure(output: &OutputManager, e: &ReleaseError) {
    output.error(&format!("Release failed: {e}"));

    let suggestions = e.recovery_suggestions();
    if !suggestions.is_empty() {
        eprintln!("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            eprintln!("    • {suggestion}");
        }
    }
}
