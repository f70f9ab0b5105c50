use crate::ui::ConsoleSink;
use colored::Colorize;
use harvestflow_build::{BuildArtifact, BuildError, BuildSettings, Orchestrator};
use harvestflow_cloud::{CancelHandle, TeardownReport, cancel_pair};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Exit status when the run was interrupted
const EXIT_CANCELLED: i32 = 130;

pub async fn handle(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (path, config) = match harvestflow_config::load_resolved(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", "✗ Configuration error".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Loaded configuration from {}", path.display());

    let client = super::connect(&config)?;
    let settings = BuildSettings::from_config(&config);

    if !json {
        println!(
            "{} {} on {}",
            "Building from".blue(),
            settings.image.name.cyan(),
            config.harvester_url.cyan()
        );
    }

    let sink = Arc::new(if json {
        ConsoleSink::quiet()
    } else {
        ConsoleSink::new()
    });

    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, handle).await {
            eprintln!(
                "{}",
                "✗ Interrupted again, exiting. Builder resources may be left behind."
                    .red()
                    .bold()
            );
            std::process::exit(EXIT_CANCELLED);
        }
    });

    let orchestrator = Orchestrator::new(Arc::new(client)).with_sink(sink.clone());
    let outcome = orchestrator.run(&settings, token).await;
    sink.finish();

    match outcome {
        Ok(artifact) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&artifact)?);
            } else {
                print_artifact(&artifact);
            }
            if !artifact.teardown.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            let code = exit_code(&e);
            if json {
                let stage = e.stage();
                let body = serde_json::json!({
                    "stage": stage,
                    "error": format!("{:#}", anyhow::Error::new(e)),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            std::process::exit(code);
        }
    }
}

/// The first interrupt cancels the build and lets teardown run. Resolves
/// `true` on the second one, `false` if the signal source fails.
async fn watch_interrupts<F, Fut>(mut interrupt: F, handle: CancelHandle) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    tracing::warn!("Interrupted, cancelling build");
    eprintln!(
        "{}",
        "Cancelling build, cleaning up. Press Ctrl-C again to exit now.".yellow()
    );
    handle.cancel();

    interrupt().await.is_ok()
}

fn exit_code(error: &BuildError) -> i32 {
    if error.is_cancelled() {
        EXIT_CANCELLED
    } else {
        1
    }
}

fn print_artifact(artifact: &BuildArtifact) {
    println!();
    println!("{}", "✓ Build finished".green().bold());
    println!(
        "  Image:   {}/{}{}",
        artifact.image.namespace,
        artifact.image.name.cyan(),
        if artifact.image.reused {
            " (reused)".dimmed().to_string()
        } else {
            String::new()
        }
    );
    println!("  Volume:  {}/{}", artifact.namespace, artifact.volume.cyan());
    println!("  VM:      {}/{}", artifact.namespace, artifact.vm.cyan());
    println!("  Actions: {}", artifact.summary());
    println!(
        "  Elapsed: {}s",
        (artifact.finished_at - artifact.started_at).num_seconds()
    );
    print_teardown(&artifact.teardown);
}

fn print_teardown(report: &TeardownReport) {
    if report.is_success() {
        return;
    }
    println!();
    println!(
        "{}",
        format!("⚠ {} resource(s) could not be removed:", report.failed.len()).yellow()
    );
    for failed in &report.failed {
        println!(
            "  - {} {}: {}",
            failed.kind,
            if failed.name.is_empty() {
                "(unnamed)"
            } else {
                failed.name.as_str()
            },
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
}
