//! DuoDok - receptor/antibody docking runs from the command line.
//! Entry point for the `duodok` binary.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use duodok_common::StructureCategory;
use duodok_docking::{
    Delivery, DockingPipeline, OutboxDelivery, PairState, RunAggregator, RunProgress, RunSummary,
    StructureStore, Toolchain,
};

#[derive(Parser)]
#[command(name = "duodok")]
#[command(about = "DuoDok: dock receptors against antibodies and rank the complexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available structures with their selection ids
    List {
        /// Only one category (receptor or antibody)
        #[arg(short, long)]
        category: Option<StructureCategory>,
    },
    /// Store structure files under their file names
    Upload {
        #[arg(short, long)]
        category: StructureCategory,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Dock every selected receptor against every selected antibody
    Run {
        /// Receptor selection ids (repeatable)
        #[arg(short, long = "receptor", num_args = 1..)]
        receptors: Vec<String>,
        /// Antibody selection ids (repeatable)
        #[arg(short, long = "antibody", num_args = 1..)]
        antibodies: Vec<String>,
        /// Names the results folder and deliveries, e.g. an e-mail address
        #[arg(short, long, default_value = "anonymous")]
        label: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("duodok=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;
    info!("DuoDok {} (results in {})", env!("CARGO_PKG_VERSION"), config.storage.results_dir.display());

    let store = StructureStore::new(config.storage.layout.clone());
    store.init().await.context("preparing structure folders")?;

    match cli.command {
        Command::List { category } => list(&store, category).await,
        Command::Upload { category, files } => upload(&store, category, &files).await,
        Command::Run { receptors, antibodies, label } => {
            let aggregator = RunAggregator::new(&config.storage.results_dir, Toolchain::with_processes(config.tools.clone()));
            let pipeline = DockingPipeline::new(store, aggregator);
            run(&pipeline, &config, &receptors, &antibodies, &label).await
        }
    }
}

async fn list(store: &StructureStore, category: Option<StructureCategory>) -> anyhow::Result<()> {
    let categories = match category {
        Some(c) => vec![c],
        None => vec![StructureCategory::Receptor, StructureCategory::Antibody],
    };
    for category in categories {
        let files = store.list_structures(category).await?;
        println!("{} ({}):", category, files.len());
        for file in files {
            println!("  {:<40} {}", file.selection_id(), file.path.display());
        }
    }
    Ok(())
}

async fn upload(store: &StructureStore, category: StructureCategory, files: &[PathBuf]) -> anyhow::Result<()> {
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let saved = store.save(category, &name, &bytes).await?;
        println!("Stored {} as {}", path.display(), saved.selection_id());
    }
    Ok(())
}

async fn run(
    pipeline: &DockingPipeline,
    config: &config::Config,
    receptors: &[String],
    antibodies: &[String],
    label: &str,
) -> anyhow::Result<()> {
    let pairs = pipeline.enumerate_pairs(receptors, antibodies).await?;
    info!("Docking {} pairs for {}", pairs.len(), label);

    let (tx, rx) = broadcast::channel(256);
    let bar = progress_bar(pairs.len());
    let renderer = tokio::spawn(render_progress(rx, bar.clone()));

    let outcome = pipeline.run(label, &pairs, Some(tx)).await;
    // The sender is gone once the run returns, which ends the renderer.
    let _ = renderer.await;
    let summary = settle_progress(&bar, outcome)?;

    print_summary(&summary);

    if let Some(ref outbox) = config.delivery.outbox_dir {
        let delivered = OutboxDelivery::new(outbox).deliver(&summary, label).await?;
        for path in delivered {
            println!("Delivered {}", path.display());
        }
    }
    Ok(())
}

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    match ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] pair {pos}/{len} {msg}") {
        Ok(style) => bar.set_style(style.progress_chars("#>-")),
        Err(e) => warn!("Falling back to the default progress style: {e}"),
    }
    bar
}

/// Close the bar either way so a failed run does not leave it dangling.
fn settle_progress(bar: &ProgressBar, outcome: duodok_common::Result<RunSummary>) -> anyhow::Result<RunSummary> {
    match outcome {
        Ok(summary) => {
            bar.finish_with_message("Run complete");
            Ok(summary)
        }
        Err(e) => {
            bar.abandon_with_message("Run failed");
            Err(anyhow::Error::new(e).context("docking run failed"))
        }
    }
}

async fn render_progress(mut rx: broadcast::Receiver<RunProgress>, bar: ProgressBar) {
    loop {
        match rx.recv().await {
            Ok(ev) => {
                bar.set_message(format!("{} × {}: {}", ev.receptor, ev.antibody, ev.state));
                if matches!(ev.state, PairState::Done | PairState::Failed) {
                    bar.inc(1);
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("Progress display skipped {n} events"),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("{:<24} {:<24} {:<8} {:>14}  {}", "Receptor", "Antibody", "Status", "dG (kcal/mol)", "Kd");
    for pair in &summary.pairs {
        let affinity = pair.binding_affinity.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<24} {:<8} {:>14}  {}",
            pair.receptor_id,
            pair.antibody_id,
            pair.status.as_str(),
            affinity,
            pair.dissociation_constant.as_deref().unwrap_or("-"),
        );
    }

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for pair in failures {
            if let Some(ref f) = pair.failure {
                println!("  {} × {} at {}: {}", pair.receptor_id, pair.antibody_id, f.stage, f.reason);
            }
        }
    }

    println!();
    if summary.is_empty_result() {
        error!(run_id = %summary.run_id, "No pair produced results");
        println!("No pair produced results. See the failures above and the logs in {}.", summary.results_root.display());
    }
    println!("Summary: {}", summary.summary_path.display());
    println!("Archive: {}", summary.archive_path.display());
}
