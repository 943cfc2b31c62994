use anyhow::Context;
use clap::{Parser, Subcommand};
use retrace_engine::config::{ConfigLoader, RetraceConfig};
use retrace_engine::processor::{Collaborators, DocumentProcessor, Selection};
use retrace_engine::record::ActionRecord;
use retrace_engine::store::BlobStore;
use retrace_engine::stores::{
    FsBlobStore, FsDocumentStore, HttpAxTreeGenerator, HttpBlobStore, JsonlStepSink,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retrace", version, about = "Rebuild agent trajectories from recorded browser sessions")]
struct Args {
    /// Config file (defaults to ./retrace.yaml, then ~/.retrace/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconstruct, project and store step records
    Process {
        /// Document ids to process
        #[arg(long = "id")]
        ids: Vec<String>,
        /// Process documents captured after this RFC 3339 timestamp
        #[arg(long, conflicts_with_all = ["ids", "url"])]
        since: Option<String>,
        /// Process documents recorded from this start URL
        #[arg(long, conflicts_with = "ids")]
        url: Option<String>,
    },
    /// Print the reconstructed trajectory of one document without storing it
    Show {
        #[arg(long)]
        id: String,
    },
}

fn collaborators(config: &RetraceConfig) -> anyhow::Result<Collaborators> {
    let blobs: Arc<dyn BlobStore> = match config.store.blob_base_url()? {
        Some(base) => Arc::new(HttpBlobStore::new(Some(base))),
        None => Arc::new(FsBlobStore::new(&config.store.blob_dir)),
    };
    let endpoint = config.axtree.endpoint_url()?;
    let axtree = HttpAxTreeGenerator::new(endpoint, Duration::from_millis(config.axtree.timeout_ms))?;

    Ok(Collaborators {
        documents: Arc::new(FsDocumentStore::new(&config.store.documents_dir)),
        blobs,
        axtree: Arc::new(axtree),
        sink: Arc::new(JsonlStepSink::new(&config.store.output_path)),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries trajectory output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await,
        None => ConfigLoader::load_default().await,
    }
    .context("Failed to load configuration")?;

    let processor = DocumentProcessor::new(collaborators(&config)?, &config);

    match args.command {
        Command::Process { ids, since, url } => {
            let selection = match (since, url) {
                (Some(since), _) => Selection::Since(since),
                (None, Some(url)) => Selection::StartUrl(url),
                (None, None) if !ids.is_empty() => Selection::Ids(ids),
                (None, None) => anyhow::bail!("Nothing to process: pass --id, --since or --url"),
            };

            let ids = processor.select(&selection).await?;
            info!("Processing {} documents", ids.len());
            let report = processor.process_batch(&ids).await;

            for (id, err) in &report.failed {
                eprintln!("{}: {}", id, err);
            }
            println!(
                "{} written ({} steps), {} skipped, {} failed",
                report.written.len(),
                report.total_steps(),
                report.skipped.len(),
                report.failed.len()
            );
            if !report.failed.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Show { id } => {
            let steps = processor.trajectory(&id).await?;
            for (n, step) in steps.iter().enumerate() {
                let actions: Vec<_> = step
                    .actions
                    .iter()
                    .map(|a| {
                        json!({
                            "bid": a.target_id,
                            "timestamp": a.timestamp,
                            "video_timestamp": a.video_timestamp,
                            "action": ActionRecord::from(a),
                        })
                    })
                    .collect();
                let line = json!({
                    "step": n,
                    "observation_timestamp": step.observation.raw.timestamp,
                    "observation_video_timestamp": step.observation.raw.video_timestamp,
                    "html_length": step.observation.html.len(),
                    "actions": actions,
                });
                println!("{}", line);
            }
        }
    }

    Ok(())
}
