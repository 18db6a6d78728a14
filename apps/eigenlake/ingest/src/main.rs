//! Eigenlake Ingest
//!
//! Bulk-loads JSONL records into an Eigenlake index through the batch writer
//! and reports the records the service did not accept.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre, LogFormat};
use core_config::{env_optional, FromEnv};
use eigenlake::{
    ApiKey, BatchOptions, ClientConfig, CreateIndex, EigenlakeClient, IndexHandle, OnError,
};
use eyre::{Result, WrapErr};
use serde_json::json;
use tokio::io::BufReader;
use tracing::info;

mod input;

use input::RecordReader;

#[derive(Parser)]
#[command(name = "eigenlake-ingest")]
#[command(about = "Bulk-load JSONL records into an Eigenlake index")]
struct Cli {
    /// Service base URL. Defaults to EIGENLAKE_URL.
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key. Defaults to EIGENLAKE_API_KEY.
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the service is ready
    Ready,

    /// Load a JSONL file into an index
    Ingest {
        #[arg(short, long)]
        namespace: String,

        #[arg(short, long)]
        index: String,

        /// JSONL input, one `{"id"?, "properties", "vector"}` object per line
        #[arg(short, long)]
        file: PathBuf,

        /// Records per bulk insert
        #[arg(long, default_value_t = eigenlake::batch::DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Parallelism hint forwarded to the service
        #[arg(long, default_value_t = 1)]
        max_concurrency: usize,

        /// raise: stop on the first failed batch; continue: record it and go on
        #[arg(long, default_value = "continue")]
        on_error: OnError,

        /// Create the index if it does not exist (requires --dimensions)
        #[arg(long, requires = "dimensions")]
        create: bool,

        #[arg(long)]
        dimensions: Option<u32>,
    },
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.url {
        Some(url) => ClientConfig::new(url),
        None => ClientConfig::from_env().wrap_err("EIGENLAKE_URL or --url is required")?,
    };

    if let Some(key) = cli.api_key.clone().or_else(|| env_optional("EIGENLAKE_API_KEY")) {
        config = config.with_api_key(ApiKey::new(key)?);
    }
    Ok(config)
}

async fn open_index(
    client: &EigenlakeClient,
    namespace: &str,
    index: &str,
    create: Option<u32>,
) -> Result<IndexHandle> {
    let indexes = client.indexes();
    let handle = match create {
        Some(dimensions) => {
            indexes
                .create_or_get(CreateIndex::new(namespace, index, dimensions))
                .await?
        }
        None => indexes
            .open(namespace, index)
            .await
            .wrap_err_with(|| format!("index {}/{} is not available", namespace, index))?,
    };
    Ok(handle)
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();
    init_tracing(LogFormat::from_env(), "info");

    let cli = Cli::parse();
    let client = EigenlakeClient::new(client_config(&cli)?)?;

    match cli.command {
        Commands::Ready => {
            if !client.ready().await {
                eyre::bail!("service is not ready");
            }
            println!("ready");
        }

        Commands::Ingest {
            namespace,
            index,
            file,
            batch_size,
            max_concurrency,
            on_error,
            create,
            dimensions,
        } => {
            let handle = open_index(
                &client,
                &namespace,
                &index,
                dimensions.filter(|_| create),
            )
            .await?;

            let source = tokio::fs::File::open(&file)
                .await
                .wrap_err_with(|| format!("failed to open {}", file.display()))?;
            let mut reader = RecordReader::new(BufReader::new(source));

            let options = BatchOptions::new()
                .with_batch_size(batch_size)
                .with_max_concurrency(max_concurrency)
                .with_on_error(on_error);
            info!(%namespace, %index, file = %file.display(), ?options, "Starting ingest");

            let mut batch = handle.batch();
            let added = batch
                .run(options, |writer| {
                    Box::pin(async move {
                        let mut added = 0usize;
                        while let Some(record) = reader.next_record().await? {
                            writer
                                .add(record.properties, record.vector, record.id)
                                .await?;
                            added += 1;
                        }
                        Ok(added)
                    })
                })
                .await?;

            let failed: Vec<_> = batch
                .failed_records()
                .iter()
                .map(|r| json!({"id": r.id, "error": r.error}))
                .collect();
            info!(added, failed = failed.len(), "Ingest complete");

            let summary = json!({
                "namespace": namespace,
                "index": index,
                "added": added,
                "number_errors": failed.len(),
                "failed_records": failed,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
