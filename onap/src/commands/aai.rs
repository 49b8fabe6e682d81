use std::path::PathBuf;

use futures::TryStreamExt;
use observability_deps::tracing::{info, warn};
use onap_clap_blocks::aai::AaiConfig;
use onap_client::{
    Transport,
    aai::bulk::{AaiBulk, BulkOperation},
};
use tokio::{fs, io};

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Client(#[from] onap_client::Error),

    #[error("error reading file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid operations file {}: {source}", path.display())]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write output: {0}")]
    Output(#[source] serde_json::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    #[clap(subcommand)]
    cmd: SubCommand,
}

impl Config {
    pub(crate) fn logging_config(&self) -> &trogging::cli::LoggingConfig {
        match &self.cmd {
            SubCommand::Bulk(config) => &config.logging_config,
        }
    }
}

#[derive(Debug, clap::Parser)]
enum SubCommand {
    /// Write the operations listed in a file through the A&AI bulk API
    ///
    /// Each accepted operation is printed to stdout as one line of JSON. Operations that A&AI
    /// rejected and that were dropped from their request are printed to stderr as a JSON array
    /// once all requests have been sent.
    Bulk(BulkConfig),
}

#[derive(Debug, clap::Parser)]
struct BulkConfig {
    /// Connection to A&AI
    #[clap(flatten)]
    aai_config: AaiConfig,

    /// Logging setup
    #[clap(flatten)]
    logging_config: trogging::cli::LoggingConfig,

    /// File path to load the operations from
    ///
    /// The file must hold a JSON array of objects with an `action`, a `uri` and an optional
    /// `body`.
    #[clap(short = 'f', long = "file")]
    file_path: PathBuf,

    /// Fail on the first rejected request instead of dropping the operation A&AI blamed and
    /// sending the rest again
    #[clap(long = "keep-failed", action)]
    keep_failed: bool,
}

pub(crate) async fn command(config: Config) -> Result<()> {
    match config.cmd {
        SubCommand::Bulk(config) => bulk(config).await,
    }
}

async fn bulk(config: BulkConfig) -> Result<()> {
    let operations = read_operations(config.file_path).await?;
    info!(operations = operations.len(), "loaded bulk operations");

    let client = config.aai_config.client()?;
    let mut bulk = client.aai_bulk(config.aai_config.bulk_config());

    let result = submit(&mut bulk, operations, !config.keep_failed).await;

    // dropped operations are reported even when a later request failed
    let failed = bulk.failed_operations();
    if !failed.is_empty() {
        warn!(count = failed.len(), "operations were rejected by A&AI");
        eprintln!(
            "{}",
            serde_json::to_string_pretty(failed).map_err(Error::Output)?
        );
    }

    result
}

async fn read_operations(path: PathBuf) -> Result<Vec<BulkOperation>> {
    let contents = fs::read(&path).await?;
    serde_json::from_slice(&contents).map_err(|source| Error::InvalidFile { path, source })
}

async fn submit<T: Transport>(
    bulk: &mut AaiBulk<T>,
    operations: Vec<BulkOperation>,
    remove_failed_operation_on_failure: bool,
) -> Result<()> {
    let mut outcomes = bulk.submit(operations, remove_failed_operation_on_failure);
    while let Some(outcome) = outcomes.try_next().await? {
        println!(
            "{}",
            serde_json::to_string(&outcome).map_err(Error::Output)?
        );
    }
    Ok(())
}
