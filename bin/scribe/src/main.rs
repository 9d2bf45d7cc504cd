//! Serves an archived state history directory to state history clients.
//!
//! The full service runs embedded in a chain node, where capture keeps the
//! logs in step with the chain. This binary covers the other half of the
//! lifecycle: it opens an existing set of history logs read-only and answers
//! client requests against them. With no live chain behind it, block bodies
//! are never served and the block-state log head stands in for the last
//! irreversible pointer.

use alloy_primitives::B256;
use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use scribe_service::{
    open_shared_logs, prepare_state_history_dir, Acceptor, BlockSource, LastIrreversible,
    SharedStateLogs, StateHistoryArgs,
};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scribe", version, about = "Serve an archived state history directory")]
struct Cli {
    #[command(flatten)]
    state_history: StateHistoryArgs,

    /// Application data directory against which a relative state-history
    /// directory resolves.
    #[arg(long = "data-dir", default_value = ".", env = "SCRIBE_DATA_DIR")]
    data_dir: PathBuf,
}

/// Status source backed by the stored logs alone.
#[derive(Debug)]
struct ArchiveSource {
    logs: SharedStateLogs,
}

#[async_trait]
impl BlockSource for ArchiveSource {
    async fn block_by_number(&self, _block_num: u32) -> Option<Vec<u8>> {
        None
    }

    async fn last_irreversible(&self) -> LastIrreversible {
        let logs = self.logs.read().await;
        let log = &logs.block_state;
        if log.is_empty() {
            return LastIrreversible { number: 0, id: B256::ZERO };
        }
        let head = log.end_block() - 1;
        match log.get_entry(head) {
            Ok(entry) => LastIrreversible { number: head, id: entry.header.block_id },
            Err(_) => LastIrreversible { number: head, id: B256::ZERO },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.state_history.config(cli.data_dir);
    let dir =
        prepare_state_history_dir(&config).context("failed to prepare state history directory")?;
    let logs = open_shared_logs(&dir).context("failed to open history logs")?;
    {
        let logs = logs.read().await;
        info!(
            dir = %dir.display(),
            begin_block = logs.chain_state.begin_block(),
            end_block = logs.chain_state.end_block(),
            "serving archived state history"
        );
    }

    let acceptor =
        Acceptor::bind(config.endpoint).context("failed to bind state history endpoint")?;
    let source = Arc::new(ArchiveSource { logs: logs.clone() });

    let cancellation = CancellationToken::new();
    let shutdown = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    acceptor.run(logs, source, cancellation).await;
    Ok(())
}
