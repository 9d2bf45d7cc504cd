//! Top-level wiring of the state history service.

use crate::{
    logs::SharedStateLogs, Acceptor, BlockSource, CaptureActor, ChainEvent, ServiceError,
    StateHistoryConfig,
};
use scribe_capture::{DomainCodec, StateCapture, StateDatabase};
use scribe_log::StateHistoryLogs;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// The assembled state history service: capture on the write path, the
/// acceptor and its sessions on the read path, one shared cancellation
/// token for shutdown.
pub struct StateHistoryService<D, C, B>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
    B: BlockSource,
{
    config: StateHistoryConfig,
    capture: StateCapture<D, C>,
    source: Arc<B>,
    events: mpsc::Receiver<ChainEvent<C::Trace>>,
    cancellation: CancellationToken,
}

impl<D, C, B> std::fmt::Debug for StateHistoryService<D, C, B>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
    B: BlockSource,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHistoryService").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<D, C, B> StateHistoryService<D, C, B>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
    B: BlockSource + 'static,
{
    /// Assembles the service from its seams: the capture pipeline, the
    /// block source for client queries, and the chain event channel.
    pub fn new(
        config: StateHistoryConfig,
        capture: StateCapture<D, C>,
        source: Arc<B>,
        events: mpsc::Receiver<ChainEvent<C::Trace>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self { config, capture, source, events, cancellation }
    }

    /// Prepares the directory, opens the three logs, binds the endpoint,
    /// and runs until cancellation or a fatal capture error.
    pub async fn start(self) -> Result<(), ServiceError> {
        let dir = crate::prepare_state_history_dir(&self.config)?;
        let logs: SharedStateLogs = Arc::new(RwLock::new(StateHistoryLogs::open_in(&dir)?));

        let acceptor = Acceptor::bind(self.config.endpoint)?;
        let cancellation = self.cancellation.clone();
        let accept_task =
            tokio::spawn(acceptor.run(logs.clone(), self.source, cancellation.clone()));

        // Capture stays on this task; its failure is the service's failure.
        let actor = CaptureActor::new(self.capture, logs, self.events, cancellation.clone());
        let result = actor.run().await;

        cancellation.cancel();
        let _ = accept_task.await;
        result.map_err(Into::into)
    }
}
