//! The actor that drains chain notifications into the history logs.

use crate::logs::SharedStateLogs;
use scribe_capture::{AcceptedBlock, CaptureError, DomainCodec, StateCapture, StateDatabase};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Notifications delivered by the chain engine.
#[derive(Debug)]
pub enum ChainEvent<T> {
    /// A transaction finished executing, yielding its trace.
    TransactionApplied(T),
    /// A block was accepted.
    BlockAccepted(AcceptedBlock),
}

/// Receives [`ChainEvent`]s and drives [`StateCapture`].
///
/// Capture failures are fatal: the actor cancels the shared token so the
/// whole service winds down rather than letting the logs fall behind the
/// chain or advance partially for a height.
pub struct CaptureActor<D, C>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
{
    capture: StateCapture<D, C>,
    logs: SharedStateLogs,
    events: mpsc::Receiver<ChainEvent<C::Trace>>,
    cancellation: CancellationToken,
}

impl<D, C> std::fmt::Debug for CaptureActor<D, C>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureActor").field("capture", &self.capture).finish_non_exhaustive()
    }
}

impl<D, C> CaptureActor<D, C>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
{
    /// Creates the actor over an already-wired event channel.
    pub fn new(
        capture: StateCapture<D, C>,
        logs: SharedStateLogs,
        events: mpsc::Receiver<ChainEvent<C::Trace>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self { capture, logs, events, cancellation }
    }

    /// Runs until cancellation, the event channel closing, or a fatal
    /// capture error.
    pub async fn run(mut self) -> Result<(), CaptureError> {
        loop {
            let event = tokio::select! {
                _ = self.cancellation.cancelled() => {
                    info!(target: "state_capture", "received shutdown signal, exiting capture actor");
                    return Ok(());
                }
                event = self.events.recv() => event,
            };
            let Some(event) = event else {
                info!(target: "state_capture", "chain event channel closed, exiting capture actor");
                return Ok(());
            };
            match event {
                ChainEvent::TransactionApplied(trace) => {
                    self.capture.transaction_applied(trace);
                }
                ChainEvent::BlockAccepted(block) => {
                    // Hold the write guard across all three appends so no
                    // reader observes a partially captured height.
                    let mut logs = self.logs.write().await;
                    if let Err(err) = self.capture.block_accepted(&block, &mut logs) {
                        error!(
                            target: "state_capture",
                            block_num = block.block.number,
                            error = %err,
                            "block capture failed, stopping service"
                        );
                        self.cancellation.cancel();
                        return Err(err);
                    }
                }
            }
        }
    }
}
