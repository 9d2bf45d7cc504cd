//! Listener setup and the accept loop.

use crate::{logs::SharedStateLogs, session, BlockSource, ServiceError};
use socket2::{Domain, Protocol, Socket, Type};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;

const LISTEN_BACKLOG: i32 = 1024;

/// Pause after a failed accept (e.g. EMFILE) before re-arming, so an
/// exhausted fd table does not spin the loop.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Owns the listening socket and spawns one session task per client.
#[derive(Debug)]
pub struct Acceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Acceptor {
    /// Binds `endpoint` with `SO_REUSEADDR` set.
    pub fn bind(endpoint: SocketAddr) -> Result<Self, ServiceError> {
        let bind = || {
            let socket =
                Socket::new(Domain::for_address(endpoint), Type::STREAM, Some(Protocol::TCP))?;
            socket.set_reuse_address(true)?;
            socket.set_nonblocking(true)?;
            socket.bind(&endpoint.into())?;
            socket.listen(LISTEN_BACKLOG)?;
            TcpListener::from_std(socket.into())
        };
        let listener = bind().map_err(ServiceError::Bind)?;
        let local_addr = listener.local_addr().map_err(ServiceError::Bind)?;
        Ok(Self { listener, local_addr })
    }

    /// Address the listener is bound to. With a zero port request this is
    /// the actual assigned port.
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections until cancellation. Accept errors — including
    /// too-many-open-files — are logged and the loop re-arms.
    pub async fn run<B: BlockSource + 'static>(
        self,
        logs: SharedStateLogs,
        source: Arc<B>,
        cancellation: CancellationToken,
    ) {
        info!(target: "state_history", endpoint = %self.local_addr, "listening for state history clients");
        let mut sessions = JoinSet::new();
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        info!(target: "state_history", peer = %peer, "incoming connection");
                        sessions.spawn(session::run(
                            socket,
                            peer,
                            logs.clone(),
                            source.clone(),
                            cancellation.clone(),
                        ));
                    }
                    Err(err) => {
                        warn!(target: "state_history", error = %err, "accept failed");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
                // Reap finished sessions so the set does not grow without bound.
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            }
        }
        info!(target: "state_history", open_sessions = sessions.len(), "shutting down state history sessions");
        sessions.shutdown().await;
    }
}
