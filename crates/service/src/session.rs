//! Per-connection session handling.

use crate::{
    logs::{log_data, SharedStateLogs},
    BlockSource, SessionError,
};
use futures::{stream::SplitSink, stream::SplitStream, SinkExt, StreamExt};
use scribe_protocol::{
    GetBlockResult, GetStatusResult, StateRequest, StateResult, STATE_HISTORY_ABI,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tokio_util::sync::CancellationToken;

/// TCP send/receive buffer size applied to every accepted socket.
const SOCKET_BUFFER_BYTES: usize = 1024 * 1024;

/// Bound on queued outbound frames. A full queue backpressures the read
/// loop rather than buffering without limit for a slow reader.
const SEND_QUEUE_DEPTH: usize = 64;

/// Runs one client session to completion. Every failure reduces to closing
/// the connection; nothing a client does can take the service down.
pub(crate) async fn run<B: BlockSource + ?Sized>(
    socket: TcpStream,
    peer: SocketAddr,
    logs: SharedStateLogs,
    source: Arc<B>,
    cancellation: CancellationToken,
) {
    match serve_connection(socket, logs, source, cancellation).await {
        Ok(()) => debug!(target: "state_history", peer = %peer, "session closed"),
        Err(err) => warn!(target: "state_history", peer = %peer, error = %err, "session failed"),
    }
}

async fn serve_connection<B: BlockSource + ?Sized>(
    socket: TcpStream,
    logs: SharedStateLogs,
    source: Arc<B>,
    cancellation: CancellationToken,
) -> Result<(), SessionError> {
    tune_socket(&socket)?;
    let stream = accept_async(socket).await?;
    let (sink, stream) = stream.split();

    let (out_tx, out_rx) = mpsc::channel::<Message>(SEND_QUEUE_DEPTH);
    // The ABI announcement is the first frame on the wire and the only text
    // frame the connection will ever carry.
    let _ = out_tx.send(Message::text(STATE_HISTORY_ABI)).await;

    let writer = tokio::spawn(write_loop(sink, out_rx));
    let result = read_loop(stream, out_tx, &logs, source.as_ref(), &cancellation).await;
    // Dropping the sender ends the writer once the queue drains.
    let _ = writer.await;
    result
}

/// Drains the outbound queue one frame at a time. Awaiting each send keeps
/// at most one write in flight, and queue order is wire order.
async fn write_loop(
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut out_rx: mpsc::Receiver<Message>,
) {
    while let Some(frame) = out_rx.recv().await {
        if sink.send(frame).await.is_err() {
            return;
        }
    }
    let _ = sink.close().await;
}

/// Decodes inbound requests and enqueues responses. Runs concurrently with
/// the writer, so a read can be handled while an earlier response is still
/// draining.
async fn read_loop<B: BlockSource + ?Sized>(
    mut stream: SplitStream<WebSocketStream<TcpStream>>,
    out_tx: mpsc::Sender<Message>,
    logs: &SharedStateLogs,
    source: &B,
    cancellation: &CancellationToken,
) -> Result<(), SessionError> {
    loop {
        let message = tokio::select! {
            _ = cancellation.cancelled() => return Ok(()),
            message = stream.next() => message,
        };
        let Some(message) = message else { return Ok(()) };
        let data = match message? {
            Message::Binary(data) => data,
            Message::Close(_) => return Ok(()),
            Message::Ping(_) | Message::Pong(_) => continue,
            _ => return Err(SessionError::UnexpectedTextFrame),
        };
        let request = StateRequest::decode(&data)?;
        let result = handle_request(request, logs, source).await?;
        if out_tx.send(Message::binary(result.encode())).await.is_err() {
            // The writer is gone; the connection is already closing.
            return Ok(());
        }
    }
}

async fn handle_request<B: BlockSource + ?Sized>(
    request: StateRequest,
    logs: &SharedStateLogs,
    source: &B,
) -> Result<StateResult, SessionError> {
    match request {
        StateRequest::GetStatus => {
            let lib = source.last_irreversible().await;
            let logs = logs.read().await;
            Ok(StateResult::Status(GetStatusResult {
                last_irreversible_block_num: lib.number,
                last_irreversible_block_id: lib.id,
                state_begin_block_num: logs.chain_state.begin_block(),
                state_end_block_num: logs.chain_state.end_block(),
            }))
        }
        StateRequest::GetBlock { block_num } => {
            let block = source.block_by_number(block_num).await;
            // One read guard across all three logs: the response never mixes
            // pre-capture and post-capture state for a height.
            let logs = logs.read().await;
            Ok(StateResult::Block(GetBlockResult {
                block_num,
                block,
                block_state: log_data(&logs.block_state, block_num)?,
                traces: log_data(&logs.trace, block_num)?,
                deltas: log_data(&logs.chain_state, block_num)?,
            }))
        }
    }
}

fn tune_socket(socket: &TcpStream) -> Result<(), SessionError> {
    let sock = socket2::SockRef::from(socket);
    sock.set_nodelay(true).map_err(SessionError::Socket)?;
    sock.set_send_buffer_size(SOCKET_BUFFER_BYTES).map_err(SessionError::Socket)?;
    sock.set_recv_buffer_size(SOCKET_BUFFER_BYTES).map_err(SessionError::Socket)?;
    Ok(())
}
