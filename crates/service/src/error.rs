use scribe_capture::CaptureError;
use scribe_log::HistoryLogError;
use scribe_protocol::WireError;
use thiserror::Error;

/// Fatal service-level errors. Any of these aborts startup or shuts the
/// service down.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The configured endpoint could not be bound.
    #[error("failed to bind state history endpoint")]
    Bind(#[source] std::io::Error),

    /// Preparing the state history directory failed.
    #[error("failed to prepare state history directory")]
    Io(#[from] std::io::Error),

    /// Opening a history log failed.
    #[error(transparent)]
    Log(#[from] HistoryLogError),

    /// Block capture failed; the logs must not advance partially.
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Session-local errors. All of them reduce to closing the session; none
/// are fatal to the service.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The WebSocket transport failed.
    #[error("websocket transport error")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The client sent a request that did not decode.
    #[error("malformed client request")]
    Decode(#[from] WireError),

    /// Reading a stored entry failed.
    #[error(transparent)]
    Log(#[from] HistoryLogError),

    /// The client sent a text frame; only the server's ABI announcement is
    /// ever text.
    #[error("client sent a text frame")]
    UnexpectedTextFrame,

    /// A stored payload was shorter than its own length prefix.
    #[error("stored payload for block {0} is malformed")]
    BadPayload(u32),

    /// Tuning the accepted socket failed.
    #[error("socket setup failed")]
    Socket(#[source] std::io::Error),
}
