//! Session protocol engine and lifecycle for the state history service.
//!
//! The service is a set of cooperating tokio tasks sharing one
//! [`CancellationToken`](tokio_util::sync::CancellationToken): an acceptor
//! that spawns a session task per client connection, and a capture actor
//! that drains chain notifications into the history logs. Sessions never
//! own the server; the acceptor's join set and the cancellation token are
//! the only shared handles.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

mod acceptor;
pub use acceptor::Acceptor;

mod capture_actor;
pub use capture_actor::{CaptureActor, ChainEvent};

mod config;
pub use config::{prepare_state_history_dir, StateHistoryArgs, StateHistoryConfig};

mod error;
pub use error::{ServiceError, SessionError};

mod logs;
pub use logs::{open_shared_logs, SharedStateLogs};

mod service;
pub use service::StateHistoryService;

mod session;

mod traits;
pub use traits::{BlockSource, LastIrreversible};
