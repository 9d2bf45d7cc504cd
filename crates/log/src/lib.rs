//! Append-only history log with a sidecar block-number index.
//!
//! Each log stores at most one entry per block number, written in strictly
//! increasing order. A parallel index file holds one fixed-size offset record
//! per entry, giving O(1) random reads by block number. Forks truncate the
//! stored suffix before re-appending; crashes are healed on open by dropping
//! any trailing partial record from either file.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::HistoryLogError;

mod header;
pub use header::HistoryLogHeader;

mod log;
pub use log::{HistoryEntry, HistoryLog};

mod set;
pub use set::StateHistoryLogs;
