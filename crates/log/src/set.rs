//! The three logs maintained by the state history service.

use crate::{HistoryLog, HistoryLogError};
use std::path::Path;

/// Base names of the three log/index file pairs. Part of the on-disk
/// contract.
const BLOCK_STATE_LOG: &str = "block_state_history";
const TRACE_LOG: &str = "trace_history";
const CHAIN_STATE_LOG: &str = "chain_state_history";

/// The block-state, trace, and chain-state history logs, opened from one
/// directory and advanced together by block capture.
#[derive(Debug)]
pub struct StateHistoryLogs {
    /// Block-state metadata log. Its payload slot is currently reserved.
    pub block_state: HistoryLog,
    /// Transaction-trace log.
    pub trace: HistoryLog,
    /// Chain-state delta log.
    pub chain_state: HistoryLog,
}

impl StateHistoryLogs {
    /// Opens (or creates) all six files inside `dir`.
    pub fn open_in(dir: impl AsRef<Path>) -> Result<Self, HistoryLogError> {
        let dir = dir.as_ref();
        let open = |name: &str| {
            HistoryLog::open(dir.join(format!("{name}.log")), dir.join(format!("{name}.index")))
        };
        Ok(Self {
            block_state: open(BLOCK_STATE_LOG)?,
            trace: open(TRACE_LOG)?,
            chain_state: open(CHAIN_STATE_LOG)?,
        })
    }
}
