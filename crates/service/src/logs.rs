//! Shared handles over the three history logs.

use crate::SessionError;
use scribe_log::{HistoryLog, HistoryLogError, StateHistoryLogs};
use std::{path::Path, sync::Arc};
use tokio::sync::RwLock;

/// The three logs behind one reader-writer lock.
///
/// Capture is the single writer and takes the lock for a whole block, so a
/// reader observes either the pre-block state or the fully captured state;
/// the logs can never appear mutually inconsistent for a height.
pub type SharedStateLogs = Arc<RwLock<StateHistoryLogs>>;

/// Opens the three logs inside `dir` and wraps them for sharing.
pub fn open_shared_logs(dir: impl AsRef<Path>) -> Result<SharedStateLogs, HistoryLogError> {
    Ok(Arc::new(RwLock::new(StateHistoryLogs::open_in(dir)?)))
}

/// Reads the stored payload for `block_num` with its `u32` length prefix
/// stripped.
///
/// Out-of-range heights and reserved (empty) payloads are not errors; both
/// surface as an absent field in the response.
pub(crate) fn log_data(
    log: &HistoryLog,
    block_num: u32,
) -> Result<Option<Vec<u8>>, SessionError> {
    if !log.contains(block_num) {
        return Ok(None);
    }
    let entry = log.get_entry(block_num)?;
    if entry.payload.is_empty() {
        return Ok(None);
    }
    if entry.payload.len() < 4 {
        return Err(SessionError::BadPayload(block_num));
    }
    let len = u32::from_le_bytes(entry.payload[0..4].try_into().expect("4-byte slice")) as usize;
    if entry.payload.len() < 4 + len {
        return Err(SessionError::BadPayload(block_num));
    }
    Ok(Some(entry.payload[4..4 + len].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use scribe_log::HistoryLogHeader;
    use tempfile::TempDir;

    fn open_one(dir: &TempDir) -> HistoryLog {
        HistoryLog::open(dir.path().join("t.log"), dir.path().join("t.index")).unwrap()
    }

    fn write_prefixed(log: &mut HistoryLog, block_num: u32, body: &[u8]) {
        let header = HistoryLogHeader {
            block_num,
            block_id: B256::repeat_byte(1),
            prev_block_id: B256::ZERO,
            payload_size: 4 + body.len() as u64,
        };
        log.write_entry(&header, |out| {
            out.write_all(&(body.len() as u32).to_le_bytes())?;
            out.write_all(body)
        })
        .unwrap();
    }

    #[test]
    fn strips_length_prefix() {
        let dir = TempDir::new().unwrap();
        let mut log = open_one(&dir);
        write_prefixed(&mut log, 100, b"payload");
        assert_eq!(log_data(&log, 100).unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn out_of_range_is_absent() {
        let dir = TempDir::new().unwrap();
        let log = open_one(&dir);
        assert_eq!(log_data(&log, 100).unwrap(), None);
    }

    #[test]
    fn reserved_empty_payload_is_absent() {
        let dir = TempDir::new().unwrap();
        let mut log = open_one(&dir);
        let header = HistoryLogHeader {
            block_num: 100,
            block_id: B256::repeat_byte(1),
            prev_block_id: B256::ZERO,
            payload_size: 0,
        };
        log.write_entry(&header, |_| Ok(())).unwrap();
        assert_eq!(log_data(&log, 100).unwrap(), None);
    }

    #[test]
    fn short_payload_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut log = open_one(&dir);
        let header = HistoryLogHeader {
            block_num: 100,
            block_id: B256::repeat_byte(1),
            prev_block_id: B256::ZERO,
            payload_size: 2,
        };
        log.write_entry(&header, |out| out.write_all(&[0, 1])).unwrap();
        assert!(matches!(log_data(&log, 100), Err(SessionError::BadPayload(100))));
    }
}
