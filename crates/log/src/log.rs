//! The [`HistoryLog`] file pair.

use crate::{HistoryLogError, HistoryLogHeader};
use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Seek, SeekFrom, Write},
    os::unix::fs::FileExt,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const HEADER_SIZE: u64 = HistoryLogHeader::SIZE as u64;
const INDEX_RECORD_SIZE: u64 = 8;

/// A complete entry read back from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The entry header.
    pub header: HistoryLogHeader,
    /// The opaque payload bytes.
    pub payload: Vec<u8>,
}

/// An append-only binary log plus its sidecar block-number index.
///
/// The readable range is `[begin_block, end_block)`. `begin_block` latches on
/// the first append; `end_block` is one past the highest appended block.
/// Index record `i` holds the absolute log offset of the header for
/// `begin_block + i`, so the index length in records always equals
/// `end_block - begin_block`.
///
/// Durability ordering: an entry's header and payload are flushed to the log
/// before its index record is appended. The index is the durability witness;
/// on open, anything the index does not reference is truncated away.
#[derive(Debug)]
pub struct HistoryLog {
    name: String,
    log: File,
    index: File,
    log_path: PathBuf,
    index_path: PathBuf,
    begin_block: u32,
    end_block: u32,
}

impl HistoryLog {
    /// Creates or attaches to the log/index file pair, healing any trailing
    /// partial record left by a crash.
    pub fn open(
        log_path: impl AsRef<Path>,
        index_path: impl AsRef<Path>,
    ) -> Result<Self, HistoryLogError> {
        let log_path = log_path.as_ref().to_path_buf();
        let index_path = index_path.as_ref().to_path_buf();
        let name = log_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history".to_string());
        let log = OpenOptions::new().read(true).write(true).create(true).open(&log_path)?;
        let index = OpenOptions::new().read(true).write(true).create(true).open(&index_path)?;
        let mut this =
            Self { name, log, index, log_path, index_path, begin_block: 0, end_block: 0 };
        this.recover()?;
        Ok(this)
    }

    /// First readable block.
    pub const fn begin_block(&self) -> u32 {
        self.begin_block
    }

    /// One past the last readable block.
    pub const fn end_block(&self) -> u32 {
        self.end_block
    }

    /// Whether the log holds no entries.
    pub const fn is_empty(&self) -> bool {
        self.begin_block == self.end_block
    }

    /// Whether `block_num` is inside the readable range.
    pub const fn contains(&self, block_num: u32) -> bool {
        self.begin_block <= block_num && block_num < self.end_block
    }

    /// Path of the log file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Path of the index file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Reads the entry for `block_num`, seeking through the index in O(1).
    pub fn get_entry(&self, block_num: u32) -> Result<HistoryEntry, HistoryLogError> {
        if !self.contains(block_num) {
            return Err(HistoryLogError::OutOfRange {
                block_num,
                begin: self.begin_block,
                end: self.end_block,
            });
        }
        let offset = self.read_index_record((block_num - self.begin_block) as u64)?;
        let header = self.read_header_at(offset)?;
        if header.block_num != block_num {
            return Err(HistoryLogError::Corrupt(format!(
                "{}: index for block {block_num} references an entry headed {}",
                self.name, header.block_num,
            )));
        }
        let mut payload = vec![0u8; header.payload_size as usize];
        self.log.read_exact_at(&mut payload, offset + HEADER_SIZE)?;
        Ok(HistoryEntry { header, payload })
    }

    /// Appends a new entry, invoking `write_payload` to emit exactly
    /// `header.payload_size` bytes.
    ///
    /// An offered block below `end_block` truncates the stored suffix first
    /// (fork path). The entry must link to its stored predecessor when one
    /// exists, and may not skip past `end_block`.
    pub fn write_entry(
        &mut self,
        header: &HistoryLogHeader,
        write_payload: impl FnOnce(&mut dyn Write) -> io::Result<()>,
    ) -> Result<(), HistoryLogError> {
        if !self.is_empty() {
            if header.block_num > self.end_block {
                return Err(HistoryLogError::Gap {
                    block_num: header.block_num,
                    expected: self.end_block,
                });
            }
            if header.block_num > self.begin_block {
                let prev = self.get_entry(header.block_num - 1)?;
                if prev.header.block_id != header.prev_block_id {
                    return Err(HistoryLogError::ForkMismatch {
                        block_num: header.block_num,
                        prev_block_num: header.block_num - 1,
                    });
                }
            }
            if header.block_num < self.end_block {
                self.truncate(header.block_num)?;
            }
        }

        let offset = self.log.seek(SeekFrom::End(0))?;
        self.log.write_all(&header.to_bytes())?;

        let mut writer = CountingWriter::new(BufWriter::new(&mut self.log));
        let mut result = write_payload(&mut writer);
        if result.is_ok() {
            result = writer.flush();
        }
        let written = writer.written;
        drop(writer);
        if let Err(err) = result {
            let _ = self.log.set_len(offset);
            return Err(err.into());
        }
        if written != header.payload_size {
            let _ = self.log.set_len(offset);
            return Err(HistoryLogError::PayloadSizeMismatch {
                written,
                expected: header.payload_size,
            });
        }

        // The log must be durable before the index references it.
        self.log.sync_data()?;

        let records = (self.end_block - self.begin_block) as u64;
        self.index.write_all_at(&offset.to_le_bytes(), records * INDEX_RECORD_SIZE)?;
        self.index.sync_data()?;

        if self.is_empty() {
            self.begin_block = header.block_num;
        }
        self.end_block = header.block_num + 1;
        debug!(
            target: "history_log",
            log = %self.name,
            block_num = header.block_num,
            payload_size = header.payload_size,
            "entry appended"
        );
        Ok(())
    }

    /// Drops every entry with `block_num >= to_block`.
    fn truncate(&mut self, to_block: u32) -> Result<(), HistoryLogError> {
        if to_block <= self.begin_block {
            self.log.set_len(0)?;
            self.index.set_len(0)?;
            self.log.sync_data()?;
            self.index.sync_data()?;
            info!(target: "history_log", log = %self.name, to_block, "truncated to empty");
            self.begin_block = 0;
            self.end_block = 0;
            return Ok(());
        }
        let keep = (to_block - self.begin_block) as u64;
        let cut = self.read_index_record(keep)?;
        self.log.set_len(cut)?;
        self.index.set_len(keep * INDEX_RECORD_SIZE)?;
        self.log.sync_data()?;
        self.index.sync_data()?;
        info!(
            target: "history_log",
            log = %self.name,
            to_block,
            dropped = self.end_block - to_block,
            "truncated for fork"
        );
        self.end_block = to_block;
        Ok(())
    }

    /// Restores the range from disk, healing crash artifacts: a partial
    /// trailing index record, an index record without a complete entry, or
    /// log bytes past the last indexed entry.
    fn recover(&mut self) -> Result<(), HistoryLogError> {
        let log_len = self.log.metadata()?.len();
        let mut index_len = self.index.metadata()?.len();
        if index_len % INDEX_RECORD_SIZE != 0 {
            warn!(target: "history_log", log = %self.name, "dropping partial trailing index record");
            index_len -= index_len % INDEX_RECORD_SIZE;
            self.index.set_len(index_len)?;
        }

        if log_len < HEADER_SIZE {
            // Nothing readable. A torn first header is dropped wholesale.
            if log_len != 0 || index_len != 0 {
                warn!(target: "history_log", log = %self.name, "resetting log with no complete entry");
            }
            self.log.set_len(0)?;
            self.index.set_len(0)?;
            self.begin_block = 0;
            self.end_block = 0;
            return Ok(());
        }

        self.begin_block = self.read_header_at(0)?.block_num;

        let mut records = index_len / INDEX_RECORD_SIZE;
        while records > 0 {
            let offset = self.read_index_record(records - 1)?;
            let expected = self.begin_block.wrapping_add(records as u32 - 1);
            match self.complete_entry_at(offset, log_len)? {
                Some(header) if header.block_num == expected => {
                    let end = offset + HEADER_SIZE + header.payload_size;
                    if end < log_len {
                        warn!(
                            target: "history_log",
                            log = %self.name,
                            dropped = log_len - end,
                            "truncating unindexed bytes after last entry"
                        );
                    }
                    self.log.set_len(end)?;
                    self.index.set_len(records * INDEX_RECORD_SIZE)?;
                    self.end_block = header.block_num + 1;
                    return Ok(());
                }
                _ => {
                    warn!(
                        target: "history_log",
                        log = %self.name,
                        record = records - 1,
                        "index record does not reference a complete entry, dropping"
                    );
                    records -= 1;
                }
            }
        }

        self.rebuild_index(log_len)
    }

    /// Rewrites the index by walking the log from the start. Used when the
    /// index is missing or no record of it survived validation.
    fn rebuild_index(&mut self, log_len: u64) -> Result<(), HistoryLogError> {
        info!(target: "history_log", log = %self.name, "reconstructing index from log");
        let mut offsets: Vec<u64> = Vec::new();
        let mut offset = 0u64;
        let mut expected = self.begin_block;
        while let Some(header) = self.complete_entry_at(offset, log_len)? {
            if header.block_num != expected {
                break;
            }
            offsets.push(offset);
            offset += HEADER_SIZE + header.payload_size;
            expected = expected.wrapping_add(1);
        }
        if offset < log_len {
            warn!(
                target: "history_log",
                log = %self.name,
                dropped = log_len - offset,
                "truncating incomplete trailing entry"
            );
        }
        self.log.set_len(offset)?;

        let mut buf = Vec::with_capacity(offsets.len() * INDEX_RECORD_SIZE as usize);
        for entry_offset in &offsets {
            buf.extend_from_slice(&entry_offset.to_le_bytes());
        }
        self.index.set_len(0)?;
        self.index.write_all_at(&buf, 0)?;
        self.index.sync_data()?;
        self.log.sync_data()?;

        if offsets.is_empty() {
            self.begin_block = 0;
            self.end_block = 0;
        } else {
            self.end_block = self.begin_block + offsets.len() as u32;
        }
        Ok(())
    }

    /// Returns the header at `offset` when both it and its payload fit
    /// within `log_len`.
    fn complete_entry_at(
        &self,
        offset: u64,
        log_len: u64,
    ) -> Result<Option<HistoryLogHeader>, HistoryLogError> {
        if offset.checked_add(HEADER_SIZE).is_none_or(|end| end > log_len) {
            return Ok(None);
        }
        let header = self.read_header_at(offset)?;
        let fits = (offset + HEADER_SIZE)
            .checked_add(header.payload_size)
            .is_some_and(|end| end <= log_len);
        Ok(fits.then_some(header))
    }

    fn read_header_at(&self, offset: u64) -> Result<HistoryLogHeader, HistoryLogError> {
        let mut buf = [0u8; HistoryLogHeader::SIZE];
        self.log.read_exact_at(&mut buf, offset)?;
        Ok(HistoryLogHeader::from_bytes(&buf))
    }

    fn read_index_record(&self, record: u64) -> Result<u64, HistoryLogError> {
        let mut buf = [0u8; INDEX_RECORD_SIZE as usize];
        self.index.read_exact_at(&mut buf, record * INDEX_RECORD_SIZE)?;
        Ok(u64::from_le_bytes(buf))
    }
}

/// Counts the payload bytes emitted by a `write_entry` closure.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    const fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
