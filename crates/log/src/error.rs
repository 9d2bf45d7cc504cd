use thiserror::Error;

/// Errors that may occur while operating on a history log.
#[derive(Debug, Error)]
pub enum HistoryLogError {
    /// An I/O error on the log or index file.
    #[error("history log io error")]
    Io(#[from] std::io::Error),

    /// The requested block is outside the readable range.
    #[error("block {block_num} outside stored range [{begin}, {end})")]
    OutOfRange {
        /// The requested block number.
        block_num: u32,
        /// First readable block.
        begin: u32,
        /// One past the last readable block.
        end: u32,
    },

    /// An append skipped past the end of the log.
    #[error("appending block {block_num} would leave a gap, expected block {expected}")]
    Gap {
        /// The offered block number.
        block_num: u32,
        /// The only block number the log can extend with.
        expected: u32,
    },

    /// The offered entry does not link to the stored predecessor.
    #[error("block {block_num} does not link to the stored id of block {prev_block_num}")]
    ForkMismatch {
        /// The offered block number.
        block_num: u32,
        /// The predecessor whose stored id did not match.
        prev_block_num: u32,
    },

    /// The payload writer emitted a different number of bytes than the
    /// header promised.
    #[error("payload writer produced {written} bytes, header promised {expected}")]
    PayloadSizeMismatch {
        /// Bytes actually written.
        written: u64,
        /// Bytes promised by the header.
        expected: u64,
    },

    /// Structural damage that recovery-by-truncation cannot resolve.
    #[error("history log corrupt: {0}")]
    Corrupt(String),
}
