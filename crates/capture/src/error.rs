use crate::RowId;
use scribe_log::HistoryLogError;
use thiserror::Error;

/// Errors raised while capturing an accepted block.
///
/// Any of these aborts block acceptance: capture must not leave the logs
/// partially written for a height.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A history log rejected the append.
    #[error(transparent)]
    Log(#[from] HistoryLogError),

    /// The undo frame referenced a row the live index no longer has.
    #[error("missing row {id} in table {table} while capturing block {block_num}")]
    MissingRow {
        /// Wire name of the table.
        table: &'static str,
        /// The unresolvable row id.
        id: RowId,
        /// The block being captured.
        block_num: u32,
    },

    /// A contract row's containing table was neither live nor removed in
    /// the same undo frame.
    #[error("cannot resolve container table {container} for a {table} row")]
    UnknownContainer {
        /// Wire name of the row's table.
        table: &'static str,
        /// The unresolvable container id.
        container: RowId,
    },

    /// The database did not report a container id for a contract row.
    #[error("{table} row is missing its container id")]
    MissingContainerId {
        /// Wire name of the row's table.
        table: &'static str,
    },
}
