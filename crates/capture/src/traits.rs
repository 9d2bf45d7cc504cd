//! Seams to the chain engine, its database, and the domain serialization.

use crate::TrackedTable;
use alloy_primitives::B256;

/// Identifier of a row within its table.
pub type RowId = u64;

/// Position of a block in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    /// Height of the block.
    pub number: u32,
    /// Content identifier of the block.
    pub id: B256,
    /// Identifier of the parent block, zero if none.
    pub parent: B256,
}

/// The chain engine's block-accepted notification.
#[derive(Debug, Clone)]
pub struct AcceptedBlock {
    /// Position of the accepted block.
    pub block: BlockRef,
    /// Ids of the transactions the block committed, in block order.
    pub transactions: Vec<B256>,
}

/// The changes one table saw in the last committed mutation unit.
#[derive(Debug, Clone)]
pub struct UndoFrame<R> {
    /// Ids of rows whose pre-image was stored; their post-state is read from
    /// the live index.
    pub modified: Vec<RowId>,
    /// Ids of rows inserted by the block.
    pub inserted: Vec<RowId>,
    /// Removed rows together with their pre-state records.
    pub removed: Vec<(RowId, R)>,
}

impl<R> UndoFrame<R> {
    /// Whether the frame recorded no changes at all.
    pub fn is_unchanged(&self) -> bool {
        self.modified.is_empty() && self.inserted.is_empty() && self.removed.is_empty()
    }
}

impl<R> Default for UndoFrame<R> {
    fn default() -> Self {
        Self { modified: Vec::new(), inserted: Vec::new(), removed: Vec::new() }
    }
}

/// Read access to the chain's in-memory multi-index database.
///
/// Deliberately narrow: full-index iteration for the bootstrap snapshot, row
/// lookup by id, the top undo frame per table, and the container id of a
/// contract row. Everything else stays inside the chain engine.
pub trait StateDatabase {
    /// The engine's opaque row record type.
    type Record: Clone;

    /// Iterates every live row of `table`, in index order.
    fn scan(&self, table: TrackedTable) -> Box<dyn Iterator<Item = Self::Record> + '_>;

    /// Reads the current row with `id` from the live index of `table`.
    fn get(&self, table: TrackedTable, id: RowId) -> Option<Self::Record>;

    /// The top undo frame of `table`, if the database has one.
    fn undo_frame(&self, table: TrackedTable) -> Option<UndoFrame<Self::Record>>;

    /// Id of the `contract_table` row containing `record`. `None` for rows
    /// of tables without a container.
    fn container_id(&self, table: TrackedTable, record: &Self::Record) -> Option<RowId>;
}

/// The execution record of a transaction.
pub trait TransactionTrace {
    /// Id of the traced transaction.
    fn id(&self) -> B256;

    /// Whether execution produced a receipt. Receiptless traces are never
    /// part of a block and are not buffered.
    fn has_receipt(&self) -> bool;
}

/// Serialization of domain records to canonical bytes.
pub trait DomainCodec {
    /// The database record type this codec understands.
    type Record;
    /// The trace type this codec understands.
    type Trace: TransactionTrace;

    /// Serializes one row record. `container` carries the resolved
    /// `contract_table` record for the six contract row tables.
    fn encode_record(
        &self,
        table: TrackedTable,
        record: &Self::Record,
        container: Option<&Self::Record>,
    ) -> Vec<u8>;

    /// Serializes the ordered list of traces committed by one block.
    fn encode_traces(&self, traces: &[Self::Trace]) -> Vec<u8>;
}
