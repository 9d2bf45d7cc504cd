//! The [`StateCapture`] pipeline.

use crate::{
    AcceptedBlock, BlockRef, CaptureError, DomainCodec, RowId, StateDatabase, TrackedTable,
    TransactionTrace, UndoFrame,
};
use alloy_primitives::B256;
use scribe_log::{HistoryLog, HistoryLogHeader, StateHistoryLogs};
use scribe_protocol::{encode_table_deltas, RowChange, TableDelta};
use std::collections::HashMap;
use tracing::{info, warn};

/// Converts a block's runtime side effects into history log entries.
///
/// Owns the pending-trace buffer that accumulates between the
/// transaction-applied and block-accepted notifications.
pub struct StateCapture<D, C>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
{
    db: D,
    codec: C,
    pending_traces: HashMap<B256, C::Trace>,
}

impl<D, C> std::fmt::Debug for StateCapture<D, C>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCapture")
            .field("pending_traces", &self.pending_traces.len())
            .finish_non_exhaustive()
    }
}

impl<D, C> StateCapture<D, C>
where
    D: StateDatabase,
    C: DomainCodec<Record = D::Record>,
{
    /// Creates a capture pipeline over the given database and codec.
    pub fn new(db: D, codec: C) -> Self {
        Self { db, codec, pending_traces: HashMap::new() }
    }

    /// Number of traces waiting for their block.
    pub fn pending_trace_count(&self) -> usize {
        self.pending_traces.len()
    }

    /// Buffers the trace of an executed transaction until its block is
    /// accepted. Receiptless traces are dropped.
    pub fn transaction_applied(&mut self, trace: C::Trace) {
        if trace.has_receipt() {
            self.pending_traces.insert(trace.id(), trace);
        }
    }

    /// Captures an accepted block into all three logs.
    ///
    /// On success every log's `end_block` equals `block.number + 1`. Any
    /// failure must abort block acceptance upstream.
    pub fn block_accepted(
        &mut self,
        block: &AcceptedBlock,
        logs: &mut StateHistoryLogs,
    ) -> Result<(), CaptureError> {
        self.store_block_state(block, &mut logs.block_state)?;
        self.store_traces(block, &mut logs.trace)?;
        self.store_chain_state(block, &mut logs.chain_state)?;
        Ok(())
    }

    /// The block-state payload slot is reserved; an empty entry keeps the
    /// log's range in step with the other two.
    fn store_block_state(
        &mut self,
        block: &AcceptedBlock,
        log: &mut HistoryLog,
    ) -> Result<(), CaptureError> {
        log.write_entry(&entry_header(&block.block, 0), |_| Ok(()))?;
        Ok(())
    }

    fn store_traces(
        &mut self,
        block: &AcceptedBlock,
        log: &mut HistoryLog,
    ) -> Result<(), CaptureError> {
        let mut matched = Vec::with_capacity(block.transactions.len());
        for id in &block.transactions {
            match self.pending_traces.remove(id) {
                Some(trace) => matched.push(trace),
                None => warn!(
                    target: "state_capture",
                    transaction = %id,
                    block_num = block.block.number,
                    "missing trace for committed transaction"
                ),
            }
        }
        // Drained fully on every block, whether or not the block included
        // the buffered transactions.
        self.pending_traces.clear();

        let bin = self.codec.encode_traces(&matched);
        write_prefixed(log, &block.block, &bin)
    }

    fn store_chain_state(
        &mut self,
        block: &AcceptedBlock,
        log: &mut HistoryLog,
    ) -> Result<(), CaptureError> {
        let fresh = log.is_empty();
        if fresh {
            info!(
                target: "state_capture",
                block_num = block.block.number,
                "placing initial state snapshot"
            );
        }

        // Containers removed by this block stay resolvable for rows that
        // lived inside them.
        let removed_containers: HashMap<RowId, D::Record> = if fresh {
            HashMap::new()
        } else {
            self.db
                .undo_frame(TrackedTable::ContractTable)
                .map(|frame| frame.removed.into_iter().collect())
                .unwrap_or_default()
        };

        let mut deltas = Vec::new();
        for table in TrackedTable::ALL {
            let rows = if fresh {
                self.snapshot_table(table, &removed_containers)?
            } else {
                self.incremental_table(table, block.block.number, &removed_containers)?
            };
            if let Some(rows) = rows {
                deltas.push(TableDelta { name: table.name().to_string(), rows });
            }
        }

        let bin = encode_table_deltas(&deltas);
        write_prefixed(log, &block.block, &bin)
    }

    /// Emits every live row of `table` as `(present, post-state)`. `None`
    /// when the table is empty.
    fn snapshot_table(
        &self,
        table: TrackedTable,
        removed_containers: &HashMap<RowId, D::Record>,
    ) -> Result<Option<Vec<RowChange>>, CaptureError> {
        let mut rows = Vec::new();
        for record in self.db.scan(table) {
            rows.push(RowChange {
                present: true,
                data: self.encode_row(table, &record, removed_containers)?,
            });
        }
        Ok((!rows.is_empty()).then_some(rows))
    }

    /// Emits the rows `table`'s undo frame touched: post-states of modified
    /// rows, then of inserted rows, then pre-states of removed rows. `None`
    /// when the frame is absent or empty.
    fn incremental_table(
        &self,
        table: TrackedTable,
        block_num: u32,
        removed_containers: &HashMap<RowId, D::Record>,
    ) -> Result<Option<Vec<RowChange>>, CaptureError> {
        let Some(frame) = self.db.undo_frame(table) else { return Ok(None) };
        if frame.is_unchanged() {
            return Ok(None);
        }
        let UndoFrame { modified, inserted, removed } = frame;
        let mut rows = Vec::with_capacity(modified.len() + inserted.len() + removed.len());
        for id in modified.iter().chain(inserted.iter()) {
            let record = self.db.get(table, *id).ok_or(CaptureError::MissingRow {
                table: table.name(),
                id: *id,
                block_num,
            })?;
            rows.push(RowChange {
                present: true,
                data: self.encode_row(table, &record, removed_containers)?,
            });
        }
        for (_, record) in &removed {
            rows.push(RowChange {
                present: false,
                data: self.encode_row(table, record, removed_containers)?,
            });
        }
        Ok(Some(rows))
    }

    fn encode_row(
        &self,
        table: TrackedTable,
        record: &D::Record,
        removed_containers: &HashMap<RowId, D::Record>,
    ) -> Result<Vec<u8>, CaptureError> {
        let container = if table.has_container() {
            let container_id = self
                .db
                .container_id(table, record)
                .ok_or(CaptureError::MissingContainerId { table: table.name() })?;
            let container = self
                .db
                .get(TrackedTable::ContractTable, container_id)
                .or_else(|| removed_containers.get(&container_id).cloned())
                .ok_or(CaptureError::UnknownContainer {
                    table: table.name(),
                    container: container_id,
                })?;
            Some(container)
        } else {
            None
        };
        Ok(self.codec.encode_record(table, record, container.as_ref()))
    }
}

const fn entry_header(block: &BlockRef, payload_size: u64) -> HistoryLogHeader {
    HistoryLogHeader {
        block_num: block.number,
        block_id: block.id,
        prev_block_id: block.parent,
        payload_size,
    }
}

/// Appends `bin` behind its `u32` length prefix.
fn write_prefixed(
    log: &mut HistoryLog,
    block: &BlockRef,
    bin: &[u8],
) -> Result<(), CaptureError> {
    let header = entry_header(block, 4 + bin.len() as u64);
    log.write_entry(&header, |out| {
        out.write_all(&(bin.len() as u32).to_le_bytes())?;
        out.write_all(bin)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_protocol::decode_table_deltas;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    struct StubRecord {
        id: RowId,
        container: Option<RowId>,
        body: String,
    }

    fn record(id: RowId, body: &str) -> StubRecord {
        StubRecord { id, container: None, body: body.to_string() }
    }

    fn contract_record(id: RowId, container: RowId, body: &str) -> StubRecord {
        StubRecord { id, container: Some(container), body: body.to_string() }
    }

    #[derive(Debug, Default)]
    struct StubDb {
        live: HashMap<TrackedTable, Vec<StubRecord>>,
        frames: HashMap<TrackedTable, UndoFrame<StubRecord>>,
    }

    impl StateDatabase for StubDb {
        type Record = StubRecord;

        fn scan(&self, table: TrackedTable) -> Box<dyn Iterator<Item = StubRecord> + '_> {
            Box::new(self.live.get(&table).into_iter().flatten().cloned())
        }

        fn get(&self, table: TrackedTable, id: RowId) -> Option<StubRecord> {
            self.live.get(&table)?.iter().find(|row| row.id == id).cloned()
        }

        fn undo_frame(&self, table: TrackedTable) -> Option<UndoFrame<StubRecord>> {
            self.frames.get(&table).cloned()
        }

        fn container_id(&self, _table: TrackedTable, record: &StubRecord) -> Option<RowId> {
            record.container
        }
    }

    #[derive(Debug, Clone)]
    struct StubTrace {
        id: B256,
        receipt: bool,
        body: String,
    }

    impl StubTrace {
        fn new(seed: u8, body: &str) -> Self {
            Self { id: B256::repeat_byte(seed), receipt: true, body: body.to_string() }
        }
    }

    impl TransactionTrace for StubTrace {
        fn id(&self) -> B256 {
            self.id
        }

        fn has_receipt(&self) -> bool {
            self.receipt
        }
    }

    #[derive(Debug)]
    struct StubCodec;

    impl DomainCodec for StubCodec {
        type Record = StubRecord;
        type Trace = StubTrace;

        fn encode_record(
            &self,
            table: TrackedTable,
            record: &StubRecord,
            container: Option<&StubRecord>,
        ) -> Vec<u8> {
            let mut encoded = format!("{}:{}", table.name(), record.body);
            if let Some(container) = container {
                encoded.push('@');
                encoded.push_str(&container.body);
            }
            encoded.into_bytes()
        }

        fn encode_traces(&self, traces: &[StubTrace]) -> Vec<u8> {
            traces.iter().map(|t| t.body.as_str()).collect::<Vec<_>>().join(",").into_bytes()
        }
    }

    fn block(number: u32, transactions: Vec<B256>) -> AcceptedBlock {
        let mut id = [0u8; 32];
        id[28..].copy_from_slice(&number.to_be_bytes());
        let mut parent = [0u8; 32];
        parent[28..].copy_from_slice(&number.wrapping_sub(1).to_be_bytes());
        AcceptedBlock {
            block: BlockRef { number, id: B256::new(id), parent: B256::new(parent) },
            transactions,
        }
    }

    /// Strips the `u32` length prefix of a stored payload.
    fn unprefixed(log: &HistoryLog, block_num: u32) -> Vec<u8> {
        let payload = log.get_entry(block_num).unwrap().payload;
        let len = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;
        assert_eq!(payload.len(), 4 + len);
        payload[4..].to_vec()
    }

    #[test]
    fn cold_start_single_block() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut db = StubDb::default();
        db.live.insert(
            TrackedTable::Account,
            vec![record(1, "alice"), record(2, "bob")],
        );
        let mut capture = StateCapture::new(db, StubCodec);

        let t1 = StubTrace::new(0x11, "t1");
        capture.transaction_applied(t1.clone());
        capture.block_accepted(&block(100, vec![t1.id]), &mut logs).unwrap();

        for log in [&logs.block_state, &logs.trace, &logs.chain_state] {
            assert_eq!((log.begin_block(), log.end_block()), (100, 101));
            assert_eq!(std::fs::metadata(log.index_path()).unwrap().len(), 8);
        }
        assert_eq!(capture.pending_trace_count(), 0);

        assert_eq!(unprefixed(&logs.trace, 100), b"t1");
        assert_eq!(logs.block_state.get_entry(100).unwrap().payload, b"");

        let deltas = decode_table_deltas(&unprefixed(&logs.chain_state, 100)).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].name, "account");
        assert_eq!(deltas[0].rows.len(), 2);
        assert!(deltas[0].rows.iter().all(|row| row.present));
        assert_eq!(deltas[0].rows[0].data, b"account:alice");
    }

    #[test]
    fn missing_trace_is_skipped() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut capture = StateCapture::new(StubDb::default(), StubCodec);

        let t1 = StubTrace::new(0x11, "t1");
        capture.transaction_applied(t1.clone());
        let never_delivered = B256::repeat_byte(0x22);
        capture
            .block_accepted(&block(100, vec![t1.id, never_delivered]), &mut logs)
            .unwrap();

        assert_eq!(unprefixed(&logs.trace, 100), b"t1");
    }

    #[test]
    fn receiptless_trace_is_not_buffered() {
        let mut capture = StateCapture::new(StubDb::default(), StubCodec);
        let mut trace = StubTrace::new(0x33, "speculative");
        trace.receipt = false;
        capture.transaction_applied(trace);
        assert_eq!(capture.pending_trace_count(), 0);
    }

    #[test]
    fn pending_traces_drain_even_when_unmatched() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut capture = StateCapture::new(StubDb::default(), StubCodec);

        capture.transaction_applied(StubTrace::new(0x44, "orphan"));
        capture.block_accepted(&block(100, vec![]), &mut logs).unwrap();

        assert_eq!(capture.pending_trace_count(), 0);
        assert_eq!(unprefixed(&logs.trace, 100), b"");
    }

    #[test]
    fn incremental_delta_orders_rows() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut db = StubDb::default();
        db.live.insert(TrackedTable::Account, vec![record(1, "alice-v1")]);
        let mut capture = StateCapture::new(db, StubCodec);
        capture.block_accepted(&block(100, vec![]), &mut logs).unwrap();

        // Block 101 modifies row 1, inserts row 2, removes row 3.
        let db = StubDb {
            live: HashMap::from([(
                TrackedTable::Account,
                vec![record(1, "alice-v2"), record(2, "carol")],
            )]),
            frames: HashMap::from([(
                TrackedTable::Account,
                UndoFrame {
                    modified: vec![1],
                    inserted: vec![2],
                    removed: vec![(3, record(3, "dave"))],
                },
            )]),
        };
        let mut capture = StateCapture { db, ..capture };
        capture.block_accepted(&block(101, vec![]), &mut logs).unwrap();

        let deltas = decode_table_deltas(&unprefixed(&logs.chain_state, 101)).unwrap();
        assert_eq!(deltas.len(), 1);
        let rows = &deltas[0].rows;
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].present, rows[0].data.as_slice()), (true, &b"account:alice-v2"[..]));
        assert_eq!((rows[1].present, rows[1].data.as_slice()), (true, &b"account:carol"[..]));
        assert_eq!((rows[2].present, rows[2].data.as_slice()), (false, &b"account:dave"[..]));
    }

    #[test]
    fn quiet_tables_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut capture = StateCapture::new(StubDb::default(), StubCodec);
        capture.block_accepted(&block(100, vec![]), &mut logs).unwrap();
        capture.block_accepted(&block(101, vec![]), &mut logs).unwrap();

        // A fresh empty database yields an empty snapshot and an empty
        // incremental delta, but entries exist for both heights.
        assert!(decode_table_deltas(&unprefixed(&logs.chain_state, 100)).unwrap().is_empty());
        assert!(decode_table_deltas(&unprefixed(&logs.chain_state, 101)).unwrap().is_empty());
        assert_eq!(logs.chain_state.end_block(), 102);
    }

    #[test]
    fn contract_rows_resolve_live_containers() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut db = StubDb::default();
        db.live.insert(TrackedTable::ContractTable, vec![record(7, "tokens")]);
        db.live.insert(
            TrackedTable::ContractRow,
            vec![contract_record(1, 7, "balance")],
        );
        let mut capture = StateCapture::new(db, StubCodec);
        capture.block_accepted(&block(100, vec![]), &mut logs).unwrap();

        let deltas = decode_table_deltas(&unprefixed(&logs.chain_state, 100)).unwrap();
        let rows = &deltas.iter().find(|d| d.name == "contract_row").unwrap().rows;
        assert_eq!(rows[0].data, b"contract_row:balance@tokens");
    }

    #[test]
    fn contract_rows_resolve_containers_removed_in_same_block() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut capture = StateCapture::new(StubDb::default(), StubCodec);
        capture.block_accepted(&block(100, vec![]), &mut logs).unwrap();

        // Block 101 removes table 8 and the row that lived inside it.
        let db = StubDb {
            live: HashMap::new(),
            frames: HashMap::from([
                (
                    TrackedTable::ContractTable,
                    UndoFrame {
                        modified: vec![],
                        inserted: vec![],
                        removed: vec![(8, record(8, "retired"))],
                    },
                ),
                (
                    TrackedTable::ContractRow,
                    UndoFrame {
                        modified: vec![],
                        inserted: vec![],
                        removed: vec![(1, contract_record(1, 8, "last"))],
                    },
                ),
            ]),
        };
        let mut capture = StateCapture { db, ..capture };
        capture.block_accepted(&block(101, vec![]), &mut logs).unwrap();

        let deltas = decode_table_deltas(&unprefixed(&logs.chain_state, 101)).unwrap();
        let rows = &deltas.iter().find(|d| d.name == "contract_row").unwrap().rows;
        assert_eq!((rows[0].present, rows[0].data.as_slice()), (false, &b"contract_row:last@retired"[..]));
    }

    #[test]
    fn unresolvable_container_aborts_capture() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut db = StubDb::default();
        db.live.insert(TrackedTable::ContractRow, vec![contract_record(1, 9, "stray")]);
        let mut capture = StateCapture::new(db, StubCodec);

        let err = capture
            .block_accepted(&block(100, vec![]), &mut logs)
            .expect_err("container 9 does not exist");
        assert!(matches!(
            err,
            CaptureError::UnknownContainer { table: "contract_row", container: 9 },
        ));
    }

    #[test]
    fn fork_recaptures_block() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut capture = StateCapture::new(StubDb::default(), StubCodec);
        capture.block_accepted(&block(100, vec![]), &mut logs).unwrap();

        // The same height arrives again under a different id.
        let mut forked = block(100, vec![]);
        forked.block.id = B256::repeat_byte(0xAB);
        capture.block_accepted(&forked, &mut logs).unwrap();

        for log in [&logs.block_state, &logs.trace, &logs.chain_state] {
            assert_eq!((log.begin_block(), log.end_block()), (100, 101));
            assert_eq!(log.get_entry(100).unwrap().header.block_id, B256::repeat_byte(0xAB));
        }
    }

    #[test]
    fn capture_advances_all_logs_together() {
        let dir = TempDir::new().unwrap();
        let mut logs = StateHistoryLogs::open_in(dir.path()).unwrap();
        let mut capture = StateCapture::new(StubDb::default(), StubCodec);
        for number in 100..105 {
            capture.block_accepted(&block(number, vec![]), &mut logs).unwrap();
            for log in [&logs.block_state, &logs.trace, &logs.chain_state] {
                assert_eq!(log.end_block(), number + 1);
            }
        }
    }
}
