//! Row-change payload stored in the chain-state log.

use crate::wire::{
    put_bool, put_bytes, put_u32, read_bool, read_bytes, read_string, read_u32, WireError,
};

/// One row-level change within a [`TableDelta`].
///
/// `present = true` carries the row's post-state; `present = false` carries
/// the pre-state of a removed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowChange {
    /// Whether the row exists in the post-state of the block.
    pub present: bool,
    /// Codec-serialized row record.
    pub data: Vec<u8>,
}

/// All row changes of one tracked table for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDelta {
    /// Wire name of the table. Part of the protocol contract.
    pub name: String,
    /// Row changes in capture order.
    pub rows: Vec<RowChange>,
}

/// Serializes a delta sequence: `u32` count, then each table as
/// `string name || u32 row count || (bool present || bytes data)*`.
pub fn encode_table_deltas(deltas: &[TableDelta]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u32(&mut out, deltas.len() as u32);
    for delta in deltas {
        put_bytes(&mut out, delta.name.as_bytes());
        put_u32(&mut out, delta.rows.len() as u32);
        for row in &delta.rows {
            put_bool(&mut out, row.present);
            put_bytes(&mut out, &row.data);
        }
    }
    out
}

/// Decodes a delta sequence produced by [`encode_table_deltas`].
pub fn decode_table_deltas(mut input: &[u8]) -> Result<Vec<TableDelta>, WireError> {
    let input = &mut input;
    let count = read_u32(input)? as usize;
    let mut deltas = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let name = read_string(input)?;
        let rows = read_u32(input)? as usize;
        let mut delta = TableDelta { name, rows: Vec::with_capacity(rows.min(1024)) };
        for _ in 0..rows {
            let present = read_bool(input)?;
            let data = read_bytes(input)?;
            delta.rows.push(RowChange { present, data });
        }
        deltas.push(delta);
    }
    Ok(deltas)
}
