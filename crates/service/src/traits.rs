//! Seams to the chain engine's query surface.

use alloy_primitives::B256;
use async_trait::async_trait;

/// The chain's last irreversible pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastIrreversible {
    /// Height of the last irreversible block.
    pub number: u32,
    /// Identifier of the last irreversible block.
    pub id: B256,
}

/// Queries the session read path makes against the chain engine.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// The codec-serialized block at `block_num`, if the chain still has it.
    async fn block_by_number(&self, block_num: u32) -> Option<Vec<u8>>;

    /// The chain's current last irreversible block.
    async fn last_irreversible(&self) -> LastIrreversible;
}
