//! Wire protocol for the state history service.
//!
//! Every message exchanged with a client after the one-time ABI handshake is
//! the little-endian binary form of a tagged union: [`StateRequest`] inbound,
//! [`StateResult`] outbound. Variant tags are single-byte discriminants
//! assigned in declaration order. The chain-state log payload format
//! ([`TableDelta`]) lives here as well since it is part of the same wire
//! contract.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod abi;
pub use abi::STATE_HISTORY_ABI;

mod wire;
pub use wire::WireError;

mod message;
pub use message::{GetBlockResult, GetStatusResult, StateRequest, StateResult};

mod delta;
pub use delta::{decode_table_deltas, encode_table_deltas, RowChange, TableDelta};
