//! Per-block state capture.
//!
//! Invoked once per accepted block, this crate turns the block's runtime side
//! effects — the buffered transaction traces and the database's undo frame —
//! into three payloads appended to the block-state, trace, and chain-state
//! history logs. The chain engine, its multi-index database, and the domain
//! record serialization are external collaborators reached through the
//! [`StateDatabase`], [`DomainCodec`], and [`TransactionTrace`] seams.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::CaptureError;

mod tables;
pub use tables::TrackedTable;

mod traits;
pub use traits::{
    AcceptedBlock, BlockRef, DomainCodec, RowId, StateDatabase, TransactionTrace, UndoFrame,
};

mod capture;
pub use capture::StateCapture;
