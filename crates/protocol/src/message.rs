//! Tagged-union request and result messages.

use crate::wire::{
    expect_end, put_b256, put_optional_bytes, put_u32, read_b256, read_optional_bytes, read_u32,
    read_u8, WireError,
};
use alloy_primitives::B256;

/// A client request. Tag bytes follow declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateRequest {
    /// `get_status_request_v0`: report the chain head and the stored range.
    GetStatus,
    /// `get_block_request_v0`: fetch every stored artifact for one block.
    GetBlock {
        /// Height of the requested block.
        block_num: u32,
    },
}

impl StateRequest {
    /// Serializes the request to its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::GetStatus => out.push(0),
            Self::GetBlock { block_num } => {
                out.push(1);
                put_u32(&mut out, *block_num);
            }
        }
        out
    }

    /// Decodes a request from one inbound frame. The frame must contain
    /// exactly one request.
    pub fn decode(mut input: &[u8]) -> Result<Self, WireError> {
        let request = match read_u8(&mut input)? {
            0 => Self::GetStatus,
            1 => Self::GetBlock { block_num: read_u32(&mut input)? },
            tag => return Err(WireError::UnknownVariant { union: "state_request", tag }),
        };
        expect_end(input)?;
        Ok(request)
    }
}

/// `get_status_result_v0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStatusResult {
    /// Height of the last irreversible block reported by the chain.
    pub last_irreversible_block_num: u32,
    /// Identifier of the last irreversible block.
    pub last_irreversible_block_id: B256,
    /// First block held by the chain-state log.
    pub state_begin_block_num: u32,
    /// One past the last block held by the chain-state log.
    pub state_end_block_num: u32,
}

/// `get_block_result_v0`. Each optional field is present iff the
/// corresponding source had data at `block_num`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetBlockResult {
    /// The requested height.
    pub block_num: u32,
    /// Serialized block, when the chain still has it.
    pub block: Option<Vec<u8>>,
    /// Block-state payload, when stored and non-empty.
    pub block_state: Option<Vec<u8>>,
    /// Trace payload with its length prefix stripped.
    pub traces: Option<Vec<u8>>,
    /// Chain-state delta payload with its length prefix stripped.
    pub deltas: Option<Vec<u8>>,
}

/// A server result. Tag bytes follow declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateResult {
    /// Answer to [`StateRequest::GetStatus`].
    Status(GetStatusResult),
    /// Answer to [`StateRequest::GetBlock`].
    Block(GetBlockResult),
}

impl StateResult {
    /// Serializes the result to its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::Status(status) => {
                out.push(0);
                put_u32(&mut out, status.last_irreversible_block_num);
                put_b256(&mut out, &status.last_irreversible_block_id);
                put_u32(&mut out, status.state_begin_block_num);
                put_u32(&mut out, status.state_end_block_num);
            }
            Self::Block(block) => {
                out.push(1);
                put_u32(&mut out, block.block_num);
                put_optional_bytes(&mut out, block.block.as_deref());
                put_optional_bytes(&mut out, block.block_state.as_deref());
                put_optional_bytes(&mut out, block.traces.as_deref());
                put_optional_bytes(&mut out, block.deltas.as_deref());
            }
        }
        out
    }

    /// Decodes a result from one outbound frame.
    pub fn decode(mut input: &[u8]) -> Result<Self, WireError> {
        let result = match read_u8(&mut input)? {
            0 => Self::Status(GetStatusResult {
                last_irreversible_block_num: read_u32(&mut input)?,
                last_irreversible_block_id: read_b256(&mut input)?,
                state_begin_block_num: read_u32(&mut input)?,
                state_end_block_num: read_u32(&mut input)?,
            }),
            1 => Self::Block(GetBlockResult {
                block_num: read_u32(&mut input)?,
                block: read_optional_bytes(&mut input)?,
                block_state: read_optional_bytes(&mut input)?,
                traces: read_optional_bytes(&mut input)?,
                deltas: read_optional_bytes(&mut input)?,
            }),
            tag => return Err(WireError::UnknownVariant { union: "state_result", tag }),
        };
        expect_end(input)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn request_tags_follow_declaration_order() {
        assert_eq!(StateRequest::GetStatus.encode(), vec![0]);
        assert_eq!(
            StateRequest::GetBlock { block_num: 7 }.encode(),
            vec![1, 7, 0, 0, 0],
        );
    }

    #[test]
    fn request_roundtrip() {
        for request in [StateRequest::GetStatus, StateRequest::GetBlock { block_num: 0xDEAD_BEEF }]
        {
            assert_eq!(StateRequest::decode(&request.encode()).unwrap(), request);
        }
    }

    #[test]
    fn request_rejects_unknown_tag() {
        assert_eq!(
            StateRequest::decode(&[9]),
            Err(WireError::UnknownVariant { union: "state_request", tag: 9 }),
        );
    }

    #[test]
    fn request_rejects_trailing_bytes() {
        assert_eq!(StateRequest::decode(&[0, 0]), Err(WireError::TrailingBytes(1)));
    }

    #[test]
    fn request_rejects_truncated_input() {
        assert!(matches!(
            StateRequest::decode(&[1, 7]),
            Err(WireError::UnexpectedEof { wanted: 4, remaining: 1 }),
        ));
    }

    #[test]
    fn status_result_roundtrip() {
        let result = StateResult::Status(GetStatusResult {
            last_irreversible_block_num: 99,
            last_irreversible_block_id: b256!(
                "00000063aabbccddeeff00112233445566778899aabbccddeeff001122334455"
            ),
            state_begin_block_num: 100,
            state_end_block_num: 101,
        });
        assert_eq!(StateResult::decode(&result.encode()).unwrap(), result);
    }

    #[test]
    fn block_result_preserves_absent_fields() {
        let result = StateResult::Block(GetBlockResult {
            block_num: 101,
            traces: Some(vec![1, 2, 3]),
            ..Default::default()
        });
        let decoded = StateResult::decode(&result.encode()).unwrap();
        let StateResult::Block(block) = decoded else { panic!("expected block result") };
        assert_eq!(block.block_num, 101);
        assert_eq!(block.block, None);
        assert_eq!(block.block_state, None);
        assert_eq!(block.traces, Some(vec![1, 2, 3]));
        assert_eq!(block.deltas, None);
    }

    #[test]
    fn optional_rejects_bad_presence_byte() {
        let mut raw = StateResult::Block(GetBlockResult::default()).encode();
        raw[5] = 2;
        assert_eq!(StateResult::decode(&raw), Err(WireError::InvalidBool(2)));
    }
}
