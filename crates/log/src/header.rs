//! On-disk entry header.

use alloy_primitives::B256;

/// Fixed little-endian header preceding every entry payload.
///
/// Layout: `block_num (u32) | block_id (32B) | prev_block_id (32B) |
/// payload_size (u64)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLogHeader {
    /// Height identifying the entry.
    pub block_num: u32,
    /// Content identifier of the block.
    pub block_id: B256,
    /// Identifier of block `block_num - 1`, zero if none.
    pub prev_block_id: B256,
    /// Length of the payload bytes that follow the header.
    pub payload_size: u64,
}

impl HistoryLogHeader {
    /// Serialized header size in bytes.
    pub const SIZE: usize = 4 + 32 + 32 + 8;

    /// Decodes a header from its on-disk form.
    pub fn from_bytes(buf: &[u8; Self::SIZE]) -> Self {
        Self {
            block_num: u32::from_le_bytes(buf[0..4].try_into().expect("4-byte slice")),
            block_id: B256::from_slice(&buf[4..36]),
            prev_block_id: B256::from_slice(&buf[36..68]),
            payload_size: u64::from_le_bytes(buf[68..76].try_into().expect("8-byte slice")),
        }
    }

    /// Encodes the header to its on-disk form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.block_num.to_le_bytes());
        buf[4..36].copy_from_slice(self.block_id.as_slice());
        buf[36..68].copy_from_slice(self.prev_block_id.as_slice());
        buf[68..76].copy_from_slice(&self.payload_size.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn header_roundtrip() {
        let header = HistoryLogHeader {
            block_num: 0x0102_0304,
            block_id: B256::repeat_byte(0xAB),
            prev_block_id: B256::repeat_byte(0xCD),
            payload_size: 0x0506_0708_090A_0B0C,
        };
        assert_eq!(HistoryLogHeader::from_bytes(&header.to_bytes()), header);
    }

    #[test]
    fn header_is_little_endian() {
        let header = HistoryLogHeader {
            block_num: 1,
            block_id: B256::ZERO,
            prev_block_id: B256::ZERO,
            payload_size: 2,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes[0..4], [1, 0, 0, 0]);
        assert_eq!(bytes[68..76], [2, 0, 0, 0, 0, 0, 0, 0]);
    }
}
