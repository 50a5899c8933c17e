//! AFC packet layout.
//!
//! ```text
//! +----------+--------------+------------+------------+-----------+-------------+---------+
//! | CFA6LPAA | entire (u64) | this (u64) | num (u64)  | op (u64)  | header data | payload |
//! +----------+--------------+------------+------------+-----------+-------------+---------+
//! ```
//!
//! All integers are little-endian. `this` covers the 40-byte header plus
//! header data; `entire` additionally covers the payload.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{AfcError, Result};

pub const MAGIC: &[u8; 8] = b"CFA6LPAA";
pub const HEADER_SIZE: usize = 40;

/// Operation codes used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Operation {
    Status = 0x01,
    Data = 0x02,
    ReadDir = 0x03,
    MakeDir = 0x09,
    FileOpen = 0x0D,
    FileOpenResult = 0x0E,
    FileRead = 0x0F,
    FileWrite = 0x10,
    FileClose = 0x14,
}

impl Operation {
    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0x01 => Self::Status,
            0x02 => Self::Data,
            0x03 => Self::ReadDir,
            0x09 => Self::MakeDir,
            0x0D => Self::FileOpen,
            0x0E => Self::FileOpenResult,
            0x0F => Self::FileRead,
            0x10 => Self::FileWrite,
            0x14 => Self::FileClose,
            _ => return None,
        })
    }
}

/// File open modes understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum FileMode {
    ReadOnly = 1,
    ReadWrite = 2,
    WriteOnly = 3,
}

/// Decoded fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub entire_length: u64,
    pub this_length: u64,
    pub packet_num: u64,
    pub operation: u64,
}

impl PacketHeader {
    pub fn decode(mut raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_SIZE || &raw[..8] != MAGIC {
            return Err(AfcError::Protocol("bad packet magic".into()));
        }
        raw.advance(8);
        let header = Self {
            entire_length: raw.get_u64_le(),
            this_length: raw.get_u64_le(),
            packet_num: raw.get_u64_le(),
            operation: raw.get_u64_le(),
        };
        if header.this_length < HEADER_SIZE as u64 || header.entire_length < header.this_length {
            return Err(AfcError::Protocol(format!(
                "inconsistent packet lengths: entire {} this {}",
                header.entire_length, header.this_length
            )));
        }
        Ok(header)
    }

    /// Header data length that follows the fixed header.
    pub fn header_data_len(&self) -> usize {
        (self.this_length as usize).saturating_sub(HEADER_SIZE)
    }

    /// Payload length that follows the header data.
    pub fn payload_len(&self) -> usize {
        (self.entire_length - self.this_length) as usize
    }
}

/// Append one complete packet to `dst`.
pub fn encode_packet(
    operation: Operation,
    packet_num: u64,
    header_data: &[u8],
    payload: &[u8],
    dst: &mut BytesMut,
) {
    let this_length = (HEADER_SIZE + header_data.len()) as u64;
    let entire_length = this_length + payload.len() as u64;
    dst.reserve(entire_length as usize);
    dst.put_slice(MAGIC);
    dst.put_u64_le(entire_length);
    dst.put_u64_le(this_length);
    dst.put_u64_le(packet_num);
    dst.put_u64_le(operation.code());
    dst.put_slice(header_data);
    dst.put_slice(payload);
}

/// NUL-terminated path as carried in header data.
pub fn path_data(path: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(path.len() + 1);
    data.extend_from_slice(path.as_bytes());
    data.push(0);
    data
}

/// Split a NUL-separated name list, dropping empty trailing entries.
pub fn split_names(data: &[u8]) -> Vec<String> {
    data.split(|b| *b == 0)
        .filter(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut buf = BytesMut::new();
        encode_packet(Operation::FileClose, 3, &7u64.to_le_bytes(), b"", &mut buf);

        assert_eq!(&buf[..8], MAGIC);
        assert_eq!(buf.len(), 48);
        let header = PacketHeader::decode(&buf).unwrap();
        assert_eq!(
            header,
            PacketHeader {
                entire_length: 48,
                this_length: 48,
                packet_num: 3,
                operation: 0x14
            }
        );
        assert_eq!(header.header_data_len(), 8);
        assert_eq!(header.payload_len(), 0);
    }

    #[test]
    fn payload_counts_only_in_entire_length() {
        let mut buf = BytesMut::new();
        encode_packet(Operation::FileWrite, 1, &9u64.to_le_bytes(), b"abc", &mut buf);
        let header = PacketHeader::decode(&buf).unwrap();
        assert_eq!(header.this_length, 48);
        assert_eq!(header.entire_length, 51);
        assert_eq!(&buf[48..], b"abc");
    }

    #[test]
    fn bad_magic_rejected() {
        let mut buf = BytesMut::new();
        encode_packet(Operation::Status, 0, &[], &[], &mut buf);
        buf[0] = b'X';
        assert!(matches!(PacketHeader::decode(&buf), Err(AfcError::Protocol(_))));
    }

    #[test]
    fn name_list_splitting() {
        assert_eq!(split_names(b".\0..\0a\0b\0"), [".", "..", "a", "b"]);
        assert!(split_names(b"").is_empty());
    }

    #[test]
    fn operation_codes_roundtrip() {
        for op in [Operation::Status, Operation::ReadDir, Operation::FileOpenResult] {
            assert_eq!(Operation::from_code(op.code()), Some(op));
        }
        assert_eq!(Operation::from_code(0x99), None);
        assert_eq!(FileMode::WriteOnly as u64, 3);
    }
}
