//! `$<payload>#<checksum>` packet encoding and incremental parsing.

use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::error::{DebugError, Result};

/// Checksum value that disables verification.
const UNCHECKED: &[u8; 2] = b"00";

/// Modulo-256 sum of the payload bytes.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

/// Wrap `payload` as `$<payload>#<two lowercase hex digits>`.
pub fn encode_packet(payload: &str) -> String {
    format!("${payload}#{:02x}", checksum(payload.as_bytes()))
}

/// Try to extract one complete packet from the front of `buffer`.
///
/// Leading `+` acknowledgements and any bytes before `$` are dropped. Returns
/// the payload (if a whole packet is present) and the unconsumed remainder.
/// An incomplete packet leaves `buffer` untouched.
pub fn try_parse_frame(buffer: &[u8]) -> Result<(Option<String>, &[u8])> {
    let Some(start) = buffer.iter().position(|b| *b == b'$') else {
        return Ok((None, buffer));
    };
    let Some(hash) = buffer[start..].iter().position(|b| *b == b'#').map(|i| start + i) else {
        return Ok((None, buffer));
    };
    if buffer.len() < hash + 3 {
        return Ok((None, buffer));
    }

    let payload = &buffer[start + 1..hash];
    let received = &buffer[hash + 1..hash + 3];
    if received != UNCHECKED {
        let computed = format!("{:02x}", checksum(payload));
        if received != computed.as_bytes() {
            return Err(DebugError::Checksum {
                received: String::from_utf8_lossy(received).into_owned(),
                computed,
            });
        }
    }

    let payload = std::str::from_utf8(payload)
        .map_err(|_| DebugError::Protocol("packet payload is not UTF-8".into()))?
        .to_string();
    Ok((Some(payload), &buffer[hash + 3..]))
}

/// Accumulates inbound bytes and yields whole packets.
#[derive(Debug)]
pub struct PacketParser {
    buf: BytesMut,
    max_buffered: usize,
}

impl PacketParser {
    pub fn new(max_buffered: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_buffered,
        }
    }

    /// Append bytes received from the channel.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete packet payload, if one is buffered.
    pub fn next_packet(&mut self) -> Result<Option<String>> {
        let (packet, remaining) = try_parse_frame(&self.buf)?;
        match packet {
            Some(payload) => {
                let consumed = self.buf.len() - remaining.len();
                self.buf.advance(consumed);
                trace!(%payload, "received packet");
                Ok(Some(payload))
            }
            None if self.buf.len() > self.max_buffered => Err(DebugError::Protocol(format!(
                "{} bytes buffered without a complete packet",
                self.buf.len()
            ))),
            None => Ok(None),
        }
    }

    /// Bytes currently held.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_known_packets() {
        assert_eq!(checksum(b"QStartNoAckMode"), 0xb0);
        assert_eq!(encode_packet("QStartNoAckMode"), "$QStartNoAckMode#b0");
        assert_eq!(encode_packet("vCont;c"), "$vCont;c#a8");
        assert_eq!(encode_packet(""), "$#00");
    }

    #[test]
    fn parse_strips_acks_and_keeps_remainder() {
        let (packet, rest) = try_parse_frame(b"++$OK#9a$W00").unwrap();
        assert_eq!(packet.as_deref(), Some("OK"));
        assert_eq!(rest, b"$W00");
    }

    #[test]
    fn incomplete_packets_wait_for_more() {
        for partial in [&b"+"[..], b"$OK", b"$OK#", b"$OK#9"] {
            let (packet, rest) = try_parse_frame(partial).unwrap();
            assert!(packet.is_none());
            assert_eq!(rest, partial);
        }
    }

    #[test]
    fn checksum_mismatch_is_fatal() {
        let err = try_parse_frame(b"$OK#9b").unwrap_err();
        assert!(matches!(err, DebugError::Checksum { ref computed, .. } if computed == "9a"));
    }

    #[test]
    fn zero_checksum_skips_verification() {
        let (packet, _) = try_parse_frame(b"$OK#00").unwrap();
        assert_eq!(packet.as_deref(), Some("OK"));
    }

    #[test]
    fn parser_reassembles_split_input() {
        let mut parser = PacketParser::new(1024);
        parser.push(b"+$O4865");
        assert_eq!(parser.next_packet().unwrap(), None);
        parser.push(b"6c6c6f#f4$W0");
        assert_eq!(parser.next_packet().unwrap().as_deref(), Some("O48656c6c6f"));
        assert_eq!(parser.next_packet().unwrap(), None);
        parser.push(b"0#b7");
        assert_eq!(parser.next_packet().unwrap().as_deref(), Some("W00"));
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn parser_bounds_buffered_garbage() {
        let mut parser = PacketParser::new(8);
        parser.push(b"$0123456789");
        assert!(matches!(parser.next_packet(), Err(DebugError::Protocol(_))));
    }
}
