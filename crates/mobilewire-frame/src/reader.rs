use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use mobilewire_transport::TransportError;
use tracing::trace;

use crate::codec::{decode_header, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Fill `buf` completely from `inner`.
///
/// A zero-length read or a timed-out read before `buf` is full is a
/// [`TransportError::ShortRead`]; interrupted reads are retried.
pub fn read_full<R: Read + ?Sized>(inner: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(TransportError::ShortRead {
                    expected: buf.len(),
                    received: filled,
                }
                .into())
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::from_read(err, buf.len(), filled).into()),
        }
    }
    Ok(())
}

/// Read one length-prefixed message from `inner` without over-reading.
pub fn read_message<R: Read + ?Sized>(inner: &mut R, max_payload: usize) -> Result<Bytes> {
    let mut header = [0u8; HEADER_SIZE];
    read_full(inner, &mut header)?;

    let len = decode_header(header);
    if len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: max_payload,
        });
    }

    let mut payload = BytesMut::zeroed(len);
    read_full(inner, &mut payload)?;
    trace!(len, "read framed message");
    Ok(payload.freeze())
}
