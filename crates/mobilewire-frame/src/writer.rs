use std::io::{ErrorKind, Write};

use mobilewire_transport::TransportError;

use crate::error::Result;

/// Write all of `data` to `inner`, blocking until fully submitted.
///
/// A zero-length or timed-out write is a [`TransportError::ShortWrite`].
pub fn write_full<W: Write + ?Sized>(inner: &mut W, data: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < data.len() {
        match inner.write(&data[offset..]) {
            Ok(0) => {
                return Err(TransportError::ShortWrite {
                    expected: data.len(),
                    written: offset,
                }
                .into())
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(TransportError::ShortWrite {
                    expected: data.len(),
                    written: offset,
                }
                .into())
            }
            Err(err) => return Err(TransportError::Io(err).into()),
        }
    }

    loop {
        match inner.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err).into()),
        }
    }
}
