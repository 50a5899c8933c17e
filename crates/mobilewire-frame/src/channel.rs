//! A single owned byte channel speaking length-prefixed messages.

use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};
use mobilewire_transport::{ServiceStream, TransportError};
use tracing::trace;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::reader::read_message;
use crate::writer::write_full;

/// Owns a service channel and exchanges framed messages over it.
///
/// Device channels are handed over as one bidirectional handle, so reads and
/// writes share the same value here. Unframed helpers are available for
/// protocols that mix raw bytes into the stream.
pub struct FramedChannel<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read + Write> FramedChannel<T> {
    /// Wrap a channel with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Wrap a channel with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
        }
    }

    /// Send one length-prefixed message.
    pub fn send_message(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }
        self.buf.clear();
        encode_frame(payload, &mut self.buf)?;
        write_full(&mut self.inner, &self.buf)?;
        trace!(len = payload.len(), "sent message");
        Ok(())
    }

    /// Receive exactly one length-prefixed message.
    pub fn recv_message(&mut self) -> Result<Bytes> {
        read_message(&mut self.inner, self.config.max_payload_size)
    }

    /// Send bytes without a length header.
    pub fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        write_full(&mut self.inner, data)
    }

    /// Receive whatever the channel delivers next, up to `max_len` bytes.
    ///
    /// A zero-length read means the channel is gone and is reported as a
    /// short read, never as an empty chunk.
    pub fn recv_raw(&mut self, max_len: usize) -> Result<Bytes> {
        let mut chunk = BytesMut::zeroed(max_len.max(1));
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    return Err(TransportError::ShortRead {
                        expected: 1,
                        received: 0,
                    }
                    .into())
                }
                Ok(n) => {
                    chunk.truncate(n);
                    return Ok(chunk.freeze());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_read(err, 1, 0).into()),
            }
        }
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Release the underlying channel.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current channel configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FramedChannel<ServiceStream> {
    /// Wrap a `ServiceStream`, applying read and write timeouts from config.
    pub fn with_config_stream(inner: ServiceStream, config: FrameConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

impl<T> std::fmt::Debug for FramedChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedChannel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
