use std::collections::VecDeque;
use std::io::{Read, Write};

use bytes::{Buf, BytesMut};
use mobilewire_frame::{read_full, write_full};
use mobilewire_transport::ServiceStream;
use tracing::{debug, trace};

use crate::device::{AfcDevice, OpenMode};
use crate::error::{AfcError, Result};
use crate::protocol::{encode_packet, path_data, split_names, Operation, PacketHeader, HEADER_SIZE};
use crate::status::AfcStatus;

/// Wire-level limits for an AFC channel.
#[derive(Debug, Clone)]
pub struct AfcConfig {
    /// Largest response accepted, header included.
    pub max_packet_size: usize,
    /// Blocking read timeout applied to `ServiceStream` channels.
    pub read_timeout: Option<std::time::Duration>,
}

impl Default for AfcConfig {
    fn default() -> Self {
        Self {
            max_packet_size: 16 * 1024 * 1024,
            read_timeout: None,
        }
    }
}

struct Response {
    operation: Option<Operation>,
    header_data: Vec<u8>,
    payload: Vec<u8>,
}

impl Response {
    /// Status code of a STATUS reply, success for anything else.
    fn status(&self) -> Result<AfcStatus> {
        if self.operation != Some(Operation::Status) {
            return Ok(AfcStatus::SUCCESS);
        }
        let mut data = self.header_data.as_slice();
        if data.len() < 8 {
            return Err(AfcError::Protocol("status packet without a code".into()));
        }
        Ok(AfcStatus(data.get_u64_le()))
    }
}

/// [`AfcDevice`] speaking AFC packets over a byte channel.
///
/// The service lists a directory in one `READ_DIR` reply, so directory
/// identifiers refer to listings held here and are never sent to the device.
pub struct AfcWire<T> {
    inner: T,
    config: AfcConfig,
    packet_num: u64,
    buf: BytesMut,
    listings: Vec<Option<VecDeque<String>>>,
}

impl<T: Read + Write> AfcWire<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, AfcConfig::default())
    }

    pub fn with_config(inner: T, config: AfcConfig) -> Self {
        Self {
            inner,
            config,
            packet_num: 0,
            buf: BytesMut::new(),
            listings: Vec::new(),
        }
    }

    pub fn config(&self) -> &AfcConfig {
        &self.config
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn transact(&mut self, operation: Operation, header_data: &[u8], payload: &[u8]) -> Result<Response> {
        let packet_num = self.packet_num;
        self.packet_num += 1;

        self.buf.clear();
        encode_packet(operation, packet_num, header_data, payload, &mut self.buf);
        write_full(&mut self.inner, &self.buf)?;
        trace!(?operation, packet_num, len = self.buf.len(), "sent afc packet");

        let mut raw = [0u8; HEADER_SIZE];
        read_full(&mut self.inner, &mut raw)?;
        let header = PacketHeader::decode(&raw)?;
        if header.entire_length as usize > self.config.max_packet_size {
            return Err(AfcError::Protocol(format!(
                "response of {} bytes exceeds limit of {}",
                header.entire_length, self.config.max_packet_size
            )));
        }
        if header.packet_num != packet_num {
            return Err(AfcError::Protocol(format!(
                "reply to packet {} answered packet {packet_num}",
                header.packet_num
            )));
        }

        let mut header_data = vec![0u8; header.header_data_len()];
        read_full(&mut self.inner, &mut header_data)?;
        let mut payload = vec![0u8; header.payload_len()];
        read_full(&mut self.inner, &mut payload)?;

        let response = Response {
            operation: Operation::from_code(header.operation),
            header_data,
            payload,
        };
        if response.operation.is_none() {
            return Err(AfcError::Protocol(format!(
                "unknown reply operation {:#x}",
                header.operation
            )));
        }
        Ok(response)
    }

    fn listing(&mut self, dir: u64) -> Option<&mut VecDeque<String>> {
        self.listings
            .get_mut(usize::try_from(dir).ok()?)
            .and_then(Option::as_mut)
    }
}

impl<T: Read + Write> AfcDevice for AfcWire<T> {
    fn file_open(&mut self, path: &str, mode: OpenMode) -> Result<(AfcStatus, Option<u64>)> {
        let mut header = (mode.file_mode() as u64).to_le_bytes().to_vec();
        header.extend_from_slice(&path_data(path));
        let response = self.transact(Operation::FileOpen, &header, &[])?;
        let status = response.status()?;
        if response.operation != Some(Operation::FileOpenResult) {
            return Ok((status, None));
        }
        let mut data = response.header_data.as_slice();
        if data.len() < 8 {
            return Ok((status, None));
        }
        let handle = data.get_u64_le();
        debug!(path, handle, "opened remote file");
        Ok((status, Some(handle)))
    }

    fn file_read(&mut self, file: u64, length: usize) -> Result<(AfcStatus, Vec<u8>)> {
        let mut header = file.to_le_bytes().to_vec();
        header.extend_from_slice(&(length as u64).to_le_bytes());
        let response = self.transact(Operation::FileRead, &header, &[])?;
        let status = response.status()?;
        Ok((status, response.payload))
    }

    fn file_write(&mut self, file: u64, data: &[u8]) -> Result<AfcStatus> {
        self.transact(Operation::FileWrite, &file.to_le_bytes(), data)?
            .status()
    }

    fn file_close(&mut self, file: u64) -> Result<AfcStatus> {
        self.transact(Operation::FileClose, &file.to_le_bytes(), &[])?
            .status()
    }

    fn make_directory(&mut self, path: &str) -> Result<AfcStatus> {
        self.transact(Operation::MakeDir, &path_data(path), &[])?
            .status()
    }

    fn directory_open(&mut self, path: &str) -> Result<(AfcStatus, Option<u64>)> {
        let response = self.transact(Operation::ReadDir, &path_data(path), &[])?;
        let status = response.status()?;
        if !status.is_success() {
            return Ok((status, None));
        }
        let names: VecDeque<String> = split_names(&response.payload).into();
        debug!(path, entries = names.len(), "listed remote directory");
        let slot = match self.listings.iter().position(Option::is_none) {
            Some(free) => {
                self.listings[free] = Some(names);
                free
            }
            None => {
                self.listings.push(Some(names));
                self.listings.len() - 1
            }
        };
        Ok((status, Some(slot as u64)))
    }

    fn directory_read(&mut self, dir: u64) -> Result<(AfcStatus, Option<String>)> {
        match self.listing(dir) {
            Some(names) => Ok((AfcStatus::SUCCESS, names.pop_front())),
            None => Ok((AfcStatus::INVALID_ARG, None)),
        }
    }

    fn directory_close(&mut self, dir: u64) -> Result<AfcStatus> {
        let slot = usize::try_from(dir)
            .ok()
            .and_then(|index| self.listings.get_mut(index));
        match slot {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(AfcStatus::SUCCESS)
            }
            _ => Ok(AfcStatus::INVALID_ARG),
        }
    }
}

impl AfcWire<ServiceStream> {
    /// Wrap a `ServiceStream`, applying the read timeout from config.
    pub fn with_config_stream(inner: ServiceStream, config: AfcConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn reply(num: u64, operation: Operation, header_data: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_packet(operation, num, header_data, payload, &mut buf);
        buf.to_vec()
    }

    fn wire(replies: &[Vec<u8>]) -> AfcWire<Duplex> {
        AfcWire::new(Duplex {
            input: Cursor::new(replies.concat()),
            output: Vec::new(),
        })
    }

    fn sent_packets(output: &[u8]) -> Vec<(PacketHeader, Vec<u8>)> {
        let mut packets = Vec::new();
        let mut rest = output;
        while !rest.is_empty() {
            let header = PacketHeader::decode(rest).unwrap();
            let len = header.entire_length as usize;
            packets.push((header, rest[HEADER_SIZE..len].to_vec()));
            rest = &rest[len..];
        }
        packets
    }

    #[test]
    fn open_sends_mode_and_path() {
        let mut wire = wire(&[reply(0, Operation::FileOpenResult, &42u64.to_le_bytes(), b"")]);
        let (status, handle) = wire.file_open("/Documents/a.txt", OpenMode::WRITE).unwrap();
        assert!(status.is_success());
        assert_eq!(handle, Some(42));

        let sent = sent_packets(&wire.into_inner().output);
        assert_eq!(sent[0].0.operation, Operation::FileOpen.code());
        assert_eq!(&sent[0].1[..8], &3u64.to_le_bytes());
        assert_eq!(&sent[0].1[8..], b"/Documents/a.txt\0");
    }

    #[test]
    fn open_refusal_reports_status() {
        let mut wire = wire(&[reply(0, Operation::Status, &8u64.to_le_bytes(), b"")]);
        let (status, handle) = wire.file_open("/missing", OpenMode::READ).unwrap();
        assert_eq!(status, AfcStatus::OBJECT_NOT_FOUND);
        assert_eq!(handle, None);
    }

    #[test]
    fn read_returns_data_payload() {
        let mut wire = wire(&[reply(0, Operation::Data, b"", b"partial")]);
        let (status, data) = wire.file_read(42, 8192).unwrap();
        assert!(status.is_success());
        assert_eq!(data, b"partial");

        let sent = sent_packets(&wire.into_inner().output);
        assert_eq!(&sent[0].1[..8], &42u64.to_le_bytes());
        assert_eq!(&sent[0].1[8..], &8192u64.to_le_bytes());
    }

    #[test]
    fn write_carries_payload_after_handle() {
        let mut wire = wire(&[reply(0, Operation::Status, &0u64.to_le_bytes(), b"")]);
        assert!(wire.file_write(7, b"bytes").unwrap().is_success());

        let sent = sent_packets(&wire.into_inner().output);
        assert_eq!(sent[0].0.this_length, 48);
        assert_eq!(sent[0].0.entire_length, 53);
        assert_eq!(&sent[0].1[8..], b"bytes");
    }

    #[test]
    fn packet_numbers_increase() {
        let status_ok = 0u64.to_le_bytes();
        let mut wire = wire(&[
            reply(0, Operation::Status, &status_ok, b""),
            reply(1, Operation::Status, &status_ok, b""),
        ]);
        wire.make_directory("/a").unwrap();
        wire.file_close(1).unwrap();

        let sent = sent_packets(&wire.into_inner().output);
        assert_eq!(sent[0].0.packet_num, 0);
        assert_eq!(sent[1].0.packet_num, 1);
        assert_eq!(sent[1].0.operation, Operation::FileClose.code());
    }

    #[test]
    fn mismatched_packet_number_is_protocol_error() {
        let mut wire = wire(&[reply(5, Operation::Status, &0u64.to_le_bytes(), b"")]);
        assert!(matches!(wire.make_directory("/a"), Err(AfcError::Protocol(_))));
    }

    #[test]
    fn directory_listing_is_served_locally() {
        let mut wire = wire(&[reply(0, Operation::Data, b"", b".\0..\0a\0b\0")]);
        let (status, dir) = wire.directory_open("/").unwrap();
        assert!(status.is_success());
        let dir = dir.unwrap();

        let mut names = Vec::new();
        while let (status, Some(name)) = wire.directory_read(dir).unwrap() {
            assert!(status.is_success());
            names.push(name);
        }
        assert_eq!(names, [".", "..", "a", "b"]);
        assert!(wire.directory_close(dir).unwrap().is_success());
        assert_eq!(wire.directory_close(dir).unwrap(), AfcStatus::INVALID_ARG);
        assert_eq!(wire.directory_read(dir).unwrap().0, AfcStatus::INVALID_ARG);
    }

    #[test]
    fn client_listing_drops_interleaved_dot_entries() {
        let wire = wire(&[reply(0, Operation::Data, b"", b"a\0.\0..\0b\0")]);
        let mut client = crate::AfcClient::new(wire);
        assert_eq!(client.list_directory("/var").unwrap(), ["a", "b"]);

        let (wire, leaked) = client.shutdown();
        assert!(leaked.unwrap().is_empty());
        let sent = sent_packets(&wire.into_inner().output);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.operation, Operation::ReadDir.code());
        assert_eq!(sent[0].1, b"/var\0");
    }

    #[test]
    fn truncated_reply_is_transport_error() {
        let mut full = reply(0, Operation::Data, b"", b"0123456789");
        full.truncate(45);
        let mut wire = wire(&[full]);
        let err = wire.file_read(1, 10).unwrap_err();
        assert!(matches!(err, AfcError::Transport(ref e) if e.is_closed()));
    }
}
