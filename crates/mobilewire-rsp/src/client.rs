use std::io::{Read, Write};

use mobilewire_frame::{FrameConfig, FramedChannel};
use mobilewire_transport::ServiceStream;
use tracing::{debug, info, warn};

use crate::command::{
    argv_packet, environment_packet, CONTINUE, DISABLE_ASLR, LAUNCH_SUCCESS, START_NO_ACK_MODE,
};
use crate::error::{DebugError, Result};
use crate::packet::{encode_packet, PacketParser};
use crate::stop_reply::{expects_stop_reply, parse_stop_reply, StopReply};

/// Debug client settings.
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Bytes requested per channel read.
    pub recv_chunk_size: usize,
    /// Send `QSetDisableASLR:1` during launch.
    pub disable_aslr: bool,
    /// `KEY=VALUE` entries passed to the launched program.
    pub environment: Vec<String>,
    /// Inbound bytes held without a complete packet before giving up.
    pub max_buffered: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            recv_chunk_size: 4096,
            disable_aslr: true,
            environment: Vec::new(),
            max_buffered: 1024 * 1024,
        }
    }
}

/// Outcome of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Reply payload of a simple command.
    Packet(String),
    /// The program exited with this status during a stop-reply sequence.
    Exited(i32),
}

/// Remote serial protocol client bound to one debug server channel.
///
/// Outbound packets are length-prefixed; inbound bytes arrive unframed and
/// are reassembled by a [`PacketParser`]. Program console output is written to
/// `output` as it arrives.
///
/// Console bytes are hex-decoded and passed to `output` without UTF-8
/// validation, so a character split across two `O` packets arrives intact and
/// invalid sequences are left for the sink to handle.
pub struct DebugClient<T, O> {
    channel: FramedChannel<T>,
    parser: PacketParser,
    output: O,
    config: DebugConfig,
    exit_code: Option<i32>,
}

impl<T: Read + Write, O: Write> DebugClient<T, O> {
    pub fn new(channel: T, output: O) -> Self {
        Self::with_config(channel, output, DebugConfig::default())
    }

    pub fn with_config(channel: T, output: O, config: DebugConfig) -> Self {
        Self::from_framed(FramedChannel::new(channel), output, config)
    }

    pub fn from_framed(channel: FramedChannel<T>, output: O, config: DebugConfig) -> Self {
        Self {
            channel,
            parser: PacketParser::new(config.max_buffered),
            output,
            config,
            exit_code: None,
        }
    }

    /// Launch `argv[0]` with `argv` and run it to completion.
    ///
    /// Returns the exit status. A signal stop, abnormal termination or launch
    /// refusal is an error.
    pub fn launch<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<i32> {
        if argv.is_empty() {
            return Err(DebugError::LaunchFailed("empty argument vector".into()));
        }

        let reply = self.request(START_NO_ACK_MODE)?;
        if reply != "OK" {
            warn!(%reply, "server did not confirm no-ack mode");
        }
        // A bare `+` acknowledges the no-ack reply; it is not a `$+#2b` packet.
        self.channel.send_message(b"+")?;

        let environment = if self.config.environment.is_empty() {
            vec![environment_packet("")]
        } else {
            self.config
                .environment
                .iter()
                .map(|entry| environment_packet(entry))
                .collect()
        };
        for packet in environment {
            self.request(&packet)?;
        }
        if self.config.disable_aslr {
            self.request(DISABLE_ASLR)?;
        }

        let reply = self.request(&argv_packet(argv))?;
        if reply.starts_with('E') {
            return Err(DebugError::LaunchFailed(format!(
                "arguments rejected: {reply}"
            )));
        }
        let reply = self.request(LAUNCH_SUCCESS)?;
        if reply != "OK" {
            return Err(DebugError::LaunchFailed(reply));
        }
        info!(program = argv[0].as_ref(), "program launched");

        match self.send(CONTINUE)? {
            Reply::Exited(code) => Ok(code),
            Reply::Packet(payload) => Err(DebugError::Protocol(format!(
                "unexpected reply to {CONTINUE}: {payload:?}"
            ))),
        }
    }

    /// Send `command` and collect its reply.
    ///
    /// Resume and query commands drive the stop-reply loop; everything else
    /// reads exactly one packet.
    pub fn send(&mut self, command: &str) -> Result<Reply> {
        self.send_packet(command)?;
        if expects_stop_reply(command) {
            self.stop_reply_loop()
        } else {
            Ok(Reply::Packet(self.read_packet()?))
        }
    }

    /// Send a simple command and return its reply payload.
    pub fn request(&mut self, command: &str) -> Result<String> {
        match self.send(command)? {
            Reply::Packet(payload) => Ok(payload),
            Reply::Exited(code) => Err(DebugError::Protocol(format!(
                "{command} ended the program with status {code}"
            ))),
        }
    }

    /// Send one packet without waiting for a reply.
    pub fn send_packet(&mut self, payload: &str) -> Result<()> {
        debug!(%payload, "sending packet");
        self.channel.send_message(encode_packet(payload).as_bytes())?;
        Ok(())
    }

    /// Block until one whole packet has arrived.
    pub fn read_packet(&mut self) -> Result<String> {
        loop {
            if let Some(payload) = self.parser.next_packet()? {
                return Ok(payload);
            }
            let chunk = self.channel.recv_raw(self.config.recv_chunk_size)?;
            self.parser.push(&chunk);
        }
    }

    fn stop_reply_loop(&mut self) -> Result<Reply> {
        loop {
            let payload = self.read_packet()?;
            match parse_stop_reply(&payload)? {
                StopReply::Output(bytes) => {
                    self.output.write_all(&bytes)?;
                    self.output.flush()?;
                }
                StopReply::Exited(code) => {
                    self.exit_code = Some(code);
                    writeln!(self.output, "Process returned {code}.")?;
                    self.output.flush()?;
                    info!(code, "program exited");
                    return Ok(Reply::Exited(code));
                }
                StopReply::Signal(stop) => return Err(DebugError::Signal(stop)),
                StopReply::Terminated { signal, detail } => {
                    return Err(DebugError::Terminated { signal, detail })
                }
                StopReply::FileIo(request) => return Err(DebugError::FileIoUnsupported(request)),
            }
        }
    }

    /// Exit status recorded by the last `W` reply.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn config(&self) -> &DebugConfig {
        &self.config
    }

    /// Release the channel and output sink.
    pub fn into_parts(self) -> (T, O) {
        (self.channel.into_inner(), self.output)
    }
}

impl<O: Write> DebugClient<ServiceStream, O> {
    /// Wrap a `ServiceStream`, applying channel timeouts from `frame`.
    pub fn with_config_stream(
        channel: ServiceStream,
        output: O,
        frame: FrameConfig,
        config: DebugConfig,
    ) -> Result<Self> {
        let channel = FramedChannel::with_config_stream(channel, frame)?;
        Ok(Self::from_framed(channel, output, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use mobilewire_frame::read_message;

    use super::*;
    use crate::error::StopSignal;

    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Duplex {
        fn new(input: &[u8]) -> Self {
            Self {
                input: Cursor::new(input.to_vec()),
                output: Vec::new(),
            }
        }

        fn sent(&self) -> Vec<String> {
            let mut wire = Cursor::new(self.output.as_slice());
            let mut packets = Vec::new();
            while (wire.position() as usize) < self.output.len() {
                let payload = read_message(&mut wire, 1024).unwrap();
                packets.push(String::from_utf8(payload.to_vec()).unwrap());
            }
            packets
        }
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

    fn client(input: &[u8]) -> DebugClient<Duplex, Vec<u8>> {
        DebugClient::new(Duplex::new(input), Vec::new())
    }

    #[test]
    fn simple_command_reads_one_packet() {
        let mut client = client(b"+$OK#9a");
        assert_eq!(client.request("QStartNoAckMode").unwrap(), "OK");

        let (channel, _) = client.into_parts();
        assert_eq!(channel.sent(), ["$QStartNoAckMode#b0"]);
    }

    #[test]
    fn output_then_exit() {
        let mut client = client(b"$O48656c6c6f#f4$W00#b7");
        assert_eq!(client.send("vCont;c").unwrap(), Reply::Exited(0));
        assert_eq!(client.exit_code(), Some(0));

        let (_, output) = client.into_parts();
        assert_eq!(String::from_utf8(output).unwrap(), "HelloProcess returned 0.\n");
    }

    #[test]
    fn output_bytes_reach_sink_undecoded() {
        use crate::packet::encode_packet;

        let script = [encode_packet("Oc3"), encode_packet("Oa9ff"), encode_packet("W00")].concat();
        let mut client = client(script.as_bytes());
        assert_eq!(client.send("vCont;c").unwrap(), Reply::Exited(0));

        let (_, output) = client.into_parts();
        assert_eq!(&output[..3], b"\xc3\xa9\xff");
        assert_eq!(&output[..2], "\u{e9}".as_bytes());
    }

    #[test]
    fn signal_stop_is_error_without_exit_code() {
        let mut client = client(b"$T0500#19");
        let err = client.send("vCont;c").unwrap_err();
        assert!(matches!(
            err,
            DebugError::Signal(StopSignal { signal: 5, ref details }) if details.is_empty()
        ));
        assert_eq!(client.exit_code(), None);
    }

    #[test]
    fn termination_and_file_io_are_errors() {
        let err = client(b"$X09;description:boom#87").send("c").unwrap_err();
        assert!(matches!(err, DebugError::Terminated { signal: 9, .. }));

        let err = client(b"$Fopen,1234/10,0,0#00").send("c").unwrap_err();
        assert!(matches!(err, DebugError::FileIoUnsupported(_)));

        let err = client(b"$E45#ae").send("?").unwrap_err();
        assert!(matches!(err, DebugError::Protocol(_)));
    }

    #[test]
    fn checksum_mismatch_is_fatal() {
        assert_eq!(client(b"$OK#00").request("qLaunchSuccess").unwrap(), "OK");

        let mut client = client(b"$OK#9b");
        assert!(matches!(
            client.request("qLaunchSuccess"),
            Err(DebugError::Checksum { .. })
        ));
    }

    #[test]
    fn closed_channel_is_transport_error() {
        let err = client(b"$O4865").send("vCont;c").unwrap_err();
        assert!(matches!(err, DebugError::Frame(ref e) if e.is_closed()));
    }

    #[test]
    fn launch_runs_full_prologue() {
        let ok = "$OK#9a";
        let script = format!("+{ok}{ok}{ok}{ok}{ok}$O48656c6c6f#f4$W2a#ea");
        let config = DebugConfig {
            recv_chunk_size: 3,
            ..DebugConfig::default()
        };
        let mut client =
            DebugClient::with_config(Duplex::new(script.as_bytes()), Vec::new(), config);

        assert_eq!(client.launch(&["app1"]).unwrap(), 42);

        let (channel, output) = client.into_parts();
        assert_eq!(
            channel.sent(),
            [
                "$QStartNoAckMode#b0",
                "+",
                "$QEnvironmentHexEncoded:#f7",
                "$QSetDisableASLR:1#ce",
                "$A8,0,61707031,#c6",
                "$qLaunchSuccess#a5",
                "$vCont;c#a8",
            ]
        );
        assert_eq!(String::from_utf8(output).unwrap(), "HelloProcess returned 42.\n");
    }

    #[test]
    fn launch_failure_carries_device_text() {
        let ok = "$OK#9a";
        let script = format!("{ok}{ok}{ok}{ok}$E01#a6");
        let mut client = client(script.as_bytes());

        let err = client.launch(&["app1"]).unwrap_err();
        assert!(matches!(err, DebugError::LaunchFailed(ref text) if text == "E01"));
    }

    #[test]
    fn environment_entries_replace_the_clear() {
        let ok = "$OK#9a";
        let script = format!("{ok}{ok}{ok}{ok}$W00#b7");
        let config = DebugConfig {
            environment: vec!["FOO=1".into()],
            disable_aslr: false,
            ..DebugConfig::default()
        };
        let mut client = DebugClient::with_config(Duplex::new(script.as_bytes()), Vec::new(), config);
        assert_eq!(client.launch(&["app1"]).unwrap(), 0);

        let (channel, _) = client.into_parts();
        let sent = channel.sent();
        assert_eq!(sent[2], "$QEnvironmentHexEncoded:464f4f3d31#90");
        assert_eq!(sent[3], "$A8,0,61707031,#c6");
    }
}
