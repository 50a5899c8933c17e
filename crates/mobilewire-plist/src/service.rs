use std::io::{Read, Write};

use mobilewire_frame::{FrameConfig, FramedChannel};
use mobilewire_transport::ServiceStream;
use tracing::{debug, trace, warn};

use crate::error::{PlistError, Result};
use crate::value::{Dictionary, Value};

/// Key every outbound command must carry.
pub const COMMAND_KEY: &str = "Command";

/// Build a command mapping holding only the `Command` key.
pub fn command(name: &str) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert(COMMAND_KEY.to_string(), Value::from(name));
    dict
}

/// Request/reply conversation with a property-list service.
///
/// Each request is one framed XML document and each reply is exactly one
/// framed document. Requests are never pipelined.
pub struct PlistService<T> {
    channel: FramedChannel<T>,
}

impl<T: Read + Write> PlistService<T> {
    /// Wrap an activated service channel.
    pub fn new(channel: T) -> Self {
        Self::with_config(channel, FrameConfig::default())
    }

    /// Wrap an activated service channel with explicit frame limits.
    pub fn with_config(channel: T, config: FrameConfig) -> Self {
        Self {
            channel: FramedChannel::with_config(channel, config),
        }
    }

    /// Wrap an already framed channel.
    pub fn from_framed(channel: FramedChannel<T>) -> Self {
        Self { channel }
    }

    /// Run `f` against a fresh conversation, then always attempt `Hangup`.
    ///
    /// An error from `f` wins over a hangup failure. The channel is handed
    /// back so the caller can release it to the connection manager.
    pub fn converse<R>(channel: T, f: impl FnOnce(&mut Self) -> Result<R>) -> (T, Result<R>) {
        let mut service = Self::new(channel);
        let outcome = f(&mut service);
        let hangup = service.hangup();
        let outcome = match (outcome, hangup) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(hangup_err)) => {
                warn!(error = %hangup_err, "hangup failed after conversation error");
                Err(err)
            }
        };
        (service.into_inner(), outcome)
    }

    /// Send one command mapping.
    pub fn send(&mut self, message: &Dictionary) -> Result<()> {
        match message.get(COMMAND_KEY) {
            Some(Value::String(name)) if name.is_ascii() => {
                trace!(command = %name, "sending command");
            }
            _ => {
                return Err(PlistError::Protocol(
                    "command mapping needs an ASCII Command string".into(),
                ))
            }
        }
        let xml = Value::Dictionary(message.clone()).to_xml()?;
        self.channel.send_message(&xml)?;
        Ok(())
    }

    /// Receive one response mapping.
    pub fn recv(&mut self) -> Result<Dictionary> {
        let payload = self.channel.recv_message()?;
        let value = Value::from_bytes(&payload)?;
        value
            .into_dictionary()
            .ok_or_else(|| PlistError::Protocol("response is not a dictionary".into()))
    }

    /// Send a command and read exactly one response.
    pub fn request(&mut self, message: &Dictionary) -> Result<Dictionary> {
        self.send(message)?;
        self.recv()
    }

    /// Write bytes to the channel without framing.
    pub fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.channel.send_raw(data)?;
        Ok(())
    }

    /// End the session. The device does not reply to `Hangup`.
    pub fn hangup(&mut self) -> Result<()> {
        debug!("hanging up service session");
        self.send(&command("Hangup"))
    }

    /// Borrow the framed channel.
    pub fn channel_mut(&mut self) -> &mut FramedChannel<T> {
        &mut self.channel
    }

    /// Release the underlying channel.
    pub fn into_inner(self) -> T {
        self.channel.into_inner()
    }
}

impl PlistService<ServiceStream> {
    /// Wrap a `ServiceStream`, applying channel timeouts from config.
    pub fn with_config_stream(channel: ServiceStream, config: FrameConfig) -> Result<Self> {
        Ok(Self::from_framed(FramedChannel::with_config_stream(
            channel, config,
        )?))
    }
}

impl<T> std::fmt::Debug for PlistService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlistService")
            .field("channel", &self.channel)
            .finish()
    }
}
