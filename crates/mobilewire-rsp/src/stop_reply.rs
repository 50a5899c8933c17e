//! Stop-reply packet interpretation.

use crate::error::{DebugError, Result, StopSignal};

/// Commands whose reply is a stop-reply sequence rather than one packet.
const STOP_REPLY_PREFIXES: [&str; 9] = ["C", "c", "S", "s", "vCont", "vAttach", "vRun", "vStopped", "?"];

/// True when `command` resumes or queries the inferior and is answered with
/// stop replies.
pub fn expects_stop_reply(command: &str) -> bool {
    STOP_REPLY_PREFIXES
        .iter()
        .any(|prefix| command.starts_with(prefix))
}

/// One decoded stop-reply packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReply {
    /// `S`/`T`: stopped on a signal.
    Signal(StopSignal),
    /// `W`: exited with a status code.
    Exited(i32),
    /// `X`: killed by a signal.
    Terminated { signal: u8, detail: String },
    /// `O`: console output bytes.
    Output(Vec<u8>),
    /// `F`: host file I/O request.
    FileIo(String),
}

/// Decode a stop-reply payload.
pub fn parse_stop_reply(payload: &str) -> Result<StopReply> {
    match payload.as_bytes().first() {
        Some(b'S') => Ok(StopReply::Signal(StopSignal {
            signal: signal_number(payload)?,
            details: Vec::new(),
        })),
        Some(b'T') => Ok(StopReply::Signal(StopSignal {
            signal: signal_number(payload)?,
            details: payload
                .get(3..)
                .unwrap_or_default()
                .split(';')
                .filter_map(|pair| pair.split_once(':'))
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        })),
        Some(b'W') => {
            let code = payload[1..].split(';').next().unwrap_or_default();
            i32::from_str_radix(code, 16)
                .map(StopReply::Exited)
                .map_err(|_| DebugError::Protocol(format!("bad exit status in {payload:?}")))
        }
        Some(b'X') => {
            let signal = signal_number(payload)?;
            let detail = match payload.split_once(';') {
                Some((_, rest)) => rest.to_string(),
                None => payload.to_string(),
            };
            Ok(StopReply::Terminated { signal, detail })
        }
        Some(b'O') => hex::decode(&payload[1..])
            .map(StopReply::Output)
            .map_err(|err| DebugError::Protocol(format!("bad console output packet: {err}"))),
        Some(b'F') => Ok(StopReply::FileIo(payload[1..].to_string())),
        _ => Err(DebugError::Protocol(format!(
            "unexpected response to stop reply packet: {payload:?}"
        ))),
    }
}

fn signal_number(payload: &str) -> Result<u8> {
    payload
        .get(1..3)
        .and_then(|digits| u8::from_str_radix(digits, 16).ok())
        .ok_or_else(|| DebugError::Protocol(format!("bad signal number in {payload:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        for command in ["vCont;c", "c", "C05", "s", "S05", "vAttach;1", "vRun;61", "vStopped", "?"] {
            assert!(expects_stop_reply(command), "{command}");
        }
        for command in ["QStartNoAckMode", "qLaunchSuccess", "A8,0,61707031,", "QSetDisableASLR:1"] {
            assert!(!expects_stop_reply(command), "{command}");
        }
    }

    #[test]
    fn bare_t_reply_has_no_details() {
        assert_eq!(
            parse_stop_reply("T0500").unwrap(),
            StopReply::Signal(StopSignal {
                signal: 5,
                details: Vec::new()
            })
        );
    }

    #[test]
    fn t_reply_details_in_order() {
        let StopReply::Signal(stop) = parse_stop_reply("T11thread:1;name:main;").unwrap() else {
            panic!("expected signal");
        };
        assert_eq!(stop.signal, 0x11);
        assert_eq!(
            stop.details,
            vec![
                ("thread".to_string(), "1".to_string()),
                ("name".to_string(), "main".to_string())
            ]
        );
    }

    #[test]
    fn exit_codes_are_hex() {
        assert_eq!(parse_stop_reply("W00").unwrap(), StopReply::Exited(0));
        assert_eq!(parse_stop_reply("W2a").unwrap(), StopReply::Exited(42));
        assert_eq!(
            parse_stop_reply("W01;process:1f3").unwrap(),
            StopReply::Exited(1)
        );
    }

    #[test]
    fn terminated_keeps_detail_after_semicolon() {
        assert_eq!(
            parse_stop_reply("X09;description:boom").unwrap(),
            StopReply::Terminated {
                signal: 9,
                detail: "description:boom".into()
            }
        );
    }

    #[test]
    fn output_is_hex_decoded() {
        assert_eq!(
            parse_stop_reply("O48656c6c6f").unwrap(),
            StopReply::Output(b"Hello".to_vec())
        );
        assert!(parse_stop_reply("Ozz").is_err());
    }

    #[test]
    fn unknown_tag_is_protocol_error() {
        let err = parse_stop_reply("E45").unwrap_err();
        assert!(err.to_string().contains("unexpected response to stop reply packet"));
        assert!(parse_stop_reply("").is_err());
    }
}
