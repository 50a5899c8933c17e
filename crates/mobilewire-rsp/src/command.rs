//! Builders for the launch prologue packets.

pub const START_NO_ACK_MODE: &str = "QStartNoAckMode";
pub const DISABLE_ASLR: &str = "QSetDisableASLR:1";
pub const LAUNCH_SUCCESS: &str = "qLaunchSuccess";
pub const CONTINUE: &str = "vCont;c";

const ENVIRONMENT_PREFIX: &str = "QEnvironmentHexEncoded:";

/// `QEnvironmentHexEncoded:<hex>`; an empty entry yields the bare prefix.
pub fn environment_packet(entry: &str) -> String {
    format!("{ENVIRONMENT_PREFIX}{}", hex::encode(entry))
}

/// Program arguments as `A<len>,<index>,<hex>,` per argument.
///
/// `len` counts hex digits, i.e. twice the UTF-8 byte length.
pub fn argv_packet<S: AsRef<str>>(argv: &[S]) -> String {
    let mut packet = String::from("A");
    for (index, arg) in argv.iter().enumerate() {
        let encoded = hex::encode(arg.as_ref());
        packet.push_str(&format!("{},{},{},", encoded.len(), index, encoded));
    }
    packet
}
