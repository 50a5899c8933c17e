//! List installed applications through a socket relay.
//!
//! Run with:
//!   cargo run --example list-apps --features logging -- /tmp/device-relay
//!
//! The relay directory must hold one `<service>.sock` per forwarded service.

use std::path::PathBuf;

use clap::Parser;
use mobilewire::logging::{init_logging, LogFormat, LogLevel};
use mobilewire::plist::AppRecord;
use mobilewire::transport::SocketDirProvider;
use mobilewire::DeviceServices;

#[derive(Parser, Debug)]
#[command(name = "list-apps", about = "List installed applications")]
struct Args {
    relay: PathBuf,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", env = "MOBILEWIRE_LOG")]
    log_level: LogLevel,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_format, args.log_level);

    let mut device = DeviceServices::new(SocketDirProvider::new(args.relay));

    for (bundle_id, info) in device.lookup_applications()? {
        let path = mobilewire::plist::Value::Dictionary(info)
            .deserialize_into::<AppRecord>()
            .map(|record| record.executable_path())
            .unwrap_or_default();
        println!("{bundle_id}\t{path}");
    }
    Ok(())
}
