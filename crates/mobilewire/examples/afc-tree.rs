//! Print the remote filesystem tree below a path.
//!
//! Run with:
//!   cargo run --example afc-tree --features logging -- /tmp/device-relay [/path]

use std::path::PathBuf;

use clap::Parser;
use mobilewire::afc::{format_walk, walk};
use mobilewire::logging::{init_logging, LogFormat, LogLevel};
use mobilewire::transport::SocketDirProvider;
use mobilewire::DeviceServices;

#[derive(Parser, Debug)]
#[command(name = "afc-tree", about = "Print a device directory tree")]
struct Args {
    /// Directory holding one `<service>.sock` per forwarded service.
    relay: PathBuf,

    /// Remote directory to walk.
    #[arg(default_value = "/")]
    root: String,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: LogLevel,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_format, args.log_level);

    let mut device = DeviceServices::new(SocketDirProvider::new(args.relay));
    let entries = device.with_afc(|afc| walk(afc, &args.root))?;
    print!("{}", format_walk(&entries));
    Ok(())
}
