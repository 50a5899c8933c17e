//! Launch an installed application under the debug server.
//!
//! Run with:
//!   cargo run --example run-app --features logging -- /tmp/device-relay com.example.App [args...]
//!
//! Console output from the program is copied to stdout and the demo exits
//! with the program's status.

use std::path::PathBuf;

use clap::Parser;
use mobilewire::logging::{init_logging, LogFormat, LogLevel};
use mobilewire::rsp::DebugConfig;
use mobilewire::transport::SocketDirProvider;
use mobilewire::DeviceServices;

#[derive(Parser, Debug)]
#[command(name = "run-app", about = "Run an installed application")]
struct Args {
    relay: PathBuf,

    bundle_id: String,

    /// Arguments passed to the program.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    program_args: Vec<String>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_format, args.log_level);

    let mut device = DeviceServices::new(SocketDirProvider::new(args.relay));
    if !device.is_developer_image_mounted()? {
        return Err("developer disk image is not mounted".into());
    }

    let executable = device.lookup_executable(&args.bundle_id)?;
    let mut argv = vec![executable];
    argv.extend(args.program_args);

    let status = device.run_program(&argv, std::io::stdout(), DebugConfig::default())?;
    eprintln!("{} exited with status {status}", args.bundle_id);
    std::process::exit(status);
}
