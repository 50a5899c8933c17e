//! Progress-bearing responses and their console rendering.

use std::io::Write;

use tracing::debug;

use crate::error::{PlistError, Result};
use crate::value::{Dictionary, Value};

/// Status value marking the end of a multi-response command.
pub const STATUS_COMPLETE: &str = "Complete";

/// Where a progress-bearing command stands after one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Intermediate status; more responses follow.
    Working(String),
    /// Terminal `Complete` status.
    Complete,
}

/// Classify one response of a command that reports progress.
///
/// An `Error` key becomes [`PlistError::DeviceStatus`] carrying the device's
/// `ErrorDescription` when present. A response with neither `Error` nor
/// `Status` is a protocol error.
pub fn classify(command: &str, response: &Dictionary) -> Result<Progress> {
    if let Some(error) = response.get("Error") {
        return Err(device_error(command, error, response));
    }
    match response.get("Status").and_then(Value::as_str) {
        Some(STATUS_COMPLETE) => Ok(Progress::Complete),
        Some(status) => Ok(Progress::Working(status.to_string())),
        None => Err(PlistError::Protocol(format!(
            "{command}: response carries no status"
        ))),
    }
}

pub(crate) fn device_error(command: &str, error: &Value, response: &Dictionary) -> PlistError {
    let name = error.as_str().unwrap_or("unknown error");
    let message = match response.get("ErrorDescription").and_then(Value::as_str) {
        Some(description) => format!("{name}: {description}"),
        None => name.to_string(),
    };
    debug!(command, %message, "device reported error");
    PlistError::DeviceStatus {
        command: command.to_string(),
        code: response.get("ErrorDetail").and_then(Value::as_integer),
        message,
    }
}

/// Render a progress response as a single console line.
///
/// Returns `None` when the response has nothing worth showing.
pub fn progress_line(action: &str, response: &Dictionary) -> Option<String> {
    let status = response.get("Status").and_then(Value::as_str)?;
    let mut parts = vec![format!("[{action}]")];
    if let Some(percent) = response.get("PercentComplete").and_then(Value::as_integer) {
        parts.push(format!("{:>4}", format!("{percent}%")));
    }
    parts.push(status.to_string());
    if let Some(path) = response.get("Path").and_then(Value::as_str) {
        parts.push(path.to_string());
    }
    Some(parts.join(" "))
}

/// Writes progress lines to a sink, suppressing consecutive duplicates.
pub struct ProgressReporter<W> {
    sink: W,
    last: Option<String>,
}

impl<W: Write> ProgressReporter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, last: None }
    }

    /// Render `response` and write it unless it repeats the previous line.
    pub fn report(&mut self, action: &str, response: &Dictionary) -> Result<()> {
        let Some(line) = progress_line(action, response) else {
            return Ok(());
        };
        if self.last.as_deref() == Some(line.as_str()) {
            return Ok(());
        }
        writeln!(self.sink, "{line}")?;
        self.sink.flush()?;
        self.last = Some(line);
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
