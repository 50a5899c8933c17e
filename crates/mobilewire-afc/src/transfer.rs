//! File copy and tree listing built from [`AfcClient`] primitives.

use std::io::{ErrorKind, Read, Write};

use mobilewire_transport::ErrorCategory;
use tracing::{debug, info};

use crate::client::AfcClient;
use crate::device::AfcDevice;
use crate::error::Result;

/// Bytes moved per device round trip.
pub const TRANSFER_CHUNK_SIZE: usize = 8192;

/// Copy the remote file at `path` into `sink`. Returns the byte count.
pub fn pull<D: AfcDevice, W: Write>(client: &mut AfcClient<D>, path: &str, mut sink: W) -> Result<u64> {
    let handle = client.open(path, "r")?;
    let copied = (|| -> Result<u64> {
        let mut total = 0u64;
        loop {
            let chunk = client.read(handle, TRANSFER_CHUNK_SIZE)?;
            if chunk.is_empty() {
                break;
            }
            sink.write_all(&chunk)?;
            total += chunk.len() as u64;
        }
        sink.flush()?;
        Ok(total)
    })();
    let closed = client.close(handle);
    let total = copied?;
    closed?;
    info!(path, bytes = total, "pulled remote file");
    Ok(total)
}

/// Copy `source` into a remote file at `path`. Returns the byte count.
pub fn push<D: AfcDevice, R: Read>(client: &mut AfcClient<D>, mut source: R, path: &str) -> Result<u64> {
    let handle = client.open(path, "w")?;
    let copied = (|| -> Result<u64> {
        let mut buf = vec![0u8; TRANSFER_CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            client.write(handle, &buf[..n])?;
            total += n as u64;
        }
        Ok(total)
    })();
    let closed = client.close(handle);
    let total = copied?;
    closed?;
    info!(path, bytes = total, "pushed remote file");
    Ok(total)
}

/// Depth-first listing of `root`, itself included at depth 0.
///
/// A node the device refuses to list is reported without children. Channel
/// failures still abort the walk.
pub fn walk<D: AfcDevice>(client: &mut AfcClient<D>, root: &str) -> Result<Vec<(usize, String)>> {
    let mut out = Vec::new();
    let mut stack = vec![(0usize, root.to_string())];
    while let Some((depth, path)) = stack.pop() {
        let children = match client.list_directory(&path) {
            Ok(children) => children,
            Err(err) if err.category() == ErrorCategory::DeviceStatus => {
                debug!(path = %path, error = %err, "not listable");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        let prefix = path.trim_end_matches('/').to_string();
        for child in children.into_iter().rev() {
            stack.push((depth + 1, format!("{prefix}/{child}")));
        }
        out.push((depth, path));
    }
    Ok(out)
}

/// Render a walk the way a tree listing is printed: two spaces per level.
pub fn format_walk(entries: &[(usize, String)]) -> String {
    entries
        .iter()
        .map(|(depth, path)| format!("{}{path}\n", "  ".repeat(*depth)))
        .collect()
}
