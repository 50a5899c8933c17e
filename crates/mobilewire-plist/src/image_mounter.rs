//! Developer disk image mounter client.
//!
//! Every method runs on one conversation. Session teardown (`Hangup`) is left
//! to [`PlistService::converse`] so a failed step still ends the session.

use std::io::{ErrorKind, Read, Write};

use tracing::{debug, info};

use crate::error::{PlistError, Result};
use crate::progress::{device_error, STATUS_COMPLETE};
use crate::service::{command, PlistService};
use crate::value::{Dictionary, Value};

/// Image type used for developer disk images.
pub const DEVELOPER_IMAGE_TYPE: &str = "Developer";

const STATUS_RECEIVE_BYTES_ACK: &str = "ReceiveBytesAck";
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// One entry of the device's mounted image list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MountedImage {
    pub image_type: Option<String>,
    pub mount_path: Option<String>,
    pub signature: Option<Vec<u8>>,
}

impl MountedImage {
    pub fn from_entry(entry: &Dictionary) -> Self {
        Self {
            image_type: entry
                .get("DiskImageType")
                .and_then(Value::as_str)
                .map(str::to_string),
            mount_path: entry
                .get("MountPath")
                .and_then(Value::as_str)
                .map(str::to_string),
            signature: entry.get("ImageSignature").and_then(signature_of),
        }
    }

    pub fn is_developer(&self) -> bool {
        self.image_type.as_deref() == Some(DEVELOPER_IMAGE_TYPE)
    }
}

/// Result of a mount request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// An image with the same signature was already mounted.
    AlreadyMounted,
    /// The device accepted the image; carries its reported status.
    Mounted { status: Option<String> },
}

/// Disk image mounter commands over an open conversation.
pub struct ImageMounter<'a, T> {
    service: &'a mut PlistService<T>,
}

impl<'a, T: Read + Write> ImageMounter<'a, T> {
    pub fn new(service: &'a mut PlistService<T>) -> Self {
        Self { service }
    }

    /// List mounted images. Empty unless the device reports `Complete`.
    pub fn list_images(&mut self) -> Result<Vec<MountedImage>> {
        let response = self.service.request(&command("CopyDevices"))?;
        if response.get("Status").and_then(Value::as_str) != Some(STATUS_COMPLETE) {
            debug!("CopyDevices did not complete; reporting no images");
            return Ok(Vec::new());
        }
        let entries = response
            .get("EntryList")
            .and_then(Value::as_array)
            .unwrap_or_default();
        Ok(entries
            .iter()
            .filter_map(Value::as_dictionary)
            .map(MountedImage::from_entry)
            .collect())
    }

    /// Signature of the mounted image of `image_type`, if any.
    pub fn lookup_image(&mut self, image_type: &str) -> Result<Option<Vec<u8>>> {
        let mut request = command("LookupImage");
        request.insert("ImageType".into(), image_type.into());
        let response = self.service.request(&request)?;
        Ok(response.get("ImageSignature").and_then(signature_of))
    }

    pub fn is_developer_image_mounted(&mut self) -> Result<bool> {
        Ok(self.lookup_image(DEVELOPER_IMAGE_TYPE)?.is_some())
    }

    /// Upload and mount a developer image of `size` bytes read from `image`.
    ///
    /// Exactly `size` bytes are uploaded; a source that ends early is a
    /// protocol error and bytes past `size` are never read.
    pub fn mount_image<R: Read>(
        &mut self,
        image: R,
        size: u64,
        signature: &[u8],
    ) -> Result<MountOutcome> {
        if self.lookup_image(DEVELOPER_IMAGE_TYPE)?.as_deref() == Some(signature) {
            info!("developer image already mounted");
            return Ok(MountOutcome::AlreadyMounted);
        }

        let image_size = i64::try_from(size)
            .map_err(|_| PlistError::Protocol(format!("image size {size} out of range")))?;
        let mut request = command("ReceiveBytes");
        request.insert("ImageSize".into(), image_size.into());
        request.insert("ImageType".into(), DEVELOPER_IMAGE_TYPE.into());
        request.insert("ImageSignature".into(), signature.to_vec().into());
        let response = self.service.request(&request)?;
        expect_status("ReceiveBytes", &response, STATUS_RECEIVE_BYTES_ACK)?;

        let mut image = image.take(size);
        let mut chunk = vec![0u8; UPLOAD_CHUNK_SIZE];
        let mut sent = 0u64;
        loop {
            let n = match image.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            self.service.send_raw(&chunk[..n])?;
            sent += n as u64;
        }
        if sent != size {
            return Err(PlistError::Protocol(format!(
                "image body ended after {sent} of {size} bytes"
            )));
        }
        debug!(sent, "image body uploaded");
        let response = self.service.recv()?;
        expect_status("ReceiveBytes", &response, STATUS_COMPLETE)?;

        let mut request = command("MountImage");
        request.insert("ImageType".into(), DEVELOPER_IMAGE_TYPE.into());
        request.insert("ImageSignature".into(), signature.to_vec().into());
        let response = self.service.request(&request)?;
        if let Some(error) = response.get("Error") {
            return Err(device_error("MountImage", error, &response));
        }
        let status = response
            .get("Status")
            .and_then(Value::as_str)
            .map(str::to_string);
        info!(status = ?status, "MountImage finished");
        Ok(MountOutcome::Mounted { status })
    }

    /// Unmount one listed image.
    pub fn unmount_image(&mut self, image: &MountedImage) -> Result<()> {
        let mut request = command("UnmountImage");
        request.insert("ImageType".into(), DEVELOPER_IMAGE_TYPE.into());
        request.insert(
            "MountPath".into(),
            image.mount_path.clone().unwrap_or_default().into(),
        );
        request.insert(
            "ImageSignature".into(),
            image.signature.clone().unwrap_or_default().into(),
        );
        let response = self.service.request(&request)?;
        if let Some(error) = response.get("Error") {
            return Err(device_error("UnmountImage", error, &response));
        }
        debug!(mount_path = ?image.mount_path, "image unmounted");
        Ok(())
    }
}

/// `ImageSignature` may arrive as one blob or as an array of blobs.
fn signature_of(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Array(items) => items.first().and_then(signature_of),
        Value::Data(data) => Some(data.clone()),
        Value::String(text) => Some(text.as_bytes().to_vec()),
        _ => None,
    }
}

fn expect_status(command: &str, response: &Dictionary, expected: &str) -> Result<()> {
    if let Some(error) = response.get("Error") {
        return Err(device_error(command, error, response));
    }
    match response.get("Status").and_then(Value::as_str) {
        Some(status) if status == expected => Ok(()),
        other => Err(PlistError::Protocol(format!(
            "{command}: expected status {expected}, got {other:?}"
        ))),
    }
}
