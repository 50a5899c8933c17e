//! Locating developer disk images inside a developer tools tree.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PlistError, Result};

const IMAGE_FILE_NAME: &str = "DeveloperDiskImage.dmg";

/// Resolves per-OS-version device support directories.
#[derive(Debug, Clone)]
pub struct DeviceSupportPaths {
    root: PathBuf,
    platform: String,
    product_version: String,
    build_version: String,
}

impl DeviceSupportPaths {
    /// `root` is the developer tools directory, `platform` e.g. `iPhoneOS`.
    pub fn new(
        root: impl Into<PathBuf>,
        platform: impl Into<String>,
        product_version: impl Into<String>,
        build_version: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            platform: platform.into(),
            product_version: product_version.into(),
            build_version: build_version.into(),
        }
    }

    /// Directory names tried for this OS version, most specific first.
    pub fn version_permutations(&self) -> Vec<String> {
        let short = self
            .product_version
            .split('.')
            .take(2)
            .collect::<Vec<_>>()
            .join(".");
        vec![
            format!("{} ({})", self.product_version, self.build_version),
            format!("{} ({})", short, self.build_version),
            self.product_version.clone(),
            short,
            "Latest".to_string(),
        ]
    }

    /// `<root>/Platforms/<platform>.platform/DeviceSupport`.
    pub fn device_support_root(&self) -> PathBuf {
        self.root
            .join("Platforms")
            .join(format!("{}.platform", self.platform))
            .join("DeviceSupport")
    }

    /// First existing device support directory for this OS version.
    pub fn device_support_directory(&self) -> Result<PathBuf> {
        let base = self.device_support_root();
        self.version_permutations()
            .into_iter()
            .map(|attempt| base.join(attempt))
            .find(|path| path.is_dir())
            .ok_or_else(|| self.not_found("device support directory"))
    }

    /// First existing developer disk image for this OS version.
    pub fn developer_disk_image(&self) -> Result<PathBuf> {
        let base = self.device_support_root();
        let found = self
            .version_permutations()
            .into_iter()
            .map(|attempt| base.join(attempt).join(IMAGE_FILE_NAME))
            .find(|path| path.is_file());
        match found {
            Some(path) => {
                debug!(path = %path.display(), "found developer disk image");
                Ok(path)
            }
            None => Err(self.not_found("developer disk image")),
        }
    }

    fn not_found(&self, what: &str) -> PlistError {
        PlistError::NotFound(format!(
            "{what} for {} {} ({})",
            self.platform, self.product_version, self.build_version
        ))
    }
}

/// A disk image on local storage plus its detached signature.
#[derive(Debug, Clone)]
pub struct DeveloperImage {
    pub path: PathBuf,
    pub size: u64,
    pub signature: Vec<u8>,
}

impl DeveloperImage {
    /// Load the signature from the sibling `.dmg.signature` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        let signature = std::fs::read(signature_path(&path))?;
        Ok(Self {
            path,
            size,
            signature,
        })
    }

    /// Open the image body for upload.
    pub fn open(&self) -> Result<File> {
        Ok(File::open(&self.path)?)
    }
}

/// `DeveloperDiskImage.dmg` → `DeveloperDiskImage.dmg.signature`.
pub fn signature_path(image: &Path) -> PathBuf {
    image.with_extension("dmg.signature")
}
