use tracing::{debug, warn};

use crate::device::{AfcDevice, OpenMode};
use crate::error::{AfcError, Result};

/// Token for a file opened through [`AfcClient::open`].
///
/// Slots are reused after close; the generation tells a reopened slot apart
/// from the handle that used it before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle {
    index: usize,
    generation: u32,
}

impl FileHandle {
    pub fn index(self) -> usize {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct OpenFile {
    file: u64,
    path: String,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    open: Option<OpenFile>,
}

/// Remote filesystem client.
///
/// Open files live in an arena indexed by [`FileHandle`]. Closing a handle
/// frees its slot and bumps the slot's generation, so a second close or any
/// later use of that handle is rejected with [`AfcError::InvalidHandle`]
/// instead of reaching the device, even once the slot holds another file.
pub struct AfcClient<D> {
    device: D,
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl<D: AfcDevice> AfcClient<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Open `path`; `mode` holds `r` and/or `w`.
    pub fn open(&mut self, path: &str, mode: &str) -> Result<FileHandle> {
        let mode = OpenMode::parse(mode)?;
        let (status, file) = self.device.file_open(path, mode)?;
        let file = match (status.is_success(), file) {
            (true, Some(file)) => file,
            _ => {
                return Err(AfcError::Open {
                    path: path.to_string(),
                    status,
                })
            }
        };
        let open = Some(OpenFile {
            file,
            path: path.to_string(),
        });
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.open = open;
                FileHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot { generation: 0, open });
                FileHandle {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        debug!(path, handle = handle.index, generation = handle.generation, "file opened");
        Ok(handle)
    }

    /// Read up to `length` bytes. An empty result means end of file.
    pub fn read(&mut self, handle: FileHandle, length: usize) -> Result<Vec<u8>> {
        let file = self.file(handle)?;
        let (status, data) = self.device.file_read(file, length)?;
        if !status.is_success() {
            return Err(AfcError::Read { status });
        }
        Ok(data)
    }

    /// Write all of `data`.
    pub fn write(&mut self, handle: FileHandle, data: &[u8]) -> Result<()> {
        let file = self.file(handle)?;
        let status = self.device.file_write(file, data)?;
        if !status.is_success() {
            return Err(AfcError::Write { status });
        }
        Ok(())
    }

    /// Close `handle`. The slot is freed even when the device refuses.
    pub fn close(&mut self, handle: FileHandle) -> Result<()> {
        let file = self.file(handle)?;
        let slot = &mut self.slots[handle.index];
        slot.open = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        let status = self.device.file_close(file)?;
        if !status.is_success() {
            return Err(AfcError::Close { status });
        }
        debug!(handle = handle.index, "file closed");
        Ok(())
    }

    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let status = self.device.make_directory(path)?;
        if !status.is_success() {
            return Err(AfcError::DirectoryCreate {
                path: path.to_string(),
                status,
            });
        }
        Ok(())
    }

    /// Entry names of `path`, without `.` and `..`.
    pub fn list_directory(&mut self, path: &str) -> Result<Vec<String>> {
        let (status, dir) = self.device.directory_open(path)?;
        let dir = match (status.is_success(), dir) {
            (true, Some(dir)) => dir,
            _ => {
                return Err(AfcError::DirectoryOpen {
                    path: path.to_string(),
                    status,
                })
            }
        };

        let mut entries = Vec::new();
        let listed = loop {
            match self.device.directory_read(dir) {
                Ok((status, Some(name))) if status.is_success() && !name.is_empty() => {
                    if name != "." && name != ".." {
                        entries.push(name);
                    }
                }
                Ok(_) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        let closed = self.device.directory_close(dir);
        listed?;
        let status = closed?;
        if !status.is_success() {
            return Err(AfcError::Close { status });
        }
        Ok(entries)
    }

    /// Paths of files currently open.
    pub fn open_files(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter_map(|slot| slot.open.as_ref().map(|open| open.path.as_str()))
            .collect()
    }

    /// Close every handle left open and return the device.
    ///
    /// Returns the paths that were still open; the first close failure is
    /// reported after all handles were attempted.
    pub fn shutdown(mut self) -> (D, Result<Vec<String>>) {
        let mut leaked = Vec::new();
        let mut first_error = None;
        for index in 0..self.slots.len() {
            let slot = &self.slots[index];
            let Some(open) = &slot.open else {
                continue;
            };
            warn!(path = %open.path, "closing file left open");
            leaked.push(open.path.clone());
            let handle = FileHandle {
                index,
                generation: slot.generation,
            };
            if let Err(err) = self.close(handle) {
                first_error.get_or_insert(err);
            }
        }
        let outcome = match first_error {
            Some(err) => Err(err),
            None => Ok(leaked),
        };
        (self.device, outcome)
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    fn file(&self, handle: FileHandle) -> Result<u64> {
        match self.slots.get(handle.index) {
            Some(Slot {
                generation,
                open: Some(open),
            }) if *generation == handle.generation => Ok(open.file),
            _ => Err(AfcError::InvalidHandle(handle.index)),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::BTreeMap;

    use crate::device::{AfcDevice, OpenMode};
    use crate::error::Result;
    use crate::status::AfcStatus;

    /// In-memory device with flat path keys.
    #[derive(Default)]
    pub struct MemoryDevice {
        pub files: BTreeMap<String, Vec<u8>>,
        pub dirs: BTreeMap<String, Vec<String>>,
        open: BTreeMap<u64, (String, usize)>,
        listings: BTreeMap<u64, Vec<String>>,
        next_id: u64,
        pub closes: usize,
        pub read_limit: Option<usize>,
        /// Fail every `READ_DIR` after this many names were served.
        pub fail_listing_after: Option<usize>,
        served: usize,
    }

    impl MemoryDevice {
        pub fn open_listings(&self) -> usize {
            self.listings.len()
        }

        fn next_id(&mut self) -> u64 {
            self.next_id += 1;
            self.next_id
        }
    }

    impl AfcDevice for MemoryDevice {
        fn file_open(&mut self, path: &str, mode: OpenMode) -> Result<(AfcStatus, Option<u64>)> {
            if mode.writable() {
                self.files.insert(path.to_string(), Vec::new());
            } else if !self.files.contains_key(path) {
                return Ok((AfcStatus::OBJECT_NOT_FOUND, None));
            }
            let id = self.next_id();
            self.open.insert(id, (path.to_string(), 0));
            Ok((AfcStatus::SUCCESS, Some(id)))
        }

        fn file_read(&mut self, file: u64, length: usize) -> Result<(AfcStatus, Vec<u8>)> {
            let Some((path, pos)) = self.open.get_mut(&file) else {
                return Ok((AfcStatus::INVALID_ARG, Vec::new()));
            };
            let data = &self.files[path.as_str()];
            let length = self.read_limit.map_or(length, |limit| length.min(limit));
            let end = (*pos + length).min(data.len());
            let chunk = data[*pos..end].to_vec();
            *pos = end;
            Ok((AfcStatus::SUCCESS, chunk))
        }

        fn file_write(&mut self, file: u64, data: &[u8]) -> Result<AfcStatus> {
            let Some((path, _)) = self.open.get(&file) else {
                return Ok(AfcStatus::INVALID_ARG);
            };
            if let Some(contents) = self.files.get_mut(path.as_str()) {
                contents.extend_from_slice(data);
            }
            Ok(AfcStatus::SUCCESS)
        }

        fn file_close(&mut self, file: u64) -> Result<AfcStatus> {
            self.closes += 1;
            Ok(match self.open.remove(&file) {
                Some(_) => AfcStatus::SUCCESS,
                None => AfcStatus::INVALID_ARG,
            })
        }

        fn make_directory(&mut self, path: &str) -> Result<AfcStatus> {
            if self.dirs.contains_key(path) {
                return Ok(AfcStatus(16));
            }
            self.dirs.insert(path.to_string(), Vec::new());
            Ok(AfcStatus::SUCCESS)
        }

        fn directory_open(&mut self, path: &str) -> Result<(AfcStatus, Option<u64>)> {
            let Some(entries) = self.dirs.get(path).cloned() else {
                return Ok((AfcStatus::OBJECT_NOT_FOUND, None));
            };
            let id = self.next_id();
            let mut listing = vec![".".to_string(), "..".to_string()];
            listing.extend(entries);
            listing.reverse();
            self.listings.insert(id, listing);
            Ok((AfcStatus::SUCCESS, Some(id)))
        }

        fn directory_read(&mut self, dir: u64) -> Result<(AfcStatus, Option<String>)> {
            if self.fail_listing_after == Some(self.served) {
                return Ok((AfcStatus(4), None));
            }
            match self.listings.get_mut(&dir) {
                Some(listing) => {
                    self.served += 1;
                    Ok((AfcStatus::SUCCESS, listing.pop()))
                }
                None => Ok((AfcStatus::INVALID_ARG, None)),
            }
        }

        fn directory_close(&mut self, dir: u64) -> Result<AfcStatus> {
            Ok(match self.listings.remove(&dir) {
                Some(_) => AfcStatus::SUCCESS,
                None => AfcStatus::INVALID_ARG,
            })
        }
    }
}
