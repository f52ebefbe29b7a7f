//! Disk manager for page-level file I/O.

use mica_buffer::PageStore;
use mica_common::{MicaError, PageId, Result, PAGE_SIZE};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// Configuration for the disk manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskManagerConfig {
    /// Base directory for page files.
    pub data_dir: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fsync_enabled: true,
        }
    }
}

/// Manages named page files and serves as the physical page store.
///
/// Files are opened by name under the data directory and addressed by a
/// stable numeric id afterwards. Pages number from 1; page number 0 is the
/// invalid sentinel everywhere, so page `n` lives at file offset
/// `(n - 1) * PAGE_SIZE`.
pub struct DiskManager {
    /// Configuration.
    config: DiskManagerConfig,
    /// Open file handles keyed by file id.
    files: Mutex<HashMap<u32, FileHandle>>,
    /// File ids keyed by file name.
    names: Mutex<HashMap<String, u32>>,
    /// Next file id to hand out.
    next_file_id: AtomicU32,
}

/// Handle for an open page file.
struct FileHandle {
    /// The file handle.
    file: File,
    /// Name the file was opened under.
    name: String,
    /// Number of allocated pages in the file.
    num_pages: u32,
}

impl DiskManager {
    /// Creates a new disk manager.
    pub fn new(config: DiskManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        Ok(Self {
            config,
            files: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            next_file_id: AtomicU32::new(0),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Returns the on-disk path for a file name.
    fn file_path(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    /// Returns true if a file with this name exists on disk.
    pub fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    /// Opens (or creates) a named page file and returns its id.
    ///
    /// Opening the same name again returns the same id.
    pub fn open_file(&self, name: &str) -> Result<u32> {
        if let Some(&file_id) = self.names.lock().get(name) {
            return Ok(file_id);
        }

        let path = self.file_path(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        let file_id = self.next_file_id.fetch_add(1, Ordering::Relaxed);
        self.files.lock().insert(
            file_id,
            FileHandle {
                file,
                name: name.to_string(),
                num_pages,
            },
        );
        self.names.lock().insert(name.to_string(), file_id);

        Ok(file_id)
    }

    /// Returns the id of an already-open file, if any.
    pub fn file_id(&self, name: &str) -> Option<u32> {
        self.names.lock().get(name).copied()
    }

    /// Returns the number of allocated pages in a file.
    pub fn num_pages(&self, file_id: u32) -> Result<u32> {
        let files = self.files.lock();
        let handle = Self::handle(&files, file_id)?;
        Ok(handle.num_pages)
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        let files = self.files.lock();
        for handle in files.values() {
            handle.file.sync_all()?;
        }
        Ok(())
    }

    /// Closes a specific file.
    pub fn close_file(&self, file_id: u32) -> Result<()> {
        let mut files = self.files.lock();
        if let Some(handle) = files.remove(&file_id) {
            handle.file.sync_all()?;
            self.names.lock().remove(&handle.name);
        }
        Ok(())
    }

    /// Closes all open files.
    pub fn close_all(&self) -> Result<()> {
        let mut files = self.files.lock();
        for (_, handle) in files.drain() {
            handle.file.sync_all()?;
        }
        self.names.lock().clear();
        Ok(())
    }

    /// Deletes a named page file from disk, closing it first if open.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        if let Some(file_id) = self.file_id(name) {
            self.close_file(file_id)?;
        }
        let path = self.file_path(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn handle<'a>(
        files: &'a HashMap<u32, FileHandle>,
        file_id: u32,
    ) -> Result<&'a FileHandle> {
        files
            .get(&file_id)
            .ok_or_else(|| MicaError::Internal(format!("file {} not open", file_id)))
    }

    fn handle_mut<'a>(
        files: &'a mut HashMap<u32, FileHandle>,
        file_id: u32,
    ) -> Result<&'a mut FileHandle> {
        files
            .get_mut(&file_id)
            .ok_or_else(|| MicaError::Internal(format!("file {} not open", file_id)))
    }

    fn page_offset(page_num: u32) -> u64 {
        ((page_num - 1) as u64) * (PAGE_SIZE as u64)
    }
}

impl PageStore for DiskManager {
    fn allocate_page(&self, file_id: u32) -> Result<u32> {
        let mut files = self.files.lock();
        let handle = Self::handle_mut(&mut files, file_id)?;

        let page_num = handle.num_pages + 1;
        handle.file.seek(SeekFrom::Start(Self::page_offset(page_num)))?;
        handle.file.write_all(&[0u8; PAGE_SIZE])?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }

        handle.num_pages = page_num;
        Ok(page_num)
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> Result<()> {
        let mut files = self.files.lock();
        let handle = Self::handle_mut(&mut files, page_id.file_id)?;

        if page_id.page_num == 0 || page_id.page_num > handle.num_pages {
            return Err(MicaError::PageNotFound { page_id });
        }

        handle
            .file
            .seek(SeekFrom::Start(Self::page_offset(page_id.page_num)))?;
        handle.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let mut files = self.files.lock();
        let handle = Self::handle_mut(&mut files, page_id.file_id)?;

        if page_id.page_num == 0 || page_id.page_num > handle.num_pages {
            return Err(MicaError::PageNotFound { page_id });
        }

        handle
            .file
            .seek(SeekFrom::Start(Self::page_offset(page_id.page_num)))?;
        handle.file.write_all(data)?;

        if self.config.fsync_enabled {
            handle.file.sync_all()?;
        }
        Ok(())
    }

    fn delete_page(&self, page_id: PageId) -> Result<()> {
        // Tombstone: the page is zero-filled but its slot in the file is not
        // reclaimed or reused.
        self.write_page(page_id, &[0u8; PAGE_SIZE])
    }

    fn file_name(&self, file_id: u32) -> String {
        let files = self.files.lock();
        match files.get(&file_id) {
            Some(handle) => handle.name.clone(),
            None => format!("file:{}", file_id),
        }
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.close_all();
    }
}
