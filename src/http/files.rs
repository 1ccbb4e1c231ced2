//! Multipart upload storage and file handles.
//!
//! # Responsibilities
//! - Hold uploaded parts grouped by field name
//! - Keep small uploads in memory, spool the rest to temporary files
//! - Hand out owned, readable handles on request
//!
//! # Design Decisions
//! - A field holds either one part or a list, never both
//! - Temporary files live as long as the store and are removed on drop
//! - Opening a handle is blocking I/O, like reading the handle afterwards

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Write};

use axum::body::Bytes;
use serde::Serialize;
use tempfile::{NamedTempFile, TempPath};

use crate::http::error::RequestError;

/// Metadata of one uploaded part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

#[derive(Debug)]
enum Storage {
    Memory(Bytes),
    Disk(TempPath),
}

/// One uploaded part as stored by the adapter.
#[derive(Debug)]
pub struct FilePart {
    header: FileHeader,
    storage: Storage,
}

impl FilePart {
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Whether the part was spooled to a temporary file.
    pub fn is_on_disk(&self) -> bool {
        matches!(self.storage, Storage::Disk(_))
    }

    /// Open a fresh reader over the stored bytes.
    pub fn open(&self) -> io::Result<UploadedFile> {
        let reader = match &self.storage {
            Storage::Memory(bytes) => FileReader::Memory(Cursor::new(bytes.clone())),
            Storage::Disk(path) => FileReader::Disk(File::open(path)?),
        };
        Ok(UploadedFile {
            header: self.header.clone(),
            reader,
        })
    }
}

/// Readable stream over an uploaded part.
#[derive(Debug)]
pub enum FileReader {
    Memory(Cursor<Bytes>),
    Disk(File),
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FileReader::Memory(cursor) => cursor.read(buf),
            FileReader::Disk(file) => file.read(buf),
        }
    }
}

/// An opened upload owned by the caller. Dropping it closes the stream.
#[derive(Debug)]
pub struct UploadedFile {
    header: FileHeader,
    reader: FileReader,
}

impl UploadedFile {
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn file_name(&self) -> &str {
        &self.header.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.header.size
    }

    pub fn into_reader(self) -> FileReader {
        self.reader
    }
}

impl Read for UploadedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// What a field name maps to in the file store.
#[derive(Debug)]
pub enum FileEntry {
    Single(FilePart),
    Multiple(Vec<FilePart>),
}

impl FileEntry {
    pub fn parts(&self) -> &[FilePart] {
        match self {
            FileEntry::Single(part) => std::slice::from_ref(part),
            FileEntry::Multiple(parts) => parts,
        }
    }
}

/// Uploaded parts keyed by multipart field name.
#[derive(Debug, Default)]
pub struct FileStore {
    entries: HashMap<String, FileEntry>,
}

impl FileStore {
    /// Build the store from parts grouped by field name. Groups of one become
    /// [`FileEntry::Single`], larger groups [`FileEntry::Multiple`], and empty
    /// groups are dropped.
    pub fn from_groups(groups: Vec<(String, Vec<FilePart>)>) -> Self {
        let entries = groups
            .into_iter()
            .filter_map(|(name, mut parts)| {
                let entry = match parts.len() {
                    0 => return None,
                    1 => FileEntry::Single(parts.remove(0)),
                    _ => FileEntry::Multiple(parts),
                };
                Some((name, entry))
            })
            .collect();
        Self { entries }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entry(&self, key: &str) -> Option<&FileEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Open the single part stored under `key`.
    pub fn get_file(&self, key: &str) -> Result<UploadedFile, RequestError> {
        match self.entries.get(key) {
            Some(FileEntry::Single(part)) => Ok(part.open()?),
            Some(FileEntry::Multiple(_)) => Err(RequestError::ExpectedFiles),
            None => Err(RequestError::NoSuchFile),
        }
    }

    /// Open every part stored under `key`, in upload order.
    pub fn get_files(&self, key: &str) -> Result<Vec<UploadedFile>, RequestError> {
        match self.entries.get(key) {
            Some(FileEntry::Multiple(parts)) => parts
                .iter()
                .map(|part| part.open().map_err(RequestError::from))
                .collect(),
            Some(FileEntry::Single(_)) => Err(RequestError::ExpectedFile),
            None => Err(RequestError::NoSuchFile),
        }
    }
}

/// Places uploads in memory until the budget is spent, then on disk.
#[derive(Debug)]
pub(crate) struct Spooler {
    budget: usize,
    used: usize,
}

impl Spooler {
    pub(crate) fn new(budget: usize) -> Self {
        Self { budget, used: 0 }
    }

    /// Charge non-file field bytes against the in-memory budget.
    pub(crate) fn charge(&mut self, len: usize) {
        self.used = self.used.saturating_add(len);
    }

    pub(crate) async fn store(
        &mut self,
        file_name: String,
        content_type: Option<String>,
        data: Bytes,
    ) -> io::Result<FilePart> {
        let header = FileHeader {
            file_name,
            content_type,
            size: data.len() as u64,
        };

        let fits = self
            .used
            .checked_add(data.len())
            .is_some_and(|total| total <= self.budget);
        if fits {
            self.used += data.len();
            return Ok(FilePart {
                header,
                storage: Storage::Memory(data),
            });
        }

        let path = tokio::task::spawn_blocking(move || -> io::Result<TempPath> {
            let mut file = NamedTempFile::new()?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(io::Error::other)??;

        tracing::debug!(
            file_name = %header.file_name,
            size = header.size,
            "Upload spooled to disk"
        );

        Ok(FilePart {
            header,
            storage: Storage::Disk(path),
        })
    }
}
