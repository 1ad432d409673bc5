//! Purpose: In-memory cache of an item library's embedded metadata files.
//! Exports: `MetadataFile`, `ItemMetadataCache`.
//! Role: Backing store for the collections metadata queries.
//! Invariants: `available_as_string` is computed by scanning for NUL bytes.
//! Invariants: Filling the cache replaces the previous list; one list is live at a time.

use crate::core::error::{Error, ErrorKind};
use crate::core::library::{EmbeddedFile, ItemLibrary};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetadataFile {
    name: String,
    data: Vec<u8>,
    available_as_string: bool,
}

impl MetadataFile {
    pub fn from_embedded(file: &EmbeddedFile) -> Self {
        Self {
            name: file.name.clone(),
            data: file.data.clone(),
            available_as_string: !file.data.contains(&0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// True when no NUL byte occurs before the end of the data.
    pub fn available_as_string(&self) -> bool {
        self.available_as_string
    }

    /// String view of the data, when it is NUL-free UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        if !self.available_as_string {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ItemMetadataCache {
    files: Vec<MetadataFile>,
}

impl ItemMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Replace the cached list with `library`'s metadata files; returns the count.
    pub fn fill(&mut self, library: &dyn ItemLibrary) -> usize {
        self.files = library
            .metadata_files()
            .iter()
            .map(MetadataFile::from_embedded)
            .collect();
        self.files.len()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&MetadataFile, Error> {
        self.files.get(index).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!(
                "metadata file index {index} out of range 0..{}",
                self.files.len()
            ))
        })
    }
}
