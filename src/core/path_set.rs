//! Purpose: Ordered directory lists parsed from platform path-list strings.
//! Exports: `PathSet`, `subdirectories`, `PATH_LIST_DELIMITER`.
//! Role: Directory source for every collection; also creates directories on demand.
//! Invariants: Parsing drops empty segments and preserves the order of the rest.
//! Invariants: `$ORIGIN`/`${ORIGIN}` is only recognised as the first component of a relative entry.
//! Notes: `make_directories` stops at the first failure and keeps what it already created.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::core::error::{Error, io_error};
use crate::core::names::ORIGIN_TOKENS;

#[cfg(windows)]
pub const PATH_LIST_DELIMITER: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_DELIMITER: char = ':';

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathSet {
    entries: Vec<PathBuf>,
}

impl PathSet {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Split a delimited list; `None` and `""` both give an empty set.
    pub fn parse(value: Option<&str>) -> Self {
        let entries = value
            .unwrap_or_default()
            .split(PATH_LIST_DELIMITER)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(PathBuf::from)
            .collect();
        Self { entries }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    pub fn push(&mut self, entry: impl Into<PathBuf>) {
        self.entries.push(entry.into());
    }

    /// Expand a leading `~` component to `home`.
    pub fn expand_home(&mut self, home: &Path) {
        for entry in &mut self.entries {
            if let Ok(rest) = entry.strip_prefix("~") {
                *entry = home.join(rest);
            }
        }
    }

    /// Rewrite every entry whose first component is an `$ORIGIN` token.
    pub fn replace_origin(&mut self, origin: &Path) {
        for entry in &mut self.entries {
            if entry.is_absolute() {
                continue;
            }
            let mut components = entry.components();
            let is_origin = matches!(
                components.next(),
                Some(Component::Normal(first)) if ORIGIN_TOKENS.iter().any(|token| first == *token)
            );
            if is_origin {
                *entry = origin.join(components.as_path());
            }
        }
    }

    /// Create every directory in order, tolerating ones that already exist.
    pub fn make_directories(&self) -> Result<(), Error> {
        for entry in &self.entries {
            fs::create_dir_all(entry)
                .map_err(|err| io_error("unable to create directory", entry, err))?;
        }
        Ok(())
    }
}

impl fmt::Display for PathSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, "{PATH_LIST_DELIMITER}")?;
            }
            write!(f, "{}", entry.display())?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Immediate child directories of `dir`; a missing directory yields none.
pub fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return Vec::new();
    };
    read_dir
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect()
}
