//! Purpose: Shared-library capability: open an item library and copy out its embedded files.
//! Exports: `LibraryLoader`, `ItemLibrary`, `EmbeddedFile`, `LibraryContents`, `DynamicLoader`,
//! Exports: the `#[repr(C)]` manifest types plugins export, `current_origin`.
//! Role: The only place that touches `libloading`; everything above it sees owned data.
//! Invariants: Manifest contents are copied at open time; nothing aliases plugin memory.
//! Invariants: A library stays loaded until its `ItemLibrary` is dropped.

use std::ffi::{CStr, c_char};
use std::path::{Path, PathBuf};

use crate::core::enumeration::Extensible;
use crate::core::error::{Error, ErrorKind};
use crate::core::names::CollectionItemType;

/// Symbol every item library exports.
pub const MANIFEST_SYMBOL: &[u8] = b"kim_shared_library_manifest\0";
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// A file embedded in an item library.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmbeddedFile {
    pub name: String,
    pub data: Vec<u8>,
}

impl EmbeddedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

pub trait ItemLibrary {
    fn item_type(&self) -> Extensible<CollectionItemType>;
    fn item_name(&self) -> &str;
    fn parameter_files(&self) -> &[EmbeddedFile];
    fn specification_file(&self) -> Option<&EmbeddedFile>;
    fn metadata_files(&self) -> &[EmbeddedFile];
}

pub trait LibraryLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn ItemLibrary>, Error>;

    /// Directory that `$ORIGIN` stands for.
    fn origin(&self) -> PathBuf;
}

/// Owned copy of everything an item library embeds.
#[derive(Clone, Debug)]
pub struct LibraryContents {
    pub item_type: Extensible<CollectionItemType>,
    pub item_name: String,
    pub parameter_files: Vec<EmbeddedFile>,
    pub specification_file: Option<EmbeddedFile>,
    pub metadata_files: Vec<EmbeddedFile>,
}

impl LibraryContents {
    pub fn new(item_type: impl Into<Extensible<CollectionItemType>>, item_name: &str) -> Self {
        Self {
            item_type: item_type.into(),
            item_name: item_name.to_string(),
            parameter_files: Vec::new(),
            specification_file: None,
            metadata_files: Vec::new(),
        }
    }

    pub fn with_parameter_file(mut self, file: EmbeddedFile) -> Self {
        self.parameter_files.push(file);
        self
    }

    pub fn with_specification_file(mut self, file: EmbeddedFile) -> Self {
        self.specification_file = Some(file);
        self
    }

    pub fn with_metadata_file(mut self, file: EmbeddedFile) -> Self {
        self.metadata_files.push(file);
        self
    }
}

impl ItemLibrary for LibraryContents {
    fn item_type(&self) -> Extensible<CollectionItemType> {
        self.item_type.clone()
    }

    fn item_name(&self) -> &str {
        &self.item_name
    }

    fn parameter_files(&self) -> &[EmbeddedFile] {
        &self.parameter_files
    }

    fn specification_file(&self) -> Option<&EmbeddedFile> {
        self.specification_file.as_ref()
    }

    fn metadata_files(&self) -> &[EmbeddedFile] {
        &self.metadata_files
    }
}

#[repr(C)]
pub struct KimEmbeddedFile {
    pub name: *const c_char,
    pub length: usize,
    pub data: *const u8,
}

/// Layout returned by an item library's `kim_shared_library_manifest`.
///
/// `specification_file` may be null for item types other than simulator
/// models. Every array pointer may be null when its count is zero.
#[repr(C)]
pub struct KimLibraryManifest {
    pub schema_version: u32,
    pub item_type: *const c_char,
    pub item_name: *const c_char,
    pub number_of_parameter_files: usize,
    pub parameter_files: *const KimEmbeddedFile,
    pub specification_file: *const KimEmbeddedFile,
    pub number_of_metadata_files: usize,
    pub metadata_files: *const KimEmbeddedFile,
}

type ManifestFn = unsafe extern "C" fn() -> *const KimLibraryManifest;

/// Loads item libraries from disk with `libloading`.
#[derive(Clone, Debug, Default)]
pub struct DynamicLoader;

struct DynamicLibrary {
    contents: LibraryContents,
    _library: libloading::Library,
}

impl ItemLibrary for DynamicLibrary {
    fn item_type(&self) -> Extensible<CollectionItemType> {
        self.contents.item_type()
    }

    fn item_name(&self) -> &str {
        self.contents.item_name()
    }

    fn parameter_files(&self) -> &[EmbeddedFile] {
        self.contents.parameter_files()
    }

    fn specification_file(&self) -> Option<&EmbeddedFile> {
        self.contents.specification_file()
    }

    fn metadata_files(&self) -> &[EmbeddedFile] {
        self.contents.metadata_files()
    }
}

impl LibraryLoader for DynamicLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn ItemLibrary>, Error> {
        // SAFETY: loading runs the library's initialisers; item libraries are
        // trusted plugins installed into a collection.
        let library = unsafe { libloading::Library::new(path) }.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("unable to open shared library")
                .with_path(path)
                .with_source(err)
        })?;
        let contents = {
            // SAFETY: the symbol type matches the manifest contract above.
            let manifest_fn = unsafe { library.get::<ManifestFn>(MANIFEST_SYMBOL) }.map_err(|err| {
                Error::new(ErrorKind::Malformed)
                    .with_message("shared library has no manifest symbol")
                    .with_path(path)
                    .with_source(err)
            })?;
            // SAFETY: the returned pointer refers to static data in `library`.
            let manifest = unsafe { manifest_fn() };
            unsafe { copy_manifest(manifest) }.map_err(|err| err.with_path(path))?
        };
        Ok(Box::new(DynamicLibrary {
            contents,
            _library: library,
        }))
    }

    fn origin(&self) -> PathBuf {
        current_origin()
    }
}

/// Copy a manifest into owned buffers.
///
/// # Safety
/// `manifest` must be null or point to a valid `KimLibraryManifest` whose
/// pointers satisfy the documented layout.
pub unsafe fn copy_manifest(manifest: *const KimLibraryManifest) -> Result<LibraryContents, Error> {
    let Some(manifest) = (unsafe { manifest.as_ref() }) else {
        return Err(malformed("manifest pointer is null"));
    };
    if manifest.schema_version != MANIFEST_SCHEMA_VERSION {
        return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
            "manifest schema version {} is not supported",
            manifest.schema_version
        )));
    }
    let item_type = unsafe { copy_string(manifest.item_type, "item type")? };
    let item_name = unsafe { copy_string(manifest.item_name, "item name")? };
    let parameter_files = unsafe {
        copy_files(
            manifest.parameter_files,
            manifest.number_of_parameter_files,
        )?
    };
    let specification_file = match unsafe { manifest.specification_file.as_ref() } {
        Some(file) => Some(unsafe { copy_file(file)? }),
        None => None,
    };
    let metadata_files =
        unsafe { copy_files(manifest.metadata_files, manifest.number_of_metadata_files)? };
    Ok(LibraryContents {
        item_type: Extensible::from_name(&item_type),
        item_name,
        parameter_files,
        specification_file,
        metadata_files,
    })
}

unsafe fn copy_string(ptr: *const c_char, what: &str) -> Result<String, Error> {
    if ptr.is_null() {
        return Err(malformed(&format!("manifest {what} is null")));
    }
    let value = unsafe { CStr::from_ptr(ptr) };
    value
        .to_str()
        .map(str::to_string)
        .map_err(|_| malformed(&format!("manifest {what} is not valid UTF-8")))
}

unsafe fn copy_files(ptr: *const KimEmbeddedFile, count: usize) -> Result<Vec<EmbeddedFile>, Error> {
    if count == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(malformed("manifest file array is null"));
    }
    let files = unsafe { std::slice::from_raw_parts(ptr, count) };
    files.iter().map(|file| unsafe { copy_file(file) }).collect()
}

unsafe fn copy_file(file: &KimEmbeddedFile) -> Result<EmbeddedFile, Error> {
    let name = unsafe { copy_string(file.name, "file name")? };
    let data = if file.length == 0 {
        Vec::new()
    } else if file.data.is_null() {
        return Err(malformed(&format!("embedded file '{name}' has no data")));
    } else {
        unsafe { std::slice::from_raw_parts(file.data, file.length) }.to_vec()
    };
    Ok(EmbeddedFile { name, data })
}

fn malformed(message: &str) -> Error {
    Error::new(ErrorKind::Malformed).with_message(message.to_string())
}

/// Directory containing the binary image this crate was linked into.
#[cfg(unix)]
pub fn current_origin() -> PathBuf {
    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let address = current_origin as fn() -> PathBuf as *const libc::c_void;
    // SAFETY: `address` is a function in this image and `info` is writable.
    let found = unsafe { libc::dladdr(address, &mut info) };
    if found != 0 && !info.dli_fname.is_null() {
        let file = unsafe { CStr::from_ptr(info.dli_fname) };
        let file = PathBuf::from(file.to_string_lossy().into_owned());
        if let Some(parent) = file.parent() {
            return parent.to_path_buf();
        }
    }
    executable_dir()
}

#[cfg(not(unix))]
pub fn current_origin() -> PathBuf {
    executable_dir()
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
}
