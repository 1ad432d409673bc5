//! Purpose: Locate installed items across the four ranked collections.
//! Exports: `Collections`, `ResolvedItem`.
//! Role: Front door for discovery queries; owns the per-instance list caches and log.
//! Invariants: "Find first" queries consult CWD, environment variable, user, system in that order.
//! Invariants: An item exists in a directory iff `<dir>/<name>/<library file name>` exists.
//! Invariants: Name listings are sorted and free of duplicates.
//! Invariants: Index getters accept `0..count` only.
//! Notes: A malformed user configuration empties the user collection for lookups and listings;
//! Notes: only `cache_list_of_directory_names` reports it as an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::ConfigurationStore;
use crate::core::enumeration::Extensible;
use crate::core::environment::Environment;
use crate::core::error::{Error, ErrorKind};
use crate::core::library::{DynamicLoader, ItemLibrary, LibraryLoader};
use crate::core::log::{Log, LogVerbosity};
use crate::core::metadata::{ItemMetadataCache, MetadataFile};
use crate::core::names::{
    CONFIGURATION_FILE_VARIABLE, Collection, CollectionItemType, PROJECT_NAME, PROJECT_VERSION,
};
use crate::core::path_set::{PathSet, subdirectories};

/// Where a lookup found an item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedItem {
    pub item_name: String,
    pub item_type: CollectionItemType,
    pub library_path: PathBuf,
    pub collection: Collection,
}

pub struct Collections {
    env: Environment,
    loader: Arc<dyn LibraryLoader>,
    log: Log,
    item_names: Vec<String>,
    item_names_by_collection: Vec<String>,
    metadata: ItemMetadataCache,
    metadata_by_collection: ItemMetadataCache,
    directory_names: Vec<PathBuf>,
}

impl Collections {
    pub fn new(env: Environment, loader: Arc<dyn LibraryLoader>) -> Self {
        Self {
            env,
            loader,
            log: Log::new("collections"),
            item_names: Vec::new(),
            item_names_by_collection: Vec::new(),
            metadata: ItemMetadataCache::new(),
            metadata_by_collection: ItemMetadataCache::new(),
            directory_names: Vec::new(),
        }
    }

    /// Collections over this process's environment, loading libraries from disk.
    pub fn from_process() -> Self {
        let loader = DynamicLoader;
        let env = Environment::from_process(loader.origin());
        Self::new(env, Arc::new(loader))
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn loader(&self) -> &Arc<dyn LibraryLoader> {
        &self.loader
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    /// Search directories of one collection, before any item-name probing.
    pub fn directories(
        &self,
        collection: Collection,
        item_type: CollectionItemType,
    ) -> Result<PathSet, Error> {
        match collection {
            Collection::CurrentWorkingDirectory => Ok(PathSet::from_entries([PathBuf::from(".")])),
            Collection::EnvironmentVariable => {
                Ok(PathSet::parse(self.env.item_dirs_variable(item_type)))
            }
            Collection::User => ConfigurationStore::new(&self.env, &self.log)
                .load()
                .map(|dirs| dirs.get(item_type).clone()),
            Collection::System => {
                let mut dirs = PathSet::parse(Some(item_type.system_dirs()));
                dirs.replace_origin(self.env.origin());
                Ok(dirs)
            }
        }
    }

    fn lookup_directories(&self, collection: Collection, item_type: CollectionItemType) -> PathSet {
        self.directories(collection, item_type).unwrap_or_default()
    }

    fn library_path_in(&self, dir: &Path, item_type: CollectionItemType, item_name: &str) -> PathBuf {
        self.env
            .absolute(dir)
            .join(item_name)
            .join(item_type.library_file_name())
    }

    /// Library path of `item_name` within one collection.
    pub fn item_library_file_name_by_collection_and_type(
        &self,
        collection: Collection,
        item_type: CollectionItemType,
        item_name: &str,
    ) -> Result<PathBuf, Error> {
        self.find_in(collection, item_type, item_name)
            .ok_or_else(|| not_found(item_type, item_name, Some(collection)))
    }

    fn find_in(
        &self,
        collection: Collection,
        item_type: CollectionItemType,
        item_name: &str,
    ) -> Option<PathBuf> {
        self.lookup_directories(collection, item_type)
            .iter()
            .map(|dir| self.library_path_in(dir, item_type, item_name))
            .find(|path| path.is_file())
    }

    /// First library for `item_name` in collection priority order.
    pub fn item_library_file_name_and_collection(
        &self,
        item_type: CollectionItemType,
        item_name: &str,
    ) -> Result<ResolvedItem, Error> {
        self.resolve(item_type, item_name)
            .ok_or_else(|| self.log.fail(not_found(item_type, item_name, None)))
    }

    fn resolve(&self, item_type: CollectionItemType, item_name: &str) -> Option<ResolvedItem> {
        Collection::SEARCH_ORDER.into_iter().find_map(|collection| {
            self.find_in(collection, item_type, item_name)
                .map(|library_path| ResolvedItem {
                    item_name: item_name.to_string(),
                    item_type,
                    library_path,
                    collection,
                })
        })
    }

    /// Type of the first item found under `item_name`: portable model, then
    /// simulator model, then model driver.
    pub fn item_type(&self, item_name: &str) -> Result<CollectionItemType, Error> {
        [
            CollectionItemType::PortableModel,
            CollectionItemType::SimulatorModel,
            CollectionItemType::ModelDriver,
        ]
        .into_iter()
        .find(|item_type| self.resolve(*item_type, item_name).is_some())
        .ok_or_else(|| {
            self.log.fail(
                Error::new(ErrorKind::NotFound)
                    .with_message("unable to find item")
                    .with_item(item_name),
            )
        })
    }

    fn item_paths(&self, collection: Collection, item_type: CollectionItemType) -> Vec<PathBuf> {
        let library = item_type.library_file_name();
        self.lookup_directories(collection, item_type)
            .iter()
            .flat_map(|dir| subdirectories(&self.env.absolute(dir)))
            .filter(|subdir| subdir.join(&library).is_file())
            .collect()
    }

    pub fn cache_list_of_item_names_by_type(
        &mut self,
        item_type: CollectionItemType,
    ) -> Result<usize, Error> {
        let paths = Collection::SEARCH_ORDER
            .into_iter()
            .flat_map(|collection| self.item_paths(collection, item_type))
            .collect();
        self.item_names = item_names(paths);
        Ok(self.item_names.len())
    }

    pub fn item_name_by_type(&self, index: usize) -> Result<&str, Error> {
        indexed(&self.item_names, index, "item name").map(String::as_str)
    }

    pub fn cache_list_of_item_names_by_collection_and_type(
        &mut self,
        collection: Collection,
        item_type: CollectionItemType,
    ) -> Result<usize, Error> {
        self.item_names_by_collection = item_names(self.item_paths(collection, item_type));
        Ok(self.item_names_by_collection.len())
    }

    pub fn item_name_by_collection_and_type(&self, index: usize) -> Result<&str, Error> {
        indexed(&self.item_names_by_collection, index, "item name").map(String::as_str)
    }

    /// Cache the metadata files of the item `item_name` resolves to.
    pub fn cache_list_of_item_metadata_files(
        &mut self,
        item_type: CollectionItemType,
        item_name: &str,
    ) -> Result<usize, Error> {
        self.metadata.clear();
        let resolved = self.item_library_file_name_and_collection(item_type, item_name)?;
        let library = self.open(&resolved.library_path)?;
        Ok(self.metadata.fill(library.as_ref()))
    }

    pub fn item_metadata_file(&self, index: usize) -> Result<&MetadataFile, Error> {
        self.metadata.get(index).map_err(|err| self.log.fail(err))
    }

    pub fn cache_list_of_item_metadata_files_by_collection_and_type(
        &mut self,
        collection: Collection,
        item_type: CollectionItemType,
        item_name: &str,
    ) -> Result<usize, Error> {
        self.metadata_by_collection.clear();
        let path = self
            .item_library_file_name_by_collection_and_type(collection, item_type, item_name)
            .map_err(|err| self.log.fail(err))?;
        let library = self.open(&path)?;
        Ok(self.metadata_by_collection.fill(library.as_ref()))
    }

    pub fn item_metadata_file_by_collection_and_type(
        &self,
        index: usize,
    ) -> Result<&MetadataFile, Error> {
        self.metadata_by_collection
            .get(index)
            .map_err(|err| self.log.fail(err))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ItemLibrary>, Error> {
        self.loader.open(path).map_err(|err| self.log.fail(err))
    }

    /// Cache the search directories of one collection. `$ORIGIN` and `~` are
    /// already substituted; relative entries are left unanchored.
    pub fn cache_list_of_directory_names(
        &mut self,
        collection: Collection,
        item_type: CollectionItemType,
    ) -> Result<usize, Error> {
        self.directory_names.clear();
        let dirs = self.directories(collection, item_type).map_err(|err| {
            self.log
                .error(&format!("Unable to get {collection} collection directories."));
            err
        })?;
        self.directory_names = dirs.iter().map(Path::to_path_buf).collect();
        Ok(self.directory_names.len())
    }

    pub fn directory_name(&self, index: usize) -> Result<&Path, Error> {
        indexed(&self.directory_names, index, "directory name").map(PathBuf::as_path)
    }

    pub fn environment_variable_name(&self, item_type: CollectionItemType) -> &'static str {
        item_type.environment_variable()
    }

    /// Name and current value of the configuration-file override variable.
    pub fn configuration_file_environment_variable(&self) -> (&'static str, Option<&str>) {
        (
            CONFIGURATION_FILE_VARIABLE,
            self.env.configuration_file_variable(),
        )
    }

    pub fn configuration_file_name(&self) -> PathBuf {
        self.env.configuration_file_name()
    }

    pub fn project_name_and_semver(&self) -> (&'static str, &'static str) {
        (PROJECT_NAME, PROJECT_VERSION)
    }

    pub fn set_log_id(&mut self, id: &str) {
        self.log.set_id(id);
    }

    pub fn push_log_verbosity(&mut self, verbosity: impl Into<Extensible<LogVerbosity>>) {
        self.log.push_verbosity(verbosity.into());
    }

    pub fn pop_log_verbosity(&mut self) {
        self.log.pop_verbosity();
    }
}

fn item_names(mut paths: Vec<PathBuf>) -> Vec<String> {
    paths.sort();
    paths.dedup();
    let mut names: Vec<String> = paths
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();
    names.sort();
    names.dedup();
    names
}

fn indexed<'a, T>(items: &'a [T], index: usize, what: &str) -> Result<&'a T, Error> {
    items.get(index).ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("{what} index {index} out of range 0..{}", items.len()))
    })
}

fn not_found(
    item_type: CollectionItemType,
    item_name: &str,
    collection: Option<Collection>,
) -> Error {
    let scope = match collection {
        Some(collection) => format!(" in the {collection} collection"),
        None => String::new(),
    };
    Error::new(ErrorKind::NotFound)
        .with_message(format!("unable to find {item_type}{scope}"))
        .with_item(item_name)
}

#[cfg(all(test, unix))]
mod tests {
    use super::item_names;
    use std::path::PathBuf;

    #[test]
    fn names_are_sorted_and_unique_across_directories() {
        let names = item_names(vec![
            PathBuf::from("/user/pm/LJ_b"),
            PathBuf::from("/cwd/LJ_a"),
            PathBuf::from("/system/pm/LJ_b"),
            PathBuf::from("/cwd/LJ_a"),
        ]);
        assert_eq!(names, vec!["LJ_a".to_string(), "LJ_b".to_string()]);
    }
}
