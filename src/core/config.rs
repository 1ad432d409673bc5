//! Purpose: Read, create and upgrade the user collection's configuration file.
//! Exports: `ConfigurationStore`, `UserDirectories`, `ConfigurationEntry`, `parse_configuration`.
//! Role: Directory source for the `user` collection.
//! Invariants: Entries are validated by key name, never by physical line position.
//! Invariants: A missing file is created with defaults and its directories made on disk.
//! Invariants: A file without `simulator-models-dir` is upgraded in place, not rejected.
//! Invariants: Writes hold an exclusive advisory lock on the file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::core::environment::Environment;
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::log::Log;
use crate::core::names::{
    CollectionItemType, DEPRECATED_PORTABLE_MODELS_KEY, PROJECT_NAME, PROJECT_VERSION,
};
use crate::core::path_set::PathSet;

const ITEM_TYPES: [CollectionItemType; 3] = [
    CollectionItemType::ModelDriver,
    CollectionItemType::PortableModel,
    CollectionItemType::SimulatorModel,
];

/// One `key = value` line of the directory section.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigurationEntry {
    pub line: usize,
    pub key: String,
    pub value: String,
}

/// The directory section plus whatever commentary follows it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParsedConfiguration {
    pub entries: Vec<ConfigurationEntry>,
    pub commentary: String,
}

/// Split the file into entries. The directory section ends at the first blank
/// line or once every item type has an entry, whichever comes first.
pub fn parse_configuration(text: &str) -> ParsedConfiguration {
    let mut parsed = ParsedConfiguration::default();
    let mut seen = BTreeSet::new();
    let mut lines = text.split_inclusive('\n').enumerate();
    while seen.len() < ITEM_TYPES.len() {
        let Some((index, raw)) = lines.next() else {
            break;
        };
        let line = raw.trim();
        if line.is_empty() {
            parsed.commentary.push_str(raw);
            break;
        }
        let mut tokens = line
            .split(|ch: char| ch == '=' || ch == ' ' || ch == '\t')
            .filter(|token| !token.is_empty());
        let key = tokens.next().unwrap_or_default().to_string();
        let value = tokens.next().unwrap_or_default().to_string();
        if let Some(item_type) = item_type_for_key(&key) {
            seen.insert(item_type);
        }
        parsed.entries.push(ConfigurationEntry {
            line: index + 1,
            key,
            value,
        });
    }
    for (_, raw) in lines {
        parsed.commentary.push_str(raw);
    }
    parsed
}

/// Directory lists of the user collection, keyed by item type.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserDirectories {
    dirs: BTreeMap<CollectionItemType, PathSet>,
}

impl UserDirectories {
    pub fn get(&self, item_type: CollectionItemType) -> &PathSet {
        static EMPTY: PathSet = PathSet::new();
        self.dirs.get(&item_type).unwrap_or(&EMPTY)
    }

    fn insert(&mut self, item_type: CollectionItemType, dirs: PathSet) {
        self.dirs.insert(item_type, dirs);
    }

    fn defaults(home: &Path) -> Self {
        let mut out = Self::default();
        for item_type in ITEM_TYPES {
            out.insert(item_type, default_dirs(item_type, home));
        }
        out
    }

    fn make_directories(&self) -> Result<(), Error> {
        for item_type in ITEM_TYPES {
            self.get(item_type).make_directories()?;
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for item_type in ITEM_TYPES {
            out.push_str(&format!(
                "{} = {}\n",
                item_type.configuration_key(),
                self.get(item_type)
            ));
        }
        out
    }
}

pub struct ConfigurationStore<'a> {
    env: &'a Environment,
    log: &'a Log,
}

impl<'a> ConfigurationStore<'a> {
    pub fn new(env: &'a Environment, log: &'a Log) -> Self {
        Self { env, log }
    }

    pub fn file_name(&self) -> PathBuf {
        self.env.configuration_file_name()
    }

    /// Load the user directories, creating or upgrading the file as needed.
    pub fn load(&self) -> Result<UserDirectories, Error> {
        let path = self.file_name();
        let text = match read_locked(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return self.create_default(&path);
            }
            Err(err) => {
                return Err(self
                    .log
                    .fail(io_error("unable to read configuration file", &path, err)));
            }
        };

        let parsed = parse_configuration(&text);
        let mut dirs = self.validate(&path, &parsed)?;
        if dirs.dirs.contains_key(&CollectionItemType::SimulatorModel) {
            return Ok(dirs);
        }

        self.log.warning(&format!(
            "Configuration file '{}' has no '{}' entry; adding the default.",
            path.display(),
            CollectionItemType::SimulatorModel.configuration_key()
        ));
        let simulator_dirs = default_dirs(CollectionItemType::SimulatorModel, self.env.home());
        simulator_dirs
            .make_directories()
            .map_err(|err| self.log.fail(err))?;
        dirs.insert(CollectionItemType::SimulatorModel, simulator_dirs);
        let contents = format!("{}{}", dirs.render(), parsed.commentary);
        write_locked(&path, &contents).map_err(|err| self.log.fail(err))?;
        Ok(dirs)
    }

    /// Write `dirs` as a fresh configuration file and create its directories.
    pub fn write_and_create_directories(
        &self,
        path: &Path,
        dirs: &UserDirectories,
    ) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| io_error("unable to create configuration directory", parent, err))?;
        }
        dirs.make_directories()?;
        let contents = format!(
            "{}\n\
             This file was created by a {PROJECT_NAME} installation with version:\n   \
             {PROJECT_VERSION}\n\
             with path\n   \
             {}\n\n\
             The associated {PROJECT_NAME} library was installed in\n   \
             {}\n\
             at the time this file was created.\n",
            dirs.render(),
            path.display(),
            self.env.origin().display()
        );
        write_locked(path, &contents)
    }

    fn create_default(&self, path: &Path) -> Result<UserDirectories, Error> {
        let dirs = UserDirectories::defaults(self.env.home());
        self.log.debug(&format!(
            "Creating default configuration file '{}'.",
            path.display()
        ));
        self.write_and_create_directories(path, &dirs)
            .map_err(|err| self.log.fail(err))?;
        Ok(dirs)
    }

    fn validate(&self, path: &Path, parsed: &ParsedConfiguration) -> Result<UserDirectories, Error> {
        let mut dirs = UserDirectories::default();
        for entry in &parsed.entries {
            let item_type = self.item_type_for_key(path, entry)?;
            if dirs.dirs.contains_key(&item_type) {
                return Err(self.log.fail(malformed(
                    path,
                    format!("duplicate identifier '{}' on line {}", entry.key, entry.line),
                )));
            }
            let mut value = PathSet::parse(Some(&entry.value));
            if value.is_empty() {
                return Err(self.log.fail(malformed(
                    path,
                    format!("invalid value '{}' on line {}", entry.value, entry.line),
                )));
            }
            value.expand_home(self.env.home());
            dirs.insert(item_type, value);
        }
        for required in [CollectionItemType::ModelDriver, CollectionItemType::PortableModel] {
            if !dirs.dirs.contains_key(&required) {
                return Err(self.log.fail(malformed(
                    path,
                    format!("missing identifier '{}'", required.configuration_key()),
                )));
            }
        }
        Ok(dirs)
    }

    fn item_type_for_key(
        &self,
        path: &Path,
        entry: &ConfigurationEntry,
    ) -> Result<CollectionItemType, Error> {
        if let Some(item_type) = item_type_for_key(&entry.key) {
            if entry.key == DEPRECATED_PORTABLE_MODELS_KEY {
                self.log.warning(&format!(
                    "Deprecated identifier '{}' found in '{}'. Use '{}' instead.",
                    entry.key,
                    path.display(),
                    CollectionItemType::PortableModel.configuration_key()
                ));
            }
            return Ok(item_type);
        }
        Err(self.log.fail(malformed(
            path,
            format!("unexpected identifier '{}' on line {}", entry.key, entry.line),
        )))
    }
}

/// Item type named by a configuration key, accepting the deprecated synonym.
fn item_type_for_key(key: &str) -> Option<CollectionItemType> {
    if key == DEPRECATED_PORTABLE_MODELS_KEY {
        return Some(CollectionItemType::PortableModel);
    }
    ITEM_TYPES
        .into_iter()
        .find(|item_type| item_type.configuration_key() == key)
}

fn default_dirs(item_type: CollectionItemType, home: &Path) -> PathSet {
    let mut dirs = PathSet::parse(Some(item_type.user_default_dirs()));
    dirs.expand_home(home);
    dirs
}

fn malformed(path: &Path, message: String) -> Error {
    Error::new(ErrorKind::Malformed)
        .with_message(format!("configuration file: {message}"))
        .with_path(path)
}

fn read_locked(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    FileExt::lock_shared(&file)?;
    let mut text = String::new();
    let result = file.read_to_string(&mut text);
    let _ = FileExt::unlock(&file);
    result.map(|_| text)
}

fn write_locked(path: &Path, contents: &str) -> Result<(), Error> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|err| io_error("unable to open configuration file", path, err))?;
    file.lock_exclusive()
        .map_err(|err| io_error("unable to lock configuration file", path, err))?;
    let result = file
        .set_len(0)
        .and_then(|_| file.write_all(contents.as_bytes()))
        .and_then(|_| file.sync_all())
        .map_err(|err| io_error("unable to write configuration file", path, err));
    let _ = FileExt::unlock(&file);
    result
}

#[cfg(all(test, unix))]
mod tests {
    use super::{ConfigurationStore, parse_configuration};
    use crate::core::environment::Environment;
    use crate::core::error::ErrorKind;
    use crate::core::log::Log;
    use crate::core::names::CollectionItemType;

    #[test]
    fn parse_stops_at_the_first_blank_line() {
        let parsed = parse_configuration("a = /x\nb=/y:/z\n\nnote = ignored\n");
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[1].key, "b");
        assert_eq!(parsed.entries[1].value, "/y:/z");
        assert_eq!(parsed.commentary, "\nnote = ignored\n");
    }

    #[test]
    fn parse_stops_once_every_item_type_has_an_entry() {
        let parsed = parse_configuration(
            "model-drivers-dir = /md\nmodels-dir = /pm\nsimulator-models-dir = /sm\nEdited by hand.\n",
        );
        assert_eq!(parsed.entries.len(), 3);
        assert_eq!(parsed.commentary, "Edited by hand.\n");
    }

    #[test]
    fn entries_are_matched_by_key_not_position() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = Environment::isolated(temp.path());
        let path = env.configuration_file_name();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "simulator-models-dir = /sm\nportable-models-dir = /pm\nmodel-drivers-dir = /md\n",
        )
        .unwrap();
        let log = Log::new("test");
        let dirs = ConfigurationStore::new(&env, &log).load().expect("load");
        assert_eq!(dirs.get(CollectionItemType::SimulatorModel).to_string(), "/sm");
        assert_eq!(dirs.get(CollectionItemType::ModelDriver).to_string(), "/md");
    }

    #[test]
    fn deprecated_models_dir_is_accepted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = Environment::isolated(temp.path());
        let path = env.configuration_file_name();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "model-drivers-dir = /md\nmodels-dir = /pm\nsimulator-models-dir = /sm\n",
        )
        .unwrap();
        let log = Log::new("test");
        let dirs = ConfigurationStore::new(&env, &log).load().expect("load");
        assert_eq!(dirs.get(CollectionItemType::PortableModel).to_string(), "/pm");
    }

    #[test]
    fn unexpected_identifier_is_malformed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = Environment::isolated(temp.path());
        let path = env.configuration_file_name();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "drivers = /md\nportable-models-dir = /pm\n").unwrap();
        let log = Log::new("test");
        let err = ConfigurationStore::new(&env, &log).load().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
