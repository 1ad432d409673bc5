//! Purpose: Snapshot of the process inputs that drive collection resolution and extraction.
//! Exports: `Environment`.
//! Role: Keeps home/cwd/environment-variable lookups out of resolver logic.
//! Invariants: Resolution never reads `std::env` directly; it reads an `Environment`.
//! Invariants: A relative configuration-file override resolves against `cwd`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::names::{CONFIGURATION_FILE_VARIABLE, CollectionItemType, USER_CONFIGURATION_FILE};

#[derive(Clone, Debug)]
pub struct Environment {
    home: PathBuf,
    cwd: PathBuf,
    origin: PathBuf,
    scratch: PathBuf,
    configuration_file: Option<String>,
    item_dirs: BTreeMap<CollectionItemType, String>,
}

impl Environment {
    /// Read home, cwd, `$ORIGIN` and the collection variables from this process.
    pub fn from_process(origin: PathBuf) -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_default();
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let configuration_file = std::env::var(CONFIGURATION_FILE_VARIABLE)
            .ok()
            .filter(|value| !value.is_empty());
        let item_dirs = [
            CollectionItemType::ModelDriver,
            CollectionItemType::PortableModel,
            CollectionItemType::SimulatorModel,
        ]
        .into_iter()
        .filter_map(|item_type| {
            std::env::var(item_type.environment_variable())
                .ok()
                .map(|value| (item_type, value))
        })
        .collect();
        Self {
            home,
            cwd,
            origin,
            scratch: std::env::temp_dir(),
            configuration_file,
            item_dirs,
        }
    }

    /// An environment rooted entirely under `root`, with no variables set.
    pub fn isolated(root: &Path) -> Self {
        Self {
            home: root.join("home"),
            cwd: root.join("cwd"),
            origin: root.join("origin"),
            scratch: root.join("tmp"),
            configuration_file: None,
            item_dirs: BTreeMap::new(),
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_scratch(mut self, scratch: impl Into<PathBuf>) -> Self {
        self.scratch = scratch.into();
        self
    }

    pub fn with_configuration_file(mut self, value: impl Into<String>) -> Self {
        self.configuration_file = Some(value.into());
        self
    }

    pub fn with_item_dirs(mut self, item_type: CollectionItemType, value: impl Into<String>) -> Self {
        self.item_dirs.insert(item_type, value.into());
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Parent of simulator-model parameter-file directories.
    pub fn scratch(&self) -> &Path {
        &self.scratch
    }

    /// Value of the configuration-file override variable, if set.
    pub fn configuration_file_variable(&self) -> Option<&str> {
        self.configuration_file.as_deref()
    }

    pub fn item_dirs_variable(&self, item_type: CollectionItemType) -> Option<&str> {
        self.item_dirs.get(&item_type).map(String::as_str)
    }

    /// Absolute path of the user configuration file.
    pub fn configuration_file_name(&self) -> PathBuf {
        match &self.configuration_file {
            Some(value) => self.absolute(Path::new(value)),
            None => self.expand_home(Path::new(USER_CONFIGURATION_FILE)),
        }
    }

    /// Anchor a relative path at the current working directory.
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.cwd.join(path)
        } else {
            path.to_path_buf()
        }
    }

    fn expand_home(&self, path: &Path) -> PathBuf {
        match path.strip_prefix("~") {
            Ok(rest) => self.home.join(rest),
            Err(_) => self.absolute(path),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::Environment;
    use crate::core::names::CollectionItemType;
    use std::path::{Path, PathBuf};

    #[test]
    fn default_configuration_file_lives_under_home() {
        let env = Environment::isolated(Path::new("/r"));
        assert_eq!(
            env.configuration_file_name(),
            PathBuf::from("/r/home/.kim-api/2.4.1/kim-api-v2-config")
        );
    }

    #[test]
    fn relative_override_resolves_against_cwd() {
        let env = Environment::isolated(Path::new("/r")).with_configuration_file("conf/kim");
        assert_eq!(env.configuration_file_name(), PathBuf::from("/r/cwd/conf/kim"));
        let env = env.with_configuration_file("/etc/kim");
        assert_eq!(env.configuration_file_name(), PathBuf::from("/etc/kim"));
    }

    #[test]
    fn item_dir_variables_are_per_type() {
        let env = Environment::isolated(Path::new("/r"))
            .with_item_dirs(CollectionItemType::PortableModel, "/pm");
        assert_eq!(env.item_dirs_variable(CollectionItemType::PortableModel), Some("/pm"));
        assert_eq!(env.item_dirs_variable(CollectionItemType::ModelDriver), None);
    }
}
