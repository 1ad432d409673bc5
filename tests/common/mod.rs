// Shared fixtures: an in-memory library loader and on-disk item layouts.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use kim_collections::api::{
    CollectionItemType, EmbeddedFile, Environment, Error, ErrorKind, ItemLibrary, LibraryContents,
    LibraryLoader,
};

/// Serves `LibraryContents` registered against library paths.
pub struct MemoryLoader {
    origin: PathBuf,
    libraries: Mutex<BTreeMap<PathBuf, LibraryContents>>,
}

impl MemoryLoader {
    pub fn new(origin: &Path) -> Arc<Self> {
        Arc::new(Self {
            origin: origin.to_path_buf(),
            libraries: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn register(&self, path: &Path, contents: LibraryContents) {
        self.libraries
            .lock()
            .expect("loader lock")
            .insert(path.to_path_buf(), contents);
    }
}

impl LibraryLoader for MemoryLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn ItemLibrary>, Error> {
        let libraries = self.libraries.lock().expect("loader lock");
        match libraries.get(path) {
            Some(contents) => Ok(Box::new(contents.clone())),
            None => Err(Error::new(ErrorKind::Io)
                .with_message("unable to open shared library")
                .with_path(path)),
        }
    }

    fn origin(&self) -> PathBuf {
        self.origin.clone()
    }
}

pub struct Fixture {
    pub temp: tempfile::TempDir,
    pub env: Environment,
    pub loader: Arc<MemoryLoader>,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = Environment::isolated(temp.path());
        std::fs::create_dir_all(env.cwd()).expect("cwd");
        std::fs::create_dir_all(env.home()).expect("home");
        let loader = MemoryLoader::new(env.origin());
        Self { temp, env, loader }
    }

    pub fn loader(&self) -> Arc<dyn LibraryLoader> {
        self.loader.clone()
    }

    /// System collection directory for `item_type`.
    pub fn system_dir(&self, item_type: CollectionItemType) -> PathBuf {
        let leaf = match item_type {
            CollectionItemType::ModelDriver => "model-drivers",
            CollectionItemType::PortableModel => "portable-models",
            CollectionItemType::SimulatorModel => "simulator-models",
        };
        self.env.origin().join("kim-api").join(leaf)
    }

    /// Default user collection directory for `item_type`.
    pub fn user_dir(&self, item_type: CollectionItemType) -> PathBuf {
        let leaf = match item_type {
            CollectionItemType::ModelDriver => "model-drivers",
            CollectionItemType::PortableModel => "portable-models",
            CollectionItemType::SimulatorModel => "simulator-models",
        };
        self.env.home().join(".kim-api/2.4.1").join(leaf)
    }

    pub fn config_path(&self) -> PathBuf {
        self.env.configuration_file_name()
    }

    pub fn write_config(&self, text: &str) {
        let path = self.config_path();
        std::fs::create_dir_all(path.parent().expect("config parent")).expect("config dir");
        std::fs::write(path, text).expect("write config");
    }

    /// Lay out `<dir>/<name>/<library file>` and register `contents` for it.
    pub fn install(
        &self,
        dir: &Path,
        item_type: CollectionItemType,
        contents: LibraryContents,
    ) -> PathBuf {
        let item_dir = dir.join(&contents.item_name);
        std::fs::create_dir_all(&item_dir).expect("item dir");
        let library = item_dir.join(item_type.library_file_name());
        std::fs::write(&library, b"placeholder").expect("library file");
        self.loader.register(&library, contents);
        library
    }

    pub fn install_named(&self, dir: &Path, item_type: CollectionItemType, name: &str) -> PathBuf {
        self.install(dir, item_type, LibraryContents::new(item_type, name))
    }
}

pub const SIM_SPEC: &str = r#"{"kim-api-sm-schema-version" 1
 "model-name" "Sim_LJ"
 "simulator-name" "LAMMPS"
 "simulator-version" "12 Dec 2018"
 "supported-species" "Ar Ne"
 "units" "metal"
 "model-init" ["pair_style lj/cut 8.0"
               "file: @<parameter-file-basename-1>@"
               "path: @<parameter-file-1>@"
               "custom: @<sim-key>@"]}"#;

pub fn simulator_model(name: &str, spec: &str) -> LibraryContents {
    LibraryContents::new(CollectionItemType::SimulatorModel, name)
        .with_parameter_file(EmbeddedFile::new("params.txt", "epsilon 1.0\n"))
        .with_specification_file(EmbeddedFile::new("smspec.edn", spec))
}
