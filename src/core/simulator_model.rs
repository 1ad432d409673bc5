//! Purpose: Load a simulator model: resolve, extract parameter files, parse its spec, template fields.
//! Exports: `SimulatorModel`, `SimulatorModelSpec`, `SPEC_SCHEMA_VERSION_KEY`.
//! Role: Owner of one simulator model's scratch directory and open library.
//! Invariants: `create` either returns a ready model or fails with nothing left on disk.
//! Invariants: A new model starts with the template map open and its standard entries present.
//! Invariants: Field lines are readable only while the template map is closed.
//! Invariants: Template keys match `[a-z0-9-]+`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::TempDir;

use crate::core::collections::Collections;
use crate::core::edn::{self, EdnNode};
use crate::core::enumeration::Extensible;
use crate::core::environment::Environment;
use crate::core::error::{Error, ErrorKind, io_error};
use crate::core::library::{DynamicLoader, EmbeddedFile, ItemLibrary, LibraryLoader};
use crate::core::log::{Log, LogVerbosity};
use crate::core::names::CollectionItemType;

pub const SPEC_SCHEMA_VERSION_KEY: &str = "kim-api-sm-schema-version";
const SCRATCH_PREFIX: &str = "kim-simulator-model-";

/// Declarative content of a schema version 1 specification document.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SimulatorModelSpec {
    pub schema_version: i64,
    pub model_name: String,
    pub simulator_name: String,
    pub simulator_version: String,
    pub supported_species: Vec<String>,
    pub field_names: Vec<String>,
    pub fields: Vec<Vec<String>>,
}

impl SimulatorModelSpec {
    /// Parse an EDN specification document; only schema version 1 is accepted.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let root = edn::parse(text)?;
        let EdnNode::Map(entries) = &root else {
            return Err(spec_error(format!("expecting map, found {}", root.kind())));
        };

        let schema_version = match root.get(SPEC_SCHEMA_VERSION_KEY) {
            Some(EdnNode::Int(version)) => *version,
            Some(other) => {
                return Err(spec_error(format!(
                    "'{SPEC_SCHEMA_VERSION_KEY}' must be an int, found {}",
                    other.kind()
                )));
            }
            None => 0,
        };
        if schema_version != 1 {
            return Err(Error::new(ErrorKind::Unsupported).with_message(format!(
                "unsupported specification schema version {schema_version}"
            )));
        }

        let mut spec = Self {
            schema_version,
            ..Self::default()
        };
        for (key, value) in entries {
            let Some(key) = key.as_str() else {
                continue;
            };
            match key {
                SPEC_SCHEMA_VERSION_KEY => {}
                "model-name" => spec.model_name = string_value(key, value)?,
                "simulator-name" => spec.simulator_name = string_value(key, value)?,
                "simulator-version" => spec.simulator_version = string_value(key, value)?,
                "supported-species" => {
                    spec.supported_species = string_value(key, value)?
                        .split_whitespace()
                        .map(str::to_string)
                        .collect();
                }
                _ => {
                    let lines = match value {
                        EdnNode::String(line) => vec![line.clone()],
                        EdnNode::Vector(items) => items
                            .iter()
                            .map(|item| string_value(key, item))
                            .collect::<Result<_, _>>()?,
                        other => {
                            return Err(spec_error(format!(
                                "field '{key}' must be a string or a vector of strings, found {}",
                                other.kind()
                            )));
                        }
                    };
                    spec.field_names.push(key.to_string());
                    spec.fields.push(lines);
                }
            }
        }
        Ok(spec)
    }

    /// Check that every required key is present and names `model_name`.
    pub fn validate(&self, model_name: &str) -> Result<(), Error> {
        if self.model_name.is_empty() {
            return Err(spec_error("required field 'model-name' not found".to_string()));
        }
        if self.model_name != model_name {
            return Err(spec_error(format!(
                "field 'model-name' is '{}', expected '{model_name}'",
                self.model_name
            )));
        }
        for (key, value) in [
            ("simulator-name", &self.simulator_name),
            ("simulator-version", &self.simulator_version),
        ] {
            if value.is_empty() {
                return Err(spec_error(format!("required field '{key}' not found")));
            }
        }
        if self.supported_species.is_empty() {
            return Err(spec_error("required field 'supported-species' not found".to_string()));
        }
        Ok(())
    }
}

fn string_value(key: &str, node: &EdnNode) -> Result<String, Error> {
    node.as_str().map(str::to_string).ok_or_else(|| {
        spec_error(format!("field '{key}' expects a string, found {}", node.kind()))
    })
}

fn spec_error(message: String) -> Error {
    Error::new(ErrorKind::Malformed).with_message(format!("simulator model specification: {message}"))
}

pub struct SimulatorModel {
    name: String,
    log: Log,
    spec: SimulatorModelSpec,
    specification_file_name: String,
    parameter_file_basenames: Vec<String>,
    template_map: BTreeMap<String, String>,
    template_map_open: bool,
    simulator_fields: Vec<Vec<String>>,
    simulator_buffer: Option<Box<dyn Any + Send>>,
    // Field order matters: the scratch directory goes before the library closes.
    scratch: TempDir,
    _library: Box<dyn ItemLibrary>,
}

impl std::fmt::Debug for SimulatorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatorModel")
            .field("name", &self.name)
            .field("parameter_file_directory", &self.scratch.path())
            .field("template_map_open", &self.template_map_open)
            .finish_non_exhaustive()
    }
}

impl SimulatorModel {
    /// Load `name` using this process's environment and on-disk libraries.
    pub fn create_from_process(name: &str) -> Result<Self, Error> {
        let loader = DynamicLoader;
        let env = Environment::from_process(loader.origin());
        Self::create(name, env, Arc::new(loader))
    }

    pub fn create(name: &str, env: Environment, loader: Arc<dyn LibraryLoader>) -> Result<Self, Error> {
        let log = Log::new("simulator_model");
        Self::initialize(name, env, loader, &log).map_err(|err| {
            log.fail(err.with_item(name))
        })
    }

    fn initialize(
        name: &str,
        env: Environment,
        loader: Arc<dyn LibraryLoader>,
        log: &Log,
    ) -> Result<Self, Error> {
        let scratch_root = env.scratch().to_path_buf();
        let mut collections = Collections::new(env, Arc::clone(&loader));
        collections.set_log_id(&format!("{}_Collections", log.id()));
        let resolved =
            collections.item_library_file_name_and_collection(CollectionItemType::SimulatorModel, name)?;
        let library = loader.open(&resolved.library_path)?;
        match library.item_type() {
            Extensible::Known(CollectionItemType::SimulatorModel) => {}
            Extensible::Known(CollectionItemType::PortableModel) => {
                return Err(not_allowed("Creation of a portable model is not allowed."));
            }
            Extensible::Known(CollectionItemType::ModelDriver) => {
                return Err(not_allowed("Creation of a model driver is not allowed."));
            }
            Extensible::Unknown(_) => {
                return Err(not_allowed("Creation of an unknown item type is not allowed."));
            }
        }

        let specification = library.specification_file().cloned().ok_or_else(|| {
            Error::new(ErrorKind::Malformed)
                .with_message("simulator model has no specification file")
                .with_path(&resolved.library_path)
        })?;
        let scratch = write_parameter_file_directory(
            &scratch_root,
            library.parameter_files(),
            &specification,
        )?;
        let parameter_file_basenames = library
            .parameter_files()
            .iter()
            .map(|file| file.name.clone())
            .collect();

        let spec_path = scratch.path().join(&specification.name);
        let text = fs::read_to_string(&spec_path)
            .map_err(|err| io_error("unable to read specification file", &spec_path, err))?;
        let spec = SimulatorModelSpec::parse(&text).map_err(|err| err.with_path(&spec_path))?;
        spec.validate(name)?;

        let mut model = Self {
            name: name.to_string(),
            log: log.clone(),
            spec,
            specification_file_name: specification.name,
            parameter_file_basenames,
            template_map: BTreeMap::new(),
            template_map_open: true,
            simulator_fields: Vec::new(),
            simulator_buffer: None,
            scratch,
            _library: library,
        };
        model.open_and_initialize_template_map();
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &SimulatorModelSpec {
        &self.spec
    }

    pub fn simulator_name_and_version(&self) -> (&str, &str) {
        (&self.spec.simulator_name, &self.spec.simulator_version)
    }

    pub fn number_of_supported_species(&self) -> usize {
        self.spec.supported_species.len()
    }

    pub fn supported_species(&self, index: usize) -> Result<&str, Error> {
        self.indexed(&self.spec.supported_species, index, "species")
            .map(String::as_str)
    }

    /// Reset the template map to the standard entries and discard substituted fields.
    pub fn open_and_initialize_template_map(&mut self) {
        self.template_map_open = true;
        self.template_map.clear();
        self.simulator_fields.clear();

        let dir = self.scratch.path().to_path_buf();
        self.template_map
            .insert("parameter-file-dir".to_string(), dir.display().to_string());
        for (index, basename) in self.parameter_file_basenames.iter().enumerate() {
            let ordinal = index + 1;
            self.template_map
                .insert(format!("parameter-file-basename-{ordinal}"), basename.clone());
            self.template_map.insert(
                format!("parameter-file-{ordinal}"),
                dir.join(basename).display().to_string(),
            );
        }
    }

    pub fn template_map_is_open(&self) -> bool {
        self.template_map_open
    }

    pub fn add_template_map(&mut self, key: &str, value: &str) -> Result<(), Error> {
        if !self.template_map_open {
            return Err(self.log.fail(
                Error::new(ErrorKind::Misuse).with_message("Template map is closed."),
            ));
        }
        if !is_template_key(key) {
            return Err(self.log.fail(
                Error::new(ErrorKind::Usage).with_message(format!("Invalid template key, '{key}'.")),
            ));
        }
        self.template_map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Close the map and substitute `@<key>@` in every field line.
    pub fn close_template_map(&mut self) {
        self.template_map_open = false;
        self.simulator_fields = self
            .spec
            .fields
            .iter()
            .map(|lines| {
                lines
                    .iter()
                    .map(|line| substitute(line, &self.template_map))
                    .collect()
            })
            .collect();
    }

    pub fn number_of_simulator_fields(&self) -> usize {
        self.spec.fields.len()
    }

    /// Number of lines and name of field `index`.
    pub fn simulator_field_metadata(&self, index: usize) -> Result<(usize, &str), Error> {
        let lines = self.indexed(&self.spec.fields, index, "simulator field")?;
        Ok((lines.len(), self.spec.field_names[index].as_str()))
    }

    pub fn simulator_field_line(&self, field: usize, line: usize) -> Result<&str, Error> {
        if self.template_map_open {
            return Err(self.log.fail(Error::new(ErrorKind::Misuse).with_message(
                "Simulator field lines are not available while the template map is open.",
            )));
        }
        let lines = self.indexed(&self.simulator_fields, field, "simulator field")?;
        self.indexed(lines, line, "simulator field line")
            .map(String::as_str)
    }

    pub fn parameter_file_directory_name(&self) -> &Path {
        self.scratch.path()
    }

    pub fn specification_file_name(&self) -> &str {
        &self.specification_file_name
    }

    pub fn number_of_parameter_files(&self) -> usize {
        self.parameter_file_basenames.len()
    }

    pub fn parameter_file_basename(&self, index: usize) -> Result<&str, Error> {
        self.indexed(&self.parameter_file_basenames, index, "parameter file")
            .map(String::as_str)
    }

    /// Absolute path of parameter file `index` inside the scratch directory.
    pub fn parameter_file_path(&self, index: usize) -> Result<PathBuf, Error> {
        self.parameter_file_basename(index)
            .map(|basename| self.scratch.path().join(basename))
    }

    pub fn set_simulator_buffer(&mut self, buffer: Box<dyn Any + Send>) {
        self.simulator_buffer = Some(buffer);
    }

    pub fn simulator_buffer(&self) -> Option<&(dyn Any + Send)> {
        self.simulator_buffer.as_deref()
    }

    pub fn take_simulator_buffer(&mut self) -> Option<Box<dyn Any + Send>> {
        self.simulator_buffer.take()
    }

    pub fn log(&self) -> &Log {
        &self.log
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

    /// Machine-readable description of the loaded model.
    pub fn summary_json(&self) -> serde_json::Value {
        let summary = Summary {
            simulator_model_name: &self.name,
            log_id: self.log.id(),
            schema_version: self.spec.schema_version,
            simulator_name: &self.spec.simulator_name,
            simulator_version: &self.spec.simulator_version,
            supported_species: &self.spec.supported_species,
            parameter_file_directory: self.scratch.path().display().to_string(),
            specification_file: &self.specification_file_name,
            parameter_files: &self.parameter_file_basenames,
            template_map_open: self.template_map_open,
            template_map: &self.template_map,
            simulator_fields: self
                .spec
                .field_names
                .iter()
                .zip(&self.spec.fields)
                .map(|(name, lines)| SummaryField { name, lines })
                .collect(),
        };
        serde_json::to_value(summary).unwrap_or(serde_json::Value::Null)
    }

    fn indexed<'a, T>(&self, items: &'a [T], index: usize, what: &str) -> Result<&'a T, Error> {
        items.get(index).ok_or_else(|| {
            self.log.fail(
                Error::new(ErrorKind::Usage)
                    .with_message(format!("Invalid {what} index, {index}.")),
            )
        })
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    simulator_model_name: &'a str,
    log_id: &'a str,
    schema_version: i64,
    simulator_name: &'a str,
    simulator_version: &'a str,
    supported_species: &'a [String],
    parameter_file_directory: String,
    specification_file: &'a str,
    parameter_files: &'a [String],
    template_map_open: bool,
    template_map: &'a BTreeMap<String, String>,
    simulator_fields: Vec<SummaryField<'a>>,
}

#[derive(Serialize)]
struct SummaryField<'a> {
    name: &'a str,
    lines: &'a [String],
}

fn not_allowed(message: &str) -> Error {
    Error::new(ErrorKind::Unsupported).with_message(message.to_string())
}

fn is_template_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-')
}

fn substitute(line: &str, map: &BTreeMap<String, String>) -> String {
    let mut line = line.to_string();
    for (key, value) in map {
        let pattern = format!("@<{key}>@");
        let mut pos = 0;
        while let Some(found) = line[pos..].find(&pattern) {
            let start = pos + found;
            line.replace_range(start..start + pattern.len(), value);
            pos = start + value.len();
        }
    }
    line
}

/// Write the parameter files and the specification file into a fresh scratch directory.
fn write_parameter_file_directory(
    root: &Path,
    parameter_files: &[EmbeddedFile],
    specification: &EmbeddedFile,
) -> Result<TempDir, Error> {
    fs::create_dir_all(root)
        .map_err(|err| io_error("unable to create scratch directory", root, err))?;
    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(root)
        .map_err(|err| io_error("unable to create parameter file directory", root, err))?;
    for file in parameter_files.iter().chain(std::iter::once(specification)) {
        if !is_plain_file_name(&file.name) {
            return Err(Error::new(ErrorKind::Malformed)
                .with_message(format!("embedded file name '{}' is not a plain file name", file.name)));
        }
        let path = scratch.path().join(&file.name);
        fs::write(&path, &file.data)
            .map_err(|err| io_error("unable to write parameter file", &path, err))?;
    }
    Ok(scratch)
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::{SimulatorModelSpec, is_plain_file_name, is_template_key, substitute};
    use crate::core::error::ErrorKind;
    use std::collections::BTreeMap;

    const SPEC: &str = r#"{"kim-api-sm-schema-version" 1
        "model-name" "Sim_LAMMPS_LJ"
        "simulator-name" "LAMMPS"
        "simulator-version" "12 Dec 2018"
        "supported-species" " Ar  Ne "
        "units" "metal"
        "model-init" ["pair_style lj/cut 8.0" "pair_coeff * * @<parameter-file-1>@"]}"#;

    #[test]
    fn schema_v1_fields_are_collected_in_order() {
        let spec = SimulatorModelSpec::parse(SPEC).expect("parse");
        assert_eq!(spec.supported_species, vec!["Ar", "Ne"]);
        assert_eq!(spec.field_names, vec!["units", "model-init"]);
        assert_eq!(spec.fields[1].len(), 2);
        spec.validate("Sim_LAMMPS_LJ").expect("valid");
        assert_eq!(spec.validate("Other").unwrap_err().kind(), ErrorKind::Malformed);
    }

    #[test]
    fn other_schema_versions_are_unsupported() {
        let err = SimulatorModelSpec::parse(r#"{"kim-api-sm-schema-version" 2 "model-name" "x"}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = SimulatorModelSpec::parse(r#"{"model-name" "x"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = SimulatorModelSpec::parse(r#"{"kim-api-sm-schema-version" "1"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn field_values_must_be_strings() {
        let err =
            SimulatorModelSpec::parse(r#"{"kim-api-sm-schema-version" 1 "units" [1 2]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        let err = SimulatorModelSpec::parse(r#"{"kim-api-sm-schema-version" 1 "model-name" 3}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn substitution_replaces_every_occurrence() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), "@<a>@x".to_string());
        map.insert("b-1".to_string(), "B".to_string());
        assert_eq!(substitute("@<a>@ @<b-1>@ @<a>@ @<c>@", &map), "@<a>@x B @<a>@x @<c>@");
    }

    #[test]
    fn template_keys_and_file_names() {
        assert!(is_template_key("bad-key-1"));
        assert!(!is_template_key("Bad Key!"));
        assert!(!is_template_key(""));
        assert!(is_plain_file_name("lj.params"));
        assert!(!is_plain_file_name("../escape"));
        assert!(!is_plain_file_name("a/b"));
    }
}
