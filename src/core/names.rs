//! Purpose: Item-type and collection enumerations plus the compiled-in naming constants.
//! Exports: `CollectionItemType`, `Collection`, project constants, library naming helpers.
//! Role: Single source for every fixed name the resolver and configuration store use.
//! Invariants: Collection priority order is CWD > environment variable > user > system.
//! Invariants: Library file names follow `<prefix>kim-api-<item tag><suffix>`.

use crate::core::enumeration::known_values;

pub const PROJECT_NAME: &str = "kim-api";
pub const PROJECT_VERSION: &str = "2.4.1";
pub const CONFIGURATION_FILE_VARIABLE: &str = "KIM_API_CONFIGURATION_FILE";
pub const USER_CONFIGURATION_FILE: &str = "~/.kim-api/2.4.1/kim-api-v2-config";
pub const DEPRECATED_PORTABLE_MODELS_KEY: &str = "models-dir";
pub const ORIGIN_TOKENS: [&str; 2] = ["$ORIGIN", "${ORIGIN}"];

#[cfg(target_os = "windows")]
pub const SHARED_MODULE_PREFIX: &str = "";
#[cfg(not(target_os = "windows"))]
pub const SHARED_MODULE_PREFIX: &str = "lib";

#[cfg(target_os = "windows")]
pub const SHARED_MODULE_SUFFIX: &str = ".dll";
#[cfg(target_os = "macos")]
pub const SHARED_MODULE_SUFFIX: &str = ".dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const SHARED_MODULE_SUFFIX: &str = ".so";

known_values! {
    /// The three kinds of installable plugin.
    pub enum CollectionItemType: "CollectionItemType" {
        ModelDriver => "modelDriver",
        PortableModel => "portableModel",
        SimulatorModel => "simulatorModel",
    }
}

impl CollectionItemType {
    /// Tag embedded in the library file name.
    pub fn library_tag(self) -> &'static str {
        match self {
            Self::ModelDriver => "model-driver",
            Self::PortableModel => "portable-model",
            Self::SimulatorModel => "simulator-model",
        }
    }

    pub fn library_file_name(self) -> String {
        format!(
            "{SHARED_MODULE_PREFIX}{PROJECT_NAME}-{}{SHARED_MODULE_SUFFIX}",
            self.library_tag()
        )
    }

    pub fn environment_variable(self) -> &'static str {
        match self {
            Self::ModelDriver => "KIM_API_MODEL_DRIVERS_DIR",
            Self::PortableModel => "KIM_API_PORTABLE_MODELS_DIR",
            Self::SimulatorModel => "KIM_API_SIMULATOR_MODELS_DIR",
        }
    }

    /// Key of this item type's line in the user configuration file.
    pub fn configuration_key(self) -> &'static str {
        match self {
            Self::ModelDriver => "model-drivers-dir",
            Self::PortableModel => "portable-models-dir",
            Self::SimulatorModel => "simulator-models-dir",
        }
    }

    pub fn user_default_dirs(self) -> &'static str {
        match self {
            Self::ModelDriver => "~/.kim-api/2.4.1/model-drivers",
            Self::PortableModel => "~/.kim-api/2.4.1/portable-models",
            Self::SimulatorModel => "~/.kim-api/2.4.1/simulator-models",
        }
    }

    pub fn system_dirs(self) -> &'static str {
        match self {
            Self::ModelDriver => "${ORIGIN}/kim-api/model-drivers",
            Self::PortableModel => "${ORIGIN}/kim-api/portable-models",
            Self::SimulatorModel => "${ORIGIN}/kim-api/simulator-models",
        }
    }

    /// Label printed by the command line utilities.
    pub fn display_tag(self) -> &'static str {
        match self {
            Self::ModelDriver => "MODEL_DRIVER",
            Self::PortableModel => "PORTABLE_MODEL",
            Self::SimulatorModel => "SIMULATOR_MODEL",
        }
    }
}

known_values! {
    /// Search scopes for installed items.
    pub enum Collection: "Collection" {
        System => "system",
        User => "user",
        EnvironmentVariable => "environmentVariable",
        CurrentWorkingDirectory => "currentWorkingDirectory",
    }
}

impl Collection {
    /// Collections in the order a "find first" query consults them.
    pub const SEARCH_ORDER: [Collection; 4] = [
        Collection::CurrentWorkingDirectory,
        Collection::EnvironmentVariable,
        Collection::User,
        Collection::System,
    ];
}

#[cfg(test)]
mod tests {
    use super::{Collection, CollectionItemType};
    use crate::core::enumeration::{Extensible, KnownValue};

    #[test]
    fn library_names_follow_convention() {
        let name = CollectionItemType::SimulatorModel.library_file_name();
        assert!(name.contains("kim-api-simulator-model"));
        assert!(name.ends_with(super::SHARED_MODULE_SUFFIX));
    }

    #[test]
    fn item_types_parse_from_their_names() {
        let value = Extensible::<CollectionItemType>::from_name("portableModel");
        assert_eq!(value, CollectionItemType::PortableModel);
        assert!(!Extensible::<CollectionItemType>::from_name("model").is_known());
        assert_eq!(CollectionItemType::ALL.len(), 3);
    }

    #[test]
    fn search_order_is_most_local_first() {
        assert_eq!(
            Collection::SEARCH_ORDER.first(),
            Some(&Collection::CurrentWorkingDirectory)
        );
        assert_eq!(Collection::SEARCH_ORDER.last(), Some(&Collection::System));
    }
}
