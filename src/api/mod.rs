//! Purpose: Define the stable public Rust API boundary for KIM collections.
//! Exports: Discovery, configuration, unit conversion and simulator-model types.
//! Role: Public, additive-only surface; hides internal helper functions.
//! Invariants: This module is the intended public path to every core type.

pub use crate::core::collections::{Collections, ResolvedItem};
pub use crate::core::compute_arguments::{
    ArgumentPointer, ComputeArgumentName, ComputeArguments, DataType, SupportStatus,
};
pub use crate::core::config::{ConfigurationStore, UserDirectories};
pub use crate::core::enumeration::{Extensible, KnownValue};
pub use crate::core::environment::Environment;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::library::{
    DynamicLoader, EmbeddedFile, ItemLibrary, KimEmbeddedFile, KimLibraryManifest,
    LibraryContents, LibraryLoader, MANIFEST_SCHEMA_VERSION,
};
pub use crate::core::log::{Log, LogVerbosity, default_verbosity, set_default_verbosity};
pub use crate::core::metadata::MetadataFile;
pub use crate::core::names::{Collection, CollectionItemType, PROJECT_NAME, PROJECT_VERSION};
pub use crate::core::path_set::PathSet;
pub use crate::core::simulator_model::{SimulatorModel, SimulatorModelSpec};
pub use crate::core::units::{
    BaseUnit, ChargeUnit, EnergyUnit, LengthUnit, TemperatureUnit, TimeUnit, UnitExponents,
    UnitSystem, convert_unit,
};
