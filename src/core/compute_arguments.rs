//! Purpose: Compute-argument support table and pointer slots for one model/simulator pairing.
//! Exports: `ComputeArgumentName`, `SupportStatus`, `DataType`, `ArgumentPointer`, `ComputeArguments`.
//! Role: Records which arguments a model supports and which buffers a simulator provided.
//! Invariants: `requiredByAPI` arguments keep that status for the table's lifetime.
//! Invariants: A `notSupported` argument never holds a non-null pointer.
//! Notes: Pointers are stored only; this module never dereferences them.

use std::collections::BTreeMap;
use std::ffi::c_int;

use crate::core::enumeration::{Extensible, KnownValue, known_values};
use crate::core::error::{Error, ErrorKind};
use crate::core::log::{Log, LogVerbosity};

known_values! {
    pub enum ComputeArgumentName: "ComputeArgumentName" {
        NumberOfParticles => "numberOfParticles",
        ParticleSpeciesCodes => "particleSpeciesCodes",
        ParticleContributing => "particleContributing",
        Coordinates => "coordinates",
        PartialEnergy => "partialEnergy",
        PartialForces => "partialForces",
        PartialParticleEnergy => "partialParticleEnergy",
        PartialVirial => "partialVirial",
        PartialParticleVirial => "partialParticleVirial",
    }
}

known_values! {
    pub enum SupportStatus: "SupportStatus" {
        RequiredByApi => "requiredByAPI",
        NotSupported => "notSupported",
        Required => "required",
        Optional => "optional",
    }
}

known_values! {
    pub enum DataType: "DataType" {
        Integer => "Integer",
        Double => "Double",
    }
}

impl ComputeArgumentName {
    pub fn data_type(self) -> DataType {
        match self {
            Self::NumberOfParticles | Self::ParticleSpeciesCodes | Self::ParticleContributing => {
                DataType::Integer
            }
            _ => DataType::Double,
        }
    }

    pub fn is_required_by_api(self) -> bool {
        matches!(
            self,
            Self::NumberOfParticles
                | Self::ParticleSpeciesCodes
                | Self::ParticleContributing
                | Self::Coordinates
        )
    }
}

/// A caller-owned buffer, typed by the argument's element type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgumentPointer {
    Integer(*mut c_int),
    Double(*mut f64),
}

impl ArgumentPointer {
    pub fn null(data_type: DataType) -> Self {
        match data_type {
            DataType::Integer => Self::Integer(std::ptr::null_mut()),
            DataType::Double => Self::Double(std::ptr::null_mut()),
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            Self::Integer(_) => DataType::Integer,
            Self::Double(_) => DataType::Double,
        }
    }

    pub fn is_null(self) -> bool {
        match self {
            Self::Integer(ptr) => ptr.is_null(),
            Self::Double(ptr) => ptr.is_null(),
        }
    }
}

#[derive(Debug)]
pub struct ComputeArguments {
    log: Log,
    status: BTreeMap<ComputeArgumentName, SupportStatus>,
    pointers: BTreeMap<ComputeArgumentName, ArgumentPointer>,
}

impl Default for ComputeArguments {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeArguments {
    pub fn new() -> Self {
        let mut status = BTreeMap::new();
        let mut pointers = BTreeMap::new();
        for name in ComputeArgumentName::ALL.iter().copied() {
            if name.is_required_by_api() {
                status.insert(name, SupportStatus::RequiredByApi);
                pointers.insert(name, ArgumentPointer::null(name.data_type()));
            } else {
                status.insert(name, SupportStatus::NotSupported);
            }
        }
        Self {
            log: Log::new("compute_arguments"),
            status,
            pointers,
        }
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

    pub fn argument_support_status(
        &self,
        name: impl Into<Extensible<ComputeArgumentName>>,
    ) -> Result<SupportStatus, Error> {
        let name = self.known(name.into())?;
        Ok(self.status_of(name))
    }

    pub fn set_argument_support_status(
        &mut self,
        name: impl Into<Extensible<ComputeArgumentName>>,
        status: impl Into<Extensible<SupportStatus>>,
    ) -> Result<(), Error> {
        let name = self.known(name.into())?;
        let status = self.known(status.into())?;
        if self.status_of(name) == SupportStatus::RequiredByApi
            && status != SupportStatus::RequiredByApi
        {
            return Err(self.log.fail(Error::new(ErrorKind::Misuse).with_message(format!(
                "Argument '{name}' SupportStatus is 'requiredByAPI' and cannot be changed."
            ))));
        }
        self.status.insert(name, status);
        if status != SupportStatus::NotSupported {
            self.pointers
                .entry(name)
                .or_insert_with(|| ArgumentPointer::null(name.data_type()));
        }
        Ok(())
    }

    pub fn set_argument_pointer(
        &mut self,
        name: impl Into<Extensible<ComputeArgumentName>>,
        pointer: ArgumentPointer,
    ) -> Result<(), Error> {
        let name = self.known(name.into())?;
        if pointer.data_type() != name.data_type() {
            return Err(self.log.fail(Error::new(ErrorKind::Usage).with_message(format!(
                "ComputeArgument '{name}' expects {} data, got {}.",
                name.data_type(),
                pointer.data_type()
            ))));
        }
        if self.status_of(name) == SupportStatus::NotSupported {
            if pointer.is_null() {
                self.log.warning(&format!(
                    "Setting 'notSupported' ComputeArgument '{name}' pointer to NULL.  This \
                     action, although innocuous, is considered an error and should be avoided."
                ));
                return Ok(());
            }
            return Err(self.log.fail(Error::new(ErrorKind::Misuse).with_message(format!(
                "Pointer value cannot be set for ComputeArgument '{name}' which is 'notSupported'."
            ))));
        }
        self.pointers.insert(name, pointer);
        Ok(())
    }

    pub fn argument_pointer(
        &self,
        name: impl Into<Extensible<ComputeArgumentName>>,
    ) -> Result<ArgumentPointer, Error> {
        let name = self.known(name.into())?;
        if self.status_of(name) == SupportStatus::NotSupported {
            return Err(self.log.fail(Error::new(ErrorKind::Misuse).with_message(format!(
                "Pointer value does not exist for ComputeArgument '{name}' which is 'notSupported'."
            ))));
        }
        Ok(self
            .pointers
            .get(&name)
            .copied()
            .unwrap_or_else(|| ArgumentPointer::null(name.data_type())))
    }

    /// Whether every `requiredByAPI` and `required` argument has a non-null pointer.
    pub fn are_all_required_present(&self) -> bool {
        for (name, status) in &self.status {
            if !matches!(status, SupportStatus::RequiredByApi | SupportStatus::Required) {
                continue;
            }
            let present = self.pointers.get(name).is_some_and(|ptr| !ptr.is_null());
            if !present {
                self.log
                    .error(&format!("Required ComputeArgument '{name}' is not present."));
                return false;
            }
        }
        true
    }

    fn status_of(&self, name: ComputeArgumentName) -> SupportStatus {
        self.status
            .get(&name)
            .copied()
            .unwrap_or(SupportStatus::NotSupported)
    }

    fn known<T: KnownValue>(&self, value: Extensible<T>) -> Result<T, Error> {
        value.require_known().map_err(|err| self.log.fail(err))
    }
}
