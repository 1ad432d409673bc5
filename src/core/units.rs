//! Purpose: Base-unit enumerations and the derived-unit conversion law.
//! Exports: the five unit enums, `BaseUnit`, `UnitSystem`, `UnitExponents`, `convert_unit`.
//! Role: Reconciles a model's declared unit system with the one a simulator requests.
//! Invariants: factor = product over dimensions of (scale_from / scale_to) ^ exponent.
//! Invariants: A dimension with a zero exponent is never inspected.
//! Invariants: A dimension with a non-zero exponent must be concrete on both sides.

use std::fmt;

use crate::core::enumeration::{Extensible, KnownValue, known_values};
use crate::core::error::{Error, ErrorKind};

/// A unit of one base dimension, with its scale relative to SI.
pub trait BaseUnit: KnownValue {
    const DIMENSION: &'static str;

    /// `None` for the `unused` sentinel.
    fn scale_to_si(self) -> Option<f64>;
}

known_values! {
    pub enum LengthUnit: "LengthUnit" {
        Unused => "unused",
        A => "A",
        Bohr => "Bohr",
        Cm => "cm",
        M => "m",
        Nm => "nm",
    }
}

impl BaseUnit for LengthUnit {
    const DIMENSION: &'static str = "length";

    fn scale_to_si(self) -> Option<f64> {
        match self {
            Self::Unused => None,
            Self::A => Some(1.0e-10),
            Self::Bohr => Some(5.291_772_109_03e-11),
            Self::Cm => Some(1.0e-2),
            Self::M => Some(1.0),
            Self::Nm => Some(1.0e-9),
        }
    }
}

known_values! {
    pub enum EnergyUnit: "EnergyUnit" {
        Unused => "unused",
        AmuA2PerPs2 => "amu_A2_per_ps2",
        Erg => "erg",
        EV => "eV",
        Hartree => "Hartree",
        J => "J",
        KcalMol => "kcal_mol",
    }
}

impl BaseUnit for EnergyUnit {
    const DIMENSION: &'static str = "energy";

    fn scale_to_si(self) -> Option<f64> {
        match self {
            Self::Unused => None,
            Self::AmuA2PerPs2 => Some(1.660_539_066_60e-23),
            Self::Erg => Some(1.0e-7),
            Self::EV => Some(1.602_176_634e-19),
            Self::Hartree => Some(4.359_744_722_207_1e-18),
            Self::J => Some(1.0),
            Self::KcalMol => Some(6.947_695_457_055e-21),
        }
    }
}

known_values! {
    pub enum ChargeUnit: "ChargeUnit" {
        Unused => "unused",
        C => "C",
        E => "e",
        StatC => "statC",
    }
}

impl BaseUnit for ChargeUnit {
    const DIMENSION: &'static str = "charge";

    fn scale_to_si(self) -> Option<f64> {
        match self {
            Self::Unused => None,
            Self::C => Some(1.0),
            Self::E => Some(1.602_176_634e-19),
            Self::StatC => Some(3.335_640_951_98e-10),
        }
    }
}

known_values! {
    pub enum TemperatureUnit: "TemperatureUnit" {
        Unused => "unused",
        K => "K",
    }
}

impl BaseUnit for TemperatureUnit {
    const DIMENSION: &'static str = "temperature";

    fn scale_to_si(self) -> Option<f64> {
        match self {
            Self::Unused => None,
            Self::K => Some(1.0),
        }
    }
}

known_values! {
    pub enum TimeUnit: "TimeUnit" {
        Unused => "unused",
        Fs => "fs",
        Ps => "ps",
        Ns => "ns",
        S => "s",
    }
}

impl BaseUnit for TimeUnit {
    const DIMENSION: &'static str = "time";

    fn scale_to_si(self) -> Option<f64> {
        match self {
            Self::Unused => None,
            Self::Fs => Some(1.0e-15),
            Self::Ps => Some(1.0e-12),
            Self::Ns => Some(1.0e-9),
            Self::S => Some(1.0),
        }
    }
}

/// One unit per base dimension; each may be concrete, `unused` or unknown.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitSystem {
    pub length: Extensible<LengthUnit>,
    pub energy: Extensible<EnergyUnit>,
    pub charge: Extensible<ChargeUnit>,
    pub temperature: Extensible<TemperatureUnit>,
    pub time: Extensible<TimeUnit>,
}

impl UnitSystem {
    pub fn new(
        length: impl Into<Extensible<LengthUnit>>,
        energy: impl Into<Extensible<EnergyUnit>>,
        charge: impl Into<Extensible<ChargeUnit>>,
        temperature: impl Into<Extensible<TemperatureUnit>>,
        time: impl Into<Extensible<TimeUnit>>,
    ) -> Self {
        Self {
            length: length.into(),
            energy: energy.into(),
            charge: charge.into(),
            temperature: temperature.into(),
            time: time.into(),
        }
    }

    /// Build the unit system a model declares at creation time.
    ///
    /// Length and energy must be concrete; the remaining dimensions may be
    /// `unused` but not unknown.
    pub fn model(
        length: impl Into<Extensible<LengthUnit>>,
        energy: impl Into<Extensible<EnergyUnit>>,
        charge: impl Into<Extensible<ChargeUnit>>,
        temperature: impl Into<Extensible<TemperatureUnit>>,
        time: impl Into<Extensible<TimeUnit>>,
    ) -> Result<Self, Error> {
        let system = Self::new(length, energy, charge, temperature, time);
        require_concrete(&system.length)?;
        require_concrete(&system.energy)?;
        system.charge.require_known()?;
        system.temperature.require_known()?;
        system.time.require_known()?;
        Ok(system)
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "length={} energy={} charge={} temperature={} time={}",
            self.length, self.energy, self.charge, self.temperature, self.time
        )
    }
}

/// Exponents of a derived unit over the five base dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UnitExponents {
    pub length: f64,
    pub energy: f64,
    pub charge: f64,
    pub temperature: f64,
    pub time: f64,
}

impl UnitExponents {
    pub fn new(length: f64, energy: f64, charge: f64, temperature: f64, time: f64) -> Self {
        Self {
            length,
            energy,
            charge,
            temperature,
            time,
        }
    }
}

/// Factor that converts a quantity expressed in `from` units into `to` units.
pub fn convert_unit(
    from: &UnitSystem,
    to: &UnitSystem,
    exponents: UnitExponents,
) -> Result<f64, Error> {
    Ok(dimension_factor(&from.length, &to.length, exponents.length)?
        * dimension_factor(&from.energy, &to.energy, exponents.energy)?
        * dimension_factor(&from.charge, &to.charge, exponents.charge)?
        * dimension_factor(&from.temperature, &to.temperature, exponents.temperature)?
        * dimension_factor(&from.time, &to.time, exponents.time)?)
}

fn dimension_factor<U: BaseUnit>(
    from: &Extensible<U>,
    to: &Extensible<U>,
    exponent: f64,
) -> Result<f64, Error> {
    if exponent == 0.0 {
        return Ok(1.0);
    }
    let from_scale = concrete_scale(from)?;
    let to_scale = concrete_scale(to)?;
    Ok((from_scale / to_scale).powf(exponent))
}

fn concrete_scale<U: BaseUnit>(unit: &Extensible<U>) -> Result<f64, Error> {
    unit.known()
        .and_then(BaseUnit::scale_to_si)
        .ok_or_else(|| {
            Error::new(ErrorKind::Unsupported).with_message(format!(
                "{} unit '{}' cannot take part in a conversion",
                U::DIMENSION,
                unit.unknown_spelling().unwrap_or(unit.name())
            ))
        })
}

fn require_concrete<U: BaseUnit>(unit: &Extensible<U>) -> Result<(), Error> {
    concrete_scale(unit).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metal() -> UnitSystem {
        UnitSystem::new(
            LengthUnit::A,
            EnergyUnit::EV,
            ChargeUnit::E,
            TemperatureUnit::K,
            TimeUnit::Ps,
        )
    }

    fn real() -> UnitSystem {
        UnitSystem::new(
            LengthUnit::A,
            EnergyUnit::KcalMol,
            ChargeUnit::E,
            TemperatureUnit::K,
            TimeUnit::Fs,
        )
    }

    #[test]
    fn length_only_conversion_uses_the_length_ratio() {
        let to = UnitSystem::new(
            LengthUnit::Nm,
            EnergyUnit::EV,
            ChargeUnit::E,
            TemperatureUnit::K,
            TimeUnit::Ps,
        );
        let factor = convert_unit(&metal(), &to, UnitExponents::new(1.0, 0.0, 0.0, 0.0, 0.0))
            .expect("factor");
        assert!((factor - 0.1).abs() < 1e-12);
    }

    #[test]
    fn force_conversion_between_ev_and_kcal() {
        let force = UnitExponents::new(-1.0, 1.0, 0.0, 0.0, 0.0);
        let factor = convert_unit(&metal(), &real(), force).expect("factor");
        assert!((factor - 23.060_548).abs() < 1e-4);
    }

    #[test]
    fn conversions_are_reciprocal() {
        let exponents = UnitExponents::new(2.0, -1.5, 1.0, 0.5, -2.0);
        let forward = convert_unit(&metal(), &real(), exponents).expect("forward");
        let backward = convert_unit(&real(), &metal(), exponents).expect("backward");
        assert!((forward * backward - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unused_dimension_is_ignored_with_zero_exponent() {
        let from = UnitSystem::new(
            LengthUnit::A,
            EnergyUnit::EV,
            ChargeUnit::Unused,
            TemperatureUnit::Unused,
            TimeUnit::Unused,
        );
        let to = UnitSystem::new(
            LengthUnit::Bohr,
            EnergyUnit::Hartree,
            Extensible::<ChargeUnit>::from_name("abC"),
            TemperatureUnit::K,
            TimeUnit::Unused,
        );
        assert!(convert_unit(&from, &to, UnitExponents::new(1.0, 1.0, 0.0, 0.0, 0.0)).is_ok());
    }

    #[test]
    fn unused_or_unknown_dimension_fails_with_nonzero_exponent() {
        let mut from = metal();
        from.time = TimeUnit::Unused.into();
        let err = convert_unit(&from, &metal(), UnitExponents::new(0.0, 0.0, 0.0, 0.0, 1.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        let mut to = metal();
        to.charge = Extensible::from_name("franklin");
        let err = convert_unit(&metal(), &to, UnitExponents::new(0.0, 0.0, 1.0, 0.0, 0.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn model_units_require_concrete_length_and_energy() {
        assert!(UnitSystem::model(
            LengthUnit::A,
            EnergyUnit::EV,
            ChargeUnit::Unused,
            TemperatureUnit::Unused,
            TimeUnit::Unused,
        )
        .is_ok());
        assert!(UnitSystem::model(
            LengthUnit::Unused,
            EnergyUnit::EV,
            ChargeUnit::E,
            TemperatureUnit::K,
            TimeUnit::Ps,
        )
        .is_err());
        assert!(UnitSystem::model(
            LengthUnit::A,
            EnergyUnit::EV,
            ChargeUnit::E,
            Extensible::<TemperatureUnit>::from_name("F"),
            TimeUnit::Ps,
        )
        .is_err());
    }
}
