//! Purpose: Extensible enumerations: closed sets of known names plus an escape hatch.
//! Exports: `KnownValue`, `Extensible`, and the `known_values!` definition macro.
//! Role: Value type behind every string-named tag in the crate (units, item types, ...).
//! Invariants: The known-value table is a `const` slice; no runtime initialisation exists.
//! Invariants: An unknown value never compares equal to anything, itself included.
//! Invariants: The `Ord` on known tags is a map-key order only; it carries no meaning.

use std::fmt;
use std::hash::Hash;

use crate::core::error::{Error, ErrorKind};

/// A closed set of the values this crate recognises for one enumeration.
pub trait KnownValue: Copy + Eq + Ord + Hash + fmt::Debug + 'static {
    /// Name of the enumeration family, used in diagnostics.
    const KIND: &'static str;
    /// Every known value, in discovery order.
    const ALL: &'static [Self];

    fn name(self) -> &'static str;
}

/// Either a known tag or a name that was not recognised at construction.
///
/// Two unknown values built from the same spelling are not guaranteed to be
/// equal; this implementation treats every unknown value as unequal to all
/// others, which is why the type implements `PartialEq` but not `Eq`.
#[derive(Clone, Debug)]
pub enum Extensible<T: KnownValue> {
    Known(T),
    Unknown(String),
}

impl<T: KnownValue> Extensible<T> {
    pub fn from_name(name: &str) -> Self {
        T::ALL
            .iter()
            .copied()
            .find(|value| value.name() == name)
            .map(Self::Known)
            .unwrap_or_else(|| Self::Unknown(name.to_string()))
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn known(&self) -> Option<T> {
        match self {
            Self::Known(value) => Some(*value),
            Self::Unknown(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Known(value) => value.name(),
            Self::Unknown(_) => "unknown",
        }
    }

    /// Spelling that produced an unknown value.
    pub fn unknown_spelling(&self) -> Option<&str> {
        match self {
            Self::Known(_) => None,
            Self::Unknown(spelling) => Some(spelling),
        }
    }

    pub fn count() -> usize {
        T::ALL.len()
    }

    pub fn by_index(index: usize) -> Result<Self, Error> {
        T::ALL.get(index).copied().map(Self::Known).ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!(
                "{} index {index} out of range 0..{}",
                T::KIND,
                T::ALL.len()
            ))
        })
    }

    /// Resolve to the known tag or fail with `Usage`, naming the enumeration.
    pub(crate) fn require_known(&self) -> Result<T, Error> {
        self.known().ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!(
                "unknown {} '{}'",
                T::KIND,
                self.unknown_spelling().unwrap_or_default()
            ))
        })
    }
}

impl<T: KnownValue> PartialEq for Extensible<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Known(left), Self::Known(right)) => left == right,
            _ => false,
        }
    }
}

impl<T: KnownValue> PartialEq<T> for Extensible<T> {
    fn eq(&self, other: &T) -> bool {
        self.known() == Some(*other)
    }
}

impl<T: KnownValue> From<T> for Extensible<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T: KnownValue> fmt::Display for Extensible<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Define a closed enum and its `KnownValue` table from `Variant => "spelling"` pairs.
macro_rules! known_values {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $spelling:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $crate::core::enumeration::KnownValue for $name {
            const KIND: &'static str = $kind;
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $spelling),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::core::enumeration::KnownValue::name(*self))
            }
        }
    };
}

pub(crate) use known_values;

#[cfg(test)]
mod tests {
    use super::{Extensible, KnownValue, known_values};
    use crate::core::error::ErrorKind;

    known_values! {
        enum Flavor: "Flavor" {
            Sweet => "sweet",
            Sour => "sour",
        }
    }

    #[test]
    fn known_names_round_trip_through_the_table() {
        for (index, flavor) in Flavor::ALL.iter().enumerate() {
            let value = Extensible::<Flavor>::from_name(flavor.name());
            assert!(value.is_known());
            assert_eq!(value, Extensible::by_index(index).unwrap());
        }
        assert_eq!(Extensible::<Flavor>::count(), 2);
    }

    #[test]
    fn unknown_values_are_never_equal() {
        let bitter = Extensible::<Flavor>::from_name("bitter");
        assert!(!bitter.is_known());
        assert_eq!(bitter.name(), "unknown");
        assert_eq!(bitter.unknown_spelling(), Some("bitter"));
        assert_ne!(bitter, bitter.clone());
        assert_ne!(bitter, Extensible::from(Flavor::Sweet));
    }

    #[test]
    fn out_of_range_index_is_usage_error() {
        let err = Extensible::<Flavor>::by_index(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(
            Extensible::<Flavor>::from_name("sour").require_known().unwrap(),
            Flavor::Sour
        );
        assert!(Extensible::<Flavor>::from_name("salty").require_known().is_err());
    }
}
