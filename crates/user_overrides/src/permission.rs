//! A single permission grant or denial.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::OverrideError;

/// Prefix marking a permission as an explicit denial.
pub const NEGATION_MARKER: char = '!';

/// Separates permissions in the stored form of a set.
pub const SEPARATOR: char = ',';

/// A named permission, optionally negated.
///
/// Equality and hashing look at the name only: `build` and `!build` are the
/// same entry as far as sets and removal are concerned.
#[derive(Debug, Clone, Eq)]
pub struct Permission {
    name: String,
    negated: bool,
}

impl Permission {
    /// Parses a raw permission such as `tshock.build` or `!tshock.build`.
    ///
    /// A single leading `!` marks the permission as negated. The remaining
    /// name must be non-blank and must not start with another `!`.
    pub fn parse(raw: &str) -> Result<Self, OverrideError> {
        match raw.strip_prefix(NEGATION_MARKER) {
            Some(rest) => Self::from_parts(rest, true),
            None => Self::from_parts(raw, false),
        }
    }

    /// Builds a permission from an already separated name and flag.
    pub fn from_parts(name: &str, negated: bool) -> Result<Self, OverrideError> {
        if name.trim().is_empty() {
            return Err(OverrideError::invalid("Permission names cannot be empty"));
        }
        if name.starts_with(NEGATION_MARKER) {
            return Err(OverrideError::invalid(format!(
                "Permission '{name}' is negated more than once"
            )));
        }
        // Both would be lost when a set is written out and read back.
        if name.contains(SEPARATOR) {
            return Err(OverrideError::invalid(format!(
                "Permission '{name}' cannot contain '{SEPARATOR}'"
            )));
        }
        if name.trim() != name {
            return Err(OverrideError::invalid(format!(
                "Permission '{name}' cannot start or end with whitespace"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            negated,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Hash for Permission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl FromStr for Permission {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{}{}", NEGATION_MARKER, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}
