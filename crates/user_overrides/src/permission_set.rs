//! Ordered collection of unique permissions.

use std::fmt;
use std::str::FromStr;

use crate::error::OverrideError;
use crate::permission::{Permission, NEGATION_MARKER, SEPARATOR};

/// Insertion-ordered set of [`Permission`]s, unique by name.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    entries: Vec<Permission>,
}

/// Two sets are equal when they hold the same entries, in the same order,
/// with the same negation flags.
impl PartialEq for PermissionSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.name() == b.name() && a.is_negated() == b.is_negated())
    }
}

impl Eq for PermissionSet {}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every raw permission, collapsing duplicates by name.
    pub fn parse_all<'a, I>(raw: I) -> Result<Self, OverrideError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = Self::new();
        for permission in raw {
            set.add(Permission::parse(permission)?);
        }
        Ok(set)
    }

    /// Appends `permission` unless an entry with the same name exists.
    pub fn add(&mut self, permission: Permission) {
        if !self.entries.iter().any(|p| p.name() == permission.name()) {
            self.entries.push(permission);
        }
    }

    /// Removes the entry named `name`, whether it is granted or negated.
    ///
    /// A leading `!` on `name` is ignored. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.strip_prefix(NEGATION_MARKER).unwrap_or(name);
        let before = self.entries.len();
        self.entries.retain(|p| p.name() != name);
        self.entries.len() != before
    }

    /// Whether an entry named `name` exists.
    ///
    /// A blank name is always satisfied.
    pub fn contains(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            return true;
        }
        self.entries.iter().any(|p| p.name() == name)
    }

    /// Whether an entry named `name` exists and is negated.
    pub fn is_negated(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|p| p.name() == name && p.is_negated())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Human-readable listing, e.g. `build, !warp`.
    pub fn to_list_string(&self) -> String {
        self.entries
            .iter()
            .map(Permission::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Extend<Permission> for PermissionSet {
    fn extend<T: IntoIterator<Item = Permission>>(&mut self, iter: T) {
        for permission in iter {
            self.add(permission);
        }
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Storage form: comma separated, insertion order.
impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, permission) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{permission}")?;
        }
        Ok(())
    }
}

impl FromStr for PermissionSet {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_all(s.split(SEPARATOR).map(str::trim).filter(|token| !token.is_empty()))
    }
}
