//! Effective display values and permission decisions for a user.

use serde::{Deserialize, Serialize};

use crate::record::{ChatColor, OverrideRecord};

/// Values a user falls back to when their record leaves a field unset,
/// normally taken from the user's group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDefaults {
    pub prefix: String,
    pub suffix: String,
    pub color: ChatColor,
}

impl Default for DisplayDefaults {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            color: ChatColor::WHITE,
        }
    }
}

/// The prefix, suffix and color a chat line is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDisplay {
    pub prefix: String,
    pub suffix: String,
    pub color: ChatColor,
}

impl ResolvedDisplay {
    /// Renders a chat line as `<prefix><name><suffix>: <message>`.
    pub fn format_line(&self, name: &str, message: &str) -> String {
        format!("{}{}{}: {}", self.prefix, name, self.suffix, message)
    }
}

/// Outcome of checking a permission against a user's overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Granted,
    Denied,
    /// The overrides have no opinion; the host decides.
    Unhandled,
}

/// Coalesces each field independently: the record's value when set, else the default.
pub fn resolve_display(record: Option<&OverrideRecord>, defaults: &DisplayDefaults) -> ResolvedDisplay {
    let chat = record.map(|record| &record.chat);

    ResolvedDisplay {
        prefix: chat
            .and_then(|chat| chat.prefix.clone())
            .unwrap_or_else(|| defaults.prefix.clone()),
        suffix: chat
            .and_then(|chat| chat.suffix.clone())
            .unwrap_or_else(|| defaults.suffix.clone()),
        color: chat.and_then(|chat| chat.color).unwrap_or(defaults.color),
    }
}

/// Decides `name` from the record's permission set.
///
/// Containment is checked before negation, so a blank name is always granted.
pub fn resolve_permission(record: Option<&OverrideRecord>, name: &str) -> PermissionDecision {
    let Some(record) = record else {
        return PermissionDecision::Unhandled;
    };

    if !record.permissions.contains(name) {
        PermissionDecision::Unhandled
    } else if record.permissions.is_negated(name) {
        PermissionDecision::Denied
    } else {
        PermissionDecision::Granted
    }
}
