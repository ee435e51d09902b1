//! Per-user override record and its value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OverrideError;
use crate::permission_set::PermissionSet;

/// Identifier of a user account owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(i32);

impl UserId {
    pub fn new(id: i32) -> Result<Self, OverrideError> {
        if id <= 0 {
            return Err(OverrideError::invalid(format!("Invalid user id: {id}")));
        }
        Ok(Self(id))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An RGB chat color, written `R,G,B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ChatColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: ChatColor = ChatColor::new(255, 255, 255);
}

impl FromStr for ChatColor {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OverrideError::invalid("Invalid color format! Expected R,G,B with values 0-255.");

        let components: Vec<&str> = s.split(',').collect();
        if components.len() != 3 {
            return Err(invalid());
        }

        let mut rgb = [0u8; 3];
        for (slot, component) in rgb.iter_mut().zip(&components) {
            *slot = component.trim().parse::<u8>().map_err(|_| invalid())?;
        }

        Ok(Self::new(rgb[0], rgb[1], rgb[2]))
    }
}

impl fmt::Display for ChatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

/// Optional chat display attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAttributes {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub color: Option<ChatColor>,
}

impl ChatAttributes {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.suffix.is_none() && self.color.is_none()
    }
}

/// One user's chat customisation and permission overrides.
///
/// The record holds values only; length limits, prohibited words and similar
/// policy are enforced by the command layer before a setter is called.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRecord {
    user_id: UserId,
    pub chat: ChatAttributes,
    pub permissions: PermissionSet,
}

/// Which part of a record an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatField {
    Prefix,
    Suffix,
    Color,
}

impl ChatField {
    pub fn name(self) -> &'static str {
        match self {
            ChatField::Prefix => "prefix",
            ChatField::Suffix => "suffix",
            ChatField::Color => "color",
        }
    }
}

impl OverrideRecord {
    pub fn new(user_id: UserId, chat: ChatAttributes) -> Self {
        Self::with_permissions(user_id, chat, PermissionSet::new())
    }

    pub fn with_permissions(user_id: UserId, chat: ChatAttributes, permissions: PermissionSet) -> Self {
        Self {
            user_id,
            chat,
            permissions,
        }
    }

    /// A record with nothing set.
    pub fn empty(user_id: UserId) -> Self {
        Self::new(user_id, ChatAttributes::default())
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn set_prefix(&mut self, prefix: Option<String>) {
        self.chat.prefix = prefix;
    }

    pub fn set_suffix(&mut self, suffix: Option<String>) {
        self.chat.suffix = suffix;
    }

    pub fn set_color(&mut self, color: Option<ChatColor>) {
        self.chat.color = color;
    }

    pub fn clear_field(&mut self, field: ChatField) {
        match field {
            ChatField::Prefix => self.set_prefix(None),
            ChatField::Suffix => self.set_suffix(None),
            ChatField::Color => self.set_color(None),
        }
    }

    /// Clears prefix, suffix and color. Permissions are kept.
    pub fn clear_display(&mut self) {
        self.chat = ChatAttributes::default();
    }

    /// Clears display attributes and permissions.
    pub fn clear_all(&mut self) {
        self.clear_display();
        self.permissions.clear();
    }

    /// True when the record carries no display attribute and no permission.
    pub fn is_empty(&self) -> bool {
        self.chat.is_empty() && self.permissions.is_empty()
    }
}
