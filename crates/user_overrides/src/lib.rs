//! User Overrides - per-user chat display and permission overrides
//!
//! Lets a server give individual users:
//! - A chat prefix, suffix and color that replace their group's values
//! - Extra permissions, or explicit denials (`!name`), checked before the
//!   host's own permission logic
//!
//! Records are kept in SQLite behind [`storage::OverrideStorage`] and cached in
//! an [`OverrideStore`]. Hosts drive everything through [`UserOverridesPlugin`].

pub mod commands;
pub mod config;
pub mod directory;
pub mod error;
pub mod permission;
pub mod permission_set;
pub mod plugin;
pub mod record;
pub mod resolution;
pub mod session;
pub mod storage;
pub mod store;

pub use commands::{CommandHandler, CommandSender, Reply, ReplyKind};
pub use config::OverridesConfig;
pub use directory::{InMemoryUserDirectory, SqliteUserDirectory, UserAccount, UserDirectory};
pub use error::{ConfigError, OverrideError, OverrideResult, StorageError};
pub use permission::Permission;
pub use permission_set::PermissionSet;
pub use plugin::UserOverridesPlugin;
pub use record::{ChatAttributes, ChatColor, ChatField, OverrideRecord, UserId};
pub use resolution::{DisplayDefaults, PermissionDecision, ResolvedDisplay};
pub use session::{SessionCache, SessionId};
pub use storage::{OverrideStorage, SqliteOverrideStorage};
pub use store::{Modification, OverrideStore};
