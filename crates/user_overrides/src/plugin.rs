//! Host-facing entry point.
//!
//! The host constructs one [`UserOverridesPlugin`] at startup and forwards its
//! login, logout, account, chat, permission and command events to it.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{info, instrument};

use crate::commands::{CommandHandler, CommandSender, Reply};
use crate::config::OverridesConfig;
use crate::directory::{UserAccount, UserDirectory};
use crate::error::OverrideResult;
use crate::record::{OverrideRecord, UserId};
use crate::resolution::{resolve_display, resolve_permission, DisplayDefaults, PermissionDecision, ResolvedDisplay};
use crate::session::SessionId;
use crate::storage::OverrideStorage;
use crate::store::OverrideStore;

pub struct UserOverridesPlugin {
    config: Arc<RwLock<OverridesConfig>>,
    store: Arc<OverrideStore>,
    directory: Arc<dyn UserDirectory>,
    commands: CommandHandler,
}

impl UserOverridesPlugin {
    /// Loads the config, prepares the tables and fills the store.
    #[instrument(skip(storage, directory))]
    pub async fn initialize(
        config_path: PathBuf,
        storage: Arc<dyn OverrideStorage>,
        directory: Arc<dyn UserDirectory>,
    ) -> OverrideResult<Self> {
        let config = Arc::new(RwLock::new(OverridesConfig::read_or_create(&config_path).await?));

        storage.ensure_schema().await?;
        let store = Arc::new(OverrideStore::new(storage));
        let loaded = store.load().await?;

        let commands = CommandHandler::new(store.clone(), directory.clone(), config.clone(), config_path);
        info!("🔌 User overrides initialized with {} records", loaded);

        Ok(Self {
            config,
            store,
            directory,
            commands,
        })
    }

    pub fn config(&self) -> OverridesConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn store(&self) -> &Arc<OverrideStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    pub async fn on_player_login(&self, session: SessionId, account: &UserAccount) -> Option<Arc<OverrideRecord>> {
        self.store.login(session, account.id).await
    }

    pub fn on_player_logout(&self, session: SessionId) -> bool {
        self.store.logout(session)
    }

    /// Drops the overrides of an account the host deleted.
    pub async fn on_account_deleted(&self, user_id: UserId) -> OverrideResult<bool> {
        self.store.remove(user_id).await
    }

    pub fn check_permission(&self, session: SessionId, permission: &str) -> PermissionDecision {
        resolve_permission(self.store.session_record(session).as_deref(), permission)
    }

    pub fn display_for(&self, session: SessionId, defaults: &DisplayDefaults) -> ResolvedDisplay {
        resolve_display(self.store.session_record(session).as_deref(), defaults)
    }

    /// The chat line `name` sends, decorated with the session's display values.
    pub fn format_chat(&self, session: SessionId, defaults: &DisplayDefaults, name: &str, message: &str) -> String {
        self.display_for(session, defaults).format_line(name, message)
    }

    pub async fn handle_command(&self, sender: &dyn CommandSender, command: &str, args: &[String]) -> Vec<Reply> {
        self.commands.handle(sender, command, args).await
    }

    pub async fn reload_config(&self) -> OverrideResult<usize> {
        self.commands.reload().await
    }

    /// Wraps a host sender so its permission checks consult the session's overrides first.
    pub fn sender_for<'a>(&'a self, session: SessionId, host: &'a dyn CommandSender) -> OverriddenSender<'a> {
        OverriddenSender {
            plugin: self,
            session,
            host,
        }
    }
}

/// A [`CommandSender`] whose permissions are resolved through the overrides.
pub struct OverriddenSender<'a> {
    plugin: &'a UserOverridesPlugin,
    session: SessionId,
    host: &'a dyn CommandSender,
}

impl CommandSender for OverriddenSender<'_> {
    fn account(&self) -> Option<&UserAccount> {
        self.host.account()
    }

    fn has_permission(&self, permission: &str) -> bool {
        match self.plugin.check_permission(self.session, permission) {
            PermissionDecision::Granted => true,
            PermissionDecision::Denied => false,
            PermissionDecision::Unhandled => self.host.has_permission(permission),
        }
    }

    fn is_console(&self) -> bool {
        self.host.is_console()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use crate::record::ChatColor;
    use crate::storage::SqliteOverrideStorage;
    use tempfile::TempDir;

    struct Host {
        account: UserAccount,
        permissions: Vec<&'static str>,
    }

    impl CommandSender for Host {
        fn account(&self) -> Option<&UserAccount> {
            Some(&self.account)
        }

        fn has_permission(&self, permission: &str) -> bool {
            self.permissions.iter().any(|granted| *granted == permission)
        }
    }

    fn alice() -> UserAccount {
        UserAccount {
            id: UserId::new(1).unwrap(),
            name: "Alice".to_string(),
        }
    }

    async fn plugin(dir: &TempDir) -> UserOverridesPlugin {
        let storage = SqliteOverrideStorage::in_memory().await.unwrap();
        let directory = InMemoryUserDirectory::with_accounts(vec![alice()]);
        UserOverridesPlugin::initialize(dir.path().join("overrides.json"), Arc::new(storage), Arc::new(directory))
            .await
            .unwrap()
    }

    fn args(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_initialize_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin(&dir).await;
        assert!(dir.path().join("overrides.json").exists());
        assert_eq!(plugin.config(), OverridesConfig::default());
        assert!(plugin.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_session_sees_command_changes() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin(&dir).await;
        let session = SessionId(0);
        let host = Host {
            account: alice(),
            permissions: vec!["us.permission"],
        };

        assert!(plugin.on_player_login(session, &alice()).await.is_none());
        let defaults = DisplayDefaults::default();
        assert_eq!(plugin.format_chat(session, &defaults, "Alice", "hi"), "Alice: hi");

        plugin.handle_command(&host, "us", &args("prefix Alice [A]")).await;
        plugin.handle_command(&host, "us", &args("color Alice 10,20,30")).await;
        assert_eq!(plugin.format_chat(session, &defaults, "Alice", "hi"), "[A]Alice: hi");
        assert_eq!(plugin.display_for(session, &defaults).color, ChatColor::new(10, 20, 30));

        plugin.handle_command(&host, "permission", &args("add Alice tp !kick")).await;
        assert_eq!(plugin.check_permission(session, "tp"), PermissionDecision::Granted);
        assert_eq!(plugin.check_permission(session, "kick"), PermissionDecision::Denied);
        assert_eq!(plugin.check_permission(session, "ban"), PermissionDecision::Unhandled);

        assert!(plugin.on_player_logout(session));
        assert_eq!(plugin.check_permission(session, "tp"), PermissionDecision::Unhandled);
    }

    #[tokio::test]
    async fn test_overridden_sender_consults_overrides_first() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin(&dir).await;
        let session = SessionId(3);
        let host = Host {
            account: alice(),
            permissions: vec!["us.permission", "kick"],
        };

        plugin.on_player_login(session, &alice()).await;
        plugin.handle_command(&host, "permission", &args("add Alice !kick us.purge")).await;

        let sender = plugin.sender_for(session, &host);
        assert!(!sender.has_permission("kick"));
        assert!(sender.has_permission("us.purge"));
        assert!(sender.has_permission("us.permission"));
        assert!(!sender.has_permission("ban"));
    }

    #[tokio::test]
    async fn test_account_deletion_drops_overrides() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin(&dir).await;
        let host = Host {
            account: alice(),
            permissions: vec![],
        };

        plugin.handle_command(&host, "us", &args("suffix Alice !")).await;
        assert!(plugin.on_account_deleted(alice().id).await.unwrap());
        assert!(plugin.store().get(alice().id).await.is_none());
        assert!(!plugin.on_account_deleted(alice().id).await.unwrap());
    }
}
