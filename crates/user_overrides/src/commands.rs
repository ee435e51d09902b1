//! The `us` and `permission` chat commands.
//!
//! Every handler returns its result as a list of [`Reply`] lines; errors are
//! rendered here and never reach the host.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::config::OverridesConfig;
use crate::directory::{resolve_single, UserAccount, UserDirectory};
use crate::error::{OverrideError, OverrideResult};
use crate::permission_set::PermissionSet;
use crate::record::{ChatColor, ChatField, OverrideRecord};
use crate::store::OverrideStore;

/// Prefix the host puts in front of command names.
pub const COMMAND_SPECIFIER: &str = "/";

pub const PERMISSION_SET_OTHER: &str = "us.setother";
pub const PERMISSION_REMOVE_PREFIX: &str = "us.remove.prefix";
pub const PERMISSION_REMOVE_SUFFIX: &str = "us.remove.suffix";
pub const PERMISSION_REMOVE_COLOR: &str = "us.remove.color";
pub const PERMISSION_RESET_ALL: &str = "us.resetall";
pub const PERMISSION_PURGE: &str = "us.purge";
pub const PERMISSION_RELOAD: &str = "us.reload";
pub const PERMISSION_MANAGE_PERMISSIONS: &str = "us.permission";

const US_HELP: &[(&str, &str)] = &[
    ("prefix", "Sets the player's chat prefix"),
    ("suffix", "Sets the player's chat suffix"),
    ("color", "Sets the player's chat color"),
    ("remove", "Removes the player's (pre/suf)fix, chat color or all chat data"),
    ("read", "Outputs the player's chat information"),
    ("purge", "Removes all empty entries from the database"),
    ("reload", "Reloads the configuration and the override records"),
];

/// Whoever issued a command.
pub trait CommandSender: Send + Sync {
    /// The account the sender is logged in as, if any.
    fn account(&self) -> Option<&UserAccount>;

    fn has_permission(&self, permission: &str) -> bool;

    /// The server console acts without an account.
    fn is_console(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

impl Reply {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Error,
            text: text.into(),
        }
    }
}

fn syntax(usage: &str) -> OverrideError {
    OverrideError::invalid(format!("Invalid syntax! Proper syntax: {COMMAND_SPECIFIER}{usage}"))
}

fn require_permission(sender: &dyn CommandSender, permission: &str) -> OverrideResult<()> {
    if sender.is_console() || sender.has_permission(permission) {
        Ok(())
    } else {
        Err(OverrideError::denied("You do not have access to this command."))
    }
}

fn require_login(sender: &dyn CommandSender) -> OverrideResult<()> {
    if sender.is_console() || sender.account().is_some() {
        Ok(())
    } else {
        Err(OverrideError::denied("You must be logged in to do that."))
    }
}

/// Targeting another user's data needs `us.setother`.
fn require_target(sender: &dyn CommandSender, target: &UserAccount, denial: &str) -> OverrideResult<()> {
    let is_self = sender.account().is_some_and(|account| account.id == target.id);
    if is_self || sender.is_console() || sender.has_permission(PERMISSION_SET_OTHER) {
        Ok(())
    } else {
        Err(OverrideError::denied(denial))
    }
}

fn chat_modified(target: &UserAccount) -> Vec<Reply> {
    vec![Reply::success(format!("Modified {}'s chat data successfully.", target.name))]
}

fn permissions_modified(target: &UserAccount) -> Vec<Reply> {
    vec![Reply::success(format!("Modified {}'s permissions successfully.", target.name))]
}

pub struct CommandHandler {
    store: Arc<OverrideStore>,
    directory: Arc<dyn UserDirectory>,
    config: Arc<RwLock<OverridesConfig>>,
    config_path: PathBuf,
}

impl CommandHandler {
    pub fn new(
        store: Arc<OverrideStore>,
        directory: Arc<dyn UserDirectory>,
        config: Arc<RwLock<OverridesConfig>>,
        config_path: PathBuf,
    ) -> Self {
        Self {
            store,
            directory,
            config,
            config_path,
        }
    }

    fn config(&self) -> OverridesConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-reads the config file and reloads every record from storage.
    pub async fn reload(&self) -> OverrideResult<usize> {
        let config = OverridesConfig::read_or_create(&self.config_path).await?;
        match self.config.write() {
            Ok(mut current) => *current = config,
            Err(poisoned) => *poisoned.into_inner() = config,
        }
        let loaded = self.store.load().await?;
        info!("🔄 Reloaded configuration from {}", self.config_path.display());
        Ok(loaded)
    }

    /// Runs `command` with `args`. Unknown commands produce an error reply.
    pub async fn handle(&self, sender: &dyn CommandSender, command: &str, args: &[String]) -> Vec<Reply> {
        debug!("Handling command '{}' with {} arguments", command, args.len());

        let result = match command.to_lowercase().as_str() {
            "us" => self.handle_us(sender, args).await,
            "permission" => self.handle_permission(sender, args).await,
            _ => Err(OverrideError::invalid("Invalid command.")),
        };

        result.unwrap_or_else(|e| {
            if matches!(e, OverrideError::StorageFailure(_)) {
                warn!("Command '{}' failed: {}", command, e);
            }
            vec![Reply::error(e.to_string())]
        })
    }

    async fn handle_us(&self, sender: &dyn CommandSender, args: &[String]) -> OverrideResult<Vec<Reply>> {
        let Some(sub_command) = args.first() else {
            return Ok(Self::us_help(None));
        };

        match sub_command.to_lowercase().as_str() {
            "help" => Ok(Self::us_help(args.get(1).map(String::as_str))),
            "prefix" => self.set_text(sender, args, ChatField::Prefix).await,
            "suffix" => self.set_text(sender, args, ChatField::Suffix).await,
            "color" | "colour" => self.set_color(sender, args).await,
            "remove" => self.remove_chat_data(sender, args).await,
            "read" => self.read(args).await,
            "purge" => self.purge(sender).await,
            "reload" => {
                require_permission(sender, PERMISSION_RELOAD)?;
                let loaded = self.reload().await?;
                Ok(vec![Reply::success(format!(
                    "Reloaded the configuration and {loaded} override records."
                ))])
            }
            _ => Err(OverrideError::invalid(format!(
                "Invalid sub-command! Type {COMMAND_SPECIFIER}us help for a list of sub-commands."
            ))),
        }
    }

    fn us_help(topic: Option<&str>) -> Vec<Reply> {
        match topic {
            None => std::iter::once(Reply::success("UserSpecificFunctions Help"))
                .chain(
                    US_HELP
                        .iter()
                        .map(|(name, description)| Reply::info(format!("{name} - {description}"))),
                )
                .chain(std::iter::once(Reply::info(format!(
                    "Type {COMMAND_SPECIFIER}us help <sub-command> for more."
                ))))
                .collect(),
            Some(topic) => match US_HELP.iter().find(|(name, _)| name.eq_ignore_ascii_case(topic)) {
                Some((name, description)) => vec![
                    Reply::info(format!("Sub-command: {name}")),
                    Reply::info(format!("Help: {description}")),
                ],
                None => vec![Reply::error("Invalid command name provided.")],
            },
        }
    }

    async fn set_text(
        &self,
        sender: &dyn CommandSender,
        args: &[String],
        field: ChatField,
    ) -> OverrideResult<Vec<Reply>> {
        require_login(sender)?;
        let name = field.name();
        if args.len() < 3 {
            return Err(syntax(&format!("us {name} <player name> <{name}>")));
        }

        let target = resolve_single(self.directory.as_ref(), &args[1]).await?;
        require_target(
            sender,
            &target,
            &format!("You do not have permission to change this player's chat {name}."),
        )?;

        let text = args[2..].join(" ");
        let config = self.config();
        let maximum = match field {
            ChatField::Suffix => config.maximum_suffix_length,
            _ => config.maximum_prefix_length,
        };
        if text.chars().count() > maximum {
            return Err(OverrideError::invalid(format!(
                "Your {name} cannot be longer than {maximum} characters."
            )));
        }

        let prohibited = config.prohibited_words_in(&text);
        if !prohibited.is_empty() {
            return Err(OverrideError::invalid(format!(
                "Your chat {name} cannot contain the following word(s): {}",
                prohibited.join(", ")
            )));
        }

        self.store
            .modify(target.id, move |record| match field {
                ChatField::Suffix => record.set_suffix(Some(text)),
                _ => record.set_prefix(Some(text)),
            })
            .await?;
        Ok(chat_modified(&target))
    }

    async fn set_color(&self, sender: &dyn CommandSender, args: &[String]) -> OverrideResult<Vec<Reply>> {
        require_login(sender)?;
        if args.len() != 3 {
            return Err(syntax("us color <player name> <R,G,B>"));
        }

        let target = resolve_single(self.directory.as_ref(), &args[1]).await?;
        require_target(
            sender,
            &target,
            "You do not have permission to change this player's chat color.",
        )?;

        let color: ChatColor = args[2].parse()?;
        self.store
            .modify(target.id, |record| record.set_color(Some(color)))
            .await?;
        Ok(chat_modified(&target))
    }

    async fn remove_chat_data(&self, sender: &dyn CommandSender, args: &[String]) -> OverrideResult<Vec<Reply>> {
        require_login(sender)?;
        if args.len() != 3 {
            return Err(syntax("us remove <player name> <prefix/suffix/color/all>"));
        }

        let target = resolve_single(self.directory.as_ref(), &args[1]).await?;
        require_target(sender, &target, "You can't modify this player's chat data.")?;

        let field = match args[2].to_lowercase().as_str() {
            "prefix" => Some(ChatField::Prefix),
            "suffix" => Some(ChatField::Suffix),
            "color" | "colour" => Some(ChatField::Color),
            "all" => None,
            _ => return Err(syntax("us remove <player name> <prefix/suffix/color/all>")),
        };

        require_permission(
            sender,
            match field {
                Some(ChatField::Prefix) => PERMISSION_REMOVE_PREFIX,
                Some(ChatField::Suffix) => PERMISSION_REMOVE_SUFFIX,
                Some(ChatField::Color) => PERMISSION_REMOVE_COLOR,
                None => PERMISSION_RESET_ALL,
            },
        )?;

        if self.store.get(target.id).await.is_none() {
            return Err(OverrideError::not_found("This user has no custom chat data."));
        }

        self.store
            .modify(target.id, |record| match field {
                Some(field) => record.clear_field(field),
                None => record.clear_display(),
            })
            .await?;
        Ok(chat_modified(&target))
    }

    async fn read(&self, args: &[String]) -> OverrideResult<Vec<Reply>> {
        if args.len() != 2 {
            return Err(syntax("us read <player name>"));
        }

        let target = resolve_single(self.directory.as_ref(), &args[1]).await?;
        let record = self
            .store
            .get(target.id)
            .await
            .ok_or_else(|| OverrideError::not_found("This user has no player specific information to read."))?;

        let chat = &record.chat;
        Ok(vec![
            Reply::info(format!("Username: {}", target.name)),
            Reply::info(format!("  * Prefix: {}", chat.prefix.as_deref().unwrap_or("None"))),
            Reply::info(format!("  * Suffix: {}", chat.suffix.as_deref().unwrap_or("None"))),
            Reply::info(format!(
                "  * Chat color: {}",
                chat.color.map_or_else(|| "None".to_string(), |color| color.to_string())
            )),
        ])
    }

    async fn purge(&self, sender: &dyn CommandSender) -> OverrideResult<Vec<Reply>> {
        require_permission(sender, PERMISSION_PURGE)?;
        let purged = self.store.purge_empty().await?;
        Ok(vec![Reply::success(format!(
            "Removed {purged} empty entries from the database."
        ))])
    }

    async fn handle_permission(&self, sender: &dyn CommandSender, args: &[String]) -> OverrideResult<Vec<Reply>> {
        let Some(sub_command) = args.first() else {
            return Ok(vec![
                Reply::error("Invalid syntax! Proper syntax:"),
                Reply::error(format!("{COMMAND_SPECIFIER}permission add <player name> <permissions>")),
                Reply::error(format!("{COMMAND_SPECIFIER}permission delete <player name> <permissions>")),
                Reply::error(format!("{COMMAND_SPECIFIER}permission list <player name> [page]")),
            ]);
        };

        require_permission(sender, PERMISSION_MANAGE_PERMISSIONS)?;

        match sub_command.to_lowercase().as_str() {
            "add" => self.add_permissions(sender, args).await,
            "remove" | "rem" | "del" | "delete" => self.remove_permissions(sender, args).await,
            "list" => self.list_permissions(args).await,
            _ => Err(syntax("permission <add/remove/list> <player name> [permissions]")),
        }
    }

    async fn add_permissions(&self, sender: &dyn CommandSender, args: &[String]) -> OverrideResult<Vec<Reply>> {
        require_login(sender)?;
        if args.len() < 3 {
            return Err(syntax("permission add <player name> <permissions>"));
        }

        let target = resolve_single(self.directory.as_ref(), &args[1]).await?;
        require_target(sender, &target, "You can't modify this player's permissions.")?;

        let added = PermissionSet::parse_all(args[2..].iter().map(String::as_str))?;
        self.store
            .modify(target.id, |record| record.permissions.extend(added.iter().cloned()))
            .await?;
        Ok(permissions_modified(&target))
    }

    async fn remove_permissions(&self, sender: &dyn CommandSender, args: &[String]) -> OverrideResult<Vec<Reply>> {
        require_login(sender)?;
        if args.len() < 3 {
            return Err(syntax("permission remove <player name> <permissions>"));
        }

        let target = resolve_single(self.directory.as_ref(), &args[1]).await?;
        require_target(sender, &target, "You can't modify this player's permissions.")?;

        if self.store.get(target.id).await.is_none() {
            return Err(OverrideError::not_found("This user has no custom permissions."));
        }

        let removed = &args[2..];
        self.store
            .modify(target.id, |record| {
                for permission in removed {
                    record.permissions.remove(permission);
                }
            })
            .await?;
        Ok(permissions_modified(&target))
    }

    async fn list_permissions(&self, args: &[String]) -> OverrideResult<Vec<Reply>> {
        // The page argument is accepted but everything fits on one page.
        if !(2..=3).contains(&args.len()) {
            return Err(syntax("permission list <player name> [page]"));
        }

        let target = resolve_single(self.directory.as_ref(), &args[1]).await?;
        let permissions = self
            .store
            .get(target.id)
            .await
            .map(|record: OverrideRecord| record.permissions)
            .filter(|permissions| !permissions.is_empty())
            .ok_or_else(|| OverrideError::not_found("This user has no permissions to list."))?;

        Ok(vec![
            Reply::success(format!("{}'s permissions:", target.name)),
            Reply::info(permissions.to_list_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryUserDirectory;
    use crate::record::UserId;
    use crate::storage::{OverrideStorage, SqliteOverrideStorage};
    use std::collections::HashSet;
    use tempfile::TempDir;

    struct TestSender {
        account: Option<UserAccount>,
        permissions: HashSet<String>,
    }

    impl TestSender {
        fn player(id: i32, name: &str, permissions: &[&str]) -> Self {
            Self {
                account: Some(account(id, name)),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            }
        }

        fn guest() -> Self {
            Self {
                account: None,
                permissions: HashSet::new(),
            }
        }
    }

    impl CommandSender for TestSender {
        fn account(&self) -> Option<&UserAccount> {
            self.account.as_ref()
        }

        fn has_permission(&self, permission: &str) -> bool {
            self.permissions.contains(permission)
        }
    }

    fn account(id: i32, name: &str) -> UserAccount {
        UserAccount {
            id: UserId::new(id).unwrap(),
            name: name.to_string(),
        }
    }

    fn args(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    struct Fixture {
        handler: CommandHandler,
        store: Arc<OverrideStore>,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let storage = SqliteOverrideStorage::in_memory().await.unwrap();
        storage.ensure_schema().await.unwrap();
        let store = Arc::new(OverrideStore::new(Arc::new(storage)));

        let directory = Arc::new(InMemoryUserDirectory::with_accounts(vec![
            account(1, "Alice"),
            account(2, "Bob"),
            account(3, "bob"),
            account(4, "Carol"),
        ]));

        let dir = TempDir::new().unwrap();
        let handler = CommandHandler::new(
            store.clone(),
            directory,
            Arc::new(RwLock::new(OverridesConfig::default())),
            dir.path().join("config.json"),
        );

        Fixture {
            handler,
            store,
            _dir: dir,
        }
    }

    fn uid(id: i32) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_set_own_prefix() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);

        let replies = f.handler.handle(&alice, "us", &args("prefix Alice [VIP] A")).await;
        assert_eq!(replies, vec![Reply::success("Modified Alice's chat data successfully.")]);
        assert_eq!(f.store.get(uid(1)).await.unwrap().chat.prefix.as_deref(), Some("[VIP] A"));
    }

    #[tokio::test]
    async fn test_other_target_needs_set_other() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);

        let replies = f.handler.handle(&alice, "us", &args("suffix Carol !")).await;
        assert_eq!(replies[0].kind, ReplyKind::Error);
        assert!(f.store.get(uid(4)).await.is_none());

        let admin = TestSender::player(1, "Alice", &[PERMISSION_SET_OTHER]);
        let replies = f.handler.handle(&admin, "us", &args("suffix Carol !")).await;
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert_eq!(f.store.get(uid(4)).await.unwrap().chat.suffix.as_deref(), Some("!"));
    }

    #[tokio::test]
    async fn test_guest_must_log_in() {
        let f = fixture().await;
        let replies = f.handler.handle(&TestSender::guest(), "us", &args("prefix Alice x")).await;
        assert_eq!(replies, vec![Reply::error("You must be logged in to do that.")]);
    }

    #[tokio::test]
    async fn test_prefix_limits() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);

        let replies = f.handler.handle(&alice, "us", &args("prefix Alice ABCDEFGHIJK")).await;
        assert_eq!(
            replies,
            vec![Reply::error("Your prefix cannot be longer than 10 characters.")]
        );

        let replies = f.handler.handle(&alice, "us", &args("prefix Alice fUcKsHiT")).await;
        assert_eq!(
            replies,
            vec![Reply::error("Your chat prefix cannot contain the following word(s): Shit, Fuck")]
        );
        assert!(f.store.get(uid(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_color_is_rejected_before_mutation() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);
        f.handler.handle(&alice, "us", &args("prefix Alice A")).await;

        let replies = f.handler.handle(&alice, "us", &args("color Alice 999,0,0")).await;
        assert_eq!(replies[0].kind, ReplyKind::Error);
        assert_eq!(f.store.get(uid(1)).await.unwrap().chat.color, None);

        let replies = f.handler.handle(&alice, "us", &args("colour Alice 0,128,255")).await;
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert_eq!(f.store.get(uid(1)).await.unwrap().chat.color, Some(ChatColor::new(0, 128, 255)));
    }

    #[tokio::test]
    async fn test_ambiguous_target_lists_matches() {
        let f = fixture().await;
        let admin = TestSender::player(1, "Alice", &[PERMISSION_SET_OTHER]);

        let replies = f.handler.handle(&admin, "us", &args("prefix Bob X")).await;
        assert_eq!(replies, vec![Reply::error("More than one user matched: Bob, bob")]);
    }

    #[tokio::test]
    async fn test_remove_requires_field_permission() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);
        f.handler.handle(&alice, "us", &args("prefix Alice A")).await;

        let replies = f.handler.handle(&alice, "us", &args("remove Alice prefix")).await;
        assert_eq!(replies, vec![Reply::error("You do not have access to this command.")]);

        let alice = TestSender::player(1, "Alice", &[PERMISSION_REMOVE_PREFIX]);
        let replies = f.handler.handle(&alice, "us", &args("remove Alice prefix")).await;
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert!(f.store.get(uid(1)).await.is_none());

        let replies = f.handler.handle(&alice, "us", &args("remove Alice prefix")).await;
        assert_eq!(replies, vec![Reply::error("This user has no custom chat data.")]);
    }

    #[tokio::test]
    async fn test_remove_all_keeps_permissions() {
        let f = fixture().await;
        let admin = TestSender::player(
            1,
            "Alice",
            &[PERMISSION_RESET_ALL, PERMISSION_MANAGE_PERMISSIONS],
        );
        f.handler.handle(&admin, "us", &args("prefix Alice A")).await;
        f.handler.handle(&admin, "permission", &args("add Alice warp")).await;

        let replies = f.handler.handle(&admin, "us", &args("remove Alice all")).await;
        assert_eq!(replies[0].kind, ReplyKind::Success);

        let record = f.store.get(uid(1)).await.unwrap();
        assert!(record.chat.is_empty());
        assert!(record.permissions.contains("warp"));
    }

    #[tokio::test]
    async fn test_read_output() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);

        let replies = f.handler.handle(&alice, "us", &args("read Alice")).await;
        assert_eq!(
            replies,
            vec![Reply::error("This user has no player specific information to read.")]
        );

        f.handler.handle(&alice, "us", &args("color Alice 1,2,3")).await;
        let replies = f.handler.handle(&alice, "us", &args("read alice")).await;
        let lines: Vec<_> = replies.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            lines,
            vec!["Username: Alice", "  * Prefix: None", "  * Suffix: None", "  * Chat color: 1,2,3"]
        );
    }

    #[tokio::test]
    async fn test_permission_commands() {
        let f = fixture().await;
        let admin = TestSender::player(1, "Alice", &[PERMISSION_MANAGE_PERMISSIONS, PERMISSION_SET_OTHER]);

        let replies = f.handler.handle(&admin, "permission", &args("add Carol build !warp")).await;
        assert_eq!(replies, vec![Reply::success("Modified Carol's permissions successfully.")]);

        let replies = f.handler.handle(&admin, "permission", &args("list Carol")).await;
        assert_eq!(
            replies,
            vec![Reply::success("Carol's permissions:"), Reply::info("build, !warp")]
        );

        let replies = f.handler.handle(&admin, "permission", &args("del Carol !build warp")).await;
        assert_eq!(replies[0].kind, ReplyKind::Success);
        assert!(f.store.get(uid(4)).await.is_none());

        let replies = f.handler.handle(&admin, "permission", &args("list Carol")).await;
        assert_eq!(replies, vec![Reply::error("This user has no permissions to list.")]);
    }

    #[tokio::test]
    async fn test_permission_commands_need_permission() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);

        let replies = f.handler.handle(&alice, "permission", &args("add Alice build")).await;
        assert_eq!(replies, vec![Reply::error("You do not have access to this command.")]);

        let admin = TestSender::player(1, "Alice", &[PERMISSION_MANAGE_PERMISSIONS]);
        let replies = f.handler.handle(&admin, "permission", &args("add Alice !!build")).await;
        assert_eq!(replies[0].kind, ReplyKind::Error);
        assert!(f.store.get(uid(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_list_accepts_a_page() {
        let f = fixture().await;
        let admin = TestSender::player(1, "Alice", &[PERMISSION_MANAGE_PERMISSIONS, PERMISSION_SET_OTHER]);
        f.handler.handle(&admin, "permission", &args("add Carol build")).await;

        let replies = f.handler.handle(&admin, "permission", &args("list Carol 2")).await;
        assert_eq!(replies, vec![Reply::success("Carol's permissions:"), Reply::info("build")]);

        let replies = f.handler.handle(&admin, "permission", &args("list Carol 2 extra")).await;
        assert_eq!(replies[0].kind, ReplyKind::Error);
    }

    #[tokio::test]
    async fn test_add_rejects_names_with_separator() {
        let f = fixture().await;
        let admin = TestSender::player(1, "Alice", &[PERMISSION_MANAGE_PERMISSIONS]);

        let replies = f.handler.handle(&admin, "permission", &args("add Alice a,b")).await;
        assert_eq!(replies[0].kind, ReplyKind::Error);
        assert!(f.store.get(uid(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_help_and_unknown_commands() {
        let f = fixture().await;
        let alice = TestSender::player(1, "Alice", &[]);

        let replies = f.handler.handle(&alice, "us", &[]).await;
        assert_eq!(replies.len(), US_HELP.len() + 2);

        let replies = f.handler.handle(&alice, "us", &args("help read")).await;
        assert_eq!(replies[1], Reply::info("Help: Outputs the player's chat information"));

        let replies = f.handler.handle(&alice, "us", &args("dance")).await;
        assert_eq!(replies[0].kind, ReplyKind::Error);

        let replies = f.handler.handle(&alice, "nope", &[]).await;
        assert_eq!(replies, vec![Reply::error("Invalid command.")]);
    }

    #[tokio::test]
    async fn test_reload_reads_config_file() {
        let f = fixture().await;
        let admin = TestSender::player(1, "Alice", &[PERMISSION_RELOAD]);

        tokio::fs::write(&f.handler.config_path, r#"{ "MaximumPrefixLength": 2 }"#)
            .await
            .unwrap();
        let replies = f.handler.handle(&admin, "us", &args("reload")).await;
        assert_eq!(replies[0].kind, ReplyKind::Success);

        let replies = f.handler.handle(&admin, "us", &args("prefix Alice ABC")).await;
        assert_eq!(replies, vec![Reply::error("Your prefix cannot be longer than 2 characters.")]);
    }
}
