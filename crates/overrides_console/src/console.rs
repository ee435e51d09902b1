//! Line-oriented command execution for the operator console.

use std::sync::Arc;
use tracing::{info, warn};
use user_overrides::directory::resolve_exact;
use user_overrides::{CommandSender, Reply, SqliteUserDirectory, UserAccount, UserOverridesPlugin};

/// The server console: no account, every permission.
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn account(&self) -> Option<&UserAccount> {
        None
    }

    fn has_permission(&self, _permission: &str) -> bool {
        true
    }

    fn is_console(&self) -> bool {
        true
    }
}

/// Splits a console line into a command name and its arguments.
///
/// A leading `/` is optional. Double quotes group words into one argument.
pub fn parse_line(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.trim();
    let line = line.strip_prefix(user_overrides::commands::COMMAND_SPECIFIER).unwrap_or(line);

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            ch if ch.is_whitespace() && !quoted => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            ch => {
                current.push(ch);
                pending = true;
            }
        }
    }
    if pending {
        tokens.push(current);
    }

    let mut tokens = tokens.into_iter();
    let command = tokens.next()?;
    Some((command, tokens.collect()))
}

pub struct Console {
    plugin: UserOverridesPlugin,
    accounts: Arc<SqliteUserDirectory>,
}

impl Console {
    pub fn new(plugin: UserOverridesPlugin, accounts: Arc<SqliteUserDirectory>) -> Self {
        Self { plugin, accounts }
    }

    /// Runs one console line and returns the replies to print.
    pub async fn execute(&self, line: &str) -> Vec<Reply> {
        let Some((command, args)) = parse_line(line) else {
            return Vec::new();
        };

        match command.to_lowercase().as_str() {
            "account" => self.account(&args).await,
            "help" => vec![
                Reply::info("Commands:"),
                Reply::info("  account create <name> | account delete <name>"),
                Reply::info("  us <sub-command> ... (us help for details)"),
                Reply::info("  permission <add/remove/list> <player name> [permissions]"),
                Reply::info("  exit"),
            ],
            _ => self.plugin.handle_command(&ConsoleSender, &command, &args).await,
        }
    }

    async fn account(&self, args: &[String]) -> Vec<Reply> {
        let usage = || vec![Reply::error("Invalid syntax! Proper syntax: account <create/delete> <name>")];
        let (Some(action), Some(name)) = (args.first(), args.get(1)) else {
            return usage();
        };

        match action.to_lowercase().as_str() {
            "create" => match self.accounts.create_account(name).await {
                Ok(account) => vec![Reply::success(format!(
                    "Created account {} with id {}.",
                    account.name, account.id
                ))],
                Err(e) => vec![Reply::error(e.to_string())],
            },
            "delete" => {
                let account = match resolve_exact(self.accounts.as_ref(), name).await {
                    Ok(account) => account,
                    Err(e) => return vec![Reply::error(e.to_string())],
                };

                // Overrides go first so a failure leaves the account usable.
                if let Err(e) = self.plugin.on_account_deleted(account.id).await {
                    warn!("Could not drop overrides of {}: {}", account.name, e);
                    return vec![Reply::error(e.to_string())];
                }
                match self.accounts.delete_account(account.id).await {
                    Ok(_) => {
                        info!("Deleted account {}", account.name);
                        vec![Reply::success(format!("Deleted account {}.", account.name))]
                    }
                    Err(e) => vec![Reply::error(e.to_string())],
                }
            }
            _ => usage(),
        }
    }
}
