//! Operator console for the user overrides plugin
//!
//! Opens the server database, loads the plugin and runs `us`, `permission`
//! and `account` commands read from stdin as the server console.

mod cli;
mod config;
mod console;
mod signals;

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::CliArgs;
use config::{ConsoleConfig, LoggingSettings};
use console::Console;
use user_overrides::{OverrideStorage, ReplyKind, SqliteOverrideStorage, SqliteUserDirectory, UserOverridesPlugin};

/// Initialize logging system
fn setup_logging(config: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.json_format {
        registry
            .with(fmt::layer()
                .json()
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer()
                .with_ansi(true)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

async fn open_console(config: &ConsoleConfig) -> Result<Console, Box<dyn std::error::Error>> {
    let storage = SqliteOverrideStorage::connect(&config.database.url, config.database.max_connections).await?;
    storage.ensure_schema().await?;

    let accounts = Arc::new(SqliteUserDirectory::new(storage.pool().clone()));
    accounts.ensure_schema().await?;

    let plugin = UserOverridesPlugin::initialize(
        config.plugin.config_path.clone(),
        Arc::new(storage),
        accounts.clone(),
    )
    .await?;

    Ok(Console::new(plugin, accounts))
}

async fn run(console: Console) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = signals::wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                info!("📡 Received {}, shutting down", result?);
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if matches!(line.trim(), "exit" | "quit") {
                    break;
                }

                for reply in console.execute(&line).await {
                    match reply.kind {
                        ReplyKind::Error => eprintln!("{}", reply.text),
                        ReplyKind::Success | ReplyKind::Info => println!("{}", reply.text),
                    }
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let mut config = ConsoleConfig::load_from_file(&args.config_path).await?;
    config.apply_cli(&args);
    config.validate()?;

    setup_logging(&config.logging)?;

    let console = match open_console(&config).await {
        Ok(console) => console,
        Err(e) => {
            error!("❌ Failed to start console: {}", e);
            return Err(e);
        }
    };

    info!("✅ Console ready. Type 'help' for commands, 'exit' to quit.");
    run(console).await?;

    info!("👋 Console stopped");
    Ok(())
}
