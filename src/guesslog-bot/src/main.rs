//! Guesslog - a Discord bot that tracks Wordle scores.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use guesslog_bot::confirm::ConfirmationGate;
use guesslog_bot::handler::{ScoreHandler, command_specs};
use guesslog_bot::singleton;
use guesslog_discord::{DiscordBot, DiscordConfig};
use guesslog_store::{PgScoreStore, StoreConfig};

/// Guesslog Discord bot
#[derive(Parser)]
#[command(name = "guesslog")]
#[command(about = "Discord bot that tracks Wordle scores in Postgres")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Skip the single-instance check
    #[arg(long)]
    allow_multiple: bool,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args.log_level, args.json_logs);

    // Pull .env before reading any configuration.
    dotenvy::dotenv().ok();

    if !args.allow_multiple && singleton::another_instance_running() {
        error!("Another guesslog instance is already running, exiting");
        return ExitCode::FAILURE;
    }

    let discord_config = match DiscordConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load Discord configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store_config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load store configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match PgScoreStore::connect(&store_config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to connect to the score store: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = store.ensure_schema().await {
        error!("Failed to provision the scores table: {}", e);
        return ExitCode::FAILURE;
    }
    info!("Score store connected");

    let bot = match DiscordBot::new(discord_config).await {
        Ok(bot) => Arc::new(bot),
        Err(e) => {
            error!("Failed to create Discord bot: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = bot.register_commands(&command_specs()).await {
        error!("Failed to register slash commands: {}", e);
        return ExitCode::FAILURE;
    }
    info!("Slash commands registered");

    let handler = ScoreHandler::new(
        Arc::new(store),
        bot.clone(),
        Arc::new(ConfirmationGate::new()),
    );
    bot.set_event_handler(Arc::new(handler)).await;

    // Shut down on Ctrl+C or SIGTERM.
    let shutdown_bot = bot.clone();
    tokio::spawn(async move {
        let ctrl_c = async {
            signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = terminate => info!("Received SIGTERM, shutting down..."),
        }

        shutdown_bot.shutdown();
    });

    if let Err(e) = bot.start().await {
        error!("Bot error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Bot stopped");
    ExitCode::SUCCESS
}
