//! eyebot binary.
//!
//! Start the bot with:
//! ```bash
//! BOT_TOKEN=xxx ADMIN_ID=123 cargo run -p eyebot-telegram
//! ```

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use eyebot_core::{config, BotConfig};
use eyebot_store::{ActivityTracker, PairingStore, MONTHLY_WINDOW_DAYS};
use eyebot_telegram::EyeBot;
use tracing_subscriber::EnvFilter;
use url::Url;

/// God's Eye Bot - news answers, trends and complaints on Telegram
#[derive(Parser, Debug)]
#[command(name = "eyebot", version)]
#[command(about = "Telegram bot that answers questions from the news and tracks active users")]
struct Args {
    /// Public base URL; switches to webhook mode (overrides WEBHOOK_URL)
    #[arg(long)]
    webhook_url: Option<Url>,

    /// Keep-alive / webhook port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Maintenance>,
}

/// Store maintenance; runs without starting the bot.
#[derive(Subcommand, Debug)]
enum Maintenance {
    /// Print active-user counts and paired chats
    Stats,

    /// Drop activity entries older than the given number of days
    Compact {
        /// Age cutoff in days (at least the monthly window)
        #[arg(long, default_value_t = MONTHLY_WINDOW_DAYS, value_parser = clap::value_parser!(i64).range(MONTHLY_WINDOW_DAYS..))]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    config::load_env_files();

    let filter = match args.verbose {
        0 => "eyebot_telegram=info,eyebot_store=info,eyebot_core=info,teloxide=warn",
        1 => "eyebot_telegram=debug,eyebot_store=debug,eyebot_core=debug,teloxide=info",
        2 => "eyebot_telegram=trace,eyebot_store=trace,eyebot_core=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(command) = args.command {
        return run_maintenance(command);
    }

    let mut bot_config = BotConfig::from_env()?;
    if let Some(url) = args.webhook_url {
        bot_config.webhook_url = Some(url);
    }
    if let Some(port) = args.port {
        bot_config.port = port;
    }
    let webhook = bot_config.webhook_url.is_some();
    let port = bot_config.port;

    let bot = EyeBot::new(bot_config)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\n[robot] God's Eye Bot");
            println!("   Bot: @{}", username);
            println!("   Mode: {}", if webhook { "webhook" } else { "polling" });
            println!("   Port: {}", port);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\n   Press Ctrl+C to stop\n");

    bot.run().await?;

    Ok(())
}

/// Runs a maintenance subcommand against the state directory.
///
/// Honors `EYEBOT_STORE_LOCKING` like the bot does.
fn run_maintenance(command: Maintenance) -> Result<(), Box<dyn std::error::Error>> {
    let state_dir = config::state_dir();
    let locking = config::store_locking_from_env()?;
    let activity = ActivityTracker::open(config::activity_file(&state_dir), locking);

    match command {
        Maintenance::Stats => {
            let counts = activity.active_counts()?;
            let pairings = PairingStore::open(config::pairing_file(&state_dir), locking);

            println!("State: {}", state_dir.display());
            println!("Active users (7 days): {}", counts.last_7_days);
            println!("Active users (30 days): {}", counts.last_30_days);
            println!("Total users: {}", activity.distinct_users()?);
            println!("Paired chats: {}", pairings.paired_chats()?.len());
        }
        Maintenance::Compact { days } => {
            let removed = activity.compact(Utc::now() - Duration::days(days))?;
            tracing::info!(removed, days, "Compacted activity log");
            println!("Removed {} entries older than {} days", removed, days);
        }
    }
    Ok(())
}
