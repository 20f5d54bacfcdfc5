//! Telegram front end for eyebot.
//!
//! This crate routes Telegram commands to the shared logic in `eyebot-core`
//! and the durable state in `eyebot-store`, and serves a small keep-alive
//! HTTP endpoint next to the bot.
//!
//! # Environment Variables
//!
//! Required:
//! - `BOT_TOKEN`: Bot token from @BotFather
//! - `ADMIN_ID`: Telegram user id that receives complaints and may run /stats
//!
//! Optional:
//! - `WHATSAPP_NUMBER`: Adds a wa.me hand-off link to forwarded complaints
//! - `WEBHOOK_URL`: Public base URL; enables webhook mode
//! - `PORT`: Keep-alive / webhook port (default: 10000)
//! - `OPENROUTER_API_KEY`: Lets /requests answers come from a language model
//! - `OPENROUTER_MODEL`: Model to use (default: anthropic/claude-sonnet-4)
//!
//! # Example
//!
//! ```no_run
//! use eyebot_core::BotConfig;
//! use eyebot_telegram::EyeBot;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::from_env()?;
//!     let bot = EyeBot::new(config)?;
//!
//!     // Polling, or webhook mode when WEBHOOK_URL is set
//!     bot.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Commands
//!
//! - `/start` - Welcome message
//! - `/help` - Show available commands
//! - `/requests <question>` - Answer a question from recent news
//! - `/trending` - Trending terms and topic summaries
//! - `/complaints <message>` - Forward a complaint to the admin
//! - `/stats` - Active-user counts (admin only)
//! - `/pair [code]`, `/unpair`, `/status` - Manage access for this chat

pub mod bot;
pub mod error;
pub mod handlers;
pub mod keepalive;
pub mod state;

pub use bot::EyeBot;
pub use error::{BotError, Result};
pub use handlers::Command;
pub use state::{create_shared_state, BotState};
