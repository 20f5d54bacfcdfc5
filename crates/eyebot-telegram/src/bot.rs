//! Main Telegram bot implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use eyebot_core::BotConfig;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::update_listeners::webhooks;
use tracing::{error, info, warn};
use url::Url;

use crate::error::{BotError, Result};
use crate::handlers::route_message;
use crate::keepalive;
use crate::state::{create_shared_state, BotState};

/// Path the webhook is served under, relative to `WEBHOOK_URL`.
const WEBHOOK_PATH: &str = "webhook";

/// The eyebot Telegram bot.
pub struct EyeBot {
    /// The teloxide bot instance.
    bot: Bot,
    /// Shared state across handlers.
    state: Arc<BotState>,
    started_at: Instant,
}

impl EyeBot {
    /// Create a new bot from its configuration.
    pub fn new(config: BotConfig) -> Result<Self> {
        let bot = Bot::new(&config.token);
        let state = create_shared_state(config)?;
        Ok(Self::with_state(bot, state))
    }

    /// Create a bot with custom state (for testing).
    pub fn with_state(bot: Bot, state: Arc<BotState>) -> Self {
        Self {
            bot,
            state,
            started_at: Instant::now(),
        }
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| BotError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Runs in webhook mode when a webhook URL is configured, polling
    /// otherwise.
    pub async fn run(&self) -> Result<()> {
        match self.state.config().webhook_url.clone() {
            Some(url) => self.start_webhook(url).await,
            None => self.start_polling().await,
        }
    }

    /// Start the bot in polling mode, with the keep-alive server beside it.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Telegram bot in polling mode...");

        let port = self.state.config().port;
        let started_at = self.started_at;
        tokio::spawn(async move {
            if let Err(e) = keepalive::serve(port, started_at).await {
                error!(port, error = %e, "Keep-alive server stopped");
            }
        });

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.state)))
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }

    /// Start the bot behind a webhook at `<base_url>/webhook`.
    ///
    /// The webhook and the keep-alive routes share one listener on `PORT`.
    pub async fn start_webhook(&self, base_url: Url) -> Result<()> {
        let webhook_url = webhook_url(&base_url)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config().port));
        info!(url = %webhook_url, %addr, "Starting Telegram bot with webhook...");

        let options = webhooks::Options::new(addr, webhook_url);
        let (listener, stop_flag, webhook_router) =
            webhooks::axum_to_router(self.bot.clone(), options)
                .await
                .map_err(|e| BotError::WebhookFailed(e.to_string()))?;

        let app = webhook_router.merge(keepalive::create_router(self.started_at));
        let tcp = tokio::net::TcpListener::bind(addr).await?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(tcp, app)
                .with_graceful_shutdown(stop_flag)
                .await
            {
                error!(error = %e, "Webhook server stopped");
            }
        });

        info!("Bot is running! Send /start to begin.");

        Dispatcher::builder(self.bot.clone(), schema(Arc::clone(&self.state)))
            .default_handler(|upd| async move {
                warn!("Unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build()
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;

        Ok(())
    }
}

/// Joins the webhook path onto the configured base URL.
///
/// A base path without a trailing slash is kept as a directory, so
/// `https://host/bot` becomes `https://host/bot/webhook`.
pub fn webhook_url(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(WEBHOOK_PATH)
        .map_err(|e| BotError::WebhookFailed(e.to_string()))
}

/// Builds the update handler tree shared by both modes.
///
/// Every message goes through [`route_message`], so activity is recorded
/// for text and non-text messages alike.
fn schema(state: Arc<BotState>) -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().branch(Update::filter_message().endpoint(
        move |bot: Bot, msg: Message, me: Me| {
            let state = Arc::clone(&state);
            async move { route_message(bot, msg, me.username(), state).await }
        },
    ))
}
