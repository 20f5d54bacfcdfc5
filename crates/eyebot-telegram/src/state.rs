//! Shared state for the Telegram bot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyebot_core::{ActivityPolicy, Answerer, BotConfig, FeedClient};
use eyebot_store::{ActiveCounts, ActivityTracker, PairingStore, StorageError};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Whether a chat may use gated commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    NotPaired,
}

/// Result of a `/pair` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    Paired,
    AlreadyPaired,
    InvalidCode,
}

/// Numbers reported by `/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub active: ActiveCounts,
    pub total_users: usize,
    pub paired_chats: usize,
}

/// Shared state for the Telegram bot, accessible across all handlers.
///
/// The stores hold no cache: every call reads the files again.
pub struct BotState {
    config: BotConfig,
    /// Per-user interaction log.
    activity: ActivityTracker,
    /// Chats allowed to use gated commands.
    pairings: PairingStore,
    feeds: FeedClient,
    answerer: Answerer,
    started_at: Instant,
}

impl BotState {
    /// Create a new BotState with clients for the public endpoints.
    pub fn new(config: BotConfig) -> Result<Self> {
        let feeds = FeedClient::new()?;
        let answerer = Answerer::from_config(&config);
        Ok(Self::with_clients(config, feeds, answerer))
    }

    /// Create a BotState with custom clients (for testing).
    pub fn with_clients(config: BotConfig, feeds: FeedClient, answerer: Answerer) -> Self {
        let activity = ActivityTracker::open(config.activity_file(), config.store_locking);
        let pairings = PairingStore::open(config.pairing_file(), config.store_locking);

        info!(
            state_dir = %config.state_dir.display(),
            locking = config.store_locking,
            require_pairing = config.require_pairing,
            model_answers = answerer.is_available(),
            "Bot state ready"
        );

        Self {
            config,
            activity,
            pairings,
            feeds,
            answerer,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn feeds(&self) -> &FeedClient {
        &self.feeds
    }

    pub fn answerer(&self) -> &Answerer {
        &self.answerer
    }

    /// Time since the state was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Check if a Telegram user is the configured admin.
    pub fn is_admin(&self, user_id: Option<u64>) -> bool {
        user_id
            .and_then(|id| i64::try_from(id).ok())
            .is_some_and(|id| self.config.is_admin(id))
    }

    /// Records an interaction if the activity policy asks for it.
    ///
    /// Best effort: a storage failure is logged and otherwise ignored.
    /// Returns whether an entry was written.
    pub fn record_activity(&self, user_id: Option<u64>, is_command: bool) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };
        if self.config.activity_policy == ActivityPolicy::CommandsOnly && !is_command {
            return false;
        }

        match self.activity.record(user_id) {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to record activity");
                false
            }
        }
    }

    /// [`record_activity`](Self::record_activity) on the blocking pool.
    ///
    /// The store cycle may wait on the file lock, which must not stall a
    /// runtime worker.
    pub async fn track_activity(self: &Arc<Self>, user_id: Option<u64>, is_command: bool) -> bool {
        let state = Arc::clone(self);
        match tokio::task::spawn_blocking(move || state.record_activity(user_id, is_command)).await
        {
            Ok(recorded) => recorded,
            Err(e) => {
                warn!(error = %e, "Activity recording task failed");
                false
            }
        }
    }

    /// Decides whether a chat may use gated commands.
    ///
    /// The admin is always allowed, as is everyone when pairing is not
    /// required.
    pub fn check_access(
        &self,
        chat_id: i64,
        user_id: Option<u64>,
    ) -> std::result::Result<Access, StorageError> {
        if !self.config.require_pairing || self.is_admin(user_id) {
            return Ok(Access::Allowed);
        }
        if self.pairings.is_paired(chat_id)? {
            Ok(Access::Allowed)
        } else {
            debug!(chat_id, "Chat not paired");
            Ok(Access::NotPaired)
        }
    }

    /// Pairs a chat, checking the shared code when one is configured.
    pub fn pair(&self, chat_id: i64, code: &str) -> std::result::Result<PairOutcome, StorageError> {
        if let Some(expected) = &self.config.pairing_code {
            if !code.trim().eq_ignore_ascii_case(expected) {
                info!(chat_id, "Rejected pairing attempt with wrong code");
                return Ok(PairOutcome::InvalidCode);
            }
        }

        if self.pairings.pair(chat_id)? {
            Ok(PairOutcome::Paired)
        } else {
            Ok(PairOutcome::AlreadyPaired)
        }
    }

    /// Unpairs a chat. Returns whether it was paired.
    pub fn unpair(&self, chat_id: i64) -> std::result::Result<bool, StorageError> {
        self.pairings.unpair(chat_id)
    }

    pub fn is_paired(&self, chat_id: i64) -> std::result::Result<bool, StorageError> {
        self.pairings.is_paired(chat_id)
    }

    /// Active-user counts and totals for `/stats`.
    pub fn stats(&self) -> std::result::Result<StatsSnapshot, StorageError> {
        Ok(StatsSnapshot {
            active: self.activity.active_counts()?,
            total_users: self.activity.distinct_users()?,
            paired_chats: self.pairings.paired_chats()?.len(),
        })
    }
}

/// Create a shared state instance.
pub fn create_shared_state(config: BotConfig) -> Result<Arc<BotState>> {
    Ok(Arc::new(BotState::new(config)?))
}
