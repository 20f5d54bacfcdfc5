//! Durable state for eyebot.
//!
//! This crate holds the two pieces of state the bot keeps between restarts:
//!
//! - **activity**: a per-user log of interactions, used to answer how many
//!   distinct users were active over the last 7 and 30 days
//! - **pairing**: the set of chats that opted in to gated commands
//!
//! Both go through the [`Store`] trait. The file-backed [`JsonFileStore`]
//! replaces the whole file atomically on every write (temp file, then
//! rename) and can guard each load-mutate-save cycle with an advisory lock.
//! A missing file reads as empty; a malformed one is a [`StorageError`].
//!
//! # Example
//!
//! ```no_run
//! use eyebot_store::{ActivityTracker, PairingStore};
//!
//! let activity = ActivityTracker::open("/var/lib/eyebot/state/activity.json", true);
//! activity.record(42i64).unwrap();
//! let counts = activity.active_counts().unwrap();
//! println!("{} weekly, {} monthly", counts.last_7_days, counts.last_30_days);
//!
//! let pairings = PairingStore::open("/var/lib/eyebot/state/pairings.json", true);
//! pairings.pair(42).unwrap();
//! assert!(pairings.is_paired(42).unwrap());
//! ```

pub mod activity;
pub mod atomic;
pub mod error;
pub mod lock;
pub mod pairing;
pub mod store;

pub use activity::{
    ActiveCounts, ActivityLog, ActivityTracker, UserId, MONTHLY_WINDOW_DAYS, WEEKLY_WINDOW_DAYS,
};
pub use error::{Result, StorageError};
pub use lock::{FileLock, FileLockGuard};
pub use pairing::{PairingSet, PairingStore};
pub use store::{JsonFileStore, MemoryStore, Store};
