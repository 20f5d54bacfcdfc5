//! eyebot core - shared logic behind the Telegram front end.
//!
//! - **config**: Environment-driven settings and state paths
//! - **text**: HTML stripping and whitespace/length cleanup
//! - **trends**: Frequency ranking of headline terms
//! - **feeds**: Google News and Reddit lookups
//! - **answer**: Language-model answers with a feed-summary fallback

pub mod answer;
pub mod config;
pub mod feeds;
pub mod text;
pub mod trends;

pub use answer::{AnswerError, Answerer};
pub use config::{ActivityPolicy, BotConfig, ConfigError};
pub use feeds::{web_summary, FeedClient, FeedEntry, FeedError, TrendingReport};
pub use text::{clean_text, strip_html};
pub use trends::{extract_trends, tokenize, Trend};
