//! Command handlers for the Telegram bot.

use std::sync::Arc;

use eyebot_core::feeds::DEFAULT_TRENDING_TOPICS;
use eyebot_core::TrendingReport;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

use crate::state::{Access, BotState, PairOutcome, StatsSnapshot};

/// Terms listed by `/trending`.
const TRENDING_TERMS: usize = 5;

const WELCOME: &str = "🤖 Boot sequence initiated...\n\
    ⏳ Activating intelligence core...\n\n\
    ✅ You are now connected to God's Eye Bot\n\
    Created by PH03NIX 🔥\n\n\
    Commands:\n\
    /trending - Latest useful trends\n\
    /requests - Ask any question\n\
    /complaints - Send complaints\n\
    /pair - Unlock requests and trends for this chat\n\n\
    POWERED BY PH03NIX";

const REQUESTS_USAGE: &str = "Usage: /requests your question";
const COMPLAINTS_USAGE: &str = "Usage: /complaints your message";
const COMPLAINT_SENT: &str = "✅ Complaint sent successfully.";
const COMPLAINT_FAILED: &str = "⚠️ I couldn't deliver your complaint right now. Please try again later.";
const NOT_PAIRED: &str = "🔒 This chat is not paired yet.\n\nSend /pair (with the code you were given, if any) to unlock /requests and /trending.";
const STORAGE_FAILURE: &str = "⚠️ Something went wrong on my side. Please try again in a moment.";
const PLAIN_TEXT_HINT: &str = "Send /help to see what I can do.";

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show this help message")]
    Help,

    #[command(description = "Ask any question: /requests <question>")]
    Requests(String),

    #[command(description = "Latest useful trends")]
    Trending,

    #[command(description = "Send a complaint: /complaints <message>")]
    Complaints(String),

    #[command(description = "Bot statistics (admin only)")]
    Stats,

    #[command(description = "Pair this chat: /pair [code]")]
    Pair(String),

    #[command(description = "Unpair this chat")]
    Unpair,

    #[command(description = "Show pairing status")]
    Status,
}

/// Telegram user id of the sender, if any.
fn sender_id(msg: &Message) -> Option<u64> {
    msg.from.as_ref().map(|u| u.id.0)
}

/// `https://wa.me/` hand-off link carrying the complaint as prefilled text.
pub fn whatsapp_link(number: &str, text: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    format!("https://wa.me/{}?text={}", digits, urlencoding::encode(text))
}

/// Message forwarded to the admin for a complaint.
pub fn format_complaint(complaint: &str, whatsapp_number: Option<&str>) -> String {
    let mut text = format!("📩 Complaint received:\n\n{complaint}");
    if let Some(number) = whatsapp_number {
        text.push_str("\n\nTo enable faster transfer of messages kindly tap the link below:\n");
        text.push_str(&whatsapp_link(number, complaint));
    }
    text
}

/// Reply to `/stats`.
pub fn format_stats(stats: &StatsSnapshot) -> String {
    format!(
        "📊 Bot Stats\n\
        Active users (7 days): {}\n\
        Active users (30 days): {}\n\
        Total users: {}\n\
        Paired chats: {}",
        stats.active.last_7_days, stats.active.last_30_days, stats.total_users, stats.paired_chats
    )
}

/// Reply to `/trending`.
pub fn format_trending(report: &TrendingReport) -> String {
    let mut sections = Vec::with_capacity(report.summaries.len() + 1);

    if !report.trends.is_empty() {
        let terms: Vec<String> = report
            .trends
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {} ({})", i + 1, t.term, t.count))
            .collect();
        sections.push(format!("🔥 Trending now:\n{}", terms.join("\n")));
    }

    sections.extend(
        report
            .summaries
            .iter()
            .map(|(topic, summary)| format!("📰 {topic}\n{summary}")),
    );
    sections.join("\n\n")
}

/// Reply to `/status`.
pub fn format_status(paired: bool, require_pairing: bool, model_answers: bool) -> String {
    let pairing = match (require_pairing, paired) {
        (false, _) => "not required",
        (true, true) => "✅ paired",
        (true, false) => "🔒 not paired (send /pair)",
    };
    let answers = if model_answers {
        "language model with news context"
    } else {
        "news summaries"
    };
    format!("📡 Status\nPairing: {pairing}\nAnswers: {answers}")
}

fn pair_reply(outcome: PairOutcome) -> &'static str {
    match outcome {
        PairOutcome::Paired => "✅ Chat paired. /requests and /trending are now unlocked.",
        PairOutcome::AlreadyPaired => "This chat is already paired.",
        PairOutcome::InvalidCode => "❌ Invalid pairing code.\n\nUsage: /pair CODE",
    }
}

async fn reply_storage_failure(bot: &Bot, msg: &Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, STORAGE_FAILURE).await?;
    Ok(())
}

/// Checks the pairing gate and tells the chat when it is closed.
///
/// Returns `true` if the command may proceed.
async fn ensure_access(bot: &Bot, msg: &Message, state: &BotState) -> ResponseResult<bool> {
    match state.check_access(msg.chat.id.0, sender_id(msg)) {
        Ok(Access::Allowed) => Ok(true),
        Ok(Access::NotPaired) => {
            bot.send_message(msg.chat.id, NOT_PAIRED).await?;
            Ok(false)
        }
        Err(e) => {
            error!(chat_id = %msg.chat.id, error = %e, "Failed to read pairings");
            reply_storage_failure(bot, msg).await?;
            Ok(false)
        }
    }
}

/// Handle the /start command.
pub async fn handle_start(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, WELCOME).await?;
    info!(chat_id = %msg.chat.id, user = ?msg.from.as_ref().map(|u| &u.username), "User started bot");
    Ok(())
}

/// Handle the /help command.
pub async fn handle_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Handle the /requests command - answer a question from fresh news.
pub async fn handle_requests(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    query: String,
) -> ResponseResult<()> {
    let query = query.trim();
    if query.is_empty() {
        bot.send_message(msg.chat.id, REQUESTS_USAGE).await?;
        return Ok(());
    }
    if !ensure_access(&bot, &msg, &state).await? {
        return Ok(());
    }

    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let entries = state.feeds().search(query).await;
    let answer = state.answerer().answer_with_fallback(query, &entries).await;
    info!(chat_id = %msg.chat.id, sources = entries.len(), "Answered request");

    bot.send_message(msg.chat.id, answer).await?;
    Ok(())
}

/// Handle the /trending command.
pub async fn handle_trending(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !ensure_access(&bot, &msg, &state).await? {
        return Ok(());
    }

    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let report = state
        .feeds()
        .trending(&DEFAULT_TRENDING_TOPICS, TRENDING_TERMS)
        .await;
    debug!(chat_id = %msg.chat.id, terms = report.trends.len(), "Trending report built");

    bot.send_message(msg.chat.id, format_trending(&report)).await?;
    Ok(())
}

/// Handle the /complaints command - forward the text to the admin.
pub async fn handle_complaints(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    complaint: String,
) -> ResponseResult<()> {
    let complaint = complaint.trim();
    if complaint.is_empty() {
        bot.send_message(msg.chat.id, COMPLAINTS_USAGE).await?;
        return Ok(());
    }

    let config = state.config();
    let forward = format_complaint(complaint, config.whatsapp_number.as_deref());

    match bot.send_message(ChatId(config.admin_id), forward).await {
        Ok(_) => {
            info!(chat_id = %msg.chat.id, "Complaint forwarded to admin");
            bot.send_message(msg.chat.id, COMPLAINT_SENT).await?;
        }
        Err(e) => {
            warn!(chat_id = %msg.chat.id, error = %e, "Failed to forward complaint");
            bot.send_message(msg.chat.id, COMPLAINT_FAILED).await?;
        }
    }
    Ok(())
}

/// Handle the /stats command. Non-admins get no reply.
pub async fn handle_stats(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if !state.is_admin(sender_id(&msg)) {
        debug!(chat_id = %msg.chat.id, "Ignoring /stats from non-admin");
        return Ok(());
    }

    match state.stats() {
        Ok(stats) => {
            bot.send_message(msg.chat.id, format_stats(&stats)).await?;
        }
        Err(e) => {
            error!(error = %e, "Failed to read stats");
            reply_storage_failure(&bot, &msg).await?;
        }
    }
    Ok(())
}

/// Handle the /pair command.
pub async fn handle_pair(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
    code: String,
) -> ResponseResult<()> {
    match state.pair(msg.chat.id.0, &code) {
        Ok(outcome) => {
            bot.send_message(msg.chat.id, pair_reply(outcome)).await?;
        }
        Err(e) => {
            error!(chat_id = %msg.chat.id, error = %e, "Failed to pair chat");
            reply_storage_failure(&bot, &msg).await?;
        }
    }
    Ok(())
}

/// Handle the /unpair command.
pub async fn handle_unpair(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let reply = match state.unpair(msg.chat.id.0) {
        Ok(true) => "Chat unpaired.",
        Ok(false) => "This chat was not paired.",
        Err(e) => {
            error!(chat_id = %msg.chat.id, error = %e, "Failed to unpair chat");
            STORAGE_FAILURE
        }
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handle the /status command.
pub async fn handle_status(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let paired = match state.is_paired(msg.chat.id.0) {
        Ok(paired) => paired,
        Err(e) => {
            error!(chat_id = %msg.chat.id, error = %e, "Failed to read pairings");
            return reply_storage_failure(&bot, &msg).await;
        }
    };

    let status = format_status(
        paired,
        state.config().require_pairing,
        state.answerer().is_available(),
    );
    bot.send_message(msg.chat.id, status).await?;
    Ok(())
}

/// Handle regular (non-command) text.
///
/// Private chats get a pointer to /help; group chatter is left alone.
pub async fn handle_message(bot: Bot, msg: Message) -> ResponseResult<()> {
    if msg.chat.is_private() {
        bot.send_message(msg.chat.id, PLAIN_TEXT_HINT).await?;
    }
    Ok(())
}

/// Main command dispatcher.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => handle_start(bot, msg).await,
        Command::Help => handle_help(bot, msg).await,
        Command::Requests(query) => handle_requests(bot, msg, state, query).await,
        Command::Trending => handle_trending(bot, msg, state).await,
        Command::Complaints(text) => handle_complaints(bot, msg, state, text).await,
        Command::Stats => handle_stats(bot, msg, state).await,
        Command::Pair(code) => handle_pair(bot, msg, state, code).await,
        Command::Unpair => handle_unpair(bot, msg, state).await,
        Command::Status => handle_status(bot, msg, state).await,
    }
}

/// What an inbound message is, as far as routing cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// `/something` addressed to this bot (or to nobody) that is not a command.
    UnknownCommand(String),
    /// `/something@otherbot`, meant for another bot in the group.
    ForeignCommand,
    Text,
    /// Photos, stickers, joins and anything else without text.
    Other,
}

impl Inbound {
    /// Whether this counts as a command for the activity policy.
    pub fn is_command(&self) -> bool {
        matches!(self, Inbound::Command(_))
    }
}

/// Sorts a message by its text. `None` is a message without text.
pub fn classify(text: Option<&str>, bot_username: &str) -> Inbound {
    let Some(text) = text else {
        return Inbound::Other;
    };
    if !text.starts_with('/') {
        return Inbound::Text;
    }
    if let Ok(cmd) = Command::parse(text, bot_username) {
        return Inbound::Command(cmd);
    }

    let name = text.split_whitespace().next().unwrap_or(text);
    match name.split_once('@') {
        Some((_, target)) if !target.eq_ignore_ascii_case(bot_username) => Inbound::ForeignCommand,
        _ => Inbound::UnknownCommand(name.to_string()),
    }
}

/// Entry point for every message update.
///
/// Activity is recorded once per message, before any reply.
pub async fn route_message(
    bot: Bot,
    msg: Message,
    bot_username: &str,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let inbound = classify(msg.text(), bot_username);
    state
        .track_activity(sender_id(&msg), inbound.is_command())
        .await;

    match inbound {
        Inbound::Command(cmd) => {
            info!(chat_id = %msg.chat.id, "Command matched: {:?}", cmd);
            handle_command(bot, msg, cmd, state).await
        }
        Inbound::UnknownCommand(name) => {
            info!(cmd = %name, "Unrecognized command - sending response");
            bot.send_message(
                msg.chat.id,
                format!("Unknown command: {name}\n\nUse /help to see available commands."),
            )
            .await?;
            Ok(())
        }
        Inbound::ForeignCommand => {
            debug!(chat_id = %msg.chat.id, "Ignoring command for another bot");
            Ok(())
        }
        Inbound::Text => handle_message(bot, msg).await,
        Inbound::Other => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyebot_core::Trend;
    use eyebot_store::ActiveCounts;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "eyebot").unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/requests who won the league?", "eyebot").unwrap(),
            Command::Requests("who won the league?".into())
        );
        assert_eq!(
            Command::parse("/pair@eyebot SESAME", "eyebot").unwrap(),
            Command::Pair("SESAME".into())
        );
        assert!(Command::parse("/connect x", "eyebot").is_err());
    }

    #[test]
    fn test_help_lists_commands() {
        let help = Command::descriptions().to_string();
        for cmd in ["/requests", "/trending", "/complaints", "/stats", "/pair", "/unpair"] {
            assert!(help.contains(cmd), "missing {cmd}");
        }
    }

    #[test]
    fn test_whatsapp_link_encodes_text() {
        assert_eq!(
            whatsapp_link("+234 800 000", "late delivery & rude"),
            "https://wa.me/234800000?text=late%20delivery%20%26%20rude"
        );
    }

    #[test]
    fn test_complaint_with_and_without_number() {
        let with = format_complaint("slow replies", Some("2348000000000"));
        assert!(with.starts_with("📩 Complaint received:\n\nslow replies"));
        assert!(with.ends_with("https://wa.me/2348000000000?text=slow%20replies"));

        let without = format_complaint("slow replies", None);
        assert_eq!(without, "📩 Complaint received:\n\nslow replies");
    }

    #[test]
    fn test_format_stats() {
        let stats = StatsSnapshot {
            active: ActiveCounts { last_7_days: 1, last_30_days: 2 },
            total_users: 3,
            paired_chats: 4,
        };
        let text = format_stats(&stats);
        assert!(text.contains("Active users (7 days): 1"));
        assert!(text.contains("Active users (30 days): 2"));
        assert!(text.contains("Total users: 3"));
        assert!(text.contains("Paired chats: 4"));
    }

    #[test]
    fn test_format_trending() {
        let report = TrendingReport {
            trends: vec![
                Trend { term: "arsenal".into(), count: 3 },
                Trend { term: "election".into(), count: 2 },
            ],
            summaries: vec![("football news".into(), "Arsenal won.".into())],
        };
        assert_eq!(
            format_trending(&report),
            "🔥 Trending now:\n1. arsenal (3)\n2. election (2)\n\n📰 football news\nArsenal won."
        );
    }

    #[test]
    fn test_format_trending_without_terms() {
        let report = TrendingReport {
            trends: Vec::new(),
            summaries: vec![("tech".into(), "Nothing.".into())],
        };
        assert_eq!(format_trending(&report), "📰 tech\nNothing.");
    }

    #[test]
    fn test_format_status() {
        assert!(format_status(true, true, false).contains("✅ paired"));
        assert!(format_status(false, true, false).contains("not paired"));
        assert!(format_status(false, false, true).contains("not required"));
        assert!(format_status(false, false, true).contains("language model"));
    }

    #[test]
    fn test_pair_replies_differ() {
        assert_ne!(pair_reply(PairOutcome::Paired), pair_reply(PairOutcome::AlreadyPaired));
        assert!(pair_reply(PairOutcome::InvalidCode).contains("Invalid"));
    }

    #[test]
    fn test_classify_kinds() {
        assert_eq!(classify(None, "eyebot"), Inbound::Other);
        assert_eq!(classify(Some("hello there"), "eyebot"), Inbound::Text);
        assert_eq!(classify(Some("/start"), "eyebot"), Inbound::Command(Command::Start));
        assert_eq!(
            classify(Some("/start@eyebot"), "eyebot"),
            Inbound::Command(Command::Start)
        );
        assert_eq!(classify(Some("/nope now"), "eyebot"), Inbound::UnknownCommand("/nope".into()));
        assert_eq!(
            classify(Some("/nope@EyeBot"), "eyebot"),
            Inbound::UnknownCommand("/nope@EyeBot".into())
        );
    }

    #[test]
    fn test_commands_for_other_bots_are_foreign() {
        assert_eq!(classify(Some("/start@otherbot"), "eyebot"), Inbound::ForeignCommand);
        assert_eq!(classify(Some("/nope@otherbot x"), "eyebot"), Inbound::ForeignCommand);
        assert!(!Inbound::ForeignCommand.is_command());
    }
}
