//! Bot state behaviour across restarts, through the public API.

use std::path::Path;

use eyebot_core::{Answerer, BotConfig, FeedClient};
use eyebot_telegram::handlers::classify;
use eyebot_telegram::state::{Access, PairOutcome};
use eyebot_telegram::BotState;

const ADMIN: u64 = 7;

fn boot(state_dir: &Path) -> BotState {
    boot_with_policy(state_dir, None)
}

fn boot_with_policy(state_dir: &Path, policy: Option<&str>) -> BotState {
    let dir = state_dir.to_string_lossy().to_string();
    let policy = policy.map(str::to_string);
    let config = BotConfig::from_lookup(move |name: &str| match name {
        "BOT_TOKEN" => Some("1:test".to_string()),
        "ADMIN_ID" => Some(ADMIN.to_string()),
        "EYEBOT_STATE_DIR" => Some(dir.clone()),
        "EYEBOT_ACTIVITY_POLICY" => policy.clone(),
        _ => None,
    })
    .unwrap();
    let feeds =
        FeedClient::with_endpoints("http://127.0.0.1:9/rss?q=", "http://127.0.0.1:9/r?q=").unwrap();
    BotState::with_clients(config, feeds, Answerer::new(None, "test/model"))
}

#[test]
fn pairing_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = boot(dir.path());
    assert_eq!(first.check_access(-100, Some(1)).unwrap(), Access::NotPaired);
    assert_eq!(first.pair(-100, "").unwrap(), PairOutcome::Paired);
    drop(first);

    let second = boot(dir.path());
    assert_eq!(second.check_access(-100, Some(1)).unwrap(), Access::Allowed);
    assert_eq!(second.pair(-100, "").unwrap(), PairOutcome::AlreadyPaired);
}

#[test]
fn activity_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let first = boot(dir.path());
    for user in [1, 2, 2, 3] {
        assert!(first.record_activity(Some(user), true));
    }
    drop(first);

    let second = boot(dir.path());
    let stats = second.stats().unwrap();
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.active.last_7_days, 3);
    assert_eq!(stats.active.last_30_days, 3);
}

#[test]
fn two_instances_share_state() {
    let dir = tempfile::tempdir().unwrap();
    let a = boot(dir.path());
    let b = boot(dir.path());

    a.record_activity(Some(10), true);
    b.record_activity(Some(11), true);
    a.pair(5, "").unwrap();

    assert_eq!(a.stats().unwrap().total_users, 2);
    assert!(b.is_paired(5).unwrap());
    assert!(b.unpair(5).unwrap());
    assert!(!a.is_paired(5).unwrap());
}

#[test]
fn admin_is_never_gated() {
    let dir = tempfile::tempdir().unwrap();
    let state = boot(dir.path());

    assert!(state.is_admin(Some(ADMIN)));
    assert_eq!(state.check_access(42, Some(ADMIN)).unwrap(), Access::Allowed);
    assert!(state.stats().unwrap().paired_chats == 0);
}

#[test]
fn activity_by_policy_and_message_kind() {
    // (text, recorded under every-message, recorded under commands-only)
    let cases = [
        (Some("/start"), true, true),
        (Some("/stats@eyebot"), true, true),
        (Some("/nope"), true, false),
        (Some("/start@otherbot"), true, false),
        (Some("good morning"), true, false),
        (None, true, false),
    ];

    for (policy, every) in [(None, true), (Some("command"), false)] {
        for (user, (text, on_every, on_commands)) in (1u64..).zip(cases) {
            let dir = tempfile::tempdir().unwrap();
            let state = boot_with_policy(dir.path(), policy);
            let inbound = classify(text, "eyebot");

            let expected = if every { on_every } else { on_commands };
            assert_eq!(
                state.record_activity(Some(user), inbound.is_command()),
                expected,
                "{text:?} under {policy:?}"
            );
            assert_eq!(state.stats().unwrap().total_users, usize::from(expected));
        }
    }
}
