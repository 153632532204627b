mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{alice, bob, mallory, tracks, Harness};
use mediabot_core::commands::{BotContext, Command, CommandTable, Invocation, Reply};
use mediabot_core::mode::Mode;
use mediabot_core::player::PlaybackState;
use mediabot_core::track::{Track, HISTORY_CAPACITY};
use mediabot_core::transport::MessageTarget;
use mediabot_core::Result;

const USER_VERBS: [&str; 16] = [
    "h", "a", "p", "u", "sv", "s", "b", "n", "c", "sb", "sf", "v", "r", "m", "gl", "sh",
];

fn verbs(listing: &str) -> Vec<&str> {
    listing
        .lines()
        .map(|l| l.split(':').next().unwrap())
        .collect()
}

#[tokio::test]
async fn test_empty_message_lists_help_in_table_order() {
    let h = Harness::new();
    let listing = h.send("", &bob()).await.unwrap();
    assert_eq!(verbs(&listing), USER_VERBS);
    assert!(listing.starts_with("h: Shows command help\n"));
    assert!(listing.contains("v: VOLUME Sets volume to a value from 0 to 100"));
    assert!(!listing.contains("pos:"));

    let admin_listing = h.send("", &alice()).await.unwrap();
    let admin_verbs = verbs(&admin_listing);
    assert_eq!(admin_verbs.len(), USER_VERBS.len() + 11);
    assert_eq!(admin_verbs[..USER_VERBS.len()], USER_VERBS);
    assert_eq!(admin_verbs.last(), Some(&"rs"));
}

#[tokio::test]
async fn test_unknown_verb_prefixes_help() {
    let h = Harness::new();
    let listing = h.send("", &bob()).await.unwrap();
    let reply = h.send("xyz", &bob()).await.unwrap();
    assert!(reply.to_lowercase().contains("unknown"));
    assert_eq!(reply, format!("Unknown command.\n{listing}"));

    // admin verbs do not exist for regular users
    let reply = h.send("q", &bob()).await.unwrap();
    assert!(reply.starts_with("Unknown command.\n"));
    assert!(!h.control.quit_requested());
}

#[tokio::test]
async fn test_banned_user_rejected_before_parsing() {
    let h = Harness::new();
    for message in ["h", "", "xyz", "v 10"] {
        assert_eq!(h.send(message, &mallory()).await.as_deref(), Some("You are banned"));
    }
    assert_eq!(h.player().lock().await.volume(), 50);
}

#[tokio::test]
async fn test_global_lock() {
    let h = Harness::new();
    assert_eq!(h.send("l", &alice()).await.as_deref(), Some("Locked"));
    assert_eq!(h.transport.channel(), vec!["Alice locked the bot".to_string()]);

    assert_eq!(h.send("v 10", &bob()).await.as_deref(), Some("Bot is locked"));
    assert_eq!(h.send("h", &bob()).await.as_deref(), Some("Bot is locked"));

    // admins keep full control during a lock
    assert_eq!(h.send("v 10", &alice()).await, None);
    assert_eq!(h.send("vl", &alice()).await.as_deref(), Some("Volume locked"));
    assert_eq!(h.send("ua", &alice()).await.as_deref(), Some("alice"));
    assert_eq!(h.send("l", &alice()).await.as_deref(), Some("Unlocked"));

    assert_eq!(h.send("n", &bob()).await.as_deref(), Some("Nothing is currently playing"));
}

#[tokio::test]
async fn test_volume_lock_only_blocks_volume() {
    let h = Harness::new();
    assert_eq!(h.send("vl", &alice()).await.as_deref(), Some("Volume locked"));
    assert_eq!(h.send("v 30", &bob()).await.as_deref(), Some("Volume is locked"));
    assert_eq!(h.send("v", &bob()).await.as_deref(), Some("Volume is locked"));
    assert_eq!(h.send("m", &bob()).await.unwrap().lines().next(), Some("Current mode: Track list"));
    assert_eq!(h.send("v 30", &alice()).await, None);
    assert_eq!(h.send("vl", &alice()).await.as_deref(), Some("Volume unlocked"));
    assert_eq!(h.send("v", &bob()).await.as_deref(), Some("30"));
}

#[tokio::test]
async fn test_volume_out_of_range_returns_help() {
    let h = Harness::new();
    assert_eq!(
        h.send("v 150", &bob()).await.as_deref(),
        Some("VOLUME Sets volume to a value from 0 to 100")
    );
    assert_eq!(
        h.send("v loud", &bob()).await.as_deref(),
        Some("VOLUME Sets volume to a value from 0 to 100")
    );
    assert_eq!(h.player().lock().await.volume(), 50);
    assert_eq!(h.send("v 100", &bob()).await, None);
    assert_eq!(h.backend.volume(), 1.0);
}

#[tokio::test]
async fn test_mode_by_long_and_short_key() {
    let h = Harness::new();
    assert_eq!(
        h.send("m repeattrack", &bob()).await.as_deref(),
        Some("Current mode: Repeat Track")
    );
    assert_eq!(h.player().lock().await.mode(), Mode::RepeatTrack);
    assert_eq!(h.send("M RTL", &bob()).await.as_deref(), Some("Current mode: Repeat track list"));

    let reply = h.send("m shuffle", &bob()).await.unwrap();
    assert!(reply.starts_with("Incorrect mode\nCurrent mode: Repeat track list\n"));
    assert!(reply.contains("rnd Random"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_next_serialises_on_player() {
    let h = Arc::new(Harness::new());
    h.player().lock().await.set_mode(Mode::RepeatTrackList);
    h.load(2).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move { h.send("n", &bob()).await }));
    }
    for handle in handles {
        let reply = handle.await.unwrap().unwrap();
        assert!(reply.starts_with("Playing track "));
    }

    let player = h.player().lock().await;
    assert_eq!(player.track_index(), Some(0));
    assert_eq!(player.history().len(), 11);
    assert_eq!(h.backend.played().len(), 11);
}

#[tokio::test]
async fn test_history_keeps_last_entries() {
    let h = Harness::new();
    {
        let mut player = h.player().lock().await;
        for i in 1..=100 {
            player
                .play(vec![Track::named(format!("track {i}"), format!("http://host/{i}"))], 0)
                .unwrap();
        }
    }
    let reply = h.send("sh", &bob()).await.unwrap();
    let lines: Vec<_> = reply.lines().collect();
    assert_eq!(lines.len(), HISTORY_CAPACITY);
    assert_eq!(lines[0], "0: track 37");
    assert_eq!(lines[63], "63: track 100");
}

#[tokio::test]
async fn test_history_replay_uses_whole_history() {
    let h = Harness::new();
    assert_eq!(h.send("sh", &bob()).await.as_deref(), Some("List is empty"));
    assert_eq!(h.send("sh 0", &bob()).await.as_deref(), Some("Out of list"));

    h.load(3).await;
    h.send("n", &bob()).await;
    h.send("n", &bob()).await;
    assert_eq!(h.send("sh x", &bob()).await.as_deref(), Some("must be integer"));
    assert_eq!(h.send("sh 9", &bob()).await.as_deref(), Some("Out of list"));
    assert_eq!(h.send("sh -3", &bob()).await, None);

    let player = h.player().lock().await;
    assert_eq!(player.track_list().len(), 3);
    assert_eq!(player.track_index(), Some(0));
    assert_eq!(player.track().unwrap().url, "http://host/1");
}

#[tokio::test]
async fn test_select_track() {
    let h = Harness::new();
    assert_eq!(h.send("c 1", &bob()).await.as_deref(), Some("Nothing is currently playing"));
    assert_eq!(h.send("c", &bob()).await.as_deref(), Some("Nothing is currently playing"));

    h.load(5).await;
    assert_eq!(h.send("c -1", &bob()).await.as_deref(), Some("Playing -1 track 5"));
    assert_eq!(h.send("c", &bob()).await.as_deref(), Some("Playing 5 track 5"));
    assert_eq!(h.send("c 2", &bob()).await.as_deref(), Some("Playing 2 track 2"));
    assert_eq!(h.player().lock().await.track_index(), Some(1));
    assert_eq!(h.send("c 6", &bob()).await.as_deref(), Some("Out of list"));
    assert_eq!(h.send("c -6", &bob()).await.as_deref(), Some("Out of list"));
    assert_eq!(h.send("c 0", &bob()).await.as_deref(), Some("Incorrect number"));
    assert_eq!(
        h.send("c two", &bob()).await.as_deref(),
        Some("NUMBER Selects track by number from the list of current results")
    );
}

#[tokio::test]
async fn test_search_runs_in_background() {
    let h = Harness::new();
    assert_eq!(h.send("p jazz", &bob()).await.as_deref(), Some("Searching..."));
    h.wait_idle().await;

    assert_eq!(h.transport.channel(), vec!["Bob requested jazz".to_string()]);
    assert_eq!(h.transport.sent_to(&bob()), vec!["Playing Jazz FM".to_string()]);
    let player = h.player().lock().await;
    assert_eq!(player.state(), PlaybackState::Playing);
    assert_eq!(player.track_list().len(), 2);
}

#[tokio::test]
async fn test_search_failures_reach_the_user() {
    let h = Harness::new();
    h.send("p polka", &bob()).await;
    h.send("p broken", &bob()).await;
    h.wait_idle().await;
    let mut replies = h.transport.sent_to(&bob());
    replies.sort();
    assert_eq!(
        replies,
        vec![
            "Nothing is found for your query".to_string(),
            "Service is unavailable".to_string()
        ]
    );
    assert!(h.transport.channel().is_empty());
    assert_eq!(h.player().lock().await.state(), PlaybackState::Stopped);
}

#[tokio::test]
async fn test_play_pause_toggle() {
    let h = Harness::new();
    assert_eq!(h.send("p", &bob()).await, None);
    assert_eq!(h.player().lock().await.state(), PlaybackState::Stopped);

    h.load(1).await;
    h.send("p", &bob()).await;
    assert_eq!(h.player().lock().await.state(), PlaybackState::Paused);
    h.send("p", &bob()).await;
    assert_eq!(h.player().lock().await.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_play_url() {
    let h = Harness::new();
    assert_eq!(
        h.send("u", &bob()).await.as_deref(),
        Some("URL Plays a stream from a given URL")
    );
    assert_eq!(h.send("u http://radio/live", &bob()).await, None);
    h.send("u ftp://radio/live", &bob()).await;
    h.send("u /music", &bob()).await;
    h.send("u /music", &alice()).await;
    h.send("u dead://radio", &alice()).await;
    h.wait_idle().await;

    assert_eq!(
        h.transport.channel(),
        vec!["Bob requested playing from a URL".to_string()]
    );
    let mut bob_replies = h.transport.sent_to(&bob());
    bob_replies.sort();
    assert_eq!(bob_replies, vec!["Incorrect protocol", "Incorrect protocol"]);
    let mut alice_replies = h.transport.sent_to(&alice());
    alice_replies.sort();
    assert_eq!(alice_replies, vec!["Cannot get stream URL", "The path cannot be found"]);
    assert_eq!(h.player().lock().await.track().unwrap().url, "http://radio/live");
}

#[tokio::test]
async fn test_stop() {
    let h = Harness::new();
    assert_eq!(h.send("s", &bob()).await.as_deref(), Some("Nothing is playing"));
    h.load(2).await;
    assert_eq!(h.send("s", &bob()).await, None);
    assert_eq!(h.transport.channel(), vec!["Bob stopped playback".to_string()]);
    assert_eq!(h.send("gl", &bob()).await.as_deref(), Some("Nothing is currently playing"));
    assert_eq!(h.send("s", &bob()).await.as_deref(), Some("Nothing is playing"));
}

#[tokio::test]
async fn test_next_previous_replies() {
    let h = Harness::new();
    assert_eq!(h.send("b", &bob()).await.as_deref(), Some("Nothing is playing"));
    h.load(2).await;
    assert_eq!(h.send("b", &bob()).await.as_deref(), Some("No previous track"));
    assert_eq!(h.send("n", &bob()).await.as_deref(), Some("Playing track 2"));
    assert_eq!(h.send("n", &bob()).await.as_deref(), Some("No next track"));
    assert_eq!(h.send("gl", &bob()).await.as_deref(), Some("http://host/2"));
}

#[tokio::test]
async fn test_rate_and_position() {
    let h = Harness::new();
    assert_eq!(h.send("r", &bob()).await.as_deref(), Some("1"));
    assert_eq!(h.send("r -2", &bob()).await, None);
    assert_eq!(h.send("r", &bob()).await.as_deref(), Some("2"));
    let rate_help = h.send("r 5", &bob()).await.unwrap();
    assert!(rate_help.starts_with("RATE Sets rate"));

    assert_eq!(h.send("pos", &bob()).await.as_deref(), Some("Nothing is currently playing"));
    h.load(1).await;
    assert_eq!(h.send("pos 42.5", &bob()).await, None);
    assert_eq!(h.send("pos", &bob()).await.as_deref(), Some("42.5"));
    assert_eq!(h.send("pos 101", &bob()).await.as_deref(), Some("Incorrect position"));
    assert_eq!(h.send("pos middle", &bob()).await.as_deref(), Some("Must be a number"));

    assert_eq!(h.send("sf 10", &bob()).await, None);
    assert_eq!(h.send("pos", &bob()).await.as_deref(), Some("52.5"));
    assert_eq!(h.send("sb", &bob()).await, None);
    assert_eq!(h.send("pos", &bob()).await.as_deref(), Some("47.5"));
    let seek_help = h.send("sb 0", &bob()).await.unwrap();
    assert!(seek_help.starts_with("[STEP] Seeks current track back"));
}

#[tokio::test]
async fn test_service_selection() {
    let h = Harness::new();
    assert_eq!(
        h.send("sv", &bob()).await.as_deref(),
        Some("Current service: catalog\nAvailable: catalog, backup")
    );
    assert_eq!(h.send("sv BACKUP", &bob()).await.as_deref(), Some("Current service: backup"));
    assert_eq!(
        h.send("sv spotify", &bob()).await.as_deref(),
        Some("Unknown service.\nCurrent service: backup\nAvailable: catalog, backup")
    );
}

#[tokio::test]
async fn test_admin_and_ban_lists() {
    let h = Harness::new();
    assert_eq!(h.send("ua +carol", &alice()).await.as_deref(), Some("Added"));
    assert_eq!(h.send("ua +carol", &alice()).await.as_deref(), Some("Added"));
    assert_eq!(h.send("ua", &alice()).await.as_deref(), Some("alice, carol, carol"));
    assert_eq!(h.send("ua -dave", &alice()).await.as_deref(), Some("This user is not admin"));
    assert_eq!(h.send("ua -carol", &alice()).await.as_deref(), Some("Deleted"));
    assert_eq!(h.send("ua", &alice()).await.as_deref(), Some("alice, carol"));
    let help = h.send("ua carol", &alice()).await.unwrap();
    assert!(help.starts_with("[+USER|-USER]"));

    assert_eq!(h.send("ub -mallory", &alice()).await.as_deref(), Some("Deleted"));
    assert_eq!(h.send("ub", &alice()).await.as_deref(), Some("List is empty"));
    assert_eq!(h.send("h", &mallory()).await.unwrap().lines().next(), Some("h: Shows command help"));
    assert_eq!(h.send("ub +", &alice()).await.as_deref(), Some("Added"));
    assert_eq!(h.send("ub +bob", &alice()).await.as_deref(), Some("Added"));
    assert_eq!(h.send("ub", &alice()).await.as_deref(), Some("<Anonymous>, bob"));
    assert_eq!(h.send("h", &bob()).await.as_deref(), Some("You are banned"));
    assert_eq!(h.send("ub -nobody", &alice()).await.as_deref(), Some("This user is not banned"));
}

#[tokio::test]
async fn test_save_config() {
    let h = Harness::new();
    h.send("ub +bob", &alice()).await;
    assert_eq!(h.send("sc", &alice()).await.as_deref(), Some("Config saved"));
    let saved = std::fs::read_to_string(h.dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("bob"));
}

#[tokio::test]
async fn test_language() {
    let h = Harness::new();
    assert_eq!(
        h.send("lng", &alice()).await.as_deref(),
        Some("Current locale is en. Available locales: en, ru")
    );
    assert_eq!(h.send("lng de", &alice()).await.as_deref(), Some("Incorrect locale"));
    assert_eq!(h.send("lng ru", &alice()).await.as_deref(), Some("Language has been changed"));
    assert_eq!(h.translator.active(), "ru");
    assert_eq!(h.config().read(|c| c.general.language.clone()).await, "ru");
}

#[tokio::test]
async fn test_transport_commands() {
    let h = Harness::new();
    assert_eq!(h.send("cn Radio", &alice()).await, None);
    assert_eq!(h.transport.nickname(), "Radio");
    assert_eq!(h.send("cs on air", &alice()).await, None);
    assert_eq!(h.transport.status(), "on air");

    assert_eq!(h.send("va", &alice()).await.as_deref(), Some("Voice transmission enabled"));
    assert_eq!(h.transport.status(), "Voice transmission enabled");
    h.load(1).await;
    assert_eq!(h.send("va", &alice()).await.as_deref(), Some("Voice transmission disabled"));
    // status untouched while something plays
    assert_eq!(h.transport.status(), "Voice transmission enabled");
}

#[tokio::test]
async fn test_quit_and_restart() {
    let h = Harness::new();
    assert_eq!(h.send("q", &alice()).await, None);
    assert!(h.control.quit_requested());
    assert_eq!(h.send("rs", &alice()).await, None);
    assert!(h.control.restart_requested());
}

#[tokio::test]
async fn test_about_names_the_crate() {
    let h = Harness::new();
    let reply = h.send("a", &bob()).await.unwrap();
    assert!(reply.starts_with("mediabot-core "));
}

struct Explode;

#[async_trait]
impl Command for Explode {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Always fails".into())
    }

    async fn execute(&self, _ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        if inv.arg == "error" {
            return Err(anyhow::anyhow!("disk on fire").into());
        }
        panic!("boom");
    }
}

#[tokio::test]
async fn test_failures_are_captured() {
    let mut table = CommandTable::new();
    table.register("x", false, Explode);
    let h = Harness::with_table(table);
    assert_eq!(h.send("x", &bob()).await.as_deref(), Some("error: boom"));
    assert_eq!(h.send("x error", &bob()).await.as_deref(), Some("error: disk on fire"));
    // the processor keeps working afterwards
    assert_eq!(h.send("", &bob()).await.as_deref(), Some("x: Always fails"));
}

#[tokio::test]
async fn test_replies_never_broadcast() {
    let h = Harness::new();
    h.load(3).await;
    h.send("n", &bob()).await;
    assert!(h
        .transport
        .messages()
        .iter()
        .all(|(_, target)| *target != MessageTarget::Broadcast));
    assert_eq!(tracks(3).len(), h.player().lock().await.track_list().len());
}
