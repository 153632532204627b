//! Playback follow-up that no command drives: advancing when a track ends
//! and keeping the status text in line with what plays.

use std::sync::Arc;
use std::time::Duration;

use mediabot_core::player::{PlaybackState, Player, SharedPlayer};
use mediabot_core::transport::Transport;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const STATUS_REFRESH: Duration = Duration::from_secs(1);

pub async fn run(
    player: SharedPlayer,
    transport: Arc<dyn Transport>,
    mut track_end: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let mut refresh = tokio::time::interval(STATUS_REFRESH);
    let mut last_status = String::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            ended = track_end.recv() => {
                if ended.is_none() {
                    break;
                }
                match player.lock().await.on_track_end() {
                    Some(track) => info!("Advanced to {}", track.display_name()),
                    None => debug!("Playback finished"),
                }
            }
            _ = refresh.tick() => {}
        }

        let status = status_text(&*player.lock().await);
        if status != last_status {
            transport.change_status_text(&status);
            last_status = status;
        }
    }
    debug!("Track event loop stopped");
}

fn status_text(player: &Player) -> String {
    match (player.state(), player.track()) {
        (PlaybackState::Playing, Some(track)) => track.display_name().to_string(),
        (PlaybackState::Paused, Some(track)) => format!("Paused: {}", track.display_name()),
        _ => String::new(),
    }
}
