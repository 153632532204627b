use std::sync::Arc;

use async_trait::async_trait;

use super::{BotContext, Command, Invocation, Reply};
use crate::access::GateClass;
use crate::errors::{Error, Result};
use crate::mode::Mode;
use crate::player::{resolve_index, PlaybackState, Player, SharedPlayer, MAX_RATE, MIN_RATE};
use crate::services::Service;
use crate::streamer::Streamer;
use crate::transport::{MessageTarget, Transport, User};

const NOTHING_CURRENTLY_PLAYING: &str = "Nothing is currently playing";

fn reply(text: impl Into<String>) -> Result<Reply> {
    Ok(Some(text.into()))
}

fn now_playing(player: &Player) -> Reply {
    player
        .track()
        .map(|t| format!("Playing {}", t.display_name()))
}

pub struct PlayPauseCommand;

#[async_trait]
impl Command for PlayPauseCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some(
            "QUERY Plays tracks found for the query. If no query is given plays or pauses current track"
                .into(),
        )
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        if inv.arg.is_empty() {
            let mut player = ctx.player.lock().await;
            match player.state() {
                PlaybackState::Playing => player.pause()?,
                PlaybackState::Paused => player.resume()?,
                PlaybackState::Stopped => {}
            }
            return Ok(None);
        }

        let job = search_and_play(
            ctx.services.current().await,
            Arc::clone(&ctx.player),
            Arc::clone(&ctx.transport),
            inv.arg.to_string(),
            inv.user.nickname.clone(),
        );
        ctx.workers.spawn("search", inv.user.clone(), job);
        reply("Searching...")
    }
}

pub struct PlayUrlCommand;

#[async_trait]
impl Command for PlayUrlCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("URL Plays a stream from a given URL".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        if inv.arg.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let job = resolve_and_play(
            Arc::clone(&ctx.streamer),
            Arc::clone(&ctx.player),
            Arc::clone(&ctx.transport),
            inv.arg.to_string(),
            inv.user.clone(),
        );
        ctx.workers.spawn("resolve-url", inv.user.clone(), job);
        Ok(None)
    }
}

async fn search_and_play(
    service: Arc<dyn Service>,
    player: SharedPlayer,
    transport: Arc<dyn Transport>,
    query: String,
    nickname: String,
) -> Result<Reply> {
    let tracks = service.search(&query).await?;
    transport.send_message(
        &format!("{nickname} requested {query}"),
        MessageTarget::Channel,
    );
    let mut player = player.lock().await;
    player.play(tracks, 0)?;
    Ok(now_playing(&player))
}

async fn resolve_and_play(
    streamer: Arc<dyn Streamer>,
    player: SharedPlayer,
    transport: Arc<dyn Transport>,
    url: String,
    user: User,
) -> Result<Reply> {
    let tracks = match streamer.get(&url, user.is_admin).await {
        Ok(tracks) => tracks,
        Err(Error::IncorrectProtocol) => return reply("Incorrect protocol"),
        Err(Error::Service(_)) => return reply("Cannot get stream URL"),
        Err(Error::PathNotFound) => return reply("The path cannot be found"),
        Err(e) => return Err(e),
    };
    transport.send_message(
        &format!("{} requested playing from a URL", user.nickname),
        MessageTarget::Channel,
    );
    player.lock().await.play(tracks, 0)?;
    Ok(None)
}

pub struct StopCommand;

#[async_trait]
impl Command for StopCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Stops playback".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        {
            let mut player = ctx.player.lock().await;
            if player.state() == PlaybackState::Stopped {
                return reply("Nothing is playing");
            }
            player.stop();
        }
        ctx.transport.send_message(
            &format!("{} stopped playback", inv.user.nickname),
            MessageTarget::Channel,
        );
        Ok(None)
    }
}

pub struct NextTrackCommand;

#[async_trait]
impl Command for NextTrackCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Plays next track".into())
    }

    async fn execute(&self, ctx: &BotContext, _inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        match player.next() {
            Ok(()) => Ok(now_playing(&player)),
            Err(Error::NoNextTrack) => reply("No next track"),
            Err(Error::NothingIsPlaying) => reply(NOTHING_CURRENTLY_PLAYING),
            Err(e) => Err(e),
        }
    }
}

pub struct PreviousTrackCommand;

#[async_trait]
impl Command for PreviousTrackCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Plays previous track".into())
    }

    async fn execute(&self, ctx: &BotContext, _inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        match player.previous() {
            Ok(()) => Ok(now_playing(&player)),
            Err(Error::NoPreviousTrack) => reply("No previous track"),
            Err(Error::NothingIsPlaying) => reply("Nothing is playing"),
            Err(e) => Err(e),
        }
    }
}

pub struct SelectTrackCommand;

#[async_trait]
impl Command for SelectTrackCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("NUMBER Selects track by number from the list of current results".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        if inv.arg.is_empty() {
            return match (player.state(), player.track_index(), player.track()) {
                (PlaybackState::Stopped, _, _) | (_, None, _) | (_, _, None) => {
                    reply(NOTHING_CURRENTLY_PLAYING)
                }
                (_, Some(index), Some(track)) => {
                    reply(format!("Playing {} {}", index + 1, track.display_name()))
                }
            };
        }

        let number = inv.arg.trim();
        let index: isize = number.parse().map_err(|_| Error::InvalidArgument)?;
        // 1-based from the front, negative counts from the end
        let index = match index {
            0 => return reply("Incorrect number"),
            n if n > 0 => n - 1,
            n => n,
        };
        match player.play_by_index(index) {
            Ok(()) => {
                let name = player.track().map(|t| t.display_name()).unwrap_or_default();
                reply(format!("Playing {number} {name}"))
            }
            Err(Error::IncorrectTrackIndex) => reply("Out of list"),
            Err(Error::NothingIsPlaying) => reply(NOTHING_CURRENTLY_PLAYING),
            Err(e) => Err(e),
        }
    }
}

/// Optional seek step: a percentage in (0, 100].
fn parse_step(arg: &str) -> Result<Option<f64>> {
    if arg.is_empty() {
        return Ok(None);
    }
    match arg.trim().parse::<f64>() {
        Ok(step) if step > 0.0 && step <= 100.0 => Ok(Some(step)),
        _ => Err(Error::InvalidArgument),
    }
}

pub struct SeekBackCommand;

#[async_trait]
impl Command for SeekBackCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("[STEP] Seeks current track back. The optional step is specified in percents from 1 to 100".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let step = parse_step(inv.arg)?;
        ctx.player.lock().await.seek_back(step)?;
        Ok(None)
    }
}

pub struct SeekForwardCommand;

#[async_trait]
impl Command for SeekForwardCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("[STEP] Seeks current track forward. The optional step is specified in percents from 1 to 100".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let step = parse_step(inv.arg)?;
        ctx.player.lock().await.seek_forward(step)?;
        Ok(None)
    }
}

pub struct VolumeCommand;

#[async_trait]
impl Command for VolumeCommand {
    fn help(&self, ctx: &BotContext) -> Option<String> {
        Some(format!(
            "VOLUME Sets volume to a value from 0 to {}",
            ctx.max_volume
        ))
    }

    fn gate_class(&self) -> GateClass {
        GateClass::Volume
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        if inv.arg.is_empty() {
            return reply(player.volume().to_string());
        }
        match inv.arg.trim().parse::<u32>() {
            Ok(volume) if volume <= ctx.max_volume => {
                player.set_volume(volume);
                Ok(None)
            }
            _ => Err(Error::InvalidArgument),
        }
    }
}

pub struct RateCommand;

#[async_trait]
impl Command for RateCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some(format!(
            "RATE Sets rate to a value from {MIN_RATE} to {MAX_RATE}. If no rate is given shows current rate"
        ))
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        if inv.arg.is_empty() {
            return reply(player.rate().to_string());
        }
        let rate = inv
            .arg
            .trim()
            .parse::<f64>()
            .map(f64::abs)
            .map_err(|_| Error::InvalidArgument)?;
        if !(MIN_RATE..=MAX_RATE).contains(&rate) {
            return Err(Error::InvalidArgument);
        }
        player.set_rate(rate);
        Ok(None)
    }
}

fn mode_menu(current: Mode) -> String {
    let mut lines = vec![format!("Current mode: {current}")];
    lines.extend(
        Mode::ALL
            .iter()
            .map(|m| format!("{} {}", m.key(), m.display_name())),
    );
    lines.join("\n")
}

pub struct ModeCommand;

#[async_trait]
impl Command for ModeCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("MODE Sets playback mode. If no MODE is given shows a list of modes".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        if inv.arg.is_empty() {
            return reply(mode_menu(player.mode()));
        }
        match inv.arg.parse::<Mode>() {
            Ok(mode) => {
                player.set_mode(mode);
                reply(format!("Current mode: {mode}"))
            }
            Err(_) => reply(format!("Incorrect mode\n{}", mode_menu(player.mode()))),
        }
    }
}

pub struct GetLinkCommand;

#[async_trait]
impl Command for GetLinkCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("Gets a direct link to the current track".into())
    }

    async fn execute(&self, ctx: &BotContext, _inv: Invocation<'_>) -> Result<Reply> {
        let player = ctx.player.lock().await;
        if player.state() == PlaybackState::Stopped {
            return reply(NOTHING_CURRENTLY_PLAYING);
        }
        match player.track() {
            Some(track) if !track.url.is_empty() => reply(track.url.clone()),
            _ => reply("URL is not available"),
        }
    }
}

pub struct HistoryCommand;

#[async_trait]
impl Command for HistoryCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        Some("[NUMBER] Shows history of playing (64 last tracks). With a number plays the history from that entry".into())
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        let history = player.history().snapshot();
        if inv.arg.is_empty() {
            if history.is_empty() {
                return reply("List is empty");
            }
            let lines: Vec<String> = history
                .iter()
                .enumerate()
                .map(|(i, track)| format!("{}: {}", i, track.display_name()))
                .collect();
            return reply(lines.join("\n"));
        }

        let Ok(index) = inv.arg.trim().parse::<isize>() else {
            return reply("must be integer");
        };
        let Some(start) = resolve_index(index, history.len()) else {
            return reply("Out of list");
        };
        player.play(history, start)?;
        Ok(None)
    }
}

/// Absolute seek in percent.  Hidden from help.
pub struct PositionCommand;

#[async_trait]
impl Command for PositionCommand {
    fn help(&self, _ctx: &BotContext) -> Option<String> {
        None
    }

    async fn execute(&self, ctx: &BotContext, inv: Invocation<'_>) -> Result<Reply> {
        let mut player = ctx.player.lock().await;
        if inv.arg.is_empty() {
            return match player.position() {
                Ok(position) => reply(((position * 100.0).round() / 100.0).to_string()),
                Err(Error::NothingIsPlaying) => reply(NOTHING_CURRENTLY_PLAYING),
                Err(e) => Err(e),
            };
        }
        let Ok(position) = inv.arg.trim().parse::<f64>() else {
            return reply("Must be a number");
        };
        match player.set_position(position) {
            Ok(()) => Ok(None),
            Err(Error::IncorrectPosition) => reply("Incorrect position"),
            Err(Error::NothingIsPlaying) => reply(NOTHING_CURRENTLY_PLAYING),
            Err(e) => Err(e),
        }
    }
}
