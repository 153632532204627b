//! Playback state machine.
//!
//! ```text
//!   Stopped ──play──▶ Playing ◀──resume── Paused
//!      ▲                 │  └────pause────▶ │
//!      └──────stop───────┴──────────────────┘
//! ```
//!
//! The machine owns the track list, selection, mode, volume, rate and the
//! history ring.  Audio output lives behind [`Backend`]; every backend call
//! must return immediately so the player lock is never held across I/O.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::PlayerConfig;
use crate::errors::{Error, Result};
use crate::mode::Mode;
use crate::track::{History, Track, TrackList};

/// Lower and upper bounds accepted by the rate command.
pub const MIN_RATE: f64 = 0.25;
pub const MAX_RATE: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Media output driven by the player.  Implementations queue the request
/// and return; failures are theirs to log.
pub trait Backend: Send + Sync {
    fn play(&self, track: &Track);
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
    /// `level` is normalised to 0.0..=1.0 of the configured maximum.
    fn set_volume(&self, level: f32);
    fn set_rate(&self, rate: f64);
    /// Position within the current track as a fraction, if known.
    fn position(&self) -> Option<f64>;
    fn set_position(&self, fraction: f64);
}

pub type SharedPlayer = Arc<Mutex<Player>>;

pub struct Player {
    backend: Arc<dyn Backend>,
    state: PlaybackState,
    mode: Mode,
    track_list: TrackList,
    track_index: Option<usize>,
    volume: u32,
    max_volume: u32,
    rate: f64,
    seek_step: f64,
    history: History,
}

impl Player {
    pub fn new(backend: Arc<dyn Backend>, config: &PlayerConfig) -> Self {
        let volume = config.default_volume.min(config.max_volume);
        let player = Self {
            backend,
            state: PlaybackState::Stopped,
            mode: Mode::default(),
            track_list: Vec::new(),
            track_index: None,
            volume,
            max_volume: config.max_volume,
            rate: 1.0,
            seek_step: config.seek_step,
            history: History::default(),
        };
        player.backend.set_volume(player.volume_level());
        player
    }

    pub fn shared(self) -> SharedPlayer {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        info!("Mode set to {:?}", mode);
        self.mode = mode;
    }

    pub fn track_index(&self) -> Option<usize> {
        self.track_index
    }

    /// Current track; `None` while stopped.
    pub fn track(&self) -> Option<&Track> {
        self.track_index.and_then(|i| self.track_list.get(i))
    }

    pub fn track_list(&self) -> &[Track] {
        &self.track_list
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn max_volume(&self) -> u32 {
        self.max_volume
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Replace the track list and start playing at `start_index`.
    pub fn play(&mut self, tracks: TrackList, start_index: usize) -> Result<()> {
        if tracks.is_empty() {
            return Err(Error::EmptyTrackList);
        }
        if start_index >= tracks.len() {
            return Err(Error::IncorrectTrackIndex);
        }
        info!("Loading track list of {} tracks", tracks.len());
        self.track_list = tracks;
        self.start(start_index);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Err(Error::IllegalState);
        }
        self.backend.pause();
        self.state = PlaybackState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != PlaybackState::Paused {
            return Err(Error::IllegalState);
        }
        self.backend.resume();
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Stop playback.  Stopping an already stopped player does nothing.
    /// The track list stays loaded so a track can be selected again.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Stopped {
            return;
        }
        self.backend.stop();
        self.state = PlaybackState::Stopped;
        self.track_index = None;
    }

    pub fn next(&mut self) -> Result<()> {
        let current = self.playing_index()?;
        let len = self.track_list.len();
        let next = match self.mode {
            Mode::Random => random_index(len, current),
            Mode::RepeatTrackList => (current + 1) % len,
            Mode::SingleTrack | Mode::RepeatTrack | Mode::TrackList => {
                if current + 1 >= len {
                    return Err(Error::NoNextTrack);
                }
                current + 1
            }
        };
        self.start(next);
        Ok(())
    }

    pub fn previous(&mut self) -> Result<()> {
        let current = self.playing_index()?;
        let len = self.track_list.len();
        let previous = match self.mode {
            Mode::Random => random_index(len, current),
            Mode::RepeatTrackList => (current + len - 1) % len,
            Mode::SingleTrack | Mode::RepeatTrack | Mode::TrackList => {
                if current == 0 {
                    return Err(Error::NoPreviousTrack);
                }
                current - 1
            }
        };
        self.start(previous);
        Ok(())
    }

    /// Select a track of the loaded list.  Negative indices count from the end.
    pub fn play_by_index(&mut self, index: isize) -> Result<()> {
        if self.track_list.is_empty() {
            return Err(Error::NothingIsPlaying);
        }
        let index =
            resolve_index(index, self.track_list.len()).ok_or(Error::IncorrectTrackIndex)?;
        self.start(index);
        Ok(())
    }

    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume.min(self.max_volume);
        self.backend.set_volume(self.volume_level());
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        self.backend.set_rate(rate);
    }

    /// Position within the current track, in percent.
    pub fn position(&self) -> Result<f64> {
        self.playing_index()?;
        Ok(self.backend.position().unwrap_or(0.0) * 100.0)
    }

    pub fn set_position(&mut self, percent: f64) -> Result<()> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Error::IncorrectPosition);
        }
        self.playing_index()?;
        self.backend.set_position(percent / 100.0);
        Ok(())
    }

    /// Move back by `step` percent (configured default when `None`), stopping
    /// at the start of the track.
    pub fn seek_back(&mut self, step: Option<f64>) -> Result<()> {
        let step = step.unwrap_or(self.seek_step);
        let target = (self.position()? - step).max(0.0);
        self.backend.set_position(target / 100.0);
        Ok(())
    }

    /// Move forward by `step` percent, stopping at the end of the track.
    pub fn seek_forward(&mut self, step: Option<f64>) -> Result<()> {
        let step = step.unwrap_or(self.seek_step);
        let target = (self.position()? + step).min(100.0);
        self.backend.set_position(target / 100.0);
        Ok(())
    }

    /// Apply the current mode after the backend finished a track.
    /// Returns the track that is playing afterwards.
    pub fn on_track_end(&mut self) -> Option<Track> {
        let current = self.playing_index().ok()?;
        let len = self.track_list.len();
        let next = match self.mode {
            Mode::SingleTrack => None,
            Mode::RepeatTrack => Some(current),
            Mode::TrackList => (current + 1 < len).then_some(current + 1),
            Mode::RepeatTrackList => Some((current + 1) % len),
            Mode::Random => Some(random_index(len, current)),
        };
        match next {
            Some(index) => {
                self.start(index);
                self.track().cloned()
            }
            None => {
                debug!("End of playback in mode {:?}", self.mode);
                self.stop();
                None
            }
        }
    }

    fn playing_index(&self) -> Result<usize> {
        match (self.state, self.track_index) {
            (PlaybackState::Stopped, _) | (_, None) => Err(Error::NothingIsPlaying),
            (_, Some(index)) => Ok(index),
        }
    }

    fn start(&mut self, index: usize) {
        let track = self.track_list[index].clone();
        info!("Playing track {}: {}", index, track.display_name());
        self.backend.play(&track);
        self.history.push(track);
        self.track_index = Some(index);
        self.state = PlaybackState::Playing;
    }

    fn volume_level(&self) -> f32 {
        if self.max_volume == 0 {
            return 0.0;
        }
        self.volume as f32 / self.max_volume as f32
    }
}

/// Map a possibly negative index onto `0..len`.
pub fn resolve_index(index: isize, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())?
    } else {
        index as usize
    };
    (resolved < len).then_some(resolved)
}

fn random_index(len: usize, current: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let mut rng = rand::thread_rng();
    loop {
        let candidate = rng.gen_range(0..len);
        if candidate != current {
            return candidate;
        }
    }
}
