use std::fmt;
use std::str::FromStr;

/// What the player does when the current track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    SingleTrack,
    RepeatTrack,
    #[default]
    TrackList,
    RepeatTrackList,
    Random,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::SingleTrack,
        Mode::RepeatTrack,
        Mode::TrackList,
        Mode::RepeatTrackList,
        Mode::Random,
    ];

    /// Short key shown in the mode menu.
    pub fn key(self) -> &'static str {
        match self {
            Mode::SingleTrack => "st",
            Mode::RepeatTrack => "rt",
            Mode::TrackList => "tl",
            Mode::RepeatTrackList => "rtl",
            Mode::Random => "rnd",
        }
    }

    fn long_key(self) -> &'static str {
        match self {
            Mode::SingleTrack => "singletrack",
            Mode::RepeatTrack => "repeattrack",
            Mode::TrackList => "tracklist",
            Mode::RepeatTrackList => "repeattracklist",
            Mode::Random => "random",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Mode::SingleTrack => "Single Track",
            Mode::RepeatTrack => "Repeat Track",
            Mode::TrackList => "Track list",
            Mode::RepeatTrackList => "Repeat track list",
            Mode::Random => "Random",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.key() == wanted || m.long_key() == wanted)
            .ok_or(UnknownMode(wanted))
    }
}
