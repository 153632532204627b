use thiserror::Error;

/// Failures a command or the player can report.
///
/// Every variant except `Other` is an expected outcome of user input and is
/// turned into a short reply by the processor.  `Other` carries anything
/// unanticipated; it is logged in full and surfaced as `error: <message>`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("nothing found")]
    NothingFound,
    #[error("incorrect protocol")]
    IncorrectProtocol,
    #[error("service error: {0}")]
    Service(String),
    #[error("path not found")]
    PathNotFound,
    #[error("no next track")]
    NoNextTrack,
    #[error("no previous track")]
    NoPreviousTrack,
    #[error("nothing is playing")]
    NothingIsPlaying,
    #[error("incorrect track index")]
    IncorrectTrackIndex,
    #[error("incorrect position")]
    IncorrectPosition,
    #[error("empty track list")]
    EmptyTrackList,
    /// A pause/resume request that does not apply to the current state.
    #[error("illegal player state")]
    IllegalState,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
