use std::collections::VecDeque;
use std::time::Duration;

/// Number of recently played tracks kept in [`History`].
pub const HISTORY_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub name: Option<String>,
    pub url: String,
    pub duration: Option<Duration>,
}

impl Track {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
            duration: None,
        }
    }

    pub fn named(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: url.into(),
            duration: None,
        }
    }

    /// Name when the source provided one, otherwise the url.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.url,
        }
    }
}

/// Ordered result of a search or url resolution.
pub type TrackList = Vec<Track>;

/// Bounded record of started tracks, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Track>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, track: Track) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(track);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter()
    }

    /// Owned copy for rendering or replaying outside the player lock.
    pub fn snapshot(&self) -> TrackList {
        self.entries.iter().cloned().collect()
    }
}
