//! Station catalogue and playlist parsing.
//!
//! Catalogues are either a TOML file of `[[station]]` tables or a plain
//! M3U playlist.  The same M3U parser expands remote playlists for the
//! url streamer.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::track::Track;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Station {
    pub name: String,
    pub url: String,
    pub description: String,
    pub network: String,
    pub tags: Vec<String>,
    pub city: String,
    pub country: String,
}

impl Station {
    /// Case-insensitive match of every query word against name, network,
    /// description, tags and location.
    pub fn matches(&self, query: &str) -> bool {
        let haystack = format!(
            "{} {} {} {} {} {}",
            self.name,
            self.network,
            self.description,
            self.tags.join(" "),
            self.city,
            self.country
        )
        .to_lowercase();
        let mut words = query.split_whitespace().peekable();
        if words.peek().is_none() {
            return false;
        }
        words.all(|w| haystack.contains(&w.to_lowercase()))
    }

    pub fn to_track(&self) -> Track {
        Track::named(self.name.clone(), self.url.clone())
    }
}

/// Parse an (extended) M3U playlist.  `#EXTINF:<seconds>,<title>` lines
/// name the entry that follows; a negative length marks a live stream.
pub fn parse_m3u(content: &str) -> Vec<Track> {
    let mut tracks = Vec::new();
    let mut pending: Option<(Option<Duration>, String)> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            if let Some((length, title)) = rest.split_once(',') {
                let duration = length
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|secs| *secs > 0.0)
                    .map(Duration::from_secs_f64);
                pending = Some((duration, title.trim().to_string()));
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let (duration, name) = match pending.take() {
            Some((duration, title)) if !title.is_empty() => (duration, Some(title)),
            Some((duration, _)) => (duration, None),
            None => (None, None),
        };
        tracks.push(Track {
            name,
            url: line.to_string(),
            duration,
        });
    }

    tracks
}

#[derive(Debug, Deserialize)]
struct TomlStationFile {
    #[serde(default)]
    station: Vec<TomlStation>,
}

#[derive(Debug, Deserialize)]
struct TomlStation {
    name: String,
    url: String,
    #[serde(default)]
    network: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
}

pub fn parse_stations_toml(content: &str) -> anyhow::Result<Vec<Station>> {
    let file: TomlStationFile = toml::from_str(content)?;
    Ok(file
        .station
        .into_iter()
        .map(|s| Station {
            name: s.name,
            url: s.url,
            description: s.description,
            network: s.network,
            tags: s.tags,
            city: s.city,
            country: s.country,
        })
        .collect())
}

/// Load a catalogue file, choosing the parser by extension.
pub fn load_stations(path: &Path) -> anyhow::Result<Vec<Station>> {
    let content = std::fs::read_to_string(path)?;
    let is_m3u = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("m3u") || e.eq_ignore_ascii_case("m3u8"))
        .unwrap_or(false);

    if is_m3u {
        Ok(parse_m3u(&content)
            .into_iter()
            .map(|t| Station {
                name: t.display_name().to_string(),
                url: t.url,
                ..Station::default()
            })
            .collect())
    } else {
        parse_stations_toml(&content)
    }
}
