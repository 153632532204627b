use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, warn};

use crate::errors::{Error, Result};
use crate::stations::parse_m3u;
use crate::track::{Track, TrackList};

/// Turns a user supplied url or path into playable tracks.
#[async_trait]
pub trait Streamer: Send + Sync {
    async fn get(&self, url: &str, is_admin: bool) -> Result<TrackList>;
}

/// Resolves http(s) streams, remote M3U playlists and, for admins, local
/// files and directories.
pub struct UrlStreamer {
    client: reqwest::Client,
}

impl Default for UrlStreamer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlStreamer {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn fetch_playlist(&self, url: &str) -> Result<TrackList> {
        debug!("Fetching playlist {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Service(e.to_string()))?
            .text()
            .await
            .map_err(|e| Error::Service(e.to_string()))?;
        let tracks = parse_m3u(&body);
        if tracks.is_empty() {
            warn!("Playlist {} has no entries", url);
            return Err(Error::Service(format!("empty playlist: {url}")));
        }
        Ok(tracks)
    }
}

#[async_trait]
impl Streamer for UrlStreamer {
    async fn get(&self, url: &str, is_admin: bool) -> Result<TrackList> {
        let url = url.trim();
        match Url::parse(url) {
            // single letter schemes are Windows drive letters
            Ok(parsed) if parsed.scheme().len() > 1 => match parsed.scheme() {
                "http" | "https" if is_playlist(parsed.path()) => {
                    self.fetch_playlist(url).await
                }
                "http" | "https" => Ok(vec![Track::new(url)]),
                "file" => {
                    let path = parsed.to_file_path().map_err(|_| Error::PathNotFound)?;
                    local_tracks(&path, is_admin).await
                }
                _ => Err(Error::IncorrectProtocol),
            },
            _ => local_tracks(Path::new(url), is_admin).await,
        }
    }
}

fn is_playlist(path: &str) -> bool {
    let path = path.to_lowercase();
    path.ends_with(".m3u") || path.ends_with(".m3u8")
}

async fn local_tracks(path: &Path, is_admin: bool) -> Result<TrackList> {
    if !is_admin {
        return Err(Error::IncorrectProtocol);
    }
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| Error::PathNotFound)?;
    if !metadata.is_dir() {
        return Ok(vec![file_track(path.to_path_buf())]);
    }

    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|_| Error::PathNotFound)?;
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::Other(e.into()))?
    {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }
    if files.is_empty() {
        return Err(Error::PathNotFound);
    }
    files.sort();
    Ok(files.into_iter().map(file_track).collect())
}

fn file_track(path: PathBuf) -> Track {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned());
    Track {
        name,
        url: path.to_string_lossy().into_owned(),
        duration: None,
    }
}
