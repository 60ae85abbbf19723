//! Playlist mode: enumerate a remote playlist through the external
//! downloader's flat-playlist JSON dump, filter unusable entries, and feed
//! the same batch pipeline keyed by title.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use talklab_common::{sanitize_title, PlaylistEntry, MAX_ENTRY_SECS, UNAVAILABLE_TITLES};

use crate::traits::{PlaylistIndex, RawPlaylistEntry};

const ENUMERATE_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// YtDlpPlaylist — enumeration via yt-dlp --flat-playlist
// ---------------------------------------------------------------------------

pub struct YtDlpPlaylist {
    bin: String,
}

impl YtDlpPlaylist {
    pub fn new(bin: &str) -> Self {
        Self {
            bin: bin.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    #[serde(default)]
    entries: Vec<FlatEntry>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    title: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
}

#[async_trait]
impl PlaylistIndex for YtDlpPlaylist {
    async fn entries(&self, url: &str) -> Result<Vec<RawPlaylistEntry>> {
        let output = tokio::time::timeout(
            ENUMERATE_TIMEOUT,
            tokio::process::Command::new(&self.bin)
                .args(["--quiet", "--flat-playlist", "-J", url])
                .output(),
        )
        .await
        .with_context(|| format!("playlist enumeration timed out for {url}"))?
        .with_context(|| format!("failed to run {}", self.bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("playlist enumeration failed: {}", stderr.trim());
        }

        let playlist: FlatPlaylist = serde_json::from_slice(&output.stdout)
            .context("failed to decode flat-playlist JSON")?;

        Ok(playlist
            .entries
            .into_iter()
            .map(|e| RawPlaylistEntry {
                title: e.title,
                url: e.url,
                duration_secs: e.duration,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Enumerate and filter a playlist. Dropped: entries with no title or URL,
/// placeholder titles for deleted/private videos, and entries longer than
/// an hour (the analyzer freezes on those). Titles are sanitised for
/// filesystem use since they name the asset files.
pub async fn collect_entries(index: &dyn PlaylistIndex, url: &str) -> Result<Vec<PlaylistEntry>> {
    let raw = index.entries(url).await?;
    let total = raw.len();

    let entries: Vec<PlaylistEntry> = raw
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title?;
            let url = entry.url?;
            let Some(duration) = entry.duration_secs else {
                warn!(title = title.as_str(), "Entry has no duration, skipping");
                return None;
            };
            if duration > MAX_ENTRY_SECS {
                return None;
            }
            if UNAVAILABLE_TITLES.contains(&title.as_str()) {
                return None;
            }
            Some(PlaylistEntry {
                title: sanitize_title(&title),
                url,
            })
        })
        .collect();

    info!(total, kept = entries.len(), "Enumerated playlist");
    Ok(entries)
}
