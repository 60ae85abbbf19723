use std::env;
use std::path::{Path, PathBuf};

use crate::types::SortMode;

/// Pipeline configuration. Everything that was ambient state in earlier
/// revisions (working directories, session setup, pool sizes) lives here and
/// is passed explicitly into each stage.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    // Artifact directories
    pub data_dir: PathBuf,
    pub csv_dir: PathBuf,
    pub audio_dir: PathBuf,

    // Remote catalog
    pub search_url: String,
    pub site_url: String,
    pub page_size: u32,

    // External tools
    pub ytdlp_bin: String,
    pub ffmpeg_bin: String,
    pub analyzer_bin: String,
    pub sample_rate: u32,

    // Worker-pool ceilings, one per resource type
    pub listing_workers: usize,
    pub enrich_workers: usize,
    pub download_workers: usize,
    pub analysis_workers: usize,
}

impl HarvestConfig {
    /// Load configuration from environment variables, with working defaults
    /// for every key.
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env_or("TALKLAB_DATA_DIR", "data"));
        Self {
            csv_dir: data_dir.join("csv"),
            audio_dir: PathBuf::from(env_or("TALKLAB_AUDIO_DIR", "audio")),
            data_dir,
            search_url: env_or(
                "TALKLAB_SEARCH_URL",
                "https://zenith-prod-alt.ted.com/api/search",
            ),
            site_url: env_or("TALKLAB_SITE_URL", "https://www.ted.com"),
            page_size: 24,
            ytdlp_bin: env_or("TALKLAB_YTDLP_BIN", "yt-dlp"),
            ffmpeg_bin: env_or("TALKLAB_FFMPEG_BIN", "ffmpeg"),
            analyzer_bin: env_or("TALKLAB_ANALYZER_BIN", "prosody-metrics"),
            sample_rate: 48_000,
            listing_workers: 20,
            enrich_workers: 50,
            download_workers: 10,
            analysis_workers: 20,
        }
    }

    /// Create the artifact directories if they don't exist yet.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.csv_dir)?;
        std::fs::create_dir_all(&self.audio_dir)?;
        Ok(())
    }

    // --- Artifact paths ---

    pub fn slugs_path(&self) -> PathBuf {
        self.data_dir.join("slugs.json")
    }

    pub fn talks_path(&self) -> PathBuf {
        self.data_dir.join("talks.json")
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.data_dir.join("playlist.json")
    }

    /// Intermediate feature table for one batch, tagged with its index range.
    pub fn batch_csv_path(&self, start: usize, end: usize) -> PathBuf {
        self.csv_dir.join(format!("analysis_{start}_{end}.csv"))
    }

    pub fn final_talks_path(&self, count: usize, sort: SortMode) -> PathBuf {
        self.csv_dir.join(format!("analyzed_talks_{count}_{sort}.csv"))
    }

    pub fn final_playlist_path(&self) -> PathBuf {
        self.csv_dir.join("analyzed_playlist.csv")
    }

    /// True for intermediate per-batch feature tables; final datasets and
    /// anything else in the csv dir are left alone by the merge step.
    pub fn is_batch_csv(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("analysis_") && n.ends_with(".csv"))
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
