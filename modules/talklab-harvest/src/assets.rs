//! Asset stage: per-item download + transcode, and the batch orchestration
//! that bounds how much audio ever sits on local storage at once.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use talklab_common::{HarvestConfig, PlaylistEntry, TalkRecord};

use crate::analyzer::FeatureRow;
use crate::merge;
use crate::store;
use crate::traits::{AudioFetcher, FeatureAnalyzer};

/// Ceiling for one stream download. HLS pulls of hour-long talks are slow
/// but anything past this is a stuck download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(900);
/// Ceiling for one transcode.
const TRANSCODE_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// BatchItem
// ---------------------------------------------------------------------------

/// One unit of asset work: a stream reference plus the name that keys the
/// asset file and, later, its feature row.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub name: String,
    pub stream_url: String,
}

impl BatchItem {
    /// Talks with no stream reference produce no asset and are dropped here.
    pub fn from_talks(records: &[TalkRecord]) -> Vec<BatchItem> {
        records
            .iter()
            .filter_map(|r| {
                let stream_url = r.stream_url.clone()?;
                Some(BatchItem {
                    name: r.slug.clone(),
                    stream_url,
                })
            })
            .collect()
    }

    pub fn from_playlist(entries: &[PlaylistEntry]) -> Vec<BatchItem> {
        entries
            .iter()
            .map(|e| BatchItem {
                name: e.title.clone(),
                stream_url: e.url.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// YtDlpFetcher — yt-dlp download + ffmpeg transcode
// ---------------------------------------------------------------------------

pub struct YtDlpFetcher {
    audio_dir: PathBuf,
    ytdlp_bin: String,
    ffmpeg_bin: String,
    sample_rate: u32,
    semaphore: Semaphore,
}

impl YtDlpFetcher {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            audio_dir: config.audio_dir.clone(),
            ytdlp_bin: config.ytdlp_bin.clone(),
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            sample_rate: config.sample_rate,
            semaphore: Semaphore::new(config.download_workers.max(1)),
        }
    }

    async fn run_ytdlp(&self, stream_url: &str, out: &Path) -> Result<()> {
        let parsed = url::Url::parse(stream_url).context("Invalid stream URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!(
                "Only http/https stream URLs are allowed, got: {}",
                parsed.scheme()
            );
        }

        let output = tokio::time::timeout(
            DOWNLOAD_TIMEOUT,
            tokio::process::Command::new(&self.ytdlp_bin)
                .args([
                    "-f",
                    "bestaudio",
                    "--no-part",
                    "--force-overwrites",
                    "-o",
                ])
                .arg(out)
                .arg(stream_url)
                .output(),
        )
        .await
        .with_context(|| format!("download timed out for {stream_url}"))?
        .with_context(|| format!("failed to run {} for {stream_url}", self.ytdlp_bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("download failed: {}", stderr.trim());
        }
        Ok(())
    }

    async fn run_ffmpeg(&self, input: &Path, out: &Path) -> Result<()> {
        let output = tokio::time::timeout(
            TRANSCODE_TIMEOUT,
            tokio::process::Command::new(&self.ffmpeg_bin)
                .arg("-y")
                .arg("-i")
                .arg(input)
                .args(["-ar", &self.sample_rate.to_string(), "-acodec", "pcm_s32le"])
                .arg(out)
                .output(),
        )
        .await
        .with_context(|| format!("transcode timed out for {}", input.display()))?
        .with_context(|| format!("failed to run {}", self.ffmpeg_bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("transcode failed: {}", stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, stream_url: &str, name: &str) -> Result<PathBuf> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("download semaphore closed"))?;

        let container = self.audio_dir.join(format!("{name}.mp4"));
        let wav = self.audio_dir.join(format!("{name}.wav"));

        info!(name, "Downloading audio stream");
        let result = match self.run_ytdlp(stream_url, &container).await {
            Ok(()) => self.run_ffmpeg(&container, &wav).await,
            Err(e) => Err(e),
        };

        // The container is removed whatever happened above; a file that was
        // never written is not an error.
        let _ = tokio::fs::remove_file(&container).await;

        result?;
        Ok(wav)
    }
}

// ---------------------------------------------------------------------------
// BatchRunner — fetch → analyze → persist → reclaim, one batch at a time
// ---------------------------------------------------------------------------

pub struct BatchRunner<'a> {
    fetcher: &'a dyn AudioFetcher,
    analyzer: &'a dyn FeatureAnalyzer,
    config: &'a HarvestConfig,
    join_key: &'a str,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        fetcher: &'a dyn AudioFetcher,
        analyzer: &'a dyn FeatureAnalyzer,
        config: &'a HarvestConfig,
        join_key: &'a str,
    ) -> Self {
        Self {
            fetcher,
            analyzer,
            config,
            join_key,
        }
    }

    /// Process items in batches of `batch_size`: fetch the batch's assets
    /// through a bounded pool, hand the wav files to the analyzer, persist
    /// the batch's feature table, then empty the audio dir so the next
    /// batch starts with a clean disk. Individual item failures are logged
    /// and skipped; artifact write and cleanup failures abort the stage.
    pub async fn run_batches(&self, items: &[BatchItem], batch_size: usize) -> Result<()> {
        let batch_size = batch_size.max(1);

        for (batch_idx, chunk) in items.chunks(batch_size).enumerate() {
            let start = batch_idx * batch_size;
            let end = start + chunk.len() - 1;
            info!(batch = batch_idx, start, end, "Fetching batch");

            let wavs: Vec<PathBuf> = stream::iter(chunk.iter().map(|item| async move {
                match self.fetcher.fetch(&item.stream_url, &item.name).await {
                    Ok(wav) => Some(wav),
                    Err(e) => {
                        warn!(name = item.name.as_str(), error = %e, "Skipping item: fetch failed");
                        None
                    }
                }
            }))
            .buffer_unordered(self.config.download_workers.max(1))
            .filter_map(|r| async move { r })
            .collect()
            .await;

            let pool = chunk.len().min(self.config.analysis_workers).max(1);
            let rows: Vec<FeatureRow> = stream::iter(wavs.iter().map(|wav| async move {
                match self.analyzer.analyze(wav).await {
                    Ok(row) => row,
                    Err(e) => {
                        warn!(wav = %wav.display(), error = %e, "Skipping file: analysis failed");
                        None
                    }
                }
            }))
            .buffer_unordered(pool)
            .filter_map(|r| async move { r })
            .collect()
            .await;

            if rows.is_empty() {
                info!(batch = batch_idx, "No features extracted from batch");
            } else {
                let path = self.config.batch_csv_path(start, end);
                merge::write_feature_table(&path, &rows, self.join_key)?;
                info!(batch = batch_idx, rows = rows.len(), "Wrote batch feature table");
            }

            // One batch owns the audio dir; reclaim before the next begins.
            store::clear_dir(&self.config.audio_dir)?;
        }

        Ok(())
    }
}
