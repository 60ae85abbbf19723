// Test mocks for the pipeline, one per trait boundary:
// - MockCatalog (CatalogApi) — HashMap-based page/detail responses
// - MockAudioFetcher (AudioFetcher) — writes placeholder wav files on disk
// - MockAnalyzer (FeatureAnalyzer) — fixed metric rows
// - MockPlaylist (PlaylistIndex) — HashMap-based URL→entries
//
// Plus helpers for building detail payload fixtures.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use talklab_common::SortMode;
use ted_client::{DetailResponse, PageProps, SearchPage, TalkType, VideoData};

use crate::analyzer::FeatureRow;
use crate::traits::{AudioFetcher, CatalogApi, FeatureAnalyzer, PlaylistIndex, RawPlaylistEntry};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A complete detail payload for `slug`, with a stream URL.
pub fn video_data(slug: &str) -> VideoData {
    VideoData {
        id: Some(format!("id-{slug}")),
        slug: Some(slug.to_string()),
        title: Some(format!("Title of {slug}")),
        social_title: Some(format!("Social {slug}")),
        presenter_display_name: Some("A. Speaker".to_string()),
        duration: Some(600),
        language: Some("en".to_string()),
        recorded_on: None,
        published_at: None,
        canonical_url: Some(format!("https://talks.example/{slug}")),
        talk_type: Some(TalkType {
            id: Some("1".to_string()),
            name: Some("Stage talk".to_string()),
        }),
        viewed_count: Some(1_000_000),
        tedcom_percentage: Some(40.0),
        youtube_percentage: Some(50.0),
        podcasts_percentage: Some(5.0),
        tedapps_percentage: Some(5.0),
        player_data: Some(format!(
            r#"{{"resources":{{"hls":{{"stream":"https://cdn.example/{slug}.m3u8"}}}}}}"#
        )),
    }
}

pub fn detail_with(video: VideoData) -> DetailResponse {
    DetailResponse {
        page_props: PageProps {
            video_data: Some(video),
            redirect: None,
        },
    }
}

/// Primary payload for an item whose data lives under the alternate shape.
pub fn empty_detail_with_redirect(slug: &str) -> DetailResponse {
    DetailResponse {
        page_props: PageProps {
            video_data: Some(VideoData::default()),
            redirect: Some(format!("/dubbing/{slug}")),
        },
    }
}

/// Empty payload with no way forward.
pub fn empty_detail() -> DetailResponse {
    DetailResponse {
        page_props: PageProps {
            video_data: None,
            redirect: None,
        },
    }
}

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

/// HashMap-based catalog. Returns `Err` for unregistered pages/slugs and
/// counts detail lookups so tests can assert how often each endpoint shape
/// was hit.
pub struct MockCatalog {
    build_id: String,
    pages: HashMap<u32, SearchPage>,
    details: HashMap<String, DetailResponse>,
    dubbing: HashMap<String, DetailResponse>,
    detail_calls: Mutex<HashMap<String, u32>>,
    dubbing_calls: Mutex<HashMap<String, u32>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            build_id: "test-build".to_string(),
            pages: HashMap::new(),
            details: HashMap::new(),
            dubbing: HashMap::new(),
            detail_calls: Mutex::new(HashMap::new()),
            dubbing_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn on_page(mut self, page: u32, slugs: &[&str], total_pages: u32) -> Self {
        self.pages.insert(
            page,
            SearchPage {
                page,
                slugs: slugs.iter().map(|s| s.to_string()).collect(),
                total_pages,
            },
        );
        self
    }

    pub fn on_detail(mut self, slug: &str, detail: DetailResponse) -> Self {
        self.details.insert(slug.to_string(), detail);
        self
    }

    pub fn on_dubbing(mut self, slug: &str, detail: DetailResponse) -> Self {
        self.dubbing.insert(slug.to_string(), detail);
        self
    }

    pub fn detail_calls(&self, slug: &str) -> u32 {
        *self.detail_calls.lock().unwrap().get(slug).unwrap_or(&0)
    }

    pub fn dubbing_calls(&self, slug: &str) -> u32 {
        *self.dubbing_calls.lock().unwrap().get(slug).unwrap_or(&0)
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn search_page(&self, _sort: SortMode, page: u32) -> Result<SearchPage> {
        self.pages
            .get(&page)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockCatalog: no page registered for {page}"))
    }

    async fn build_id(&self) -> Result<String> {
        Ok(self.build_id.clone())
    }

    async fn talk_detail(&self, _build_id: &str, slug: &str) -> Result<DetailResponse> {
        *self
            .detail_calls
            .lock()
            .unwrap()
            .entry(slug.to_string())
            .or_insert(0) += 1;
        self.details
            .get(slug)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockCatalog: no detail registered for {slug}"))
    }

    async fn dubbing_detail(&self, _build_id: &str, slug: &str) -> Result<DetailResponse> {
        *self
            .dubbing_calls
            .lock()
            .unwrap()
            .entry(slug.to_string())
            .or_insert(0) += 1;
        self.dubbing
            .get(slug)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockCatalog: no dubbing detail registered for {slug}"))
    }
}

// ---------------------------------------------------------------------------
// MockAudioFetcher
// ---------------------------------------------------------------------------

/// Writes a placeholder `<name>.wav` into the configured dir, so batch
/// tests exercise the real on-disk cleanup path. Names listed as failing
/// return `Err` without writing anything.
pub struct MockAudioFetcher {
    audio_dir: PathBuf,
    failing: Vec<String>,
}

impl MockAudioFetcher {
    pub fn new(audio_dir: &Path) -> Self {
        Self {
            audio_dir: audio_dir.to_path_buf(),
            failing: Vec::new(),
        }
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }
}

#[async_trait]
impl AudioFetcher for MockAudioFetcher {
    async fn fetch(&self, _stream_url: &str, name: &str) -> Result<PathBuf> {
        if self.failing.iter().any(|f| f == name) {
            anyhow::bail!("MockAudioFetcher: simulated download failure for {name}");
        }
        let wav = self.audio_dir.join(format!("{name}.wav"));
        std::fs::write(&wav, b"riff")?;
        Ok(wav)
    }
}

// ---------------------------------------------------------------------------
// MockAnalyzer
// ---------------------------------------------------------------------------

/// Produces one fixed metric per file, keyed by the wav stem. Names listed
/// as declined return `Ok(None)` like the real tool's sentinel.
pub struct MockAnalyzer {
    declined: Vec<String>,
    analyzed: Mutex<Vec<String>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self {
            declined: Vec::new(),
            analyzed: Mutex::new(Vec::new()),
        }
    }

    pub fn declining(mut self, name: &str) -> Self {
        self.declined.push(name.to_string());
        self
    }

    pub fn analyzed(&self) -> Vec<String> {
        self.analyzed.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeatureAnalyzer for MockAnalyzer {
    async fn analyze(&self, wav: &Path) -> Result<Option<FeatureRow>> {
        let key = wav
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        self.analyzed.lock().unwrap().push(key.clone());

        if self.declined.iter().any(|d| d == &key) {
            return Ok(None);
        }

        let mut metrics = BTreeMap::new();
        metrics.insert("rate_of_speech".to_string(), "3.5".to_string());
        Ok(Some(FeatureRow { key, metrics }))
    }
}

// ---------------------------------------------------------------------------
// MockPlaylist
// ---------------------------------------------------------------------------

pub struct MockPlaylist {
    lists: HashMap<String, Vec<RawPlaylistEntry>>,
}

impl MockPlaylist {
    pub fn new() -> Self {
        Self {
            lists: HashMap::new(),
        }
    }

    pub fn on_url(mut self, url: &str, entries: Vec<RawPlaylistEntry>) -> Self {
        self.lists.insert(url.to_string(), entries);
        self
    }
}

#[async_trait]
impl PlaylistIndex for MockPlaylist {
    async fn entries(&self, url: &str) -> Result<Vec<RawPlaylistEntry>> {
        self.lists
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockPlaylist: no playlist registered for {url}"))
    }
}
