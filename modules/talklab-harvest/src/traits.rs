// Trait abstractions for the pipeline's external boundaries.
//
// CatalogApi wraps the remote catalog (search index + detail endpoints),
// AudioFetcher the download/transcode step, FeatureAnalyzer the external
// prosody tool, PlaylistIndex the playlist enumerator.
//
// These enable deterministic testing with the mocks in `testing`:
// no network, no subprocesses.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use talklab_common::SortMode;
use ted_client::{DetailResponse, SearchPage, TedClient};

use crate::analyzer::FeatureRow;

// ---------------------------------------------------------------------------
// CatalogApi — replaces direct TedClient use
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one page of the listing index.
    async fn search_page(&self, sort: SortMode, page: u32) -> Result<SearchPage>;

    /// Resolve the build token scoping every detail URL. Run-fatal on error.
    async fn build_id(&self) -> Result<String>;

    /// Fetch the primary detail payload for a slug.
    async fn talk_detail(&self, build_id: &str, slug: &str) -> Result<DetailResponse>;

    /// Fetch the alternate-presentation detail payload for a slug.
    async fn dubbing_detail(&self, build_id: &str, slug: &str) -> Result<DetailResponse>;
}

#[async_trait]
impl CatalogApi for TedClient {
    async fn search_page(&self, sort: SortMode, page: u32) -> Result<SearchPage> {
        Ok(self.search_page(sort.index_name(), page).await?)
    }

    async fn build_id(&self) -> Result<String> {
        Ok(self.build_id().await?)
    }

    async fn talk_detail(&self, build_id: &str, slug: &str) -> Result<DetailResponse> {
        Ok(self.talk_detail(build_id, slug).await?)
    }

    async fn dubbing_detail(&self, build_id: &str, slug: &str) -> Result<DetailResponse> {
        Ok(self.dubbing_detail(build_id, slug).await?)
    }
}

// ---------------------------------------------------------------------------
// AudioFetcher — download + transcode for one item
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download the referenced stream and transcode it to the fixed wav
    /// format, returning the wav path. The intermediate container file is
    /// removed before this returns, succeed or fail.
    async fn fetch(&self, stream_url: &str, name: &str) -> Result<PathBuf>;
}

// ---------------------------------------------------------------------------
// FeatureAnalyzer — external prosody tool
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FeatureAnalyzer: Send + Sync {
    /// Analyze one wav file. `Ok(None)` means the tool declined the file
    /// (its "Try again" sentinel) — the item is skipped, not an error.
    async fn analyze(&self, wav: &Path) -> Result<Option<FeatureRow>>;
}

// ---------------------------------------------------------------------------
// PlaylistIndex — remote playlist enumeration
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PlaylistIndex: Send + Sync {
    /// List raw playlist entries: (title, url, duration seconds).
    async fn entries(&self, url: &str) -> Result<Vec<RawPlaylistEntry>>;
}

/// Unfiltered entry as the playlist index reports it.
#[derive(Debug, Clone)]
pub struct RawPlaylistEntry {
    pub title: Option<String>,
    pub url: Option<String>,
    pub duration_secs: Option<f64>,
}
