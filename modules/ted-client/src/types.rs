use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

// --- Search index ---

/// One page of the listing index. `total_pages` is populated on every
/// response but only the page-0 value is meaningful to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub page: u32,
    pub slugs: Vec<String>,
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
    #[serde(rename = "nbPages", default)]
    pub nb_pages: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchHit {
    pub slug: String,
}

// --- Detail payloads ---

/// Detail payload shared by the talk and dubbing endpoint shapes.
/// Every field is optional at the wire level; required-field enforcement
/// happens at extraction, where a miss fails one item rather than the run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailResponse {
    #[serde(rename = "pageProps", default)]
    pub page_props: PageProps,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageProps {
    #[serde(rename = "videoData")]
    pub video_data: Option<VideoData>,
    /// Redirect marker: when present, the canonical data lives under the
    /// alternate (dubbing) endpoint shape.
    #[serde(rename = "__N_REDIRECT")]
    pub redirect: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoData {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub social_title: Option<String>,
    pub presenter_display_name: Option<String>,
    pub duration: Option<u32>,
    pub language: Option<String>,
    pub recorded_on: Option<NaiveDate>,
    pub published_at: Option<DateTime<Utc>>,
    pub canonical_url: Option<String>,
    #[serde(rename = "type")]
    pub talk_type: Option<TalkType>,
    pub viewed_count: Option<u64>,
    pub tedcom_percentage: Option<f64>,
    pub youtube_percentage: Option<f64>,
    pub podcasts_percentage: Option<f64>,
    pub tedapps_percentage: Option<f64>,
    /// JSON-encoded string holding the player manifest.
    pub player_data: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TalkType {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl VideoData {
    /// The detail endpoints return `"videoData": {}` for items with no
    /// canonical data under that shape. An id-less payload is that case.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
    }

    /// Pull the HLS stream URL out of the nested JSON-encoded player data.
    /// Absence at any level yields None, never an error.
    pub fn stream_url(&self) -> Option<String> {
        let raw = self.player_data.as_deref()?;
        let player: PlayerData = serde_json::from_str(raw).ok()?;
        player.resources?.hls?.stream
    }
}

#[derive(Debug, Deserialize)]
struct PlayerData {
    resources: Option<PlayerResources>,
}

#[derive(Debug, Deserialize)]
struct PlayerResources {
    hls: Option<HlsResource>,
}

#[derive(Debug, Deserialize)]
struct HlsResource {
    stream: Option<String>,
}
