use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// --- Sort modes ---

/// Listing index selector. The remote search API exposes one index per
/// ranking, named by the sort criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Popularity,
    Recency,
}

impl SortMode {
    /// Index name as the search API expects it.
    pub fn index_name(&self) -> &'static str {
        match self {
            SortMode::Popularity => "popular",
            SortMode::Recency => "newest",
        }
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" | "popularity" => Ok(SortMode::Popularity),
            "newest" | "recency" => Ok(SortMode::Recency),
            other => Err(format!(
                "unknown sort mode `{other}` (expected `popular` or `newest`)"
            )),
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.index_name())
    }
}

// --- Enriched records ---

/// Normalized, fixed-schema metadata for one talk. Extraction either yields
/// a full record or nothing — a record never carries a missing required
/// field. `slug` is the join key across every artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalkRecord {
    pub slug: String,
    pub id: String,
    pub title: String,
    #[serde(rename = "socialTitle")]
    pub social_title: Option<String>,
    pub presenter: String,
    pub duration_secs: u32,
    pub language: Option<String>,
    #[serde(rename = "recordedOn")]
    pub recorded_on: Option<NaiveDate>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "canonicalUrl")]
    pub canonical_url: String,
    pub type_id: String,
    pub type_name: String,
    #[serde(rename = "viewedCount")]
    pub viewed_count: u64,
    /// Share of views per distribution channel, as reported by the site.
    #[serde(rename = "tedcomPercentage")]
    pub web_percentage: Option<f64>,
    #[serde(rename = "youtubePercentage")]
    pub youtube_percentage: Option<f64>,
    #[serde(rename = "podcastsPercentage")]
    pub podcasts_percentage: Option<f64>,
    #[serde(rename = "tedappsPercentage")]
    pub apps_percentage: Option<f64>,
    /// Playback-manifest URL for the audio stream. Absent when the payload
    /// carries no player data; such records are kept but produce no asset.
    #[serde(rename = "streamUrl")]
    pub stream_url: Option<String>,
}

// --- Playlist entries ---

/// One playable entry from a remote playlist, after filtering.
/// `title` is sanitised for filesystem use and acts as the join key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub title: String,
    pub url: String,
}

/// Playlist entries longer than this freeze the analyzer; they are skipped.
pub const MAX_ENTRY_SECS: f64 = 3600.0;

/// Placeholder titles the playlist index returns for unavailable entries.
pub const UNAVAILABLE_TITLES: &[&str] = &["[Deleted video]", "[Private video]"];

/// Strip characters that are unsafe in filenames. Asset files are named by
/// title in playlist mode, so the key must survive the filesystem round trip.
pub fn sanitize_title(title: &str) -> String {
    let re = regex::Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex");
    re.replace_all(title, "").into_owned()
}
