//! Enrichment stage: per-slug detail fetch, redirect fallback, and
//! extraction into normalized records.

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{info, warn};

use talklab_common::TalkRecord;
use ted_client::VideoData;

use crate::traits::CatalogApi;

/// A required field was absent from an otherwise-present detail payload.
/// Fails that one item, never the batch.
#[derive(Debug, Error)]
#[error("missing field `{0}` in detail payload")]
pub struct MissingField(pub &'static str);

pub struct Enricher<'a> {
    api: &'a dyn CatalogApi,
    build_id: String,
}

impl<'a> Enricher<'a> {
    /// Resolve the build token once for the whole run. Failure here is
    /// fatal — no detail URL can be formed without it.
    pub async fn new(api: &'a dyn CatalogApi) -> anyhow::Result<Self> {
        let build_id = api.build_id().await?;
        Ok(Self { api, build_id })
    }

    /// Enrich one slug. Returns None for every per-item failure mode:
    /// transport error, empty payload without redirect marker, empty
    /// fallback payload, missing required field.
    pub async fn enrich_one(&self, slug: &str) -> Option<TalkRecord> {
        let detail = match self.api.talk_detail(&self.build_id, slug).await {
            Ok(d) => d,
            Err(e) => {
                warn!(slug, error = %e, "Detail fetch failed, skipping");
                return None;
            }
        };

        let props = detail.page_props;
        let video = match props.video_data {
            Some(v) if !v.is_empty() => v,
            _ => {
                // Empty data block: follow the redirect marker to the
                // alternate endpoint shape, once. No marker means the item
                // is unrecoverable — expected partial coverage, not an error.
                if props.redirect.is_none() {
                    info!(slug, "No detail data and no redirect marker, skipping");
                    return None;
                }
                let fallback = match self.api.dubbing_detail(&self.build_id, slug).await {
                    Ok(d) => d,
                    Err(e) => {
                        warn!(slug, error = %e, "Fallback detail fetch failed, skipping");
                        return None;
                    }
                };
                match fallback.page_props.video_data {
                    Some(v) if !v.is_empty() => v,
                    _ => {
                        info!(slug, "No detail data behind redirect, skipping");
                        return None;
                    }
                }
            }
        };

        match extract_record(video) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(slug, error = %e, "Detail payload incomplete, skipping");
                None
            }
        }
    }

    /// Enrich every slug through a bounded pool. Output is in completion
    /// order — downstream joins by slug, never by position. Per-item
    /// failures are dropped here; nothing surfaces to the caller.
    pub async fn enrich_all(&self, slugs: &[String], workers: usize) -> Vec<TalkRecord> {
        let records: Vec<TalkRecord> =
            stream::iter(slugs.iter().map(|slug| self.enrich_one(slug)))
                .buffer_unordered(workers.max(1))
                .filter_map(|r| async move { r })
                .collect()
                .await;

        info!(
            requested = slugs.len(),
            enriched = records.len(),
            "Fetched talk records"
        );
        records
    }
}

/// Extract the fixed field set out of a detail payload. The stream URL is
/// the one genuinely optional field; every other required miss is a typed
/// per-item error.
pub fn extract_record(video: VideoData) -> Result<TalkRecord, MissingField> {
    let stream_url = video.stream_url();
    let talk_type = video.talk_type.ok_or(MissingField("type"))?;

    Ok(TalkRecord {
        slug: video.slug.ok_or(MissingField("slug"))?,
        id: video.id.ok_or(MissingField("id"))?,
        title: video.title.ok_or(MissingField("title"))?,
        social_title: video.social_title,
        presenter: video
            .presenter_display_name
            .ok_or(MissingField("presenterDisplayName"))?,
        duration_secs: video.duration.ok_or(MissingField("duration"))?,
        language: video.language,
        recorded_on: video.recorded_on,
        published_at: video.published_at,
        canonical_url: video.canonical_url.ok_or(MissingField("canonicalUrl"))?,
        type_id: talk_type.id.ok_or(MissingField("type.id"))?,
        type_name: talk_type.name.ok_or(MissingField("type.name"))?,
        viewed_count: video.viewed_count.ok_or(MissingField("viewedCount"))?,
        web_percentage: video.tedcom_percentage,
        youtube_percentage: video.youtube_percentage,
        podcasts_percentage: video.podcasts_percentage,
        apps_percentage: video.tedapps_percentage,
        stream_url,
    })
}
