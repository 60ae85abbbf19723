//! Enrichment stage tests: detail payloads in, normalized records (or
//! nothing) out.

use crate::enrich::{extract_record, Enricher};
use crate::testing::{
    detail_with, empty_detail, empty_detail_with_redirect, video_data, MockCatalog,
};

#[tokio::test]
async fn complete_payload_yields_a_record() {
    let catalog = MockCatalog::new().on_detail("a-talk", detail_with(video_data("a-talk")));
    let enricher = Enricher::new(&catalog).await.unwrap();

    let record = enricher.enrich_one("a-talk").await.unwrap();
    assert_eq!(record.slug, "a-talk");
    assert_eq!(record.presenter, "A. Speaker");
    assert_eq!(
        record.stream_url.as_deref(),
        Some("https://cdn.example/a-talk.m3u8")
    );
    assert_eq!(catalog.dubbing_calls("a-talk"), 0);
}

#[tokio::test]
async fn empty_payload_with_redirect_falls_back_exactly_once() {
    let catalog = MockCatalog::new()
        .on_detail("dubbed", empty_detail_with_redirect("dubbed"))
        .on_dubbing("dubbed", detail_with(video_data("dubbed")));
    let enricher = Enricher::new(&catalog).await.unwrap();

    let record = enricher.enrich_one("dubbed").await.unwrap();
    assert_eq!(record.slug, "dubbed");
    assert_eq!(catalog.detail_calls("dubbed"), 1);
    assert_eq!(catalog.dubbing_calls("dubbed"), 1);
}

#[tokio::test]
async fn empty_payload_without_redirect_is_absent_not_an_error() {
    let catalog = MockCatalog::new().on_detail("gone", empty_detail());
    let enricher = Enricher::new(&catalog).await.unwrap();

    assert!(enricher.enrich_one("gone").await.is_none());
    assert_eq!(catalog.dubbing_calls("gone"), 0);
}

#[tokio::test]
async fn empty_fallback_payload_is_absent_with_no_further_fallback() {
    let catalog = MockCatalog::new()
        .on_detail("dubbed", empty_detail_with_redirect("dubbed"))
        .on_dubbing("dubbed", empty_detail());
    let enricher = Enricher::new(&catalog).await.unwrap();

    assert!(enricher.enrich_one("dubbed").await.is_none());
    assert_eq!(catalog.dubbing_calls("dubbed"), 1);
}

#[tokio::test]
async fn missing_required_field_drops_the_item_only() {
    let mut video = video_data("partial");
    video.title = None;
    let catalog = MockCatalog::new()
        .on_detail("partial", detail_with(video))
        .on_detail("whole", detail_with(video_data("whole")));
    let enricher = Enricher::new(&catalog).await.unwrap();

    let records = enricher
        .enrich_all(&["partial".to_string(), "whole".to_string()], 50)
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].slug, "whole");
}

#[tokio::test]
async fn per_item_failures_never_surface_from_enrich_all() {
    // Four slugs: one fine, one fetch error (unregistered), one empty with
    // no redirect, one missing a field.
    let mut partial = video_data("partial");
    partial.duration = None;
    let catalog = MockCatalog::new()
        .on_detail("whole", detail_with(video_data("whole")))
        .on_detail("gone", empty_detail())
        .on_detail("partial", detail_with(partial));
    let enricher = Enricher::new(&catalog).await.unwrap();

    let slugs: Vec<String> = ["whole", "unregistered", "gone", "partial"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let records = enricher.enrich_all(&slugs, 50).await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].slug, "whole");
}

#[tokio::test]
async fn enrichment_is_idempotent_for_the_same_backing_data() {
    let catalog = MockCatalog::new().on_detail("a-talk", detail_with(video_data("a-talk")));
    let enricher = Enricher::new(&catalog).await.unwrap();

    let first = enricher.enrich_one("a-talk").await.unwrap();
    let second = enricher.enrich_one("a-talk").await.unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_stream_url_does_not_fail_extraction() {
    let mut video = video_data("quiet");
    video.player_data = None;
    let record = extract_record(video).unwrap();
    assert_eq!(record.stream_url, None);
}

#[test]
fn extraction_reports_which_field_was_missing() {
    let mut video = video_data("partial");
    video.canonical_url = None;
    let err = extract_record(video).unwrap_err();
    assert!(err.to_string().contains("canonicalUrl"));
}
