//! Batch orchestration tests: real tempdir filesystem, mock fetch/analyze.

use std::fs;

use talklab_common::HarvestConfig;

use crate::assets::{BatchItem, BatchRunner};
use crate::testing::{MockAnalyzer, MockAudioFetcher};

fn test_config(root: &std::path::Path) -> HarvestConfig {
    let mut config = HarvestConfig::from_env();
    config.data_dir = root.join("data");
    config.csv_dir = root.join("data/csv");
    config.audio_dir = root.join("audio");
    config.ensure_dirs().unwrap();
    config
}

fn items(names: &[&str]) -> Vec<BatchItem> {
    names
        .iter()
        .map(|n| BatchItem {
            name: n.to_string(),
            stream_url: format!("https://cdn.example/{n}.m3u8"),
        })
        .collect()
}

fn audio_file_count(config: &HarvestConfig) -> usize {
    fs::read_dir(&config.audio_dir).unwrap().count()
}

fn batch_csv_names(config: &HarvestConfig) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(&config.csv_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn audio_dir_is_empty_after_every_batch() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let fetcher = MockAudioFetcher::new(&config.audio_dir);
    let analyzer = MockAnalyzer::new();

    let runner = BatchRunner::new(&fetcher, &analyzer, &config, "slug");
    runner
        .run_batches(&items(&["a", "b", "c", "d", "e"]), 2)
        .await
        .unwrap();

    assert_eq!(audio_file_count(&config), 0);
    // Three batches of ≤2 items, each with its own feature table.
    assert_eq!(
        batch_csv_names(&config),
        vec!["analysis_0_1.csv", "analysis_2_3.csv", "analysis_4_4.csv"]
    );
}

#[tokio::test]
async fn failed_fetches_are_skipped_and_the_batch_continues() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let fetcher = MockAudioFetcher::new(&config.audio_dir).failing_on("b");
    let analyzer = MockAnalyzer::new();

    let runner = BatchRunner::new(&fetcher, &analyzer, &config, "slug");
    runner.run_batches(&items(&["a", "b", "c"]), 3).await.unwrap();

    let mut analyzed = analyzer.analyzed();
    analyzed.sort();
    assert_eq!(analyzed, vec!["a", "c"]);
    assert_eq!(audio_file_count(&config), 0);
}

#[tokio::test]
async fn declined_files_produce_no_feature_rows() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let fetcher = MockAudioFetcher::new(&config.audio_dir);
    let analyzer = MockAnalyzer::new().declining("a").declining("b");

    let runner = BatchRunner::new(&fetcher, &analyzer, &config, "slug");
    runner.run_batches(&items(&["a", "b"]), 2).await.unwrap();

    // Whole batch declined: no feature table at all.
    assert!(batch_csv_names(&config).is_empty());
    assert_eq!(audio_file_count(&config), 0);
}

#[tokio::test]
async fn feature_tables_key_rows_by_item_name() {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let fetcher = MockAudioFetcher::new(&config.audio_dir);
    let analyzer = MockAnalyzer::new();

    let runner = BatchRunner::new(&fetcher, &analyzer, &config, "slug");
    runner.run_batches(&items(&["a", "b"]), 2).await.unwrap();

    let mut reader = csv::Reader::from_path(config.batch_csv_path(0, 1)).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["slug", "rate_of_speech"]
    );
    let mut keys: Vec<String> = reader
        .records()
        .map(|r| r.unwrap().get(0).unwrap().to_string())
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn talks_without_a_stream_reference_produce_no_batch_item() {
    use crate::testing::video_data;
    use crate::enrich::extract_record;

    let with_stream = extract_record(video_data("has-stream")).unwrap();
    let mut quiet = video_data("no-stream");
    quiet.player_data = None;
    let without_stream = extract_record(quiet).unwrap();

    let batch = BatchItem::from_talks(&[with_stream, without_stream]);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].name, "has-stream");
}
