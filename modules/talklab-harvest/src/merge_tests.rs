//! Merge stage tests: feature tables + metadata artifact on a tempdir disk,
//! merged dataset (or a clean abort) out.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use talklab_common::{HarvestConfig, HarvestError};

use crate::analyzer::FeatureRow;
use crate::enrich::extract_record;
use crate::merge::{merge, write_feature_table};
use crate::store;
use crate::testing::video_data;

fn test_config(root: &Path) -> HarvestConfig {
    let mut config = HarvestConfig::from_env();
    config.data_dir = root.join("data");
    config.csv_dir = root.join("data/csv");
    config.audio_dir = root.join("audio");
    config.ensure_dirs().unwrap();
    config
}

fn feature_row(key: &str, metric: &str, value: &str) -> FeatureRow {
    let mut metrics = BTreeMap::new();
    metrics.insert(metric.to_string(), value.to_string());
    FeatureRow {
        key: key.to_string(),
        metrics,
    }
}

fn write_talks(config: &HarvestConfig, slugs: &[&str]) {
    let records: Vec<_> = slugs
        .iter()
        .map(|s| extract_record(video_data(s)).unwrap())
        .collect();
    store::write_json(&config.talks_path(), &records).unwrap();
}

fn read_final(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[test]
fn matched_rows_carry_both_features_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_talks(&config, &["a", "b"]);
    write_feature_table(
        &config.batch_csv_path(0, 1),
        &[feature_row("a", "pause_ratio", "0.21"), feature_row("orphan", "pause_ratio", "0.5")],
        "slug",
    )
    .unwrap();

    let final_path = config.csv_dir.join("analyzed_talks_2_popular.csv");
    merge(&config, "slug", &config.talks_path(), &final_path).unwrap();

    let (headers, rows) = read_final(&final_path);
    // One row: "a" matched; "orphan" had no metadata, "b" had no features.
    assert_eq!(rows.len(), 1);
    let slug_col = headers.iter().position(|h| h == "slug").unwrap();
    let metric_col = headers.iter().position(|h| h == "pause_ratio").unwrap();
    let title_col = headers.iter().position(|h| h == "title").unwrap();
    assert_eq!(rows[0][slug_col], "a");
    assert_eq!(rows[0][metric_col], "0.21");
    assert_eq!(rows[0][title_col], "Title of a");

    // Consumed intermediates are gone, the dataset stays.
    assert!(!config.batch_csv_path(0, 1).exists());
    assert!(final_path.exists());
}

#[test]
fn tables_from_all_batches_are_concatenated() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_talks(&config, &["a", "b", "c"]);
    write_feature_table(
        &config.batch_csv_path(0, 1),
        &[feature_row("a", "pause_ratio", "0.1"), feature_row("b", "pause_ratio", "0.2")],
        "slug",
    )
    .unwrap();
    write_feature_table(
        &config.batch_csv_path(2, 2),
        &[feature_row("c", "pause_ratio", "0.3")],
        "slug",
    )
    .unwrap();

    let final_path = config.csv_dir.join("analyzed_talks_3_popular.csv");
    merge(&config, "slug", &config.talks_path(), &final_path).unwrap();

    let (_, rows) = read_final(&final_path);
    assert_eq!(rows.len(), 3);
}

#[test]
fn repeated_keys_keep_their_first_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_talks(&config, &["a"]);
    write_feature_table(
        &config.batch_csv_path(0, 0),
        &[feature_row("a", "pause_ratio", "0.1")],
        "slug",
    )
    .unwrap();
    write_feature_table(
        &config.batch_csv_path(1, 1),
        &[feature_row("a", "pause_ratio", "0.9")],
        "slug",
    )
    .unwrap();

    let final_path = config.csv_dir.join("analyzed_talks_1_popular.csv");
    merge(&config, "slug", &config.talks_path(), &final_path).unwrap();

    let (headers, rows) = read_final(&final_path);
    assert_eq!(rows.len(), 1);
    let metric_col = headers.iter().position(|h| h == "pause_ratio").unwrap();
    assert_eq!(rows[0][metric_col], "0.1");
}

#[test]
fn missing_metadata_artifact_aborts_without_deleting_anything() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    // No talks.json written.
    write_feature_table(
        &config.batch_csv_path(0, 0),
        &[feature_row("a", "pause_ratio", "0.1")],
        "slug",
    )
    .unwrap();

    let final_path = config.csv_dir.join("analyzed_talks_1_popular.csv");
    let err = merge(&config, "slug", &config.talks_path(), &final_path).unwrap_err();

    assert!(matches!(err, HarvestError::Artifact(_)));
    assert!(config.batch_csv_path(0, 0).exists());
    assert!(!final_path.exists());
}

#[test]
fn final_datasets_are_never_consumed_as_intermediates() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_talks(&config, &["a"]);
    // A previous run's dataset sits in the csv dir.
    fs::write(
        config.csv_dir.join("analyzed_playlist.csv"),
        "title,metric\nold,1\n",
    )
    .unwrap();
    write_feature_table(
        &config.batch_csv_path(0, 0),
        &[feature_row("a", "pause_ratio", "0.1")],
        "slug",
    )
    .unwrap();

    let final_path = config.csv_dir.join("analyzed_talks_1_popular.csv");
    merge(&config, "slug", &config.talks_path(), &final_path).unwrap();

    // The old dataset is untouched and its rows are not in the new one.
    assert!(config.csv_dir.join("analyzed_playlist.csv").exists());
    let (_, rows) = read_final(&final_path);
    assert_eq!(rows.len(), 1);
}

#[test]
fn synthetic_index_columns_are_stripped() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_talks(&config, &["a"]);
    fs::write(
        config.batch_csv_path(0, 0),
        "Unnamed: 0,slug,pause_ratio\n0,a,0.4\n",
    )
    .unwrap();

    let final_path = config.csv_dir.join("analyzed_talks_1_popular.csv");
    merge(&config, "slug", &config.talks_path(), &final_path).unwrap();

    let (headers, rows) = read_final(&final_path);
    assert!(!headers.iter().any(|h| h.starts_with("Unnamed")));
    let metric_col = headers.iter().position(|h| h == "pause_ratio").unwrap();
    assert_eq!(rows[0][metric_col], "0.4");
}

#[test]
fn nothing_to_merge_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_talks(&config, &["a"]);

    let final_path = config.csv_dir.join("analyzed_talks_1_popular.csv");
    merge(&config, "slug", &config.talks_path(), &final_path).unwrap();

    assert!(!final_path.exists());
}
