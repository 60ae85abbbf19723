//! Merge stage: fold every per-batch feature table into one dataset joined
//! with the enriched metadata. The merge is all-or-nothing — intermediates
//! are only deleted after the final artifact is in place, and any failure
//! leaves everything on disk for a retry.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use talklab_common::{HarvestConfig, HarvestError};

use crate::analyzer::FeatureRow;
use crate::store;

/// Persist one batch's feature rows. The join key is the first column;
/// metric columns follow in deterministic order, the union across rows.
pub fn write_feature_table(
    path: &Path,
    rows: &[FeatureRow],
    key_column: &str,
) -> Result<(), HarvestError> {
    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.metrics.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| HarvestError::Artifact(format!("create {}: {e}", path.display())))?;

    let mut header = vec![key_column];
    header.extend(columns.iter().copied());
    writer
        .write_record(&header)
        .map_err(|e| HarvestError::Artifact(format!("write {}: {e}", path.display())))?;

    for row in rows {
        let mut record = vec![row.key.as_str()];
        for column in &columns {
            record.push(row.metrics.get(*column).map_or("", String::as_str));
        }
        writer
            .write_record(&record)
            .map_err(|e| HarvestError::Artifact(format!("write {}: {e}", path.display())))?;
    }

    writer
        .flush()
        .map_err(|e| HarvestError::Artifact(format!("flush {}: {e}", path.display())))?;
    Ok(())
}

/// Merge every intermediate feature table with the metadata artifact at
/// `metadata_path`, joining on `join_key`, and write the dataset to
/// `final_path`. Feature rows without a metadata match (and vice versa)
/// are dropped; repeated keys keep their first row. Consumed intermediates
/// are deleted only once the final artifact exists.
pub fn merge(
    config: &HarvestConfig,
    join_key: &str,
    metadata_path: &Path,
    final_path: &Path,
) -> Result<(), HarvestError> {
    let batch_csvs = find_batch_csvs(&config.csv_dir)?;
    if batch_csvs.is_empty() {
        info!("No feature tables to merge");
        return Ok(());
    }

    // Read everything fallible up front; nothing is deleted until the final
    // artifact has been written.
    let (feature_columns, feature_rows) = read_feature_tables(&batch_csvs, join_key)?;
    let metadata: Vec<serde_json::Map<String, Value>> = store::read_json(metadata_path)?;

    let mut metadata_by_key: HashMap<String, &serde_json::Map<String, Value>> = HashMap::new();
    for record in &metadata {
        if let Some(key) = record.get(join_key).map(value_to_cell) {
            metadata_by_key.entry(key).or_insert(record);
        }
    }

    let metadata_columns: BTreeSet<&str> = metadata
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .filter(|k| *k != join_key)
        .collect();

    let mut header: Vec<&str> = Vec::with_capacity(feature_columns.len() + metadata_columns.len());
    header.extend(feature_columns.iter().map(String::as_str));
    header.extend(metadata_columns.iter().copied());

    // Write next to the final path, rename into place at the end. A failed
    // merge never leaves a partial dataset behind.
    let tmp_path = final_path.with_extension("csv.tmp");
    let mut writer = csv::Writer::from_path(&tmp_path)
        .map_err(|e| HarvestError::Merge(format!("create {}: {e}", tmp_path.display())))?;
    writer
        .write_record(&header)
        .map_err(|e| HarvestError::Merge(e.to_string()))?;

    let mut seen_keys = HashSet::new();
    let mut written = 0usize;
    for row in &feature_rows {
        let Some(key) = row.get(join_key) else {
            continue;
        };
        if !seen_keys.insert(key.clone()) {
            continue;
        }
        // Inner join: a feature row with no metadata match is dropped.
        let Some(record) = metadata_by_key.get(key) else {
            continue;
        };

        let mut out: Vec<String> = Vec::with_capacity(header.len());
        for column in &feature_columns {
            out.push(row.get(column.as_str()).cloned().unwrap_or_default());
        }
        for column in &metadata_columns {
            out.push(record.get(*column).map(value_to_cell).unwrap_or_default());
        }
        writer
            .write_record(&out)
            .map_err(|e| HarvestError::Merge(e.to_string()))?;
        written += 1;
    }

    writer
        .flush()
        .map_err(|e| HarvestError::Merge(e.to_string()))?;
    drop(writer);
    fs::rename(&tmp_path, final_path)
        .map_err(|e| HarvestError::Merge(format!("rename to {}: {e}", final_path.display())))?;

    info!(rows = written, path = %final_path.display(), "Wrote merged dataset");

    // Only now is it safe to reclaim the consumed intermediates.
    for path in &batch_csvs {
        fs::remove_file(path)
            .map_err(|e| HarvestError::Merge(format!("remove {}: {e}", path.display())))?;
    }

    Ok(())
}

fn find_batch_csvs(csv_dir: &Path) -> Result<Vec<PathBuf>, HarvestError> {
    let mut found = Vec::new();
    let entries = fs::read_dir(csv_dir)
        .map_err(|e| HarvestError::Merge(format!("read dir {}: {e}", csv_dir.display())))?;
    for entry in entries {
        let entry = entry
            .map_err(|e| HarvestError::Merge(format!("read dir {}: {e}", csv_dir.display())))?;
        let path = entry.path();
        if HarvestConfig::is_batch_csv(&path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

type TableRow = HashMap<String, String>;

/// Concatenate the batch tables row-wise. Column order is first-seen across
/// files; synthetic index columns (empty or "Unnamed" headers) are stripped.
fn read_feature_tables(
    paths: &[PathBuf],
    join_key: &str,
) -> Result<(Vec<String>, Vec<TableRow>), HarvestError> {
    let mut columns: Vec<String> = vec![join_key.to_string()];
    let mut rows: Vec<TableRow> = Vec::new();

    for path in paths {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| HarvestError::Merge(format!("open {}: {e}", path.display())))?;
        let headers = reader
            .headers()
            .map_err(|e| HarvestError::Merge(format!("read {}: {e}", path.display())))?
            .clone();

        for header in headers.iter() {
            if header.is_empty() || header.starts_with("Unnamed") {
                continue;
            }
            if !columns.iter().any(|c| c == header) {
                columns.push(header.to_string());
            }
        }

        for record in reader.records() {
            let record = record
                .map_err(|e| HarvestError::Merge(format!("read {}: {e}", path.display())))?;
            let mut row = HashMap::new();
            for (header, value) in headers.iter().zip(record.iter()) {
                if header.is_empty() || header.starts_with("Unnamed") {
                    continue;
                }
                row.insert(header.to_string(), value.to_string());
            }
            rows.push(row);
        }
    }

    Ok((columns, rows))
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
