//! Seam to the external prosody analyzer. The tool consumes a wav path and
//! prints a flat metric table, or a "Try again" line when it cannot process
//! the file.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::traits::FeatureAnalyzer;

/// Per-file ceiling for the analyzer subprocess. The tool is known to hang
/// on long inputs.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(600);

/// One row of the feature table: the join key plus analyzer-defined metric
/// columns. BTreeMap keeps the column order deterministic across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRow {
    pub key: String,
    pub metrics: BTreeMap<String, String>,
}

pub struct ProsodyAnalyzer {
    bin: String,
}

impl ProsodyAnalyzer {
    pub fn new(bin: &str) -> Self {
        Self {
            bin: bin.to_string(),
        }
    }
}

#[async_trait]
impl FeatureAnalyzer for ProsodyAnalyzer {
    async fn analyze(&self, wav: &Path) -> Result<Option<FeatureRow>> {
        let key = wav
            .file_stem()
            .and_then(|s| s.to_str())
            .context("wav path has no file stem")?
            .to_string();

        info!(wav = %wav.display(), "Analyzing");

        let output = tokio::time::timeout(
            ANALYZE_TIMEOUT,
            tokio::process::Command::new(&self.bin).arg(wav).output(),
        )
        .await
        .with_context(|| format!("analyzer timed out on {}", wav.display()))?
        .with_context(|| format!("failed to run analyzer on {}", wav.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("analyzer exited with error: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let row = parse_metrics(&stdout, &key);
        if row.is_none() {
            warn!(wav = %wav.display(), "Analyzer declined file, skipping");
        }
        Ok(row)
    }
}

/// Parse the analyzer's stdout table. First non-empty line is a header,
/// each following line is `<metric name> <value>` with the value last.
/// A "Try again" line anywhere marks the file as unprocessable.
pub fn parse_metrics(output: &str, key: &str) -> Option<FeatureRow> {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.iter().any(|l| l.contains("Try again")) {
        return None;
    }
    if lines.len() < 2 {
        return None;
    }

    let mut metrics = BTreeMap::new();
    for line in &lines[1..] {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((value, name_parts)) = parts.split_last() else {
            continue;
        };
        if name_parts.is_empty() {
            continue;
        }
        metrics.insert(name_parts.join(" "), value.to_string());
    }

    if metrics.is_empty() {
        return None;
    }
    Some(FeatureRow {
        key: key.to_string(),
        metrics,
    })
}
