//! JSON Lines table files.
//!
//! Each table is written as one JSON object per row. A summary manifest
//! with the campaign id, creation time and totals is written next to them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::table::{FlatTables, ScoreRow, TableName};
use crate::domain::ports::TableSink;

/// File extension of row tables.
pub const EXTENSION: &str = "jsonl";

/// Manifest describing one persisted campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    /// Random id assigned when the tables were written
    pub campaign_id: Uuid,
    /// Write time
    pub created_at: DateTime<Utc>,
    /// Table base name
    pub name: String,
    /// Number of rows in each table
    pub rows: usize,
    /// Number of envelopes represented
    pub envelopes: usize,
    /// Rows classified as target
    pub targets: usize,
    /// Target rows over all rows
    pub target_rate: f64,
    /// Parameter table file name
    pub params_file: String,
    /// Score table file name
    pub scores_file: String,
}

impl CampaignSummary {
    /// Summary of `tables` stored under `name`.
    pub fn new(name: &TableName, tables: &FlatTables) -> Self {
        Self {
            campaign_id: Uuid::new_v4(),
            created_at: Utc::now(),
            name: name.to_string(),
            rows: tables.len(),
            envelopes: tables.n_envelopes(),
            targets: tables.n_targets(),
            target_rate: tables.target_rate(),
            params_file: name.params_file(EXTENSION),
            scores_file: name.scores_file(EXTENSION),
        }
    }
}

fn to_lines<T: Serialize>(rows: &[T]) -> DomainResult<String> {
    let mut out = String::new();
    for row in rows {
        let line = serde_json::to_string(row)?;
        // Writing to a String cannot fail
        let _ = writeln!(out, "{line}");
    }
    Ok(out)
}

/// Writes tables as `<name>_params.jsonl`, `<name>_scores.jsonl` and
/// `<name>_summary.json` under one directory.
#[derive(Debug, Clone)]
pub struct JsonlTableSink {
    dir: PathBuf,
}

impl JsonlTableSink {
    /// Sink writing into `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TableSink for JsonlTableSink {
    async fn write(&self, name: &TableName, tables: &FlatTables) -> DomainResult<Vec<PathBuf>> {
        if tables.params.len() != tables.scores.len() {
            return Err(DomainError::DataConsistency(format!(
                "{} parameter rows but {} score rows",
                tables.params.len(),
                tables.scores.len()
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let params_path = self.dir.join(name.params_file(EXTENSION));
        tokio::fs::write(&params_path, to_lines(&tables.params)?).await?;

        let scores_path = self.dir.join(name.scores_file(EXTENSION));
        tokio::fs::write(&scores_path, to_lines(&tables.scores)?).await?;

        let summary = CampaignSummary::new(name, tables);
        let summary_path = self.dir.join(format!("{name}_summary.json"));
        tokio::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?).await?;

        info!(
            campaign_id = %summary.campaign_id,
            rows = summary.rows,
            dir = %self.dir.display(),
            "Wrote campaign tables"
        );
        Ok(vec![params_path, scores_path, summary_path])
    }
}

/// Read a score table written by [`JsonlTableSink`].
pub async fn read_scores(path: impl AsRef<Path>) -> DomainResult<Vec<ScoreRow>> {
    let contents = tokio::fs::read_to_string(path.as_ref()).await?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                DomainError::Serialization(format!("line {}: {e}", i + 1))
            })
        })
        .collect()
}
