use anyhow::{Context, Result};
use extract::ParseError;
use reconcile::ReconciledRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::metrics::MetricsSnapshot;

/// One row of the corroborated or uncorroborated table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableRow {
    pub protein_accession: String,
    /// Recommended full name of the annotated protein.
    pub protein_name: Option<String>,
    #[serde(flatten)]
    pub row: ReconciledRow,
}

/// A response line that failed to parse, kept for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseErrorRow {
    pub protein_accession: String,
    pub annotation_index: usize,
    pub raw_line: String,
    pub error: ParseError,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Source,
    EmptyInput,
    Generation,
    Timeout,
    Resolution,
}

/// A unit of work that was skipped; re-running only these is always safe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemFailure {
    pub protein_accession: String,
    /// `None` when the whole protein failed.
    pub annotation_index: Option<usize>,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    pub corroborated: usize,
    pub uncorroborated: usize,
    pub duplicates_collapsed: usize,
    pub lookups_issued: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub corroborated: Vec<TableRow>,
    pub uncorroborated: Vec<TableRow>,
    pub parse_errors: Vec<ParseErrorRow>,
    pub failures: Vec<ItemFailure>,
    /// Symbol -> accession pairs resolved during the run.
    pub accession_index: BTreeMap<String, String>,
    pub summary: RunSummary,
}

impl PipelineOutput {
    /// Write every table as pretty JSON into `{base}/run_{run_id}/`.
    pub async fn write_to(&self, base: &Path) -> Result<PathBuf> {
        let dir = base.join(format!("run_{}", self.run_id));
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        write_json(&dir, "corroborated.json", &self.corroborated).await?;
        write_json(&dir, "uncorroborated.json", &self.uncorroborated).await?;
        write_json(&dir, "parse_errors.json", &self.parse_errors).await?;
        write_json(&dir, "failures.json", &self.failures).await?;
        write_json(&dir, "accession_index.json", &self.accession_index).await?;
        write_json(&dir, "summary.json", &self.summary).await?;

        tracing::info!(dir = %dir.display(), "Wrote run output");
        Ok(dir)
    }
}

async fn write_json<T: Serialize + ?Sized>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let path = dir.join(name);
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{ExpandedRecord, Role};

    fn row() -> TableRow {
        TableRow {
            protein_accession: "P06400".to_string(),
            protein_name: Some("Retinoblastoma-associated protein".to_string()),
            row: ReconciledRow {
                record: ExpandedRecord {
                    substrate_symbol: "RB1".to_string(),
                    actor_name: "CDK2".to_string(),
                    role: Role::Kinase,
                    site: Some("Ser-807".to_string()),
                    evidence_id: Some("PubMed:1".to_string()),
                    uncertain: false,
                    raw_line: "CDK2(kinase), RB1(substrate), Ser-807(location), PubMed:1".to_string(),
                    origin: None,
                },
                substrate_accession: Some("P06400".to_string()),
                actor_accession: Some("P24941".to_string()),
                matches_reference: true,
            },
        }
    }

    #[test]
    fn test_table_row_is_flat() {
        let json = serde_json::to_value(row()).unwrap();
        assert_eq!(json["protein_accession"], "P06400");
        assert_eq!(json["protein_name"], "Retinoblastoma-associated protein");
        assert_eq!(json["actor_name"], "CDK2");
        assert_eq!(json["role"], "KINASE");
        assert_eq!(json["actor_accession"], "P24941");
        assert_eq!(json["matches_reference"], true);
    }

    #[tokio::test]
    async fn test_write_to_creates_run_directory() {
        let base = std::env::temp_dir().join(format!("pipeline-output-{}", Uuid::new_v4()));
        let output = PipelineOutput {
            run_id: Uuid::new_v4(),
            corroborated: vec![row()],
            uncorroborated: Vec::new(),
            parse_errors: Vec::new(),
            failures: Vec::new(),
            accession_index: BTreeMap::new(),
            summary: RunSummary::default(),
        };

        let dir = output.write_to(&base).await.unwrap();
        assert!(dir.ends_with(format!("run_{}", output.run_id)));

        let written = std::fs::read_to_string(dir.join("corroborated.json")).unwrap();
        let rows: Vec<TableRow> = serde_json::from_str(&written).unwrap();
        assert_eq!(rows, vec![row()]);
        assert!(dir.join("summary.json").exists());

        std::fs::remove_dir_all(&base).unwrap();
    }
}
