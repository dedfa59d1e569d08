use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

const KINASE_ACCESSION: &str = "KIN_ACC_ID";
const SUBSTRATE_ACCESSION: &str = "SUB_ACC_ID";
const KINASE_ORGANISM: &str = "KIN_ORGANISM";
const SUBSTRATE_ORGANISM: &str = "SUB_ORGANISM";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("reference dataset has no header row with KIN_ACC_ID and SUB_ACC_ID")]
    MissingHeader,
}

/// One verified kinase-substrate pair of the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferencePair {
    pub kinase_accession: String,
    pub substrate_accession: String,
}

impl ReferencePair {
    pub fn new(kinase_accession: impl Into<String>, substrate_accession: impl Into<String>) -> Self {
        Self {
            kinase_accession: kinase_accession.into(),
            substrate_accession: substrate_accession.into(),
        }
    }
}

/// Ground-truth pairs, queried by exact membership only.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    pairs: HashSet<ReferencePair>,
}

impl ReferenceSet {
    pub fn from_pairs(pairs: impl IntoIterator<Item = ReferencePair>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    /// Read a PhosphoSitePlus `Kinase_Substrate_Dataset` export.
    ///
    /// The file is Latin-1 encoded and starts with a free-text preamble, so
    /// bytes are decoded lossily and lines are skipped up to the header row.
    pub fn load(path: &Path, organism: Option<&str>) -> Result<Self, ReferenceError> {
        let bytes = std::fs::read(path).map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let set = Self::from_tsv(&text, organism)?;

        tracing::info!(path = %path.display(), pairs = set.len(), "Loaded reference dataset");
        Ok(set)
    }

    /// Parse tab-separated rows. With `organism` set, rows whose kinase or
    /// substrate organism column differs are dropped.
    pub fn from_tsv(text: &str, organism: Option<&str>) -> Result<Self, ReferenceError> {
        let mut lines = text.lines();

        let header: Vec<&str> = lines
            .by_ref()
            .map(|line| line.split('\t').map(str::trim).collect::<Vec<_>>())
            .find(|cols| cols.contains(&KINASE_ACCESSION) && cols.contains(&SUBSTRATE_ACCESSION))
            .ok_or(ReferenceError::MissingHeader)?;

        let column = |name: &str| header.iter().position(|c| *c == name);
        let (Some(kin_col), Some(sub_col)) = (column(KINASE_ACCESSION), column(SUBSTRATE_ACCESSION))
        else {
            return Err(ReferenceError::MissingHeader);
        };
        let organism_cols = [column(KINASE_ORGANISM), column(SUBSTRATE_ORGANISM)];

        let mut pairs = HashSet::new();
        for line in lines {
            let cols: Vec<&str> = line.split('\t').map(str::trim).collect();

            if let Some(wanted) = organism {
                let matches = organism_cols
                    .iter()
                    .flatten()
                    .all(|&i| cols.get(i).is_some_and(|v| v.eq_ignore_ascii_case(wanted)));
                if !matches {
                    continue;
                }
            }

            match (cols.get(kin_col), cols.get(sub_col)) {
                (Some(kin), Some(sub)) if !kin.is_empty() && !sub.is_empty() => {
                    pairs.insert(ReferencePair::new(*kin, *sub));
                }
                _ => {}
            }
        }

        Ok(Self { pairs })
    }

    pub fn contains(&self, kinase_accession: &str, substrate_accession: &str) -> bool {
        self.pairs
            .contains(&ReferencePair::new(kinase_accession, substrate_accession))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PSP_SAMPLE: &str = "Kinase-substrate dataset\n\
        Copyright notice line\n\
        \n\
        GENE\tKINASE\tKIN_ACC_ID\tKIN_ORGANISM\tSUBSTRATE\tSUB_GENE_ID\tSUB_ACC_ID\tSUB_GENE\tSUB_ORGANISM\n\
        CDK2\tCDK2\tP24941\thuman\tRb\t5925\tP06400\tRB1\thuman\n\
        Cdk2\tCDK2\tP97377\tmouse\tRb\t19645\tP13405\tRb1\tmouse\n\
        CDK1\tCDK1\tP06493\thuman\tRb\t5925\tP06400\tRB1\thuman\n\
        CDK1\tCDK1\tP06493\thuman\tRb\t19645\tP13405\tRb1\tmouse\n\
        broken\trow\n";

    #[test]
    fn test_from_tsv_filters_organism() {
        let set = ReferenceSet::from_tsv(PSP_SAMPLE, Some("human")).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("P24941", "P06400"));
        assert!(set.contains("P06493", "P06400"));
        assert!(!set.contains("P06493", "P13405"));
    }

    #[test]
    fn test_from_tsv_without_filter() {
        let set = ReferenceSet::from_tsv(PSP_SAMPLE, None).unwrap();
        assert_eq!(set.len(), 4);
        assert!(set.contains("P97377", "P13405"));
    }

    #[test]
    fn test_membership_is_directional() {
        let set = ReferenceSet::from_pairs([ReferencePair::new("P24941", "P06400")]);
        assert!(set.contains("P24941", "P06400"));
        assert!(!set.contains("P06400", "P24941"));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            ReferenceSet::from_tsv("just\tsome\tcolumns\n", None),
            Err(ReferenceError::MissingHeader)
        ));
    }

    #[test]
    fn test_load_latin1_file() {
        let dir = std::env::temp_dir().join(format!("reference-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Kinase_Substrate_Dataset");

        let mut bytes = b"PhosphoSitePlus \xa9 dataset\n".to_vec();
        bytes.extend_from_slice(b"KIN_ACC_ID\tSUB_ACC_ID\nP24941\tP06400\n");
        std::fs::write(&path, bytes).unwrap();

        let set = ReferenceSet::load(&path, Some("human")).unwrap();
        assert!(set.contains("P24941", "P06400"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
