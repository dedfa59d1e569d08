use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnnotationKind {
    Ptm,
    Function,
}

/// One free-text PTM/FUNCTION description attached to a protein.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnnotationText {
    pub protein_accession: String,
    pub protein_symbol: String,
    pub kind: AnnotationKind,
    pub text: String,
}

/// Everything the annotation source knows about one protein.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProteinAnnotations {
    pub accession: String,
    pub symbol: String,
    pub protein_name: Option<String>,
    pub annotations: Vec<AnnotationText>,
}

impl ProteinAnnotations {
    /// A protein the source has never heard of: zero annotations.
    pub fn empty(accession: &str) -> Self {
        Self {
            accession: accession.to_string(),
            symbol: accession.to_string(),
            protein_name: None,
            annotations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupFilter {
    pub organism_id: u32,
    pub reviewed_only: bool,
    pub first_match_only: bool,
}

impl Default for LookupFilter {
    fn default() -> Self {
        Self {
            organism_id: 9606, // human
            reviewed_only: true,
            first_match_only: true,
        }
    }
}

/// A canonical entry returned by the identifier lookup service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupEntry {
    pub accession: String,
    pub preferred_symbol: Option<String>,
}
