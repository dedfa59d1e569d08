use serde::Deserialize;

use crate::annotation::{AnnotationKind, AnnotationText, ProteinAnnotations};

/// Words that mark a FUNCTION comment as relevant to phosphorylation.
const PHOSPHO_KEYWORDS: &[&str] = &[
    "phosphorylation",
    "phosphorylates",
    "phosphorylated",
    "phosphorylate",
    "autophosphorylation",
    "dephosphorylate",
    "kinase",
    "substrate",
];

/// The subset of a UniProtKB JSON entry the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniProtEntry {
    pub primary_accession: String,
    #[serde(default)]
    pub genes: Vec<Gene>,
    #[serde(default)]
    pub protein_description: Option<ProteinDescription>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gene {
    pub gene_name: Option<TextValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinDescription {
    pub recommended_name: Option<RecommendedName>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedName {
    pub full_name: Option<TextValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_type: String,
    #[serde(default)]
    pub texts: Vec<TextValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub value: String,
}

/// Body of `/uniprotkb/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<UniProtEntry>,
}

impl UniProtEntry {
    /// The preferred gene symbol (first gene's name).
    pub fn gene_symbol(&self) -> Option<&str> {
        self.genes
            .first()
            .and_then(|g| g.gene_name.as_ref())
            .map(|n| n.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn protein_name(&self) -> Option<&str> {
        self.protein_description
            .as_ref()
            .and_then(|d| d.recommended_name.as_ref())
            .and_then(|r| r.full_name.as_ref())
            .map(|n| n.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn ptm_texts(&self) -> Vec<&str> {
        self.comment_texts("PTM")
    }

    pub fn function_texts(&self) -> Vec<&str> {
        self.comment_texts("FUNCTION")
    }

    /// FUNCTION texts that talk about phosphorylation at all.
    pub fn phospho_function_texts(&self) -> Vec<&str> {
        self.function_texts()
            .into_iter()
            .filter(|text| {
                let lower = text.to_lowercase();
                PHOSPHO_KEYWORDS.iter().any(|k| lower.contains(k))
            })
            .collect()
    }

    fn comment_texts(&self, comment_type: &str) -> Vec<&str> {
        self.comments
            .iter()
            .filter(|c| c.comment_type == comment_type)
            .flat_map(|c| c.texts.iter())
            .map(|t| t.value.as_str())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Convert into annotation texts; PTM comments always, phospho-relevant
    /// FUNCTION comments when asked for.
    pub fn into_annotations(self, include_function: bool) -> ProteinAnnotations {
        let accession = self.primary_accession.clone();
        let symbol = self
            .gene_symbol()
            .map(str::to_string)
            .unwrap_or_else(|| accession.clone());

        let make = |kind: AnnotationKind, text: &str| AnnotationText {
            protein_accession: accession.clone(),
            protein_symbol: symbol.clone(),
            kind,
            text: text.to_string(),
        };

        let mut annotations: Vec<AnnotationText> = self
            .ptm_texts()
            .into_iter()
            .map(|t| make(AnnotationKind::Ptm, t))
            .collect();

        if include_function {
            annotations.extend(
                self.phospho_function_texts()
                    .into_iter()
                    .map(|t| make(AnnotationKind::Function, t)),
            );
        }

        ProteinAnnotations {
            protein_name: self.protein_name().map(str::to_string),
            accession: accession.clone(),
            symbol: symbol.clone(),
            annotations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdk1_entry() -> UniProtEntry {
        serde_json::from_str(
            r#"{
                "primaryAccession": "P06493",
                "genes": [{"geneName": {"value": "CDK1"}}],
                "proteinDescription": {
                    "recommendedName": {"fullName": {"value": "Cyclin-dependent kinase 1"}}
                },
                "comments": [
                    {"commentType": "FUNCTION", "texts": [
                        {"value": "Plays a key role in the control of the eukaryotic cell cycle."},
                        {"value": "Phosphorylates PRKCA during mitosis."}
                    ]},
                    {"commentType": "PTM", "texts": [
                        {"value": "Phosphorylation at Thr-161 by CAK/CDK7 activates kinase activity (PubMed:20360007)."},
                        {"value": ""}
                    ]},
                    {"commentType": "PTM", "texts": [
                        {"value": "Phosphorylation at Tyr-15 by WEE1 and WEE2 inhibits the protein kinase activity."}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_entry_fields() {
        let entry = cdk1_entry();
        assert_eq!(entry.gene_symbol(), Some("CDK1"));
        assert_eq!(entry.protein_name(), Some("Cyclin-dependent kinase 1"));
        assert_eq!(entry.ptm_texts().len(), 2);
        assert_eq!(entry.function_texts().len(), 2);
    }

    #[test]
    fn test_phospho_function_filter() {
        let entry = cdk1_entry();
        let texts = entry.phospho_function_texts();
        assert_eq!(texts, vec!["Phosphorylates PRKCA during mitosis."]);
    }

    #[test]
    fn test_into_annotations() {
        let annotations = cdk1_entry().into_annotations(false);
        assert_eq!(annotations.symbol, "CDK1");
        assert_eq!(annotations.annotations.len(), 2);
        assert!(annotations.annotations.iter().all(|a| a.kind == AnnotationKind::Ptm));
        assert_eq!(annotations.annotations[0].protein_accession, "P06493");

        let with_function = cdk1_entry().into_annotations(true);
        assert_eq!(with_function.annotations.len(), 3);
        assert_eq!(with_function.annotations[2].kind, AnnotationKind::Function);
    }

    #[test]
    fn test_symbol_falls_back_to_accession() {
        let entry: UniProtEntry =
            serde_json::from_str(r#"{"primaryAccession": "Q9XXXX"}"#).unwrap();
        let annotations = entry.into_annotations(true);
        assert_eq!(annotations.symbol, "Q9XXXX");
        assert!(annotations.annotations.is_empty());
        assert!(annotations.protein_name.is_none());
    }
}
