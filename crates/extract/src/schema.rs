use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::normalizer;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Kinase,
    Phosphatase,
    /// Autophosphorylation: the protein is its own kinase.
    KinaseAndSubstrate,
}

/// The typed fields of a well-formed response line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub substrate_symbol: String,
    /// Entity names sharing one role tag; empty means "unknown actor".
    pub actors: Vec<String>,
    pub role: Role,
    pub site: Option<String>,
    pub evidence_id: Option<String>,
    pub uncertain: bool,
}

/// One response line, either decomposed or kept for diagnostics only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub raw_line: String,
    pub content: Result<Interaction, ParseError>,
}

impl InteractionRecord {
    pub fn parsed(raw_line: impl Into<String>, interaction: Interaction) -> Self {
        Self {
            raw_line: raw_line.into(),
            content: Ok(interaction),
        }
    }

    pub fn malformed(raw_line: impl Into<String>, error: ParseError) -> Self {
        Self {
            raw_line: raw_line.into(),
            content: Err(error),
        }
    }

    pub fn interaction(&self) -> Option<&Interaction> {
        self.content.as_ref().ok()
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.content.as_ref().err()
    }

    /// Fill placeholder or empty substrate/actor names with the symbol of the
    /// annotated protein.
    pub fn bind_substrate(&mut self, symbol: &str) {
        let Ok(interaction) = &mut self.content else {
            return;
        };

        if interaction.substrate_symbol.is_empty()
            || normalizer::is_placeholder(&interaction.substrate_symbol)
        {
            interaction.substrate_symbol = symbol.to_string();
        }

        for actor in &mut interaction.actors {
            if normalizer::is_placeholder(actor) {
                *actor = interaction.substrate_symbol.clone();
            }
        }

        if interaction.role == Role::Kinase
            && !interaction.actors.is_empty()
            && interaction
                .actors
                .iter()
                .all(|a| a.eq_ignore_ascii_case(&interaction.substrate_symbol))
        {
            interaction.role = Role::KinaseAndSubstrate;
        }
    }
}

/// Where an extracted row came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationRef {
    pub protein_accession: String,
    pub annotation_index: usize,
}

/// An interaction narrowed to exactly one actor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpandedRecord {
    pub substrate_symbol: String,
    /// Empty when no actor was named.
    pub actor_name: String,
    pub role: Role,
    pub site: Option<String>,
    pub evidence_id: Option<String>,
    pub uncertain: bool,
    pub raw_line: String,
    pub origin: Option<AnnotationRef>,
}

impl ExpandedRecord {
    pub fn with_origin(mut self, origin: AnnotationRef) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn has_actor(&self) -> bool {
        !self.actor_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(substrate: &str, actors: &[&str]) -> Interaction {
        Interaction {
            substrate_symbol: substrate.to_string(),
            actors: actors.iter().map(|a| a.to_string()).collect(),
            role: Role::Kinase,
            site: None,
            evidence_id: None,
            uncertain: false,
        }
    }

    #[test]
    fn test_bind_substrate_fills_placeholders() {
        let mut record = InteractionRecord::parsed(
            "{kinase_name}(kinase), {substrate}(substrate), N/A, N/A",
            interaction("{substrate}", &["{kinase_name}"]),
        );
        record.bind_substrate("AURKB");

        let bound = record.interaction().unwrap();
        assert_eq!(bound.substrate_symbol, "AURKB");
        assert_eq!(bound.actors, vec!["AURKB"]);
        assert_eq!(bound.role, Role::KinaseAndSubstrate);
    }

    #[test]
    fn test_bind_substrate_keeps_named_substrate() {
        let mut record = InteractionRecord::parsed("x", interaction("RB1", &["CDK2"]));
        record.bind_substrate("CDK1");

        let bound = record.interaction().unwrap();
        assert_eq!(bound.substrate_symbol, "RB1");
        assert_eq!(bound.role, Role::Kinase);
    }

    #[test]
    fn test_bind_substrate_ignores_malformed() {
        let mut record = InteractionRecord::malformed("junk", ParseError::FieldCount(1));
        record.bind_substrate("RB1");
        assert!(record.interaction().is_none());
        assert_eq!(record.parse_error(), Some(&ParseError::FieldCount(1)));
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::KinaseAndSubstrate).unwrap();
        assert_eq!(json, "\"KINASE_AND_SUBSTRATE\"");
    }
}
