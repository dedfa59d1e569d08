use crate::schema::{ExpandedRecord, Interaction, InteractionRecord};

/// Fan a record out into one row per listed actor.
///
/// A record without named actors yields a single row with an empty actor.
/// Malformed records yield nothing: they are diagnostics, not data.
pub fn expand(record: &InteractionRecord) -> Vec<ExpandedRecord> {
    let Some(interaction) = record.interaction() else {
        return Vec::new();
    };

    if interaction.actors.is_empty() {
        return vec![row(interaction, &record.raw_line, String::new())];
    }

    interaction
        .actors
        .iter()
        .map(|actor| row(interaction, &record.raw_line, actor.clone()))
        .collect()
}

pub fn expand_all<'a>(records: impl IntoIterator<Item = &'a InteractionRecord>) -> Vec<ExpandedRecord> {
    records.into_iter().flat_map(expand).collect()
}

fn row(interaction: &Interaction, raw_line: &str, actor_name: String) -> ExpandedRecord {
    ExpandedRecord {
        substrate_symbol: interaction.substrate_symbol.clone(),
        actor_name,
        role: interaction.role,
        site: interaction.site.clone(),
        evidence_id: interaction.evidence_id.clone(),
        uncertain: interaction.uncertain,
        raw_line: raw_line.to_string(),
        origin: None,
    }
}
