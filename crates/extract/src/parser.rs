use regex::Regex;
use std::sync::LazyLock;

use crate::error::ParseError;
use crate::normalizer::{self, is_not_available, is_placeholder, normalize_name};
use crate::schema::{Interaction, InteractionRecord, Role};

/// A trailing parenthetical: `NAME (tag)`.
static TRAILING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^()]*)\)\s*$").expect("valid regex"));

/// Any parenthetical inside an actor clause.
static INNER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(([^()]*)\)").expect("valid regex"));

const FIELD_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoleTag {
    role: Role,
    uncertain: bool,
}

/// Parse a text-generation response into interaction records.
///
/// Blank lines and `N/A` sentinel lines produce nothing. Every other line
/// produces exactly one record, malformed lines included. Records keep the
/// line exactly as the response had it.
pub fn parse(raw: &str) -> Vec<InteractionRecord> {
    raw.lines()
        .filter(|line| !line.trim().is_empty() && !is_not_available(line))
        .map(parse_line)
        .collect()
}

pub fn parse_line(line: &str) -> InteractionRecord {
    match decompose(line.trim()) {
        Ok(interaction) => InteractionRecord::parsed(line, interaction),
        Err(error) => InteractionRecord::malformed(line, error),
    }
}

fn decompose(line: &str) -> Result<Interaction, ParseError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount(fields.len()));
    }

    let (tag, mut actors) = parse_actor(fields[0])?;
    let substrate_symbol = parse_substrate(fields[1])?;
    let site = parse_site(fields[2])?;
    let evidence_id = parse_evidence(fields[3]);

    for actor in &mut actors {
        if actor.eq_ignore_ascii_case("{kinase_name}") {
            *actor = substrate_symbol.clone();
        }
    }

    let mut role = tag.role;
    if role == Role::KinaseAndSubstrate && actors.is_empty() {
        actors.push(substrate_symbol.clone());
    }
    // A (kinase/substrate) tag on some other protein is a plain kinase claim.
    if role == Role::KinaseAndSubstrate
        && !is_placeholder(&substrate_symbol)
        && actors
            .iter()
            .any(|a| !a.eq_ignore_ascii_case(&substrate_symbol) && !is_placeholder(a))
    {
        role = Role::Kinase;
    }
    if role == Role::Kinase
        && !actors.is_empty()
        && actors.iter().all(|a| a.eq_ignore_ascii_case(&substrate_symbol))
    {
        role = Role::KinaseAndSubstrate;
    }

    Ok(Interaction {
        substrate_symbol,
        actors,
        role,
        site,
        evidence_id,
        uncertain: tag.uncertain,
    })
}

fn classify_tag(content: &str) -> Option<RoleTag> {
    let tag: String = content
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let (role, uncertain) = match tag.as_str() {
        "kinase" => (Role::Kinase, false),
        "kinase/uncertain" => (Role::Kinase, true),
        "kinase/substrate" => (Role::KinaseAndSubstrate, false),
        "phosphatase" | "phosphotase" => (Role::Phosphatase, false),
        _ => return None,
    };
    Some(RoleTag { role, uncertain })
}

/// Tag text that is clearly meant as a pipeline tag rather than an alias.
fn looks_like_tag(content: &str) -> bool {
    let lower = content.to_lowercase();
    ["kinase", "phosphatase", "phosphotase", "substrate", "location", "uncertain"]
        .iter()
        .any(|word| lower.contains(word))
}

fn parse_actor(field: &str) -> Result<(RoleTag, Vec<String>), ParseError> {
    let caps = TRAILING_TAG
        .captures(field)
        .ok_or_else(|| ParseError::MissingRoleTag(field.to_string()))?;

    let (Some(whole), Some(content)) = (caps.get(0), caps.get(1)) else {
        return Err(ParseError::MissingRoleTag(field.to_string()));
    };

    let mut tag = match classify_tag(content.as_str()) {
        Some(tag) => tag,
        None if looks_like_tag(content.as_str()) => {
            return Err(ParseError::UnknownRoleTag(content.as_str().trim().to_string()));
        }
        None => return Err(ParseError::MissingRoleTag(field.to_string())),
    };

    let clause = &field[..whole.start()];

    // Co-actors may repeat the shared tag: "WEE1(kinase) and WEE2(kinase)".
    for inner in INNER_TAG.captures_iter(clause) {
        let Some(content) = inner.get(1) else { continue };
        match classify_tag(content.as_str()) {
            Some(other) if other.role == tag.role => tag.uncertain |= other.uncertain,
            Some(_) => return Err(ParseError::MixedRoleTags(field.to_string())),
            None => {}
        }
    }
    let clause = INNER_TAG.replace_all(clause, |caps: &regex::Captures| {
        let is_role = caps
            .get(1)
            .is_some_and(|c| classify_tag(c.as_str()).is_some());
        if is_role {
            String::new()
        } else {
            caps[0].to_string()
        }
    });

    Ok((tag, normalizer::split_actor_list(&clause)))
}

fn parse_substrate(field: &str) -> Result<String, ParseError> {
    let caps = TRAILING_TAG
        .captures(field)
        .filter(|c| c.get(1).is_some_and(|t| t.as_str().trim().eq_ignore_ascii_case("substrate")))
        .ok_or_else(|| ParseError::MissingSubstrateTag(field.to_string()))?;

    let end = caps.get(0).map_or(field.len(), |m| m.start());
    let name = normalize_name(&field[..end]);
    if name.is_empty() || is_not_available(&name) {
        return Err(ParseError::EmptySubstrate);
    }
    Ok(name)
}

fn parse_site(field: &str) -> Result<Option<String>, ParseError> {
    if field.is_empty() || is_not_available(field) {
        return Ok(None);
    }

    let caps = TRAILING_TAG
        .captures(field)
        .filter(|c| c.get(1).is_some_and(|t| t.as_str().trim().eq_ignore_ascii_case("location")))
        .ok_or_else(|| ParseError::MissingLocationTag(field.to_string()))?;

    let end = caps.get(0).map_or(field.len(), |m| m.start());
    let site = normalize_name(&field[..end]);
    if site.is_empty() || is_not_available(&site) {
        Ok(None)
    } else {
        Ok(Some(site))
    }
}

fn parse_evidence(field: &str) -> Option<String> {
    let evidence = field.trim();
    if evidence.is_empty() || is_not_available(evidence) || is_placeholder(evidence) {
        None
    } else {
        Some(evidence.to_string())
    }
}
