use extract::ExpandedRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::reference::ReferenceSet;
use crate::resolver::{CanonicalIdentity, IdentifierResolver};

/// An expanded record with both of its names resolved.
#[derive(Debug, Clone)]
pub struct ResolvedRecord {
    pub record: ExpandedRecord,
    pub substrate: CanonicalIdentity,
    pub actor: CanonicalIdentity,
}

/// A final table row: the expanded record plus its accessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciledRow {
    #[serde(flatten)]
    pub record: ExpandedRecord,
    pub substrate_accession: Option<String>,
    pub actor_accession: Option<String>,
    /// True when the accession pair is present in the reference dataset.
    pub matches_reference: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolutionFailure {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub corroborated: Vec<ReconciledRow>,
    pub uncorroborated: Vec<ReconciledRow>,
    /// Corroborated rows dropped as repeats of an earlier accession pair.
    pub collapsed_duplicates: usize,
    pub resolution_failures: Vec<ResolutionFailure>,
}

/// Resolve substrate and actor names of every record, in input order.
pub async fn resolve_records(
    records: Vec<ExpandedRecord>,
    resolver: &IdentifierResolver,
) -> (Vec<ResolvedRecord>, Vec<ResolutionFailure>) {
    let mut failures = BTreeSet::new();
    let mut resolved = Vec::with_capacity(records.len());

    for record in records {
        let substrate = resolve_or_record(resolver, &record.substrate_symbol, &mut failures).await;
        let actor = resolve_or_record(resolver, &record.actor_name, &mut failures).await;
        resolved.push(ResolvedRecord {
            record,
            substrate,
            actor,
        });
    }

    (resolved, failures.into_iter().collect())
}

async fn resolve_or_record(
    resolver: &IdentifierResolver,
    name: &str,
    failures: &mut BTreeSet<ResolutionFailure>,
) -> CanonicalIdentity {
    match resolver.resolve(name).await {
        Ok(identity) => identity,
        Err(e) => {
            failures.insert(ResolutionFailure {
                name: e.name,
                message: e.message,
            });
            CanonicalIdentity::not_found(name)
        }
    }
}

/// Split resolved records into corroborated and uncorroborated rows.
///
/// Every input lands in exactly one partition; corroborated rows are then
/// deduplicated by `(substrate_accession, actor_accession)`, first seen wins.
pub fn partition(resolved: Vec<ResolvedRecord>, reference: &ReferenceSet) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for ResolvedRecord {
        record,
        substrate,
        actor,
    } in resolved
    {
        let substrate_accession = substrate.accession.as_found().map(str::to_string);
        let actor_accession = actor.accession.as_found().map(str::to_string);

        let pair = match (&substrate_accession, &actor_accession) {
            (Some(sub), Some(act)) if reference.contains(act, sub) => Some((sub.clone(), act.clone())),
            _ => None,
        };

        let row = ReconciledRow {
            record,
            substrate_accession,
            actor_accession,
            matches_reference: pair.is_some(),
        };

        match pair {
            Some(pair) => {
                if seen.insert(pair) {
                    result.corroborated.push(row);
                } else {
                    result.collapsed_duplicates += 1;
                }
            }
            None => result.uncorroborated.push(row),
        }
    }

    result
}

pub async fn reconcile(
    records: Vec<ExpandedRecord>,
    reference: &ReferenceSet,
    resolver: &IdentifierResolver,
) -> ReconciliationResult {
    let (resolved, failures) = resolve_records(records, resolver).await;
    let mut result = partition(resolved, reference);
    result.resolution_failures = failures;

    tracing::info!(
        corroborated = result.corroborated.len(),
        uncorroborated = result.uncorroborated.len(),
        collapsed = result.collapsed_duplicates,
        failures = result.resolution_failures.len(),
        "Reconciled records against reference dataset"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferencePair;
    use crate::resolver::Accession;
    use crate::resolver::tests::CountingLookup;
    use extract::Role;
    use ingest::LookupFilter;
    use std::sync::Arc;
    use std::time::Duration;

    fn expanded(substrate: &str, actor: &str, site: Option<&str>) -> ExpandedRecord {
        ExpandedRecord {
            substrate_symbol: substrate.to_string(),
            actor_name: actor.to_string(),
            role: Role::Kinase,
            site: site.map(str::to_string),
            evidence_id: None,
            uncertain: false,
            raw_line: format!("{actor}(kinase), {substrate}(substrate), N/A, N/A"),
            origin: None,
        }
    }

    fn identity(symbol: &str, accession: Option<&str>) -> CanonicalIdentity {
        CanonicalIdentity {
            symbol: symbol.to_string(),
            accession: match accession {
                Some(acc) => Accession::Found(acc.to_string()),
                None => Accession::NotFound,
            },
        }
    }

    fn resolved(
        record: ExpandedRecord,
        substrate: Option<&str>,
        actor: Option<&str>,
    ) -> ResolvedRecord {
        ResolvedRecord {
            substrate: identity(&record.substrate_symbol, substrate),
            actor: identity(&record.actor_name, actor),
            record,
        }
    }

    fn reference() -> ReferenceSet {
        ReferenceSet::from_pairs([ReferencePair::new("P24941", "P06400")])
    }

    #[test]
    fn test_matching_pair_is_corroborated() {
        let result = partition(
            vec![resolved(expanded("RB1", "CDK2", None), Some("P06400"), Some("P24941"))],
            &reference(),
        );

        assert_eq!(result.corroborated.len(), 1);
        assert!(result.uncorroborated.is_empty());
        assert!(result.corroborated[0].matches_reference);
        assert_eq!(result.corroborated[0].actor_accession.as_deref(), Some("P24941"));
    }

    #[test]
    fn test_unresolved_side_is_never_corroborated() {
        let result = partition(
            vec![
                resolved(expanded("RB1", "CDK2", None), None, Some("P24941")),
                resolved(expanded("RB1", "CDK2", None), Some("P06400"), None),
                resolved(expanded("RB1", "", None), Some("P06400"), None),
            ],
            &reference(),
        );

        assert!(result.corroborated.is_empty());
        assert_eq!(result.uncorroborated.len(), 3);
        assert!(result.uncorroborated.iter().all(|r| !r.matches_reference));
    }

    #[test]
    fn test_reversed_pair_is_not_corroborated() {
        let result = partition(
            vec![resolved(expanded("CDK2", "RB1", None), Some("P24941"), Some("P06400"))],
            &reference(),
        );
        assert_eq!(result.uncorroborated.len(), 1);
    }

    #[test]
    fn test_corroborated_pairs_are_deduplicated() {
        let result = partition(
            vec![
                resolved(expanded("RB1", "CDK2", Some("Ser-807")), Some("P06400"), Some("P24941")),
                resolved(expanded("RB1", "CDK2", Some("Ser-811")), Some("P06400"), Some("P24941")),
            ],
            &reference(),
        );

        assert_eq!(result.corroborated.len(), 1);
        assert_eq!(result.corroborated[0].record.site.as_deref(), Some("Ser-807"));
        assert_eq!(result.collapsed_duplicates, 1);
    }

    #[test]
    fn test_uncorroborated_keeps_repeats() {
        let result = partition(
            vec![
                resolved(expanded("RB1", "PKC", Some("Ser-807")), Some("P06400"), Some("P17252")),
                resolved(expanded("RB1", "PKC", Some("Ser-807")), Some("P06400"), Some("P17252")),
            ],
            &reference(),
        );
        assert_eq!(result.uncorroborated.len(), 2);
        assert_eq!(result.collapsed_duplicates, 0);
    }

    #[test]
    fn test_partition_is_total() {
        let inputs = vec![
            resolved(expanded("RB1", "CDK2", None), Some("P06400"), Some("P24941")),
            resolved(expanded("RB1", "CDK2", None), Some("P06400"), Some("P24941")),
            resolved(expanded("RB1", "CDK2", None), Some("P06400"), Some("P24941")),
            resolved(expanded("RB1", "PLK1", None), Some("P06400"), Some("P53350")),
            resolved(expanded("RB1", "", None), Some("P06400"), None),
        ];
        let total = inputs.len();
        let result = partition(inputs, &reference());

        assert_eq!(
            result.corroborated.len() + result.collapsed_duplicates + result.uncorroborated.len(),
            total
        );
    }

    #[tokio::test]
    async fn test_reconcile_resolves_through_index() {
        let mut lookup = CountingLookup::new(&[("CDK2", "P24941", "CDK2")]);
        lookup.failing.push("PKC".to_string());
        let lookup = Arc::new(lookup);
        let resolver = IdentifierResolver::new(lookup.clone(), LookupFilter::default(), Duration::from_secs(5));
        resolver.seed("RB1", "P06400");

        let records = vec![
            expanded("RB1", "CDK2", Some("Ser-807")),
            expanded("RB1", "CDK2", Some("Ser-811")),
            expanded("RB1", "PKC", None),
            expanded("RB1", "PKC", Some("Thr-5")),
        ];
        let result = reconcile(records, &reference(), &resolver).await;

        assert_eq!(result.corroborated.len(), 1);
        assert_eq!(result.collapsed_duplicates, 1);
        assert_eq!(result.uncorroborated.len(), 2);
        assert_eq!(
            result.resolution_failures,
            vec![ResolutionFailure {
                name: "PKC".to_string(),
                message: "transport error: connection reset".to_string(),
            }]
        );
        // CDK2 and PKC once each; RB1 was seeded.
        assert_eq!(lookup.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
