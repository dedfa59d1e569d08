use dashmap::DashMap;
use ingest::{IdentifierLookup, LookupFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accession {
    Found(String),
    NotFound,
}

impl Accession {
    pub fn as_found(&self) -> Option<&str> {
        match self {
            Accession::Found(acc) => Some(acc),
            Accession::NotFound => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    pub symbol: String,
    pub accession: Accession,
}

impl CanonicalIdentity {
    pub fn not_found(name: &str) -> Self {
        Self {
            symbol: name.to_string(),
            accession: Accession::NotFound,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("lookup for {name:?} failed: {message}")]
pub struct ResolveError {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone)]
enum Resolution {
    Resolved(CanonicalIdentity),
    Failed(String),
}

/// Maps free-text names to canonical identities, at most one external
/// lookup per distinct name per run.
pub struct IdentifierResolver {
    lookup: Arc<dyn IdentifierLookup>,
    filter: LookupFilter,
    timeout: Duration,
    /// The accession index, keyed by exact name.
    index: DashMap<String, Arc<OnceCell<Resolution>>>,
    lookups_issued: AtomicUsize,
}

impl IdentifierResolver {
    pub fn new(lookup: Arc<dyn IdentifierLookup>, filter: LookupFilter, timeout: Duration) -> Self {
        Self {
            lookup,
            filter,
            timeout,
            index: DashMap::new(),
            lookups_issued: AtomicUsize::new(0),
        }
    }

    /// Record an identity that is already known, e.g. the annotated protein itself.
    pub fn seed(&self, symbol: &str, accession: &str) {
        let identity = CanonicalIdentity {
            symbol: symbol.to_string(),
            accession: Accession::Found(accession.to_string()),
        };
        self.index
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new_with(Some(Resolution::Resolved(identity)))));
    }

    pub async fn resolve(&self, name: &str) -> Result<CanonicalIdentity, ResolveError> {
        if name.trim().is_empty() {
            return Ok(CanonicalIdentity::not_found(name));
        }

        // The map guard is released before awaiting; concurrent misses on the
        // same name wait on one shared cell.
        let cell = self.index.entry(name.to_string()).or_default().clone();
        let resolution = cell.get_or_init(|| self.lookup_once(name)).await;

        match resolution {
            Resolution::Resolved(identity) => Ok(identity.clone()),
            Resolution::Failed(message) => Err(ResolveError {
                name: name.to_string(),
                message: message.clone(),
            }),
        }
    }

    async fn lookup_once(&self, name: &str) -> Resolution {
        self.lookups_issued.fetch_add(1, Ordering::Relaxed);

        match tokio::time::timeout(self.timeout, self.lookup.lookup(name, &self.filter)).await {
            Ok(Ok(Some(entry))) => {
                tracing::debug!(name = %name, accession = %entry.accession, "Resolved name");
                Resolution::Resolved(CanonicalIdentity {
                    symbol: entry.preferred_symbol.unwrap_or_else(|| name.to_string()),
                    accession: Accession::Found(entry.accession),
                })
            }
            Ok(Ok(None)) => Resolution::Resolved(CanonicalIdentity::not_found(name)),
            Ok(Err(e)) if e.is_not_found() => Resolution::Resolved(CanonicalIdentity::not_found(name)),
            Ok(Err(e)) => {
                tracing::warn!(name = %name, error = %e, "Identifier lookup failed");
                Resolution::Failed(e.to_string())
            }
            Err(_) => {
                tracing::warn!(name = %name, timeout_secs = self.timeout.as_secs(), "Identifier lookup timed out");
                Resolution::Failed(format!("timed out after {}s", self.timeout.as_secs()))
            }
        }
    }

    pub fn lookups_issued(&self) -> usize {
        self.lookups_issued.load(Ordering::Relaxed)
    }

    /// Resolved symbol -> accession pairs known so far.
    pub fn accession_index(&self) -> BTreeMap<String, String> {
        self.index
            .iter()
            .filter_map(|entry| match entry.value().get() {
                Some(Resolution::Resolved(CanonicalIdentity {
                    accession: Accession::Found(acc),
                    ..
                })) => Some((entry.key().clone(), acc.clone())),
                _ => None,
            })
            .collect()
    }
}
