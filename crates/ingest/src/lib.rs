pub mod annotation;
pub mod client;
pub mod entry;
pub mod error;

pub use annotation::{AnnotationKind, AnnotationText, LookupEntry, LookupFilter, ProteinAnnotations};
pub use client::{UniProtClient, UniProtConfig};
pub use entry::UniProtEntry;
pub use error::SourceError;

use async_trait::async_trait;

/// Supplies the canonical symbol and annotation texts of a protein.
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    async fn annotations(&self, accession: &str) -> Result<ProteinAnnotations, SourceError>;
}

/// Resolves a free-text protein name to at most one canonical entry.
#[async_trait]
pub trait IdentifierLookup: Send + Sync {
    async fn lookup(
        &self,
        name: &str,
        filter: &LookupFilter,
    ) -> Result<Option<LookupEntry>, SourceError>;
}
