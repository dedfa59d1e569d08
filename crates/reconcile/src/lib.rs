pub mod engine;
pub mod reference;
pub mod resolver;

pub use engine::{
    partition, reconcile, resolve_records, ReconciledRow, ReconciliationResult, ResolutionFailure,
    ResolvedRecord,
};
pub use reference::{ReferenceError, ReferencePair, ReferenceSet};
pub use resolver::{Accession, CanonicalIdentity, IdentifierResolver, ResolveError};
