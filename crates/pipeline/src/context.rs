use ingest::IdentifierLookup;
use reconcile::IdentifierResolver;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::metrics::RunMetrics;

/// State owned by a single run: the accession index and the run's counters.
/// Created at run start and dropped with the run.
pub struct RunContext {
    pub run_id: Uuid,
    pub resolver: IdentifierResolver,
    pub metrics: Arc<RunMetrics>,
    pub config: PipelineConfig,
}

impl RunContext {
    pub fn new(config: PipelineConfig, lookup: Arc<dyn IdentifierLookup>) -> Self {
        let resolver = IdentifierResolver::new(
            lookup,
            config.uniprot.filter.clone(),
            Duration::from_secs(config.concurrency.lookup_timeout_secs),
        );

        Self {
            run_id: Uuid::new_v4(),
            resolver,
            metrics: RunMetrics::new(),
            config,
        }
    }
}
