use anyhow::{Context, Result};
use extract::{
    AnnotationRef, AzureOpenAiClient, ExpandedRecord, ExtractError, Extractor, OllamaClient,
    TextGenerator, expand,
};
use futures::stream::{self, StreamExt};
use ingest::{
    AnnotationSource, AnnotationText, IdentifierLookup, ProteinAnnotations, UniProtClient,
};
use reconcile::{ReconciledRow, ReferenceSet, reconcile};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, LlmProvider, PipelineConfig, ReferenceConfig};
use crate::context::RunContext;
use crate::metrics::{RunMetrics, TimedOperation};
use crate::output::{FailureStage, ItemFailure, ParseErrorRow, PipelineOutput, RunSummary, TableRow};
use crate::retry::RetryPolicy;

pub struct Pipeline {
    source: Arc<dyn AnnotationSource>,
    lookup: Arc<dyn IdentifierLookup>,
    extractor: Extractor,
    reference: ReferenceSet,
    config: PipelineConfig,
}

/// Everything one protein contributed to a run.
struct ProteinOutcome {
    accession: String,
    protein_name: Option<String>,
    rows: Vec<ExpandedRecord>,
    parse_errors: Vec<ParseErrorRow>,
    failures: Vec<ItemFailure>,
}

impl ProteinOutcome {
    fn new(accession: &str) -> Self {
        Self {
            accession: accession.to_string(),
            protein_name: None,
            rows: Vec::new(),
            parse_errors: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(
        &mut self,
        metrics: &RunMetrics,
        annotation_index: Option<usize>,
        stage: FailureStage,
        message: String,
    ) {
        tracing::warn!(
            accession = %self.accession,
            annotation_index = ?annotation_index,
            stage = ?stage,
            error = %message,
            "Skipping failed item"
        );
        metrics.record_failure();
        self.failures.push(ItemFailure {
            protein_accession: self.accession.clone(),
            annotation_index,
            stage,
            message,
        });
    }
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn AnnotationSource>,
        generator: Arc<dyn TextGenerator>,
        lookup: Arc<dyn IdentifierLookup>,
        reference: ReferenceSet,
        config: PipelineConfig,
    ) -> Self {
        let extractor = Extractor::new(
            generator,
            Duration::from_secs(config.llm.request_timeout_secs),
        );

        Self {
            source,
            lookup,
            extractor,
            reference,
            config,
        }
    }

    /// Wire the UniProt client, the configured text generator and the reference dataset.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let uniprot = Arc::new(
            UniProtClient::new(config.uniprot_config()).context("failed to build UniProt client")?,
        );
        let generator = text_generator(&config.llm)?;
        let reference = load_reference(&config.reference)?;

        Ok(Self::new(
            uniprot.clone(),
            generator,
            uniprot,
            reference,
            config,
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process `accessions` and reconcile everything extracted from them.
    ///
    /// Per-item failures are collected in the output; the run itself never fails.
    pub async fn run(&self, accessions: &[String]) -> PipelineOutput {
        let timer = TimedOperation::start();
        let ctx = RunContext::new(self.config.clone(), self.lookup.clone());
        let workers = ctx.config.concurrency.max_concurrent_proteins.max(1);

        tracing::info!(
            run_id = %ctx.run_id,
            proteins = accessions.len(),
            workers,
            "Starting run"
        );

        let outcomes: Vec<ProteinOutcome> = stream::iter(accessions)
            .map(|accession| self.process_protein(&ctx, accession))
            .buffered(workers)
            .collect()
            .await;

        let mut records = Vec::new();
        let mut parse_errors = Vec::new();
        let mut failures = Vec::new();
        let mut protein_names = HashMap::new();
        for outcome in outcomes {
            if let Some(name) = outcome.protein_name {
                protein_names.insert(outcome.accession, name);
            }
            records.extend(outcome.rows);
            parse_errors.extend(outcome.parse_errors);
            failures.extend(outcome.failures);
        }

        let result = reconcile(records, &self.reference, &ctx.resolver).await;

        // One failure per annotation that used the name.
        for failure in &result.resolution_failures {
            let mut origins: Vec<&AnnotationRef> = Vec::new();
            for origin in result
                .uncorroborated
                .iter()
                .filter(|row| {
                    row.record.substrate_symbol == failure.name || row.record.actor_name == failure.name
                })
                .filter_map(|row| row.record.origin.as_ref())
            {
                if !origins.contains(&origin) {
                    origins.push(origin);
                }
            }

            for origin in origins {
                ctx.metrics.record_failure();
                failures.push(ItemFailure {
                    protein_accession: origin.protein_accession.clone(),
                    annotation_index: Some(origin.annotation_index),
                    stage: FailureStage::Resolution,
                    message: format!("{}: {}", failure.name, failure.message),
                });
            }
        }

        let summary = RunSummary {
            metrics: ctx.metrics.snapshot(),
            corroborated: result.corroborated.len(),
            uncorroborated: result.uncorroborated.len(),
            duplicates_collapsed: result.collapsed_duplicates,
            lookups_issued: ctx.resolver.lookups_issued(),
            elapsed_ms: timer.elapsed().as_millis() as u64,
        };

        tracing::info!(
            run_id = %ctx.run_id,
            corroborated = summary.corroborated,
            uncorroborated = summary.uncorroborated,
            parse_errors = parse_errors.len(),
            failures = failures.len(),
            lookups = summary.lookups_issued,
            elapsed_ms = summary.elapsed_ms,
            "Run complete"
        );

        PipelineOutput {
            run_id: ctx.run_id,
            corroborated: result
                .corroborated
                .into_iter()
                .map(|row| table_row(row, &protein_names))
                .collect(),
            uncorroborated: result
                .uncorroborated
                .into_iter()
                .map(|row| table_row(row, &protein_names))
                .collect(),
            parse_errors,
            failures,
            accession_index: ctx.resolver.accession_index(),
            summary,
        }
    }

    async fn process_protein(&self, ctx: &RunContext, accession: &str) -> ProteinOutcome {
        let timer = TimedOperation::start();
        let mut outcome = ProteinOutcome::new(accession);
        let timeout = Duration::from_secs(ctx.config.concurrency.source_timeout_secs);

        let protein = match tokio::time::timeout(timeout, self.source.annotations(accession)).await {
            Ok(Ok(protein)) => protein,
            Ok(Err(e)) if e.is_not_found() => {
                tracing::warn!(accession = %accession, "Protein not found, no annotations");
                ProteinAnnotations::empty(accession)
            }
            Ok(Err(e)) => {
                outcome.fail(&ctx.metrics, None, FailureStage::Source, e.to_string());
                return outcome;
            }
            Err(_) => {
                outcome.fail(
                    &ctx.metrics,
                    None,
                    FailureStage::Source,
                    format!("annotation source timed out after {}s", timeout.as_secs()),
                );
                return outcome;
            }
        };

        ctx.resolver.seed(&protein.symbol, &protein.accession);
        outcome.protein_name = protein.protein_name.clone();

        let limit = ctx
            .config
            .annotations
            .max_per_protein
            .unwrap_or(protein.annotations.len());
        let annotations = &protein.annotations[..limit.min(protein.annotations.len())];
        ctx.metrics.record_protein(timer.elapsed(), annotations.len());

        tracing::info!(
            accession = %accession,
            symbol = %protein.symbol,
            annotations = annotations.len(),
            "Processing protein"
        );

        // Annotations of one protein stay sequential so their rows keep input order.
        for (index, annotation) in annotations.iter().enumerate() {
            self.process_annotation(ctx, index, annotation, &mut outcome)
                .await;
        }

        outcome
    }

    async fn process_annotation(
        &self,
        ctx: &RunContext,
        index: usize,
        annotation: &AnnotationText,
        outcome: &mut ProteinOutcome,
    ) {
        let retry = RetryPolicy::from_config(&ctx.config.retry);
        let timer = TimedOperation::start();

        let result = retry
            .retry("generate", ExtractError::is_transient, || {
                self.extractor.extract(annotation)
            })
            .await;

        let records = match result {
            Ok(records) => records,
            Err(ExtractError::EmptyInput) => {
                outcome.fail(
                    &ctx.metrics,
                    Some(index),
                    FailureStage::EmptyInput,
                    ExtractError::EmptyInput.to_string(),
                );
                return;
            }
            Err(e) => {
                ctx.metrics.record_generation(timer.elapsed());
                let stage = match e {
                    ExtractError::Timeout(_) => FailureStage::Timeout,
                    _ => FailureStage::Generation,
                };
                outcome.fail(&ctx.metrics, Some(index), stage, e.to_string());
                return;
            }
        };
        ctx.metrics.record_generation(timer.elapsed());

        let origin = AnnotationRef {
            protein_accession: outcome.accession.clone(),
            annotation_index: index,
        };

        let mut parse_errors = 0;
        let mut expanded = 0;
        for record in &records {
            if let Some(error) = record.parse_error() {
                tracing::debug!(
                    accession = %outcome.accession,
                    annotation_index = index,
                    line = %record.raw_line,
                    error = %error,
                    "Unparseable response line"
                );
                parse_errors += 1;
                outcome.parse_errors.push(ParseErrorRow {
                    protein_accession: outcome.accession.clone(),
                    annotation_index: index,
                    raw_line: record.raw_line.clone(),
                    error: error.clone(),
                    message: error.to_string(),
                });
                continue;
            }

            for row in expand(record) {
                expanded += 1;
                outcome.rows.push(row.with_origin(origin.clone()));
            }
        }

        ctx.metrics.record_parsed(records.len(), parse_errors, expanded);
    }
}

pub async fn run_pipeline(pipeline: &Pipeline, accessions: &[String]) -> PipelineOutput {
    pipeline.run(accessions).await
}

fn table_row(row: ReconciledRow, protein_names: &HashMap<String, String>) -> TableRow {
    let protein_accession = row
        .record
        .origin
        .as_ref()
        .map(|o| o.protein_accession.clone())
        .unwrap_or_default();

    TableRow {
        protein_name: protein_names.get(&protein_accession).cloned(),
        protein_accession,
        row,
    }
}

pub fn text_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider {
        LlmProvider::Ollama => Ok(Arc::new(OllamaClient::new(
            config.base_url.clone(),
            config.model.clone(),
            config.request_timeout_secs,
        ))),
        LlmProvider::Azure => {
            let endpoint = config
                .azure_endpoint
                .clone()
                .context("azure provider needs an endpoint")?;
            let api_key = config
                .api_key
                .clone()
                .context("azure provider needs an API key")?;
            Ok(Arc::new(
                AzureOpenAiClient::new(
                    endpoint,
                    config.azure_deployment.clone(),
                    config.azure_api_version.clone(),
                    api_key,
                    config.request_timeout_secs,
                )
                .with_temperature(config.temperature),
            ))
        }
    }
}

/// Load the reference dataset; without a configured path the set is empty.
pub fn load_reference(config: &ReferenceConfig) -> Result<ReferenceSet> {
    match &config.path {
        Some(path) => ReferenceSet::load(path, config.organism.as_deref())
            .with_context(|| format!("failed to load reference dataset {}", path.display())),
        None => {
            tracing::warn!("No reference dataset configured, nothing will be corroborated");
            Ok(ReferenceSet::default())
        }
    }
}
