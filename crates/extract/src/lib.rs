pub mod error;
pub mod expander;
pub mod llm;
pub mod normalizer;
pub mod parser;
pub mod prompt;
pub mod schema;

pub use error::{ExtractError, ParseError};
pub use expander::{expand, expand_all};
pub use llm::{AzureOpenAiClient, OllamaClient, TextGenerator};
pub use parser::parse;
pub use prompt::{build_extraction_prompt, ExtractionRequest};
pub use schema::{AnnotationRef, ExpandedRecord, Interaction, InteractionRecord, Role};

use ingest::AnnotationText;
use std::sync::Arc;
use std::time::Duration;

pub struct Extractor {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl Extractor {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Build the request for one annotation and run it through generation and parsing.
    pub async fn extract(
        &self,
        annotation: &AnnotationText,
    ) -> Result<Vec<InteractionRecord>, ExtractError> {
        let request = build_extraction_prompt(&annotation.text, &annotation.protein_symbol)?;
        let raw = self.generate(&request).await?;

        let mut records = parse(&raw);
        for record in &mut records {
            record.bind_substrate(&annotation.protein_symbol);
        }

        tracing::debug!(
            accession = %annotation.protein_accession,
            records = records.len(),
            "Parsed extraction response"
        );

        Ok(records)
    }

    /// One bounded call to the text-generation service.
    pub async fn generate(&self, request: &ExtractionRequest) -> Result<String, ExtractError> {
        tokio::time::timeout(self.timeout, self.generator.generate(request))
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout.as_secs()))?
    }
}
