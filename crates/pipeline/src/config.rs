use anyhow::{Context, Result, bail};
use ingest::UniProtConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub uniprot: UniProtConfig,
    pub llm: LlmConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub reference: ReferenceConfig,
    pub output: OutputConfig,
    pub annotations: AnnotationConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Azure,
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "azure" | "azure_openai" | "openai" => Ok(LlmProvider::Azure),
            other => bail!("unknown LLM provider {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Ollama server URL.
    pub base_url: String,
    pub model: String,
    pub azure_endpoint: Option<String>,
    pub azure_deployment: String,
    pub azure_api_version: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            azure_endpoint: None,
            azure_deployment: "gpt-4o".to_string(),
            azure_api_version: "2024-02-01".to_string(),
            api_key: None,
            temperature: 0.1,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Proteins in flight at once; 1 keeps every external call sequential.
    pub max_concurrent_proteins: usize,
    pub source_timeout_secs: u64,
    pub lookup_timeout_secs: u64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_proteins: 1,
            source_timeout_secs: 60,
            lookup_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// PhosphoSitePlus `Kinase_Substrate_Dataset` path. Without one nothing is corroborated.
    pub path: Option<PathBuf>,
    /// Organism kept from the dataset; `None` keeps every row.
    pub organism: Option<String>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            path: None,
            organism: Some("human".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Also extract from FUNCTION comments that mention phosphorylation.
    pub include_function_comments: bool,
    /// Cap on annotations processed per protein.
    pub max_per_protein: Option<usize>,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_override(|key| std::env::var(key).ok())
    }

    /// Environment values take precedence over file values.
    pub fn with_env_override(mut self, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = env("UNIPROT_BASE_URL") {
            self.uniprot.base_url = url;
        }
        if let Some(provider) = env("LLM_PROVIDER") {
            self.llm.provider = provider.parse()?;
        }
        if let Some(url) = env("LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = env("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(endpoint) = env("AZURE_OPENAI_ENDPOINT") {
            self.llm.azure_endpoint = Some(endpoint);
        }
        if let Some(deployment) = env("AZURE_OPENAI_DEPLOYMENT") {
            self.llm.azure_deployment = deployment;
        }
        if let Some(version) = env("AZURE_OPENAI_API_VERSION") {
            self.llm.azure_api_version = version;
        }
        // Secrets only ever come from the environment.
        if let Some(key) = env("VERSA_API_KEY").or_else(|| env("AZURE_OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(n) = env("PHOSPHO_MAX_CONCURRENCY") {
            self.concurrency.max_concurrent_proteins = n
                .parse()
                .with_context(|| format!("PHOSPHO_MAX_CONCURRENCY must be a number, got {n:?}"))?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency.max_concurrent_proteins == 0 {
            bail!("concurrency.max_concurrent_proteins must be at least 1");
        }
        if self.llm.provider == LlmProvider::Azure {
            if self.llm.azure_endpoint.is_none() {
                bail!("azure provider needs AZURE_OPENAI_ENDPOINT or llm.azure_endpoint");
            }
            if self.llm.api_key.is_none() {
                bail!("azure provider needs VERSA_API_KEY or AZURE_OPENAI_API_KEY");
            }
        }
        Ok(())
    }

    /// UniProt settings with the annotation options folded in.
    pub fn uniprot_config(&self) -> UniProtConfig {
        UniProtConfig {
            include_function_comments: self.uniprot.include_function_comments
                || self.annotations.include_function_comments,
            ..self.uniprot.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.concurrency.max_concurrent_proteins, 1);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.uniprot.filter.organism_id, 9606);
        assert_eq!(config.reference.organism.as_deref(), Some("human"));
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
    }

    #[test]
    fn test_partial_toml() {
        let config = PipelineConfig::from_toml(
            r#"
            [llm]
            model = "mistral"

            [retry]
            max_retries = 2

            [reference]
            path = "data/Kinase_Substrate_Dataset"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_backoff_ms, 1000);
        assert_eq!(
            config.reference.path.as_deref(),
            Some(Path::new("data/Kinase_Substrate_Dataset"))
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let config = PipelineConfig::from_toml("[llm]\nmodel = \"mistral\"\n")
            .unwrap()
            .with_env_override(env(&[
                ("LLM_MODEL", "llama3.1"),
                ("PHOSPHO_MAX_CONCURRENCY", "4"),
                ("UNIPROT_BASE_URL", "http://localhost:9000"),
            ]))
            .unwrap();

        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.concurrency.max_concurrent_proteins, 4);
        assert_eq!(config.uniprot.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_azure_requires_key() {
        let result = PipelineConfig::default().with_env_override(env(&[
            ("LLM_PROVIDER", "azure"),
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
        ]));
        assert!(result.is_err());

        let config = PipelineConfig::default()
            .with_env_override(env(&[
                ("LLM_PROVIDER", "azure"),
                ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
                ("VERSA_API_KEY", "secret"),
            ]))
            .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_concurrency() {
        assert!(
            PipelineConfig::default()
                .with_env_override(env(&[("PHOSPHO_MAX_CONCURRENCY", "many")]))
                .is_err()
        );
        assert!(
            PipelineConfig::default()
                .with_env_override(env(&[("PHOSPHO_MAX_CONCURRENCY", "0")]))
                .is_err()
        );
    }

    #[test]
    fn test_annotation_section_folds_into_uniprot() {
        let mut config = PipelineConfig::default();
        config.annotations.include_function_comments = true;
        assert!(config.uniprot_config().include_function_comments);
    }
}
