use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::annotation::{LookupEntry, LookupFilter, ProteinAnnotations};
use crate::entry::{SearchResponse, UniProtEntry};
use crate::error::SourceError;
use crate::{AnnotationSource, IdentifierLookup};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniProtConfig {
    pub base_url: String,
    pub page_size: usize,
    pub timeout_secs: u64,
    /// Also hand phospho-relevant FUNCTION comments to extraction.
    pub include_function_comments: bool,
    pub filter: LookupFilter,
}

impl Default for UniProtConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rest.uniprot.org/uniprotkb".to_string(),
            page_size: 500,
            timeout_secs: 30,
            include_function_comments: false,
            filter: LookupFilter::default(),
        }
    }
}

#[derive(Clone)]
pub struct UniProtClient {
    config: UniProtConfig,
    client: reqwest::Client,
}

impl UniProtClient {
    pub fn new(config: UniProtConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn default() -> Result<Self, SourceError> {
        Self::new(UniProtConfig::default())
    }

    /// Accessions of reviewed entries matching `query`, following cursor
    /// pagination until `limit` accessions are collected.
    pub async fn search_accessions(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        let full_query = filtered_query(query, &self.config.filter);
        let size = limit.min(self.config.page_size).max(1);
        let url = format!("{}/search", self.config.base_url);

        let mut accessions = Vec::new();
        let mut response = self
            .client
            .get(&url)
            .query(&[
                ("query", full_query.as_str()),
                ("format", "json"),
                ("size", size.to_string().as_str()),
            ])
            .send()
            .await?;

        loop {
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let next = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_page_url);

            let page: SearchResponse = response.json().await?;
            accessions.extend(page.results.into_iter().map(|e| e.primary_accession));

            if accessions.len() >= limit {
                accessions.truncate(limit);
                break;
            }

            match next {
                Some(next_url) => {
                    tracing::debug!(url = %next_url, fetched = accessions.len(), "Fetching next UniProt page");
                    response = self.client.get(&next_url).send().await?;
                }
                None => break,
            }
        }

        Ok(accessions)
    }

    pub async fn fetch_entry(&self, accession: &str) -> Result<UniProtEntry, SourceError> {
        let url = format!("{}/{}.json", self.config.base_url, accession);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(accession.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AnnotationSource for UniProtClient {
    async fn annotations(&self, accession: &str) -> Result<ProteinAnnotations, SourceError> {
        let entry = self.fetch_entry(accession).await?;
        Ok(entry.into_annotations(self.config.include_function_comments))
    }
}

#[async_trait]
impl IdentifierLookup for UniProtClient {
    async fn lookup(
        &self,
        name: &str,
        filter: &LookupFilter,
    ) -> Result<Option<LookupEntry>, SourceError> {
        let url = format!("{}/search", self.config.base_url);
        let query = filtered_query(&quote_name(name), filter);
        let size = if filter.first_match_only { 1 } else { self.config.page_size };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("format", "json"),
                ("size", size.to_string().as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let page: SearchResponse = response.json().await?;

        Ok(page.results.into_iter().next().map(|entry| LookupEntry {
            preferred_symbol: entry.gene_symbol().map(str::to_string),
            accession: entry.primary_accession,
        }))
    }
}

/// Restrict a query to the filter's review status and organism.
pub fn filtered_query(query: &str, filter: &LookupFilter) -> String {
    let mut q = format!("({})", query);
    if filter.reviewed_only {
        q.push_str(" AND reviewed:true");
    }
    q.push_str(&format!(" AND organism_id:{}", filter.organism_id));
    q
}

/// Names with characters the query syntax treats specially are searched as a phrase.
fn quote_name(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', ""))
    }
}

/// Extract the `rel="next"` target of a `Link` header.
fn next_page_url(link_header: &str) -> Option<String> {
    link_header
        .split(',')
        .find(|part| part.contains("rel=\"next\""))
        .and_then(|part| {
            let start = part.find('<')?;
            let end = part.find('>')?;
            (start < end).then(|| part[start + 1..end].to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_query() {
        let filter = LookupFilter::default();
        assert_eq!(
            filtered_query("kinase", &filter),
            "(kinase) AND reviewed:true AND organism_id:9606"
        );

        let unreviewed = LookupFilter {
            reviewed_only: false,
            organism_id: 10090,
            first_match_only: true,
        };
        assert_eq!(
            filtered_query("CDK2", &unreviewed),
            "(CDK2) AND organism_id:10090"
        );
    }

    #[test]
    fn test_quote_name() {
        assert_eq!(quote_name("CDK2"), "CDK2");
        assert_eq!(quote_name("GSK3-beta"), "GSK3-beta");
        assert_eq!(quote_name("CAK/CDK7"), "\"CAK/CDK7\"");
        assert_eq!(quote_name("casein kinase II"), "\"casein kinase II\"");
    }

    #[test]
    fn test_next_page_url() {
        let header = r#"<https://rest.uniprot.org/uniprotkb/search?cursor=abc&size=5>; rel="next""#;
        assert_eq!(
            next_page_url(header).as_deref(),
            Some("https://rest.uniprot.org/uniprotkb/search?cursor=abc&size=5")
        );
        assert_eq!(next_page_url(r#"<https://x>; rel="prev""#), None);
        assert_eq!(next_page_url(""), None);
    }
}
