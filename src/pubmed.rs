//! PubMed E-utilities client.
//!
//! Endpoints used:
//! - `esearch.fcgi` to turn a query into PMIDs (JSON)
//! - `efetch.fcgi` to download full records (XML)
//!
//! NCBI asks unauthenticated clients to stay under 3 requests per second, so
//! batches are fetched sequentially with a fixed pause in between.

use crate::error::{OptionExt, PubmedError, Result};
use crate::models::Paper;
use crate::parser::parse_papers;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// E-utilities base URL
pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Tool name reported to NCBI
const TOOL_NAME: &str = "rustpubmed";

/// Default number of PMIDs per efetch request
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Pause between consecutive efetch batches
pub const BATCH_DELAY: Duration = Duration::from_millis(500);

/// Requests sent for one call when NCBI keeps answering 429, first one included
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff before the first retry; doubles on each further retry
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// PubMed E-utilities client
#[derive(Debug, Clone)]
pub struct PubMedClient {
    client: Client,
    base_url: String,
    email: Option<String>,
    api_key: Option<String>,
    retry_backoff: Duration,
    batch_delay: Duration,
}

impl PubMedClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `email` - Contact address (recommended by NCBI)
    /// * `api_key` - NCBI API key for higher rate limits
    pub fn new(email: Option<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(format!("{}/{}", TOOL_NAME, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PubmedError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: EUTILS_BASE.to_string(),
            email: email.filter(|e| !e.trim().is_empty()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            retry_backoff: RETRY_BACKOFF,
            batch_delay: BATCH_DELAY,
        })
    }

    /// Point the client at a mirror or test server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the 429 backoff and the pause between batches.
    pub fn with_delays(mut self, retry_backoff: Duration, batch_delay: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self.batch_delay = batch_delay;
        self
    }

    /// Parameters sent with every request
    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", TOOL_NAME.to_string())];
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    fn search_params(&self, query: &str, max_results: usize) -> Vec<(&'static str, String)> {
        let mut params = self.common_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("term", query.to_string()));
        params.push(("retmax", max_results.to_string()));
        params.push(("retmode", "json".to_string()));
        params
    }

    fn fetch_params(&self, pubmed_ids: &[String]) -> Vec<(&'static str, String)> {
        let mut params = self.common_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("id", pubmed_ids.join(",")));
        params.push(("retmode", "xml".to_string()));
        params
    }

    /// Search PubMed and return matching PMIDs.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        info!(query = query, max_results = max_results, "Starting PubMed search");

        let url = format!("{}/esearch.fcgi", self.base_url);
        let body = self.get_text(&url, &self.search_params(query, max_results)).await?;
        let ids = parse_search_response(&body)?;

        info!(count = ids.len(), "PubMed search complete");
        Ok(ids)
    }

    /// Fetch the XML records for a set of PMIDs.
    ///
    /// Returns an empty string without a request when `pubmed_ids` is empty.
    pub async fn fetch_details(&self, pubmed_ids: &[String]) -> Result<String> {
        if pubmed_ids.is_empty() {
            return Ok(String::new());
        }

        let url = format!("{}/efetch.fcgi", self.base_url);
        debug!(count = pubmed_ids.len(), "Fetching PubMed records");
        self.get_text(&url, &self.fetch_params(pubmed_ids)).await
    }

    /// Fetch records in batches of `batch_size`, pausing between batches.
    pub async fn fetch_batches(&self, pubmed_ids: &[String], batch_size: usize) -> Result<Vec<String>> {
        let batch_size = batch_size.max(1);
        let batch_count = pubmed_ids.len().div_ceil(batch_size);
        let mut responses = Vec::with_capacity(batch_count);

        for (batch_idx, chunk) in pubmed_ids.chunks(batch_size).enumerate() {
            info!(
                batch = batch_idx + 1,
                total_batches = batch_count,
                papers = chunk.len(),
                "Fetching batch"
            );

            let xml = self.fetch_details(chunk).await?;
            if !xml.trim().is_empty() {
                responses.push(xml);
            }

            if batch_idx + 1 < batch_count {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        Ok(responses)
    }

    /// Fetch and parse the records for `pubmed_ids`.
    pub async fn fetch_papers(&self, pubmed_ids: &[String]) -> Result<Vec<Paper>> {
        let responses = self.fetch_batches(pubmed_ids, DEFAULT_BATCH_SIZE).await?;

        let mut papers = Vec::with_capacity(pubmed_ids.len());
        for xml in &responses {
            papers.extend(parse_papers(xml)?);
        }

        info!(requested = pubmed_ids.len(), parsed = papers.len(), "Parsed PubMed records");
        Ok(papers)
    }

    /// GET with exponential backoff on HTTP 429, at most `MAX_ATTEMPTS` requests
    async fn get_text(&self, url: &str, params: &[(&'static str, String)]) -> Result<String> {
        let mut attempt: u32 = 1;

        loop {
            let response = self.client.get(url).query(params).send().await?;
            let status = response.status();

            if status.is_success() {
                return response.text().await.map_err(PubmedError::Network);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if attempt < MAX_ATTEMPTS {
                    let backoff = self.retry_backoff * 2u32.pow(attempt - 1);
                    warn!(
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited by NCBI, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                    continue;
                }
                return Err(PubmedError::RateLimited(60));
            }

            return Err(PubmedError::Api {
                code: status.as_u16() as i32,
                message: format!("E-utilities error: {}", status),
            });
        }
    }
}

/// Extract `esearchresult.idlist` from an esearch JSON body.
pub fn parse_search_response(body: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(body)?;

    if let Some(message) = value["esearchresult"]["ERROR"].as_str() {
        return Err(PubmedError::Api {
            code: 200,
            message: format!("esearch error: {}", message),
        });
    }

    let ids = value["esearchresult"]["idlist"]
        .as_array()
        .ok_or_parse("Unexpected esearch response: missing esearchresult.idlist")?
        .iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();

    Ok(ids)
}
