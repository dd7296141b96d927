use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::IndexError;
use crate::extract::record::Record;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";
const MAX_HEALTH_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 1000;
/// Documents per import request. Boundaries are invisible to callers: the
/// report always covers the whole batch.
const IMPORT_CHUNK: usize = 250;

/// Typesense client covering the collection operations the pipeline needs:
/// health probe, create, drop, bulk upsert, and a document count.
pub struct SinkClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    collection: String,
}

/// Aggregate result of a bulk import.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub accepted: usize,
    pub failures: Vec<String>,
}

/// One line of the bulk import response.
#[derive(Debug, Deserialize)]
struct ImportLine {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub num_documents: u64,
}

impl SinkClient {
    pub fn new(config: &Config) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IndexError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probe `/health` with exponential backoff. Auth failures abort
    /// immediately: retrying a rejected key cannot succeed.
    pub async fn check_health(&self) -> Result<(), IndexError> {
        let url = self.url("/health");
        let mut backoff = BASE_BACKOFF_MS;
        let mut last_transport: Option<IndexError> = None;

        for attempt in 1..=MAX_HEALTH_RETRIES {
            match self
                .http
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await
            {
                Ok(resp) if resp.status() == reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(IndexError::Auth);
                }
                Ok(resp) if resp.status().is_success() => {
                    match resp.json::<HealthResponse>().await {
                        Ok(health) if health.ok => {
                            debug!("Search server healthy (attempt {})", attempt);
                            return Ok(());
                        }
                        Ok(_) => warn!(
                            "Search server not ready (attempt {}/{})",
                            attempt, MAX_HEALTH_RETRIES
                        ),
                        Err(e) => {
                            last_transport = Some(IndexError::from_request(&url, e));
                        }
                    }
                }
                Ok(resp) => warn!(
                    "Health check returned HTTP {} (attempt {}/{})",
                    resp.status(),
                    attempt,
                    MAX_HEALTH_RETRIES
                ),
                Err(e) => {
                    warn!(
                        "Health check failed (attempt {}/{}): {}",
                        attempt, MAX_HEALTH_RETRIES, e
                    );
                    last_transport = Some(IndexError::from_request(&url, e));
                }
            }

            if attempt < MAX_HEALTH_RETRIES {
                tokio::time::sleep(Duration::from_millis(backoff)).await;
                backoff *= 2;
            }
        }

        Err(last_transport.unwrap_or_else(|| {
            IndexError::Unavailable(format!(
                "no healthy response after {} attempts",
                MAX_HEALTH_RETRIES
            ))
        }))
    }

    /// Make sure the destination collection exists with the expected schema.
    ///
    /// With `drop_existing` the current collection is deleted first;
    /// destructive, every previously indexed document is gone. Creating over
    /// an existing collection is a no-op.
    pub async fn ensure_collection(&self, drop_existing: bool) -> Result<(), IndexError> {
        if drop_existing && self.drop_collection().await? {
            info!("Dropped existing collection: {}", self.collection);
        }

        let url = self.url("/collections");
        let resp = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&collection_schema(&self.collection))
            .send()
            .await
            .map_err(|e| IndexError::from_request(&url, e))?;

        match resp.status() {
            status if status.is_success() => {
                info!("Created collection: {}", self.collection);
                Ok(())
            }
            reqwest::StatusCode::CONFLICT => {
                debug!("Collection already exists: {}", self.collection);
                Ok(())
            }
            reqwest::StatusCode::UNAUTHORIZED => Err(IndexError::Auth),
            status => Err(IndexError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Delete the collection. Returns whether it existed.
    pub async fn drop_collection(&self) -> Result<bool, IndexError> {
        let url = self.url(&format!("/collections/{}", self.collection));
        let resp = self
            .http
            .delete(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| IndexError::from_request(&url, e))?;

        match resp.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            reqwest::StatusCode::UNAUTHORIZED => Err(IndexError::Auth),
            status => Err(IndexError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }

    /// Bulk-import `records` with upsert semantics, in fixed-size chunks.
    ///
    /// Per-document rejections are collected rather than failing the batch;
    /// sibling documents in the same request still land. The report covers
    /// the whole batch and is only returned after every chunk completed.
    /// Zero accepted documents out of a non-empty batch is an error.
    pub async fn upsert_batch(&self, records: &[Record]) -> Result<ImportReport, IndexError> {
        let mut report = ImportReport::default();
        if records.is_empty() {
            return Ok(report);
        }

        let url = self.url(&format!(
            "/collections/{}/documents/import",
            self.collection
        ));

        for chunk in records.chunks(IMPORT_CHUNK) {
            let body = chunk
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?
                .join("\n");

            let resp = self
                .http
                .post(&url)
                .query(&[("action", "upsert")])
                .header(API_KEY_HEADER, &self.api_key)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(body)
                .send()
                .await
                .map_err(|e| IndexError::from_request(&url, e))?;

            match resp.status() {
                status if status.is_success() => {
                    let text = resp
                        .text()
                        .await
                        .map_err(|e| IndexError::from_request(&url, e))?;
                    for line in text.lines().filter(|l| !l.trim().is_empty()) {
                        match serde_json::from_str::<ImportLine>(line) {
                            Ok(entry) if entry.success => report.accepted += 1,
                            Ok(entry) => report
                                .failures
                                .push(entry.error.unwrap_or_else(|| "unknown import error".into())),
                            Err(e) => {
                                warn!("Unparseable import response line: {}", e);
                                report.failures.push(format!("unparseable response: {}", e));
                            }
                        }
                    }
                }
                reqwest::StatusCode::UNAUTHORIZED => return Err(IndexError::Auth),
                status => {
                    return Err(IndexError::Api {
                        status: status.as_u16(),
                        message: resp.text().await.unwrap_or_default(),
                    })
                }
            }
        }

        if report.accepted == 0 {
            return Err(IndexError::AllRejected(records.len()));
        }
        Ok(report)
    }

    /// Name and document count of the collection.
    pub async fn collection_stats(&self) -> Result<CollectionInfo, IndexError> {
        let url = self.url(&format!("/collections/{}", self.collection));
        let resp = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| IndexError::from_request(&url, e))?;

        match resp.status() {
            status if status.is_success() => resp
                .json::<CollectionInfo>()
                .await
                .map_err(|e| IndexError::from_request(&url, e)),
            reqwest::StatusCode::NOT_FOUND => Err(IndexError::Api {
                status: 404,
                message: format!("collection '{}' does not exist", self.collection),
            }),
            reqwest::StatusCode::UNAUTHORIZED => Err(IndexError::Auth),
            status => Err(IndexError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}

/// Collection schema: four heading levels, body content, URL split, ranking
/// fields. `item_priority` is the default (descending) sort key.
fn collection_schema(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "fields": [
            { "name": "hierarchy.lvl0", "type": "string", "facet": true },
            { "name": "hierarchy.lvl1", "type": "string", "facet": true, "optional": true },
            { "name": "hierarchy.lvl2", "type": "string", "facet": true, "optional": true },
            { "name": "hierarchy.lvl3", "type": "string", "facet": true, "optional": true },
            { "name": "content", "type": "string" },
            { "name": "url", "type": "string" },
            { "name": "url_without_anchor", "type": "string", "facet": true },
            { "name": "anchor", "type": "string", "optional": true },
            { "name": "type", "type": "string", "facet": true },
            { "name": "version", "type": "string", "facet": true, "optional": true },
            { "name": "language", "type": "string", "facet": true, "optional": true },
            { "name": "weight", "type": "int32" },
            { "name": "item_priority", "type": "int64" }
        ],
        "default_sorting_field": "item_priority",
        "token_separators": ["_", "-", "."]
    })
}

// ── Tests ──
