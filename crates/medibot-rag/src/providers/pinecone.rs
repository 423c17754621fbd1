//! Pinecone serverless index over the REST API
//!
//! Control plane calls (describe, create) go to `api.pinecone.io`; record
//! operations go to the per-index host returned by describe, which is cached
//! after the first lookup.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::{IndexRecord, IndexSpec, Metadata, Metric, ScoredRecord};

use super::vector_store::VectorIndex;

/// API version pinned on every request
const API_VERSION: &str = "2025-01";
/// Index tag recording which embedding model populated the index
pub const EMBEDDING_MODEL_TAG: &str = "embedding_model";

/// Pinecone index client bound to one index name
pub struct PineconeIndex {
    client: Client,
    config: VectorDbConfig,
    /// Data plane host, resolved lazily
    host: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: usize,
    metric: Metric,
    host: String,
    #[serde(default)]
    status: IndexStatus,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'static str,
    spec: ServerlessSpec<'a>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    tags: HashMap<&'static str, &'a str>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    serverless: CloudRegion<'a>,
}

#[derive(Debug, Serialize)]
struct CloudRegion<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<Vector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct Vector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

impl PineconeIndex {
    /// Create a client for the configured index
    pub fn new(api_key: &str, config: &VectorDbConfig) -> Result<Self> {
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::config("Pinecone API key contains invalid characters"))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("Api-Key", key);
        headers.insert("X-Pinecone-API-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            host: RwLock::new(None),
        })
    }

    fn control_url(&self, path: &str) -> String {
        format!("{}{}", self.config.control_plane_url.trim_end_matches('/'), path)
    }

    async fn fetch_model(&self) -> Result<Option<IndexModel>> {
        let url = self.control_url(&format!("/indexes/{}", self.config.index_name));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Describe index failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Error::config("Pinecone rejected the API key"));
            }
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::vector_db(format!(
                    "Describe index failed ({}): {}",
                    status, body
                )));
            }
            _ => {}
        }

        let model: IndexModel = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse index description: {}", e)))?;

        if !model.host.is_empty() {
            *self.host.write() = Some(model.host.clone());
        }
        Ok(Some(model))
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(self.config.ready_timeout_secs);
        loop {
            if let Some(model) = self.fetch_model().await? {
                if model.status.ready {
                    return Ok(());
                }
                tracing::debug!("Index '{}' state: {}", model.name, model.status.state);
            }
            if Instant::now() >= deadline {
                return Err(Error::vector_db(format!(
                    "Index '{}' not ready after {}s",
                    self.config.index_name, self.config.ready_timeout_secs
                )));
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    async fn data_url(&self, path: &str) -> Result<String> {
        let cached = self.host.read().clone();
        let host = match cached {
            Some(host) => host,
            None => self
                .fetch_model()
                .await?
                .map(|m| m.host)
                .filter(|h| !h.is_empty())
                .ok_or_else(|| {
                    Error::vector_db(format!("Index '{}' does not exist", self.config.index_name))
                })?,
        };
        Ok(data_plane_url(&host, path))
    }
}

fn data_plane_url(host: &str, path: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}{}", host.trim_end_matches('/'), path)
    } else {
        format!("https://{}{}", host, path)
    }
}

fn spec_from_model(model: IndexModel) -> IndexSpec {
    let embedding_model = model
        .tags
        .and_then(|mut tags| tags.remove(EMBEDDING_MODEL_TAG));
    IndexSpec {
        name: model.name,
        dimension: model.dimension,
        metric: model.metric,
        embedding_model,
    }
}

fn records_from_response(response: QueryResponse) -> Vec<ScoredRecord> {
    response
        .matches
        .into_iter()
        .map(|m| ScoredRecord::from_stored(m.id, m.score, m.metadata.unwrap_or_default()))
        .collect()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn index_exists(&self) -> Result<bool> {
        Ok(self.fetch_model().await?.is_some())
    }

    async fn describe_index(&self) -> Result<Option<IndexSpec>> {
        Ok(self.fetch_model().await?.map(spec_from_model))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut tags = HashMap::new();
        if let Some(model) = &spec.embedding_model {
            tags.insert(EMBEDDING_MODEL_TAG, model.as_str());
        }

        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric.as_str(),
            spec: ServerlessSpec {
                serverless: CloudRegion {
                    cloud: &self.config.cloud,
                    region: &self.config.region,
                },
            },
            tags,
        };

        tracing::info!(
            "Creating Pinecone index '{}' ({} dimensions, {}, {}/{})",
            spec.name,
            spec.dimension,
            spec.metric.as_str(),
            self.config.cloud,
            self.config.region
        );

        let response = self
            .client
            .post(self.control_url("/indexes"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Create index failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!(
                "Create index failed ({}): {}",
                status, body
            )));
        }

        self.wait_until_ready().await?;
        tracing::info!("Pinecone index '{}' is ready", spec.name);
        Ok(())
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| Vector {
                    id: &r.id,
                    values: &r.values,
                    metadata: r.stored_metadata(),
                })
                .collect(),
            namespace: &self.config.namespace,
        };

        let response = self
            .client
            .post(self.data_url("/vectors/upsert").await?)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Upsert failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!("Upsert failed ({}): {}", status, body)));
        }

        let upserted: UpsertResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse upsert response: {}", e)))?;

        Ok(upserted.upserted_count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<ScoredRecord>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: &self.config.namespace,
        };

        let response = self
            .client
            .post(self.data_url("/query").await?)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_db(format!("Query failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_db(format!("Query failed ({}): {}", status, body)));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_db(format!("Failed to parse query response: {}", e)))?;

        Ok(records_from_response(parsed))
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
