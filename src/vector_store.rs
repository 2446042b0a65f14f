//! HTTP client for the Qdrant-compatible vector store.
//!
//! Covers the collection lifecycle (exists / delete / create), bulk point
//! upserts, and nearest-neighbor queries. The store's query response shape
//! has shifted across server and client generations, so all result parsing
//! funnels through [`parse_search_response`], which normalizes the known
//! shapes at this boundary. Business logic only ever sees
//! [`RetrievalHit`]s.

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::VectorStoreConfig;
use crate::models::RetrievalHit;

/// A point ready for upsert: id, vector, and `{text, source}` payload.
#[derive(Debug, Serialize)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

impl Point {
    pub fn new(id: String, vector: Vec<f32>, text: &str, source: &str) -> Self {
        Self {
            id,
            vector,
            payload: json!({ "text": text, "source": source }),
        }
    }
}

pub struct VectorStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl VectorStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            collection: config.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key.as_str());
        }
        req
    }

    pub async fn collection_exists(&self) -> Result<bool> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let response = self.request(reqwest::Method::GET, url).send().await?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            other => bail!(
                "vector store collection check failed ({}): {}",
                other,
                response.text().await.unwrap_or_default()
            ),
        }
    }

    pub async fn delete_collection(&self) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            bail!(
                "vector store delete failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
    }

    /// Create the collection with a fixed dimension and cosine distance.
    ///
    /// Dimension and metric are fixed for the collection's lifetime;
    /// changing either means dropping and recreating it.
    pub async fn create_collection(&self, dims: usize) -> Result<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let body = json!({
            "vectors": {
                "size": dims,
                "distance": "Cosine"
            }
        });
        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&body)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            bail!(
                "vector store create failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
    }

    /// Bulk-upsert one batch of points. With `wait`, the call returns only
    /// after the store has applied the batch.
    pub async fn upsert_points(&self, points: &[Point], wait: bool) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}/collections/{}/points?wait={}",
            self.base_url, self.collection, wait
        );
        let body = json!({ "points": points });
        let response = self
            .request(reqwest::Method::PUT, url)
            .json(&body)
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            bail!(
                "vector store upsert failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
    }

    /// Top-`limit` nearest-neighbor search with payloads.
    pub async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievalHit>> {
        let url = format!(
            "{}/collections/{}/points/query",
            self.base_url, self.collection
        );
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true
        });
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!(
                "vector store search failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        let value: Value = response.json().await?;
        parse_search_response(&value)
    }
}

/// Normalize a search response into [`RetrievalHit`]s.
///
/// Accepted shapes, in probe order:
/// - a bare array of hits;
/// - `{"result": [hit, ...]}` (classic search API);
/// - `{"result": {"points": [hit, ...]}}` (query API);
/// - `{"points": [hit, ...]}`.
///
/// Anything else is a compatibility error, reported explicitly instead of
/// crashing further in. A missing or null `score` becomes `None`; a score
/// of `0.0` stays `Some(0.0)`.
pub fn parse_search_response(value: &Value) -> Result<Vec<RetrievalHit>> {
    let hits = if let Some(arr) = value.as_array() {
        arr
    } else if let Some(result) = value.get("result") {
        if let Some(arr) = result.as_array() {
            arr
        } else if let Some(points) = result.get("points").and_then(|p| p.as_array()) {
            points
        } else {
            bail!(unrecognized_shape(value));
        }
    } else if let Some(points) = value.get("points").and_then(|p| p.as_array()) {
        points
    } else {
        bail!(unrecognized_shape(value));
    };

    Ok(hits.iter().map(parse_hit).collect())
}

fn unrecognized_shape(value: &Value) -> String {
    format!(
        "unrecognized search response shape (expected a hit array, or an object \
         with a 'result' or 'points' field); check vector store version compatibility. Got: {}",
        summarize(value)
    )
}

/// First characters of the offending payload, enough to diagnose without
/// dumping whole responses into error messages.
fn summarize(value: &Value) -> String {
    let mut s = value.to_string();
    if s.len() > 120 {
        s.truncate(120);
        s.push_str("...");
    }
    s
}

fn parse_hit(hit: &Value) -> RetrievalHit {
    let payload = hit.get("payload");
    let text = payload
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();
    let source = payload
        .and_then(|p| p.get("source"))
        .and_then(|s| s.as_str())
        .unwrap_or_default()
        .to_string();
    let score = hit.get("score").and_then(|s| s.as_f64());

    RetrievalHit {
        text,
        source,
        score,
    }
}
