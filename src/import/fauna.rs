//! Fauna record creation over the FQL v4 HTTP wire format

use super::record::{CreatedRecord, TaskRecord};
use super::RecordSink;
use crate::config::ImportConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub struct FaunaClient {
    client: Client,
    endpoint: Url,
    secret: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    resource: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

impl FaunaClient {
    pub fn new(config: &ImportConfig) -> Result<Self> {
        let secret = config
            .secret
            .clone()
            .ok_or_else(|| Error::Config("Fauna secret is not configured".to_string()))?;
        let endpoint = Url::parse(&config.endpoint)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            secret,
        })
    }
}

/// `Create(Collection(<collection>), { data: <record> })` as wire JSON.
///
/// Objects are wrapped in `{"object": ...}` so field values are treated as
/// literals rather than query expressions.
pub fn create_query(collection: &str, record: &TaskRecord) -> Result<Value> {
    let data = serde_json::to_value(record)?;
    Ok(json!({
        "create": { "collection": collection },
        "params": { "object": { "data": { "object": data } } }
    }))
}

fn parse_created(collection: &str, resource: &Value) -> Result<CreatedRecord> {
    let id = resource
        .pointer("/ref/@ref/id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidRecord("create response has no document ref".to_string()))?;
    Ok(CreatedRecord {
        reference: format!("{collection}/{id}"),
        timestamp: resource.get("ts").and_then(Value::as_i64),
    })
}

#[async_trait]
impl RecordSink for FaunaClient {
    async fn create(&self, collection: &str, record: &TaskRecord) -> Result<CreatedRecord> {
        let query = create_query(collection, record)?;
        debug!("Creating task #{} in {}", record.task_number, collection);

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.secret)
            .json(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.errors.into_iter().next())
                .map(|detail| format!("{}: {}", detail.code, detail.description))
                .unwrap_or(body);
            return Err(Error::Api { status, message });
        }

        let parsed: QueryResponse = response.json().await?;
        parse_created(collection, &parsed.resource)
    }
}
