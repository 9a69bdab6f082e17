use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, error, info};
use uuid::Uuid;

use cinedex_config::ElasticConfig;

use crate::error::{EtlError, Result};

use super::SearchIndex;

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// Elasticsearch-compatible search backend over its HTTP API.
#[derive(Debug, Clone)]
pub struct ElasticIndex {
    client: reqwest::Client,
    base_url: String,
}

impl ElasticIndex {
    pub fn new(config: &ElasticConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchIndex for ElasticIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[(Uuid, serde_json::Value)],
    ) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let body = bulk_body(index, documents)?;
        debug!("submitting {} documents to {index}", documents.len());

        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        let report: serde_json::Value = response.json().await?;
        if report
            .get("errors")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            let detail = first_item_error(&report);
            error!("bulk submission to {index} rejected: {detail}");
            return Err(EtlError::BulkRejected {
                index: index.to_string(),
                detail,
            });
        }

        Ok(())
    }

    async fn create_index(
        &self,
        index: &str,
        mapping: &serde_json::Value,
    ) -> Result<()> {
        info!("ensuring search index {index} exists");
        let response = self
            .client
            .put(format!("{}/{index}", self.base_url))
            .json(mapping)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::OK => {
                info!("created search index {index}");
                Ok(())
            }
            StatusCode::BAD_REQUEST if body.contains(ALREADY_EXISTS) => {
                debug!("search index {index} already exists");
                Ok(())
            }
            status => {
                error!(
                    "unable to provision index {index}: status {status}, body {body}"
                );
                Err(EtlError::Provision {
                    index: index.to_string(),
                    status,
                })
            }
        }
    }
}

/// Assemble the ND-JSON `_bulk` payload: an action line naming the
/// index and document id, then the document itself, for every entry,
/// with the trailing newline the protocol requires.
fn bulk_body(
    index: &str,
    documents: &[(Uuid, serde_json::Value)],
) -> Result<String> {
    let mut lines = Vec::with_capacity(documents.len() * 2);
    for (id, document) in documents {
        let action = serde_json::json!({
            "index": { "_index": index, "_id": id }
        });
        lines.push(serde_json::to_string(&action)?);
        lines.push(serde_json::to_string(document)?);
    }
    Ok(lines.join("\n") + "\n")
}

fn first_item_error(report: &serde_json::Value) -> String {
    report
        .get("items")
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| {
            item.get("index").and_then(|action| action.get("error"))
        })
        .next()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unspecified item failure".to_string())
}
