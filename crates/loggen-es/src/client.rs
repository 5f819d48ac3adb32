use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use loggen_core::types::Event;
use loggen_runtime::sink::BulkSink;

const BULK_TIMEOUT: Duration = Duration::from_secs(30);
const PING_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `http://elasticsearch-master:9200`.
    pub host: String,
    pub username: String,
    pub password: String,
    /// When false, certificate validation is disabled. Intended for
    /// self-signed lab clusters, never for anything internet-facing.
    pub verify_tls: bool,
}

/// Bulk sink backed by the Elasticsearch `_bulk` API.
///
/// Each event becomes one `create` action targeting its data stream; the
/// whole batch travels in a single NDJSON request.
pub struct ElasticSink {
    http: reqwest::Client,
    bulk_url: String,
    root_url: String,
    username: String,
    password: String,
}

impl ElasticSink {
    pub fn new(config: ElasticConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(BULK_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        let host = config.host.trim_end_matches('/').to_string();
        Ok(Self {
            http,
            bulk_url: format!("{host}/_bulk"),
            root_url: format!("{host}/"),
            username: config.username,
            password: config.password,
        })
    }

    fn ndjson_body(events: &[Event]) -> Result<String> {
        let mut body = String::new();
        for event in events {
            let action = json!({ "create": { "_index": &event.data_stream } });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&event.doc)?);
            body.push('\n');
        }
        Ok(body)
    }

    /// Root endpoint document (cluster name, version, tagline), or None when
    /// the cluster is unreachable or the credentials are rejected.
    pub async fn cluster_info(&self) -> Option<Value> {
        let response = self
            .http
            .get(&self.root_url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json().await.ok()
    }
}

#[async_trait]
impl BulkSink for ElasticSink {
    async fn send(&self, events: &[Event]) -> Result<()> {
        let body = Self::ndjson_body(events)?;
        let response = self
            .http
            .post(&self.bulk_url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await?;
        let status = response.status();
        anyhow::ensure!(status.is_success(), "bulk request returned {status}");

        // A 200 can still carry per-item rejections; the batch is not
        // retried either way, so surface them in the log and move on.
        let reply: Value = response.json().await?;
        if reply.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            tracing::warn!(
                target: "loggen_events",
                event = "bulk_item_errors",
                batch_len = events.len() as u64,
                "bulk reply reported item-level errors"
            );
        }
        Ok(())
    }

    async fn ping(&self) -> bool {
        self.cluster_info().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_alternates_action_and_document_lines() {
        let events = vec![
            Event::new(json!({ "message": "a" }), "logs-nginx.access-default"),
            Event::new(json!({ "message": "b" }), "logs-windows.system-default"),
        ];
        let body = ElasticSink::ndjson_body(&events).unwrap();
        assert!(body.ends_with('\n'));
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["create"]["_index"], "logs-nginx.access-default");
        let doc: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["message"], "a");
        let action: Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(action["create"]["_index"], "logs-windows.system-default");
    }

    #[test]
    fn host_trailing_slash_is_normalized() {
        let sink = ElasticSink::new(ElasticConfig {
            host: "http://localhost:9200/".to_string(),
            username: "elastic".to_string(),
            password: "changeme".to_string(),
            verify_tls: false,
        })
        .unwrap();
        assert_eq!(sink.bulk_url, "http://localhost:9200/_bulk");
        assert_eq!(sink.root_url, "http://localhost:9200/");
    }
}
