// src/sink.rs
//! Destinations for assembled records: a local CSV file and the metrics API.

use crate::error::SinkError;
use crate::record::MetricRecord;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// Somewhere a finished record is delivered to.
#[async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, record: &MetricRecord) -> Result<(), SinkError>;
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = values
        .into_iter()
        .map(|v| csv_field(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// Append-only CSV store. The header row is written once, when the file is
/// empty; concurrent writers are serialized.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for CsvStore {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn write(&self, record: &MetricRecord) -> Result<(), SinkError> {
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut chunk = String::new();
        if file.metadata().await?.len() == 0 {
            chunk.push_str(&csv_line(record.field_names()));
        }
        chunk.push_str(&csv_line(
            record.fields().into_iter().map(|(_, value)| value.to_string()),
        ));

        file.write_all(chunk.as_bytes()).await?;
        file.flush().await?;

        info!(path = %self.path.display(), serial = %record.serial_number, "metrics written to CSV");
        Ok(())
    }
}

/// Build the submission URL from the configured API base.
pub fn submit_url(base: &str) -> String {
    if base.ends_with('/') {
        format!("{base}submit-metrics")
    } else {
        format!("{base}/submit-metrics")
    }
}

/// Posts each record as JSON to the metrics API. Only HTTP 200 counts as
/// accepted; there is no retry.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
    node_id: Option<u64>,
}

impl HttpSubmitter {
    pub fn new(api_url: &str, node_id: Option<u64>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: submit_url(api_url),
            node_id,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Sink for HttpSubmitter {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn write(&self, record: &MetricRecord) -> Result<(), SinkError> {
        let body = serde_json::to_vec(record)?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(node_id) = self.node_id {
            request = request.query(&[("node_id", node_id)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(url = %self.url, serial = %record.serial_number, "metrics submitted");
        Ok(())
    }
}
