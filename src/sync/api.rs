use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::models::{RowDraft, ScanOutcome, ScanStatus, TrackedItem};

use super::{classify_response, ApiFlavor, Endpoint, SyncError};

/// REST surface of the tracking server.
#[async_trait]
pub trait TrackingApi: Send + Sync {
    async fn report_scan(&self, endpoint: &Endpoint, serial: &str) -> Result<ScanOutcome, SyncError>;

    async fn list(&self, endpoint: &Endpoint) -> Result<Vec<TrackedItem>, SyncError>;

    async fn delete(&self, endpoint: &Endpoint, id: &str) -> Result<(), SyncError>;

    /// Create (`id == None`) or update a generic row.
    async fn save_row(
        &self,
        endpoint: &Endpoint,
        id: Option<&str>,
        draft: &RowDraft,
    ) -> Result<(), SyncError>;
}

pub struct HttpTrackingApi {
    client: reqwest::Client,
}

impl HttpTrackingApi {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TrackingApi for HttpTrackingApi {
    async fn report_scan(&self, endpoint: &Endpoint, serial: &str) -> Result<ScanOutcome, SyncError> {
        if !endpoint.flavor().supports_scan() {
            return Err(SyncError::Unsupported("scan reporting"));
        }

        let response = self
            .client
            .post(endpoint.scan_url())
            .json(&json!({ "serialNumber": serial }))
            .send()
            .await;
        let body = classify_response(response).await?.text().await?;
        parse_scan(&body)
    }

    async fn list(&self, endpoint: &Endpoint) -> Result<Vec<TrackedItem>, SyncError> {
        let response = self.client.get(endpoint.collection_url()).send().await;
        let body = classify_response(response).await?.text().await?;
        parse_list(endpoint.flavor(), &body)
    }

    async fn delete(&self, endpoint: &Endpoint, id: &str) -> Result<(), SyncError> {
        let response = self.client.delete(endpoint.item_url(id)).send().await;
        classify_response(response).await?;
        Ok(())
    }

    async fn save_row(
        &self,
        endpoint: &Endpoint,
        id: Option<&str>,
        draft: &RowDraft,
    ) -> Result<(), SyncError> {
        if !endpoint.flavor().supports_forms() {
            return Err(SyncError::Unsupported("row editing"));
        }

        let request = match id {
            Some(id) => self.client.put(endpoint.item_url(id)),
            None => self.client.post(endpoint.collection_url()),
        };
        let response = request.json(draft).send().await;
        classify_response(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    step_name: String,
    step_index: u32,
    status: String,
}

#[derive(Debug, Deserialize)]
struct DentureWire {
    serial: String,
    #[serde(default)]
    patient: Option<String>,
    step_name: String,
    step_index: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct DentureList {
    dentures: Vec<DentureWire>,
}

#[derive(Debug, Deserialize)]
struct RowWire {
    id: Value,
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowList {
    Wrapped { rows: Vec<RowWire> },
    Bare(Vec<RowWire>),
}

pub(crate) fn parse_scan(body: &str) -> Result<ScanOutcome, SyncError> {
    let wire: ScanResponse =
        serde_json::from_str(body).map_err(|err| SyncError::Decode(err.to_string()))?;
    Ok(ScanOutcome {
        step_name: wire.step_name,
        step_index: wire.step_index,
        status: ScanStatus::from_wire(&wire.status),
    })
}

pub(crate) fn parse_list(flavor: ApiFlavor, body: &str) -> Result<Vec<TrackedItem>, SyncError> {
    let decode = |err: serde_json::Error| SyncError::Decode(err.to_string());

    match flavor {
        ApiFlavor::Dentures => {
            let list: DentureList = serde_json::from_str(body).map_err(decode)?;
            Ok(list
                .dentures
                .into_iter()
                .map(|wire| TrackedItem {
                    serial: wire.serial,
                    label: wire.patient.unwrap_or_default(),
                    step_index: wire.step_index,
                    step_name: wire.step_name,
                    updated_at: wire.updated,
                })
                .collect())
        }
        ApiFlavor::Rows => {
            let rows = match serde_json::from_str::<RowList>(body).map_err(decode)? {
                RowList::Wrapped { rows } => rows,
                RowList::Bare(rows) => rows,
            };
            // Rows carry no fabrication step; the value column takes its place.
            Ok(rows
                .into_iter()
                .map(|wire| TrackedItem {
                    serial: id_to_string(&wire.id),
                    label: wire.name,
                    step_index: 0,
                    step_name: wire.value,
                    updated_at: None,
                })
                .collect())
        }
    }
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// SQLite `CURRENT_TIMESTAMP` (UTC, no zone) or RFC 3339. Anything else is
/// dropped rather than failing the whole list.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
