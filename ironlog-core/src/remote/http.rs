//! REST implementation of [`RemoteStore`].
//!
//! Talks to a per-entity REST backend: `POST /rest/<table>` upserts,
//! `PATCH /rest/<table>?id=eq.<id>` patches (optionally guarded by an
//! `updated_at` precondition for last-writer-wins), `DELETE` removes,
//! `GET` reads. Responses are JSON row arrays.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use super::error::RemoteError;
use super::store::{RemoteRecord, RemoteStore};
use crate::record_id::RecordId;
use crate::sync::{EntityKind, Payload};

/// Per-request timeout. A timed-out call is a network-class error.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP client for the sync backend.
pub struct HttpRemote {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Returns the server URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, entity: EntityKind) -> String {
        format!("{}/rest/{}", self.base_url.trim_end_matches('/'), entity.table())
    }

    fn row_url(&self, entity: EntityKind, id: &RecordId) -> String {
        format!("{}?id=eq.{}", self.table_url(entity), id)
    }

    async fn read_failure(response: reqwest::Response) -> RemoteError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        classify_status(status, &body)
    }

    async fn read_rows(response: reqwest::Response) -> Result<Vec<Value>, RemoteError> {
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| RemoteError::Network(format!("malformed response body: {}", e)))
    }
}

/// Maps an HTTP failure status to the error taxonomy.
fn classify_status(status: reqwest::StatusCode, body: &str) -> RemoteError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body)
    };

    if status == reqwest::StatusCode::CONFLICT {
        // Postgres unique_violation surfaces as 23505 in the body.
        if body.contains("23505") || body.contains("duplicate key") {
            RemoteError::Duplicate(detail)
        } else {
            RemoteError::Conflict(detail)
        }
    } else if status.is_client_error() {
        RemoteError::Rejected(detail)
    } else {
        RemoteError::Network(detail)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Network("request timed out".to_string())
    } else {
        RemoteError::Network(e.to_string())
    }
}

/// Extracts a [`RemoteRecord`] from a response row.
fn parse_record(row: Value) -> Result<RemoteRecord, RemoteError> {
    let id = row
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::Rejected("response row missing id".to_string()))?
        .into();

    let updated_at = row
        .get("updated_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(RemoteRecord {
        id,
        updated_at,
        fields: row,
    })
}

fn query_timestamp(ts: DateTime<Utc>) -> String {
    // Z suffix keeps the value free of '+' which would decode as a
    // space in a query string.
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn create(&self, entity: EntityKind, payload: &Payload) -> Result<RemoteRecord, RemoteError> {
        let body = payload
            .fields_json()
            .map_err(|e| RemoteError::Rejected(format!("unserializable payload: {}", e)))?;

        let response = self
            .client
            .post(self.table_url(entity))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.token)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let rows = Self::read_rows(response).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Rejected(format!("create on {} returned no row", entity)))?;
        parse_record(row)
    }

    async fn update(
        &self,
        entity: EntityKind,
        id: &RecordId,
        patch: &Payload,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> Result<RemoteRecord, RemoteError> {
        let mut body = patch
            .fields_json()
            .map_err(|e| RemoteError::Rejected(format!("unserializable payload: {}", e)))?;
        // The URL filter addresses the row; an id in the body would let
        // a patch rename the record.
        if let Some(fields) = body.as_object_mut() {
            fields.remove("id");
        }

        let mut url = self.row_url(entity, id);
        if let Some(ts) = if_unmodified_since {
            url.push_str(&format!("&updated_at=lte.{}", query_timestamp(ts)));
        }

        let response = self
            .client
            .patch(url)
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.token)
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let rows = Self::read_rows(response).await?;
        match rows.into_iter().next() {
            Some(row) => parse_record(row),
            // Zero rows patched: the precondition filtered it out, or
            // the record is gone.
            None => match self.fetch(entity, id).await? {
                Some(_) => Err(RemoteError::Conflict(format!(
                    "server copy of {} {} is newer",
                    entity, id
                ))),
                None => Err(RemoteError::Rejected(format!("{} {} not found", entity, id))),
            },
        }
    }

    async fn delete(&self, entity: EntityKind, id: &RecordId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.row_url(entity, id))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::read_failure(response).await)
    }

    async fn fetch(&self, entity: EntityKind, id: &RecordId) -> Result<Option<RemoteRecord>, RemoteError> {
        let response = self
            .client
            .get(format!("{}&limit=1", self.row_url(entity, id)))
            .timeout(REQUEST_TIMEOUT)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response).await);
        }

        let rows = Self::read_rows(response).await?;
        match rows.into_iter().next() {
            Some(row) => parse_record(row).map(Some),
            None => Ok(None),
        }
    }
}

/// Probes whether the sync server is reachable. Gates auto-sync so an
/// offline machine skips the attempt quickly instead of timing out per
/// operation.
pub async fn check_server(base_url: &str) -> bool {
    let url = format!("{}/health", base_url.trim_end_matches('/'));

    match reqwest::Client::new()
        .get(&url)
        .timeout(PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_url() {
        let remote = HttpRemote::new("https://api.example.com/", "token");
        assert_eq!(
            remote.table_url(EntityKind::SessionExercise),
            "https://api.example.com/rest/session_exercises"
        );
        assert_eq!(
            remote.row_url(EntityKind::Set, &"abc".into()),
            "https://api.example.com/rest/sets?id=eq.abc"
        );
    }

    #[test]
    fn test_classify_conflict_vs_duplicate() {
        let conflict = classify_status(reqwest::StatusCode::CONFLICT, "row version changed");
        assert!(matches!(conflict, RemoteError::Conflict(_)));

        let duplicate = classify_status(
            reqwest::StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value"}"#,
        );
        assert!(matches!(duplicate, RemoteError::Duplicate(_)));
    }

    #[test]
    fn test_classify_client_and_server_errors() {
        assert!(matches!(
            classify_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, "bad reps"),
            RemoteError::Rejected(_)
        ));
        assert!(matches!(
            classify_status(reqwest::StatusCode::BAD_GATEWAY, ""),
            RemoteError::Network(_)
        ));
    }

    #[test]
    fn test_parse_record() {
        let row = json!({
            "id": "srv-1",
            "updated_at": "2025-03-01T10:00:00.000Z",
            "reps": 8
        });

        let record = parse_record(row).unwrap();
        assert_eq!(record.id, "srv-1".into());
        assert!(record.updated_at.is_some());
        assert_eq!(record.fields["reps"], 8);
    }

    #[test]
    fn test_parse_record_missing_id() {
        let result = parse_record(json!({"reps": 8}));
        assert!(matches!(result, Err(RemoteError::Rejected(_))));
    }

    #[test]
    fn test_query_timestamp_is_query_safe() {
        let ts = DateTime::parse_from_rfc3339("2025-03-01T10:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        let formatted = query_timestamp(ts);
        assert_eq!(formatted, "2025-03-01T10:00:00.000Z");
        assert!(!formatted.contains('+'));
    }
}
