//! InfluxDB 2 HTTP client
//!
//! Talks to the v2 API directly with reqwest:
//! - `POST /api/v2/write` with line protocol at second precision
//! - `POST /api/v2/query` with Flux, answered as CSV
//! - `GET /api/v2/buckets`, `GET /api/v2/orgs`, `POST /api/v2/buckets`
//! - `POST /api/v2/delete` for migration cleanup
//!
//! Every request carries `Authorization: Token <token>`. The client does not
//! retry; callers wrap calls in [`crate::core::export::with_retry`].

use super::point::{encode_batch, Point, MIGRATION_SOURCE};
use super::traits::{BucketAdmin, PointReader, PointWriter, QueryRow, WriteOutcome};
use crate::config::{token_header, InfluxConfig, SecretString};
use crate::domain::{HastatsError, InfluxError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

/// Time range covered by `cleanup`.
const DELETE_START: &str = "1970-01-01T00:00:00Z";
const DELETE_STOP: &str = "2030-12-31T23:59:59Z";

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct BucketsResponse {
    #[serde(default)]
    buckets: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
struct OrgsResponse {
    #[serde(default)]
    orgs: Vec<NamedResource>,
}

/// InfluxDB 2 client
pub struct InfluxClient {
    client: Client,
    base_url: String,
    token: SecretString,
    org: String,
}

impl InfluxClient {
    /// Build a client from configuration. No request is made.
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10));

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification disabled for InfluxDB");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| {
            HastatsError::Configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            org: config.org.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, token_header(&self.token))
    }

    /// Passes success responses through and maps everything else to an
    /// [`InfluxError`] carrying the server's message.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|m| m.message)
            .unwrap_or_else(|| body.trim().to_string());
        Err(InfluxError::from_status(status.as_u16(), message).into())
    }

    /// `GET /health`. Succeeds only when the server reports `pass`.
    pub async fn health(&self) -> Result<()> {
        let response = Self::check(self.client.get(self.url("/health")).send().await?).await?;
        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| InfluxError::InvalidResponse(e.to_string()))?;

        if health.status != "pass" {
            return Err(InfluxError::ConnectionFailed(format!(
                "Health check failed: {}",
                health.message.unwrap_or(health.status)
            ))
            .into());
        }
        Ok(())
    }

    /// Resolves the configured organization name to its id.
    pub async fn org_id(&self) -> Result<String> {
        let request = self
            .authorized(self.client.get(self.url("/api/v2/orgs")))
            .query(&[("org", self.org.as_str())]);
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(InfluxError::OrgNotFound(self.org.clone()).into());
        }

        let orgs: OrgsResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| InfluxError::InvalidResponse(e.to_string()))?;

        orgs.orgs
            .into_iter()
            .find(|o| o.name == self.org)
            .map(|o| o.id)
            .ok_or_else(|| InfluxError::OrgNotFound(self.org.clone()).into())
    }
}

#[async_trait]
impl PointWriter for InfluxClient {
    async fn write(&self, bucket: &str, points: &[Point]) -> Result<WriteOutcome> {
        let (body, rejected) = encode_batch(points);
        if body.is_empty() {
            return Ok(WriteOutcome {
                written: 0,
                errors: rejected,
            });
        }
        let lines = points.len() - rejected.len();

        let started = Instant::now();
        let request = self
            .authorized(self.client.post(self.url("/api/v2/write")))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", bucket),
                ("precision", "s"),
            ])
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);

        Self::check(request.send().await?).await?;

        tracing::debug!(
            bucket = %bucket,
            points = lines,
            duration_ms = started.elapsed().as_millis() as u64,
            "Wrote points"
        );

        Ok(WriteOutcome {
            written: lines,
            errors: rejected,
        })
    }
}

#[async_trait]
impl PointReader for InfluxClient {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let request = self
            .authorized(self.client.get(self.url("/api/v2/buckets")))
            .query(&[("org", self.org.as_str()), ("name", bucket)]);
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        let buckets: BucketsResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| InfluxError::InvalidResponse(e.to_string()))?;
        Ok(buckets.buckets.iter().any(|b| b.name == bucket))
    }

    async fn query(&self, flux: &str) -> Result<Vec<QueryRow>> {
        tracing::debug!(flux = %flux, "Running Flux query");
        let request = self
            .authorized(self.client.post(self.url("/api/v2/query")))
            .query(&[("org", self.org.as_str())])
            .header(ACCEPT, "application/csv")
            .json(&json!({
                "query": flux,
                "type": "flux",
                "dialect": {
                    "header": true,
                    "annotations": [],
                    "delimiter": ","
                }
            }));

        let body = Self::check(request.send().await?)
            .await?
            .text()
            .await
            .map_err(|e| InfluxError::InvalidResponse(e.to_string()))?;
        parse_flux_csv(&body)
    }
}

#[async_trait]
impl BucketAdmin for InfluxClient {
    async fn create_bucket(
        &self,
        name: &str,
        retention: Option<Duration>,
        description: &str,
    ) -> Result<bool> {
        if self.bucket_exists(name).await? {
            tracing::info!(bucket = %name, "Bucket already exists");
            return Ok(false);
        }

        let org_id = self.org_id().await?;
        let rules = match retention {
            Some(period) => json!([{ "type": "expire", "everySeconds": period.as_secs() }]),
            None => json!([]),
        };

        let request = self
            .authorized(self.client.post(self.url("/api/v2/buckets")))
            .json(&json!({
                "orgID": org_id,
                "name": name,
                "description": description,
                "retentionRules": rules,
            }));
        Self::check(request.send().await?).await?;

        tracing::info!(
            bucket = %name,
            retention_secs = retention.map(|r| r.as_secs()).unwrap_or(0),
            "Created bucket"
        );
        Ok(true)
    }

    async fn delete_migration_data(&self, bucket: &str) -> Result<()> {
        let predicate = format!("source=\"{MIGRATION_SOURCE}\"");
        let request = self
            .authorized(self.client.post(self.url("/api/v2/delete")))
            .query(&[("org", self.org.as_str()), ("bucket", bucket)])
            .json(&json!({
                "start": DELETE_START,
                "stop": DELETE_STOP,
                "predicate": predicate,
            }));
        Self::check(request.send().await?).await?;

        tracing::info!(bucket = %bucket, predicate = %predicate, "Deleted migration data");
        Ok(())
    }
}

/// Parses a Flux CSV response (header rows, no annotations) into rows.
///
/// Each result table starts with its own header row; the bookkeeping columns
/// (the leading empty column, `result`, `table`) are dropped.
pub fn parse_flux_csv(body: &str) -> Result<Vec<QueryRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record
            .map_err(|e| InfluxError::InvalidResponse(format!("Malformed query response: {e}")))?;

        if record.iter().all(|field| field.trim().is_empty()) {
            header = None;
            continue;
        }

        let starts_table = record.get(1) == Some("result") && record.get(2) == Some("table");
        if header.is_none() || starts_table {
            header = Some(record.iter().map(|f| f.trim().to_string()).collect());
            continue;
        }

        let Some(columns) = header.as_ref() else {
            continue;
        };

        if columns.first().map(String::as_str) == Some("error") {
            let message = record.get(0).unwrap_or("unknown error").to_string();
            return Err(InfluxError::InvalidResponse(format!("Flux error: {message}")).into());
        }

        let row: QueryRow = columns
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !matches!(name.as_str(), "" | "result" | "table"))
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use mockito::{Matcher, Server};
    use std::collections::BTreeMap;

    fn config(url: String) -> InfluxConfig {
        InfluxConfig {
            url,
            token: secret_string("test-token".to_string()),
            org: "home".to_string(),
            bucket_recent: "ha_recent".to_string(),
            bucket_historical: "ha_historical".to_string(),
            recent_retention_days: 90,
            timeout_seconds: 5,
            tls_verify: true,
        }
    }

    fn point(value: f64) -> Point {
        let mut tags = BTreeMap::new();
        tags.insert("entity_id".to_string(), "power".to_string());
        tags.insert("source".to_string(), MIGRATION_SOURCE.to_string());
        Point {
            measurement: "W".to_string(),
            tags,
            value,
            timestamp: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_write_sends_line_protocol() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("org".into(), "home".into()),
                Matcher::UrlEncoded("bucket".into(), "ha_recent".into()),
                Matcher::UrlEncoded("precision".into(), "s".into()),
            ]))
            .match_header("authorization", "Token test-token")
            .match_body("W,entity_id=power,source=migration value=250 1700000000")
            .with_status(204)
            .create_async()
            .await;

        let client = InfluxClient::new(&config(server.url())).unwrap();
        let outcome = client.write("ha_recent", &[point(250.0)]).await.unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.written, 1);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_write_empty_batch_makes_no_request() {
        let client = InfluxClient::new(&config("http://127.0.0.1:9".to_string())).unwrap();
        let outcome = client.write("ha_recent", &[]).await.unwrap();
        assert_eq!(outcome, WriteOutcome::default());
    }

    #[tokio::test]
    async fn test_write_maps_status_codes() {
        let mut server = Server::new_async().await;
        let _unauthorized = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::UrlEncoded("bucket".into(), "locked".into()))
            .with_status(401)
            .with_body(r#"{"code":"unauthorized","message":"unauthorized access"}"#)
            .create_async()
            .await;
        let _unavailable = server
            .mock("POST", "/api/v2/write")
            .match_query(Matcher::UrlEncoded("bucket".into(), "busy".into()))
            .with_status(503)
            .create_async()
            .await;

        let client = InfluxClient::new(&config(server.url())).unwrap();

        let err = client.write("locked", &[point(1.0)]).await.unwrap_err();
        assert!(matches!(
            err,
            HastatsError::Influx(InfluxError::AuthenticationFailed(ref m)) if m == "unauthorized access"
        ));
        assert!(!err.is_retryable());

        let err = client.write("busy", &[point(1.0)]).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_bucket_exists() {
        let mut server = Server::new_async().await;
        let _found = server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::UrlEncoded("name".into(), "ha_recent".into()))
            .with_status(200)
            .with_body(r#"{"buckets":[{"id":"b1","name":"ha_recent"}]}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::UrlEncoded("name".into(), "nope".into()))
            .with_status(404)
            .with_body(r#"{"code":"not found","message":"bucket \"nope\" not found"}"#)
            .create_async()
            .await;

        let client = InfluxClient::new(&config(server.url())).unwrap();
        assert!(client.bucket_exists("ha_recent").await.unwrap());
        assert!(!client.bucket_exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_parses_csv_tables() {
        let mut server = Server::new_async().await;
        let body = ",result,table,_time,_value,entity_id\r\n\
                    ,_result,0,2024-01-01T00:00:00Z,21.5,living_room\r\n\
                    ,_result,0,2024-01-01T01:00:00Z,21.7,living_room\r\n\
                    \r\n\
                    ,result,table,_value\r\n\
                    ,_result,1,42\r\n";
        let mock = server
            .mock("POST", "/api/v2/query")
            .match_query(Matcher::UrlEncoded("org".into(), "home".into()))
            .match_header("accept", "application/csv")
            .match_body(Matcher::PartialJson(json!({"type": "flux"})))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = InfluxClient::new(&config(server.url())).unwrap();
        let rows = client
            .query("from(bucket: \"ha_recent\") |> range(start: -1h)")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["_value"], "21.5");
        assert_eq!(rows[1]["entity_id"], "living_room");
        assert_eq!(rows[2]["_value"], "42");
        assert!(!rows[0].contains_key("table"));
    }

    #[test]
    fn test_parse_flux_error_table() {
        let err = parse_flux_csv("error,reference\r\nbucket not found,\r\n").unwrap_err();
        assert!(err.to_string().contains("bucket not found"));
    }

    #[tokio::test]
    async fn test_create_bucket_skips_existing_and_creates_missing() {
        let mut server = Server::new_async().await;
        let _existing = server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::UrlEncoded("name".into(), "ha_recent".into()))
            .with_status(200)
            .with_body(r#"{"buckets":[{"id":"b1","name":"ha_recent"}]}"#)
            .create_async()
            .await;
        let _absent = server
            .mock("GET", "/api/v2/buckets")
            .match_query(Matcher::UrlEncoded("name".into(), "ha_historical".into()))
            .with_status(200)
            .with_body(r#"{"buckets":[]}"#)
            .create_async()
            .await;
        let _orgs = server
            .mock("GET", "/api/v2/orgs")
            .match_query(Matcher::UrlEncoded("org".into(), "home".into()))
            .with_status(200)
            .with_body(r#"{"orgs":[{"id":"o1","name":"home"}]}"#)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/api/v2/buckets")
            .match_body(Matcher::PartialJson(json!({
                "orgID": "o1",
                "name": "ha_historical",
                "retentionRules": []
            })))
            .with_status(201)
            .with_body(r#"{"id":"b2","name":"ha_historical"}"#)
            .create_async()
            .await;

        let client = InfluxClient::new(&config(server.url())).unwrap();
        assert!(!client
            .create_bucket("ha_recent", Some(Duration::from_secs(90 * 86_400)), "recent")
            .await
            .unwrap());
        assert!(client
            .create_bucket("ha_historical", None, "historical")
            .await
            .unwrap());
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_migration_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/delete")
            .match_query(Matcher::UrlEncoded("bucket".into(), "ha_recent".into()))
            .match_body(Matcher::PartialJson(json!({
                "start": DELETE_START,
                "stop": DELETE_STOP,
                "predicate": "source=\"migration\""
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = InfluxClient::new(&config(server.url())).unwrap();
        client.delete_migration_data("ha_recent").await.unwrap();
        mock.assert_async().await;
    }
}
