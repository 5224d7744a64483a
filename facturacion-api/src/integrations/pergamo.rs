use crate::config::PergamoConfig;
use async_trait::async_trait;
use billing_rules::MonthRange;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Reports offered by Pergamo and the array each one must carry under `data`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Invoices,
    Rips,
    Cancellations,
}

impl ReportKind {
    pub fn rows_key(&self) -> &'static str {
        match self {
            ReportKind::Invoices | ReportKind::Cancellations => "h3",
            ReportKind::Rips => "report_rips",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Invoices => "facturacion",
            ReportKind::Rips => "rips",
            ReportKind::Cancellations => "anulaciones",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PergamoError {
    #[error("Pergamo base_url is not configured")]
    NotConfigured,
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Pergamo answered with HTTP {0}")]
    Status(u16),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

/// Report body that passed the shape check for its kind
#[derive(Debug, Clone)]
pub struct ReportPayload {
    body: Value,
}

impl ReportPayload {
    pub fn from_body(kind: ReportKind, body: Value) -> Result<Self, PergamoError> {
        if body["data"][kind.rows_key()].is_array() {
            Ok(Self { body })
        } else {
            Err(PergamoError::Shape(format!(
                "data.{} is not an array",
                kind.rows_key()
            )))
        }
    }

    /// Rows under `data.<key>`; missing or non-array keys give no rows
    pub fn rows(&self, key: &str) -> Vec<Value> {
        self.body["data"][key]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn for_report(config: &PergamoConfig, kind: ReportKind) -> Self {
        let secs = match kind {
            ReportKind::Invoices => config.invoice_timeout_secs,
            ReportKind::Rips => config.rips_timeout_secs,
            ReportKind::Cancellations => config.cancellation_timeout_secs,
        };
        Self {
            max_attempts: config.max_attempts.max(1),
            timeout: Duration::from_secs(secs),
        }
    }
}

/// One attempt at fetching a report for a single month range
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch_report(
        &self,
        kind: ReportKind,
        range: &MonthRange,
        token: &str,
    ) -> Result<Value, PergamoError>;
}

/// Fetches a report, retrying on any failure without backoff.
///
/// Each attempt is bounded by `policy.timeout`. After the last failed
/// attempt the range is given up on and `None` is returned.
pub async fn fetch_with_retry(
    source: &dyn ReportSource,
    kind: ReportKind,
    range: &MonthRange,
    token: &str,
    policy: RetryPolicy,
) -> Option<ReportPayload> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        let fetch = source.fetch_report(kind, range, token);
        let result = match tokio::time::timeout(policy.timeout, fetch).await {
            Ok(result) => result.and_then(|body| ReportPayload::from_body(kind, body)),
            Err(_) => Err(PergamoError::Timeout(policy.timeout.as_secs())),
        };

        match result {
            Ok(payload) => return Some(payload),
            Err(e) => debug!(
                report = kind.label(),
                fecha_inicial = %range.start,
                fecha_final = %range.end,
                attempt,
                error = %e,
                "Pergamo fetch attempt failed"
            ),
        }
    }

    warn!(
        report = kind.label(),
        fecha_inicial = %range.start,
        fecha_final = %range.end,
        attempts,
        "Skipping range after exhausting Pergamo retries"
    );
    None
}

pub struct PergamoClient {
    http: reqwest::Client,
    config: PergamoConfig,
}

impl PergamoClient {
    pub fn new(config: PergamoConfig) -> Result<Self, PergamoError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> Result<String, PergamoError> {
        let base = self.config.base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(PergamoError::NotConfigured);
        }
        Ok(format!("{}{}", base, path))
    }

    fn report_path(&self, kind: ReportKind) -> &str {
        match kind {
            ReportKind::Invoices => &self.config.invoices_path,
            ReportKind::Rips => &self.config.rips_path,
            ReportKind::Cancellations => &self.config.cancellations_path,
        }
    }

    /// Exchanges Pergamo credentials for the bearer token used by the reports
    pub async fn login(&self, usuario: &str, clave: &str) -> Result<String, PergamoError> {
        let response = self
            .http
            .post(self.url(&self.config.login_path)?)
            .timeout(LOGIN_TIMEOUT)
            .json(&json!({ "usuario": usuario, "clave": clave }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PergamoError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await?;
        let token = [
            &body["token"],
            &body["data"]["token"],
            &body["access_token"],
            &body["data"]["access_token"],
        ]
        .into_iter()
        .find_map(|v| v.as_str())
        .map(str::to_string);
        token.ok_or_else(|| PergamoError::Shape("no token in login response".to_string()))
    }
}

#[async_trait]
impl ReportSource for PergamoClient {
    async fn fetch_report(
        &self,
        kind: ReportKind,
        range: &MonthRange,
        token: &str,
    ) -> Result<Value, PergamoError> {
        let response = self
            .http
            .get(self.url(self.report_path(kind))?)
            .query(&[
                ("fecha_inicial", range.start_iso()),
                ("fecha_final", range.end_iso()),
            ])
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PergamoError::Status(response.status().as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn january() -> MonthRange {
        MonthRange {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        }
    }

    fn client(base_url: &str) -> PergamoClient {
        PergamoClient::new(PergamoConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_shape_check_per_report() {
        let invoices = json!({"data": {"h1": [], "h2": [], "h3": [{"Factura": "FE-1"}]}});
        assert!(ReportPayload::from_body(ReportKind::Invoices, invoices.clone()).is_ok());
        assert!(ReportPayload::from_body(ReportKind::Rips, invoices).is_err());

        let rips = json!({"data": {"report_rips": []}});
        assert!(ReportPayload::from_body(ReportKind::Rips, rips).is_ok());

        let error = json!({"error": "token expirado"});
        assert!(ReportPayload::from_body(ReportKind::Cancellations, error).is_err());
    }

    #[test]
    fn test_policy_uses_per_report_timeouts() {
        let config = PergamoConfig::default();
        assert_eq!(
            RetryPolicy::for_report(&config, ReportKind::Cancellations).timeout,
            Duration::from_secs(20)
        );
        assert_eq!(
            RetryPolicy::for_report(&config, ReportKind::Invoices).timeout,
            Duration::from_secs(60)
        );
        assert_eq!(RetryPolicy::for_report(&config, ReportKind::Rips).max_attempts, 3);
    }

    #[tokio::test]
    async fn test_fetch_sends_range_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reportes/facturacion"))
            .and(query_param("fecha_inicial", "2025-01-01"))
            .and(query_param("fecha_final", "2025-01-31"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"h3": [{"Factura": "FE-1"}, {"Factura": "FE-2"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let payload = fetch_with_retry(&client, ReportKind::Invoices, &january(), "tok-123", policy(3))
            .await
            .unwrap();
        assert_eq!(payload.rows("h3").len(), 2);
        assert!(payload.rows("h2").is_empty());
    }

    #[tokio::test]
    async fn test_http_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reportes/rips"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/reportes/rips"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"report_rips": [{}]}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let payload = fetch_with_retry(&client, ReportKind::Rips, &january(), "tok", policy(3)).await;
        assert_eq!(payload.unwrap().rows("report_rips").len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_shape_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reportes/anulaciones"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"h3": null}})))
            .expect(3)
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let payload =
            fetch_with_retry(&client, ReportKind::Cancellations, &january(), "tok", policy(3)).await;
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_slow_responses_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"h3": []}}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let policy = RetryPolicy {
            max_attempts: 2,
            timeout: Duration::from_millis(50),
        };
        let payload = fetch_with_retry(&client, ReportKind::Invoices, &january(), "tok", policy).await;
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_every_attempt() {
        let client = client("");
        let payload = fetch_with_retry(&client, ReportKind::Invoices, &january(), "tok", policy(2)).await;
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_json(json!({"usuario": "caja1", "clave": "secreta"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"token": "abc"}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        assert_eq!(client.login("caja1", "secreta").await.unwrap(), "abc");
        assert!(matches!(
            client.login("caja1", "mala").await,
            Err(PergamoError::Status(401))
        ));
    }

    #[tokio::test]
    async fn test_login_reads_alternative_token_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_json(json!({"usuario": "caja2", "clave": "x"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"access_token": "def"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        assert_eq!(client.login("caja2", "x").await.unwrap(), "def");
        assert!(matches!(
            client.login("caja3", "x").await,
            Err(PergamoError::Shape(_))
        ));
    }
}
