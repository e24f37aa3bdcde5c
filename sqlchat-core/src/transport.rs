//! Transport to the natural-language-to-SQL query service
//!
//! Provides a `QueryTransport` trait so the conversation core never depends on
//! how a question reaches the service, plus `HttpTransport`, the reqwest
//! implementation that speaks the service's JSON contract:
//! - `POST {base_url}{query_path}` with `{"question": ...}`
//! - `GET  {base_url}/health`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ServiceConfig;
use crate::models::{RemoteAnswer, TableRows};

// ============================================================================
// QueryTransport trait
// ============================================================================

/// Abstraction over the way questions reach the query service.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Ask one question. Resolves with the structured answer or fails with
    /// an error that may carry a human-readable detail.
    async fn ask_question(&self, question: &str) -> Result<RemoteAnswer, TransportError>;

    /// Transport name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no detail"))]
    Api { status: u16, message: Option<String> },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Transport failed: {}", .0.as_deref().unwrap_or("no detail"))]
    Failed(Option<String>),
}

impl TransportError {
    /// Best human-readable description of the failure, if one exists.
    ///
    /// Malformed responses carry no detail; callers show their generic message.
    pub fn detail(&self) -> Option<String> {
        match self {
            TransportError::Http(e) if e.is_timeout() => Some("timeout".to_string()),
            TransportError::Http(e) => Some(e.to_string()),
            TransportError::Api { status, message } => Some(
                message
                    .clone()
                    .unwrap_or_else(|| format!("Request failed with status code {status}")),
            ),
            TransportError::Malformed(_) => None,
            TransportError::Failed(detail) => detail.clone(),
        }
    }
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    sql_query: String,
    explanation: String,
    result: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    columns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
}

/// Database cells arrive as whatever JSON the driver produced; show them as text.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl TryFrom<QueryResponse> for RemoteAnswer {
    type Error = TransportError;

    fn try_from(resp: QueryResponse) -> Result<Self, Self::Error> {
        let rows = resp
            .result
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        let rows = TableRows::new(rows).map_err(|e| TransportError::Malformed(e.to_string()))?;

        let answer = RemoteAnswer::new(resp.sql_query, resp.explanation, rows);
        Ok(match resp.columns {
            Some(columns) => answer.with_columns(columns),
            None => answer,
        })
    }
}

/// Pull the service's error message out of a non-success body.
fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| match parsed.detail {
            Some(serde_json::Value::String(d)) if !d.trim().is_empty() => Some(d),
            _ => None,
        })
}

// ============================================================================
// HttpTransport
// ============================================================================

/// reqwest client for the query service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    query_path: String,
}

impl HttpTransport {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let query_path = if config.query_path.starts_with('/') {
            config.query_path.clone()
        } else {
            format!("/{}", config.query_path)
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            query_path,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the service's health document from `GET /health`.
    pub async fn health(&self) -> Result<serde_json::Value, TransportError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl QueryTransport for HttpTransport {
    async fn ask_question(&self, question: &str) -> Result<RemoteAnswer, TransportError> {
        let url = format!("{}{}", self.base_url, self.query_path);
        tracing::debug!(url = %url, "Sending question to query service");

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest { question })
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            tracing::warn!(
                status = status.as_u16(),
                message = message.as_deref().unwrap_or(""),
                "Query service returned an error"
            );
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        RemoteAnswer::try_from(parsed)
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> ServiceConfig {
        ServiceConfig {
            base_url,
            query_path: "/query/".to_string(),
            timeout_seconds: 5,
        }
    }

    fn mock_answer() -> serde_json::Value {
        serde_json::json!({
            "sql_query": "SELECT id, name FROM students",
            "explanation": "Lists every student",
            "result": [["1", "Alice"], ["2", "Bob"]],
            "row_count": 2
        })
    }

    #[tokio::test]
    async fn test_ask_question_posts_question_and_decodes_answer() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .and(path("/query/"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({ "question": "Who are the students?" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_answer()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let answer = transport.ask_question("Who are the students?").await.unwrap();

        assert_eq!(answer.sql_query, "SELECT id, name FROM students");
        assert_eq!(answer.explanation, "Lists every student");
        assert_eq!(answer.result_rows.len(), 2);
        assert_eq!(answer.result_rows.rows()[1], vec!["2", "Bob"]);
        assert!(answer.columns.is_none());
    }

    #[tokio::test]
    async fn test_non_string_cells_are_rendered_as_text() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sql_query": "SELECT COUNT(*), NULL FROM students",
                "explanation": "Counts",
                "result": [[42, null]]
            })))
            .mount(&mock_server)
            .await;

        let answer = transport.ask_question("count").await.unwrap();
        assert_eq!(answer.result_rows.rows()[0], vec!["42", ""]);
    }

    #[tokio::test]
    async fn test_column_names_are_passed_through() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        let mut body = mock_answer();
        body["columns"] = serde_json::json!(["id", "name"]);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&mock_server)
            .await;

        let answer = transport.ask_question("q").await.unwrap();
        assert_eq!(
            answer.columns,
            Some(vec!["id".to_string(), "name".to_string()])
        );
    }

    #[tokio::test]
    async fn test_error_body_message_is_preferred() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "Model quota exhausted",
                "detail": "ignored"
            })))
            .mount(&mock_server)
            .await;

        let err = transport.ask_question("q").await.unwrap_err();
        match &err {
            TransportError::Api { status, .. } => assert_eq!(*status, 500),
            other => panic!("Expected Api error, got {:?}", other),
        }
        assert_eq!(err.detail().as_deref(), Some("Model quota exhausted"));
    }

    #[tokio::test]
    async fn test_error_body_detail_is_used_when_message_missing() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "detail": "Only SELECT queries are allowed"
            })))
            .mount(&mock_server)
            .await;

        let err = transport.ask_question("drop everything").await.unwrap_err();
        assert_eq!(err.detail().as_deref(), Some("Only SELECT queries are allowed"));
    }

    #[tokio::test]
    async fn test_status_code_fallback_when_body_has_no_detail() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let err = transport.ask_question("q").await.unwrap_err();
        assert_eq!(
            err.detail().as_deref(),
            Some("Request failed with status code 502")
        );
    }

    #[tokio::test]
    async fn test_missing_fields_are_malformed_without_detail() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "sql_query": "SELECT 1" })),
            )
            .mount(&mock_server)
            .await;

        let err = transport.ask_question("q").await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
        assert!(err.detail().is_none());
    }

    #[tokio::test]
    async fn test_ragged_result_is_malformed() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sql_query": "SELECT *",
                "explanation": "x",
                "result": [["1", "Alice"], ["2"]]
            })))
            .mount(&mock_server)
            .await;

        let err = transport.ask_question("q").await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_reports_http_error() {
        // Nothing listens on the discard port.
        let transport =
            HttpTransport::new(&test_config("http://127.0.0.1:9".to_string())).unwrap();

        let err = transport.ask_question("q").await.unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
        assert!(err.detail().is_some());
    }

    #[tokio::test]
    async fn test_health_returns_body() {
        let mock_server = MockServer::start().await;
        let transport = HttpTransport::new(&test_config(mock_server.uri())).unwrap();

        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "healthy",
                "database": "connected",
                "student_count": 12,
                "service": "NL-to-SQL API"
            })))
            .mount(&mock_server)
            .await;

        let health = transport.health().await.unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["student_count"], 12);
    }

    #[test]
    fn test_query_path_and_base_url_are_normalized() {
        let transport = HttpTransport::new(&ServiceConfig {
            base_url: "http://localhost:8000/".to_string(),
            query_path: "query/".to_string(),
            timeout_seconds: 5,
        })
        .unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
        assert_eq!(transport.query_path, "/query/");
    }

    #[test]
    fn test_failed_error_carries_its_detail() {
        assert_eq!(
            TransportError::Failed(Some("timeout".to_string()))
                .detail()
                .as_deref(),
            Some("timeout")
        );
        assert!(TransportError::Failed(None).detail().is_none());
    }
}
