use std::env;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;

use crate::api::{ChatApi, ChatStream};
use crate::error::{Error, Result};
use crate::observability;
use crate::sse::process_sse;
use crate::types::{SessionInitParams, SessionRecord, SessionSummary, StreamRequest};

const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Response header carrying the server-assigned session id.
const SESSION_ID_HEADER: &str = "Session-Id";
/// Response header carrying the server-assigned exchange id.
const EXCHANGE_ID_HEADER: &str = "Exchange-Id";

/// HTTP client for the tutor chat API.
#[derive(Debug, Clone)]
pub struct TutorClient {
    auth_token: String,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl TutorClient {
    /// Create a new tutor chat client.
    ///
    /// The auth token can be provided directly or read from the
    /// TUTORSTREAM_API_TOKEN environment variable.
    pub fn new(auth_token: Option<String>) -> Result<Self> {
        Self::with_options(auth_token, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        auth_token: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let auth_token = match auth_token {
            Some(token) => token,
            None => env::var("TUTORSTREAM_API_TOKEN").map_err(|_| {
                Error::authentication(
                    "Auth token not provided and TUTORSTREAM_API_TOKEN environment variable not set",
                )
            })?,
        };

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            auth_token,
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout,
        })
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.auth_token))
                .expect("auth token should be valid header material"),
        );
        headers
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        // Try to parse error response body
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed_error = serde_json::from_str::<ErrorResponse>(&error_body).ok();
        let error_type = parsed_error
            .as_ref()
            .and_then(|e| e.error.as_ref())
            .and_then(|e| e.error_type.clone());
        let error_message = parsed_error
            .as_ref()
            .and_then(|e| e.error.as_ref())
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());

        match status_code {
            401 | 403 => Error::authentication(error_message),
            404 => Error::not_found(error_message, None, None),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }

    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::process_error_response(response).await)
        }
    }
}

#[async_trait::async_trait]
impl ChatApi for TutorClient {
    async fn get_session_by_id(&self, session_id: &str) -> Result<SessionRecord> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/sessions/{session_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = match Self::check(response).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                return Err(Error::not_found(
                    "session does not exist",
                    Some("session".to_string()),
                    Some(session_id.to_string()),
                ));
            }
            Err(e) => {
                observability::CLIENT_REQUEST_ERRORS.click();
                return Err(e);
            }
        };
        response.json::<SessionRecord>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse session record: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    async fn initialize_session(&self, params: SessionInitParams) -> Result<()> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/sessions", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .json(&params)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_chat_stream(&self, request: StreamRequest) -> Result<ChatStream> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/stream", self.base_url);

        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::check(response).await?;

        // Metadata must be read from the headers before the body is consumed
        let header_value = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|val| val.to_str().ok())
                .map(String::from)
        };
        let session_id = header_value(SESSION_ID_HEADER);
        let exchange_id = header_value(EXCHANGE_ID_HEADER);

        let events = process_sse(response.bytes_stream());
        Ok(ChatStream::new(session_id, exchange_id, events))
    }

    async fn complete_exchange(
        &self,
        exchange_id: &str,
        text: &str,
        has_whiteboard: bool,
    ) -> Result<()> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/exchanges/{exchange_id}/complete", self.base_url);
        let body = serde_json::json!({
            "response_text": text,
            "has_whiteboard": has_whiteboard,
        });
        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn bookmark_exchange(&self, exchange_id: &str, bookmarked: bool) -> Result<()> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/exchanges/{exchange_id}/bookmark", self.base_url);
        let body = serde_json::json!({ "bookmarked": bookmarked });
        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/sessions/{session_id}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .headers(self.default_headers())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/sessions/{session_id}/end", self.base_url);
        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_sessions(&self) -> Result<Vec<SessionSummary>> {
        observability::CLIENT_REQUESTS.click();
        let url = format!("{}chat/sessions", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.default_headers())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let response = Self::check(response).await?;
        response.json::<Vec<SessionSummary>>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse session list: {e}"),
                Some(Box::new(e)),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = TutorClient::new(Some("test-token".to_string())).unwrap();
        assert_eq!(client.auth_token, "test-token");
        assert_eq!(client.base_url, DEFAULT_API_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = TutorClient::with_options(
            Some("test-token".to_string()),
            Some("https://tutor.example.com/api/v1/".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://tutor.example.com/api/v1/");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }
}
