//! HTTP utilities for AWS REST API calls
//!
//! Thin wrapper over reqwest that signs each request, maps provider
//! status codes onto [`GatewayError`], and parses JSON bodies.

use super::auth::AwsCredentials;
use crate::gateway::GatewayError;
use anyhow::Result;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging: truncate long responses and strip
/// non-printable characters.
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_LOG_BODY_LENGTH)
            .last()
            .unwrap_or(0);
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..cut],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the provider's `message` field out of an error body, falling back
/// to the sanitized raw body.
fn extract_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        if let Some(message) = parsed.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    sanitize_for_log(body)
}

/// HTTP client wrapper that signs every request with SigV4.
#[derive(Clone)]
pub struct SignedHttpClient {
    client: reqwest::Client,
    credentials: AwsCredentials,
}

impl SignedHttpClient {
    pub fn new(credentials: AwsCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("apigwctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(anyhow::Error::from)?;

        Ok(Self {
            client,
            credentials,
        })
    }

    pub async fn get(&self, url: &str) -> Result<Value, GatewayError> {
        self.request(http::Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value, GatewayError> {
        self.request(http::Method::POST, url, Some(body)).await
    }

    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value, GatewayError> {
        self.request(http::Method::PATCH, url, Some(body)).await
    }

    pub async fn delete(&self, url: &str) -> Result<Value, GatewayError> {
        self.request(http::Method::DELETE, url, None).await
    }

    async fn request(
        &self,
        method: http::Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        tracing::debug!("{} {}", method, url);

        let payload = match body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };

        let host = host_header(url)?;
        let mut builder = http::Request::builder()
            .method(method)
            .uri(url)
            .header("host", &host);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let mut request = builder
            .body(payload)
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        self.credentials
            .sign_request(&mut request)
            .map_err(|e| GatewayError::Signing(format!("{e:#}")))?;

        let request = reqwest::Request::try_from(request)?;
        let response = self.client.execute(request).await?;

        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(extract_message(&text)));
        }
        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: extract_message(&text),
            });
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Host header value for the request URL, including any non-default port.
fn host_header(url: &str) -> Result<String, GatewayError> {
    let parsed = url::Url::parse(url).map_err(|e| GatewayError::Request(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| GatewayError::Request(format!("URL has no host: {url}")))?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_header_includes_explicit_port() {
        assert_eq!(
            host_header("http://127.0.0.1:8080/apikeys").unwrap(),
            "127.0.0.1:8080"
        );
        assert_eq!(
            host_header("https://apigateway.us-east-1.amazonaws.com/apikeys").unwrap(),
            "apigateway.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn extract_message_prefers_provider_field() {
        assert_eq!(
            extract_message(r#"{"message": "Invalid Model Name"}"#),
            "Invalid Model Name"
        );
        assert_eq!(extract_message("plain text"), "plain text");
    }

    #[test]
    fn sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("truncated"));
        assert!(sanitized.len() < body.len());
    }
}
