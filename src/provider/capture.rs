//! HTTP screenshot service client.
//!
//! POSTs `{"url": ..., "path": ...}` to the configured endpoint and expects
//! `{"status": "ok" | "error", "url"?: ..., "error"?: ...}` back.

use reqwest::Client;
use serde::Serialize;

use super::{status_error, CaptureOutcome, CaptureProvider, ProviderError, ProviderFuture};

#[derive(Debug, Serialize)]
struct CaptureRequest<'a> {
    url: &'a str,
    path: &'a str,
}

/// `CaptureProvider` that delegates rendering to a remote service.
pub struct HttpCaptureProvider {
    http: Client,
    endpoint: String,
}

impl HttpCaptureProvider {
    pub fn new(endpoint: &str) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(concat!("screenmap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CaptureProvider for HttpCaptureProvider {
    fn capture<'a>(&'a self, url: &'a str, screen_path: &'a str) -> ProviderFuture<'a, CaptureOutcome> {
        Box::pin(async move {
            let response = self
                .http
                .post(&self.endpoint)
                .json(&CaptureRequest { url, path: screen_path })
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        ProviderError::Timeout
                    } else {
                        ProviderError::Network(e)
                    }
                })?;

            if let Some(err) = status_error(response.status().as_u16(), screen_path) {
                return Err(err);
            }

            response
                .json::<CaptureOutcome>()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CaptureStatus;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(CaptureRequest {
            url: "https://preview.example.com/settings",
            path: "/settings",
        })
        .unwrap();
        assert_eq!(body["url"], "https://preview.example.com/settings");
        assert_eq!(body["path"], "/settings");
    }

    #[test]
    fn test_outcome_parses_without_optional_fields() {
        let outcome: CaptureOutcome = serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert_eq!(outcome.status, CaptureStatus::Error);
        assert!(outcome.url.is_none());
    }
}
