//! HTTP client for the remote commerce API with safe logging.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use secrecy::ExposeSecret;
use tracing::info;
use url::Url;

use crate::commerce::StoreCredentials;
use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// User agent string for all commerce API requests.
const CLIENT_USER_AGENT: &str = "ordersurge/0.1.0";

/// Default whole-request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// CommerceClient
// ─────────────────────────────────────────────────────────────────────────────

/// Thread-safe HTTP client bound to one store's credentials.
///
/// Requests authenticate with basic auth from the store's API key and
/// secret. Logging records only the HTTP method, URL path, status, and
/// duration; never credentials, query strings, or bodies.
#[derive(Debug, Clone)]
pub struct CommerceClient {
    http: reqwest::Client,
    base_url: Url,
    creds: StoreCredentials,
}

impl CommerceClient {
    /// Creates a new client for the given store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the store endpoint is not a valid URL
    /// or the HTTP client fails to initialize.
    pub fn new(creds: StoreCredentials) -> Result<Self, AppError> {
        let base_url = Url::parse(&creds.store_endpoint).map_err(|_| {
            AppError::Internal(format!(
                "Invalid store endpoint for account {}",
                creds.account
            ))
        })?;

        Ok(Self {
            http: build_http_client()?,
            base_url,
            creds,
        })
    }

    /// The account this client is bound to.
    pub fn account(&self) -> &str {
        &self.creds.account
    }

    /// Executes an authenticated GET request against an API path.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response, AppError> {
        self.request(Method::GET, path, None).await
    }

    /// Executes an authenticated POST request with a JSON body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, AppError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| AppError::Internal(format!("Failed to encode request body: {e}")))?;
        self.request(Method::POST, path, Some(bytes)).await
    }

    /// Executes a request with timing, logging, and sanitized errors.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, AppError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|_| AppError::Internal(format!("Invalid path: {path}")))?;

        let mut request = self.http.request(method.clone(), url.as_str()).basic_auth(
            self.creds.api_key.expose_secret(),
            Some(self.creds.api_secret.expose_secret()),
        );

        if let Some(bytes) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(bytes);
        }

        let start = Instant::now();
        let result = request.send().await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(response) => {
                info!(
                    "[API] {} {} {} {}ms",
                    method,
                    url.path(),
                    response.status().as_u16(),
                    duration_ms
                );
                Ok(response)
            }
            Err(_) => {
                // The raw reqwest error may contain the full URL; never
                // propagate it.
                info!("[API] {} {} FAILED {}ms", method, url.path(), duration_ms);
                Err(AppError::ConnectionFailed(
                    "Connection to commerce API failed".to_string(),
                ))
            }
        }
    }
}

/// Builds the configured HTTP client.
fn build_http_client() -> Result<reqwest::Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_creds(endpoint: &str) -> StoreCredentials {
        StoreCredentials {
            account: "acme".to_string(),
            api_key: SecretString::from("key".to_string()),
            api_secret: SecretString::from("secret".to_string()),
            store_endpoint: endpoint.to_string(),
        }
    }

    #[test]
    fn new_succeeds_with_valid_endpoint() {
        let client = CommerceClient::new(test_creds("https://acme.example.com"));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().account(), "acme");
    }

    #[test]
    fn new_rejects_invalid_endpoint() {
        let result = CommerceClient::new(test_creds("not a url"));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn build_http_client_succeeds() {
        assert!(build_http_client().is_ok());
    }
}
