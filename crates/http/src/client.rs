//! Bearer-token transport over reqwest

use crate::config::ClientConfig;
use crate::crud::{Reports, Sheets};
use crate::error::{ApiError, ApiResult};
use gridlink_sheet::LoadOptions;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde_json::Value as JsonValue;

/// Async client for the spreadsheet API
///
/// # Example
///
/// ```ignore
/// use gridlink_http::{Client, ClientConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new(ClientConfig::new("my-token"))?;
///     for sheet in client.sheets().list().await? {
///         println!("{:?} {}", sheet.id, sheet.name);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    /// Create a client from the given configuration
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| ApiError::Config("token contains invalid header characters".into()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { http, config })
    }

    /// Create a client configured from `GRIDLINK_*` environment variables
    pub fn from_env() -> ApiResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn load_options(&self) -> LoadOptions {
        self.config.load_options()
    }

    /// Sheet operations
    pub fn sheets(&self) -> Sheets<'_> {
        Sheets::new(self)
    }

    /// Report operations (read-only)
    pub fn reports(&self) -> Reports<'_> {
        Reports::new(self)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.api_root.trim_end_matches('/'), endpoint)
    }

    pub(crate) async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> ApiResult<JsonValue> {
        let request = self.request(Method::GET, endpoint).query(query);
        self.send(request).await
    }

    pub(crate) async fn post_json(&self, endpoint: &str, body: &JsonValue) -> ApiResult<JsonValue> {
        let request = self.request(Method::POST, endpoint).json(body);
        self.send(request).await
    }

    pub(crate) async fn put_json(&self, endpoint: &str, body: &JsonValue) -> ApiResult<JsonValue> {
        let request = self.request(Method::PUT, endpoint).json(body);
        self.send(request).await
    }

    pub(crate) async fn delete_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> ApiResult<JsonValue> {
        let request = self.request(Method::DELETE, endpoint).query(query);
        self.send(request).await
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = self.url(endpoint);
        tracing::debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    // An empty success body reads as `null`.
    async fn send(&self, request: RequestBuilder) -> ApiResult<JsonValue> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!("Request failed with HTTP {}: {}", status, body);
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_root_and_endpoint() {
        let client =
            Client::new(ClientConfig::new("t").api_root("http://localhost:8080/2.0/")).unwrap();
        assert_eq!(client.url("/sheets/1"), "http://localhost:8080/2.0/sheets/1");
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let err = Client::new(ClientConfig::new("bad\ntoken")).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
