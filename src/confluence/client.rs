//! Confluence Server REST client.
//!
//! Authenticates with a Personal Access Token and maps HTTP failures onto
//! [`PublishError`]. Transport failures (refused connection, timeout) are
//! retried with a fixed delay; HTTP error statuses are returned at once.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::api::{NewPage, PageInfo, SpaceInfo, WikiApi};
use super::error::{PublishError, Result};
use crate::config::ConfluenceConfig;

const CONTENT_PATH: &str = "/rest/api/content";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: String,
    pub space_key: String,
    pub parent_page_id: Option<String>,
    pub timeout: Duration,
    /// Total attempts per request; values below 1 are treated as 1
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ClientConfig {
    pub fn from_config(config: &ConfluenceConfig, api_token: String) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_token,
            space_key: config.space_key.clone(),
            parent_page_id: config.parent_page_id.clone(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<PageInfo>,
}

pub struct ConfluenceClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ConfluenceClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        validate(&config)?;

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .map_err(|e| PublishError::Validation(format!("invalid API token: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PublishError::Validation(format!("failed to build HTTP client: {}", e)))?;

        info!("Initialized Confluence client for {}", config.base_url);
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Send one API request, retrying transport failures.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let attempts = self.config.max_retries.max(1);

        for attempt in 1..=attempts {
            let mut builder = self.client.request(method.clone(), &url);
            if !query.is_empty() {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => {
                    debug!("{} {} -> {}", method, url, response.status());
                    return classify(response).await;
                }
                Err(e) => {
                    if attempt == attempts {
                        return Err(PublishError::Network(format!(
                            "{} {} failed after {} attempt(s): {}",
                            method, url, attempts, e
                        )));
                    }
                    warn!(
                        "Attempt {} of {} for {} {} failed, retrying in {:?}: {}",
                        attempt, attempts, method, url, self.config.retry_delay, e
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }

        Err(PublishError::Network(format!(
            "{} {} exhausted retries",
            method, url
        )))
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let response = self.request(method, path, query, body).await?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| PublishError::Network(format!("failed to read response: {}", e)))?;
        serde_json::from_str(&text).map_err(|e| PublishError::Api {
            status,
            message: format!("unexpected response body: {}", e),
        })
    }
}

/// Quote a value for use inside a CQL string literal.
fn cql_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn validate(config: &ClientConfig) -> Result<()> {
    if config.base_url.trim().is_empty() {
        return Err(PublishError::Validation("base_url is not set".into()));
    }
    let url = Url::parse(&config.base_url)
        .map_err(|e| PublishError::Validation(format!("invalid base_url: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(PublishError::Validation(format!(
            "base_url must be an absolute http(s) URL: {}",
            config.base_url
        )));
    }
    if config.api_token.trim().is_empty() {
        return Err(PublishError::Validation(
            "Personal Access Token is not set".into(),
        ));
    }
    if config.space_key.trim().is_empty() {
        return Err(PublishError::Validation("space_key is not set".into()));
    }
    Ok(())
}

async fn classify(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => PublishError::Authentication(
            "Confluence rejected the access token".into(),
        ),
        StatusCode::FORBIDDEN => {
            PublishError::Permission("insufficient permissions for this operation".into())
        }
        StatusCode::NOT_FOUND => PublishError::NotFound("resource not found".into()),
        _ => PublishError::Api {
            status: status.as_u16(),
            message: body,
        },
    })
}

#[async_trait]
impl WikiApi for ConfluenceClient {
    async fn create_page(&self, page: NewPage<'_>) -> Result<PageInfo> {
        let mut payload = json!({
            "type": "page",
            "title": page.title,
            "space": {"key": page.space_key},
            "body": {
                "storage": {
                    "value": page.body,
                    "representation": "storage"
                }
            }
        });
        if let Some(parent) = page.parent_page_id {
            payload["ancestors"] = json!([{ "id": parent }]);
        }

        let created: PageInfo = self
            .request_json(Method::POST, CONTENT_PATH, &[], Some(&payload))
            .await?;
        info!("Created Confluence page {} ({})", created.id, page.title);
        Ok(created)
    }

    async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        body: &str,
        current_version: u64,
    ) -> Result<PageInfo> {
        let payload = json!({
            "version": {"number": current_version + 1},
            "title": title,
            "type": "page",
            "body": {
                "storage": {
                    "value": body,
                    "representation": "storage"
                }
            }
        });

        let path = format!("{}/{}", CONTENT_PATH, page_id);
        let updated: PageInfo = self
            .request_json(Method::PUT, &path, &[], Some(&payload))
            .await?;
        info!(
            "Updated Confluence page {} to version {}",
            page_id,
            current_version + 1
        );
        Ok(updated)
    }

    async fn get_page_info(&self, page_id: &str) -> Result<PageInfo> {
        let path = format!("{}/{}", CONTENT_PATH, page_id);
        self.request_json(
            Method::GET,
            &path,
            &[("expand", "space,version,ancestors".to_string())],
            None,
        )
        .await
    }

    async fn delete_page(&self, page_id: &str) -> Result<()> {
        let path = format!("{}/{}", CONTENT_PATH, page_id);
        self.request(Method::DELETE, &path, &[], None).await?;
        info!("Deleted Confluence page {}", page_id);
        Ok(())
    }

    async fn search_pages(
        &self,
        query: &str,
        space_key: Option<&str>,
        limit: u32,
    ) -> Result<Vec<PageInfo>> {
        let space_key = space_key.unwrap_or(&self.config.space_key);
        let cql = format!(
            "space = {} AND text ~ {}",
            cql_string(space_key),
            cql_string(query)
        );
        let results: SearchResults = self
            .request_json(
                Method::GET,
                "/rest/api/content/search",
                &[("cql", cql), ("limit", limit.to_string())],
                None,
            )
            .await?;
        Ok(results.results)
    }

    async fn get_space_info(&self, space_key: Option<&str>) -> Result<SpaceInfo> {
        let space_key = space_key.unwrap_or(&self.config.space_key);
        let path = format!("/rest/api/space/{}", space_key);
        self.request_json(Method::GET, &path, &[], None).await
    }

    async fn test_connection(&self) -> bool {
        match self.request(Method::GET, "/rest/api/space", &[], None).await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                warn!("Confluence connection test failed: {}", e);
                false
            }
        }
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn default_space(&self) -> &str {
        &self.config.space_key
    }

    fn default_parent(&self) -> Option<&str> {
        self.config.parent_page_id.as_deref()
    }
}
