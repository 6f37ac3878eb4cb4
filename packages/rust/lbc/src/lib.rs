//! Client for the LearnBlockchain (LBC) article API.
//!
//! Two endpoints are used, both form-encoded with an `x-api-key` header:
//! `POST /api/post/article` creates an article and returns its id, and
//! `POST /api/article/update` replaces the body of an existing one.
//! The API signals success with HTTP 200 and `{"code": 0}`; any other code
//! is a [`BlockdocsError::Rejected`].
//!
//! Publishing retries on HTTP 504 only, since the gateway is known to time
//! out while the article is still being created.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use blockdocs_shared::{ArticleId, BlockdocsError, LbcConfig, Result, env_value};

const PUBLISH_PATH: &str = "/api/post/article";
const UPDATE_PATH: &str = "/api/article/update";

/// User-Agent string for LBC requests.
const USER_AGENT: &str = concat!("blockdocs/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Resolved connection settings for [`LbcClient`].
#[derive(Debug, Clone)]
pub struct LbcOptions {
    pub base_url: String,
    pub api_key: String,
    /// Total publish attempts while the API answers 504.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl LbcOptions {
    /// Build options from config, reading the base URL and key from the environment.
    pub fn from_config(config: &LbcConfig) -> Result<Self> {
        let base_url = match &config.base_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => env_value(&config.base_url_env)?,
        };

        Ok(Self {
            base_url,
            api_key: env_value(&config.api_key_env)?,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Form body of a publish request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticlePayload {
    pub title: String,
    pub content: String,
    pub summary: String,
    /// Original-source link; always empty for locally authored articles.
    pub link: String,
    pub author_id: u64,
    pub category_id: u64,
    pub proofread: bool,
    pub is_public: bool,
    /// Comma-separated tag list.
    pub tags: String,
    pub featured: u8,
    pub level: u8,
    #[serde(rename = "type")]
    pub article_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub createday: Option<String>,
}

impl ArticlePayload {
    /// Payload with the fixed fields taken from config.
    pub fn new(config: &LbcConfig, title: String, content: String, summary: String, tags: String) -> Self {
        Self {
            title,
            content,
            summary,
            link: String::new(),
            author_id: config.author_id,
            category_id: config.category_id,
            proofread: false,
            is_public: true,
            tags,
            featured: config.featured,
            level: config.level,
            article_type: config.article_type,
            createday: config.createday.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdatePayload<'a> {
    article_id: ArticleId,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    article_id: Option<ArticleId>,
    #[serde(default)]
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// LBC API client.
pub struct LbcClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl LbcClient {
    pub fn new(opts: LbcOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| BlockdocsError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: opts.base_url.trim_end_matches('/').to_string(),
            api_key: opts.api_key,
            max_retries: opts.max_retries.max(1),
            retry_delay: opts.retry_delay,
        })
    }

    /// Create an article and return the id assigned by the API.
    #[instrument(skip_all, fields(title = %payload.title))]
    pub async fn publish(&self, payload: &ArticlePayload) -> Result<ArticleId> {
        let url = format!("{}{PUBLISH_PATH}", self.base_url);

        for attempt in 1..=self.max_retries {
            let (status, body) = self.post_form(&url, payload).await?;

            if status == StatusCode::GATEWAY_TIMEOUT {
                if attempt < self.max_retries {
                    warn!(
                        attempt,
                        max = self.max_retries,
                        delay_secs = self.retry_delay.as_secs(),
                        "publish hit 504, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
                warn!(attempts = attempt, "publish hit 504, giving up");
                return Err(BlockdocsError::GatewayTimeout { attempts: attempt });
            }

            let response = check_response(status, &body)?;
            let id = response
                .article_id
                .ok_or_else(|| BlockdocsError::parse("publish response has no article_id"))?;
            info!(%id, attempt, "article published");
            return Ok(id);
        }

        Err(BlockdocsError::GatewayTimeout {
            attempts: self.max_retries,
        })
    }

    /// Replace the body of a published article.
    #[instrument(skip(self, content), fields(chars = content.len()))]
    pub async fn update(&self, article_id: ArticleId, content: &str) -> Result<()> {
        let url = format!("{}{UPDATE_PATH}", self.base_url);
        let payload = UpdatePayload {
            article_id,
            content,
        };

        let (status, body) = self.post_form(&url, &payload).await?;
        check_response(status, &body)?;
        info!(%article_id, "article updated");
        Ok(())
    }

    async fn post_form<T: Serialize + ?Sized>(&self, url: &str, form: &T) -> Result<(StatusCode, String)> {
        debug!(url, "POST");
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .form(form)
            .send()
            .await
            .map_err(|e| BlockdocsError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BlockdocsError::Network(format!("failed to read response from {url}: {e}")))?;
        Ok((status, body))
    }
}

/// Map a non-504 response to the API's success/failure signalling.
fn check_response(status: StatusCode, body: &str) -> Result<ApiResponse> {
    if status != StatusCode::OK {
        return Err(BlockdocsError::Http {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        });
    }

    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| BlockdocsError::parse(format!("invalid LBC response: {e}")))?;

    if response.code != 0 {
        return Err(BlockdocsError::Rejected {
            code: response.code,
            message: response.message.unwrap_or_default(),
        });
    }
    Ok(response)
}
