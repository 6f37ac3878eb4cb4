//! Article summarization through an OpenAI-compatible chat completions API.
//!
//! The model is asked for a JSON object with a short Chinese title, a summary
//! and up to six keywords. Providers differ in how strictly they honour
//! `response_format`, so the reply is parsed leniently: code fences are
//! stripped and a top-level array yields its first element. Anything that
//! still fails to parse is a [`BlockdocsError::Parse`] for the caller to
//! fall back on.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use blockdocs_shared::{ArticleAnalysis, BlockdocsError, LlmConfig, Result, env_value, env_value_opt};

/// Model-name prefix that routes a request through OpenRouter.
pub const OPENROUTER_PREFIX: &str = "openrouter:";

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// User-Agent string for summarization requests.
const USER_AGENT: &str = concat!("blockdocs/", env!("CARGO_PKG_VERSION"));

const SYSTEM_PROMPT: &str = r#"
你是编程及区块链技术专家，用户会提供一段以太坊智能合约开发相关的内容，请总结内容并提取标题、摘要和关键词。

输出必须是如下格式的 JSON 对象：
{
    "title": "中文标题，不超过18个字",
    "summary": "用中文简明扼要地概括核心内容，1-3句话，150字以内，不要介绍文章结构或适合的读者。",
    "keywords": ["关键词通常为技术术语，最多6个，尽量使用中文"]
}
"#;

// ---------------------------------------------------------------------------
// Provider routing
// ---------------------------------------------------------------------------

/// Which API a model name is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    OpenRouter,
}

/// Provider plus the model id as the provider expects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub provider: Provider,
    pub model: String,
}

/// Split an `openrouter:`-prefixed model name; everything else goes to OpenAI.
pub fn resolve_model(model: &str) -> ModelRoute {
    match model.strip_prefix(OPENROUTER_PREFIX) {
        Some(rest) => ModelRoute {
            provider: Provider::OpenRouter,
            model: rest.to_string(),
        },
        None => ModelRoute {
            provider: Provider::OpenAi,
            model: model.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Resolved settings for a [`Summarizer`].
#[derive(Debug, Clone)]
pub struct SummarizerOptions {
    /// API root, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub api_key: String,
    /// Model id without any routing prefix.
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl SummarizerOptions {
    /// Resolve the provider's key and base URL from the configured env vars.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let route = resolve_model(&config.model);
        let (key_env, url_env, default_url) = match route.provider {
            Provider::OpenAi => (
                &config.openai_api_key_env,
                &config.openai_base_url_env,
                OPENAI_DEFAULT_BASE_URL,
            ),
            Provider::OpenRouter => (
                &config.openrouter_api_key_env,
                &config.openrouter_base_url_env,
                OPENROUTER_DEFAULT_BASE_URL,
            ),
        };

        Ok(Self {
            base_url: env_value_opt(url_env).unwrap_or_else(|| default_url.to_string()),
            api_key: env_value(key_env)?,
            model: route.model,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    response_format: ResponseFormat,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Summarization client for one provider and model.
pub struct Summarizer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl Summarizer {
    pub fn new(opts: SummarizerOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| BlockdocsError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(&opts.base_url),
            api_key: opts.api_key,
            model: opts.model,
            temperature: opts.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model for title, summary, and keywords of `markdown`.
    #[instrument(skip_all, fields(model = %self.model, chars = markdown.len()))]
    pub async fn analyze(&self, markdown: &str) -> Result<ArticleAnalysis> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: markdown,
                },
            ],
        };

        info!("waiting for model analysis");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BlockdocsError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BlockdocsError::Network(format!("failed to read model response: {e}")))?;

        if !status.is_success() {
            return Err(BlockdocsError::Http {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            BlockdocsError::parse(format!("invalid chat response: {e} (got: {})", truncate(&body, 200)))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BlockdocsError::parse("chat response has no message content"))?;

        debug!(reply_len = content.len(), "model replied");
        parse_analysis(&content)
    }
}

/// Parse a model reply into an [`ArticleAnalysis`].
pub fn parse_analysis(reply: &str) -> Result<ArticleAnalysis> {
    let cleaned = reply.replace("```json", "").replace("```", "");

    let value: serde_json::Value = serde_json::from_str(cleaned.trim())
        .map_err(|e| BlockdocsError::parse(format!("model reply is not JSON: {e}")))?;

    let record = match value {
        serde_json::Value::Array(items) => {
            debug!(len = items.len(), "model returned an array, taking the first element");
            items
                .into_iter()
                .next()
                .ok_or_else(|| BlockdocsError::parse("model returned an empty array"))?
        }
        other => other,
    };

    let analysis: ArticleAnalysis = serde_json::from_value(record)
        .map_err(|e| BlockdocsError::parse(format!("unexpected analysis shape: {e}")))?;

    Ok(analysis.normalized())
}

/// Resolve the chat completions endpoint from an API root.
fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn opts(base_url: &str) -> SummarizerOptions {
        SummarizerOptions {
            base_url: base_url.to_string(),
            api_key: "test-key".into(),
            model: "google/gemini-2.0-flash-001".into(),
            temperature: 1.0,
            timeout: Duration::from_secs(5),
        }
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn model_routing() {
        let route = resolve_model("openrouter:google/gemini-2.0-flash-001");
        assert_eq!(route.provider, Provider::OpenRouter);
        assert_eq!(route.model, "google/gemini-2.0-flash-001");

        let route = resolve_model("gpt-4o-mini-2024-07-18");
        assert_eq!(route.provider, Provider::OpenAi);
        assert_eq!(route.model, "gpt-4o-mini-2024-07-18");
    }

    #[test]
    fn endpoint_resolution() {
        assert_eq!(
            chat_endpoint("https://openrouter.ai/api/v1/"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost/v1/chat/completions"),
            "http://localhost/v1/chat/completions"
        );
    }

    #[test]
    fn parse_plain_object() {
        let a = parse_analysis(r#"{"title":"存储布局","summary":"讲解存储槽","keywords":["存储","Gas"]}"#)
            .expect("parse");
        assert_eq!(a.title.as_deref(), Some("存储布局"));
        assert_eq!(a.keywords, vec!["存储", "Gas"]);
    }

    #[test]
    fn parse_array_takes_first() {
        let a = parse_analysis(r#"[{"title":"first"},{"title":"second"}]"#).expect("parse");
        assert_eq!(a.title.as_deref(), Some("first"));
    }

    #[test]
    fn parse_strips_code_fences() {
        let a = parse_analysis("```json\n{\"title\":\"t\",\"keywords\":[]}\n```").expect("parse");
        assert_eq!(a.title.as_deref(), Some("t"));
    }

    #[test]
    fn parse_null_keywords_keeps_title_and_summary() {
        let a = parse_analysis(r#"{"title":"存储布局","summary":"讲解存储槽","keywords":null}"#)
            .expect("parse");
        assert_eq!(a.title.as_deref(), Some("存储布局"));
        assert_eq!(a.summary.as_deref(), Some("讲解存储槽"));
        assert!(a.keywords.is_empty());
    }

    #[test]
    fn parse_failures_are_parse_errors() {
        assert!(matches!(parse_analysis("not json"), Err(BlockdocsError::Parse { .. })));
        assert!(matches!(parse_analysis("[]"), Err(BlockdocsError::Parse { .. })));
        assert!(matches!(
            parse_analysis(r#"{"keywords": "not a list"}"#),
            Err(BlockdocsError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn analyze_against_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "google/gemini-2.0-flash-001",
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
                r#"{"title":"Gas 优化","summary":"介绍 Gas 优化技巧","keywords":["Gas","存储","优化","EVM","Solidity","合约","多余"]}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = Summarizer::new(opts(&server.uri())).expect("client");
        let analysis = summarizer.analyze("# Gas\n\nbody").await.expect("analyze");

        assert_eq!(analysis.title.as_deref(), Some("Gas 优化"));
        assert_eq!(analysis.keywords.len(), 6);
    }

    #[tokio::test]
    async fn malformed_reply_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("sorry, no JSON")))
            .mount(&server)
            .await;

        let summarizer = Summarizer::new(opts(&server.uri())).expect("client");
        let err = summarizer.analyze("body").await.unwrap_err();
        assert!(matches!(err, BlockdocsError::Parse { .. }));
    }

    #[tokio::test]
    async fn server_error_is_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let summarizer = Summarizer::new(opts(&server.uri())).expect("client");
        match summarizer.analyze("body").await {
            Err(BlockdocsError::Http { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}
