//! Application configuration for blockdocs.
//!
//! User config lives at `~/.blockdocs/blockdocs.toml` (or the path passed with
//! `--config`). The file only ever names environment variables for secrets;
//! values are resolved once at process entry with [`env_value`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BlockdocsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "blockdocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blockdocs";

// ---------------------------------------------------------------------------
// Config structs (matching blockdocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Publishing API settings.
    #[serde(default)]
    pub lbc: LbcConfig,

    /// Summarization model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Object-storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Term annotation settings.
    #[serde(default)]
    pub terms: TermsConfig,

    /// Publication ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Article metadata policy applied before publishing.
    #[serde(default)]
    pub publish: PublishConfig,
}

/// `[lbc]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbcConfig {
    /// API base URL. Falls back to the `base_url_env` variable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Name of the env var holding the API base URL.
    #[serde(default = "default_lbc_base_url_env")]
    pub base_url_env: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_lbc_api_key_env")]
    pub api_key_env: String,

    /// Public site root used to build article URLs.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Author account the articles are published under.
    #[serde(default = "default_author_id")]
    pub author_id: u64,

    /// Target category.
    #[serde(default = "default_category_id")]
    pub category_id: u64,

    /// Featured flag sent with every article.
    #[serde(default = "default_featured")]
    pub featured: u8,

    /// Publish level.
    #[serde(default = "default_level")]
    pub level: u8,

    /// Article type: 1 original, 2 translation, 3 repost.
    #[serde(default = "default_article_type")]
    pub article_type: u8,

    /// Fixed creation date (`YYYY-MM-DD`) sent as `createday`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub createday: Option<String>,

    /// Total publish attempts when the gateway answers 504.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between 504 retries.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Pause between files in a publish batch.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_lbc_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LbcConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_url_env: default_lbc_base_url_env(),
            api_key_env: default_lbc_api_key_env(),
            site_url: default_site_url(),
            author_id: default_author_id(),
            category_id: default_category_id(),
            featured: default_featured(),
            level: default_level(),
            article_type: default_article_type(),
            createday: None,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            batch_delay_ms: default_batch_delay_ms(),
            timeout_secs: default_lbc_timeout_secs(),
        }
    }
}

fn default_lbc_base_url_env() -> String {
    "LBC_BASE_API_URL".into()
}
fn default_lbc_api_key_env() -> String {
    "LBC_API_KEY".into()
}
fn default_site_url() -> String {
    "https://learnblockchain.cn".into()
}
fn default_author_id() -> u64 {
    13917
}
fn default_category_id() -> u64 {
    7
}
fn default_featured() -> u8 {
    1
}
fn default_level() -> u8 {
    3
}
fn default_article_type() -> u8 {
    1
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_delay_secs() -> u64 {
    5
}
fn default_batch_delay_ms() -> u64 {
    1000
}
fn default_lbc_timeout_secs() -> u64 {
    120
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model id. An `openrouter:` prefix routes the call through OpenRouter.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_openai_api_key_env")]
    pub openai_api_key_env: String,

    #[serde(default = "default_openai_base_url_env")]
    pub openai_base_url_env: String,

    #[serde(default = "default_openrouter_api_key_env")]
    pub openrouter_api_key_env: String,

    #[serde(default = "default_openrouter_base_url_env")]
    pub openrouter_base_url_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
            openai_api_key_env: default_openai_api_key_env(),
            openai_base_url_env: default_openai_base_url_env(),
            openrouter_api_key_env: default_openrouter_api_key_env(),
            openrouter_base_url_env: default_openrouter_base_url_env(),
        }
    }
}

fn default_model() -> String {
    "openrouter:google/gemini-2.0-flash-001".into()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_llm_timeout_secs() -> u64 {
    120
}
fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_openai_base_url_env() -> String {
    "OPENAI_BASE_URL".into()
}
fn default_openrouter_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_openrouter_base_url_env() -> String {
    "OPENROUTER_BASE_URL".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// REST endpoint of the object store.
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    /// Bucket (service) name.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Public CDN prefix objects are served from (with trailing slash).
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Name of the env var holding the operator name.
    #[serde(default = "default_operator_env")]
    pub operator_env: String,

    /// Name of the env var holding the operator password.
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Request timeout.
    #[serde(default = "default_storage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_storage_endpoint(),
            bucket: default_bucket(),
            public_base_url: default_public_base_url(),
            operator_env: default_operator_env(),
            password_env: default_password_env(),
            timeout_secs: default_storage_timeout_secs(),
        }
    }
}

fn default_storage_endpoint() -> String {
    "https://v0.api.upyun.com".into()
}
fn default_bucket() -> String {
    "image-learnblog".into()
}
fn default_public_base_url() -> String {
    "https://img.learnblockchain.cn/".into()
}
fn default_operator_env() -> String {
    "UPYUN_USERNAME".into()
}
fn default_password_env() -> String {
    "UPYUN_PASSWORD".into()
}
fn default_storage_timeout_secs() -> u64 {
    60
}

/// `[terms]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermsConfig {
    /// Markdown file listing `[term](url)` pairs.
    #[serde(default = "default_catalog")]
    pub catalog: String,

    /// Maximum links inserted per term in one document.
    #[serde(default = "default_max_links_per_term")]
    pub max_links_per_term: usize,

    /// Maximum links inserted in one document.
    #[serde(default = "default_max_links_per_file")]
    pub max_links_per_file: usize,

    /// Tag URL whose frequency marks a document as already annotated.
    #[serde(default = "default_tag_url")]
    pub tag_url: String,

    /// Occurrences of `tag_url` at which annotation is skipped.
    #[serde(default = "default_tag_guard_threshold")]
    pub tag_guard_threshold: usize,
}

impl Default for TermsConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            max_links_per_term: default_max_links_per_term(),
            max_links_per_file: default_max_links_per_file(),
            tag_url: default_tag_url(),
            tag_guard_threshold: default_tag_guard_threshold(),
        }
    }
}

fn default_catalog() -> String {
    "scripts/termlink.md".into()
}
fn default_max_links_per_term() -> usize {
    2
}
fn default_max_links_per_file() -> usize {
    6
}
fn default_tag_url() -> String {
    "https://learnblockchain.cn/tags".into()
}
fn default_tag_guard_threshold() -> usize {
    4
}

/// `[ledger]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Path of the JSON publication ledger.
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> String {
    "published_articles.json".into()
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Tag appended to every analysed article's tag list.
    #[serde(default = "default_required_tag")]
    pub required_tag: String,

    /// Tag used when summarization fails.
    #[serde(default = "default_fallback_tag")]
    pub fallback_tag: String,

    /// Words removed from model-generated titles.
    #[serde(default = "default_strip_title_words")]
    pub strip_title_words: Vec<String>,

    /// Summary length limit in characters.
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            required_tag: default_required_tag(),
            fallback_tag: default_fallback_tag(),
            strip_title_words: default_strip_title_words(),
            summary_max_chars: default_summary_max_chars(),
        }
    }
}

fn default_required_tag() -> String {
    "Solidity".into()
}
fn default_fallback_tag() -> String {
    "区块链".into()
}
fn default_strip_title_words() -> Vec<String> {
    vec!["详解".into()]
}
fn default_summary_max_chars() -> usize {
    200
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blockdocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BlockdocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blockdocs/blockdocs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BlockdocsError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BlockdocsError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BlockdocsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BlockdocsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BlockdocsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a required, non-empty environment variable.
pub fn env_value(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(BlockdocsError::config(format!(
            "environment variable {var_name} is not set"
        ))),
    }
}

/// Read an optional environment variable, treating empty as unset.
pub fn env_value_opt(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}
