//! Media upload to the UpYun object store behind `img.learnblockchain.cn`.
//!
//! Objects are written with the REST API (`PUT {endpoint}/{bucket}/{name}`,
//! HTTP basic auth with the operator credentials) and served from the public
//! CDN base URL. Object names are dated, `YYYY/MM/DD/<name>`, see
//! [`destination_name`].

use std::path::Path;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use blockdocs_shared::{BlockdocsError, Result, StorageConfig, env_value};

/// User-Agent string for storage requests.
const USER_AGENT: &str = concat!("blockdocs/", env!("CARGO_PKG_VERSION"));

/// Extensions kept verbatim in the object name.
const MEDIA_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".mp4", ".svg"];

/// Characters the object store rejects in names.
const FORBIDDEN_CHARS: &[char] = &['*', '?', ':', '|', '\\', '/', ' ', '%'];

const MAX_NAME_CHARS: usize = 50;
const MIN_NAME_CHARS: usize = 5;

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// Object name for `source` (URL or path), dated `date`.
///
/// `nonce` supplies the random prefix digits so callers control randomness.
///
/// - Names ending in a media extension keep their last 50 characters, get a
///   3-digit prefix when shorter than 5, and lose characters the store rejects.
/// - Anything else becomes an 8-digit number plus a generic name whose
///   extension is the first media keyword found in the source name.
pub fn destination_name(source: &str, date: NaiveDate, nonce: u64) -> String {
    let segment = source.rsplit('/').next().unwrap_or(source);

    let name = if MEDIA_EXTENSIONS.iter().any(|ext| segment.ends_with(ext)) {
        let len = segment.chars().count();
        let name = if len > MAX_NAME_CHARS {
            segment.chars().skip(len - MAX_NAME_CHARS).collect()
        } else if len < MIN_NAME_CHARS {
            format!("{}_{segment}", 100 + nonce % 900)
        } else {
            segment.to_string()
        };
        name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
    } else {
        let number = 10_000_000 + nonce % 90_000_000;
        let suffix = [
            ("webp", "image.webp"),
            ("svg", "image.svg"),
            ("gif", "image.gif"),
            ("png", "image.png"),
            ("jpeg", "image.jpeg"),
            ("mp4", "video.mp4"),
        ]
        .iter()
        .find(|(keyword, _)| segment.contains(*keyword))
        .map_or("image.jpg", |(_, suffix)| *suffix);
        format!("{number}_{suffix}")
    };

    format!("{}{name}", date.format("%Y/%m/%d/"))
}

fn random_nonce() -> u64 {
    Uuid::new_v4().as_u128() as u64
}

// ---------------------------------------------------------------------------
// Uploader
// ---------------------------------------------------------------------------

/// Resolved settings for a [`MediaUploader`].
#[derive(Debug, Clone)]
pub struct MediaOptions {
    /// REST API root, e.g. `https://v0.api.upyun.com`.
    pub endpoint: String,
    pub bucket: String,
    /// Public CDN prefix ending in `/`.
    pub public_base_url: String,
    pub operator: String,
    pub password: String,
    pub timeout: Duration,
}

impl MediaOptions {
    /// Build options from config, reading the operator credentials from the environment.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
            operator: env_value(&config.operator_env)?,
            password: env_value(&config.password_env)?,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

pub struct MediaUploader {
    client: Client,
    opts: MediaOptions,
}

impl MediaUploader {
    pub fn new(opts: MediaOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| BlockdocsError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, opts })
    }

    /// Mirror a remote image or video into the bucket and return its public URL.
    #[instrument(skip(self))]
    pub async fn upload_url(&self, source: &str) -> Result<String> {
        if source.starts_with(&self.opts.public_base_url) {
            debug!("already on the CDN");
            return Ok(source.to_string());
        }

        let name = destination_name(source, Local::now().date_naive(), random_nonce());
        let public_url = self.public_url(&name);

        if self.exists(&public_url).await {
            info!(%public_url, "already uploaded");
            return Ok(public_url);
        }

        let response = self
            .client
            .get(source)
            .send()
            .await
            .map_err(|e| BlockdocsError::Network(format!("{source}: {e}")))?;
        if response.status() != StatusCode::OK {
            return Err(BlockdocsError::Upload(format!(
                "failed to fetch {source}: HTTP {}",
                response.status().as_u16()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BlockdocsError::Network(format!("failed to read {source}: {e}")))?;

        self.put(&name, bytes.to_vec()).await?;
        info!(%public_url, "uploaded");
        Ok(public_url)
    }

    /// Upload a local file and return its public URL.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| BlockdocsError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BlockdocsError::validation(format!("{} has no file name", path.display())))?;

        let name = destination_name(&file_name, Local::now().date_naive(), random_nonce());
        self.put(&name, bytes).await?;

        let public_url = self.public_url(&name);
        info!(%public_url, "uploaded");
        Ok(public_url)
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}{name}", self.opts.public_base_url)
    }

    /// Probe the CDN; any failure counts as absent.
    async fn exists(&self, public_url: &str) -> bool {
        match self.client.head(public_url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "existence probe failed");
                false
            }
        }
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let url = format!(
            "{}/{}/{name}",
            self.opts.endpoint.trim_end_matches('/'),
            self.opts.bucket
        );
        debug!(%url, size = bytes.len(), "PUT");

        let response = self
            .client
            .put(&url)
            .basic_auth(&self.opts.operator, Some(&self.opts.password))
            .body(bytes)
            .send()
            .await
            .map_err(|e| BlockdocsError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlockdocsError::Upload(format!(
                "PUT {name} failed: HTTP {} {body}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date")
    }

    fn uploader(server: &MockServer) -> MediaUploader {
        MediaUploader::new(MediaOptions {
            endpoint: server.uri(),
            bucket: "bucket".into(),
            public_base_url: format!("{}/cdn/", server.uri()),
            operator: "op".into(),
            password: "pw".into(),
            timeout: Duration::from_secs(5),
        })
        .expect("uploader")
    }

    #[test]
    fn media_names_are_kept() {
        assert_eq!(
            destination_name("https://example.com/a/diagram.png", date(), 0),
            "2025/03/07/diagram.png"
        );
    }

    #[test]
    fn forbidden_chars_are_stripped() {
        assert_eq!(
            destination_name("my pic%20v2:final.webp", date(), 0),
            "2025/03/07/mypic20v2final.webp"
        );
    }

    #[test]
    fn long_names_keep_last_fifty_chars() {
        let long = format!("{}.jpg", "x".repeat(60));
        let name = destination_name(&long, date(), 0);
        let file = name.strip_prefix("2025/03/07/").expect("dated");
        assert_eq!(file.chars().count(), 50);
        assert!(file.ends_with(".jpg"));
    }

    #[test]
    fn short_names_get_three_digit_prefix() {
        assert_eq!(destination_name("a.gif", date(), 5), "2025/03/07/a.gif");
        assert_eq!(destination_name(".svg", date(), 5), "2025/03/07/105_.svg");
        assert_eq!(destination_name(".svg", date(), 899), "2025/03/07/999_.svg");
    }

    #[test]
    fn non_media_names_become_generic() {
        let src = "https://www.helius.dev/_next/image?url=%2Fapi%2Fmedia%2Ffile%2Fswap.webp&w=3840&q=90";
        assert_eq!(destination_name(src, date(), 1), "2025/03/07/10000001_image.webp");
        assert_eq!(destination_name("photo?fmt=png", date(), 0), "2025/03/07/10000000_image.png");
        assert_eq!(destination_name("clip.mp4?x=1", date(), 0), "2025/03/07/10000000_video.mp4");
        assert_eq!(destination_name("blob", date(), 0), "2025/03/07/10000000_image.jpg");
    }

    #[tokio::test]
    async fn cdn_urls_pass_through() {
        let server = MockServer::start().await;
        let up = uploader(&server);
        let src = format!("{}/cdn/2024/01/01/x.png", server.uri());
        assert_eq!(up.upload_url(&src).await.expect("upload"), src);
    }

    #[tokio::test]
    async fn existing_object_is_not_reuploaded() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path_regex(r"^/cdn/\d{4}/\d{2}/\d{2}/logo\.png$"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = uploader(&server)
            .upload_url("https://example.com/logo.png")
            .await
            .expect("upload");
        assert!(url.ends_with("/logo.png"));
        assert!(url.starts_with(&format!("{}/cdn/", server.uri())));
    }

    #[tokio::test]
    async fn missing_object_is_fetched_and_put() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/src/chart.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/bucket/\d{4}/\d{2}/\d{2}/chart\.png$"))
            .and(basic_auth("op", "pw"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let src = format!("{}/src/chart.png", server.uri());
        let url = uploader(&server).upload_url(&src).await.expect("upload");
        assert!(url.ends_with("/chart.png"));
    }

    #[tokio::test]
    async fn unreachable_source_is_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let src = format!("{}/src/denied.png", server.uri());
        let err = uploader(&server).upload_url(&src).await.unwrap_err();
        assert!(matches!(err, BlockdocsError::Upload(_)));
    }

    #[tokio::test]
    async fn local_file_is_named_after_itself() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/bucket/\d{4}/\d{2}/\d{2}/bd_media_.*\.png$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let file = std::env::temp_dir().join(format!("bd_media_{}.png", Uuid::now_v7()));
        std::fs::write(&file, b"png").expect("write");

        let url = uploader(&server).upload_file(&file).await.expect("upload");
        assert!(url.contains("/cdn/"));
        let _ = std::fs::remove_file(&file);
    }
}
