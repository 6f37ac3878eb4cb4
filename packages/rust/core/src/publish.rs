//! Publish workflow: summarize, post, and record each markdown file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, instrument, warn};

use blockdocs_lbc::{ArticlePayload, LbcClient};
use blockdocs_ledger::Ledger;
use blockdocs_markdown::{title_from_document, trim_summary};
use blockdocs_shared::{ArticleAnalysis, BlockdocsError, LbcConfig, PublishConfig, Result};
use blockdocs_summarizer::Summarizer;

use crate::progress::{BatchReport, FileOutcome, ProgressReporter};

/// Per-run publish settings.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Republish files already in the ledger.
    pub force: bool,
    /// Pause after each file that reached the API.
    pub batch_delay: Duration,
    pub publish: PublishConfig,
    pub lbc: LbcConfig,
}

/// Title, summary and tag list sent with an article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub summary: String,
    pub tags: String,
}

/// Build the draft from the model's analysis, or from the document alone
/// when the analysis is unavailable.
pub fn prepare_draft(content: &str, analysis: Option<ArticleAnalysis>, config: &PublishConfig) -> ArticleDraft {
    let doc_title = title_from_document(content);

    let Some(analysis) = analysis else {
        return ArticleDraft {
            summary: doc_title.clone(),
            title: doc_title,
            tags: config.fallback_tag.clone(),
        };
    };

    let raw_title = analysis
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| doc_title.clone());
    let title = config
        .strip_title_words
        .iter()
        .fold(raw_title, |acc, word| acc.replace(word.as_str(), ""))
        .trim()
        .to_string();

    let summary = analysis
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| title.clone());
    let summary = trim_summary(&summary, config.summary_max_chars);

    let mut tags = if analysis.keywords.is_empty() {
        config.required_tag.clone()
    } else {
        analysis.keywords.join(",")
    };
    if !tags.contains(config.required_tag.as_str()) {
        tags.push(',');
        tags.push_str(&config.required_tag);
    }

    ArticleDraft { title, summary, tags }
}

/// Publish every file in order; per-file failures are counted, not returned.
#[instrument(skip_all, fields(files = files.len(), force = settings.force))]
pub async fn publish_batch(
    files: &[PathBuf],
    summarizer: &Summarizer,
    lbc: &LbcClient,
    ledger: &mut Ledger,
    settings: &PublishSettings,
    progress: &dyn ProgressReporter,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = files.len();
    progress.phase("Publishing articles");

    for (i, path) in files.iter().enumerate() {
        let key = path.to_string_lossy().into_owned();
        progress.item_started(&key, i + 1, total);

        let (outcome, contacted_api) = if !settings.force && ledger.is_published(&key) {
            let reason = match ledger.get(&key) {
                Some(entry) => format!(
                    "already published as article {} at {}",
                    entry.article_id, entry.published_at
                ),
                None => "already published".to_string(),
            };
            (FileOutcome::Skipped { reason }, false)
        } else {
            match publish_file(path, &key, summarizer, lbc, ledger, settings).await {
                Ok(outcome) => (outcome, true),
                Err(e) => {
                    warn!(file = %key, error = %e, "publish failed");
                    (FileOutcome::Failed { error: e.to_string() }, !matches!(e, BlockdocsError::Io { .. }))
                }
            }
        };

        progress.item_finished(&key, &outcome);
        report.push(key, outcome);

        if contacted_api && i + 1 < total && !settings.batch_delay.is_zero() {
            tokio::time::sleep(settings.batch_delay).await;
        }
    }

    progress.done(&report.summary);
    report
}

async fn publish_file(
    path: &Path,
    key: &str,
    summarizer: &Summarizer,
    lbc: &LbcClient,
    ledger: &mut Ledger,
    settings: &PublishSettings,
) -> Result<FileOutcome> {
    let content = std::fs::read_to_string(path).map_err(|e| BlockdocsError::io(path, e))?;

    let analysis = match summarizer.analyze(&content).await {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            warn!(file = key, error = %e, "analysis failed, using document defaults");
            None
        }
    };
    let draft = prepare_draft(&content, analysis, &settings.publish);
    info!(file = key, title = %draft.title, tags = %draft.tags, "draft ready");

    let payload = ArticlePayload::new(&settings.lbc, draft.title, content, draft.summary, draft.tags);
    let article_id = lbc.publish(&payload).await?;

    if let Err(e) = ledger.record(key, article_id) {
        warn!(file = key, %article_id, error = %e, "published but failed to record in ledger");
    }
    Ok(FileOutcome::Published(article_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use blockdocs_lbc::LbcOptions;
    use blockdocs_shared::ArticleId;
    use blockdocs_summarizer::SummarizerOptions;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> PublishConfig {
        PublishConfig::default()
    }

    fn analysis(title: &str, summary: &str, keywords: &[&str]) -> ArticleAnalysis {
        ArticleAnalysis {
            title: Some(title.into()),
            summary: Some(summary.into()),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn draft_from_analysis_strips_title_words_and_adds_required_tag() {
        let draft = prepare_draft(
            "# Storage\n\nbody",
            Some(analysis("存储布局详解", "讲解存储槽", &["存储", "Gas"])),
            &config(),
        );
        assert_eq!(draft.title, "存储布局");
        assert_eq!(draft.summary, "讲解存储槽");
        assert_eq!(draft.tags, "存储,Gas,Solidity");
    }

    #[test]
    fn draft_keeps_tags_already_mentioning_required_tag() {
        let draft = prepare_draft("# T", Some(analysis("t", "s", &["Solidity", "EVM"])), &config());
        assert_eq!(draft.tags, "Solidity,EVM");
    }

    #[test]
    fn draft_with_empty_keywords_uses_required_tag() {
        let draft = prepare_draft("# T", Some(analysis("t", "s", &[])), &config());
        assert_eq!(draft.tags, "Solidity");
    }

    #[test]
    fn draft_missing_fields_fall_back_to_document() {
        let draft = prepare_draft("# 映射类型\n\nbody", Some(ArticleAnalysis::default()), &config());
        assert_eq!(draft.title, "映射类型");
        assert_eq!(draft.summary, "映射类型");
    }

    #[test]
    fn draft_summary_is_trimmed() {
        let long = "长".repeat(300);
        let draft = prepare_draft("# T", Some(analysis("t", &long, &["a"])), &config());
        assert_eq!(draft.summary.chars().count(), 200);
        assert!(draft.summary.ends_with("..."));
    }

    #[test]
    fn fallback_draft_without_analysis() {
        let draft = prepare_draft("\n# 存储布局详解\n\nbody", None, &config());
        assert_eq!(draft.title, "存储布局详解");
        assert_eq!(draft.summary, "存储布局详解");
        assert_eq!(draft.tags, "区块链");
    }

    // -----------------------------------------------------------------------
    // Batch against mock services
    // -----------------------------------------------------------------------

    struct Fixture {
        root: PathBuf,
        files: Vec<PathBuf>,
        ledger: Ledger,
    }

    fn fixture() -> Fixture {
        let root = std::env::temp_dir().join(format!("bd_publish_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&root).expect("mkdir");
        let files: Vec<PathBuf> = ["1_intro.md", "2_types.md"]
            .iter()
            .map(|name| {
                let p = root.join(name);
                std::fs::write(&p, format!("# {name}\n\nbody")).expect("write");
                p
            })
            .collect();
        let ledger = Ledger::open(root.join("published_articles.json"));
        Fixture { root, files, ledger }
    }

    fn settings(force: bool) -> PublishSettings {
        PublishSettings {
            force,
            batch_delay: Duration::ZERO,
            publish: PublishConfig::default(),
            lbc: LbcConfig::default(),
        }
    }

    fn clients(server: &MockServer) -> (Summarizer, LbcClient) {
        let summarizer = Summarizer::new(SummarizerOptions {
            base_url: server.uri(),
            api_key: "k".into(),
            model: "m".into(),
            temperature: 1.0,
            timeout: Duration::from_secs(5),
        })
        .expect("summarizer");
        let lbc = LbcClient::new(LbcOptions {
            base_url: server.uri(),
            api_key: "k".into(),
            max_retries: 2,
            retry_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
        })
        .expect("lbc");
        (summarizer, lbc)
    }

    async fn mount_llm(server: &MockServer, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": content } }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn batch_publishes_and_records_then_skips_on_rerun() {
        let server = MockServer::start().await;
        mount_llm(&server, r#"{"title":"标题","summary":"摘要","keywords":["EVM"]}"#).await;
        Mock::given(method("POST"))
            .and(path("/api/post/article"))
            .and(body_string_contains("tags=EVM%2CSolidity"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0, "article_id": 7})))
            .expect(2)
            .mount(&server)
            .await;

        let mut fx = fixture();
        let (summarizer, lbc) = clients(&server);

        let report = publish_batch(&fx.files, &summarizer, &lbc, &mut fx.ledger, &settings(false), &SilentProgress).await;
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(fx.ledger.len(), 2);
        let key = fx.files[0].to_string_lossy().into_owned();
        assert_eq!(fx.ledger.get(&key).map(|e| e.article_id), Some(ArticleId(7)));

        let rerun = publish_batch(&fx.files, &summarizer, &lbc, &mut fx.ledger, &settings(false), &SilentProgress).await;
        assert_eq!(rerun.summary.skipped, 2);
        assert_eq!(rerun.summary.succeeded, 0);

        let _ = std::fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn analysis_failure_falls_back_and_still_publishes() {
        let server = MockServer::start().await;
        mount_llm(&server, "not json at all").await;
        Mock::given(method("POST"))
            .and(path("/api/post/article"))
            .and(body_string_contains("tags=%E5%8C%BA%E5%9D%97%E9%93%BE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0, "article_id": 9})))
            .expect(1)
            .mount(&server)
            .await;

        let mut fx = fixture();
        let (summarizer, lbc) = clients(&server);

        let report = publish_batch(&fx.files[..1], &summarizer, &lbc, &mut fx.ledger, &settings(false), &SilentProgress).await;
        assert_eq!(report.outcomes[0].1, FileOutcome::Published(ArticleId(9)));

        let _ = std::fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn rejected_publish_is_counted_as_failure() {
        let server = MockServer::start().await;
        mount_llm(&server, r#"{"title":"t"}"#).await;
        Mock::given(method("POST"))
            .and(path("/api/post/article"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 1, "message": "no"})))
            .mount(&server)
            .await;

        let mut fx = fixture();
        let (summarizer, lbc) = clients(&server);

        let report = publish_batch(&fx.files, &summarizer, &lbc, &mut fx.ledger, &settings(false), &SilentProgress).await;
        assert_eq!(report.summary.failed, 2);
        assert!(fx.ledger.is_empty());

        let _ = std::fs::remove_dir_all(&fx.root);
    }

    #[tokio::test]
    async fn force_republishes_and_overwrites_entry() {
        let server = MockServer::start().await;
        mount_llm(&server, r#"{"title":"t"}"#).await;
        Mock::given(method("POST"))
            .and(path("/api/post/article"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0, "article_id": 100})))
            .mount(&server)
            .await;

        let mut fx = fixture();
        let key = fx.files[0].to_string_lossy().into_owned();
        fx.ledger.record(&key, ArticleId(1)).expect("seed");
        let (summarizer, lbc) = clients(&server);

        let report = publish_batch(&fx.files[..1], &summarizer, &lbc, &mut fx.ledger, &settings(true), &SilentProgress).await;
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(fx.ledger.get(&key).map(|e| e.article_id), Some(ArticleId(100)));

        let _ = std::fs::remove_dir_all(&fx.root);
    }
}
