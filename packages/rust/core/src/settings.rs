//! Runtime settings: file config plus command-line overrides.
//!
//! Collaborator options are resolved on demand so that commands which never
//! touch a remote service do not require its credentials.

use std::path::PathBuf;
use std::time::Duration;

use blockdocs_lbc::LbcOptions;
use blockdocs_markdown::AnnotateOptions;
use blockdocs_media::MediaOptions;
use blockdocs_shared::{AppConfig, Result};
use blockdocs_summarizer::SummarizerOptions;

use crate::publish::PublishSettings;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ledger: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub config: AppConfig,
    pub ledger_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl Settings {
    pub fn resolve(config: AppConfig, overrides: Overrides) -> Self {
        let ledger_path = overrides
            .ledger
            .unwrap_or_else(|| PathBuf::from(&config.ledger.path));
        let catalog_path = overrides
            .catalog
            .unwrap_or_else(|| PathBuf::from(&config.terms.catalog));
        Self {
            config,
            ledger_path,
            catalog_path,
        }
    }

    pub fn summarizer_options(&self) -> Result<SummarizerOptions> {
        SummarizerOptions::from_config(&self.config.llm)
    }

    pub fn lbc_options(&self) -> Result<LbcOptions> {
        LbcOptions::from_config(&self.config.lbc)
    }

    pub fn media_options(&self) -> Result<MediaOptions> {
        MediaOptions::from_config(&self.config.storage)
    }

    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions::from(&self.config.terms)
    }

    pub fn publish_settings(&self, force: bool) -> PublishSettings {
        PublishSettings {
            force,
            batch_delay: Duration::from_millis(self.config.lbc.batch_delay_ms),
            publish: self.config.publish.clone(),
            lbc: self.config.lbc.clone(),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.config.lbc.site_url
    }
}
