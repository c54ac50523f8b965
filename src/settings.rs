use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;

use crate::error::{Result, ScrapeError};

pub const ENV_PREFIX: &str = "TOOLPEDIA";

/// Longest politeness delay accepted, in seconds.
const MAX_DELAY_SECS: f64 = 3600.0;
const MAX_RETRIES: u32 = 10;

/// Runtime knobs. Defaults match the site's tolerance; every field can be
/// overridden with `TOOLPEDIA_<FIELD>` (e.g. `TOOLPEDIA_FETCH_DELAY_SECS=2`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub root: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub fetch_delay_secs: f64,
    pub scroll_delay_min_secs: f64,
    pub scroll_delay_max_secs: f64,
    pub max_scroll_attempts: usize,
    pub max_stalled_scrolls: usize,
    pub concurrency: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://www.futurepedia.io".to_string(),
            root: PathBuf::from("."),
            user_agent: concat!("toolpedia/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            fetch_delay_secs: 5.0,
            scroll_delay_min_secs: 1.0,
            scroll_delay_max_secs: 2.0,
            max_scroll_attempts: 60,
            max_stalled_scrolls: 5,
            concurrency: 1,
            max_retries: 3,
            base_backoff_ms: 2000,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_from(env: Environment) -> Result<Self> {
        let d = Settings::default();
        let settings: Settings = Config::builder()
            .set_default("base_url", d.base_url)?
            .set_default("root", d.root.to_string_lossy().into_owned())?
            .set_default("user_agent", d.user_agent)?
            .set_default("request_timeout_secs", d.request_timeout_secs)?
            .set_default("fetch_delay_secs", d.fetch_delay_secs)?
            .set_default("scroll_delay_min_secs", d.scroll_delay_min_secs)?
            .set_default("scroll_delay_max_secs", d.scroll_delay_max_secs)?
            .set_default("max_scroll_attempts", d.max_scroll_attempts as u64)?
            .set_default("max_stalled_scrolls", d.max_stalled_scrolls as u64)?
            .set_default("concurrency", d.concurrency as u64)?
            .set_default("max_retries", d.max_retries)?
            .set_default("base_backoff_ms", d.base_backoff_ms)?
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ScrapeError::Config("concurrency must be at least 1".into()));
        }
        for (name, secs) in [
            ("fetch_delay_secs", self.fetch_delay_secs),
            ("scroll_delay_min_secs", self.scroll_delay_min_secs),
            ("scroll_delay_max_secs", self.scroll_delay_max_secs),
        ] {
            if !(0.0..=MAX_DELAY_SECS).contains(&secs) {
                return Err(ScrapeError::Config(format!(
                    "{} must be between 0 and {} seconds, got {}",
                    name, MAX_DELAY_SECS, secs
                )));
            }
        }
        if self.scroll_delay_min_secs > self.scroll_delay_max_secs {
            return Err(ScrapeError::Config(format!(
                "scroll delay range is empty ({} > {})",
                self.scroll_delay_min_secs, self.scroll_delay_max_secs
            )));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(ScrapeError::Config(format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES, self.max_retries
            )));
        }
        if self.max_scroll_attempts == 0 {
            return Err(ScrapeError::Config("max_scroll_attempts must be at least 1".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| ScrapeError::Config(format!("base_url {:?}: {}", self.base_url, e)))?;
        Ok(())
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_secs_f64(self.fetch_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Site host without a leading `www.`, used to keep links on-site.
    pub fn site_host(&self) -> String {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .unwrap_or_default()
    }

    /// Settings with every politeness delay removed, for tests.
    #[cfg(test)]
    pub fn without_delays() -> Self {
        Settings {
            fetch_delay_secs: 0.0,
            scroll_delay_min_secs: 0.0,
            scroll_delay_max_secs: 0.0,
            base_backoff_ms: 0,
            ..Settings::default()
        }
    }
}
