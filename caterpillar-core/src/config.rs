use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
    #[error("invalid date_format `{0}`")]
    DateFormat(String),
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub feed: FeedConfig,
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail once pages are being rendered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let format = &self.site.date_format;
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::DateFormat(format.clone()));
        }
        Ok(())
    }
}

/// Everything the templates know about the site itself.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
    pub base_url: String,
    /// BCP 47 tag written into `<html lang>` and the feed
    pub language: String,
    pub image_path: Option<String>,
    pub header_title: String,
    pub primer_path: String,
    pub highlight_path: String,
    /// chrono format string used when showing publish dates
    pub date_format: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "caterpillarDev".into(),
            description: "Personal blog.".into(),
            base_url: "https://caterpillardev.github.io".into(),
            language: "en".into(),
            image_path: None,
            header_title: "Helping young and unexperienced developers achieve sustainable \
                competitive advantage and jump over the gap between school system and \
                actual tech world. It covers iOS development topics, design patterns and \
                programming principles. Besides pure development topics, main focus is on \
                secure development and practises as well as software architectures."
                .into(),
            primer_path: "/primer.css".into(),
            highlight_path: "/highlight.css".into(),
            date_format: "%-d %B %Y".into(),
        }
    }
}

impl SiteConfig {
    /// Join a site-relative path onto `base_url`.
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Asset paths the theme links to and expects to find among the
    /// copied resources.
    pub fn declared_assets(&self) -> Vec<&str> {
        let mut assets = vec![self.primer_path.as_str(), self.highlight_path.as_str()];
        if let Some(image) = &self.image_path {
            assets.push(image.as_str());
        }
        assets
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub path: String,
    pub max_items: usize,
    pub sitemap: bool,
}

impl FeedConfig {
    /// Site-relative URL of the feed, or `None` when it is not generated.
    pub fn url(&self) -> Option<String> {
        self.enabled
            .then(|| format!("/{}", self.path.trim_start_matches('/')))
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "feed.rss".into(),
            max_items: 100,
            sitemap: true,
        }
    }
}
