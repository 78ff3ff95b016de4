use std::path::PathBuf;

use crate::config::{FeedConfig, SiteConfig};
use crate::dom::Node;
use crate::markdown::render_html;
use crate::site::{Section, SectionEntry, Site};
use crate::template::{HomeContext, ItemContext, SectionContext, TemplateError, TemplateSet};

#[derive(Debug, thiserror::Error)]
#[error("failed to render {target}: {source}")]
pub struct RenderError {
    /// Item id, section id or `home`
    pub target: String,
    #[source]
    pub source: TemplateError,
}

/// Title/description/url of a page, kept next to the tree for feeds and
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Relative to the output root, e.g. `posts/hello/index.html`
    pub output_path: PathBuf,
    pub document: Node,
    pub metadata: PageMetadata,
}

impl RenderedPage {
    pub fn to_html(&self) -> String {
        self.document.to_html()
    }
}

/// Turns indexed content into rendered pages. Holds no state of its own,
/// so one renderer can be shared across threads.
pub struct PageRenderer<'a> {
    site: &'a SiteConfig,
    templates: &'a dyn TemplateSet,
    feed_url: Option<String>,
}

impl<'a> PageRenderer<'a> {
    pub fn new(site: &'a SiteConfig, templates: &'a dyn TemplateSet) -> Self {
        Self {
            site,
            templates,
            feed_url: None,
        }
    }

    /// Link pages to the feed, if one is being generated.
    pub fn with_feed(mut self, feed: &FeedConfig) -> Self {
        self.feed_url = feed.url();
        self
    }

    pub fn render_item(&self, entry: &SectionEntry<'_>) -> Result<RenderedPage, RenderError> {
        let item = entry.item;
        let content = render_html(&item.raw_body);
        let document = self
            .templates
            .render_item(&ItemContext {
                site: self.site,
                entry,
                content: &content,
                feed_url: self.feed_url.as_deref(),
            })
            .map_err(|source| RenderError {
                target: item.id.clone(),
                source,
            })?;

        Ok(RenderedPage {
            output_path: item.out_path(),
            document,
            metadata: PageMetadata {
                title: item.title.clone(),
                description: item.description.clone(),
                url: item.url(),
            },
        })
    }

    pub fn render_section(&self, section: &Section<'_>) -> Result<RenderedPage, RenderError> {
        let document = self
            .templates
            .render_section(&SectionContext {
                site: self.site,
                section,
                feed_url: self.feed_url.as_deref(),
            })
            .map_err(|source| RenderError {
                target: section.id.to_string(),
                source,
            })?;

        Ok(RenderedPage {
            output_path: section.id.out_path(),
            document,
            metadata: PageMetadata {
                title: section.id.title().to_string(),
                description: self.site.description.clone(),
                url: section.id.url(),
            },
        })
    }

    pub fn render_home(&self, site: &Site<'_>) -> Result<RenderedPage, RenderError> {
        let latest = site.latest_items();
        let document = self
            .templates
            .render_home(&HomeContext {
                site,
                latest: &latest,
                feed_url: self.feed_url.as_deref(),
            })
            .map_err(|source| RenderError {
                target: "home".to_string(),
                source,
            })?;

        Ok(RenderedPage {
            output_path: PathBuf::from("index.html"),
            document,
            metadata: PageMetadata {
                title: self.site.name.clone(),
                description: self.site.description.clone(),
                url: "/".to_string(),
            },
        })
    }
}
