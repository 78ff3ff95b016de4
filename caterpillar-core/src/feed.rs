//! RSS feed and sitemap generation.
//!
//! Both documents are derived purely from the indexed site, with no build
//! timestamps, so rebuilding unchanged content yields identical files.

use std::path::PathBuf;

use rss::{ChannelBuilder, GuidBuilder, ItemBuilder};

use crate::config::{FeedConfig, SiteConfig};
use crate::site::{Item, SectionId, Site};

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// A generated file waiting to be written, relative to the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub output_path: PathBuf,
    pub contents: String,
}

/// Everything the feed configuration asks for.
pub fn generate(site: &Site<'_>, feed: &FeedConfig) -> Vec<GeneratedFile> {
    let mut files = Vec::new();
    if feed.enabled {
        files.push(GeneratedFile {
            output_path: PathBuf::from(feed.path.trim_start_matches('/')),
            contents: rss_feed(site, feed.max_items),
        });
    }
    if feed.sitemap {
        files.push(GeneratedFile {
            output_path: PathBuf::from("sitemap.xml"),
            contents: sitemap(site),
        });
    }
    files
}

pub fn rss_feed(site: &Site<'_>, max_items: usize) -> String {
    let config = site.config;
    let items: Vec<rss::Item> = site
        .latest_items()
        .into_iter()
        .take(max_items)
        .map(|item| rss_item(item, config))
        .collect();

    ChannelBuilder::default()
        .title(config.name.clone())
        .link(config.absolute_url("/"))
        .description(config.description.clone())
        .language(Some(config.language.clone()))
        .generator(Some(format!("caterpillar {}", env!("CARGO_PKG_VERSION"))))
        .items(items)
        .build()
        .to_string()
}

fn rss_item(item: &Item, config: &SiteConfig) -> rss::Item {
    let link = config.absolute_url(&item.url());
    let pub_date = item
        .publish_date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().to_rfc2822());

    ItemBuilder::default()
        .title(Some(item.title.clone()))
        .link(Some(link.clone()))
        .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
        .description((!item.description.is_empty()).then(|| item.description.clone()))
        .pub_date(pub_date)
        .build()
}

struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
}

pub fn sitemap(site: &Site<'_>) -> String {
    let config = site.config;
    let mut urls = vec![UrlEntry {
        loc: config.absolute_url("/"),
        lastmod: None,
    }];

    for id in SectionId::ALL {
        urls.push(UrlEntry {
            loc: config.absolute_url(&id.url()),
            lastmod: None,
        });
        if let Some(section) = site.section(id) {
            urls.extend(section.items().map(|item| UrlEntry {
                loc: config.absolute_url(&item.url()),
                lastmod: Some(item.publish_date.format("%Y-%m-%d").to_string()),
            }));
        }
    }

    let mut xml = String::with_capacity(256 + urls.len() * 96);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');

    for entry in urls {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
        }
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
