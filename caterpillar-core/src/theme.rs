use crate::config::SiteConfig;
use crate::dom::{Element, Node};
use crate::site::{Item, SectionId};
use crate::template::{HomeContext, ItemContext, SectionContext, TemplateError, TemplateSet};

/// The built-in theme: a header with the site name and tagline, section
/// navigation, and plain article/list pages styled by the primer and
/// highlight stylesheets.
#[derive(Debug, Default, Clone, Copy)]
pub struct Foundation;

impl Foundation {
    fn page(
        site: &SiteConfig,
        feed_url: Option<&str>,
        title: &str,
        description: &str,
        main: Element,
    ) -> Node {
        let mut head = Node::element("head")
            .child(Node::element("meta").attr("charset", "UTF-8"))
            .child(
                Node::element("meta")
                    .attr("name", "viewport")
                    .attr("content", "width=device-width, initial-scale=1.0"),
            )
            .child(Node::element("title").text(title))
            .child(
                Node::element("meta")
                    .attr("name", "description")
                    .attr("content", description),
            )
            .child(stylesheet(&site.primer_path))
            .child(stylesheet(&site.highlight_path));

        if let Some(feed_url) = feed_url {
            head = head.child(
                Node::element("link")
                    .attr("rel", "alternate")
                    .attr("type", "application/rss+xml")
                    .attr("title", format!("Subscribe to {}", site.name))
                    .attr("href", feed_url),
            );
        }

        if let Some(image) = &site.image_path {
            head = head.child(
                Node::element("meta")
                    .attr("property", "og:image")
                    .attr("content", site.absolute_url(image)),
            );
        }

        let body = Node::element("body")
            .child(header(site))
            .child(Node::element("div").class("wrapper").child(main))
            .child(footer(site, feed_url));

        Node::document(
            Node::element("html")
                .attr("lang", &site.language)
                .child(head)
                .child(body),
        )
    }
}

impl TemplateSet for Foundation {
    fn render_item(&self, ctx: &ItemContext<'_>) -> Result<Node, TemplateError> {
        let item = ctx.entry.item;

        let mut meta = Node::element("p").class("item-meta").child(date(item, ctx.site));
        if !item.reading_time.is_empty() {
            meta = meta
                .text(" · ")
                .child(Node::element("span").class("reading-time").text(&item.reading_time));
        }

        let mut neighbours = Node::element("nav").class("item-navigation");
        if let Some(previous) = ctx.entry.previous {
            neighbours = neighbours.child(
                Node::element("a")
                    .class("previous")
                    .attr("href", previous.url())
                    .text(format!("← {}", previous.title)),
            );
        }
        if let Some(next) = ctx.entry.next {
            neighbours = neighbours.child(
                Node::element("a")
                    .class("next")
                    .attr("href", next.url())
                    .text(format!("{} →", next.title)),
            );
        }

        let main = Node::element("article")
            .class("markdown-body")
            .child(meta)
            .child(Node::element("div").class("content").child(Node::raw(ctx.content)))
            .child(neighbours);

        Ok(Self::page(ctx.site, ctx.feed_url, &item.title, &item.description, main))
    }

    fn render_section(&self, ctx: &SectionContext<'_>) -> Result<Node, TemplateError> {
        let title = ctx.section.id.title();
        let main = Node::element("main")
            .child(Node::element("h1").text(title))
            .child(item_list(ctx.section.items(), ctx.site));

        Ok(Self::page(
            ctx.site,
            ctx.feed_url,
            &format!("{} | {}", title, ctx.site.name),
            &ctx.site.description,
            main,
        ))
    }

    fn render_home(&self, ctx: &HomeContext<'_>) -> Result<Node, TemplateError> {
        let site = ctx.site.config;
        let main = Node::element("main")
            .child(Node::element("p").class("description").text(&site.header_title))
            .child(Node::element("h2").text("Latest content"))
            .child(item_list(ctx.latest.iter().copied(), site));

        Ok(Self::page(site, ctx.feed_url, &site.name, &site.description, main))
    }
}

fn stylesheet(href: &str) -> Element {
    Node::element("link")
        .attr("rel", "stylesheet")
        .attr("href", href)
}

fn header(site: &SiteConfig) -> Element {
    let links = SectionId::ALL.iter().map(|section| {
        Node::element("li").child(
            Node::element("a")
                .attr("href", section.url())
                .text(section.title()),
        )
    });

    Node::element("header").child(
        Node::element("div")
            .class("wrapper")
            .child(
                Node::element("a")
                    .class("site-name")
                    .attr("href", "/")
                    .text(&site.name),
            )
            .child(Node::element("nav").child(Node::element("ul").children(links))),
    )
}

fn footer(site: &SiteConfig, feed_url: Option<&str>) -> Element {
    let footer = Node::element("footer").child(Node::element("p").text(&site.description));
    match feed_url {
        Some(url) => footer.child(
            Node::element("p").child(Node::element("a").attr("href", url).text("RSS feed")),
        ),
        None => footer,
    }
}

fn date(item: &Item, site: &SiteConfig) -> Element {
    Node::element("time")
        .attr("datetime", item.publish_date.format("%Y-%m-%d").to_string())
        .text(item.publish_date.format(&site.date_format).to_string())
}

fn item_list<'a>(items: impl Iterator<Item = &'a Item>, site: &SiteConfig) -> Element {
    let entries = items.map(|item| {
        let mut article = Node::element("article")
            .child(
                Node::element("h1").child(
                    Node::element("a")
                        .attr("href", item.url())
                        .text(&item.title),
                ),
            )
            .child(Node::element("p").class("item-meta").child(date(item, site)));
        if !item.description.is_empty() {
            article = article.child(Node::element("p").text(&item.description));
        }
        Node::element("li").child(article)
    });

    Node::element("ul").class("item-list").children(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::index;
    use crate::site::Site;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn item(id: &str, day: u32, reading_time: &str) -> Item {
        Item {
            id: id.into(),
            title: format!("Post {id}"),
            description: format!("About {id}"),
            raw_body: String::new(),
            publish_date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            section_id: SectionId::Posts,
            reading_time: reading_time.into(),
            source: PathBuf::from(format!("{id}.md")),
        }
    }

    #[test]
    fn item_page_links_neighbours_and_shows_metadata() {
        let site = SiteConfig::default();
        let items = vec![item("a", 1, ""), item("b", 2, "3 min"), item("c", 3, "")];
        let sections = index(&items).unwrap();
        let entry = sections[&SectionId::Posts].get("b").unwrap();

        let doc = Foundation
            .render_item(&ItemContext {
                site: &site,
                entry,
                content: "<p>Hello</p>",
                feed_url: Some("/feed.rss"),
            })
            .unwrap();
        let html = doc.to_html();

        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>Post b</title>"));
        assert!(html.contains("<time datetime=\"2020-01-02\">2 January 2020</time>"));
        assert!(html.contains("<span class=\"reading-time\">3 min</span>"));
        assert!(html.contains("<a class=\"previous\" href=\"/posts/c/\">← Post c</a>"));
        assert!(html.contains("<a class=\"next\" href=\"/posts/a/\">Post a →</a>"));
        assert!(html.contains("<p>Hello</p>"));
        assert!(html.contains("href=\"/primer.css\""));
        assert!(html.contains("href=\"/highlight.css\""));
        assert!(html.contains("<link rel=\"alternate\" type=\"application/rss+xml\""));
    }

    #[test]
    fn section_page_lists_items_in_index_order() {
        let site = SiteConfig::default();
        let items = vec![item("a", 1, ""), item("b", 2, "")];
        let sections = index(&items).unwrap();

        let doc = Foundation
            .render_section(&SectionContext {
                site: &site,
                section: &sections[&SectionId::Posts],
                feed_url: None,
            })
            .unwrap();
        let main = doc.find("main").unwrap();
        let text = Node::from(main.clone()).text_content();

        assert!(text.find("Post b").unwrap() < text.find("Post a").unwrap());
        assert!(doc.to_html().contains("<title>Posts | caterpillarDev</title>"));
        // No feed, no feed links
        assert!(!doc.to_html().contains("RSS feed"));
    }

    #[test]
    fn home_page_shows_header_title_and_latest_items() {
        let config = SiteConfig {
            image_path: Some("/images/me.png".into()),
            ..SiteConfig::default()
        };
        let items = vec![item("a", 1, "")];
        let site = Site::new(&config, index(&items).unwrap());
        let latest = site.latest_items();

        let html = Foundation
            .render_home(&HomeContext {
                site: &site,
                latest: &latest,
                feed_url: Some("/rss.xml"),
            })
            .unwrap()
            .to_html();

        assert!(html.contains("<a href=\"/rss.xml\">RSS feed</a>"));
        assert!(html.contains("Helping young and unexperienced developers"));
        assert!(html.contains("<a href=\"/posts/a/\">Post a</a>"));
        assert!(html.contains(
            "<meta property=\"og:image\" content=\"https://caterpillardev.github.io/images/me.png\">"
        ));
    }

    #[test]
    fn rendering_is_deterministic() {
        let site = SiteConfig::default();
        let items = vec![item("a", 1, ""), item("b", 2, "")];
        let sections = index(&items).unwrap();
        let ctx = SectionContext {
            site: &site,
            section: &sections[&SectionId::Posts],
            feed_url: None,
        };
        assert_eq!(
            Foundation.render_section(&ctx).unwrap(),
            Foundation.render_section(&ctx).unwrap()
        );
    }
}
