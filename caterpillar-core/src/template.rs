use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::dom::Node;
use crate::site::{Item, Section, SectionEntry, SectionId, Site};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    TeraError(#[from] tera::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("theme is missing the `{0}` template")]
    MissingTemplate(&'static str),
    #[error("{0}")]
    Other(String),
}

/// The kinds of page a template set has to know how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Item,
    SectionIndex,
    Home,
}

impl PageKind {
    pub const ALL: [PageKind; 3] = [PageKind::Item, PageKind::SectionIndex, PageKind::Home];

    /// File name a theme directory provides for this kind
    pub fn template_name(&self) -> &'static str {
        match self {
            PageKind::Item => "item.html",
            PageKind::SectionIndex => "section.html",
            PageKind::Home => "home.html",
        }
    }
}

pub struct ItemContext<'a> {
    pub site: &'a SiteConfig,
    pub entry: &'a SectionEntry<'a>,
    /// Body already rendered from Markdown
    pub content: &'a str,
    /// Site-relative feed URL; `None` when no feed is generated
    pub feed_url: Option<&'a str>,
}

pub struct SectionContext<'a> {
    pub site: &'a SiteConfig,
    pub section: &'a Section<'a>,
    pub feed_url: Option<&'a str>,
}

pub struct HomeContext<'a> {
    pub site: &'a Site<'a>,
    /// Every item, newest first
    pub latest: &'a [&'a Item],
    pub feed_url: Option<&'a str>,
}

/// Anything that can turn page contexts into markup trees. Implementations
/// must be pure: the same context always produces the same tree.
pub trait TemplateSet: Send + Sync {
    fn render_item(&self, ctx: &ItemContext<'_>) -> Result<Node, TemplateError>;
    fn render_section(&self, ctx: &SectionContext<'_>) -> Result<Node, TemplateError>;
    fn render_home(&self, ctx: &HomeContext<'_>) -> Result<Node, TemplateError>;
}

/// Flattened item data handed to tera templates.
#[derive(Debug, Serialize)]
pub struct ItemView<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub url: String,
    pub date: String,
    pub date_iso: String,
    pub reading_time: &'a str,
    pub section: &'a str,
}

impl<'a> ItemView<'a> {
    pub fn new(item: &'a Item, site: &SiteConfig) -> Self {
        Self {
            id: &item.id,
            title: &item.title,
            description: &item.description,
            url: item.url(),
            date: item.publish_date.format(&site.date_format).to_string(),
            date_iso: item.publish_date.format("%Y-%m-%d").to_string(),
            reading_time: &item.reading_time,
            section: item.section_id.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NavItem {
    pub text: String,
    pub link: String,
}

pub fn navigation() -> Vec<NavItem> {
    SectionId::ALL
        .iter()
        .map(|section| NavItem {
            text: section.title().to_string(),
            link: section.url(),
        })
        .collect()
}

/// Template set backed by a directory of tera templates
/// (`item.html`, `section.html`, `home.html`).
pub struct TeraTemplates {
    tera: Tera,
}

impl TeraTemplates {
    pub fn new<P: AsRef<Path>>(theme_dir: P) -> Result<Self, TemplateError> {
        let theme_dir = theme_dir.as_ref();
        if !theme_dir.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("theme directory {} not found", theme_dir.display()),
            )
            .into());
        }

        let glob = theme_dir.join("**").join("*.html");
        let tera = Tera::new(&glob.to_string_lossy())?;
        Self::from_tera(tera)
    }

    pub fn from_tera(tera: Tera) -> Result<Self, TemplateError> {
        for kind in PageKind::ALL {
            let name = kind.template_name();
            if !tera.get_template_names().any(|n| n == name) {
                return Err(TemplateError::MissingTemplate(name));
            }
        }
        Ok(Self { tera })
    }

    fn base_context(site: &SiteConfig, feed_url: Option<&str>) -> Context {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("navigation", &navigation());
        context.insert("feed_url", &feed_url);
        context
    }

    fn render(&self, kind: PageKind, context: &Context) -> Result<Node, TemplateError> {
        Ok(Node::raw(self.tera.render(kind.template_name(), context)?))
    }
}

impl TemplateSet for TeraTemplates {
    fn render_item(&self, ctx: &ItemContext<'_>) -> Result<Node, TemplateError> {
        let mut context = Self::base_context(ctx.site, ctx.feed_url);
        context.insert("item", &ItemView::new(ctx.entry.item, ctx.site));
        context.insert("page_content", ctx.content);
        context.insert(
            "previous",
            &ctx.entry.previous.map(|item| ItemView::new(item, ctx.site)),
        );
        context.insert("next", &ctx.entry.next.map(|item| ItemView::new(item, ctx.site)));
        self.render(PageKind::Item, &context)
    }

    fn render_section(&self, ctx: &SectionContext<'_>) -> Result<Node, TemplateError> {
        let mut context = Self::base_context(ctx.site, ctx.feed_url);
        let items: Vec<ItemView> = ctx
            .section
            .items()
            .map(|item| ItemView::new(item, ctx.site))
            .collect();
        context.insert("section_title", ctx.section.id.title());
        context.insert("section_url", &ctx.section.id.url());
        context.insert("items", &items);
        self.render(PageKind::SectionIndex, &context)
    }

    fn render_home(&self, ctx: &HomeContext<'_>) -> Result<Node, TemplateError> {
        let mut context = Self::base_context(ctx.site.config, ctx.feed_url);
        let items: Vec<ItemView> = ctx
            .latest
            .iter()
            .map(|item| ItemView::new(item, ctx.site.config))
            .collect();
        context.insert("items", &items);
        self.render(PageKind::Home, &context)
    }
}
