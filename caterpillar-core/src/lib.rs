pub mod builder;
pub mod config;
pub mod dom;
pub mod feed;
pub mod indexer;
pub mod markdown;
pub mod metadata;
pub mod renderer;
pub mod scanner;
pub mod site;
pub mod template;
pub mod theme;

// Re-export main types
pub use builder::{BuildError, BuildReport, BuildState, ItemError, ItemFailure, SiteAssembler, SiteBuilder};
pub use config::{Config, FeedConfig, SiteConfig};
pub use dom::Node;
pub use renderer::{PageRenderer, RenderedPage};
pub use scanner::ContentLoader;
pub use site::{Item, Section, SectionId, Site};
pub use template::{TemplateError, TemplateSet, TeraTemplates};
pub use theme::Foundation;
