use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;

/// The sections a post can belong to. Adding a section here is the only
/// way to make the indexer, the renderer and the output layout aware of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Posts,
}

impl SectionId {
    pub const ALL: [SectionId; 1] = [SectionId::Posts];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Posts => "posts",
        }
    }

    /// Human readable name used in navigation and page titles
    pub fn title(&self) -> &'static str {
        match self {
            SectionId::Posts => "Posts",
        }
    }

    pub fn url(&self) -> String {
        format!("/{}/", self.as_str())
    }

    pub fn out_path(&self) -> PathBuf {
        PathBuf::from(self.as_str()).join("index.html")
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown section `{0}`")]
pub struct UnknownSection(pub String);

impl FromStr for SectionId {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .into_iter()
            .find(|section| section.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}

/// A validated post. Items are created once by the validator and never
/// mutated afterwards; sections only borrow them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: String,
    pub raw_body: String,
    pub publish_date: NaiveDate,
    pub section_id: SectionId,
    pub reading_time: String,
    pub source: PathBuf,
}

impl Item {
    pub fn url(&self) -> String {
        format!("/{}/{}/", self.section_id.as_str(), self.id)
    }

    pub fn out_path(&self) -> PathBuf {
        PathBuf::from(self.section_id.as_str())
            .join(&self.id)
            .join("index.html")
    }
}

/// One position in a section's ordering. `previous` is the newer
/// neighbour, `next` the older one.
#[derive(Debug, Clone, Copy)]
pub struct SectionEntry<'a> {
    pub item: &'a Item,
    pub previous: Option<&'a Item>,
    pub next: Option<&'a Item>,
}

#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub id: SectionId,
    pub entries: Vec<SectionEntry<'a>>,
}

impl<'a> Section<'a> {
    pub fn items(&self) -> impl Iterator<Item = &'a Item> + '_ {
        self.entries.iter().map(|entry| entry.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SectionEntry<'a>> {
        self.entries.iter().find(|entry| entry.item.id == id)
    }
}

/// All sections keyed by id. Every `SectionId` variant is present, even
/// when it holds no items.
pub type Sections<'a> = BTreeMap<SectionId, Section<'a>>;

/// The site being published: configuration plus its indexed content.
pub struct Site<'a> {
    pub config: &'a SiteConfig,
    pub sections: Sections<'a>,
}

impl<'a> Site<'a> {
    pub fn new(config: &'a SiteConfig, sections: Sections<'a>) -> Self {
        Self { config, sections }
    }

    pub fn section(&self, id: SectionId) -> Option<&Section<'a>> {
        self.sections.get(&id)
    }

    /// Every published item, newest first across all sections
    pub fn latest_items(&self) -> Vec<&'a Item> {
        latest_items(&self.sections)
    }
}

pub fn latest_items<'a>(sections: &Sections<'a>) -> Vec<&'a Item> {
    let mut items: Vec<&'a Item> = sections.values().flat_map(|s| s.items()).collect();
    items.sort_by(|a, b| {
        b.publish_date
            .cmp(&a.publish_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    items
}
