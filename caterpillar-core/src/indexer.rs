use std::collections::HashMap;
use std::path::PathBuf;

use crate::site::{Item, Section, SectionEntry, SectionId, Sections};

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("duplicate item id `{id}` ({} and {})", .first.display(), .second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Group validated items into sections, order each section newest first
/// (ties broken by id) and link every entry to its neighbours.
pub fn index(items: &[Item]) -> Result<Sections<'_>, IndexError> {
    let mut seen: HashMap<&str, &Item> = HashMap::with_capacity(items.len());
    for item in items {
        if let Some(first) = seen.insert(item.id.as_str(), item) {
            return Err(IndexError::DuplicateId {
                id: item.id.clone(),
                first: first.source.clone(),
                second: item.source.clone(),
            });
        }
    }

    let mut sections = Sections::new();
    for id in SectionId::ALL {
        let mut members: Vec<&Item> = items.iter().filter(|item| item.section_id == id).collect();
        members.sort_by(|a, b| {
            b.publish_date
                .cmp(&a.publish_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let entries = members
            .iter()
            .copied()
            .enumerate()
            .map(|(i, item)| SectionEntry {
                item,
                previous: i.checked_sub(1).map(|p| members[p]),
                next: members.get(i + 1).copied(),
            })
            .collect();

        sections.insert(id, Section { id, entries });
    }

    Ok(sections)
}
