use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::markdown::slugify;

const FRONT_MATTER_DELIMITER: &str = "---";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} has no metadata block", .0.display())]
    MissingFrontMatter(PathBuf),
    #[error("{} has no closing `---` after its metadata block", .0.display())]
    UnterminatedFrontMatter(PathBuf),
    #[error("invalid metadata in {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

impl LoadError {
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. } | LoadError::Metadata { path, .. } => path,
            LoadError::MissingFrontMatter(path) | LoadError::UnterminatedFrontMatter(path) => path,
        }
    }
}

/// Metadata block as written by the author. Every field is optional here;
/// the validator decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetadata {
    pub date: Option<String>,
    pub section: Option<String>,
    pub reading_time: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub id: String,
    pub source: PathBuf,
    pub metadata: RawMetadata,
    pub body: String,
    /// First directory below the content root, used when the metadata
    /// does not name a section
    pub default_section: Option<String>,
}

/// Reads posts from a content directory laid out as `<section>/<post>.md`.
pub struct ContentLoader {
    source_dir: PathBuf,
}

impl ContentLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source_dir: path.as_ref().to_path_buf(),
        }
    }

    /// Walk the content directory lazily. Files come out in path order and
    /// every call starts a fresh walk, so iterating twice yields the same
    /// sequence.
    pub fn items(&self) -> impl Iterator<Item = Result<RawItem, LoadError>> + '_ {
        WalkDir::new(&self.source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let path = entry.path();
                    (entry.file_type().is_file() && is_markdown(path))
                        .then(|| self.load(path))
                }
                Err(err) => {
                    let path = err.path().unwrap_or(self.source_dir.as_path()).to_path_buf();
                    Some(Err(LoadError::Io {
                        path,
                        source: err.into(),
                    }))
                }
            })
    }

    pub fn load(&self, path: &Path) -> Result<RawItem, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let (metadata, body) = split_front_matter(&content, path)?;
        let metadata: RawMetadata = if metadata.trim().is_empty() {
            RawMetadata::default()
        } else {
            serde_yaml_ng::from_str(metadata).map_err(|source| LoadError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
        };

        let id = path
            .file_stem()
            .map(|stem| slugify(&stem.to_string_lossy()))
            .unwrap_or_default();

        Ok(RawItem {
            id,
            source: path.to_path_buf(),
            metadata,
            body: body.to_string(),
            default_section: self.section_dir(path),
        })
    }

    fn section_dir(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.source_dir).ok()?;
        let mut components = relative.components();
        let first = components.next()?;
        // A file directly in the root has no section directory
        components.next()?;
        match first {
            Component::Normal(name) => Some(name.to_string_lossy().to_string()),
            _ => None,
        }
    }
}

/// Split `---\n<yaml>\n---\n<body>` into its two halves.
fn split_front_matter<'a>(content: &'a str, path: &Path) -> Result<(&'a str, &'a str), LoadError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == FRONT_MATTER_DELIMITER => {}
        _ => return Err(LoadError::MissingFrontMatter(path.to_path_buf())),
    }

    let start = content.find('\n').map(|i| i + 1).unwrap_or(content.len());
    let mut offset = start;
    for line in lines {
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            let metadata = &content[start..offset];
            let body = &content[offset + line.len()..];
            return Ok((metadata, body));
        }
        offset += line.len();
    }

    Err(LoadError::UnterminatedFrontMatter(path.to_path_buf()))
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn splits_metadata_from_body() {
        let (meta, body) =
            split_front_matter("---\ndate: 2020-01-01\n---\n# Hi\n", Path::new("a.md")).unwrap();
        assert_eq!(meta, "date: 2020-01-01\n");
        assert_eq!(body, "# Hi\n");
    }

    #[test]
    fn missing_opening_delimiter_is_malformed() {
        let err = split_front_matter("# Hi\n", Path::new("a.md")).unwrap_err();
        assert!(matches!(err, LoadError::MissingFrontMatter(_)));
    }

    #[test]
    fn missing_closing_delimiter_is_malformed() {
        let err = split_front_matter("---\ndate: 2020-01-01\n# Hi\n", Path::new("a.md")).unwrap_err();
        assert!(matches!(err, LoadError::UnterminatedFrontMatter(_)));
    }

    #[test]
    fn loads_items_in_path_order_with_section_dir() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "posts/second-post.md",
            "---\ndate: 2020-02-01 10:00\nreadingTime: 5 min\n---\nbody b\n",
        );
        write(dir.path(), "posts/a-post.md", "---\ndate: 2020-01-01\n---\nbody a\n");
        write(dir.path(), "notes.txt", "not content");

        let loader = ContentLoader::new(dir.path());
        let items: Vec<RawItem> = loader.items().collect::<Result<_, _>>().unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a-post");
        assert_eq!(items[1].id, "second-post");
        assert_eq!(items[1].metadata.reading_time.as_deref(), Some("5 min"));
        assert_eq!(items[1].metadata.date.as_deref(), Some("2020-02-01 10:00"));
        assert_eq!(items[0].default_section.as_deref(), Some("posts"));
        assert_eq!(items[0].body, "body a\n");
    }

    #[test]
    fn iteration_is_restartable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "posts/a.md", "---\ndate: 2020-01-01\n---\n");
        write(dir.path(), "posts/b.md", "---\ndate: 2020-01-02\n---\n");

        let loader = ContentLoader::new(dir.path());
        let first: Vec<_> = loader.items().map(|r| r.unwrap()).collect();
        let second: Vec<_> = loader.items().map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn bad_files_are_reported_without_stopping_the_walk() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "posts/a.md", "no metadata here");
        write(dir.path(), "posts/b.md", "---\ndate: [unclosed\n---\n");
        write(dir.path(), "posts/c.md", "---\ndate: 2020-01-01\n---\nok");

        let results: Vec<_> = ContentLoader::new(dir.path()).items().collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Err(LoadError::MissingFrontMatter(_))));
        assert!(matches!(results[1], Err(LoadError::Metadata { .. })));
        assert!(results[2].is_ok());
    }

    #[test]
    fn root_level_files_have_no_default_section() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "about.md", "---\n---\nAbout");
        let item = ContentLoader::new(dir.path()).load(&path).unwrap();
        assert_eq!(item.default_section, None);
        assert_eq!(item.metadata, RawMetadata::default());
    }
}
