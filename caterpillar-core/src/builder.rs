use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{Config, ConfigError};
use crate::feed::{self, GeneratedFile};
use crate::indexer::{IndexError, index};
use crate::metadata::{ValidationError, validate};
use crate::renderer::{PageRenderer, RenderError, RenderedPage};
use crate::scanner::{ContentLoader, LoadError};
use crate::site::{Item, SectionEntry, Sections, Site};
use crate::template::{TemplateError, TemplateSet, TeraTemplates};
use crate::theme::Foundation;

/// Errors that abort the whole build. Nothing in the output directory has
/// been touched when one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Source directory not specified")]
    MissingSourceDir,
    #[error("Content directory {} does not exist", .0.display())]
    ContentNotFound(PathBuf),
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
    #[error("Index error: {0}")]
    IndexError(#[from] IndexError),
    #[error("Write error: {0}")]
    WriteError(#[from] WriteError),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to write {}: {source}", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    fn at(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
        move |source| WriteError {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A problem confined to one content file or page. The item is left out
/// of the site and the build carries on.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug)]
pub struct ItemFailure {
    /// Content file, or output page for section and home failures
    pub source: PathBuf,
    pub error: ItemError,
}

#[derive(Debug)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub items_published: usize,
    pub pages_written: usize,
    pub failures: Vec<ItemFailure>,
}

impl BuildReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Where a build currently is. `Failed` can follow any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Loading,
    Validating,
    Indexing,
    Rendering,
    Writing,
    Done,
    Failed,
}

pub struct SiteBuilder {
    source_dir: Option<PathBuf>,
    output_dir: PathBuf,
    resources_dir: Option<PathBuf>,
    theme_dir: Option<PathBuf>,
    templates: Option<Box<dyn TemplateSet>>,
    config: Config,
    parallel: bool,
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            source_dir: None,
            output_dir: PathBuf::from("./Output"),
            resources_dir: None,
            theme_dir: None,
            templates: None,
            config: Config::default(),
            parallel: true,
        }
    }

    // Required configuration
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    // Optional paths
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    /// Directory copied verbatim into the output root (stylesheets, images)
    pub fn resources_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.resources_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Directory of tera templates replacing the built-in theme
    pub fn theme_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.theme_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn templates<T: TemplateSet + 'static>(mut self, templates: T) -> Self {
        self.templates = Some(Box::new(templates));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn build(self) -> Result<SiteAssembler, BuildError> {
        let source_dir = self.source_dir.ok_or(BuildError::MissingSourceDir)?;
        self.config.validate()?;

        let templates: Box<dyn TemplateSet> = match (self.templates, self.theme_dir) {
            (Some(templates), _) => templates,
            (None, Some(theme_dir)) => {
                info!("Using theme templates from {}", theme_dir.display());
                Box::new(TeraTemplates::new(&theme_dir)?)
            }
            (None, None) => Box::new(Foundation),
        };

        Ok(SiteAssembler {
            source_dir,
            output_dir: self.output_dir,
            resources_dir: self.resources_dir,
            templates,
            config: self.config,
            parallel: self.parallel,
            state: Cell::new(BuildState::Idle),
        })
    }
}

/// Runs the load → validate → index → render → write pipeline once.
pub struct SiteAssembler {
    source_dir: PathBuf,
    output_dir: PathBuf,
    resources_dir: Option<PathBuf>,
    templates: Box<dyn TemplateSet>,
    config: Config,
    parallel: bool,
    state: Cell<BuildState>,
}

impl SiteAssembler {
    pub fn state(&self) -> BuildState {
        self.state.get()
    }

    fn transition(&self, state: BuildState) {
        debug!("{:?} -> {:?}", self.state.get(), state);
        self.state.set(state);
    }

    pub fn run(&self) -> Result<BuildReport, BuildError> {
        match self.execute() {
            Ok(report) => {
                self.transition(BuildState::Done);
                Ok(report)
            }
            Err(err) => {
                error!("Build failed while {:?}: {}", self.state.get(), err);
                self.transition(BuildState::Failed);
                Err(err)
            }
        }
    }

    fn execute(&self) -> Result<BuildReport, BuildError> {
        let mut failures = Vec::new();

        self.transition(BuildState::Loading);
        if !self.source_dir.is_dir() {
            return Err(BuildError::ContentNotFound(self.source_dir.clone()));
        }
        info!("Loading content from {}", self.source_dir.display());
        let loader = ContentLoader::new(&self.source_dir);
        let mut raw_items = Vec::new();
        for result in loader.items() {
            match result {
                Ok(raw) => {
                    debug!("Loaded {}", raw.source.display());
                    raw_items.push(raw);
                }
                Err(err) => {
                    warn!("Skipping {}: {}", err.path().display(), err);
                    failures.push(ItemFailure {
                        source: err.path().to_path_buf(),
                        error: err.into(),
                    });
                }
            }
        }

        self.transition(BuildState::Validating);
        let mut items: Vec<Item> = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            let source = raw.source.clone();
            match validate(raw) {
                Ok(item) => items.push(item),
                Err(err) => {
                    warn!("Skipping {}: {}", source.display(), err);
                    failures.push(ItemFailure {
                        source,
                        error: err.into(),
                    });
                }
            }
        }

        self.transition(BuildState::Indexing);
        index(&items)?;

        self.transition(BuildState::Rendering);
        let renderer = PageRenderer::new(&self.config.site, self.templates.as_ref())
            .with_feed(&self.config.feed);

        // Items that fail to render are dropped and the rest re-indexed, so
        // no neighbour, index page or feed links to a page that is not written.
        let mut pages = loop {
            let (pages, rejected) = {
                let sections = index(&items)?;
                self.render_items(&renderer, &sections)
            };
            if rejected.is_empty() {
                break pages;
            }
            for (entry_id, source, err) in rejected {
                warn!("Skipping {}: {}", source.display(), err);
                items.retain(|item| item.id != entry_id);
                failures.push(ItemFailure {
                    source,
                    error: err.into(),
                });
            }
        };
        let items_published = pages.len();

        let site = Site::new(&self.config.site, index(&items)?);
        let index_pages = site
            .sections
            .values()
            .map(|section| (section.id.out_path(), renderer.render_section(section)))
            .chain(std::iter::once((
                PathBuf::from("index.html"),
                renderer.render_home(&site),
            )));
        for (out_path, result) in index_pages {
            match result {
                Ok(page) => pages.push(page),
                Err(err) => {
                    warn!("Skipping {}: {}", out_path.display(), err);
                    failures.push(ItemFailure {
                        source: out_path,
                        error: err.into(),
                    });
                }
            }
        }

        let generated = feed::generate(&site, &self.config.feed);

        self.transition(BuildState::Writing);
        let pages_written = self.publish(&pages, &generated)?;
        info!(
            "Wrote {} pages to {}",
            pages_written,
            self.output_dir.display()
        );

        Ok(BuildReport {
            output_dir: self.output_dir.clone(),
            items_published,
            pages_written,
            failures,
        })
    }

    /// Render every indexed item, keeping the input order. Failures come
    /// back with the id and source of the item that caused them.
    fn render_items(
        &self,
        renderer: &PageRenderer<'_>,
        sections: &Sections<'_>,
    ) -> (Vec<RenderedPage>, Vec<(String, PathBuf, RenderError)>) {
        let entries: Vec<&SectionEntry> = sections
            .values()
            .flat_map(|section| section.entries.iter())
            .collect();
        info!("Rendering {} items", entries.len());

        let results: Vec<Result<RenderedPage, RenderError>> = if self.parallel {
            entries.par_iter().map(|entry| renderer.render_item(entry)).collect()
        } else {
            entries.iter().map(|entry| renderer.render_item(entry)).collect()
        };

        let mut pages = Vec::with_capacity(results.len());
        let mut rejected = Vec::new();
        for (entry, result) in entries.iter().zip(results) {
            match result {
                Ok(page) => {
                    debug!("Rendered {} as {}", page.metadata.url, page.output_path.display());
                    pages.push(page);
                }
                Err(err) => rejected.push((entry.item.id.clone(), entry.item.source.clone(), err)),
            }
        }
        (pages, rejected)
    }

    /// Write everything into a staging directory beside the output, then
    /// swap it into place. A failure before the swap leaves the previous
    /// build as it was.
    fn publish(&self, pages: &[RenderedPage], files: &[GeneratedFile]) -> Result<usize, WriteError> {
        let parent = match self.output_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(WriteError::at(&parent))?;

        let staging = tempfile::Builder::new()
            .prefix(".caterpillar-staging-")
            .tempdir_in(&parent)
            .map_err(WriteError::at(&parent))?;

        if let Some(resources) = &self.resources_dir {
            if resources.is_dir() {
                let copied = copy_dir(resources, staging.path())?;
                debug!("Copied {} resources from {}", copied, resources.display());
            } else {
                warn!("Resources directory {} not found, skipping", resources.display());
            }
        }

        for asset in self.config.site.declared_assets() {
            if !staging.path().join(asset.trim_start_matches('/')).is_file() {
                warn!("{} is referenced by the site but was not found in the resources", asset);
            }
        }

        for page in pages {
            write_file(&staging.path().join(&page.output_path), page.to_html().as_bytes())?;
        }
        for file in files {
            write_file(&staging.path().join(&file.output_path), file.contents.as_bytes())?;
        }

        swap_into_place(staging.path(), &self.output_dir, &parent)?;
        Ok(pages.len())
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(WriteError::at(parent))?;
    }
    fs::write(path, contents).map_err(WriteError::at(path))
}

fn copy_dir(from: &Path, to: &Path) -> Result<usize, WriteError> {
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|err| WriteError {
            path: err.path().unwrap_or(from).to_path_buf(),
            source: err.into(),
        })?;
        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(WriteError::at(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(WriteError::at(&target))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn swap_into_place(staging: &Path, output: &Path, parent: &Path) -> Result<(), WriteError> {
    if !output.exists() {
        return fs::rename(staging, output).map_err(WriteError::at(output));
    }

    // Directories cannot be renamed over each other, so the previous build
    // moves aside first and is restored if the swap fails.
    let backup = tempfile::Builder::new()
        .prefix(".caterpillar-previous-")
        .tempdir_in(parent)
        .map_err(WriteError::at(parent))?;
    let previous = backup.path().join("site");
    fs::rename(output, &previous).map_err(WriteError::at(output))?;

    if let Err(source) = fs::rename(staging, output) {
        if let Err(restore) = fs::rename(&previous, output) {
            error!(
                "Could not restore previous build from {}: {}",
                previous.display(),
                restore
            );
            // Keep the backup on disk so the previous build is not lost
            let _ = backup.keep();
        }
        return Err(WriteError {
            path: output.to_path_buf(),
            source,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn post(dir: &Path, name: &str, date: &str) {
        let path = dir.join("posts").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("---\ndate: {date}\n---\n# {name}\n\nBody.\n")).unwrap();
    }

    #[test]
    fn build_requires_a_source_dir() {
        let err = SiteBuilder::new().build().err().unwrap();
        assert!(matches!(err, BuildError::MissingSourceDir));
    }

    #[test]
    fn invalid_date_format_fails_before_rendering() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.site.date_format = "%Q".into();

        let err = SiteBuilder::new()
            .source_dir(tmp.path())
            .config(config)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::ConfigError(ConfigError::DateFormat(_))));
    }

    #[test]
    fn missing_content_dir_fails_in_loading() {
        let tmp = TempDir::new().unwrap();
        let assembler = SiteBuilder::new()
            .source_dir(tmp.path().join("nope"))
            .output_dir(tmp.path().join("out"))
            .build()
            .unwrap();

        assert_eq!(assembler.state(), BuildState::Idle);
        let err = assembler.run().unwrap_err();
        assert!(matches!(err, BuildError::ContentNotFound(_)));
        assert_eq!(assembler.state(), BuildState::Failed);
    }

    #[test]
    fn successful_run_ends_in_done() {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join("content");
        post(&content, "a.md", "2020-01-01");

        let assembler = SiteBuilder::new()
            .source_dir(&content)
            .output_dir(tmp.path().join("out"))
            .build()
            .unwrap();
        let report = assembler.run().unwrap();

        assert_eq!(assembler.state(), BuildState::Done);
        assert_eq!(report.items_published, 1);
        // item, section index, home
        assert_eq!(report.pages_written, 3);
        assert!(!report.has_failures());
    }

    #[test]
    fn swap_replaces_existing_output() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("out");
        let staging = tmp.path().join("staging");
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("old.html"), "old").unwrap();
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("new.html"), "new").unwrap();

        swap_into_place(&staging, &output, tmp.path()).unwrap();

        assert!(output.join("new.html").exists());
        assert!(!output.join("old.html").exists());
        assert!(!staging.exists());
        // Only the output directory remains; the backup was cleaned up
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn copy_dir_preserves_layout() {
        let tmp = TempDir::new().unwrap();
        let from = tmp.path().join("from");
        fs::create_dir_all(from.join("images")).unwrap();
        fs::write(from.join("primer.css"), "body{}").unwrap();
        fs::write(from.join("images/me.png"), [0u8, 1, 2]).unwrap();
        let to = tmp.path().join("to");
        fs::create_dir_all(&to).unwrap();

        assert_eq!(copy_dir(&from, &to).unwrap(), 2);
        assert_eq!(fs::read_to_string(to.join("primer.css")).unwrap(), "body{}");
        assert_eq!(fs::read(to.join("images/me.png")).unwrap(), vec![0u8, 1, 2]);
    }
}
