use std::path::Path;

use anyhow::Result;
use caterpillar_core::config::{Config, FeedConfig, SiteConfig};
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CaterpillarConfig {
    /// Build configuration
    pub build: BuildConfig,
    /// Site configuration (from caterpillar-core)
    pub site: SiteConfig,
    /// Feed and sitemap configuration (from caterpillar-core)
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Content directory containing section folders of markdown posts
    pub source: String,
    /// Output directory for generated site
    pub output: String,
    /// Directory copied verbatim into the output (stylesheets, images)
    pub resources: String,
    /// Tera theme directory; empty uses the built-in theme
    pub theme: String,
    /// Configuration file path
    pub config: String,
    /// Fail the build when any post was skipped
    pub strict: bool,
    /// Render posts on the rayon thread pool
    pub parallel: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: "./Content".to_string(),
            output: "./Output".to_string(),
            resources: "./Resources".to_string(),
            theme: String::new(),
            config: "./caterpillar.toml".to_string(),
            strict: false,
            parallel: true,
        }
    }
}

impl CaterpillarConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (CATERPILLAR_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .ok()
            .flatten()
            .cloned()
            .unwrap_or_else(|| BuildConfig::default().config);

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        // 2. Add configuration file if it exists
        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::from(Path::new(&config_file)));
        } else {
            log::debug!("No configuration file at {config_file}, using defaults");
        }

        // 3. Add environment variables with CATERPILLAR_ prefix
        builder = builder.add_source(
            Environment::with_prefix("CATERPILLAR")
                .prefix_separator("_")
                .separator("__") // Use double underscore for nested keys
                .try_parsing(true),
        );

        // 4. Override with CLI arguments that were actually given
        for key in ["source", "output", "resources", "theme", "config"] {
            if let Some(value) = args.try_get_one::<String>(key).ok().flatten() {
                builder = builder.set_override(format!("build.{key}"), value.clone())?;
            }
        }
        if flag(args, "strict") {
            builder = builder.set_override("build.strict", true)?;
        }
        if flag(args, "sequential") {
            builder = builder.set_override("build.parallel", false)?;
        }

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Just the parts caterpillar-core needs
    pub fn site_config(&self) -> Config {
        Config {
            site: self.site.clone(),
            feed: self.feed.clone(),
        }
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}

fn flag(args: &ArgMatches, id: &str) -> bool {
    args.try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};
    use tempfile::TempDir;

    fn command() -> Command {
        Command::new("test")
            .arg(Arg::new("source").long("source").value_name("DIR"))
            .arg(Arg::new("output").long("output").value_name("DIR"))
            .arg(Arg::new("config").long("config").value_name("FILE"))
            .arg(Arg::new("strict").long("strict").action(ArgAction::SetTrue))
            .arg(Arg::new("sequential").long("sequential").action(ArgAction::SetTrue))
    }

    #[test]
    fn test_default_config() {
        let config = CaterpillarConfig::default();
        assert_eq!(config.build.source, "./Content");
        assert_eq!(config.build.output, "./Output");
        assert_eq!(config.build.resources, "./Resources");
        assert!(config.build.theme.is_empty());
        assert!(config.build.parallel);
        assert_eq!(config.site.name, "caterpillarDev");
    }

    #[test]
    fn test_cli_args_override() {
        let matches = command()
            .try_get_matches_from(vec![
                "test",
                "--source", "/custom/source",
                "--output", "/custom/output",
                "--config", "/does/not/exist.toml",
                "--strict",
                "--sequential",
            ])
            .unwrap();

        let config = CaterpillarConfig::load(&matches).unwrap();
        assert_eq!(config.build.source, "/custom/source");
        assert_eq!(config.build.output, "/custom/output");
        assert!(config.build.strict);
        assert!(!config.build.parallel);
        // Should still have defaults for non-overridden values
        assert_eq!(config.build.resources, "./Resources");
        assert_eq!(config.site.primer_path, "/primer.css");
    }

    #[test]
    fn test_config_file_is_layered_under_cli() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("caterpillar.toml");
        std::fs::write(
            &file,
            r#"
            [build]
            output = "./public"
            source = "./posts-dir"

            [site]
            name = "From file"

            [feed]
            max_items = 5
            "#,
        )
        .unwrap();

        let file_arg = file.to_string_lossy().to_string();
        let matches = command()
            .try_get_matches_from(vec!["test", "--config", &file_arg, "--source", "./cli"])
            .unwrap();

        let config = CaterpillarConfig::load(&matches).unwrap();
        assert_eq!(config.build.output, "./public");
        assert_eq!(config.build.source, "./cli");
        assert_eq!(config.site.name, "From file");
        assert_eq!(config.site.description, "Personal blog.");
        assert_eq!(config.site_config().feed.max_items, 5);
    }
}
