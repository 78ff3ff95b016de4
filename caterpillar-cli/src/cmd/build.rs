use anyhow::{Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};
use caterpillar_core::SiteBuilder;

use crate::config::CaterpillarConfig;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("DIR")
                .help("Content directory containing one folder per section [default: ./Content]")
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for generated site [default: ./Output]")
        )
        .arg(
            Arg::new("resources")
                .short('r')
                .long("resources")
                .value_name("DIR")
                .help("Directory copied verbatim into the output [default: ./Resources]")
        )
        .arg(
            Arg::new("theme")
                .short('t')
                .long("theme")
                .value_name("DIR")
                .help("Tera theme directory with item.html, section.html and home.html")
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./caterpillar.toml]")
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("Exit with an error if any post was skipped")
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .action(ArgAction::SetTrue)
                .help("Render pages on a single thread")
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build"))
        .about("Build the static site from markdown posts")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = CaterpillarConfig::load(args)?;
    let build_config = config.build_config();

    let mut builder = SiteBuilder::new()
        .source_dir(&build_config.source)
        .output_dir(&build_config.output)
        .resources_dir(&build_config.resources)
        .config(config.site_config())
        .parallel(build_config.parallel);
    if !build_config.theme.is_empty() {
        builder = builder.theme_dir(&build_config.theme);
    }

    let report = builder.build()?.run()?;

    for failure in &report.failures {
        log::warn!("Skipped {}: {}", failure.source.display(), failure.error);
    }
    log::info!(
        "Published {} posts ({} pages) to {}",
        report.items_published,
        report.pages_written,
        report.output_dir.display()
    );

    if build_config.strict && report.has_failures() {
        return Err(anyhow!(
            "{} post(s) could not be published",
            report.failures.len()
        ));
    }

    Ok(())
}
