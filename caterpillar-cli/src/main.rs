mod cmd;
mod config;

use anyhow::Result;
use clap::Command;

fn cli() -> Command {
    Command::new("caterpillar")
        .about("Builds the caterpillarDev blog from markdown posts")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd::build::make_subcommand())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("build", args)) => cmd::build::execute(args),
        _ => unreachable!("subcommand is required"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn build_is_the_only_subcommand() {
        let matches = cli()
            .try_get_matches_from(["caterpillar", "build", "--strict"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "build");
        assert!(args.get_flag("strict"));
        assert!(cli().try_get_matches_from(["caterpillar", "serve"]).is_err());
    }
}
