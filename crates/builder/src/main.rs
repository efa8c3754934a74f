//! # Toolchain Builder
//!
//! Build an `arm-none-eabi` LLVM/Clang toolchain from upstream releases.
//!
//! ## Usage
//!
//! ```bash
//! toolchain                 # Download, unpack, configure and build
//! toolchain download        # Fetch the source archives only
//! toolchain configure -r    # Reconfigure LLVM from scratch
//! toolchain -c build        # Clean first, then build everything
//! toolchain status          # Show what is resolved and present
//! ```
//!
//! ## Layout
//!
//! - `work/` - downloads, extracted sources and the CMake build tree
//! - `dist/arm-none-eabi-llvm-<platform>/` - the finished toolchain

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use toolchain_builder::builder::fetch::HttpFetcher;
use toolchain_builder::builder::layout::Layout;
use toolchain_builder::builder::locate::Locator;
use toolchain_builder::builder::platform::Platform;
use toolchain_builder::builder::stages::{Action, Session};
use toolchain_builder::builder::tools::Tools;
use toolchain_builder::builder::BuildCommands;
use toolchain_builder::config::Config;
use toolchain_builder::error;

#[derive(Parser)]
#[command(name = "toolchain", about = "ARM bare-metal LLVM toolchain builder")]
struct Cli {
    /// Remove the work tree and the distribution before running
    #[arg(short, long)]
    clean: bool,

    /// Print debug diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding `work/` and `dist/`
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Configuration file (default: `<root>/toolchain.toml` if present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<BuildCommands>,
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(error::exit_code(&err));
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::new().parse_filters("debug").init();
        return;
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

/// What this invocation does, in order. No subcommand means `build`.
fn actions(cli: &Cli) -> Vec<Action> {
    cli.command.unwrap_or_default().actions(cli.clean)
}

fn run(cli: &Cli) -> Result<()> {
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("Root directory {} not found", cli.root.display()))?;
    let config = Config::load(&root, cli.config.as_deref())?;
    let platform = Platform::host()?;
    let layout = Layout::new(&root, &config.triple, &platform);
    let tools = Tools::locate(&Locator::from_env(&platform), &platform);
    log::debug!(
        "cmake: {:?}, clang: {:?}, driver: {:?}",
        tools.cmake.path,
        tools.clang.path,
        tools.driver
    );

    let mut session = Session::new(config, layout, platform, tools, Box::new(HttpFetcher::new()?));

    for action in actions(cli) {
        session.perform(action)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolchain_builder::builder::stages::{RunOptions, Stage};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("toolchain").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_subcommand_builds() {
        let cli = parse(&[]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(actions(&cli), vec![Action::Run(Stage::Build, RunOptions::default())]);
    }

    #[test]
    fn test_clean_flag_before_subcommand() {
        let cli = parse(&["-c", "configure", "--reconfigure"]);
        assert_eq!(
            actions(&cli),
            vec![
                Action::Clean,
                Action::Run(
                    Stage::Configure,
                    RunOptions {
                        reconfigure: true,
                        refresh: false
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_clean_flag_alone_builds_from_scratch() {
        let cli = parse(&["--clean"]);
        assert_eq!(
            actions(&cli),
            vec![Action::Clean, Action::Run(Stage::Build, RunOptions::default())]
        );
    }

    #[test]
    fn test_clean_flag_and_command_clean_once() {
        assert_eq!(actions(&parse(&["-c", "clean"])), vec![Action::Clean]);
    }

    #[test]
    fn test_global_options() {
        let cli = parse(&["-v", "--root", "/tmp/tc", "--config", "tc.toml", "download", "--refresh"]);
        assert!(cli.verbose);
        assert_eq!(cli.root, PathBuf::from("/tmp/tc"));
        assert_eq!(cli.config, Some(PathBuf::from("tc.toml")));
        assert_eq!(cli.command, Some(BuildCommands::Download { refresh: true }));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["toolchain", "install"]).is_err());
    }
}
