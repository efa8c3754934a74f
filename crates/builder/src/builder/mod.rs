//! Toolchain build pipeline.
//!
//! Structure:
//! - `platform` - Host capabilities (archive flavour, generator, driver)
//! - `locate` / `tools` - Host tool discovery
//! - `fetch` / `sources` / `manifest` - Link scraping, resolution, downloads
//! - `extract` / `merge` - Unpacking and assembling the distribution
//! - `cmake` - Configure and build driver invocation
//! - `stages` - The resumable pipeline tying it together

pub mod cmake;
pub mod extract;
pub mod fetch;
pub mod layout;
pub mod locate;
pub mod manifest;
pub mod merge;
pub mod platform;
pub mod sources;
pub mod stages;
pub mod tools;

use clap::Subcommand;
use stages::{Action, RunOptions, Stage};

/// Build commands for the CLI.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildCommands {
    /// Remove the work tree and the distribution
    Clean,
    /// Resolve and download the source archives
    Download {
        /// Scrape the download pages again instead of using the manifest
        #[arg(long)]
        refresh: bool,
    },
    /// Extract the archives and merge the GNU toolchain
    Unpack,
    /// Configure LLVM with CMake
    Configure {
        /// Discard an existing CMake configuration first
        #[arg(short, long)]
        reconfigure: bool,
    },
    /// Build and install the toolchain (default)
    Build {
        /// Discard an existing CMake configuration first
        #[arg(short, long)]
        reconfigure: bool,
    },
    /// Show what has been resolved, downloaded and built
    Status,
}

impl Default for BuildCommands {
    fn default() -> Self {
        Self::Build { reconfigure: false }
    }
}

impl BuildCommands {
    /// Steps for this command; `clean_first` is the global `--clean` flag.
    pub fn actions(self, clean_first: bool) -> Vec<Action> {
        let mut actions = Vec::new();
        if clean_first {
            actions.push(Action::Clean);
        }
        let run = |stage, refresh, reconfigure| {
            Action::Run(stage, RunOptions { reconfigure, refresh })
        };
        match self {
            Self::Clean if clean_first => {}
            Self::Clean => actions.push(Action::Clean),
            Self::Download { refresh } => actions.push(run(Stage::Download, refresh, false)),
            Self::Unpack => actions.push(run(Stage::Unpack, false, false)),
            Self::Configure { reconfigure } => {
                actions.push(run(Stage::Configure, false, reconfigure));
            }
            Self::Build { reconfigure } => actions.push(run(Stage::Build, false, reconfigure)),
            Self::Status => actions.push(Action::Status),
        }
        actions
    }
}
