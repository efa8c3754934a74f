//! The staged pipeline: download, unpack, configure, build.
//!
//! Every stage checks the filesystem for work a previous run already did and
//! skips it, so an interrupted build resumes where it stopped. A [`Session`]
//! carries everything a run needs from one stage to the next.

use super::cmake::{build_command, configure_args, run, ConfigureOptions};
use super::extract::{extract, ArchiveKind};
use super::fetch::{download_file, scrape_links, Download, Fetch};
use super::layout::{is_configured, Layout};
use super::manifest::Manifest;
use super::merge::merge_gnu_toolchain;
use super::platform::Platform;
use super::sources::{ArchiveSource, Component, RemoteArchive};
use super::tools::Tools;
use crate::config::Config;
use anyhow::{Context, Result};
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Pipeline stages in execution order. Running one runs all before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Download,
    Unpack,
    Configure,
    Build,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Empty the CMake build directory before configuring.
    pub reconfigure: bool,
    /// Scrape the listing pages again instead of trusting the manifest.
    pub refresh: bool,
}

/// One step of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Clean,
    Run(Stage, RunOptions),
    Status,
}

/// Run context threaded through every stage of one invocation.
pub struct Session {
    config: Config,
    layout: Layout,
    platform: Platform,
    tools: Tools,
    fetcher: Box<dyn Fetch>,
    resolved: BTreeMap<Component, RemoteArchive>,
}

impl Session {
    pub fn new(
        config: Config,
        layout: Layout,
        platform: Platform,
        tools: Tools,
        fetcher: Box<dyn Fetch>,
    ) -> Self {
        Self {
            config,
            layout,
            platform,
            tools,
            fetcher,
            resolved: BTreeMap::new(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Archives resolved so far in this run.
    pub fn resolved(&self) -> &BTreeMap<Component, RemoteArchive> {
        &self.resolved
    }

    pub fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Clean => self.clean(),
            Action::Run(target, opts) => self.run(target, opts),
            Action::Status => self.status(),
        }
    }

    /// Run `target` and every stage before it.
    pub fn run(&mut self, target: Stage, opts: RunOptions) -> Result<()> {
        // Fail before touching the network when the run cannot finish.
        if target >= Stage::Configure {
            self.tools.cmake.require()?;
        }

        self.download(opts.refresh)?;
        if target >= Stage::Unpack {
            self.unpack()?;
        }
        if target >= Stage::Configure {
            self.configure(opts.reconfigure)?;
        }
        if target >= Stage::Build {
            self.build()?;
        }
        Ok(())
    }

    /// Remove the work tree and the distribution.
    pub fn clean(&mut self) -> Result<()> {
        println!("=== Cleaning ===");
        for dir in [&self.layout.work, &self.layout.dist] {
            if dir.exists() {
                fs::remove_dir_all(dir)
                    .with_context(|| format!("Failed to remove {}", dir.display()))?;
                println!("  Removed {}", dir.display());
            }
        }
        self.resolved.clear();
        Ok(())
    }

    pub fn download(&mut self, refresh: bool) -> Result<()> {
        println!("=== Downloading sources ===");
        fs::create_dir_all(&self.layout.dl)
            .with_context(|| format!("Failed to create {}", self.layout.dl.display()))?;
        self.resolve_all(refresh)?;

        for component in Component::ALL {
            let archive = self.archive(component)?;
            let dest = self.layout.download(&archive.filename);
            let checksum = self.config.checksum(&archive.filename);
            if download_file(self.fetcher.as_ref(), &archive.url, &dest, checksum)?
                == Download::Cached
            {
                println!("  > \"{}\" already downloaded", archive.filename);
            }
        }
        Ok(())
    }

    /// Fill [`Self::resolved`] from the manifest, or by scraping each
    /// upstream listing page once.
    fn resolve_all(&mut self, refresh: bool) -> Result<()> {
        let path = self.layout.manifest();
        let mut manifest = Manifest::load(&path)?;

        if !refresh
            && Component::ALL
                .iter()
                .all(|c| manifest.components.contains_key(c))
        {
            debug!("using archives resolved at {:?}", manifest.resolved_at);
            self.resolved = manifest.components;
            return Ok(());
        }

        let mut pages: HashMap<String, Vec<String>> = HashMap::new();
        for component in Component::ALL {
            let source = ArchiveSource::for_component(component, &self.config, &self.platform);
            let links = match pages.entry(source.upstream.listing_url()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    println!("  > Scanning {}...", entry.key());
                    let links = scrape_links(
                        self.fetcher.as_ref(),
                        entry.key(),
                        &source.upstream.link_pattern,
                    )?;
                    entry.insert(links)
                }
            };
            let archive = source.resolve(links)?;
            debug!("{component}: {}", archive.url);
            manifest.components.insert(component, archive);
        }

        manifest.touch();
        manifest.save(&path)?;
        self.resolved = manifest.components;
        Ok(())
    }

    fn archive(&self, component: Component) -> Result<&RemoteArchive> {
        self.resolved
            .get(&component)
            .with_context(|| format!("{component} archive has not been resolved; run download first"))
    }

    /// Extract the archives and assemble the distribution layout.
    pub fn unpack(&self) -> Result<()> {
        println!("=== Unpacking ===");
        for dir in [&self.layout.src, &self.layout.dist] {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let gnu = self.archive(Component::GnuEmbeddedToolchain)?;
        let gnu_root = self.layout.src.join(&gnu.root);
        if gnu_root.is_dir() {
            debug!("{} already extracted", gnu_root.display());
        } else {
            let archive = self.layout.download(&gnu.filename);
            // Zip packages have no top-level directory of their own.
            let dest = if ArchiveKind::from_path(&archive) == Some(ArchiveKind::Zip) {
                &gnu_root
            } else {
                &self.layout.src
            };
            println!("  > Extracting \"{}\"...", gnu.filename);
            extract(&archive, dest)?;
        }
        merge_gnu_toolchain(&gnu_root, &self.layout, &self.platform)?;

        let llvm_root = self.layout.src.join(&self.archive(Component::CoreCompilerInfra)?.root);
        let tools = llvm_root.join("tools");
        self.unpack_source(Component::CoreCompilerInfra, &llvm_root)?;
        self.unpack_source(Component::Frontend, &tools.join("clang"))?;
        self.unpack_source(Component::Linker, &tools.join("lld"))?;
        Ok(())
    }

    /// Extract an LLVM source release and move its `<root>.src` dir to `dest`.
    fn unpack_source(&self, component: Component, dest: &Path) -> Result<()> {
        if dest.is_dir() {
            debug!("{} already unpacked", dest.display());
            return Ok(());
        }
        let archive = self.archive(component)?;
        println!("  > Extracting \"{}\"...", archive.filename);
        extract(&self.layout.download(&archive.filename), &self.layout.src)?;

        let extracted = self.layout.src.join(format!("{}.src", archive.root));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&extracted, dest).with_context(|| {
            format!("Failed to move {} to {}", extracted.display(), dest.display())
        })
    }

    pub fn configure(&self, reconfigure: bool) -> Result<()> {
        println!("=== Configuring LLVM ===");
        let cmake = self.tools.cmake.require()?;
        let llvm = self.archive(Component::CoreCompilerInfra)?;
        let build_dir = self.layout.build_dir(&llvm.root);

        if reconfigure && build_dir.is_dir() {
            println!("  > Removing previous configuration...");
            empty_dir(&build_dir)?;
        }
        if is_configured(&build_dir) {
            println!("  > LLVM is already configured");
            return Ok(());
        }

        fs::create_dir_all(&build_dir)
            .with_context(|| format!("Failed to create {}", build_dir.display()))?;
        let source_dir = self.layout.src.join(&llvm.root);
        let args = configure_args(&ConfigureOptions {
            platform: &self.platform,
            source_dir: &source_dir,
            install_dir: &self.layout.dist,
            triple: &self.config.triple,
            targets: &self.config.llvm_targets,
            clang: self.tools.clang.is_present(),
        });
        run(cmake, &args, &build_dir, &self.tools.compiler_env())
    }

    pub fn build(&self) -> Result<()> {
        println!("=== Building LLVM ===");
        self.tools.cmake.require()?;
        let llvm = self.archive(Component::CoreCompilerInfra)?;
        let build_dir = self.layout.build_dir(&llvm.root);

        let command = build_command(&self.platform, self.config.jobs());
        let program = self
            .tools
            .driver
            .as_deref()
            .unwrap_or_else(|| Path::new(command.program));
        run(
            program,
            &command.args,
            &build_dir,
            &self.tools.compiler_env(),
        )?;

        println!("\n=== Build complete ===");
        println!("Toolchain installed to {}", self.layout.dist.display());
        Ok(())
    }

    /// Print what is resolved and present, and the inferred stage.
    pub fn status(&self) -> Result<()> {
        let manifest = Manifest::load(&self.layout.manifest())?;
        println!("Toolchain Status:\n");

        for component in Component::ALL {
            match manifest.components.get(&component) {
                Some(archive) => {
                    let state = if self.layout.download(&archive.filename).is_file() {
                        "downloaded"
                    } else {
                        "missing"
                    };
                    let unpacked = extracted_dir(&self.layout, &manifest.components, component)
                        .is_some_and(|dir| dir.is_dir());
                    let unpacked = if unpacked { "extracted" } else { "not extracted" };
                    println!(
                        "  {:24} [{state}, {unpacked}] {}",
                        component.name(),
                        archive.filename
                    );
                }
                None => println!("  {:24} [unresolved]", component.name()),
            }
        }

        println!();
        for tool in [&self.tools.cmake, &self.tools.clang] {
            match &tool.path {
                Some(path) => println!("  {:8} {}", tool.name, path.display()),
                None => println!("  {:8} not found", tool.name),
            }
        }
        println!();
        println!(
            "  State: {}",
            inspect(&self.layout, &self.platform, &manifest.components)
        );
        Ok(())
    }
}

/// Remove everything inside `dir`, keeping `dir` itself.
pub fn empty_dir(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let removed = if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Where `component` lives once unpacked: the GNU package and LLVM under
/// `work/src`, Clang and LLD inside the LLVM tree.
pub fn extracted_dir(
    layout: &Layout,
    archives: &BTreeMap<Component, RemoteArchive>,
    component: Component,
) -> Option<PathBuf> {
    let root = |c: Component| archives.get(&c).map(|a| layout.src.join(&a.root));
    match component {
        Component::GnuEmbeddedToolchain | Component::CoreCompilerInfra => root(component),
        Component::Frontend => Some(root(Component::CoreCompilerInfra)?.join("tools").join("clang")),
        Component::Linker => Some(root(Component::CoreCompilerInfra)?.join("tools").join("lld")),
    }
}

/// How far a tree has progressed, judged from the filesystem alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageState {
    Clean,
    Downloaded,
    Unpacked,
    Configured,
    Built,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clean => "clean",
            Self::Downloaded => "downloaded",
            Self::Unpacked => "unpacked",
            Self::Configured => "configured",
            Self::Built => "built",
        })
    }
}

pub fn inspect(
    layout: &Layout,
    platform: &Platform,
    archives: &BTreeMap<Component, RemoteArchive>,
) -> StageState {
    if layout.dist.join("bin").join(platform.exe("clang")).is_file() {
        return StageState::Built;
    }
    let Some(llvm) = archives.get(&Component::CoreCompilerInfra) else {
        return StageState::Clean;
    };

    if is_configured(&layout.build_dir(&llvm.root)) {
        return StageState::Configured;
    }
    let unpacked = Component::ALL.iter().all(|&c| {
        extracted_dir(layout, archives, c).is_some_and(|dir| dir.is_dir())
    });
    if unpacked {
        return StageState::Unpacked;
    }
    let downloaded = Component::ALL.iter().all(|c| {
        archives
            .get(c)
            .is_some_and(|a| layout.download(&a.filename).is_file())
    });
    if downloaded {
        StageState::Downloaded
    } else {
        StageState::Clean
    }
}
