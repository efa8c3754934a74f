//! Upstream archive definitions and link resolution.
//!
//! Four archives make up the toolchain: the prebuilt GNU Arm Embedded
//! Toolchain (for its C library, runtime objects and binutils) and the LLVM,
//! Clang and LLD source releases.

use super::platform::Platform;
use crate::config::{Config, Upstream};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    GnuEmbeddedToolchain,
    CoreCompilerInfra,
    Frontend,
    Linker,
}

impl Component {
    pub const ALL: [Self; 4] = [
        Self::GnuEmbeddedToolchain,
        Self::CoreCompilerInfra,
        Self::Frontend,
        Self::Linker,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::GnuEmbeddedToolchain => "gnu-embedded-toolchain",
            Self::CoreCompilerInfra => "core-compiler-infra",
            Self::Frontend => "frontend",
            Self::Linker => "linker",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved archive: where to get it, what it is called locally, and the
/// directory it unpacks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteArchive {
    pub url: String,
    pub filename: String,
    pub root: String,
}

/// Static description of how to find one component's archive.
#[derive(Debug, Clone)]
pub struct ArchiveSource<'a> {
    pub component: Component,
    pub upstream: &'a Upstream,
    /// Substring the chosen link must contain.
    pub select: &'a str,
    /// Cut from the file name to get the extracted root directory.
    pub root_suffix: &'a str,
}

impl<'a> ArchiveSource<'a> {
    pub fn for_component(component: Component, config: &'a Config, platform: &Platform) -> Self {
        let llvm = |select: &'a str| ArchiveSource {
            component,
            upstream: &config.llvm,
            select,
            root_suffix: &config.llvm.link_pattern,
        };
        match component {
            Component::GnuEmbeddedToolchain => ArchiveSource {
                component,
                upstream: &config.arm,
                select: platform.gnu_archive_suffix,
                root_suffix: platform.gnu_archive_suffix,
            },
            Component::CoreCompilerInfra => llvm(&config.llvm_select.llvm),
            Component::Frontend => llvm(&config.llvm_select.clang),
            Component::Linker => llvm(&config.llvm_select.lld),
        }
    }

    /// Pick the first link containing [`Self::select`].
    pub fn resolve(&self, links: &[String]) -> Result<RemoteArchive> {
        let link = links
            .iter()
            .find(|link| link.contains(self.select))
            .with_context(|| {
                format!(
                    "No {} release link containing '{}' found on {}",
                    self.component,
                    self.select,
                    self.upstream.listing_url()
                )
            })?;
        Ok(archive_from_link(&self.upstream.base, link, self.root_suffix))
    }
}

/// Turn a scraped link into a download URL, local file name and root dir.
pub fn archive_from_link(base: &str, link: &str, root_suffix: &str) -> RemoteArchive {
    let link = link.replace("&amp;", "&");
    let url = if link.starts_with("http://") || link.starts_with("https://") {
        link.clone()
    } else {
        format!("{base}{link}")
    };

    let path = link.split('?').next().unwrap_or(&link);
    let filename = path.rsplit('/').next().unwrap_or(path).to_string();
    let root = filename
        .split(root_suffix)
        .next()
        .unwrap_or(&filename)
        .to_string();

    RemoteArchive {
        url: url.replace(' ', "%20"),
        filename,
        root,
    }
}
