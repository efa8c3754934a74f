//! Configuration file support.
//!
//! Reads `toolchain.toml` from the project root to override the target,
//! the upstream download pages, and pinned archive checksums. Every field
//! has a default, so the file is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "toolchain.toml";

/// An upstream project: its download listing page and the substring every
/// archive link on that page contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub base: String,
    pub page: String,
    pub link_pattern: String,
}

impl Upstream {
    pub fn listing_url(&self) -> String {
        format!("{}{}", self.base, self.page)
    }
}

/// Substrings that pick each LLVM archive out of the release listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LlvmSelect {
    pub llvm: String,
    pub clang: String,
    pub lld: String,
}

impl Default for LlvmSelect {
    fn default() -> Self {
        Self {
            llvm: "llvm-".to_string(),
            clang: "cfe-".to_string(),
            lld: "lld-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct Config {
    pub triple: String,

    /// Value for `LLVM_TARGETS_TO_BUILD`.
    pub llvm_targets: String,

    /// Parallel build jobs (default: available parallelism).
    pub jobs: Option<usize>,

    pub arm: Upstream,

    pub llvm: Upstream,

    /// Read from `[llvm.select]`.
    pub llvm_select: LlvmSelect,

    /// Archive file name -> expected SHA-256.
    pub checksums: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            triple: "arm-none-eabi".to_string(),
            llvm_targets: "ARM".to_string(),
            jobs: None,
            arm: default_arm(),
            llvm: default_llvm(),
            llvm_select: LlvmSelect::default(),
            checksums: BTreeMap::new(),
        }
    }
}

/// `toolchain.toml` as written: every key optional, upstream tables partial.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    triple: Option<String>,
    llvm_targets: Option<String>,
    jobs: Option<usize>,
    arm: UpstreamFile,
    llvm: LlvmFile,
    checksums: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamFile {
    base: Option<String>,
    page: Option<String>,
    link_pattern: Option<String>,
}

impl UpstreamFile {
    fn or(self, default: Upstream) -> Upstream {
        Upstream {
            base: self.base.unwrap_or(default.base),
            page: self.page.unwrap_or(default.page),
            link_pattern: self.link_pattern.unwrap_or(default.link_pattern),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LlvmFile {
    #[serde(flatten)]
    upstream: UpstreamFile,
    select: LlvmSelect,
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            triple: file.triple.unwrap_or(defaults.triple),
            llvm_targets: file.llvm_targets.unwrap_or(defaults.llvm_targets),
            jobs: file.jobs,
            arm: file.arm.or(defaults.arm),
            llvm: file.llvm.upstream.or(defaults.llvm),
            llvm_select: file.llvm.select,
            checksums: file.checksums,
        }
    }
}

fn default_arm() -> Upstream {
    Upstream {
        base: "https://developer.arm.com".to_string(),
        page: "/open-source/gnu-toolchain/gnu-rm/downloads".to_string(),
        link_pattern: "/-/media/Files/downloads/gnu-rm/".to_string(),
    }
}

fn default_llvm() -> Upstream {
    Upstream {
        base: "http://releases.llvm.org/".to_string(),
        page: "download.html".to_string(),
        link_pattern: ".src.tar.xz".to_string(),
    }
}

impl Config {
    /// Load `explicit` if given (it must exist), else `<root>/toolchain.toml`
    /// if present, else defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = root.join(CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(cpus)
    }

    pub fn checksum(&self, filename: &str) -> Option<&str> {
        self.checksums.get(filename).map(String::as_str)
    }
}

fn cpus() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.triple, "arm-none-eabi");
        assert_eq!(config.llvm_targets, "ARM");
        assert_eq!(
            config.arm.listing_url(),
            "https://developer.arm.com/open-source/gnu-toolchain/gnu-rm/downloads"
        );
        assert_eq!(config.llvm.listing_url(), "http://releases.llvm.org/download.html");
        assert_eq!(config.llvm_select.clang, "cfe-");
        assert!(config.jobs() >= 1);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(tmp.path(), None).unwrap();
        assert_eq!(config.triple, "arm-none-eabi");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(Config::load(tmp.path(), Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
jobs = 4
llvm_targets = "ARM;AArch64"

[llvm.select]
clang = "clang-"

[checksums]
"llvm-9.0.0.src.tar.xz" = "abcd"
"#,
        )
        .unwrap();
        assert_eq!(config.jobs(), 4);
        assert_eq!(config.llvm_targets, "ARM;AArch64");
        assert_eq!(config.llvm_select.clang, "clang-");
        assert_eq!(config.llvm_select.lld, "lld-");
        assert_eq!(config.checksum("llvm-9.0.0.src.tar.xz"), Some("abcd"));
        assert_eq!(config.triple, "arm-none-eabi");
    }

    #[test]
    fn test_upstream_override_from_root_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[llvm]\nbase = \"https://mirror/\"\npage = \"list.html\"\nlink_pattern = \".tar.xz\"\n",
        )
        .unwrap();
        let config = Config::load(tmp.path(), None).unwrap();
        assert_eq!(config.llvm.listing_url(), "https://mirror/list.html");
        assert_eq!(config.arm, default_arm());
    }

    #[test]
    fn test_llvm_select_table_alone() {
        let config = Config::parse("[llvm.select]\nclang = \"clang-\"\n").unwrap();
        assert_eq!(config.llvm_select.clang, "clang-");
        assert_eq!(config.llvm_select.llvm, "llvm-");
        assert_eq!(config.llvm, default_llvm());
    }

    #[test]
    fn test_partial_upstream_keeps_other_fields() {
        let config = Config::parse(
            "[arm]\nbase = \"https://mirror.example\"\n\n[llvm]\npage = \"releases.html\"\n\n[llvm.select]\nlld = \"lld-src-\"\n",
        )
        .unwrap();
        assert_eq!(config.arm.base, "https://mirror.example");
        assert_eq!(config.arm.page, default_arm().page);
        assert_eq!(config.llvm.listing_url(), "http://releases.llvm.org/releases.html");
        assert_eq!(config.llvm_select.lld, "lld-src-");
        assert_eq!(config.llvm_select.clang, "cfe-");
    }
}
