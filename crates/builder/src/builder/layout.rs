//! On-disk layout of a build tree.
//!
//! ```text
//! <root>/work/src     extracted sources
//! <root>/work/dl      downloaded archives
//! <root>/work/manifest.json
//! <root>/work/build   CMake build directories
//! <root>/dist/<triple>-llvm-<platform>/{bin,lib,<triple>/include,<triple>/lib}
//! ```

use super::manifest::MANIFEST_FILE;
use super::platform::Platform;
use std::path::{Path, PathBuf};

pub const WORK_DIR: &str = "work";
pub const DIST_DIR: &str = "dist";

/// Marker CMake leaves in a configured build directory.
pub const CONFIGURED_MARKER: &str = "CMakeFiles";

#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub work: PathBuf,
    pub src: PathBuf,
    pub dl: PathBuf,
    pub build: PathBuf,
    pub dist: PathBuf,
    pub triple: String,
}

impl Layout {
    pub fn new(root: &Path, triple: &str, platform: &Platform) -> Self {
        let work = root.join(WORK_DIR);
        Self {
            root: root.to_path_buf(),
            src: work.join("src"),
            dl: work.join("dl"),
            build: work.join("build"),
            work,
            dist: root
                .join(DIST_DIR)
                .join(format!("{triple}-llvm-{}", platform.name)),
            triple: triple.to_string(),
        }
    }

    pub fn manifest(&self) -> PathBuf {
        self.work.join(MANIFEST_FILE)
    }

    pub fn download(&self, filename: &str) -> PathBuf {
        self.dl.join(filename)
    }

    /// `<dist>/<triple>`
    pub fn dist_triple(&self) -> PathBuf {
        self.dist.join(&self.triple)
    }

    pub fn build_dir(&self, source_root: &str) -> PathBuf {
        self.build.join(source_root)
    }
}

pub fn is_configured(build_dir: &Path) -> bool {
    build_dir.join(CONFIGURED_MARKER).is_dir()
}
