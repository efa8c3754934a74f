//! Host tools the pipeline shells out to.

use super::locate::Locator;
use super::platform::Platform;
use crate::error::Fatal;
use std::path::{Path, PathBuf};

/// A host tool resolved once at startup.
#[derive(Debug, Clone)]
pub struct ToolReference {
    /// Command name searched for.
    pub name: &'static str,
    /// Human readable name used in diagnostics.
    pub label: &'static str,
    pub path: Option<PathBuf>,
}

impl ToolReference {
    pub fn new(name: &'static str, label: &'static str, path: Option<PathBuf>) -> Self {
        Self { name, label, path }
    }

    /// The resolved path, or [`Fatal::MissingTool`] when absent.
    pub fn require(&self) -> Result<&Path, Fatal> {
        self.path.as_deref().ok_or_else(|| Fatal::MissingTool {
            tool: self.label.to_string(),
        })
    }

    pub fn is_present(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Tools {
    /// Required by configure and build.
    pub cmake: ToolReference,
    /// Optional: when present, becomes the host compiler for the LLVM build.
    pub clang: ToolReference,
    /// Located build driver. When absent the bare program name is run and
    /// left to the OS search path.
    pub driver: Option<PathBuf>,
}

impl Tools {
    pub fn new(cmake: Option<PathBuf>, clang: Option<PathBuf>) -> Self {
        Self {
            cmake: ToolReference::new("cmake", "CMake", cmake),
            clang: ToolReference::new("clang", "Clang", clang),
            driver: None,
        }
    }

    #[must_use]
    pub fn with_driver(mut self, driver: PathBuf) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn locate(locator: &Locator, platform: &Platform) -> Self {
        let cmake_defaults: Vec<PathBuf> = platform
            .cmake_locations
            .iter()
            .map(PathBuf::from)
            .collect();
        Self {
            driver: locator.locate(platform.driver.program(), &[]),
            ..Self::new(
                locator.locate("cmake", &cmake_defaults),
                locator.locate("clang", &[]),
            )
        }
    }

    /// Environment overrides for configure and build subprocesses.
    pub fn compiler_env(&self) -> Vec<(&'static str, &'static str)> {
        if self.clang.is_present() {
            vec![("CC", "clang"), ("CXX", "clang++")]
        } else {
            Vec::new()
        }
    }
}
