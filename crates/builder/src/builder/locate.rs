//! Executable lookup on the host search path.
//!
//! Not the `which` crate: lookup here also has to return a name that is
//! already an executable path verbatim, search `.` first on Windows, dedupe
//! directories after case normalization, and fall back to install locations
//! off the search path.

use super::platform::Platform;
use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Searches for executables the way a shell would, with extra fallback
/// directories for tools that are commonly installed off `PATH`.
#[derive(Debug, Clone)]
pub struct Locator {
    search_path: OsString,
    windows: bool,
    pathext: Vec<String>,
}

impl Locator {
    /// Locator over the process environment (`PATH`, and `PATHEXT` on Windows).
    pub fn from_env(platform: &Platform) -> Self {
        let locator = Self::new(env::var_os("PATH").unwrap_or_default());
        if platform.is_windows() {
            locator.windows(&env::var("PATHEXT").unwrap_or_default())
        } else {
            locator
        }
    }

    /// Locator over an explicit search path, with POSIX lookup rules.
    pub fn new(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: search_path.into(),
            windows: false,
            pathext: Vec::new(),
        }
    }

    /// Switch to Windows lookup rules: the current directory is searched
    /// first and bare names are expanded with the `;`-separated `pathext`.
    #[must_use]
    pub fn windows(mut self, pathext: &str) -> Self {
        self.windows = true;
        self.pathext = pathext
            .split(';')
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Find `cmd`, returning the first matching executable.
    ///
    /// A `cmd` that already names an executable file is returned verbatim.
    /// `defaults` are searched after the search path.
    pub fn locate(&self, cmd: &str, defaults: &[PathBuf]) -> Option<PathBuf> {
        let direct = Path::new(cmd);
        if is_executable(direct) {
            return Some(direct.to_path_buf());
        }

        let mut dirs: Vec<PathBuf> = env::split_paths(&self.search_path)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect();
        if self.windows {
            let cur = PathBuf::from(".");
            if !dirs.contains(&cur) {
                dirs.insert(0, cur);
            }
        }
        dirs.extend(defaults.iter().cloned());

        let names = self.candidate_names(cmd);
        let mut seen = HashSet::new();
        for dir in dirs {
            if !seen.insert(self.normcase(&dir)) {
                continue;
            }
            for name in &names {
                let path = dir.join(name);
                if is_executable(&path) {
                    log::debug!("located {cmd} at {}", path.display());
                    return Some(path);
                }
            }
        }

        log::debug!("{cmd} not found");
        None
    }

    fn candidate_names(&self, cmd: &str) -> Vec<String> {
        if !self.windows || self.pathext.is_empty() {
            return vec![cmd.to_string()];
        }
        let lower = cmd.to_lowercase();
        if self
            .pathext
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
        {
            return vec![cmd.to_string()];
        }
        self.pathext
            .iter()
            .map(|ext| format!("{cmd}{}", ext.to_lowercase()))
            .collect()
    }

    fn normcase(&self, dir: &Path) -> String {
        let s = dir.to_string_lossy();
        if self.windows {
            s.to_lowercase().replace('/', "\\")
        } else {
            s.into_owned()
        }
    }
}

/// Exists, is not a directory, and (on Unix) carries an execute bit.
fn is_executable(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if meta.is_dir() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
