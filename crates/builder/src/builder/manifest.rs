//! Resolved archive record (`work/manifest.json`).

use super::sources::{Component, RemoteArchive};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// When the listing pages were last scraped (RFC 3339).
    pub resolved_at: Option<String>,
    pub components: BTreeMap<Component, RemoteArchive>,
}

impl Manifest {
    /// Load the manifest, or an empty one if it does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn touch(&mut self) {
        self.resolved_at = Some(chrono::Utc::now().to_rfc3339());
    }
}
