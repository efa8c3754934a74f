//! Listing-page link scraping and archive downloads.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Read size used when streaming downloads to disk.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A source of byte streams addressed by URL.
pub trait Fetch {
    /// Open a blocking stream over the body at `url`.
    fn open(&self, url: &str) -> Result<Box<dyn Read>>;
}

/// HTTP(S) fetcher. No request timeout: toolchain archives are large.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("toolchain-builder/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn open(&self, url: &str) -> Result<Box<dyn Read>> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("Failed to fetch {url}"))?;
        Ok(Box::new(response))
    }
}

/// Fetch `url` and return the quoted link targets containing `pattern`.
pub fn scrape_links(fetch: &dyn Fetch, url: &str, pattern: &str) -> Result<Vec<String>> {
    let mut reader = BufReader::new(fetch.open(url)?);
    let mut links = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("Failed to read {url}"))?;
        if n == 0 {
            break;
        }
        if let Some(link) = link_in_line(&String::from_utf8_lossy(&line), pattern) {
            links.push(link);
        }
    }
    debug!("{} links matching '{pattern}' on {url}", links.len());
    Ok(links)
}

/// Line-by-line scrape of `text`; see [`scrape_links`].
pub fn parse_links(text: &str, pattern: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| link_in_line(line, pattern))
        .collect()
}

/// The text between the quotes surrounding the first `pattern` in `line`.
/// A missing quote on either side extends the link to that end of the line.
fn link_in_line(line: &str, pattern: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let pos = line.find(pattern)?;
    let start = line[..pos].rfind('"').map_or(0, |q| q + 1);
    let end = line[pos..].find('"').map_or(line.len(), |q| pos + q);
    Some(line[start..end].to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Download {
    Fetched,
    Cached,
}

/// Make sure `dest` holds the body of `url`.
///
/// An existing file is kept when it matches `expected_sha256`, or failing
/// that its recorded `.sha256` sidecar, or when no digest is known at all.
/// New downloads land in `<dest>.part` and are renamed once complete.
pub fn download_file(
    fetch: &dyn Fetch,
    url: &str,
    dest: &Path,
    expected_sha256: Option<&str>,
) -> Result<Download> {
    let name = dest
        .file_name()
        .map_or_else(|| dest.display().to_string(), |n| n.to_string_lossy().into_owned());

    if dest.is_file() {
        match cached_is_valid(dest, expected_sha256)? {
            Some(false) => warn!("{name} does not match its checksum, downloading again"),
            Some(true) | None => return Ok(Download::Cached),
        }
    }

    println!("  > Downloading \"{name}\"...");
    let part = with_suffix(dest, ".part");
    let digest = stream_to_file(fetch, url, &part)?;

    if let Some(expected) = expected_sha256 {
        if !digest.eq_ignore_ascii_case(expected) {
            fs::remove_file(&part)?;
            bail!("Checksum mismatch for {name}: expected {expected}, got {digest}");
        }
    }

    fs::rename(&part, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;
    fs::write(sidecar_path(dest), format!("{digest}\n"))?;
    Ok(Download::Fetched)
}

/// Copy `url` into `dest` in fixed-size chunks, returning the SHA-256.
fn stream_to_file(fetch: &dyn Fetch, url: &str, dest: &Path) -> Result<String> {
    let mut reader = fetch.open(url)?;
    let mut file =
        File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).with_context(|| format!("Failed to read {url}")),
        };
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n])
            .with_context(|| format!("Failed to write {}", dest.display()))?;
    }
    file.sync_all()?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// `None` when there is nothing to check against.
fn cached_is_valid(path: &Path, expected: Option<&str>) -> Result<Option<bool>> {
    let recorded;
    let expected = match expected {
        Some(e) => e,
        None => {
            let sidecar = sidecar_path(path);
            if !sidecar.is_file() {
                return Ok(None);
            }
            recorded = fs::read_to_string(&sidecar)?;
            recorded.trim()
        }
    };
    let actual = file_sha256(path)?;
    debug!("{}: sha256 {actual}", path.display());
    Ok(Some(actual.eq_ignore_ascii_case(expected)))
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn sidecar_path(path: &Path) -> PathBuf {
    with_suffix(path, ".sha256")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}
