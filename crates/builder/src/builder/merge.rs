//! Merge the GNU Arm Embedded Toolchain into the distribution layout.
//!
//! Only what the LLVM toolchain lacks is taken: the target C library and
//! headers, the GCC runtime objects, and a set of binutils. Nothing that
//! already exists in the distribution is overwritten.

use super::layout::Layout;
use super::platform::Platform;
use anyhow::{Context, Result};
use log::{debug, warn};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Binaries copied from `bin/<triple>-<name>` to `bin/<name>`.
pub const GNU_BINARIES: &[&str] = &[
    "ar", "as", "gdb", "gdb-py", "ld", "ld.bfd", "nm", "objcopy", "objdump", "ranlib", "readelf",
    "size", "strings", "strip",
];

/// Merge an extracted GNU toolchain at `gnu_root` into `layout.dist`.
pub fn merge_gnu_toolchain(gnu_root: &Path, layout: &Layout, platform: &Platform) -> Result<()> {
    let triple = &layout.triple;
    let dist_triple = layout.dist_triple();

    for sub in ["include", "lib"] {
        let dest = dist_triple.join(sub);
        if !dest.is_dir() {
            copy_tree(&gnu_root.join(triple).join(sub), &dest)?;
        }
    }

    let lib = layout.dist.join("lib");
    if !lib.is_dir() {
        copy_tree(&gnu_root.join("lib"), &lib)?;
    }

    copy_binaries(gnu_root, layout, platform)?;
    install_runtime_objects(layout)?;
    hoist_cxx_headers(layout)?;
    Ok(())
}

fn copy_binaries(gnu_root: &Path, layout: &Layout, platform: &Platform) -> Result<()> {
    let bin = layout.dist.join("bin");
    fs::create_dir_all(&bin)?;

    for name in GNU_BINARIES {
        let src = gnu_root
            .join("bin")
            .join(platform.exe(&format!("{}-{name}", layout.triple)));
        let dst = bin.join(platform.exe(name));
        if dst.is_file() {
            continue;
        }
        if !src.is_file() {
            warn!("{} not in the GNU toolchain package, skipping", src.display());
            continue;
        }
        fs::copy(&src, &dst)
            .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    }
    Ok(())
}

/// Copy `crtbegin.o` and friends from `lib/gcc/<triple>/<version>` flat into
/// `<triple>/lib`.
fn install_runtime_objects(layout: &Layout) -> Result<()> {
    let libdest = layout.dist_triple().join("lib");
    if libdest.join("crtbegin.o").is_file() {
        return Ok(());
    }

    let gcclib = layout.dist.join("lib").join("gcc").join(&layout.triple);
    let Some(version) = pick_version(&gcclib)? else {
        warn!("No GCC runtime found under {}", gcclib.display());
        return Ok(());
    };
    copy_tree(&gcclib.join(version), &libdest)?;
    Ok(())
}

/// Move the contents of `<triple>/include/c++/<version>` up into
/// `<triple>/include/c++`.
fn hoist_cxx_headers(layout: &Layout) -> Result<()> {
    let base = layout.dist_triple().join("include").join("c++");
    if base.join("algorithm").is_file() {
        return Ok(());
    }

    let Some(version) = pick_version(&base)? else {
        warn!("No C++ standard library headers found under {}", base.display());
        return Ok(());
    };
    let versioned = base.join(version);
    move_entries(&versioned, &base)?;
    fs::remove_dir_all(&versioned)
        .with_context(|| format!("Failed to remove {}", versioned.display()))?;
    Ok(())
}

/// The highest-versioned subdirectory of `dir`, or `None` if there is none.
pub fn pick_version(dir: &Path) -> Result<Option<String>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut versions = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            versions.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    versions.sort_by(|a, b| compare_versions(a, b));

    if versions.len() > 1 {
        warn!(
            "Multiple versions under {} ({}), using the highest",
            dir.display(),
            versions.join(", ")
        );
    }
    Ok(versions.pop())
}

/// Numeric-aware ordering: `9.2.1 < 10.3.1`.
fn compare_versions(a: &str, b: &str) -> Ordering {
    fn key(s: &str) -> Vec<u64> {
        s.split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().unwrap_or(u64::MAX))
            .collect()
    }
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

/// Recursively copy `src` into `dest`, keeping files that already exist.
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to copy {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if !target.exists() {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), target.display())
            })?;
            copied += 1;
        }
    }
    debug!("copied {copied} files from {} to {}", src.display(), dest.display());
    Ok(copied)
}

/// Move every entry of `src` into `dest`; entries already in `dest` stay.
fn move_entries(src: &Path, dest: &Path) -> Result<()> {
    for entry in fs::read_dir(src).with_context(|| format!("Failed to list {}", src.display()))? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if target.exists() {
            debug!("{} already present, keeping it", target.display());
            continue;
        }
        fs::rename(entry.path(), &target)
            .with_context(|| format!("Failed to move {}", entry.path().display()))?;
    }
    Ok(())
}
