//! Archive extraction (zip and the tar family).

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

/// Longest suffixes first so `.tar.gz` is not taken for `.gz`.
const SUFFIXES: &[(&str, ArchiveKind)] = &[
    (".tar.bz2", ArchiveKind::TarBz2),
    (".tar.gz", ArchiveKind::TarGz),
    (".tar.xz", ArchiveKind::TarXz),
    (".tgz", ArchiveKind::TarGz),
    (".tar", ArchiveKind::Tar),
    (".zip", ArchiveKind::Zip),
];

impl ArchiveKind {
    /// Archive kind from the file name suffix.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, kind)| *kind)
    }
}

/// Extract every entry of `archive` below `dest`.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let kind = ArchiveKind::from_path(archive)
        .with_context(|| format!("Unsupported archive format: {}", archive.display()))?;
    log::debug!("extracting {} ({kind:?}) into {}", archive.display(), dest.display());

    fs::create_dir_all(dest)?;
    let file =
        File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;

    match kind {
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(file)
                .with_context(|| format!("Failed to read {}", archive.display()))?;
            zip.extract(dest)
                .with_context(|| format!("Failed to extract {}", archive.display()))?;
        }
        ArchiveKind::Tar => unpack_tar(BufReader::new(file), archive, dest)?,
        ArchiveKind::TarGz => {
            unpack_tar(flate2::read::GzDecoder::new(BufReader::new(file)), archive, dest)?;
        }
        ArchiveKind::TarBz2 => {
            unpack_tar(bzip2::read::MultiBzDecoder::new(BufReader::new(file)), archive, dest)?;
        }
        ArchiveKind::TarXz => {
            unpack_tar(
                xz2::read::XzDecoder::new_multi_decoder(BufReader::new(file)),
                archive,
                dest,
            )?;
        }
    }
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<()> {
    let mut tar = tar::Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.unpack(dest)
        .with_context(|| format!("Failed to extract {}", archive.display()))
}
