//! Compressing version directories into single packages and back.

use crate::ArchiveResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Compression used for version packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl From<Compression> for CompressionMethod {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        }
    }
}

/// Packs a version directory into one file and unpacks it again.
///
/// Methods are blocking; the store calls them from `spawn_blocking`.
pub trait Packager: Send + Sync {
    fn pack(&self, source_dir: &Path, package: &Path) -> ArchiveResult<()>;

    fn unpack(&self, package: &Path, dest_dir: &Path) -> ArchiveResult<()>;
}

/// Zip implementation of [`Packager`].
#[derive(Debug, Clone, Default)]
pub struct ZipPackager {
    compression: Compression,
}

impl ZipPackager {
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    fn write_zip(&self, source_dir: &Path, package: &Path) -> ArchiveResult<()> {
        let file = File::create(package)?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(self.compression.into());

        for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type().is_dir() {
                writer.add_directory(format!("{name}/"), options)?;
            } else {
                writer.start_file(name, options)?;
                let mut source = File::open(entry.path())?;
                io::copy(&mut source, &mut writer)?;
            }
        }

        writer.finish()?;
        Ok(())
    }
}

impl Packager for ZipPackager {
    fn pack(&self, source_dir: &Path, package: &Path) -> ArchiveResult<()> {
        if let Some(parent) = package.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let result = self.write_zip(source_dir, package);
        if result.is_err() {
            // A half-written package must not be picked up as a version.
            let _ = std::fs::remove_file(package);
        }
        result
    }

    fn unpack(&self, package: &Path, dest_dir: &Path) -> ArchiveResult<()> {
        std::fs::create_dir_all(dest_dir)?;
        let mut archive = ZipArchive::new(File::open(package)?)?;
        archive.extract(dest_dir)?;
        Ok(())
    }
}
