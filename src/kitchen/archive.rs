// src/kitchen/archive.rs

//! Archive and source file utilities for the Kitchen

use crate::dependencies::SourceEdit;
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Retrieves and verifies source archives
pub trait ResourceFetcher {
    /// Return a local path holding the archive at `url`, verified against `checksum`
    fn fetch(&self, url: &str, checksum: &str) -> Result<PathBuf>;
}

/// Downloads with curl into a checksum-keyed cache
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    cache: PathBuf,
}

impl CurlFetcher {
    pub fn new(cache: impl Into<PathBuf>) -> Self {
        Self {
            cache: cache.into(),
        }
    }

    /// Cache path for a checksum
    pub fn cached_path(&self, checksum: &str) -> PathBuf {
        self.cache.join(checksum.replace(':', "_"))
    }
}

impl ResourceFetcher for CurlFetcher {
    fn fetch(&self, url: &str, checksum: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache)?;

        let cached_path = self.cached_path(checksum);

        if cached_path.exists() {
            debug!("Using cached source: {}", cached_path.display());
            if verify_file_checksum(&cached_path, checksum).is_ok() {
                return Ok(cached_path);
            }
            warn!("Cached file checksum mismatch, re-downloading");
            fs::remove_file(&cached_path)?;
        }

        info!("Downloading: {}", url);
        let temp_path = cached_path.with_extension("tmp");

        download_file(url, &temp_path)?;

        if let Err(e) = verify_file_checksum(&temp_path, checksum) {
            fs::remove_file(&temp_path)?;
            return Err(e);
        }

        fs::rename(&temp_path, &cached_path)?;
        Ok(cached_path)
    }
}

/// Download a file from a URL
pub fn download_file(url: &str, dest: &Path) -> Result<()> {
    let curl = which::which("curl")
        .map_err(|e| Error::DownloadError(format!("curl not found: {}", e)))?;

    let output = Command::new(curl)
        .arg("-fsSL")
        .arg("-o")
        .arg(dest)
        .arg(url)
        .output()
        .map_err(|e| Error::DownloadError(format!("curl failed: {}", e)))?;

    if !output.status.success() {
        return Err(Error::DownloadError(format!(
            "Failed to download {}: {}",
            url,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(())
}

/// SHA-256 of a file as lowercase hex
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a file against a `sha256:<hex>` checksum
pub fn verify_file_checksum(path: &Path, expected: &str) -> Result<()> {
    let (algorithm, expected_hash) = expected
        .split_once(':')
        .ok_or_else(|| Error::ParseError("Invalid checksum format".to_string()))?;

    if algorithm != "sha256" {
        return Err(Error::ParseError(format!(
            "Unsupported checksum algorithm: {} (supported: sha256)",
            algorithm
        )));
    }

    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected_hash) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual: format!("sha256:{}", actual),
        })
    }
}

/// Extract an archive to a destination directory
///
/// Supports: .tar.gz, .tgz, .tar.xz, .txz, .tar.bz2, .tbz2, .tar
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let flags = if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        "-xzf"
    } else if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
        "-xJf"
    } else if filename.ends_with(".tar.bz2") || filename.ends_with(".tbz2") {
        "-xjf"
    } else if filename.ends_with(".tar") {
        "-xf"
    } else {
        return Err(Error::ParseError(format!(
            "Unknown archive format: {}",
            filename
        )));
    };

    let output = Command::new("tar")
        .arg(flags)
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .output()
        .map_err(|e| Error::IoError(format!("tar failed: {}", e)))?;

    if !output.status.success() {
        return Err(Error::IoError(format!(
            "Failed to extract archive: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    Ok(())
}

/// The single top-level directory of an unpacked archive, or `dir` itself
pub fn unpacked_root(dir: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();

    if entries.len() == 1 && entries[0].file_type().map(|t| t.is_dir()).unwrap_or(false) {
        return Ok(entries[0].path());
    }
    Ok(dir.to_path_buf())
}

/// Replace text in a source file; a missing match is an error
pub fn apply_edit(source_dir: &Path, edit: &SourceEdit) -> Result<()> {
    let path = source_dir.join(&edit.file);
    let content = fs::read_to_string(&path)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

    if !content.contains(&edit.from) {
        return Err(Error::NotFound(format!(
            "'{}' not found in {}",
            edit.from, edit.file
        )));
    }

    fs::write(&path, content.replace(&edit.from, &edit.to))?;
    Ok(())
}
