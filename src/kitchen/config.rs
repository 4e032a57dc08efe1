// src/kitchen/config.rs

//! Configuration types for the Kitchen

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the Kitchen
#[derive(Debug, Clone, PartialEq)]
pub struct KitchenConfig {
    /// Directory for downloaded sources
    pub source_cache: PathBuf,
    /// Root under which packages are installed (`<root>/<name>/<version>`)
    pub install_root: PathBuf,
    /// Timeout for each build tool phase
    pub timeout: Duration,
    /// Number of parallel jobs
    pub jobs: u32,
    /// Keep build directory after completion (for debugging)
    pub keep_builddir: bool,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        let jobs = std::thread::available_parallelism()
            .map(|p| p.get() as u32)
            .unwrap_or(4);

        let cache = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        let data = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);

        Self {
            source_cache: cache.join("pantry").join("sources"),
            install_root: data.join("pantry").join("cellar"),
            timeout: Duration::from_secs(3600), // 1 hour
            jobs,
            keep_builddir: false,
        }
    }
}

impl KitchenConfig {
    /// Installation prefix for one package version
    pub fn install_prefix(&self, name: &str, version: &str) -> PathBuf {
        self.install_root.join(name).join(version)
    }
}

/// Result of cooking a plan
#[derive(Debug)]
pub struct CookResult {
    /// Where the package was installed
    pub install_prefix: PathBuf,
    /// Build directory, if it was kept
    pub build_dir: Option<PathBuf>,
    /// Rendered cmake arguments that were passed to configure
    pub arguments: Vec<String>,
    /// Build log
    pub log: String,
    /// Warnings generated during build
    pub warnings: Vec<String>,
}
