// src/config.rs

//! User settings (`~/.config/pantry/config.toml`)
//!
//! ```toml
//! prefix_root = "/usr/local"
//!
//! [options]
//! qt = true
//! cuda-generation = "Kepler"
//!
//! [kitchen]
//! jobs = 8
//! timeout_secs = 7200
//!
//! [locations.python]
//! prefix = "/usr"
//! include = "/usr/include"
//! lib = "/usr/lib/x86_64-linux-gnu"
//! bin = "/usr/bin"
//! ```
//!
//! Option overrides here are applied before command-line flags, so the
//! command line always wins.

use crate::dependencies::{ChainLocator, DependencyLocation, MapLocator, PrefixLocator};
use crate::error::{Error, Result};
use crate::kitchen::KitchenConfig;
use crate::options::Overrides;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default root for keg-style dependency lookup
pub const DEFAULT_PREFIX_ROOT: &str = "/usr/local";

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Default option overrides
    pub options: Overrides,

    /// Root whose `opt/<name>` directories hold installed dependencies
    pub prefix_root: Option<PathBuf>,

    /// Explicit dependency locations, consulted before `prefix_root`
    pub locations: BTreeMap<String, DependencyLocation>,

    pub kitchen: KitchenSettings,
}

/// `[kitchen]` overrides of the built-in kitchen defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KitchenSettings {
    pub source_cache: Option<PathBuf>,
    pub install_root: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub jobs: Option<u32>,
    pub keep_builddir: Option<bool>,
}

impl Settings {
    /// `<config dir>/pantry/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("pantry").join("config.toml"))
    }

    /// Parse settings from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid settings: {}", e)))
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read settings {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load an explicit settings file, or the default one if it exists
    ///
    /// A missing explicit file is an error; a missing default file is not.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("Loading settings from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Kitchen configuration with these settings applied
    pub fn kitchen_config(&self) -> KitchenConfig {
        let mut config = KitchenConfig::default();
        let k = &self.kitchen;
        if let Some(cache) = &k.source_cache {
            config.source_cache = cache.clone();
        }
        if let Some(root) = &k.install_root {
            config.install_root = root.clone();
        }
        if let Some(secs) = k.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(jobs) = k.jobs {
            config.jobs = jobs.max(1);
        }
        if let Some(keep) = k.keep_builddir {
            config.keep_builddir = keep;
        }
        config
    }

    pub fn prefix_root(&self) -> &Path {
        self.prefix_root
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_PREFIX_ROOT))
    }

    /// Explicit locations first, then `<prefix_root>/opt/<name>`
    pub fn locator(&self) -> ChainLocator {
        let explicit: MapLocator = self
            .locations
            .iter()
            .map(|(name, location)| (name.clone(), location.clone()))
            .collect();
        ChainLocator::new()
            .push(explicit)
            .push(PrefixLocator::new(self.prefix_root()))
    }
}
