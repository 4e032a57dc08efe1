// src/dependencies/locator.rs

//! Dependency Locator: where an installed dependency lives

use crate::error::NotInstalledError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Install location of a dependency
///
/// Any of the paths may be absent; a template that needs a missing path
/// fails synthesis with a dependency resolution error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLocation {
    #[serde(default)]
    pub prefix: Option<PathBuf>,
    #[serde(default)]
    pub include: Option<PathBuf>,
    #[serde(default)]
    pub lib: Option<PathBuf>,
    #[serde(default)]
    pub bin: Option<PathBuf>,
}

impl DependencyLocation {
    /// Standard `include`, `lib` and `bin` layout under a prefix
    pub fn under_prefix(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        Self {
            include: Some(prefix.join("include")),
            lib: Some(prefix.join("lib")),
            bin: Some(prefix.join("bin")),
            prefix: Some(prefix),
        }
    }
}

/// Finds installed dependencies
pub trait DependencyLocator {
    fn locate(&self, name: &str) -> Result<DependencyLocation, NotInstalledError>;
}

/// Keg-style lookup: each dependency lives at `<root>/opt/<name>`
///
/// Only subdirectories that exist are reported.
#[derive(Debug, Clone)]
pub struct PrefixLocator {
    root: PathBuf,
}

impl PrefixLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DependencyLocator for PrefixLocator {
    fn locate(&self, name: &str) -> Result<DependencyLocation, NotInstalledError> {
        let prefix = self.root.join("opt").join(name);
        if !prefix.is_dir() {
            debug!("{} not found at {}", name, prefix.display());
            return Err(NotInstalledError::new(name));
        }

        let existing = |sub: &str| {
            let path = prefix.join(sub);
            path.is_dir().then_some(path)
        };
        Ok(DependencyLocation {
            include: existing("include"),
            lib: existing("lib"),
            bin: existing("bin"),
            prefix: Some(prefix),
        })
    }
}

/// Fixed table of locations, typically from the settings file
#[derive(Debug, Clone, Default)]
pub struct MapLocator {
    locations: HashMap<String, DependencyLocation>,
}

impl MapLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, location: DependencyLocation) {
        self.locations.insert(name.into(), location);
    }

    pub fn with(mut self, name: impl Into<String>, location: DependencyLocation) -> Self {
        self.insert(name, location);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl FromIterator<(String, DependencyLocation)> for MapLocator {
    fn from_iter<I: IntoIterator<Item = (String, DependencyLocation)>>(iter: I) -> Self {
        Self {
            locations: iter.into_iter().collect(),
        }
    }
}

impl DependencyLocator for MapLocator {
    fn locate(&self, name: &str) -> Result<DependencyLocation, NotInstalledError> {
        self.locations
            .get(name)
            .cloned()
            .ok_or_else(|| NotInstalledError::new(name))
    }
}

/// Tries each locator in turn
#[derive(Default)]
pub struct ChainLocator {
    locators: Vec<Box<dyn DependencyLocator>>,
}

impl ChainLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, locator: impl DependencyLocator + 'static) -> Self {
        self.locators.push(Box::new(locator));
        self
    }
}

impl DependencyLocator for ChainLocator {
    fn locate(&self, name: &str) -> Result<DependencyLocation, NotInstalledError> {
        self.locators
            .iter()
            .find_map(|l| l.locate(name).ok())
            .ok_or_else(|| NotInstalledError::new(name))
    }
}
