// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use pantry::dependencies::{DependencyLocation, DependencyLocator, MapLocator};
use pantry::error::NotInstalledError;
use pantry::options::Overrides;
use pantry::platform::{OsVersion, PlatformInfo};
use pantry::recipe::{builtin_recipe, Recipe};
use std::cell::RefCell;

/// Locator that records every lookup before delegating
pub struct CountingLocator {
    inner: MapLocator,
    calls: RefCell<Vec<String>>,
}

impl CountingLocator {
    pub fn new(inner: MapLocator) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl DependencyLocator for CountingLocator {
    fn locate(&self, name: &str) -> Result<DependencyLocation, NotInstalledError> {
        self.calls.borrow_mut().push(name.to_string());
        self.inner.locate(name)
    }
}

/// Every dependency opencv may need to locate, under `/opt/<name>`
pub fn opencv_locator() -> MapLocator {
    ["jpeg", "jpeg-turbo", "python", "python3", "openni", "openni2"]
        .into_iter()
        .map(|name| {
            (
                name.to_string(),
                DependencyLocation::under_prefix(format!("/opt/{}", name)),
            )
        })
        .collect()
}

pub fn opencv() -> Recipe {
    builtin_recipe("opencv").unwrap()
}

/// Overrides from Homebrew-style flags
pub fn flags(list: &[&str]) -> Overrides {
    let mut overrides = Overrides::new();
    for flag in list {
        overrides.apply_flag(flag).unwrap();
    }
    overrides
}

pub fn high_sierra() -> PlatformInfo {
    PlatformInfo::macos(OsVersion::new(10, 13)).with_toolchain_version(1000)
}

/// `-DKEY=VALUE` strings as owned values for comparisons
pub fn cmake_args(pairs: &[(&str, &str)]) -> Vec<String> {
    pairs
        .iter()
        .map(|(k, v)| format!("-D{}={}", k, v))
        .collect()
}
