// src/recipe/format.rs

//! Recipe file format definitions
//!
//! Recipes are TOML files that describe a package's options, dependencies,
//! conflict rules and how resolved state maps onto build-tool arguments.

use crate::arguments::{ArgumentMapping, EnvironmentDecl, VariableDecl};
use crate::condition::Condition;
use crate::conflicts::ConflictRule;
use crate::dependencies::{Alternative, DependencyDecl};
use crate::error::Result;
use crate::options::{DeprecatedAlias, OptionDecl, OptionRegistry};
use serde::{Deserialize, Serialize};

/// A complete recipe for building a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Package metadata
    pub package: PackageSection,

    /// Primary source archive
    pub source: SourceSection,

    /// Auxiliary archives staged into the source tree
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceDecl>,

    /// Live build options
    #[serde(default, rename = "option")]
    pub options: Vec<OptionDecl>,

    /// Deprecated option names
    #[serde(default)]
    pub deprecated: Vec<DeprecatedAlias>,

    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DependencyDecl>,

    #[serde(default, rename = "conflict")]
    pub conflicts: Vec<ConflictRule>,

    /// Capability groups with competing providers
    #[serde(default, rename = "alternative")]
    pub alternatives: Vec<Alternative>,

    /// Build flag mappings
    #[serde(default, rename = "argument")]
    pub arguments: Vec<ArgumentMapping>,

    /// Conditional template variables
    #[serde(default, rename = "variable")]
    pub variables: Vec<VariableDecl>,

    /// Explicit build environment
    #[serde(default)]
    pub environment: Vec<EnvironmentDecl>,

    /// Build instructions
    #[serde(default)]
    pub build: BuildSection,
}

impl Recipe {
    /// Build the option registry for this recipe
    pub fn registry(&self) -> Result<OptionRegistry> {
        OptionRegistry::new(&self.options, &self.deprecated, &self.dependencies)
    }

    /// Substitute `%(name)s` and `%(version)s`
    pub fn substitute(&self, template: &str) -> String {
        template
            .replace("%(version)s", &self.package.version)
            .replace("%(name)s", &self.package.name)
    }

    /// Get the archive URL with variables substituted
    pub fn archive_url(&self) -> String {
        self.substitute(&self.source.archive)
    }

    /// Get the archive filename from the URL
    pub fn archive_filename(&self) -> String {
        filename_from_url(&self.archive_url(), "source.tar.gz")
    }

    /// `name-version` plus `_revision` when nonzero
    pub fn full_version(&self) -> String {
        if self.package.revision > 0 {
            format!("{}_{}", self.package.version, self.package.revision)
        } else {
            self.package.version.clone()
        }
    }
}

pub(crate) fn filename_from_url(url: &str, fallback: &str) -> String {
    url.split('/')
        .next_back()
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Package metadata section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSection {
    /// Package name
    pub name: String,

    /// Package version
    pub version: String,

    /// Packaging revision of the same upstream version
    #[serde(default)]
    pub revision: u32,

    /// Short description
    #[serde(default)]
    pub summary: Option<String>,

    /// Homepage URL
    #[serde(default)]
    pub homepage: Option<String>,

    /// License identifier (SPDX)
    #[serde(default)]
    pub license: Option<String>,

    /// Reason the package is not linked into the shared prefix
    #[serde(default)]
    pub keg_only: Option<String>,
}

/// Source archive section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSection {
    /// Primary source archive URL
    ///
    /// Supports `%(version)s` substitution.
    pub archive: String,

    /// Checksum for the archive (sha256:...)
    pub checksum: String,
}

/// Auxiliary archive (`[[resource]]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDecl {
    pub name: String,
    pub url: String,
    pub checksum: String,

    /// Directory under the source root to stage into (defaults to the name)
    #[serde(default)]
    pub stage_dir: Option<String>,

    /// Only fetched when this holds
    #[serde(default)]
    pub when: Option<Condition>,
}

impl ResourceDecl {
    pub fn stage_dir(&self) -> &str {
        self.stage_dir.as_deref().unwrap_or(&self.name)
    }
}

/// Build argument default (`[build] generator_args`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorArg {
    pub key: String,
    pub value: String,
}

/// Build instructions section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSection {
    /// Standard arguments later mappings may override
    #[serde(default)]
    pub generator_args: Vec<GeneratorArg>,

    /// Out-of-tree build directory relative to the source root
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Configure command; synthesized arguments are appended
    #[serde(default = "default_configure")]
    pub configure: Vec<String>,

    #[serde(default = "default_make")]
    pub make: Vec<String>,

    #[serde(default = "default_install")]
    pub install: Vec<String>,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            generator_args: Vec::new(),
            build_dir: default_build_dir(),
            configure: default_configure(),
            make: default_make(),
            install: default_install(),
        }
    }
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_configure() -> Vec<String> {
    vec!["cmake".to_string(), "..".to_string()]
}

fn default_make() -> Vec<String> {
    vec!["make".to_string()]
}

fn default_install() -> Vec<String> {
    vec!["make".to_string(), "install".to_string()]
}
