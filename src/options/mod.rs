// src/options/mod.rs

//! Option Registry: the build options a recipe recognizes
//!
//! Options come from two places: explicit `[[option]]` entries and
//! implicit options created by recommended or optional dependencies (a
//! recommended `eigen` dependency registers an `eigen` option that is on
//! by default). Deprecated aliases are kept in a separate table and
//! always point at exactly one live option.

mod resolve;

pub use resolve::{
    Overrides, Resolution, ResolutionWarning, ResolvedConfiguration, ResolvedOption, ValueSource,
};

use crate::condition::Condition;
use crate::dependencies::{DependencyDecl, RequirementKind};
use crate::error::{ConfigurationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum_macros::{Display, EnumString};

/// Default state of an option before user overrides
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DefaultState {
    On,
    Recommended,
    #[default]
    Optional,
    Off,
}

impl DefaultState {
    /// On and recommended options start enabled
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::On | Self::Recommended)
    }
}

impl From<RequirementKind> for DefaultState {
    fn from(kind: RequirementKind) -> Self {
        match kind {
            RequirementKind::Always => Self::On,
            RequirementKind::Recommended => Self::Recommended,
            RequirementKind::Optional => Self::Optional,
        }
    }
}

/// Shape of a live option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum OptionKind {
    /// Boolean toggle
    Flag,
    /// One value out of a declared set
    Choice,
}

/// Value a user (or the resolver) assigns to an option
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Choice(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Choice(_) => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Choice(c) => Some(c),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "on"),
            Self::Bool(false) => write!(f, "off"),
            Self::Choice(c) => write!(f, "{}", c),
        }
    }
}

/// A live option declaration (`[[option]]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDecl {
    /// Option identifier, e.g. `contrib`
    pub id: String,

    /// One-line help text
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub default: DefaultState,

    /// Platforms where the option is meaningful (platform-only predicate)
    #[serde(default)]
    pub platform: Option<Condition>,

    /// Value forced when `platform` does not hold
    #[serde(default, rename = "unavailable")]
    pub when_unavailable: bool,

    /// Allowed values; a non-empty list makes this an enum option
    #[serde(default)]
    pub choices: Vec<String>,

    /// Default for enum options (first choice when unset)
    #[serde(default)]
    pub default_choice: Option<String>,
}

impl OptionDecl {
    /// Create a boolean option
    pub fn flag(id: impl Into<String>, default: DefaultState) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            default,
            platform: None,
            when_unavailable: false,
            choices: Vec::new(),
            default_choice: None,
        }
    }

    pub fn kind(&self) -> OptionKind {
        if self.choices.is_empty() {
            OptionKind::Flag
        } else {
            OptionKind::Choice
        }
    }

    /// Value before overrides and platform gating
    pub fn default_value(&self) -> OptionValue {
        match self.kind() {
            OptionKind::Flag => OptionValue::Bool(self.default.is_enabled()),
            OptionKind::Choice => OptionValue::Choice(
                self.default_choice
                    .clone()
                    .or_else(|| self.choices.first().cloned())
                    .unwrap_or_default(),
            ),
        }
    }

    /// Value forced on platforms where the option is unavailable
    pub fn unavailable_value(&self) -> OptionValue {
        match self.kind() {
            OptionKind::Flag => OptionValue::Bool(self.when_unavailable),
            OptionKind::Choice => self.default_value(),
        }
    }

    /// Check that a user value fits this option
    pub fn check_value(&self, value: &OptionValue) -> std::result::Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidValue {
            option: self.id.clone(),
            value: value.to_string(),
            reason,
        };

        match (self.kind(), value) {
            (OptionKind::Flag, OptionValue::Bool(_)) => Ok(()),
            (OptionKind::Flag, OptionValue::Choice(_)) => {
                Err(invalid("option is a flag, expected on/off".to_string()))
            }
            (OptionKind::Choice, OptionValue::Bool(_)) => Err(invalid(format!(
                "expected one of: {}",
                self.choices.join(", ")
            ))),
            (OptionKind::Choice, OptionValue::Choice(c)) => {
                if self.choices.contains(c) {
                    Ok(())
                } else {
                    Err(invalid(format!("expected one of: {}", self.choices.join(", "))))
                }
            }
        }
    }
}

/// A deprecated option name (`[[deprecated]]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecatedAlias {
    pub alias: String,
    pub superseded_by: String,
}

/// Result of looking up an id in the registry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegistryEntry<'a> {
    Live(&'a OptionDecl),
    Alias {
        alias: &'a str,
        target: &'a OptionDecl,
    },
}

/// All options of one recipe, in declaration order
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    options: Vec<OptionDecl>,
    index: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl OptionRegistry {
    /// Build a registry, checking the id and alias invariants
    ///
    /// Implicit options for recommended/optional dependencies are appended
    /// after the explicit options, in dependency declaration order.
    pub fn new(
        explicit: &[OptionDecl],
        deprecated: &[DeprecatedAlias],
        dependencies: &[DependencyDecl],
    ) -> Result<Self> {
        let mut registry = Self::default();

        for decl in explicit {
            if registry.index.contains_key(&decl.id) {
                return Err(ConfigurationError::DuplicateOption(decl.id.clone()).into());
            }
            if let Some(default) = &decl.default_choice
                && !decl.choices.contains(default)
            {
                return Err(ConfigurationError::InvalidValue {
                    option: decl.id.clone(),
                    value: default.clone(),
                    reason: "default_choice is not one of the declared choices".to_string(),
                }
                .into());
            }
            registry.push(decl.clone());
        }

        for dep in dependencies {
            let Some(option) = dep.gating_option() else {
                continue;
            };
            if registry.index.contains_key(option) {
                continue;
            }
            let mut decl = OptionDecl::flag(option, dep.kind.into());
            decl.description = format!("Build with {} support", dep.name);
            registry.push(decl);
        }

        for entry in deprecated {
            if registry.index.contains_key(&entry.alias) {
                return Err(ConfigurationError::Invalid(format!(
                    "deprecated option '{}' shadows a live option",
                    entry.alias
                ))
                .into());
            }
            if registry.aliases.contains_key(&entry.alias) {
                return Err(ConfigurationError::DuplicateOption(entry.alias.clone()).into());
            }
            if !registry.index.contains_key(&entry.superseded_by) {
                return Err(ConfigurationError::DanglingAlias {
                    alias: entry.alias.clone(),
                    target: entry.superseded_by.clone(),
                }
                .into());
            }
            registry
                .aliases
                .insert(entry.alias.clone(), entry.superseded_by.clone());
        }

        Ok(registry)
    }

    fn push(&mut self, decl: OptionDecl) {
        self.index.insert(decl.id.clone(), self.options.len());
        self.options.push(decl);
    }

    /// Live options in declaration order
    pub fn options(&self) -> &[OptionDecl] {
        &self.options
    }

    /// Live option by id
    pub fn get(&self, id: &str) -> Option<&OptionDecl> {
        self.index.get(id).map(|&i| &self.options[i])
    }

    /// Declaration position of a live option
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Live option or deprecated alias by id
    pub fn lookup(&self, id: &str) -> Option<RegistryEntry<'_>> {
        if let Some(decl) = self.get(id) {
            return Some(RegistryEntry::Live(decl));
        }
        let (alias, target) = self.aliases.get_key_value(id)?;
        let target = self.get(target)?;
        Some(RegistryEntry::Alias { alias, target })
    }

    /// Whether `id` names a live option
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Deprecated aliases as (alias, superseded_by), sorted by alias
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .map(|(a, t)| (a.as_str(), t.as_str()))
            .collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
