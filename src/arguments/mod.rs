// src/arguments/mod.rs

//! Build-tool arguments and the Argument Synthesizer
//!
//! An `ArgumentList` is the final, ordered output handed to the build
//! tool invoker: `KEY=VALUE` arguments, the explicit build environment
//! and any in-place source edits. It never holds two values for one key.

mod synthesize;

pub use synthesize::{synthesize, TemplateError, expand_template};

use crate::condition::{Condition, OptionLookup};
use crate::dependencies::SourceEdit;
use crate::error::{ConfigurationError, ConflictError};
use crate::options::ResolvedConfiguration;
use crate::platform::PlatformInfo;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Placeholder for the unpacked source root, rendered by the kitchen
pub const BUILDPATH_VAR: &str = "%(buildpath)s";

/// Placeholder for the installation prefix, rendered by the kitchen
pub const INSTALL_PREFIX_VAR: &str = "%(install_prefix)s";

/// How a mapping produces its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingForm<'a> {
    /// `ON` when the option is enabled, `OFF` otherwise
    Switch(&'a str),
    /// `OFF` when the option is enabled, `ON` otherwise
    Invert(&'a str),
    /// The enum option's selected value
    Choice(&'a str),
    /// Fixed template
    Fixed(&'a str),
}

/// A `[[argument]]` mapping from resolved state to a build flag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArgumentMapping {
    pub key: String,

    #[serde(default)]
    pub switch: Option<String>,

    #[serde(default)]
    pub invert: Option<String>,

    #[serde(default)]
    pub choice: Option<String>,

    #[serde(default)]
    pub value: Option<String>,

    /// Owning option of a fixed-value mapping
    #[serde(default)]
    pub option: Option<String>,

    #[serde(default)]
    pub when: Option<Condition>,

    #[serde(default)]
    pub platform: Option<Condition>,
}

impl ArgumentMapping {
    pub fn switch(key: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            switch: Some(option.into()),
            ..Self::default()
        }
    }

    pub fn invert(key: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            invert: Some(option.into()),
            ..Self::default()
        }
    }

    pub fn fixed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// The single value form of this mapping
    pub fn form(&self) -> Result<MappingForm<'_>, ConfigurationError> {
        let forms = [
            self.switch.as_deref().map(MappingForm::Switch),
            self.invert.as_deref().map(MappingForm::Invert),
            self.choice.as_deref().map(MappingForm::Choice),
            self.value.as_deref().map(MappingForm::Fixed),
        ];
        let mut present = forms.into_iter().flatten();
        match (present.next(), present.next()) {
            (Some(form), None) => Ok(form),
            _ => Err(ConfigurationError::Invalid(format!(
                "argument '{}' needs exactly one of switch, invert, choice or value",
                self.key
            ))),
        }
    }

    /// Option whose declaration position orders this mapping
    pub fn owner(&self) -> Option<&str> {
        self.switch
            .as_deref()
            .or(self.invert.as_deref())
            .or(self.choice.as_deref())
            .or(self.option.as_deref())
    }

    /// Whether the mapping emits anything for this configuration
    ///
    /// A mapping owned by an option that is unavailable on the platform
    /// never emits, whatever the option's resolved value.
    pub fn is_active(&self, config: &ResolvedConfiguration, platform: &PlatformInfo) -> bool {
        if let Some(owner) = self.owner()
            && !config.is_available(owner)
        {
            return false;
        }
        if let Some(p) = &self.platform
            && !p.eval_platform(platform)
        {
            return false;
        }
        self.when
            .as_ref()
            .is_none_or(|w| w.eval(config, platform))
    }

    /// Unexpanded value for the current configuration
    pub fn raw_value(&self, config: &ResolvedConfiguration) -> Result<String, ConfigurationError> {
        Ok(match self.form()? {
            MappingForm::Switch(id) => on_off(config.is_enabled(id)).to_string(),
            MappingForm::Invert(id) => on_off(!config.is_enabled(id)).to_string(),
            MappingForm::Choice(id) => config
                .choice(id)
                .ok_or_else(|| ConfigurationError::InvalidValue {
                    option: id.to_string(),
                    value: config
                        .value(id)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    reason: format!("argument '{}' needs an enum option", self.key),
                })?
                .to_string(),
            MappingForm::Fixed(template) => template.to_string(),
        })
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "ON" } else { "OFF" }
}

/// Conditional template variable (`[[variable]]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub when: Option<Condition>,
    #[serde(default)]
    pub platform: Option<Condition>,
}

/// Explicit build environment entry (`[[environment]]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDecl {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub when: Option<Condition>,
    #[serde(default)]
    pub platform: Option<Condition>,
}

/// Evaluate a `when`/`platform` gate pair
pub(crate) fn gate_holds(
    when: Option<&Condition>,
    platform_pred: Option<&Condition>,
    options: &dyn OptionLookup,
    platform: &PlatformInfo,
) -> bool {
    platform_pred.is_none_or(|p| p.eval_platform(platform))
        && when.is_none_or(|w| w.eval(options, platform))
}

/// One `KEY=VALUE` build argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub key: String,
    pub value: String,
}

/// Ordered build arguments plus environment and source edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgumentList {
    args: Vec<Argument>,
    #[serde(skip)]
    overridable: HashSet<String>,
    environment: BTreeMap<String, String>,
    edits: Vec<SourceEdit>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a default that a later `push` of the same key replaces in place
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => self.args[i].value = value,
            None => self.args.push(Argument {
                key: key.clone(),
                value,
            }),
        }
        self.overridable.insert(key);
    }

    /// Append an argument
    ///
    /// An identical duplicate is dropped. A different value for a key that
    /// is not an overridable default is a conflict.
    pub fn push(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConflictError> {
        let key = key.into();
        let value = value.into();

        let Some(i) = self.position(&key) else {
            self.args.push(Argument { key, value });
            return Ok(());
        };

        if self.overridable.remove(&key) || self.args[i].value == value {
            self.args[i].value = value;
            return Ok(());
        }

        Err(ConflictError::new(
            key.clone(),
            format!(
                "build flag {} set to both '{}' and '{}'",
                key, self.args[i].value, value
            ),
            vec![self.args[i].value.clone(), value],
        ))
    }

    /// Set a build environment variable; conflicting values are rejected
    pub fn set_env(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConflictError> {
        let name = name.into();
        let value = value.into();
        match self.environment.get(&name) {
            Some(existing) if *existing != value => Err(ConflictError::new(
                name.clone(),
                format!(
                    "environment variable {} set to both '{}' and '{}'",
                    name, existing, value
                ),
                vec![existing.clone(), value],
            )),
            Some(_) => Ok(()),
            None => {
                self.environment.insert(name, value);
                Ok(())
            }
        }
    }

    pub fn add_edit(&mut self, edit: SourceEdit) {
        if !self.edits.contains(&edit) {
            self.edits.push(edit);
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.args.iter().position(|a| a.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.args[i].value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn edits(&self) -> &[SourceEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// `-DKEY=VALUE` strings for cmake
    pub fn to_cmake_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| format!("-D{}={}", a.key, a.value))
            .collect()
    }

    /// Replace the build path and install prefix placeholders
    pub fn render(&self, buildpath: &Path, install_prefix: &Path) -> ArgumentList {
        let buildpath = buildpath.to_string_lossy();
        let install_prefix = install_prefix.to_string_lossy();
        let fill = |s: &str| {
            s.replace(BUILDPATH_VAR, &buildpath)
                .replace(INSTALL_PREFIX_VAR, &install_prefix)
        };

        ArgumentList {
            args: self
                .args
                .iter()
                .map(|a| Argument {
                    key: a.key.clone(),
                    value: fill(&a.value),
                })
                .collect(),
            overridable: self.overridable.clone(),
            environment: self
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), fill(v)))
                .collect(),
            edits: self
                .edits
                .iter()
                .map(|e| SourceEdit {
                    file: e.file.clone(),
                    from: e.from.clone(),
                    to: fill(&e.to),
                })
                .collect(),
        }
    }
}
