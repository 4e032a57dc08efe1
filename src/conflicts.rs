// src/conflicts.rs

//! Conflict Validator
//!
//! All mutually exclusive combinations are declared in one table of
//! `[[conflict]]` rules instead of being checked ad hoc during the build.
//! Validation runs on resolved state only and touches neither the
//! filesystem nor the network, so it always completes before a build
//! action can start.

use crate::arguments::ArgumentMapping;
use crate::condition::{Condition, OptionLookup};
use crate::dependencies::DependencySet;
use crate::error::{ConflictError, Result};
use crate::options::ResolvedConfiguration;
use crate::platform::PlatformInfo;
use crate::recipe::Recipe;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A declared invalid combination of option states
///
/// `exclusive` lists options of which at most one may be enabled; `when`
/// is a predicate that must not hold. With both, `exclusive` is only
/// checked while `when` holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConflictRule {
    pub id: String,

    #[serde(default)]
    pub exclusive: Vec<String>,

    #[serde(default)]
    pub when: Option<Condition>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ConflictRule {
    pub fn exclusive(id: impl Into<String>, options: &[&str]) -> Self {
        Self {
            id: id.into(),
            exclusive: options.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn forbid(id: impl Into<String>, when: Condition, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            when: Some(when),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Option ids the rule reads
    pub fn referenced_options(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.exclusive.iter().map(|s| s.as_str()).collect();
        if let Some(when) = &self.when {
            for id in when.referenced_options() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Check the rule against resolved options
    pub fn check(
        &self,
        config: &ResolvedConfiguration,
        platform: &PlatformInfo,
    ) -> std::result::Result<(), ConflictError> {
        let gated = self.when.as_ref().map(|w| w.eval(config, platform));

        if self.exclusive.is_empty() {
            if gated == Some(true) {
                let message = self
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("unsupported option combination '{}'", self.id));
                let options = self
                    .referenced_options()
                    .into_iter()
                    .map(String::from)
                    .collect();
                return Err(ConflictError::new(&self.id, message, options));
            }
            return Ok(());
        }

        if gated == Some(false) {
            return Ok(());
        }
        let enabled: Vec<String> = self
            .exclusive
            .iter()
            .filter(|id| config.is_enabled(id))
            .cloned()
            .collect();
        if enabled.len() > 1 {
            let message = self.message.clone().unwrap_or_else(|| {
                format!("options {} are mutually exclusive", quoted(&enabled))
            });
            return Err(ConflictError::new(&self.id, message, enabled));
        }
        Ok(())
    }
}

fn quoted(ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("'{}'", id))
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Validate a resolved configuration and dependency set
///
/// Rules are checked in declaration order and the first violation is
/// returned. Then competing capability providers and build flags
/// claimed with different values by two active mappings are rejected.
pub fn validate(
    recipe: &Recipe,
    config: &ResolvedConfiguration,
    deps: &DependencySet,
    platform: &PlatformInfo,
) -> Result<()> {
    for rule in &recipe.conflicts {
        rule.check(config, platform)?;
    }

    if let Some(selection) = deps.capability_selections().into_iter().next() {
        return Err(ConflictError::new(
            &selection.capability,
            format!(
                "{} both provide {}; select only one",
                quoted(&selection.selected),
                selection.capability
            ),
            selection.selected.clone(),
        )
        .into());
    }

    check_flag_claims(&recipe.arguments, config, platform)?;

    debug!("Configuration passed {} conflict rules", recipe.conflicts.len());
    Ok(())
}

/// Reject two active mappings giving one key different values
fn check_flag_claims(
    mappings: &[ArgumentMapping],
    config: &ResolvedConfiguration,
    platform: &PlatformInfo,
) -> Result<()> {
    let mut claims: Vec<(&str, Option<&str>, String)> = Vec::new();

    for mapping in mappings.iter().filter(|m| m.is_active(config, platform)) {
        let value = mapping.raw_value(config)?;
        let previous = claims
            .iter()
            .find(|(key, _, v)| *key == mapping.key && *v != value);
        if let Some((key, owner, previous)) = previous {
            let mut options: Vec<String> = Vec::new();
            for id in [*owner, mapping.owner()].into_iter().flatten() {
                if !options.iter().any(|o| o == id) {
                    options.push(id.to_string());
                }
            }
            return Err(ConflictError::new(
                *key,
                format!(
                    "build flag {} is claimed with both '{}' and '{}'",
                    key, previous, value
                ),
                options,
            )
            .into());
        }
        claims.push((mapping.key.as_str(), mapping.owner(), value));
    }
    Ok(())
}
