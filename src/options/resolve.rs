// src/options/resolve.rs

//! Option resolution: defaults, overrides, aliases and platform gating

use super::{OptionRegistry, OptionValue, RegistryEntry};
use crate::condition::OptionLookup;
use crate::error::{ConfigurationError, Result};
use crate::platform::PlatformInfo;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, warn};

/// User-supplied option values, keyed by option id or alias
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Overrides {
    values: BTreeMap<String, OptionValue>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option; a later call for the same id replaces the earlier one
    pub fn set(&mut self, id: impl Into<String>, value: OptionValue) -> &mut Self {
        self.values.insert(id.into(), value);
        self
    }

    pub fn enable(&mut self, id: impl Into<String>) -> &mut Self {
        self.set(id, OptionValue::Bool(true))
    }

    pub fn disable(&mut self, id: impl Into<String>) -> &mut Self {
        self.set(id, OptionValue::Bool(false))
    }

    /// Builder-style `enable`
    pub fn with(mut self, id: impl Into<String>) -> Self {
        self.enable(id);
        self
    }

    /// Builder-style `disable`
    pub fn without(mut self, id: impl Into<String>) -> Self {
        self.disable(id);
        self
    }

    /// Apply a build flag written the Homebrew way
    ///
    /// `with-X` enables X, `without-X` disables it, `X=value` selects an
    /// enum value and a bare `X` enables X. Leading dashes are ignored.
    pub fn apply_flag(&mut self, flag: &str) -> Result<()> {
        let flag = flag.trim().trim_start_matches('-');
        if flag.is_empty() {
            return Err(ConfigurationError::UnknownOption(String::new()).into());
        }

        if let Some((id, value)) = flag.split_once('=') {
            let value = match value {
                "on" | "true" | "yes" => OptionValue::Bool(true),
                "off" | "false" | "no" => OptionValue::Bool(false),
                other => OptionValue::Choice(other.to_string()),
            };
            self.set(id, value);
        } else if let Some(id) = flag.strip_prefix("without-") {
            self.disable(id);
        } else if let Some(id) = flag.strip_prefix("with-") {
            self.enable(id);
        } else {
            self.enable(flag);
        }
        Ok(())
    }

    /// Layer `other` on top of `self`
    pub fn merge(&mut self, other: &Overrides) {
        for (id, value) in &other.values {
            self.values.insert(id.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, id: &str) -> Option<&OptionValue> {
        self.values.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Where a resolved value came from
///
/// A value set through a deprecated alias counts as `User`; the alias
/// itself is reported as a `DeprecatedAlias` warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    User,
    Platform,
}

/// Effective state of one option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedOption {
    pub id: String,
    pub value: OptionValue,
    pub source: ValueSource,
    /// False when the option's platform predicate does not hold
    pub available: bool,
}

impl ResolvedOption {
    pub fn is_enabled(&self) -> bool {
        self.value.as_bool().unwrap_or(false)
    }
}

/// Non-fatal findings of resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// A deprecated alias was used
    DeprecatedAlias { alias: String, superseded_by: String },
    /// Alias and live option were both set with different values; the live one won
    AliasOverridden {
        alias: String,
        option: String,
        ignored: OptionValue,
        kept: OptionValue,
    },
    /// User set an option that is not available on this platform
    PlatformIgnored { option: String },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeprecatedAlias {
                alias,
                superseded_by,
            } => write!(f, "option '{}' is deprecated, use '{}'", alias, superseded_by),
            Self::AliasOverridden {
                alias,
                option,
                ignored,
                kept,
            } => write!(
                f,
                "'{}={}' ignored: '{}' is explicitly set to {}",
                alias, ignored, option, kept
            ),
            Self::PlatformIgnored { option } => {
                write!(f, "option '{}' is not available on this platform", option)
            }
        }
    }
}

/// Immutable option state for one build invocation
///
/// Entries are in registry declaration order. Nothing downstream can
/// mutate it; stages only read through accessors or `OptionLookup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfiguration {
    options: Vec<ResolvedOption>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ResolvedConfiguration {
    fn from_entries(options: Vec<ResolvedOption>) -> Self {
        let index = options
            .iter()
            .enumerate()
            .map(|(i, o)| (o.id.clone(), i))
            .collect();
        Self { options, index }
    }

    pub fn get(&self, id: &str) -> Option<&ResolvedOption> {
        self.index.get(id).map(|&i| &self.options[i])
    }

    pub fn value(&self, id: &str) -> Option<&OptionValue> {
        self.get(id).map(|o| &o.value)
    }

    /// Whether the option exists and is available on this platform
    pub fn is_available(&self, id: &str) -> bool {
        self.get(id).is_some_and(|o| o.available)
    }

    /// Resolved options in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedOption> {
        self.options.iter()
    }

    /// Ids of enabled flags in declaration order
    pub fn enabled(&self) -> Vec<&str> {
        self.options
            .iter()
            .filter(|o| o.is_enabled())
            .map(|o| o.id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl OptionLookup for ResolvedConfiguration {
    fn is_enabled(&self, id: &str) -> bool {
        self.get(id).is_some_and(|o| o.is_enabled())
    }

    fn choice(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(|o| o.value.as_choice())
    }
}

/// Resolved configuration plus the warning channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub config: ResolvedConfiguration,
    pub warnings: Vec<ResolutionWarning>,
}

impl OptionRegistry {
    /// Resolve user overrides against the registry for a platform
    ///
    /// Either every override is applied or an error is returned; there is
    /// no partially resolved configuration.
    pub fn resolve(&self, overrides: &Overrides, platform: &PlatformInfo) -> Result<Resolution> {
        let mut warnings = Vec::new();
        let mut explicit: HashMap<&str, OptionValue> = HashMap::new();
        let mut via_alias: Vec<(&str, &str, &OptionValue)> = Vec::new();

        for (id, value) in overrides.iter() {
            match self.lookup(id) {
                Some(RegistryEntry::Live(decl)) => {
                    decl.check_value(value)?;
                    explicit.insert(decl.id.as_str(), value.clone());
                }
                Some(RegistryEntry::Alias { alias, target }) => {
                    target.check_value(value)?;
                    warn!("Option '{}' is deprecated, use '{}'", alias, target.id);
                    warnings.push(ResolutionWarning::DeprecatedAlias {
                        alias: alias.to_string(),
                        superseded_by: target.id.clone(),
                    });
                    via_alias.push((alias, target.id.as_str(), value));
                }
                None => return Err(ConfigurationError::UnknownOption(id.to_string()).into()),
            }
        }

        // Live values are all in place before any alias is considered
        let mut from_alias: HashMap<&str, OptionValue> = HashMap::new();
        for (alias, target, value) in via_alias {
            let kept = explicit.get(target).or_else(|| from_alias.get(target));
            match kept {
                Some(kept) if kept != value => {
                    warn!(
                        "Ignoring deprecated '{}={}': '{}' is set to {}",
                        alias, value, target, kept
                    );
                    warnings.push(ResolutionWarning::AliasOverridden {
                        alias: alias.to_string(),
                        option: target.to_string(),
                        ignored: value.clone(),
                        kept: kept.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    from_alias.insert(target, value.clone());
                }
            }
        }

        let mut entries = Vec::with_capacity(self.len());
        for decl in self.options() {
            let available = decl
                .platform
                .as_ref()
                .is_none_or(|p| p.eval_platform(platform));

            let (value, source) = if !available {
                if explicit.contains_key(decl.id.as_str())
                    || from_alias.contains_key(decl.id.as_str())
                {
                    debug!("Option '{}' is unavailable on {}, ignoring", decl.id, platform);
                    warnings.push(ResolutionWarning::PlatformIgnored {
                        option: decl.id.clone(),
                    });
                }
                (decl.unavailable_value(), ValueSource::Platform)
            } else if let Some(v) = explicit.get(decl.id.as_str()) {
                (v.clone(), ValueSource::User)
            } else if let Some(v) = from_alias.get(decl.id.as_str()) {
                (v.clone(), ValueSource::User)
            } else {
                (decl.default_value(), ValueSource::Default)
            };

            entries.push(ResolvedOption {
                id: decl.id.clone(),
                value,
                source,
                available,
            });
        }

        Ok(Resolution {
            config: ResolvedConfiguration::from_entries(entries),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::error::Error;
    use crate::options::{DefaultState, DeprecatedAlias, OptionDecl};
    use crate::platform::{OsFamily, OsVersion};

    fn registry() -> OptionRegistry {
        let mut quicktime = OptionDecl::flag("quicktime", DefaultState::Optional);
        quicktime.platform = Some(Condition::All(vec![
            Condition::Os(OsFamily::Macos),
            Condition::ToolchainBelow(800),
        ]));

        let mut generation = OptionDecl::flag("cuda-generation", DefaultState::Optional);
        generation.choices = vec!["Auto".to_string(), "Kepler".to_string()];

        let explicit = vec![
            OptionDecl::flag("contrib", DefaultState::Optional),
            OptionDecl::flag("test", DefaultState::Recommended),
            OptionDecl::flag("qt", DefaultState::Optional),
            quicktime,
            generation,
        ];
        let deprecated = vec![
            DeprecatedAlias {
                alias: "tests".to_string(),
                superseded_by: "test".to_string(),
            },
            DeprecatedAlias {
                alias: "qt5".to_string(),
                superseded_by: "qt".to_string(),
            },
        ];
        OptionRegistry::new(&explicit, &deprecated, &[]).unwrap()
    }

    #[test]
    fn test_defaults() {
        let res = registry()
            .resolve(&Overrides::new(), &PlatformInfo::linux())
            .unwrap();
        let config = res.config;
        assert!(!config.is_enabled("contrib"));
        assert!(config.is_enabled("test"));
        assert_eq!(config.choice("cuda-generation"), Some("Auto"));
        assert_eq!(config.get("test").unwrap().source, ValueSource::Default);
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn test_user_overrides() {
        let overrides = Overrides::new().with("contrib").without("test");
        let config = registry()
            .resolve(&overrides, &PlatformInfo::linux())
            .unwrap()
            .config;
        assert!(config.is_enabled("contrib"));
        assert!(!config.is_enabled("test"));
        assert_eq!(config.get("contrib").unwrap().source, ValueSource::User);
    }

    #[test]
    fn test_unknown_option_is_error() {
        let overrides = Overrides::new().with("opencv4");
        let err = registry()
            .resolve(&overrides, &PlatformInfo::linux())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::UnknownOption(ref id)) if id == "opencv4"
        ));
    }

    #[test]
    fn test_alias_same_as_live() {
        let reg = registry();
        let linux = PlatformInfo::linux();

        let via_alias = reg.resolve(&Overrides::new().without("tests"), &linux).unwrap();
        let via_live = reg.resolve(&Overrides::new().without("test"), &linux).unwrap();

        assert!(!via_alias.config.is_enabled("test"));
        assert_eq!(via_alias.config, via_live.config);
        assert_eq!(via_alias.config.get("test").unwrap().source, ValueSource::User);
        assert!(via_live.warnings.is_empty());
        assert!(matches!(
            via_alias.warnings.as_slice(),
            [ResolutionWarning::DeprecatedAlias { .. }]
        ));
    }

    #[test]
    fn test_live_option_wins_over_alias() {
        let overrides = Overrides::new().with("qt5").without("qt");
        let res = registry()
            .resolve(&overrides, &PlatformInfo::linux())
            .unwrap();

        assert!(!res.config.is_enabled("qt"));
        assert_eq!(res.config.get("qt").unwrap().source, ValueSource::User);
        assert!(res.warnings.iter().any(|w| matches!(
            w,
            ResolutionWarning::AliasOverridden { alias, option, .. } if alias == "qt5" && option == "qt"
        )));
    }

    #[test]
    fn test_alias_agreeing_with_live_is_quiet() {
        let overrides = Overrides::new().with("qt5").with("qt");
        let res = registry()
            .resolve(&overrides, &PlatformInfo::linux())
            .unwrap();
        assert!(res.config.is_enabled("qt"));
        assert!(!res
            .warnings
            .iter()
            .any(|w| matches!(w, ResolutionWarning::AliasOverridden { .. })));
    }

    #[test]
    fn test_platform_gating_forces_state() {
        let reg = registry();
        let overrides = Overrides::new().with("quicktime");

        let linux = reg.resolve(&overrides, &PlatformInfo::linux()).unwrap();
        let quicktime = linux.config.get("quicktime").unwrap();
        assert!(!quicktime.available);
        assert!(!quicktime.is_enabled());
        assert_eq!(quicktime.source, ValueSource::Platform);
        assert!(linux
            .warnings
            .contains(&ResolutionWarning::PlatformIgnored {
                option: "quicktime".to_string()
            }));

        let old_mac = PlatformInfo::macos(OsVersion::new(10, 11)).with_toolchain_version(703);
        let mac = reg.resolve(&overrides, &old_mac).unwrap();
        assert!(mac.config.is_enabled("quicktime"));
        assert!(mac.config.is_available("quicktime"));
    }

    #[test]
    fn test_invalid_choice_is_error() {
        let mut overrides = Overrides::new();
        overrides.set("cuda-generation", OptionValue::Choice("Volta".to_string()));
        assert!(registry().resolve(&overrides, &PlatformInfo::linux()).is_err());

        let overrides = Overrides::new().with("cuda-generation");
        assert!(registry().resolve(&overrides, &PlatformInfo::linux()).is_err());

        let mut overrides = Overrides::new();
        overrides.set("cuda-generation", OptionValue::Choice("Kepler".to_string()));
        let config = registry()
            .resolve(&overrides, &PlatformInfo::linux())
            .unwrap()
            .config;
        assert_eq!(config.choice("cuda-generation"), Some("Kepler"));
    }

    #[test]
    fn test_apply_flag() {
        let mut overrides = Overrides::new();
        overrides.apply_flag("with-contrib").unwrap();
        overrides.apply_flag("--without-test").unwrap();
        overrides.apply_flag("cxx11").unwrap();
        overrides.apply_flag("cuda-generation=Kepler").unwrap();
        overrides.apply_flag("opencl=off").unwrap();

        assert_eq!(overrides.get("contrib"), Some(&OptionValue::Bool(true)));
        assert_eq!(overrides.get("test"), Some(&OptionValue::Bool(false)));
        assert_eq!(overrides.get("cxx11"), Some(&OptionValue::Bool(true)));
        assert_eq!(
            overrides.get("cuda-generation"),
            Some(&OptionValue::Choice("Kepler".to_string()))
        );
        assert_eq!(overrides.get("opencl"), Some(&OptionValue::Bool(false)));
        assert!(overrides.apply_flag("--").is_err());
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = Overrides::new().with("contrib").without("qt");
        let cli = Overrides::new().with("qt");
        base.merge(&cli);
        assert_eq!(base.get("qt"), Some(&OptionValue::Bool(true)));
        assert_eq!(base.get("contrib"), Some(&OptionValue::Bool(true)));
    }
}
