// src/condition.rs

//! Predicate expressions over resolved options and the platform
//!
//! Recipes gate dependencies, arguments, resources and conflict rules on
//! conditions such as "java is enabled" or "not macOS". Conditions are a
//! small tagged expression tree deserialized straight from TOML:
//!
//! ```toml
//! when = { enabled = "java" }
//! when = { any = [{ enabled = "contrib" }, { enabled = "nonfree" }] }
//! platform = { all = [{ os = "macos" }, { toolchain_below = 800 }] }
//! ```
//!
//! Option references are only meaningful once every option is resolved,
//! so evaluation always goes through an `OptionLookup`.

use crate::platform::{OsFamily, OsVersion, PlatformInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Read access to option state used while evaluating conditions
pub trait OptionLookup {
    /// Whether a boolean option is enabled (false for unknown ids)
    fn is_enabled(&self, id: &str) -> bool;

    /// Selected value of an enum option
    fn choice(&self, id: &str) -> Option<&str>;
}

/// Lookup for platform-only evaluation: every option reads as disabled
pub struct NoOptions;

impl OptionLookup for NoOptions {
    fn is_enabled(&self, _id: &str) -> bool {
        false
    }

    fn choice(&self, _id: &str) -> Option<&str> {
        None
    }
}

/// A boolean predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Option is enabled
    Enabled(String),
    /// Option is disabled
    Disabled(String),
    /// Enum option has the given value
    Choice { option: String, value: String },
    /// Platform OS family matches
    Os(OsFamily),
    /// Platform architecture matches
    Arch(String),
    /// OS release is known and strictly lower
    OsVersionBelow(OsVersion),
    /// OS release is known and strictly higher
    OsVersionAbove(OsVersion),
    /// Toolchain build version is known and strictly lower
    ToolchainBelow(u32),
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn enabled(id: impl Into<String>) -> Self {
        Self::Enabled(id.into())
    }

    pub fn disabled(id: impl Into<String>) -> Self {
        Self::Disabled(id.into())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluate against resolved options and the platform
    pub fn eval(&self, options: &dyn OptionLookup, platform: &PlatformInfo) -> bool {
        match self {
            Self::Enabled(id) => options.is_enabled(id),
            Self::Disabled(id) => !options.is_enabled(id),
            Self::Choice { option, value } => options.choice(option) == Some(value.as_str()),
            Self::Os(os) => platform.os == *os,
            Self::Arch(arch) => platform.arch == *arch,
            Self::OsVersionBelow(v) => platform.os_version.is_some_and(|pv| pv < *v),
            Self::OsVersionAbove(v) => platform.os_version.is_some_and(|pv| pv > *v),
            Self::ToolchainBelow(v) => platform.toolchain_version.is_some_and(|tv| tv < *v),
            Self::Not(inner) => !inner.eval(options, platform),
            Self::All(items) => items.iter().all(|c| c.eval(options, platform)),
            Self::Any(items) => items.iter().any(|c| c.eval(options, platform)),
        }
    }

    /// Evaluate a platform-only predicate
    pub fn eval_platform(&self, platform: &PlatformInfo) -> bool {
        self.eval(&NoOptions, platform)
    }

    /// All option ids this condition reads, in order of appearance
    pub fn referenced_options(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_options(&mut out);
        out
    }

    fn collect_options<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Enabled(id) | Self::Disabled(id) => out.push(id),
            Self::Choice { option, .. } => out.push(option),
            Self::Not(inner) => inner.collect_options(out),
            Self::All(items) | Self::Any(items) => {
                for item in items {
                    item.collect_options(out);
                }
            }
            Self::Os(_)
            | Self::Arch(_)
            | Self::OsVersionBelow(_)
            | Self::OsVersionAbove(_)
            | Self::ToolchainBelow(_) => {}
        }
    }

    /// True when the condition depends only on the platform
    pub fn is_platform_only(&self) -> bool {
        self.referenced_options().is_empty()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled(id) => write!(f, "{}", id),
            Self::Disabled(id) => write!(f, "!{}", id),
            Self::Choice { option, value } => write!(f, "{}={}", option, value),
            Self::Os(os) => write!(f, "os={}", os),
            Self::Arch(arch) => write!(f, "arch={}", arch),
            Self::OsVersionBelow(v) => write!(f, "os<{}", v),
            Self::OsVersionAbove(v) => write!(f, "os>{}", v),
            Self::ToolchainBelow(v) => write!(f, "toolchain<{}", v),
            Self::Not(inner) => write!(f, "!{}", inner),
            Self::All(items) => write_joined(f, items, "&&"),
            Self::Any(items) => write_joined(f, items, "||"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Condition], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", sep)?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Options(HashMap<&'static str, bool>);

    impl OptionLookup for Options {
        fn is_enabled(&self, id: &str) -> bool {
            self.0.get(id).copied().unwrap_or(false)
        }

        fn choice(&self, id: &str) -> Option<&str> {
            (id == "generation").then_some("Kepler")
        }
    }

    fn options(pairs: &[(&'static str, bool)]) -> Options {
        Options(pairs.iter().copied().collect())
    }

    #[derive(Deserialize)]
    struct Holder {
        when: Condition,
    }

    #[test]
    fn test_deserialize_simple() {
        let h: Holder = toml::from_str(r#"when = { enabled = "java" }"#).unwrap();
        assert_eq!(h.when, Condition::enabled("java"));
    }

    #[test]
    fn test_deserialize_nested() {
        let h: Holder = toml::from_str(
            r#"when = { all = [{ os = "macos" }, { not = { toolchain_below = 800 } }, { os_version_below = "10.7" }] }"#,
        )
        .unwrap();
        assert_eq!(
            h.when,
            Condition::All(vec![
                Condition::Os(OsFamily::Macos),
                Condition::ToolchainBelow(800).negate(),
                Condition::OsVersionBelow(OsVersion::new(10, 7)),
            ])
        );
        assert!(h.when.is_platform_only());
    }

    #[test]
    fn test_eval_options() {
        let opts = options(&[("contrib", false), ("nonfree", true)]);
        let linux = PlatformInfo::linux();

        let any = Condition::Any(vec![Condition::enabled("contrib"), Condition::enabled("nonfree")]);
        assert!(any.eval(&opts, &linux));

        let all = Condition::All(vec![Condition::enabled("contrib"), Condition::enabled("nonfree")]);
        assert!(!all.eval(&opts, &linux));

        assert!(Condition::disabled("contrib").eval(&opts, &linux));
        assert!(Condition::Choice {
            option: "generation".to_string(),
            value: "Kepler".to_string()
        }
        .eval(&opts, &linux));
    }

    #[test]
    fn test_eval_platform_unknown_versions() {
        let linux = PlatformInfo::linux();
        assert!(!Condition::ToolchainBelow(800).eval_platform(&linux));
        assert!(!Condition::OsVersionBelow(OsVersion::new(10, 7)).eval_platform(&linux));

        let old_mac = PlatformInfo::macos(OsVersion::new(10, 6)).with_toolchain_version(703);
        assert!(Condition::ToolchainBelow(800).eval_platform(&old_mac));
        assert!(Condition::OsVersionBelow(OsVersion::new(10, 7)).eval_platform(&old_mac));
        assert!(!Condition::OsVersionAbove(OsVersion::new(10, 6)).eval_platform(&old_mac));
    }

    #[test]
    fn test_referenced_options() {
        let c = Condition::All(vec![
            Condition::enabled("python"),
            Condition::Any(vec![Condition::Os(OsFamily::Linux), Condition::disabled("numpy")]),
        ]);
        assert_eq!(c.referenced_options(), vec!["python", "numpy"]);
        assert!(!c.is_platform_only());
    }

    #[test]
    fn test_display() {
        let c = Condition::All(vec![
            Condition::Os(OsFamily::Macos),
            Condition::ToolchainBelow(800),
        ]);
        assert_eq!(c.to_string(), "(os=macos && toolchain<800)");
        assert_eq!(Condition::disabled("qt").to_string(), "!qt");
    }
}
