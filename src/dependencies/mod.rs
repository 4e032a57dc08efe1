// src/dependencies/mod.rs

//! Dependency Graph Builder
//!
//! Walks a recipe's static `[[dependency]]` declarations against a
//! resolved configuration and produces the effective dependency set:
//!
//! - `always` dependencies are included unless their `when` or `platform`
//!   predicate is false
//! - `recommended` and `optional` dependencies additionally need their
//!   gating option to be enabled
//! - platform substitutions rewrite the name before deduplication
//! - duplicates collapse to one entry with the strongest requirement kind
//!
//! Competing providers of the same capability are reported, not resolved;
//! that is the conflict validator's job.

mod locator;

pub use locator::{
    ChainLocator, DependencyLocation, DependencyLocator, MapLocator, PrefixLocator,
};

use crate::condition::{Condition, OptionLookup};
use crate::options::ResolvedConfiguration;
use crate::platform::PlatformInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// How strongly a dependency is required
///
/// Ordered weakest to strongest so that `max` picks the dominant kind.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequirementKind {
    Optional,
    Recommended,
    #[default]
    Always,
}

/// When a dependency is needed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DependencyStage {
    /// Only while building
    Build,
    #[default]
    Run,
}

/// Platform-specific replacement of a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    /// Platform predicate under which the replacement applies
    pub platform: Condition,
    /// Replacement dependency name
    pub name: String,
}

/// Build argument emitted from a located dependency
///
/// `value` may use `%(include)s`, `%(lib)s`, `%(bin)s` and `%(prefix)s`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocateTemplate {
    pub key: String,
    pub value: String,
}

/// Build environment entry derived from a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvTemplate {
    pub name: String,
    pub value: String,
}

/// In-place replacement in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEdit {
    /// Path relative to the source root
    pub file: String,
    pub from: String,
    pub to: String,
}

/// A static `[[dependency]]` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDecl {
    pub name: String,

    #[serde(default)]
    pub kind: RequirementKind,

    #[serde(default)]
    pub stage: DependencyStage,

    /// Gating option for recommended/optional dependencies (defaults to the name)
    #[serde(default)]
    pub option: Option<String>,

    /// Conditional predicate over resolved options
    #[serde(default)]
    pub when: Option<Condition>,

    /// Platform predicate
    #[serde(default)]
    pub platform: Option<Condition>,

    #[serde(default, rename = "substitute")]
    pub substitutes: Vec<Substitution>,

    #[serde(default)]
    pub locate: Vec<LocateTemplate>,

    #[serde(default)]
    pub env: Vec<EnvTemplate>,

    #[serde(default, rename = "edit")]
    pub edits: Vec<SourceEdit>,
}

impl DependencyDecl {
    pub fn new(name: impl Into<String>, kind: RequirementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            stage: DependencyStage::Run,
            option: None,
            when: None,
            platform: None,
            substitutes: Vec::new(),
            locate: Vec::new(),
            env: Vec::new(),
            edits: Vec::new(),
        }
    }

    /// Option that switches this dependency on, if any
    pub fn gating_option(&self) -> Option<&str> {
        match self.kind {
            RequirementKind::Always => None,
            _ => Some(self.option.as_deref().unwrap_or(&self.name)),
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.when.is_some()
    }

    /// Whether this declaration contributes to the dependency set
    pub fn is_included(&self, options: &dyn OptionLookup, platform: &PlatformInfo) -> bool {
        if let Some(p) = &self.platform
            && !p.eval_platform(platform)
        {
            return false;
        }
        if let Some(when) = &self.when
            && !when.eval(options, platform)
        {
            return false;
        }
        self.gating_option().is_none_or(|id| options.is_enabled(id))
    }

    /// Name after platform substitution (first matching rule wins)
    pub fn effective_name(&self, platform: &PlatformInfo) -> &str {
        self.substitutes
            .iter()
            .find(|s| s.platform.eval_platform(platform))
            .map(|s| s.name.as_str())
            .unwrap_or(&self.name)
    }
}

/// Mutually alternative providers of one capability (`[[alternative]]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub capability: String,
    /// Provider dependency names, in preference order
    pub providers: Vec<String>,
    /// Build flag that builds the capability from bundled sources
    #[serde(default)]
    pub fallback: Option<String>,
}

/// A dependency in the effective set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    /// Name after substitution
    pub name: String,
    /// Names as declared, when different from `name` or merged
    pub declared_as: Vec<String>,
    /// Strongest kind among contributing declarations
    pub kind: RequirementKind,
    pub stage: DependencyStage,
    /// Position of the earliest contributing declaration
    pub position: usize,
    /// True when every contributing declaration was conditional
    pub conditional: bool,
}

/// Providers selected for one capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySelection {
    pub capability: String,
    pub selected: Vec<String>,
    pub fallback: Option<String>,
}

/// Output of the builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySet {
    dependencies: Vec<ResolvedDependency>,
    /// For each declaration index, the index of the entry it contributed to
    #[serde(skip)]
    contributions: Vec<Option<usize>>,
    selections: Vec<CapabilitySelection>,
}

impl DependencySet {
    /// Dependencies in first-declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.dependencies.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedDependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolved entry a declaration contributed to, if it was included
    pub fn for_declaration(&self, index: usize) -> Option<&ResolvedDependency> {
        self.contributions
            .get(index)
            .copied()
            .flatten()
            .map(|i| &self.dependencies[i])
    }

    /// Selection state of every alternative group
    pub fn selections(&self) -> &[CapabilitySelection] {
        &self.selections
    }

    /// Capabilities with more than one selected provider
    pub fn capability_selections(&self) -> Vec<&CapabilitySelection> {
        self.selections
            .iter()
            .filter(|s| s.selected.len() > 1)
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Compute the effective dependency set
pub fn build(
    declarations: &[DependencyDecl],
    alternatives: &[Alternative],
    config: &ResolvedConfiguration,
    platform: &PlatformInfo,
) -> DependencySet {
    let mut dependencies: Vec<ResolvedDependency> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut contributions = Vec::with_capacity(declarations.len());
    let mut included_declared: Vec<&str> = Vec::new();

    for (position, decl) in declarations.iter().enumerate() {
        if !decl.is_included(config, platform) {
            debug!("Dependency '{}' not selected", decl.name);
            contributions.push(None);
            continue;
        }
        included_declared.push(&decl.name);

        let name = decl.effective_name(platform);
        if name != decl.name {
            debug!("Dependency '{}' substituted by '{}' on {}", decl.name, name, platform);
        }

        let index = match by_name.get(name) {
            Some(&i) => {
                let existing = &mut dependencies[i];
                existing.kind = existing.kind.max(decl.kind);
                if decl.stage == DependencyStage::Run {
                    existing.stage = DependencyStage::Run;
                }
                existing.conditional &= decl.is_conditional();
                if !existing.declared_as.contains(&decl.name) {
                    existing.declared_as.push(decl.name.clone());
                }
                i
            }
            None => {
                let i = dependencies.len();
                dependencies.push(ResolvedDependency {
                    name: name.to_string(),
                    declared_as: vec![decl.name.clone()],
                    kind: decl.kind,
                    stage: decl.stage,
                    position,
                    conditional: decl.is_conditional(),
                });
                by_name.insert(name.to_string(), i);
                i
            }
        };
        contributions.push(Some(index));
    }

    let selections = alternatives
        .iter()
        .map(|alt| CapabilitySelection {
            capability: alt.capability.clone(),
            selected: alt
                .providers
                .iter()
                .filter(|p| included_declared.contains(&p.as_str()))
                .cloned()
                .collect(),
            fallback: alt.fallback.clone(),
        })
        .collect::<Vec<_>>();

    for sel in &selections {
        if sel.selected.len() > 1 {
            debug!(
                "Capability '{}' has multiple providers selected: {}",
                sel.capability,
                sel.selected.join(", ")
            );
        }
    }

    DependencySet {
        dependencies,
        contributions,
        selections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionDecl, OptionRegistry, Overrides, DefaultState};
    use crate::platform::{OsFamily, OsVersion};

    fn config(
        decls: &[DependencyDecl],
        explicit: &[OptionDecl],
        overrides: &Overrides,
        platform: &PlatformInfo,
    ) -> ResolvedConfiguration {
        OptionRegistry::new(explicit, &[], decls)
            .unwrap()
            .resolve(overrides, platform)
            .unwrap()
            .config
    }

    #[test]
    fn test_kinds_and_gating() {
        let decls = vec![
            DependencyDecl::new("cmake", RequirementKind::Always),
            DependencyDecl::new("eigen", RequirementKind::Recommended),
            DependencyDecl::new("ffmpeg", RequirementKind::Optional),
        ];
        let linux = PlatformInfo::linux();

        let cfg = config(&decls, &[], &Overrides::new(), &linux);
        let set = build(&decls, &[], &cfg, &linux);
        assert_eq!(set.names(), vec!["cmake", "eigen"]);

        let cfg = config(&decls, &[], &Overrides::new().with("ffmpeg").without("eigen"), &linux);
        let set = build(&decls, &[], &cfg, &linux);
        assert_eq!(set.names(), vec!["cmake", "ffmpeg"]);
        assert_eq!(set.get("ffmpeg").unwrap().kind, RequirementKind::Optional);
    }

    #[test]
    fn test_conditional_dependency() {
        let mut ant = DependencyDecl::new("ant", RequirementKind::Always);
        ant.stage = DependencyStage::Build;
        ant.when = Some(Condition::enabled("java"));
        let decls = vec![ant];
        let explicit = vec![OptionDecl::flag("java", DefaultState::Optional)];
        let linux = PlatformInfo::linux();

        let cfg = config(&decls, &explicit, &Overrides::new(), &linux);
        assert!(build(&decls, &[], &cfg, &linux).is_empty());

        let cfg = config(&decls, &explicit, &Overrides::new().with("java"), &linux);
        let set = build(&decls, &[], &cfg, &linux);
        let ant = set.get("ant").unwrap();
        assert!(ant.conditional);
        assert_eq!(ant.stage, DependencyStage::Build);
    }

    #[test]
    fn test_kind_dominance() {
        let mut numpy_always = DependencyDecl::new("numpy", RequirementKind::Always);
        numpy_always.when = Some(Condition::enabled("python"));
        let decls = vec![
            DependencyDecl::new("numpy", RequirementKind::Optional),
            DependencyDecl::new("python", RequirementKind::Recommended),
            numpy_always,
        ];
        let linux = PlatformInfo::linux();
        let cfg = config(&decls, &[], &Overrides::new().with("numpy"), &linux);
        let set = build(&decls, &[], &cfg, &linux);

        assert_eq!(set.names(), vec!["numpy", "python"]);
        let numpy = set.get("numpy").unwrap();
        assert_eq!(numpy.kind, RequirementKind::Always);
        assert_eq!(numpy.position, 0);
        assert!(!numpy.conditional);
        assert_eq!(set.for_declaration(2).unwrap().name, "numpy");
    }

    #[test]
    fn test_platform_substitution_replaces() {
        let mut blas = DependencyDecl::new("accelerate", RequirementKind::Always);
        blas.substitutes.push(Substitution {
            platform: Condition::Os(OsFamily::Macos).negate(),
            name: "openblas".to_string(),
        });
        let decls = vec![blas];

        let linux = PlatformInfo::linux();
        let cfg = config(&decls, &[], &Overrides::new(), &linux);
        let set = build(&decls, &[], &cfg, &linux);
        assert_eq!(set.names(), vec!["openblas"]);
        assert_eq!(set.get("openblas").unwrap().declared_as, vec!["accelerate"]);

        let mac = PlatformInfo::macos(OsVersion::new(10, 13));
        let cfg = config(&decls, &[], &Overrides::new(), &mac);
        assert_eq!(build(&decls, &[], &cfg, &mac).names(), vec!["accelerate"]);
    }

    #[test]
    fn test_platform_predicate_excludes() {
        let mut python = DependencyDecl::new("python", RequirementKind::Recommended);
        python.platform = Some(Condition::All(vec![
            Condition::Os(OsFamily::Macos),
            Condition::OsVersionAbove(OsVersion::new(10, 6)),
        ]).negate());
        let decls = vec![python];

        let linux = PlatformInfo::linux();
        let cfg = config(&decls, &[], &Overrides::new(), &linux);
        assert!(build(&decls, &[], &cfg, &linux).contains("python"));

        let mac = PlatformInfo::macos(OsVersion::new(10, 13));
        let cfg = config(&decls, &[], &Overrides::new(), &mac);
        assert!(build(&decls, &[], &cfg, &mac).is_empty());
    }

    #[test]
    fn test_multi_selection_reported_not_resolved() {
        let decls = vec![
            DependencyDecl::new("jpeg", RequirementKind::Optional),
            DependencyDecl::new("jpeg-turbo", RequirementKind::Optional),
        ];
        let alternatives = vec![Alternative {
            capability: "jpeg".to_string(),
            providers: vec!["jpeg".to_string(), "jpeg-turbo".to_string()],
            fallback: Some("BUILD_JPEG".to_string()),
        }];
        let linux = PlatformInfo::linux();

        let cfg = config(&decls, &[], &Overrides::new().with("jpeg"), &linux);
        let set = build(&decls, &alternatives, &cfg, &linux);
        assert!(set.capability_selections().is_empty());
        assert_eq!(set.selections()[0].selected, vec!["jpeg"]);

        let overrides = Overrides::new().with("jpeg").with("jpeg-turbo");
        let cfg = config(&decls, &[], &overrides, &linux);
        let set = build(&decls, &alternatives, &cfg, &linux);
        assert_eq!(set.len(), 2);
        let multi = set.capability_selections();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].selected, vec!["jpeg", "jpeg-turbo"]);
    }

    #[test]
    fn test_stage_merge_prefers_run() {
        let mut build_only = DependencyDecl::new("python", RequirementKind::Always);
        build_only.stage = DependencyStage::Build;
        let decls = vec![build_only, DependencyDecl::new("python", RequirementKind::Always)];
        let linux = PlatformInfo::linux();
        let cfg = config(&decls, &[], &Overrides::new(), &linux);
        let set = build(&decls, &[], &cfg, &linux);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("python").unwrap().stage, DependencyStage::Run);
    }
}
