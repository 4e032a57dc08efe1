// src/commands/mod.rs
//! Command handlers for the pantry CLI

mod check;
mod cook;
mod deps;
mod options;
mod plan;

pub use check::cmd_check;
pub use cook::{cmd_cook, CookArgs};
pub use deps::cmd_deps;
pub use options::cmd_options;
pub use plan::cmd_plan;

use crate::cli::{PlatformArgs, Target};
use anyhow::{Context, Result};
use pantry::config::Settings;
use pantry::error::ConfigurationError;
use pantry::options::{OptionRegistry, Overrides};
use pantry::platform::{OsFamily, PlatformInfo};
use pantry::recipe::{builtin_recipe, builtin_recipe_names, parse_recipe_file, Recipe};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Everything a command needs before the pipeline runs
pub struct Session {
    pub recipe: Recipe,
    pub overrides: Overrides,
    pub platform: PlatformInfo,
    pub settings: Settings,
}

impl Session {
    /// Load settings and recipe, detect the platform and collect overrides
    pub fn open(target: &Target, config: Option<&Path>) -> Result<Self> {
        let settings = Settings::discover(config)?;
        let recipe = load_recipe(&target.recipe)?;
        let platform = platform_from_args(&target.platform);
        let registry = recipe.registry()?;
        let overrides = build_overrides(&registry, &settings, &target.flags, &target.set)?;
        debug!("Platform: {}", platform);

        Ok(Self {
            recipe,
            overrides,
            platform,
            settings,
        })
    }
}

/// A path to a recipe file, or the name of a bundled recipe
pub fn load_recipe(name_or_path: &str) -> Result<Recipe> {
    let path = Path::new(name_or_path);
    if path.exists() || name_or_path.ends_with(".toml") {
        let recipe = parse_recipe_file(path)
            .with_context(|| format!("Failed to parse recipe: {}", path.display()))?;
        return Ok(recipe);
    }
    builtin_recipe(name_or_path).with_context(|| {
        format!("Bundled recipes: {}", builtin_recipe_names().join(", "))
    })
}

/// Detected platform with command-line overrides applied
pub fn platform_from_args(args: &PlatformArgs) -> PlatformInfo {
    let mut platform = PlatformInfo::detect();
    if let Some(os) = args.os {
        platform.os = os;
        // A detected version belongs to the detected OS
        if os != OsFamily::from_consts(std::env::consts::OS) {
            platform.os_version = None;
            platform.toolchain_version = None;
        }
    }
    if let Some(version) = args.os_version {
        platform = platform.with_os_version(version);
    }
    if let Some(arch) = &args.arch {
        platform = platform.with_arch(arch.clone());
    }
    if let Some(build) = args.toolchain_version {
        platform = platform.with_toolchain_version(build);
    }
    platform
}

/// Settings file options first, then positional flags, then `--set`
///
/// Settings entries the recipe does not know are skipped, since one
/// settings file serves every recipe. Unknown command-line ids fail here,
/// before any resolution stage runs.
pub fn build_overrides(
    registry: &OptionRegistry,
    settings: &Settings,
    flags: &[String],
    set: &[String],
) -> Result<Overrides> {
    let mut overrides = Overrides::new();
    for (id, value) in settings.options.iter() {
        if registry.lookup(id).is_some() {
            overrides.set(id, value.clone());
        } else {
            debug!("Ignoring setting for unknown option '{}'", id);
        }
    }

    let mut command_line = Overrides::new();
    for flag in flags {
        command_line.apply_flag(flag)?;
    }
    for assignment in set {
        if !assignment.contains('=') {
            return Err(pantry::Error::from(ConfigurationError::Invalid(format!(
                "invalid --set '{}': expected ID=VALUE",
                assignment
            )))
            .into());
        }
        command_line.apply_flag(assignment)?;
    }
    for (id, _) in command_line.iter() {
        if registry.lookup(id).is_none() {
            return Err(pantry::Error::from(ConfigurationError::UnknownOption(id.to_string())).into());
        }
    }

    overrides.merge(&command_line);
    Ok(overrides)
}

/// Pretty-print a value as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry::options::OptionValue;

    fn registry() -> OptionRegistry {
        load_recipe("opencv").unwrap().registry().unwrap()
    }

    #[test]
    fn test_command_line_wins_over_settings() {
        let settings =
            Settings::parse("[options]\nqt = true\npython = true\ngtk = true\n").unwrap();
        let overrides = build_overrides(
            &registry(),
            &settings,
            &["without-qt".to_string()],
            &["cuda-generation=Kepler".to_string()],
        )
        .unwrap();

        assert_eq!(overrides.get("qt"), Some(&OptionValue::Bool(false)));
        assert_eq!(overrides.get("python"), Some(&OptionValue::Bool(true)));
        assert_eq!(overrides.get("gtk"), None);
        assert_eq!(
            overrides.get("cuda-generation"),
            Some(&OptionValue::Choice("Kepler".to_string()))
        );
    }

    #[test]
    fn test_set_requires_value() {
        let result = build_overrides(&registry(), &Settings::default(), &[], &["qt".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = build_overrides(
            &registry(),
            &Settings::default(),
            &["with-gtk".to_string()],
            &[],
        )
        .unwrap_err();
        let class = err.downcast_ref::<pantry::Error>().map(|e| e.class());
        assert_eq!(class, Some(pantry::ErrorClass::Configuration));
    }

    #[test]
    fn test_commands_reject_unknown_option_reference() {
        let text = r#"
[package]
name = "gizmo"
version = "1.0"

[source]
archive = "https://example.com/gizmo-%(version)s.tar.gz"
checksum = "sha256:00"

[[option]]
id = "python"

[[option]]
id = "python3"

[[conflict]]
id = "python-bindings"
exclusive = ["python", "pyhton3"]

[[argument]]
key = "BUILD_opencv_python3"
switch = "python3"
"#;
        let session = Session {
            recipe: pantry::recipe::parse_recipe(text).unwrap(),
            overrides: Overrides::new().with("python3"),
            platform: PlatformInfo::linux(),
            settings: Settings::default(),
        };

        for result in [
            cmd_plan(&session, true),
            cmd_deps(&session, true),
            cmd_check(&session, true),
        ] {
            let err = result.unwrap_err();
            let class = err.downcast_ref::<pantry::Error>().map(|e| e.class());
            assert_eq!(class, Some(pantry::ErrorClass::Configuration));
            assert!(format!("{:#}", err).contains("pyhton3"));
        }
    }

    #[test]
    fn test_load_bundled_recipe() {
        let recipe = load_recipe("opencv").unwrap();
        assert_eq!(recipe.package.name, "opencv");
        assert!(load_recipe("no-such-recipe").is_err());
    }
}
