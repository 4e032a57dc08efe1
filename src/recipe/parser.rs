// src/recipe/parser.rs

//! Recipe file parsing and static validation

use crate::condition::Condition;
use crate::error::{ConfigurationError, Error, Result};
use crate::options::OptionRegistry;
use crate::recipe::format::Recipe;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::ParseError(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read recipe file: {}", e)))?;

    parse_recipe(&content)
}

/// Validate a recipe for completeness and correctness
///
/// Registry invariants and predicate references are errors; missing
/// metadata is returned as warnings.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    if recipe.package.name.is_empty() {
        return Err(Error::ParseError("Recipe package name cannot be empty".to_string()));
    }
    if recipe.package.version.is_empty() {
        return Err(Error::ParseError("Recipe package version cannot be empty".to_string()));
    }
    check_checksum(&recipe.source.checksum)?;

    let registry = recipe.registry()?;

    for option in &recipe.options {
        platform_only(option.platform.as_ref(), &format!("option '{}'", option.id))?;
    }

    for dep in &recipe.dependencies {
        let context = format!("dependency '{}'", dep.name);
        known_options(&registry, dep.when.as_ref(), &context)?;
        platform_only(dep.platform.as_ref(), &context)?;
        for sub in &dep.substitutes {
            platform_only(Some(&sub.platform), &context)?;
        }
    }

    for rule in &recipe.conflicts {
        let context = format!("conflict '{}'", rule.id);
        if rule.exclusive.is_empty() && rule.when.is_none() {
            return Err(ConfigurationError::Invalid(format!(
                "{} needs 'exclusive' or 'when'",
                context
            ))
            .into());
        }
        if rule.exclusive.len() == 1 {
            return Err(ConfigurationError::Invalid(format!(
                "{} lists a single exclusive option",
                context
            ))
            .into());
        }
        for id in rule.referenced_options() {
            known_option(&registry, id, &context)?;
        }
    }

    for alternative in &recipe.alternatives {
        for provider in &alternative.providers {
            if !recipe.dependencies.iter().any(|d| &d.name == provider) {
                return Err(ConfigurationError::Invalid(format!(
                    "alternative '{}' names undeclared provider '{}'",
                    alternative.capability, provider
                ))
                .into());
            }
        }
    }

    for mapping in &recipe.arguments {
        let context = format!("argument '{}'", mapping.key);
        mapping.form()?;
        if let Some(owner) = mapping.owner() {
            known_option(&registry, owner, &context)?;
        }
        if let Some(id) = &mapping.choice
            && registry.get(id).is_some_and(|o| o.choices.is_empty())
        {
            return Err(ConfigurationError::Invalid(format!(
                "{} selects a value from flag option '{}'",
                context, id
            ))
            .into());
        }
        known_options(&registry, mapping.when.as_ref(), &context)?;
        platform_only(mapping.platform.as_ref(), &context)?;
    }

    for variable in &recipe.variables {
        let context = format!("variable '{}'", variable.name);
        known_options(&registry, variable.when.as_ref(), &context)?;
        platform_only(variable.platform.as_ref(), &context)?;
    }

    for entry in &recipe.environment {
        let context = format!("environment '{}'", entry.name);
        known_options(&registry, entry.when.as_ref(), &context)?;
        platform_only(entry.platform.as_ref(), &context)?;
    }

    for resource in &recipe.resources {
        check_checksum(&resource.checksum)?;
        known_options(
            &registry,
            resource.when.as_ref(),
            &format!("resource '{}'", resource.name),
        )?;
    }

    if recipe.package.summary.is_none() {
        warnings.push("Missing package summary".to_string());
    }
    if recipe.package.license.is_none() {
        warnings.push("Missing package license".to_string());
    }
    if recipe.arguments.is_empty() {
        warnings.push("No build arguments declared".to_string());
    }

    Ok(warnings)
}

fn check_checksum(checksum: &str) -> Result<()> {
    match checksum.split_once(':') {
        Some(("sha256", hash)) if !hash.is_empty() => Ok(()),
        _ => Err(Error::ParseError(format!(
            "Invalid checksum format: {}. Expected sha256:...",
            checksum
        ))),
    }
}

fn known_option(registry: &OptionRegistry, id: &str, context: &str) -> Result<()> {
    if registry.contains(id) {
        Ok(())
    } else {
        Err(ConfigurationError::UnknownReference {
            context: context.to_string(),
            option: id.to_string(),
        }
        .into())
    }
}

fn known_options(
    registry: &OptionRegistry,
    condition: Option<&Condition>,
    context: &str,
) -> Result<()> {
    let Some(condition) = condition else {
        return Ok(());
    };
    for id in condition.referenced_options() {
        known_option(registry, id, context)?;
    }
    Ok(())
}

fn platform_only(condition: Option<&Condition>, context: &str) -> Result<()> {
    let Some(condition) = condition else {
        return Ok(());
    };
    match condition.referenced_options().first() {
        Some(id) => Err(ConfigurationError::OptionInPlatformPredicate {
            context: context.to_string(),
            option: id.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"
[package]
name = "test"
version = "1.0"
summary = "Test package"
license = "MIT"

[source]
archive = "https://example.com/test-1.0.tar.gz"
checksum = "sha256:abc123"

[[option]]
id = "qt"

[[argument]]
key = "WITH_QT"
switch = "qt"
"#;

    fn validate(extra: &str) -> Result<Vec<String>> {
        let recipe = parse_recipe(&format!("{}{}", HEADER, extra))?;
        validate_recipe(&recipe)
    }

    #[test]
    fn test_parse_valid_recipe() {
        let recipe = parse_recipe(HEADER).unwrap();
        assert_eq!(recipe.package.name, "test");
        assert!(validate_recipe(&recipe).unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_recipe() {
        let content = "this is not valid toml at all {}";
        assert!(parse_recipe(content).is_err());
    }

    #[test]
    fn test_validate_empty_name() {
        let content = r#"
[package]
name = ""
version = "1.0"

[source]
archive = "https://example.com/test.tar.gz"
checksum = "sha256:abc"
"#;

        let recipe = parse_recipe(content).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_bad_checksum() {
        let content = r#"
[package]
name = "test"
version = "1.0"

[source]
archive = "https://example.com/test.tar.gz"
checksum = "md5:abc123"
"#;

        let recipe = parse_recipe(content).unwrap();
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_warnings() {
        let content = r#"
[package]
name = "test"
version = "1.0"

[source]
archive = "https://example.com/test.tar.gz"
checksum = "sha256:abc"
"#;

        let recipe = parse_recipe(content).unwrap();
        let warnings = validate_recipe(&recipe).unwrap();
        assert!(warnings.iter().any(|w| w.contains("summary")));
        assert!(warnings.iter().any(|w| w.contains("license")));
        assert!(warnings.iter().any(|w| w.contains("arguments")));
    }

    #[test]
    fn test_unknown_reference_in_condition() {
        let err = validate(
            r#"
[[dependency]]
name = "ant"
when = { enabled = "java" }
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::UnknownReference { ref option, .. })
                if option == "java"
        ));
    }

    #[test]
    fn test_implicit_option_is_known() {
        let warnings = validate(
            r#"
[[dependency]]
name = "java"
kind = "optional"

[[dependency]]
name = "ant"
when = { enabled = "java" }
"#,
        )
        .unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_platform_predicate_must_not_read_options() {
        let err = validate(
            r#"
[[argument]]
key = "WITH_QUICKTIME"
value = "ON"
platform = { all = [{ os = "macos" }, { enabled = "qt" }] }
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::OptionInPlatformPredicate { .. })
        ));
    }

    #[test]
    fn test_dangling_alias() {
        let err = validate(
            r#"
[[deprecated]]
alias = "qt5"
superseded_by = "qt6"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::DanglingAlias { .. })
        ));
    }

    #[test]
    fn test_alternative_provider_must_be_declared() {
        let result = validate(
            r#"
[[alternative]]
capability = "jpeg"
providers = ["jpeg", "jpeg-turbo"]
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_conflict_rule_shape() {
        assert!(validate("[[conflict]]\nid = \"empty\"\n").is_err());
        assert!(validate("[[conflict]]\nid = \"one\"\nexclusive = [\"qt\"]\n").is_err());
    }

    #[test]
    fn test_argument_form_checked() {
        let result = validate(
            r#"
[[argument]]
key = "WITH_GL"
switch = "qt"
value = "ON"
"#,
        );
        assert!(result.is_err());
    }
}
