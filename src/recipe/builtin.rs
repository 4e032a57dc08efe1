// src/recipe/builtin.rs

//! Recipes bundled into the binary

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::recipe::parser::parse_recipe;

const BUILTIN: &[(&str, &str)] = &[("opencv", include_str!("../../recipes/opencv.toml"))];

/// Names of bundled recipes
pub fn builtin_recipe_names() -> Vec<&'static str> {
    BUILTIN.iter().map(|(name, _)| *name).collect()
}

/// Parse a bundled recipe by name
pub fn builtin_recipe(name: &str) -> Result<Recipe> {
    let (_, content) = BUILTIN
        .iter()
        .find(|(n, _)| *n == name)
        .ok_or_else(|| Error::NotFound(format!("No bundled recipe named '{}'", name)))?;
    parse_recipe(content)
}
