// src/recipe/mod.rs

//! Recipe system: declarative build specifications
//!
//! A recipe declares everything the resolution pipeline needs:
//! - Source archive and auxiliary resources with their checksums
//! - Build options, their defaults and deprecated aliases
//! - Dependencies (always, recommended, optional, conditional)
//! - Conflict rules and alternative provider groups
//! - How resolved state maps onto build-tool arguments
//!
//! # Example Recipe
//!
//! ```toml
//! [package]
//! name = "widget"
//! version = "2.1"
//!
//! [source]
//! archive = "https://example.com/widget-%(version)s.tar.gz"
//! checksum = "sha256:abc123..."
//!
//! [[option]]
//! id = "qt"
//! description = "Build the Qt backend"
//!
//! [[dependency]]
//! name = "qt"
//! kind = "optional"
//!
//! [[argument]]
//! key = "WITH_QT"
//! switch = "qt"
//! ```

mod builtin;
mod format;
pub mod parser;

pub use builtin::{builtin_recipe, builtin_recipe_names};
pub use format::{
    BuildSection, GeneratorArg, PackageSection, Recipe, ResourceDecl, SourceSection,
};
pub(crate) use format::filename_from_url;
pub use parser::{parse_recipe, parse_recipe_file, validate_recipe};
