// src/lib.rs

//! Pantry: declarative package build recipes
//!
//! A recipe declares a package's build options, dependencies, conflict
//! rules and how the resolved state maps onto build-tool arguments.
//! Pantry turns a recipe plus user flags into a validated build plan and
//! can cook that plan into an install prefix.
//!
//! # Architecture
//!
//! - Options: registry of live options and deprecated aliases, resolved
//!   against user overrides and the platform
//! - Dependencies: effective dependency set with kind dominance and
//!   platform substitutions
//! - Conflicts: rules checked before anything touches the filesystem
//! - Arguments: deterministic argument, environment and edit synthesis
//! - Kitchen: fetch, unpack, configure, build and install a plan

pub mod arguments;
pub mod condition;
pub mod config;
pub mod conflicts;
pub mod dependencies;
pub mod error;
pub mod kitchen;
pub mod options;
pub mod pipeline;
pub mod platform;
pub mod recipe;

pub use arguments::ArgumentList;
pub use config::Settings;
pub use dependencies::{DependencyLocation, DependencyLocator, DependencySet};
pub use error::{Error, ErrorClass, Result};
pub use kitchen::{CookResult, Kitchen, KitchenConfig};
pub use options::{OptionRegistry, Overrides, ResolvedConfiguration};
pub use pipeline::{plan, validate, BuildPlan};
pub use platform::{OsFamily, OsVersion, PlatformInfo};
pub use recipe::Recipe;
