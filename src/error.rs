// src/error.rs

//! Error types for recipe resolution and cooking
//!
//! Four error classes are fatal to a build invocation and map to distinct
//! exit codes: configuration, conflict, dependency resolution, and build
//! tool failures. Everything else (I/O, parsing, downloads) is reported as
//! a generic failure.

use std::fmt;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Bad or unknown option, or a recipe whose option registry is inconsistent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Option id is neither a live option nor a deprecated alias
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    /// Override value has the wrong shape for the option
    #[error("invalid value '{value}' for option '{option}': {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },

    /// Two live options share an id
    #[error("option '{0}' is declared more than once")]
    DuplicateOption(String),

    /// Deprecated alias does not name exactly one live option
    #[error("deprecated option '{alias}' must resolve to a live option, found '{target}'")]
    DanglingAlias { alias: String, target: String },

    /// A predicate refers to an option the registry does not declare
    #[error("{context} references unknown option '{option}'")]
    UnknownReference { context: String, option: String },

    /// A platform predicate refers to option state
    #[error("{context}: platform predicate may not reference option '{option}'")]
    OptionInPlatformPredicate { context: String, option: String },

    /// Any other structural problem in a recipe
    #[error("{0}")]
    Invalid(String),
}

/// Mutually exclusive selection detected before any build action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (rule '{rule}': {})", .options.join(", "))]
pub struct ConflictError {
    /// Id of the violated rule (or the contested build flag)
    pub rule: String,
    /// Human-readable diagnostic
    pub message: String,
    /// Options or providers involved in the conflict
    pub options: Vec<String>,
}

impl ConflictError {
    pub fn new(rule: impl Into<String>, message: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
            options,
        }
    }
}

/// Dependency is not present on the system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency '{name}' is not installed")]
pub struct NotInstalledError {
    pub name: String,
}

impl NotInstalledError {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Required dependency absent or unlocatable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyResolutionError {
    #[error(transparent)]
    NotInstalled(#[from] NotInstalledError),

    /// Located, but the path a template needs is missing
    #[error("dependency '{dependency}' has no {path} path (needed by {key})")]
    MissingPath {
        dependency: String,
        path: String,
        key: String,
    },
}

impl DependencyResolutionError {
    /// Name of the dependency that failed to resolve
    pub fn dependency(&self) -> &str {
        match self {
            Self::NotInstalled(e) => &e.name,
            Self::MissingPath { dependency, .. } => dependency,
        }
    }
}

/// External build tool exited unsuccessfully
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct BuildToolError {
    pub phase: String,
    pub code: Option<i32>,
    pub timed_out: bool,
    pub stderr: String,
}

impl fmt::Display for BuildToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} phase failed with exit code ", self.phase)?;
        match self.code {
            Some(code) => write!(f, "{}", code)?,
            None => write!(f, "none")?,
        }
        if self.timed_out {
            write!(f, " (timed out)")?;
        }
        Ok(())
    }
}

/// Diagnostic class of an error, one per exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorClass {
    Configuration,
    Conflict,
    DependencyResolution,
    BuildTool,
    Other,
}

impl ErrorClass {
    /// Process exit code for this class
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::Conflict => 3,
            Self::DependencyResolution => 4,
            Self::BuildTool => 5,
            Self::Other => 1,
        }
    }
}

/// Top-level error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("dependency resolution failed: {0}")]
    DependencyResolution(#[from] DependencyResolutionError),

    #[error("build tool failed: {0}")]
    BuildTool(#[from] BuildToolError),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("download failed: {0}")]
    DownloadError(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Diagnostic class used for exit codes and message prefixes
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration(_) => ErrorClass::Configuration,
            Self::Conflict(_) => ErrorClass::Conflict,
            Self::DependencyResolution(_) => ErrorClass::DependencyResolution,
            Self::BuildTool(_) => ErrorClass::BuildTool,
            _ => ErrorClass::Other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<NotInstalledError> for Error {
    fn from(e: NotInstalledError) -> Self {
        Self::DependencyResolution(e.into())
    }
}
