// src/platform.rs

//! Platform information for option gating and argument synthesis
//!
//! A `PlatformInfo` is the read-only view of the target machine that the
//! resolution pipeline consults: OS family, OS release, CPU architecture
//! and (where known) the toolchain build version. Tests construct it
//! directly; the CLI uses `PlatformInfo::detect()`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Command;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Operating system family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Macos,
    Freebsd,
    Windows,
    Other,
}

impl OsFamily {
    /// Map `std::env::consts::OS` onto a family
    pub fn from_consts(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" => Self::Macos,
            "freebsd" => Self::Freebsd,
            "windows" => Self::Windows,
            _ => Self::Other,
        }
    }
}

/// Major.minor OS release, e.g. `10.13`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
}

impl OsVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for OsVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('.');
        let parse = |part: Option<&str>| -> Result<u32> {
            match part {
                None | Some("") => Ok(0),
                Some(p) => p
                    .parse()
                    .map_err(|_| Error::ParseError(format!("Invalid OS version: {}", s))),
            }
        };
        let major = match parts.next() {
            Some(p) if !p.is_empty() => parse(Some(p))?,
            _ => return Err(Error::ParseError(format!("Invalid OS version: {}", s))),
        };
        let minor = parse(parts.next())?;
        Ok(Self { major, minor })
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for OsVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OsVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Read-only description of the build machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: OsFamily,
    #[serde(default)]
    pub os_version: Option<OsVersion>,
    pub arch: String,
    /// Compiler build number (Apple clang reports e.g. `clang-1000.11.45`)
    #[serde(default)]
    pub toolchain_version: Option<u32>,
}

impl PlatformInfo {
    /// Create a platform with no version information
    pub fn new(os: OsFamily, arch: impl Into<String>) -> Self {
        Self {
            os,
            os_version: None,
            arch: arch.into(),
            toolchain_version: None,
        }
    }

    pub fn linux() -> Self {
        Self::new(OsFamily::Linux, "x86_64")
    }

    pub fn macos(version: OsVersion) -> Self {
        Self::new(OsFamily::Macos, "x86_64").with_os_version(version)
    }

    pub fn with_os_version(mut self, version: OsVersion) -> Self {
        self.os_version = Some(version);
        self
    }

    pub fn with_toolchain_version(mut self, version: u32) -> Self {
        self.toolchain_version = Some(version);
        self
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Detect the platform from the current environment
    pub fn detect() -> Self {
        let os = OsFamily::from_consts(std::env::consts::OS);
        let mut platform = Self::new(os, std::env::consts::ARCH);

        if os == OsFamily::Macos {
            platform.os_version = command_output("sw_vers", &["-productVersion"])
                .and_then(|v| v.parse().ok());
        }
        platform.toolchain_version = detect_clang_build_version();

        debug!(
            "Detected platform: {} {} (os version {:?}, toolchain {:?})",
            platform.os, platform.arch, platform.os_version, platform.toolchain_version
        );
        platform
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.os)?;
        if let Some(version) = self.os_version {
            write!(f, " {}", version)?;
        }
        write!(f, " ({})", self.arch)
    }
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let path = which::which(program).ok()?;
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn detect_clang_build_version() -> Option<u32> {
    let version = command_output("clang", &["--version"])?;
    parse_clang_build_version(&version)
}

/// Extract the build number from `clang --version` output
///
/// Only Apple clang reports one (`Apple LLVM version 9.0.0 (clang-900.0.39.2)`).
pub fn parse_clang_build_version(output: &str) -> Option<u32> {
    let start = output.find("(clang-")? + "(clang-".len();
    let digits: String = output[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
