// src/kitchen/invoker.rs

//! Build Tool Invoker: runs configure, make and install

use crate::arguments::ArgumentList;
use crate::error::{BuildToolError, ConfigurationError, Error, Result};
use crate::recipe::BuildSection;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Build tool phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum BuildPhase {
    Configure,
    Make,
    Install,
}

/// Captured output of one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutput {
    pub phase: BuildPhase,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the external configure/compile/install sequence
pub trait BuildToolInvoker {
    /// Run every phase in `workdir`, stopping at the first failure
    fn invoke(
        &self,
        build: &BuildSection,
        arguments: &ArgumentList,
        workdir: &Path,
    ) -> Result<Vec<PhaseOutput>>;
}

/// Invokes cmake and make as child processes with a per-phase timeout
#[derive(Debug, Clone)]
pub struct CmakeInvoker {
    timeout: Duration,
    jobs: u32,
}

impl CmakeInvoker {
    pub fn new(timeout: Duration, jobs: u32) -> Self {
        Self { timeout, jobs }
    }

    /// Command line for a phase; configure gets the synthesized arguments
    pub fn command_line(
        build: &BuildSection,
        arguments: &ArgumentList,
        phase: BuildPhase,
    ) -> Vec<String> {
        match phase {
            BuildPhase::Configure => {
                let mut cmd = build.configure.clone();
                cmd.extend(arguments.to_cmake_args());
                cmd
            }
            BuildPhase::Make => build.make.clone(),
            BuildPhase::Install => build.install.clone(),
        }
    }

    fn run_phase(
        &self,
        phase: BuildPhase,
        cmd: &[String],
        env: &BTreeMap<String, String>,
        workdir: &Path,
    ) -> Result<PhaseOutput> {
        let Some((program, args)) = cmd.split_first() else {
            return Err(ConfigurationError::Invalid(format!("empty {} command", phase)).into());
        };

        info!("Running {} phase", phase);
        debug!("Command: {}", cmd.join(" "));

        // Output goes to files so a chatty build cannot fill a pipe while
        // we wait on it
        let stdout_path = workdir.join(format!(".pantry-{}.out", phase));
        let stderr_path = workdir.join(format!(".pantry-{}.err", phase));

        let mut child = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .envs(env)
            .env("MAKEFLAGS", format!("-j{}", self.jobs))
            .stdin(Stdio::null())
            .stdout(File::create(&stdout_path)?)
            .stderr(File::create(&stderr_path)?)
            .spawn()
            .map_err(|e| Error::IoError(format!("Failed to spawn '{}': {}", program, e)))?;

        let (code, timed_out) = match child.wait_timeout(self.timeout)? {
            Some(status) => (status.code(), false),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                warn!(
                    "{} phase timed out after {} seconds",
                    phase,
                    self.timeout.as_secs()
                );
                (None, true)
            }
        };

        let output = PhaseOutput {
            phase,
            code,
            stdout: read_lossy(&stdout_path),
            stderr: read_lossy(&stderr_path),
        };
        let _ = fs::remove_file(&stdout_path);
        let _ = fs::remove_file(&stderr_path);

        if timed_out || code != Some(0) {
            return Err(BuildToolError {
                phase: phase.to_string(),
                code,
                timed_out,
                stderr: output.stderr,
            }
            .into());
        }

        Ok(output)
    }
}

impl BuildToolInvoker for CmakeInvoker {
    fn invoke(
        &self,
        build: &BuildSection,
        arguments: &ArgumentList,
        workdir: &Path,
    ) -> Result<Vec<PhaseOutput>> {
        let mut outputs = Vec::new();
        for phase in [BuildPhase::Configure, BuildPhase::Make, BuildPhase::Install] {
            let cmd = Self::command_line(build, arguments, phase);
            outputs.push(self.run_phase(phase, &cmd, arguments.environment(), workdir)?);
        }
        Ok(outputs)
    }
}

fn read_lossy(path: &Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
