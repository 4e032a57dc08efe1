// src/kitchen/cook.rs

//! Cook: the actual build execution for a single plan

use crate::error::{Error, Result};
use crate::pipeline::BuildPlan;
use crate::recipe::{filename_from_url, Recipe};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, info};

use super::archive::{apply_edit, extract_archive, unpacked_root};
use super::{CookResult, Kitchen, PhaseOutput};

/// A single cook operation
pub(super) struct Cook<'a> {
    kitchen: &'a Kitchen,
    recipe: &'a Recipe,
    plan: &'a BuildPlan,
    /// Temporary build directory
    build_dir: TempDir,
    /// Source directory within build_dir
    source_dir: PathBuf,
    /// Archives copied into build_dir: main source first, then resources
    archives: Vec<PathBuf>,
    install_prefix: PathBuf,
    /// Build log accumulator
    log: String,
    warnings: Vec<String>,
}

impl<'a> Cook<'a> {
    pub(super) fn new(kitchen: &'a Kitchen, recipe: &'a Recipe, plan: &'a BuildPlan) -> Result<Self> {
        let build_dir = TempDir::new()
            .map_err(|e| Error::IoError(format!("Failed to create build directory: {}", e)))?;

        let source_dir = build_dir.path().join("source");
        fs::create_dir_all(&source_dir)?;

        let install_prefix = kitchen
            .config
            .install_prefix(plan.package(), plan.version());

        Ok(Self {
            kitchen,
            recipe,
            plan,
            build_dir,
            source_dir,
            archives: Vec::new(),
            install_prefix,
            log: String::new(),
            warnings: plan.warnings().iter().map(|w| w.to_string()).collect(),
        })
    }

    /// Phase 1: Prep - fetch all sources
    pub(super) fn prep(&mut self) -> Result<()> {
        let archive_url = self.recipe.archive_url();
        let archive_path = self
            .kitchen
            .fetch_source(&archive_url, &self.recipe.source.checksum)?;

        // Copied under the original name so extraction can tell the format
        let local_archive = self.build_dir.path().join(self.recipe.archive_filename());
        fs::copy(&archive_path, &local_archive)?;
        self.archives.push(local_archive);
        self.log_line(&format!("Fetched source: {}", archive_url));

        let plan = self.plan;
        for resource in plan.resources() {
            let url = self.recipe.substitute(&resource.url);
            let path = self.kitchen.fetch_source(&url, &resource.checksum)?;
            let filename = format!(
                "{}-{}",
                resource.name,
                filename_from_url(&url, "resource.tar.gz")
            );
            let local_path = self.build_dir.path().join(filename);
            fs::copy(&path, &local_path)?;
            self.archives.push(local_path);
            self.log_line(&format!("Fetched resource {}: {}", resource.name, url));
        }

        Ok(())
    }

    /// Phase 2: Unpack sources and stage resources
    pub(super) fn unpack(&mut self) -> Result<()> {
        let Some(main) = self.archives.first().cloned() else {
            return Err(Error::NotFound("Source archive was not fetched".to_string()));
        };

        extract_archive(&main, &self.source_dir)?;
        self.source_dir = unpacked_root(&self.source_dir)?;
        debug!("Source directory: {}", self.source_dir.display());
        self.log_line(&format!("Extracted source to {}", self.source_dir.display()));

        let plan = self.plan;
        let staging_root = self.build_dir.path().join("resources");
        let resource_archives: Vec<PathBuf> = self.archives.iter().skip(1).cloned().collect();
        for (resource, archive) in plan.resources().iter().zip(&resource_archives) {
            let staging = staging_root.join(&resource.name);
            fs::create_dir_all(&staging)?;
            extract_archive(archive, &staging)?;

            let target = self.source_dir.join(resource.stage_dir());
            if target.exists() {
                return Err(Error::IoError(format!(
                    "Cannot stage resource {}: {} already exists",
                    resource.name,
                    target.display()
                )));
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::rename(unpacked_root(&staging)?, &target)?;

            info!("Staged resource {} into {}", resource.name, resource.stage_dir());
            self.log_line(&format!("Staged resource {} to {}", resource.name, target.display()));
        }

        Ok(())
    }

    /// Phase 3: Apply source edits
    pub(super) fn edit(&mut self) -> Result<()> {
        let plan = self.plan;
        for edit in plan.arguments().edits() {
            apply_edit(&self.source_dir, edit)?;
            self.log_line(&format!("Edited {}: '{}' -> '{}'", edit.file, edit.from, edit.to));
        }
        Ok(())
    }

    /// Phase 4: Simmer - run the build
    ///
    /// Returns the rendered arguments passed to configure.
    pub(super) fn simmer(&mut self) -> Result<Vec<String>> {
        let arguments = self
            .plan
            .arguments()
            .render(&self.source_dir, &self.install_prefix);

        let workdir = self.source_dir.join(&self.recipe.build.build_dir);
        fs::create_dir_all(&workdir)?;

        for (name, value) in arguments.environment() {
            self.log_line(&format!("env {}={}", name, value));
        }

        let outputs = self
            .kitchen
            .invoker()
            .invoke(&self.recipe.build, &arguments, &workdir)?;

        for output in &outputs {
            self.log_build_output(output);
        }

        Ok(arguments.to_cmake_args())
    }

    pub(super) fn finish(self, arguments: Vec<String>) -> Result<CookResult> {
        let build_dir = if self.kitchen.config.keep_builddir {
            let path = self.build_dir.keep();
            info!("Keeping build directory: {}", path.display());
            Some(path)
        } else {
            None
        };

        info!("Cooked: {} into {}", self.plan.package(), self.install_prefix.display());

        Ok(CookResult {
            install_prefix: self.install_prefix,
            build_dir,
            arguments,
            log: self.log,
            warnings: self.warnings,
        })
    }

    fn log_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }

    /// Log build step output (stdout/stderr) with a phase header
    fn log_build_output(&mut self, output: &PhaseOutput) {
        self.log_line(&format!("=== {} ===", output.phase));
        if !output.stdout.is_empty() {
            self.log.push_str(&output.stdout);
            self.log.push('\n');
        }
        if !output.stderr.is_empty() {
            self.log.push_str(&output.stderr);
            self.log.push('\n');
        }
    }
}
