// src/kitchen/mod.rs

//! Kitchen: the install orchestrator for validated build plans
//!
//! The Kitchen takes a `BuildPlan` (which only the validating pipeline can
//! produce) and carries it out:
//! - Fetching the source archive and the resources the plan selected
//! - Extracting sources and staging resources into the source tree
//! - Applying in-place source edits
//! - Running configure, make and install through a `BuildToolInvoker`

mod archive;
mod config;
mod cook;
mod invoker;

pub use archive::{
    CurlFetcher, ResourceFetcher, apply_edit, extract_archive, sha256_file, verify_file_checksum,
};
pub use config::{CookResult, KitchenConfig};
pub use invoker::{BuildPhase, BuildToolInvoker, CmakeInvoker, PhaseOutput};

use crate::error::{ConfigurationError, Result};
use crate::pipeline::BuildPlan;
use crate::recipe::Recipe;
use cook::Cook;
use std::path::PathBuf;
use tracing::info;

/// The Kitchen: where plans are cooked
pub struct Kitchen {
    pub(crate) config: KitchenConfig,
    fetcher: Box<dyn ResourceFetcher>,
    invoker: Box<dyn BuildToolInvoker>,
}

impl Kitchen {
    /// Create a Kitchen that downloads with curl and builds with cmake
    pub fn new(config: KitchenConfig) -> Self {
        let fetcher = CurlFetcher::new(config.source_cache.clone());
        let invoker = CmakeInvoker::new(config.timeout, config.jobs);
        Self::with_collaborators(config, Box::new(fetcher), Box::new(invoker))
    }

    /// Create a Kitchen with explicit fetcher and build tool
    pub fn with_collaborators(
        config: KitchenConfig,
        fetcher: Box<dyn ResourceFetcher>,
        invoker: Box<dyn BuildToolInvoker>,
    ) -> Self {
        Self {
            config,
            fetcher,
            invoker,
        }
    }

    pub fn config(&self) -> &KitchenConfig {
        &self.config
    }

    /// Fetch the sources a plan needs without building
    ///
    /// Returns the verified local paths, main archive first.
    pub fn fetch(&self, recipe: &Recipe, plan: &BuildPlan) -> Result<Vec<PathBuf>> {
        check_plan(recipe, plan)?;
        info!("Fetching sources for {} {}", plan.package(), plan.version());

        let mut fetched = vec![self.fetch_source(&recipe.archive_url(), &recipe.source.checksum)?];
        for resource in plan.resources() {
            info!("Fetching resource: {}", resource.name);
            let url = recipe.substitute(&resource.url);
            fetched.push(self.fetch_source(&url, &resource.checksum)?);
        }

        info!("Fetched {} source file(s) for {}", fetched.len(), plan.package());
        Ok(fetched)
    }

    /// Cook a build plan
    ///
    /// ## Cooking Process
    /// 1. **Prep**: Fetch and verify the source archive and resources
    /// 2. **Unpack**: Extract sources and stage resources
    /// 3. **Edit**: Apply source edits from located dependencies
    /// 4. **Simmer**: Run configure/make/install
    pub fn cook(&self, recipe: &Recipe, plan: &BuildPlan) -> Result<CookResult> {
        check_plan(recipe, plan)?;
        info!("Cooking {} version {}", plan.package(), plan.version());

        let mut cook = Cook::new(self, recipe, plan)?;

        info!("Prep: fetching ingredients...");
        cook.prep()?;

        info!("Unpacking sources...");
        cook.unpack()?;
        cook.edit()?;

        info!("Simmering: running build...");
        let arguments = cook.simmer()?;

        cook.finish(arguments)
    }

    pub(crate) fn fetch_source(&self, url: &str, checksum: &str) -> Result<PathBuf> {
        self.fetcher.fetch(url, checksum)
    }

    pub(crate) fn invoker(&self) -> &dyn BuildToolInvoker {
        self.invoker.as_ref()
    }
}

/// A plan is only good for the recipe it was computed from
fn check_plan(recipe: &Recipe, plan: &BuildPlan) -> Result<()> {
    if recipe.package.name != plan.package() || recipe.full_version() != plan.version() {
        return Err(ConfigurationError::Invalid(format!(
            "build plan for {} {} does not match recipe {} {}",
            plan.package(),
            plan.version(),
            recipe.package.name,
            recipe.full_version()
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::ArgumentList;
    use crate::dependencies::{DependencyLocation, MapLocator};
    use crate::error::Error;
    use crate::options::Overrides;
    use crate::pipeline;
    use crate::platform::PlatformInfo;
    use crate::recipe::{parse_recipe, BuildSection};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::process::Command;
    use std::rc::Rc;
    use tempfile::TempDir;

    const RECIPE: &str = r#"
[package]
name = "gizmo"
version = "1.0"

[source]
archive = "https://example.com/gizmo-%(version)s.tar.gz"
checksum = "sha256:00"

[[resource]]
name = "plugins"
url = "https://example.com/plugins-%(version)s.tar.gz"
checksum = "sha256:11"
stage_dir = "extra/plugins"
when = { enabled = "plugins" }

[[option]]
id = "plugins"

[[dependency]]
name = "ni"
kind = "optional"
edit = [{ file = "cmake/FindNI.cmake", from = "/usr/include/ni", to = "%(include)s/ni" }]

[[argument]]
key = "EXTRA_MODULES"
value = "%(buildpath)s/extra/plugins"
option = "plugins"
when = { enabled = "plugins" }

[[argument]]
key = "WITH_NI"
switch = "ni"

[build]
generator_args = [{ key = "CMAKE_INSTALL_PREFIX", value = "%(install_prefix)s" }]
"#;

    /// Serves local archives by URL without checking checksums
    struct LocalFetcher {
        files: HashMap<String, PathBuf>,
    }

    impl ResourceFetcher for LocalFetcher {
        fn fetch(&self, url: &str, _checksum: &str) -> Result<PathBuf> {
            self.files
                .get(url)
                .cloned()
                .ok_or_else(|| Error::DownloadError(format!("no fixture for {}", url)))
        }
    }

    #[derive(Default)]
    struct Recorded {
        arguments: Vec<String>,
        workdir: Option<PathBuf>,
        edited: Option<String>,
        staged: bool,
    }

    /// Records what it was asked to build instead of running cmake
    struct RecordingInvoker {
        recorded: Rc<RefCell<Recorded>>,
    }

    impl BuildToolInvoker for RecordingInvoker {
        fn invoke(
            &self,
            _build: &BuildSection,
            arguments: &ArgumentList,
            workdir: &Path,
        ) -> Result<Vec<PhaseOutput>> {
            let source = workdir.parent().map(Path::to_path_buf).unwrap_or_default();
            let mut recorded = self.recorded.borrow_mut();
            recorded.arguments = arguments.to_cmake_args();
            recorded.workdir = Some(workdir.to_path_buf());
            recorded.edited = fs::read_to_string(source.join("cmake/FindNI.cmake")).ok();
            recorded.staged = source.join("extra/plugins/plugin.c").exists();
            Ok(vec![PhaseOutput {
                phase: BuildPhase::Configure,
                code: Some(0),
                stdout: "configured".to_string(),
                stderr: String::new(),
            }])
        }
    }

    /// Build `<name>.tar.gz` containing `<top>/<file>` for each file
    fn make_archive(dir: &Path, name: &str, top: &str, files: &[(&str, &str)]) -> PathBuf {
        let tree = dir.join(format!("{}-tree", name));
        for (file, content) in files {
            let path = tree.join(top).join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let archive = dir.join(format!("{}.tar.gz", name));
        let status = Command::new("tar")
            .arg("-czf")
            .arg(&archive)
            .arg("-C")
            .arg(&tree)
            .arg(top)
            .status()
            .unwrap();
        assert!(status.success());
        archive
    }

    fn kitchen(fixtures: &TempDir, recorded: Rc<RefCell<Recorded>>) -> Kitchen {
        let main = make_archive(
            fixtures.path(),
            "gizmo",
            "gizmo-1.0",
            &[
                ("CMakeLists.txt", "project(gizmo)\n"),
                ("cmake/FindNI.cmake", "find_path(NI /usr/include/ni)\n"),
            ],
        );
        let plugins = make_archive(
            fixtures.path(),
            "plugins",
            "plugins-1.0",
            &[("plugin.c", "int x;\n")],
        );

        let mut files = HashMap::new();
        files.insert("https://example.com/gizmo-1.0.tar.gz".to_string(), main);
        files.insert("https://example.com/plugins-1.0.tar.gz".to_string(), plugins);

        let config = KitchenConfig {
            install_root: PathBuf::from("/opt/cellar"),
            ..KitchenConfig::default()
        };
        Kitchen::with_collaborators(
            config,
            Box::new(LocalFetcher { files }),
            Box::new(RecordingInvoker { recorded }),
        )
    }

    #[test]
    fn test_cook_stages_edits_and_renders() {
        let fixtures = TempDir::new().unwrap();
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let kitchen = kitchen(&fixtures, recorded.clone());

        let recipe = parse_recipe(RECIPE).unwrap();
        let locator = MapLocator::new().with("ni", DependencyLocation::under_prefix("/opt/ni"));
        let overrides = Overrides::new().with("plugins").with("ni");
        let plan = pipeline::plan(&recipe, &overrides, &PlatformInfo::linux(), &locator).unwrap();

        let result = kitchen.cook(&recipe, &plan).unwrap();
        let recorded = recorded.borrow();

        assert_eq!(result.install_prefix, PathBuf::from("/opt/cellar/gizmo/1.0"));
        assert_eq!(recorded.arguments, result.arguments);
        assert_eq!(recorded.arguments[0], "-DCMAKE_INSTALL_PREFIX=/opt/cellar/gizmo/1.0");
        assert!(recorded.arguments[1].starts_with("-DEXTRA_MODULES=/"));
        assert!(recorded.arguments[1].ends_with("gizmo-1.0/extra/plugins"));
        assert!(recorded.workdir.as_ref().unwrap().ends_with("gizmo-1.0/build"));
        assert_eq!(
            recorded.edited.as_deref(),
            Some("find_path(NI /opt/ni/include/ni)\n")
        );
        assert!(recorded.staged);
        assert!(result.log.contains("=== configure ==="));
        assert!(result.build_dir.is_none());
    }

    #[test]
    fn test_cook_without_resources() {
        let fixtures = TempDir::new().unwrap();
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        let kitchen = kitchen(&fixtures, recorded.clone());

        let recipe = parse_recipe(RECIPE).unwrap();
        let plan =
            pipeline::plan(&recipe, &Overrides::new(), &PlatformInfo::linux(), &MapLocator::new())
                .unwrap();

        kitchen.cook(&recipe, &plan).unwrap();
        let recorded = recorded.borrow();
        assert!(!recorded.staged);
        assert_eq!(
            recorded.edited.as_deref(),
            Some("find_path(NI /usr/include/ni)\n")
        );
        assert!(recorded.arguments.contains(&"-DWITH_NI=OFF".to_string()));
    }

    #[test]
    fn test_fetch_only_fetches_selected_resources() {
        let fixtures = TempDir::new().unwrap();
        let kitchen = kitchen(&fixtures, Rc::new(RefCell::new(Recorded::default())));
        let recipe = parse_recipe(RECIPE).unwrap();

        let plan =
            pipeline::plan(&recipe, &Overrides::new(), &PlatformInfo::linux(), &MapLocator::new())
                .unwrap();
        assert_eq!(kitchen.fetch(&recipe, &plan).unwrap().len(), 1);

        let plan = pipeline::plan(
            &recipe,
            &Overrides::new().with("plugins"),
            &PlatformInfo::linux(),
            &MapLocator::new(),
        )
        .unwrap();
        assert_eq!(kitchen.fetch(&recipe, &plan).unwrap().len(), 2);
    }

    #[test]
    fn test_plan_must_match_recipe() {
        let fixtures = TempDir::new().unwrap();
        let kitchen = kitchen(&fixtures, Rc::new(RefCell::new(Recorded::default())));
        let recipe = parse_recipe(RECIPE).unwrap();
        let plan =
            pipeline::plan(&recipe, &Overrides::new(), &PlatformInfo::linux(), &MapLocator::new())
                .unwrap();

        let mut other = recipe.clone();
        other.package.version = "2.0".to_string();
        assert!(matches!(
            kitchen.cook(&other, &plan),
            Err(Error::Configuration(_))
        ));
    }
}
