//! Loading the plan and settings a command works on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scanner_extensions::{
    AnalysisSettings, AnalysisUnit, BuiltPlan, ComponentContainer, ExtensionPlan, PLAN_FILENAME,
    ScannerExtensionDictionary, SettingsResolver,
};

use crate::error::{CliError, Result};

/// A built plan plus the settings resolved for its root.
pub struct PlanContext {
    pub plan: BuiltPlan,
    pub settings: AnalysisSettings,
}

impl PlanContext {
    /// Load `plan` (or `<root>/scanner-plan.toml`) and resolve the settings
    /// layers of `root`.
    pub fn load(
        root: &Path,
        plan: Option<&Path>,
        global_config_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let plan_path = plan
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(PLAN_FILENAME));
        tracing::debug!(path = ?plan_path, "Loading extension plan");
        let plan = ExtensionPlan::from_path(&plan_path)?.build()?;

        let resolver = match global_config_dir {
            Some(dir) => SettingsResolver::with_global_config_dir(root, dir),
            None => SettingsResolver::new(root),
        };
        tracing::debug!(
            project = resolver.has_project_settings(),
            local = resolver.has_local_overrides(),
            "Resolving analysis settings"
        );
        let settings = plan.settings(&resolver.resolve()?);

        Ok(Self { plan, settings })
    }

    /// The named container, or the last declared one.
    pub fn container(&self, name: Option<&str>) -> Result<&Arc<ComponentContainer>> {
        match name {
            Some(name) => self
                .plan
                .container(name)
                .ok_or_else(|| CliError::user(format!("Unknown container '{}'", name))),
            None => self
                .plan
                .default_container()
                .ok_or_else(|| CliError::user("The plan declares no container")),
        }
    }

    pub fn dictionary(&self, container: Option<&str>) -> Result<ScannerExtensionDictionary> {
        let container = self.container(container)?;
        Ok(self.plan.dictionary(container.name(), &self.settings)?)
    }

    pub fn unit(&self, key: Option<&str>) -> AnalysisUnit {
        match key {
            Some(key) => AnalysisUnit::new(key),
            None => self.plan.unit(),
        }
    }
}
