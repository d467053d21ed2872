//! [`TestWorkspace`]: a temporary analysis root for settings and plan tests.

use std::fs;
use std::path::{Path, PathBuf};

use scanner_extensions::settings::{LOCAL_SETTINGS_FILENAME, PROJECT_SETTINGS_FILENAME};
use scanner_extensions::{PLAN_FILENAME, SettingsResolver};
use tempfile::TempDir;

/// A temporary directory laid out like an analysed project, with a private
/// global config directory so tests never read the user's settings.
///
/// # Example
///
/// ```rust
/// use scanner_test_utils::workspace::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.write_project_settings("sonar.host = \"project\"\n");
/// ws.write_local_settings("sonar.host = \"local\"\n");
///
/// let settings = ws.resolver().resolve().unwrap();
/// assert_eq!(settings.get_string("sonar.host").as_deref(), Some("local"));
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Stand-in for the platform config directory.
    pub fn global_config_dir(&self) -> PathBuf {
        self.root().join(".global")
    }

    pub fn write_global_settings(&self, content: &str) {
        let dir = self.global_config_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("settings.toml"), content).unwrap();
    }

    pub fn write_project_settings(&self, content: &str) {
        fs::write(self.root().join(PROJECT_SETTINGS_FILENAME), content).unwrap();
    }

    pub fn write_local_settings(&self, content: &str) {
        fs::write(self.root().join(LOCAL_SETTINGS_FILENAME), content).unwrap();
    }

    /// Write a plan at its canonical location and return its path.
    pub fn write_plan(&self, content: &str) -> PathBuf {
        let path = self.root().join(PLAN_FILENAME);
        fs::write(&path, content).unwrap();
        path
    }

    /// A resolver for this root that reads the private global directory.
    pub fn resolver(&self) -> SettingsResolver {
        SettingsResolver::with_global_config_dir(self.root(), self.global_config_dir())
    }
}
