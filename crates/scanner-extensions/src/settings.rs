//! Analysis settings with layered TOML resolution.
//!
//! Settings are a flat map of dotted property keys. A TOML document is
//! flattened, so `sonar.projectKey = "demo"` and `[sonar] projectKey = "demo"`
//! yield the same property.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Project-level settings file, relative to the analysed root.
pub const PROJECT_SETTINGS_FILENAME: &str = "scanner.toml";

/// Local overrides, relative to the analysed root. Meant to be git-ignored.
pub const LOCAL_SETTINGS_FILENAME: &str = "scanner.local.toml";

/// Flat property map consulted by the optimizers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisSettings {
    properties: BTreeMap<String, toml::Value>,
}

impl AnalysisSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, flattening nested tables into dotted keys.
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        Ok(Self::from_table(table))
    }

    /// Flatten an already parsed table.
    pub fn from_table(table: toml::Table) -> Self {
        let mut settings = Self::new();
        settings.flatten("", table);
        settings
    }

    fn flatten(&mut self, prefix: &str, table: toml::Table) {
        for (key, value) in table {
            let full_key = if prefix.is_empty() {
                key
            } else {
                format!("{}.{}", prefix, key)
            };
            match value {
                toml::Value::Table(nested) => self.flatten(&full_key, nested),
                other => {
                    self.properties.insert(full_key, other);
                }
            }
        }
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// String rendering of a property. Arrays are joined with commas.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(render)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Overlay `other` on top of these settings; its values win.
    pub fn merge(&mut self, other: &AnalysisSettings) {
        for (key, value) in &other.properties {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

fn render(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render)
                .collect::<Vec<_>>()
                .join(","),
        ),
        toml::Value::Table(_) => None,
    }
}

/// Resolves settings by merging layers, later ones overriding earlier ones:
///
/// 1. Global defaults (`<config_dir>/scanner/settings.toml`)
/// 2. Project settings (`<root>/scanner.toml`)
/// 3. Local overrides (`<root>/scanner.local.toml`)
///
/// Missing layers are skipped. Invalid TOML in any layer is an error.
pub struct SettingsResolver {
    root: PathBuf,
    global_config_dir_override: Option<PathBuf>,
}

impl SettingsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            global_config_dir_override: None,
        }
    }

    /// Use `global_config_dir` instead of the platform config directory.
    pub fn with_global_config_dir(root: impl Into<PathBuf>, global_config_dir: PathBuf) -> Self {
        Self {
            root: root.into(),
            global_config_dir_override: Some(global_config_dir),
        }
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("scanner"))
    }

    pub fn resolve(&self) -> Result<AnalysisSettings> {
        let mut settings = AnalysisSettings::new();

        if let Some(global_dir) = self.global_config_dir() {
            load_layer(&global_dir.join("settings.toml"), "global", &mut settings)?;
        }
        load_layer(&self.root.join(PROJECT_SETTINGS_FILENAME), "project", &mut settings)?;
        load_layer(&self.root.join(LOCAL_SETTINGS_FILENAME), "local", &mut settings)?;

        Ok(settings)
    }

    pub fn has_project_settings(&self) -> bool {
        self.root.join(PROJECT_SETTINGS_FILENAME).is_file()
    }

    pub fn has_local_overrides(&self) -> bool {
        self.root.join(LOCAL_SETTINGS_FILENAME).is_file()
    }
}

fn load_layer(path: &Path, layer: &str, settings: &mut AnalysisSettings) -> Result<()> {
    if !path.is_file() {
        tracing::debug!(?path, layer, "No settings found, skipping layer");
        return Ok(());
    }
    tracing::debug!(?path, layer, "Loading settings layer");
    let content = fs::read_to_string(path)?;
    settings.merge(&AnalysisSettings::from_toml(&content)?);
    Ok(())
}
