//! Descriptor-based skipping of sensors and post-jobs.
//!
//! An extension may describe what it needs to be useful: files of some
//! language, an active rule repository, configured properties. The
//! optimizers drop extensions whose needs are not met before they are
//! ordered.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::settings::AnalysisSettings;

/// What a sensor needs in order to run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    #[serde(default)]
    pub name: String,
    /// Run only when files of one of these languages are present.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Run only when one of these rule repositories is active.
    #[serde(default)]
    pub rule_repositories: Vec<String>,
    /// Every one of these properties must be set.
    #[serde(default)]
    pub required_properties: Vec<String>,
    /// Global sensors run once per analysis instead of once per module.
    #[serde(default)]
    pub global: bool,
}

impl SensorDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn only_on_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn create_issues_for_rule_repositories<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule_repositories = repositories.into_iter().map(Into::into).collect();
        self
    }

    pub fn require_property(mut self, key: impl Into<String>) -> Self {
        self.required_properties.push(key.into());
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }
}

/// What a post-job needs in order to run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostJobDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub required_properties: Vec<String>,
}

impl PostJobDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_properties: Vec::new(),
        }
    }

    pub fn require_property(mut self, key: impl Into<String>) -> Self {
        self.required_properties.push(key.into());
        self
    }
}

/// Decides whether a described sensor is worth running.
#[derive(Debug, Clone, Default)]
pub struct SensorOptimizer {
    settings: AnalysisSettings,
    languages: BTreeSet<String>,
    active_rule_repositories: BTreeSet<String>,
}

impl SensorOptimizer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Languages of the files present in the analysed unit.
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Rule repositories with at least one rule in the active profile.
    pub fn with_active_rule_repositories<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_rule_repositories = repositories.into_iter().map(Into::into).collect();
        self
    }

    pub fn should_execute(&self, descriptor: &SensorDescriptor) -> bool {
        if !self.fs_condition(descriptor) {
            tracing::debug!(
                "'{}' skipped because there is no related file in current project",
                descriptor.name
            );
            return false;
        }
        if !self.active_rules_condition(descriptor) {
            tracing::debug!(
                "'{}' skipped because there is no related rule activated in the quality profile",
                descriptor.name
            );
            return false;
        }
        if !settings_condition(&self.settings, &descriptor.required_properties) {
            tracing::debug!(
                "'{}' skipped because one of the required properties is missing",
                descriptor.name
            );
            return false;
        }
        true
    }

    fn fs_condition(&self, descriptor: &SensorDescriptor) -> bool {
        descriptor.languages.is_empty()
            || descriptor
                .languages
                .iter()
                .any(|lang| self.languages.contains(lang))
    }

    fn active_rules_condition(&self, descriptor: &SensorDescriptor) -> bool {
        descriptor.rule_repositories.is_empty()
            || descriptor
                .rule_repositories
                .iter()
                .any(|repo| self.active_rule_repositories.contains(repo))
    }
}

/// Decides whether a described post-job is worth running.
#[derive(Debug, Clone, Default)]
pub struct PostJobOptimizer {
    settings: AnalysisSettings,
}

impl PostJobOptimizer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }

    pub fn should_execute(&self, descriptor: &PostJobDescriptor) -> bool {
        if !settings_condition(&self.settings, &descriptor.required_properties) {
            tracing::debug!(
                "'{}' skipped because one of the required properties is missing",
                descriptor.name
            );
            return false;
        }
        true
    }
}

fn settings_condition(settings: &AnalysisSettings, required: &[String]) -> bool {
    required.iter().all(|key| settings.has_key(key))
}
