//! Extension plan manifests.
//!
//! A plan declares extension types, a container hierarchy and the
//! extensions registered in it, so ordering can be dry-run without loading
//! any plugin. The canonical filename is [`PLAN_FILENAME`](crate::PLAN_FILENAME).
//!
//! # Example TOML
//!
//! ```toml
//! [analysis]
//! unit = "demo"
//! languages = ["java"]
//!
//! [[types]]
//! name = "Sensor"
//! roles = ["sensor"]
//!
//! [[types]]
//! name = "PreSensor"
//! extends = ["Sensor"]
//! phase = "pre"
//!
//! [[containers]]
//! name = "global"
//!
//! [[containers]]
//! name = "project"
//! parent = "global"
//!
//! [[extensions]]
//! name = "scm"
//! type = "PreSensor"
//! container = "global"
//! depended_upon = ["scm-data"]
//!
//! [[extensions]]
//! name = "blame"
//! type = "Sensor"
//! container = "project"
//! depends_upon = ["scm-data", "@scm"]
//!
//! [extensions.sensor]
//! languages = ["java"]
//! ```
//!
//! In instance-level `depends_upon`/`depended_upon`, a value starting with
//! `@` names another extension of the plan; anything else is a literal key.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, LazyLock, OnceLock};

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::container::ComponentContainer;
use crate::dictionary::ScannerExtensionDictionary;
use crate::error::{Error, Result};
use crate::extension::{AnalysisUnit, Extension, ExtensionId, UnitCheck};
use crate::metadata::{DeclaredAccessor, DeclaredValue, DependencyKey, ExtensionType, Phase, Relation};
use crate::optimizer::{PostJobDescriptor, PostJobOptimizer, SensorDescriptor, SensorOptimizer};
use crate::settings::AnalysisSettings;

/// Prefix marking a reference to another extension of the plan.
pub const EXTENSION_REF_PREFIX: char = '@';

/// Name of the container used when a plan declares none.
pub const DEFAULT_CONTAINER: &str = "root";

/// Complete plan loaded from a plan manifest.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtensionPlan {
    /// Context of the simulated analysis.
    #[serde(default)]
    pub analysis: AnalysisContext,
    #[serde(default)]
    pub types: Vec<TypeDecl>,
    /// Container hierarchy, parents before or after children.
    #[serde(default)]
    pub containers: Vec<ContainerDecl>,
    /// Registrations, in registration order.
    #[serde(default)]
    pub extensions: Vec<ExtensionDecl>,
}

/// What the simulated analysis looks like to the optimizers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisContext {
    /// Key of the analysed unit handed to eligibility checks.
    #[serde(default)]
    pub unit: Option<String>,
    /// Languages of the files present.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Rule repositories with active rules.
    #[serde(default)]
    pub active_rule_repositories: Vec<String>,
    /// Properties, flattened to dotted keys like a settings file.
    #[serde(default)]
    pub settings: toml::Table,
}

/// An extension type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDecl {
    pub name: String,
    /// Parent types, superclass first.
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub roles: Vec<Capability>,
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub depends_upon: Vec<String>,
    #[serde(default)]
    pub depended_upon: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerDecl {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

/// A registered extension.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Defaults to the first declared container.
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub depends_upon: Vec<String>,
    #[serde(default)]
    pub depended_upon: Vec<String>,
    /// Unit keys this extension accepts. When set, any other unit is declined.
    #[serde(default)]
    pub execute_on: Option<Vec<String>>,
    #[serde(default)]
    pub sensor: Option<SensorDescriptor>,
    #[serde(default)]
    pub post_job: Option<PostJobDescriptor>,
}

impl ExtensionPlan {
    /// Parse a plan from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let plan: Self = toml::from_str(content)?;
        Ok(plan)
    }

    /// Read and parse a plan from a file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::PlanNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize the plan back to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::PlanSerialize(e.to_string()))
    }

    /// Materialise types, containers and extensions.
    ///
    /// # Errors
    ///
    /// `Error::InvalidPlan` for duplicate names, unknown types, containers,
    /// parents or `@` references, and for inheritance or container cycles.
    pub fn build(&self) -> Result<BuiltPlan> {
        let types = self.build_types()?;

        let mut extensions: Vec<Arc<DeclaredExtension>> = Vec::with_capacity(self.extensions.len());
        let mut by_name: HashMap<&str, Arc<DeclaredExtension>> = HashMap::new();
        for decl in &self.extensions {
            let ty = types.get(decl.type_name.as_str()).ok_or_else(|| {
                Error::invalid_plan(format!(
                    "extension '{}' has unknown type '{}'",
                    decl.name, decl.type_name
                ))
            })?;
            let extension = Arc::new(DeclaredExtension::new(decl, Arc::clone(ty)));
            if by_name.insert(&decl.name, Arc::clone(&extension)).is_some() {
                return Err(Error::invalid_plan(format!(
                    "extension '{}' is declared twice",
                    decl.name
                )));
            }
            extensions.push(extension);
        }

        for (decl, extension) in self.extensions.iter().zip(&extensions) {
            let requires = resolve_keys(&decl.name, &decl.depends_upon, &by_name)?;
            let generates = resolve_keys(&decl.name, &decl.depended_upon, &by_name)?;
            extension.resolve_references(requires, generates)?;
        }

        let containers = self.build_containers(&extensions)?;
        tracing::debug!(
            types = types.len(),
            containers = containers.len(),
            extensions = extensions.len(),
            "Built extension plan"
        );

        Ok(BuiltPlan {
            analysis: self.analysis.clone(),
            containers,
            extensions,
        })
    }

    fn build_types(&self) -> Result<HashMap<String, Arc<ExtensionType>>> {
        let mut decls: HashMap<&str, &TypeDecl> = HashMap::new();
        for decl in &self.types {
            if decls.insert(&decl.name, decl).is_some() {
                return Err(Error::invalid_plan(format!(
                    "type '{}' is declared twice",
                    decl.name
                )));
            }
        }

        let mut built = HashMap::new();
        for decl in &self.types {
            build_type(&decl.name, &decls, &mut built, &mut Vec::new())?;
        }
        Ok(built)
    }

    fn build_containers(
        &self,
        extensions: &[Arc<DeclaredExtension>],
    ) -> Result<Vec<(String, Arc<ComponentContainer>)>> {
        let decls: Vec<ContainerDecl> = if self.containers.is_empty() {
            vec![ContainerDecl {
                name: DEFAULT_CONTAINER.to_string(),
                parent: None,
            }]
        } else {
            self.containers.clone()
        };

        let mut names = HashSet::new();
        for decl in &decls {
            if !names.insert(decl.name.as_str()) {
                return Err(Error::invalid_plan(format!(
                    "container '{}' is declared twice",
                    decl.name
                )));
            }
        }
        for decl in &decls {
            if let Some(parent) = &decl.parent {
                if !names.contains(parent.as_str()) {
                    return Err(Error::invalid_plan(format!(
                        "container '{}' has unknown parent '{}'",
                        decl.name, parent
                    )));
                }
            }
        }

        let default_container = decls[0].name.clone();
        let mut members: HashMap<&str, Vec<Arc<dyn Extension>>> = HashMap::new();
        for (decl, extension) in self.extensions.iter().zip(extensions) {
            let container = decl.container.as_deref().unwrap_or(&default_container);
            if !names.contains(container) {
                return Err(Error::invalid_plan(format!(
                    "extension '{}' is registered in unknown container '{}'",
                    decl.name, container
                )));
            }
            let extension: Arc<dyn Extension> = Arc::clone(extension) as Arc<dyn Extension>;
            members.entry(container).or_default().push(extension);
        }

        // A child shares a frozen parent, so parents are built first.
        let mut built: Vec<(String, Arc<ComponentContainer>)> = Vec::with_capacity(decls.len());
        let mut pending: Vec<&ContainerDecl> = decls.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut still_pending = Vec::new();
            for decl in pending {
                let parent = match &decl.parent {
                    None => None,
                    Some(parent) => match built.iter().find(|(name, _)| name == parent) {
                        Some((_, container)) => Some(Arc::clone(container)),
                        None => {
                            still_pending.push(decl);
                            continue;
                        }
                    },
                };
                let mut container = match parent {
                    Some(parent) => parent.create_child_named(&decl.name),
                    None => ComponentContainer::named(&decl.name),
                };
                for extension in members.remove(decl.name.as_str()).unwrap_or_default() {
                    container.add_singleton(extension);
                }
                built.push((decl.name.clone(), Arc::new(container)));
            }
            if still_pending.len() == before {
                let mut cycle: Vec<&str> = still_pending.iter().map(|d| d.name.as_str()).collect();
                cycle.sort_unstable();
                return Err(Error::invalid_plan(format!(
                    "container cycle between: {}",
                    cycle.join(", ")
                )));
            }
            pending = still_pending;
        }

        // Keep declaration order for listing.
        built.sort_by_key(|(name, _)| decls.iter().position(|d| &d.name == name));
        Ok(built)
    }
}

fn build_type(
    name: &str,
    decls: &HashMap<&str, &TypeDecl>,
    built: &mut HashMap<String, Arc<ExtensionType>>,
    visiting: &mut Vec<String>,
) -> Result<Arc<ExtensionType>> {
    if let Some(ty) = built.get(name) {
        return Ok(Arc::clone(ty));
    }
    if visiting.iter().any(|v| v == name) {
        return Err(Error::invalid_plan(format!(
            "inheritance cycle through type '{}'",
            name
        )));
    }
    let decl = decls
        .get(name)
        .ok_or_else(|| Error::invalid_plan(format!("unknown type '{}'", name)))?;

    visiting.push(name.to_string());
    let mut builder = ExtensionType::builder(&decl.name);
    for parent in &decl.extends {
        let parent = build_type(parent, decls, built, visiting)?;
        builder = builder.extends(&parent);
    }
    visiting.pop();

    if decl.extends.is_empty() {
        builder = builder.extends(&PLAN_BASE_TYPE);
    }
    for role in &decl.roles {
        builder = builder.role(*role);
    }
    if let Some(phase) = decl.phase {
        builder = builder.phase(phase);
    }
    for key in &decl.depends_upon {
        builder = builder.depends_upon(key.as_str());
    }
    for key in &decl.depended_upon {
        builder = builder.depended_upon(key.as_str());
    }

    let ty = builder.build();
    built.insert(decl.name.clone(), Arc::clone(&ty));
    Ok(ty)
}

fn resolve_keys(
    owner: &str,
    raw: &[String],
    by_name: &HashMap<&str, Arc<DeclaredExtension>>,
) -> Result<Vec<DependencyKey>> {
    raw.iter()
        .map(|value| match value.strip_prefix(EXTENSION_REF_PREFIX) {
            Some(target) => by_name
                .get(target)
                .map(|ext| DependencyKey::Extension(ExtensionId::of(ext.as_ref())))
                .ok_or_else(|| {
                    Error::invalid_plan(format!(
                        "extension '{}' refers to unknown extension '{}'",
                        owner, target
                    ))
                }),
            None => Ok(DependencyKey::value(value.as_str())),
        })
        .collect()
}

/// Root of every plan type: exposes the instance-level declarations.
static PLAN_BASE_TYPE: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("PlanExtension")
        .accessor(DeclaredAccessor::typed::<DeclaredExtension, _>(
            "depends_upon",
            Relation::DependsUpon,
            |ext| DeclaredValue::from(ext.requires().to_vec()),
        ))
        .accessor(DeclaredAccessor::typed::<DeclaredExtension, _>(
            "depended_upon",
            Relation::DependedUpon,
            |ext| DeclaredValue::from(ext.generates().to_vec()),
        ))
        .build()
});

/// An extension materialised from an [`ExtensionDecl`].
#[derive(Debug)]
pub struct DeclaredExtension {
    name: String,
    ty: Arc<ExtensionType>,
    requires: OnceLock<Vec<DependencyKey>>,
    generates: OnceLock<Vec<DependencyKey>>,
    execute_on: Option<BTreeSet<String>>,
    sensor: Option<SensorDescriptor>,
    post_job: Option<PostJobDescriptor>,
}

impl DeclaredExtension {
    fn new(decl: &ExtensionDecl, ty: Arc<ExtensionType>) -> Self {
        let with_name = |name: &mut String| {
            if name.is_empty() {
                *name = decl.name.clone();
            }
        };
        let sensor = decl.sensor.clone().map(|mut d| {
            with_name(&mut d.name);
            d
        });
        let post_job = decl.post_job.clone().map(|mut d| {
            with_name(&mut d.name);
            d
        });

        Self {
            name: decl.name.clone(),
            ty,
            requires: OnceLock::new(),
            generates: OnceLock::new(),
            execute_on: decl
                .execute_on
                .as_ref()
                .map(|keys| keys.iter().cloned().collect()),
            sensor,
            post_job,
        }
    }

    // `@` references need every extension to exist first.
    fn resolve_references(
        &self,
        requires: Vec<DependencyKey>,
        generates: Vec<DependencyKey>,
    ) -> Result<()> {
        self.requires
            .set(requires)
            .and_then(|()| self.generates.set(generates))
            .map_err(|_| {
                Error::invalid_plan(format!("references of '{}' resolved twice", self.name))
            })
    }

    /// Instance-level keys this extension requires.
    pub fn requires(&self) -> &[DependencyKey] {
        self.requires.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// Instance-level keys this extension generates.
    pub fn generates(&self) -> &[DependencyKey] {
        self.generates.get().map(Vec::as_slice).unwrap_or_default()
    }
}

impl Extension for DeclaredExtension {
    fn extension_type(&self) -> Arc<ExtensionType> {
        Arc::clone(&self.ty)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn as_unit_check(&self) -> Option<&dyn UnitCheck> {
        self.execute_on.as_ref().map(|_| self as &dyn UnitCheck)
    }

    fn sensor_descriptor(&self) -> Option<SensorDescriptor> {
        self.sensor.clone()
    }

    fn post_job_descriptor(&self) -> Option<PostJobDescriptor> {
        self.post_job.clone()
    }
}

impl UnitCheck for DeclaredExtension {
    fn should_execute_on(&self, unit: &AnalysisUnit) -> bool {
        self.execute_on
            .as_ref()
            .is_none_or(|keys| keys.contains(unit.key()))
    }
}

/// A materialised plan.
#[derive(Debug)]
pub struct BuiltPlan {
    analysis: AnalysisContext,
    containers: Vec<(String, Arc<ComponentContainer>)>,
    extensions: Vec<Arc<DeclaredExtension>>,
}

impl BuiltPlan {
    pub fn container(&self, name: &str) -> Option<&Arc<ComponentContainer>> {
        self.containers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, container)| container)
    }

    /// Containers in declaration order.
    pub fn containers(&self) -> impl Iterator<Item = &Arc<ComponentContainer>> {
        self.containers.iter().map(|(_, container)| container)
    }

    /// The last declared container, the deepest one in a linear hierarchy.
    pub fn default_container(&self) -> Option<&Arc<ComponentContainer>> {
        self.containers.last().map(|(_, container)| container)
    }

    pub fn extension(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.extensions
            .iter()
            .find(|ext| ext.name == name)
            .map(|ext| Arc::clone(ext) as Arc<dyn Extension>)
    }

    /// Name of the plan extension with identity `id`.
    pub fn name_of(&self, id: ExtensionId) -> Option<&str> {
        self.extensions
            .iter()
            .find(|ext| ExtensionId::of(ext.as_ref()) == id)
            .map(|ext| ext.name.as_str())
    }

    /// Extensions in declaration order.
    pub fn extensions(&self) -> impl Iterator<Item = &Arc<DeclaredExtension>> {
        self.extensions.iter()
    }

    /// The analysed unit, `"default"` when the plan names none.
    pub fn unit(&self) -> AnalysisUnit {
        AnalysisUnit::new(self.analysis.unit.as_deref().unwrap_or("default"))
    }

    /// Plan properties overlaid on `base`.
    pub fn settings(&self, base: &AnalysisSettings) -> AnalysisSettings {
        let mut settings = base.clone();
        settings.merge(&AnalysisSettings::from_table(self.analysis.settings.clone()));
        settings
    }

    /// A dictionary over `container`, its optimizers fed from the plan's
    /// analysis context overlaid on `base` settings.
    pub fn dictionary(
        &self,
        container: &str,
        base: &AnalysisSettings,
    ) -> Result<ScannerExtensionDictionary> {
        let container = self.container(container).ok_or_else(|| {
            Error::invalid_plan(format!("unknown container '{}'", container))
        })?;
        let settings = self.settings(base);
        Ok(ScannerExtensionDictionary::new(Arc::clone(container))
            .with_sensor_optimizer(
                SensorOptimizer::new(settings.clone())
                    .with_languages(self.analysis.languages.iter().cloned())
                    .with_active_rule_repositories(
                        self.analysis.active_rule_repositories.iter().cloned(),
                    ),
            )
            .with_post_job_optimizer(PostJobOptimizer::new(settings)))
    }
}
