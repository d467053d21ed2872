//! Type metadata and declaration resolution.
//!
//! Plugins describe each extension type once with an [`ExtensionType`]:
//! its parents (superclass first, then interfaces), the roles it plays, an
//! optional phase, type-level "depends upon"/"depended upon" keys and
//! method-level [`DeclaredAccessor`]s whose values depend on the instance.
//!
//! Resolution flattens the hierarchy. A type's effective declarations are the
//! union of its own and those of every ancestor; redeclaring something in a
//! subtype never removes an inherited edge.
//!
//! # Example
//!
//! ```
//! use scanner_extensions::metadata::{ExtensionType, Phase, resolve_phase};
//! use scanner_extensions::Capability;
//!
//! let base = ExtensionType::builder("PreSensor")
//!     .role(Capability::Sensor)
//!     .phase(Phase::Pre)
//!     .build();
//! let sub = ExtensionType::builder("PreSensorSubclass").extends(&base).build();
//!
//! assert_eq!(resolve_phase(&sub), Phase::Pre);
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilitySet};
use crate::error::{Error, Result};
use crate::extension::{Extension, ExtensionId};

/// Boxed error an accessor may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type AccessorFn = dyn Fn(&dyn Extension) -> std::result::Result<DeclaredValue, BoxError> + Send + Sync;

/// Direction of a dependency declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The declarer requires these keys: it runs after their generators.
    DependsUpon,
    /// The declarer generates these keys: it runs before their consumers.
    DependedUpon,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::DependsUpon => write!(f, "depends upon"),
            Relation::DependedUpon => write!(f, "depended upon"),
        }
    }
}

/// Coarse execution phase.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pre,
    #[default]
    Default,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Pre => write!(f, "pre"),
            Phase::Default => write!(f, "default"),
            Phase::Post => write!(f, "post"),
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pre" => Ok(Phase::Pre),
            "default" => Ok(Phase::Default),
            "post" => Ok(Phase::Post),
            _ => Err(format!("unknown phase: {}", s)),
        }
    }
}

/// Accessor visibility. Only public accessors may carry declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// A key an extension generates or requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyKey {
    /// A literal value, compared by equality.
    Value(String),
    /// Another extension, compared by identity.
    Extension(ExtensionId),
}

impl DependencyKey {
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(value.into())
    }

    pub fn extension(extension: &dyn Extension) -> Self {
        Self::Extension(ExtensionId::of(extension))
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKey::Value(value) => write!(f, "{}", value),
            DependencyKey::Extension(id) => write!(f, "extension {}", id),
        }
    }
}

impl From<&str> for DependencyKey {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for DependencyKey {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<&Arc<dyn Extension>> for DependencyKey {
    fn from(extension: &Arc<dyn Extension>) -> Self {
        Self::Extension(ExtensionId::from(extension))
    }
}

/// What a method-level accessor returns: nothing, a single key, or a
/// collection (possibly nested) of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeclaredValue {
    #[default]
    Absent,
    Key(DependencyKey),
    Many(Vec<DeclaredValue>),
}

impl DeclaredValue {
    /// Append every key, one per collection element.
    pub fn flatten_into(self, keys: &mut Vec<DependencyKey>) {
        match self {
            DeclaredValue::Absent => {}
            DeclaredValue::Key(key) => keys.push(key),
            DeclaredValue::Many(values) => {
                for value in values {
                    value.flatten_into(keys);
                }
            }
        }
    }
}

impl From<DependencyKey> for DeclaredValue {
    fn from(key: DependencyKey) -> Self {
        Self::Key(key)
    }
}

impl From<&str> for DeclaredValue {
    fn from(value: &str) -> Self {
        Self::Key(value.into())
    }
}

impl From<String> for DeclaredValue {
    fn from(value: String) -> Self {
        Self::Key(value.into())
    }
}

impl From<&Arc<dyn Extension>> for DeclaredValue {
    fn from(extension: &Arc<dyn Extension>) -> Self {
        Self::Key(extension.into())
    }
}

impl<T: Into<DeclaredValue>> From<Option<T>> for DeclaredValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl<T: Into<DeclaredValue>> From<Vec<T>> for DeclaredValue {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<DeclaredValue>, const N: usize> From<[T; N]> for DeclaredValue {
    fn from(values: [T; N]) -> Self {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}

/// A method-level declaration: invoked on the instance to obtain keys.
#[derive(Clone)]
pub struct DeclaredAccessor {
    name: String,
    relation: Relation,
    visibility: Visibility,
    arity: usize,
    invoke: Arc<AccessorFn>,
}

impl DeclaredAccessor {
    /// A public, parameterless accessor that may fail.
    pub fn new<F>(name: impl Into<String>, relation: Relation, invoke: F) -> Self
    where
        F: Fn(&dyn Extension) -> std::result::Result<DeclaredValue, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            relation,
            visibility: Visibility::Public,
            arity: 0,
            invoke: Arc::new(invoke),
        }
    }

    /// An accessor reading a concrete extension type `E`.
    ///
    /// Invoking it on an extension of another concrete type fails.
    pub fn typed<E, F>(name: impl Into<String>, relation: Relation, read: F) -> Self
    where
        E: Extension,
        F: Fn(&E) -> DeclaredValue + Send + Sync + 'static,
    {
        Self::new(name, relation, move |extension: &dyn Extension| {
            extension
                .as_any()
                .downcast_ref::<E>()
                .map(&read)
                .ok_or_else(|| {
                    format!("receiver is not a {}", std::any::type_name::<E>()).into()
                })
        })
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_parameters(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// Check the accessor is invocable, then invoke it on `extension`.
    fn evaluate(&self, extension: &dyn Extension) -> Result<DeclaredValue> {
        if self.visibility != Visibility::Public {
            return Err(Error::AccessorNotPublic {
                extension: extension.name(),
                accessor: self.name.clone(),
                relation: self.relation,
            });
        }
        if self.arity > 0 {
            return Err(Error::AccessorHasParameters {
                extension: extension.name(),
                accessor: self.name.clone(),
                relation: self.relation,
                arity: self.arity,
            });
        }
        (self.invoke)(extension).map_err(|e| Error::AccessorFailed {
            extension: extension.name(),
            accessor: self.name.clone(),
            relation: self.relation,
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for DeclaredAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredAccessor")
            .field("name", &self.name)
            .field("relation", &self.relation)
            .field("visibility", &self.visibility)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Runtime type descriptor of an extension.
#[derive(Debug)]
pub struct ExtensionType {
    name: String,
    parents: Vec<Arc<ExtensionType>>,
    roles: Vec<Capability>,
    phase: Option<Phase>,
    depends_upon: Vec<DependencyKey>,
    depended_upon: Vec<DependencyKey>,
    accessors: Vec<DeclaredAccessor>,
}

impl ExtensionType {
    pub fn builder(name: impl Into<String>) -> ExtensionTypeBuilder {
        ExtensionTypeBuilder {
            ty: ExtensionType {
                name: name.into(),
                parents: Vec::new(),
                roles: Vec::new(),
                phase: None,
                depends_upon: Vec::new(),
                depended_upon: Vec::new(),
                accessors: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &[Arc<ExtensionType>] {
        &self.parents
    }

    /// The phase declared on this exact type, ignoring ancestors.
    pub fn declared_phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Type-level keys declared on this exact type for `relation`.
    pub fn declared_keys(&self, relation: Relation) -> &[DependencyKey] {
        match relation {
            Relation::DependsUpon => &self.depends_upon,
            Relation::DependedUpon => &self.depended_upon,
        }
    }

    pub fn accessors(&self) -> &[DeclaredAccessor] {
        &self.accessors
    }

    /// This type followed by every ancestor, nearest first, each once.
    pub fn ancestors(&self) -> Vec<&ExtensionType> {
        let mut seen: HashSet<*const ExtensionType> = HashSet::new();
        let mut queue: VecDeque<&ExtensionType> = VecDeque::from([self]);
        let mut ordered = Vec::new();

        while let Some(ty) = queue.pop_front() {
            if !seen.insert(ty as *const ExtensionType) {
                continue;
            }
            queue.extend(ty.parents.iter().map(|p| p.as_ref()));
            ordered.push(ty);
        }

        ordered
    }
}

/// Builder for [`ExtensionType`].
#[derive(Debug)]
pub struct ExtensionTypeBuilder {
    ty: ExtensionType,
}

impl ExtensionTypeBuilder {
    /// Add a parent. The first parent plays the superclass.
    pub fn extends(mut self, parent: &Arc<ExtensionType>) -> Self {
        self.ty.parents.push(Arc::clone(parent));
        self
    }

    pub fn role(mut self, capability: Capability) -> Self {
        self.ty.roles.push(capability);
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.ty.phase = Some(phase);
        self
    }

    pub fn depends_upon(mut self, key: impl Into<DependencyKey>) -> Self {
        self.ty.depends_upon.push(key.into());
        self
    }

    pub fn depended_upon(mut self, key: impl Into<DependencyKey>) -> Self {
        self.ty.depended_upon.push(key.into());
        self
    }

    pub fn accessor(mut self, accessor: DeclaredAccessor) -> Self {
        self.ty.accessors.push(accessor);
        self
    }

    pub fn build(self) -> Arc<ExtensionType> {
        Arc::new(self.ty)
    }
}

/// Roles of a type, inherited and implied ones included.
pub fn resolve_roles(ty: &ExtensionType) -> CapabilitySet {
    ty.ancestors()
        .into_iter()
        .flat_map(|level| level.roles.iter().copied())
        .collect()
}

/// The phase of the nearest type in the hierarchy that declares one.
pub fn resolve_phase(ty: &ExtensionType) -> Phase {
    ty.ancestors()
        .into_iter()
        .find_map(|level| level.phase)
        .unwrap_or_default()
}

/// Evaluate every declaration of `relation` for `extension`.
///
/// Walks the type hierarchy, collecting type-level keys and invoking each
/// method-level accessor. Collections are flattened and duplicates dropped,
/// keeping the first occurrence.
///
/// # Errors
///
/// Fails on the first accessor that is not public, takes parameters or
/// fails when invoked.
pub fn evaluate_declarations(
    extension: &dyn Extension,
    relation: Relation,
) -> Result<Vec<DependencyKey>> {
    let ty = extension.extension_type();
    let mut keys = Vec::new();

    for level in ty.ancestors() {
        keys.extend(level.declared_keys(relation).iter().cloned());
        for accessor in level.accessors.iter().filter(|a| a.relation == relation) {
            accessor.evaluate(extension)?.flatten_into(&mut keys);
        }
    }

    let mut seen = HashSet::new();
    keys.retain(|key| seen.insert(key.clone()));
    Ok(keys)
}

/// Flattened declarations of one extension, resolved once per query.
#[derive(Debug, Clone)]
pub struct EffectiveDeclarations {
    /// Keys this extension generates (depended upon).
    pub generates: Vec<DependencyKey>,
    /// Keys this extension requires (depends upon).
    pub requires: Vec<DependencyKey>,
    pub phase: Phase,
    pub roles: CapabilitySet,
}

impl EffectiveDeclarations {
    pub fn resolve(extension: &dyn Extension) -> Result<Self> {
        let ty = extension.extension_type();
        Ok(Self {
            generates: evaluate_declarations(extension, Relation::DependedUpon)?,
            requires: evaluate_declarations(extension, Relation::DependsUpon)?,
            phase: resolve_phase(&ty),
            roles: resolve_roles(&ty),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Plain {
        ty: Arc<ExtensionType>,
        dep: DeclaredValue,
    }

    impl Extension for Plain {
        fn extension_type(&self) -> Arc<ExtensionType> {
            Arc::clone(&self.ty)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn dep_accessor() -> DeclaredAccessor {
        DeclaredAccessor::typed::<Plain, _>("dependsUponObject", Relation::DependsUpon, |p| {
            p.dep.clone()
        })
    }

    #[test]
    fn test_flatten_nested_values() {
        let value = DeclaredValue::from(vec![
            DeclaredValue::from("a"),
            DeclaredValue::Absent,
            DeclaredValue::from(["b", "c"]),
        ]);
        let mut keys = Vec::new();
        value.flatten_into(&mut keys);
        assert_eq!(
            keys,
            vec![
                DependencyKey::from("a"),
                DependencyKey::from("b"),
                DependencyKey::from("c")
            ]
        );
    }

    #[test]
    fn test_ancestors_nearest_first_and_deduplicated() {
        let iface = ExtensionType::builder("Iface").build();
        let base = ExtensionType::builder("Base").extends(&iface).build();
        let sub = ExtensionType::builder("Sub")
            .extends(&base)
            .extends(&iface)
            .build();

        let names: Vec<_> = sub.ancestors().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["Sub", "Base", "Iface"]);
    }

    #[test]
    fn test_phase_from_nearest_ancestor() {
        let post_iface = ExtensionType::builder("PostIface")
            .phase(Phase::Post)
            .build();
        let pre = ExtensionType::builder("Pre").phase(Phase::Pre).build();
        let sub = ExtensionType::builder("Sub")
            .extends(&pre)
            .extends(&post_iface)
            .build();
        let deep = ExtensionType::builder("Deep").extends(&sub).build();

        assert_eq!(resolve_phase(&deep), Phase::Pre);
        assert_eq!(
            resolve_phase(&ExtensionType::builder("None").build()),
            Phase::Default
        );
    }

    #[test]
    fn test_roles_inherited_from_interfaces() {
        let sensor = ExtensionType::builder("Sensor")
            .role(Capability::Sensor)
            .build();
        let fake = ExtensionType::builder("FakeSensor").extends(&sensor).build();

        let roles = resolve_roles(&fake);
        assert!(roles.is_assignable_to(Capability::Sensor));
        assert!(roles.is_assignable_to(Capability::Extension));
        assert!(!roles.is_assignable_to(Capability::PostJob));
    }

    #[test]
    fn test_accessor_values_inherited_by_subtype() {
        let base = ExtensionType::builder("Base")
            .depends_upon("flag")
            .accessor(dep_accessor())
            .build();
        let sub = ExtensionType::builder("Sub")
            .extends(&base)
            .depends_upon("other")
            .build();
        let ext = Plain {
            ty: sub,
            dep: "foo".into(),
        };

        let keys = evaluate_declarations(&ext, Relation::DependsUpon).unwrap();
        assert_eq!(
            keys,
            vec![
                DependencyKey::from("other"),
                DependencyKey::from("flag"),
                DependencyKey::from("foo")
            ]
        );
        assert!(
            evaluate_declarations(&ext, Relation::DependedUpon)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_private_accessor_rejected() {
        let ty = ExtensionType::builder("Wrong")
            .accessor(dep_accessor().with_visibility(Visibility::Private))
            .build();
        let ext = Plain {
            ty,
            dep: "foo".into(),
        };

        let err = evaluate_declarations(&ext, Relation::DependsUpon).unwrap_err();
        assert!(matches!(err, Error::AccessorNotPublic { .. }));
        assert!(err.to_string().contains("dependsUponObject"));
    }

    #[test]
    fn test_parameterised_accessor_rejected() {
        let ty = ExtensionType::builder("Wrong")
            .accessor(dep_accessor().with_parameters(1))
            .build();
        let ext = Plain {
            ty,
            dep: DeclaredValue::Absent,
        };

        let err = evaluate_declarations(&ext, Relation::DependsUpon).unwrap_err();
        assert!(matches!(err, Error::AccessorHasParameters { arity: 1, .. }));
    }

    #[test]
    fn test_failing_accessor_reports_reason() {
        let ty = ExtensionType::builder("Broken")
            .accessor(DeclaredAccessor::new(
                "generates",
                Relation::DependedUpon,
                |_| Err("boom".into()),
            ))
            .build();
        let ext = Plain {
            ty,
            dep: DeclaredValue::Absent,
        };

        let err = evaluate_declarations(&ext, Relation::DependedUpon).unwrap_err();
        match err {
            Error::AccessorFailed {
                extension,
                accessor,
                reason,
                ..
            } => {
                assert_eq!(extension, "Broken");
                assert_eq!(accessor, "generates");
                assert_eq!(reason, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_accessors_of_other_relation_not_invoked() {
        let ty = ExtensionType::builder("Mixed")
            .accessor(
                DeclaredAccessor::new("broken", Relation::DependedUpon, |_| Err("boom".into()))
                    .with_visibility(Visibility::Private),
            )
            .build();
        let ext = Plain {
            ty,
            dep: DeclaredValue::Absent,
        };

        assert!(evaluate_declarations(&ext, Relation::DependsUpon).is_ok());
    }
}
