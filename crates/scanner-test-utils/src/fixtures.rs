//! Fake extensions for dictionary tests.
//!
//! Every fixture is a [`FakeExtension`]: what distinguishes them is the
//! [`ExtensionType`] they are built with. Types are shared statics, so two
//! fixtures built by the same function share a hierarchy, as instances of
//! one class would.
//!
//! # Example
//!
//! ```rust
//! use scanner_extensions::Capability;
//! use scanner_test_utils::fixtures::{self, names};
//!
//! let dict = fixtures::dictionary_of(vec![
//!     fixtures::method_dependent_of("consumer", "foo"),
//!     fixtures::generates_something("provider", "foo"),
//! ]);
//! let order = dict.select_without_filter(Capability::Extension).unwrap();
//! assert_eq!(names(&order), vec!["provider", "consumer"]);
//! ```

use std::any::Any;
use std::sync::{Arc, LazyLock};

use scanner_extensions::{
    AnalysisUnit, Capability, ComponentContainer, DeclaredAccessor, DeclaredValue, Extension,
    ExtensionType, Phase, PostJobDescriptor, Relation, ScannerExtensionDictionary,
    SensorDescriptor, UnitCheck, Visibility,
};

/// A configurable extension instance.
pub struct FakeExtension {
    name: String,
    ty: Arc<ExtensionType>,
    depends_upon: DeclaredValue,
    depended_upon: DeclaredValue,
    eligible: Option<bool>,
    sensor: Option<SensorDescriptor>,
    post_job: Option<PostJobDescriptor>,
}

impl FakeExtension {
    pub fn new(name: impl Into<String>, ty: &Arc<ExtensionType>) -> Self {
        Self {
            name: name.into(),
            ty: Arc::clone(ty),
            depends_upon: DeclaredValue::Absent,
            depended_upon: DeclaredValue::Absent,
            eligible: None,
            sensor: None,
            post_job: None,
        }
    }

    /// Value returned by the `dependsUpon` accessor, when the type has one.
    pub fn with_depends_upon(mut self, value: impl Into<DeclaredValue>) -> Self {
        self.depends_upon = value.into();
        self
    }

    /// Value returned by the `provides` accessor, when the type has one.
    pub fn with_depended_upon(mut self, value: impl Into<DeclaredValue>) -> Self {
        self.depended_upon = value.into();
        self
    }

    /// Implement the unit check with a fixed answer.
    pub fn eligible(mut self, answer: bool) -> Self {
        self.eligible = Some(answer);
        self
    }

    pub fn with_sensor_descriptor(mut self, descriptor: SensorDescriptor) -> Self {
        self.sensor = Some(descriptor);
        self
    }

    pub fn with_post_job_descriptor(mut self, descriptor: PostJobDescriptor) -> Self {
        self.post_job = Some(descriptor);
        self
    }

    pub fn into_arc(self) -> Arc<dyn Extension> {
        Arc::new(self)
    }
}

impl Extension for FakeExtension {
    fn extension_type(&self) -> Arc<ExtensionType> {
        Arc::clone(&self.ty)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn as_unit_check(&self) -> Option<&dyn UnitCheck> {
        self.eligible.map(|_| self as &dyn UnitCheck)
    }

    fn sensor_descriptor(&self) -> Option<SensorDescriptor> {
        self.sensor.clone()
    }

    fn post_job_descriptor(&self) -> Option<PostJobDescriptor> {
        self.post_job.clone()
    }
}

impl UnitCheck for FakeExtension {
    fn should_execute_on(&self, _unit: &AnalysisUnit) -> bool {
        self.eligible.unwrap_or(true)
    }
}

fn depends_upon_accessor() -> DeclaredAccessor {
    DeclaredAccessor::typed::<FakeExtension, _>("dependsUpon", Relation::DependsUpon, |ext| {
        ext.depends_upon.clone()
    })
}

fn provides_accessor() -> DeclaredAccessor {
    DeclaredAccessor::typed::<FakeExtension, _>("provides", Relation::DependedUpon, |ext| {
        ext.depended_upon.clone()
    })
}

pub static SENSOR: LazyLock<Arc<ExtensionType>> =
    LazyLock::new(|| ExtensionType::builder("Sensor").role(Capability::Sensor).build());

pub static DECORATOR: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("Decorator")
        .role(Capability::Decorator)
        .build()
});

pub static POST_JOB: LazyLock<Arc<ExtensionType>> =
    LazyLock::new(|| ExtensionType::builder("PostJob").role(Capability::PostJob).build());

pub static BUILD_BREAKER: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("BuildBreaker")
        .role(Capability::BuildBreaker)
        .build()
});

static FAKE_SENSOR: LazyLock<Arc<ExtensionType>> =
    LazyLock::new(|| ExtensionType::builder("FakeSensor").extends(&SENSOR).build());

static FAKE_DECORATOR: LazyLock<Arc<ExtensionType>> =
    LazyLock::new(|| ExtensionType::builder("FakeDecorator").extends(&DECORATOR).build());

static FAKE_POST_JOB: LazyLock<Arc<ExtensionType>> =
    LazyLock::new(|| ExtensionType::builder("FakePostJob").extends(&POST_JOB).build());

static FAKE_BUILD_BREAKER: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("FakeBuildBreaker")
        .extends(&BUILD_BREAKER)
        .build()
});

static METHOD_DEPENDENT_OF: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("MethodDependentOf")
        .accessor(depends_upon_accessor())
        .build()
});

static GENERATES_SOMETHING: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("GeneratesSomething")
        .accessor(provides_accessor())
        .build()
});

static DECLARES_BOTH: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("DeclaresBoth")
        .accessor(depends_upon_accessor())
        .accessor(provides_accessor())
        .build()
});

static SUB_GENERATES_SOMETHING: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("SubClass")
        .extends(&GENERATES_SOMETHING)
        .build()
});

static CLASS_DEPENDED_UPON: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("ClassDependedUpon")
        .depended_upon("flag")
        .build()
});

static CLASS_DEPENDS_UPON: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("ClassDependsUpon")
        .depends_upon("flag")
        .build()
});

static INTERFACE_DEPENDED_UPON: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("InterfaceDependedUpon")
        .depended_upon("interface-flag")
        .build()
});

static INTERFACE_DEPENDS_UPON: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("InterfaceDependsUpon")
        .depends_upon("interface-flag")
        .build()
});

static IMPLEMENTS_DEPENDED_UPON: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("ImplementsDependedUpon")
        .extends(&INTERFACE_DEPENDED_UPON)
        .build()
});

static IMPLEMENTS_DEPENDS_UPON: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("ImplementsDependsUpon")
        .extends(&INTERFACE_DEPENDS_UPON)
        .build()
});

static PRE_SENSOR: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("PreSensor")
        .extends(&SENSOR)
        .phase(Phase::Pre)
        .build()
});

static POST_SENSOR: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("PostSensor")
        .extends(&SENSOR)
        .phase(Phase::Post)
        .build()
});

static PRE_SENSOR_SUBCLASS: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("PreSensorSubclass")
        .extends(&PRE_SENSOR)
        .build()
});

static POST_SENSOR_SUBCLASS: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("PostSensorSubclass")
        .extends(&POST_SENSOR)
        .build()
});

static CHECK_UNIT: LazyLock<Arc<ExtensionType>> =
    LazyLock::new(|| ExtensionType::builder("CheckUnit").build());

static PRIVATE_ACCESSOR: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("PrivateAccessor")
        .accessor(depends_upon_accessor().with_visibility(Visibility::Private))
        .build()
});

static PARAMETERISED_ACCESSOR: LazyLock<Arc<ExtensionType>> = LazyLock::new(|| {
    ExtensionType::builder("ParameterisedAccessor")
        .accessor(depends_upon_accessor().with_parameters(1))
        .build()
});

pub fn fake_sensor(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &FAKE_SENSOR).into_arc()
}

pub fn fake_decorator(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &FAKE_DECORATOR).into_arc()
}

pub fn fake_post_job(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &FAKE_POST_JOB).into_arc()
}

pub fn build_breaker(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &FAKE_BUILD_BREAKER).into_arc()
}

/// A plain extension whose public `dependsUpon` accessor returns `dependency`.
pub fn method_dependent_of(name: &str, dependency: impl Into<DeclaredValue>) -> Arc<dyn Extension> {
    FakeExtension::new(name, &METHOD_DEPENDENT_OF)
        .with_depends_upon(dependency)
        .into_arc()
}

/// A plain extension whose public `provides` accessor returns `generated`.
pub fn generates_something(name: &str, generated: impl Into<DeclaredValue>) -> Arc<dyn Extension> {
    FakeExtension::new(name, &GENERATES_SOMETHING)
        .with_depended_upon(generated)
        .into_arc()
}

/// A plain extension with both accessors.
pub fn declares(
    name: &str,
    requires: impl Into<DeclaredValue>,
    generates: impl Into<DeclaredValue>,
) -> Arc<dyn Extension> {
    FakeExtension::new(name, &DECLARES_BOTH)
        .with_depends_upon(requires)
        .with_depended_upon(generates)
        .into_arc()
}

/// Inherits the `provides` accessor of [`generates_something`].
pub fn generates_something_subclass(
    name: &str,
    generated: impl Into<DeclaredValue>,
) -> Arc<dyn Extension> {
    FakeExtension::new(name, &SUB_GENERATES_SOMETHING)
        .with_depended_upon(generated)
        .into_arc()
}

/// Generates `"flag"` at type level.
pub fn class_depended_upon(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &CLASS_DEPENDED_UPON).into_arc()
}

/// Requires `"flag"` at type level.
pub fn class_depends_upon(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &CLASS_DEPENDS_UPON).into_arc()
}

/// Generates `"interface-flag"` through an implemented interface.
pub fn implements_depended_upon(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &IMPLEMENTS_DEPENDED_UPON).into_arc()
}

/// Requires `"interface-flag"` through an implemented interface.
pub fn implements_depends_upon(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &IMPLEMENTS_DEPENDS_UPON).into_arc()
}

pub fn pre_sensor(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &PRE_SENSOR).into_arc()
}

pub fn post_sensor(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &POST_SENSOR).into_arc()
}

pub fn pre_sensor_subclass(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &PRE_SENSOR_SUBCLASS).into_arc()
}

pub fn post_sensor_subclass(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &POST_SENSOR_SUBCLASS).into_arc()
}

/// An extension answering every unit check with `answer`.
pub fn check_unit(name: &str, answer: bool) -> Arc<dyn Extension> {
    FakeExtension::new(name, &CHECK_UNIT)
        .eligible(answer)
        .into_arc()
}

/// Declares a dependency through a private accessor.
pub fn private_accessor(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &PRIVATE_ACCESSOR)
        .with_depends_upon("foo")
        .into_arc()
}

/// Declares a dependency through an accessor taking a parameter.
pub fn parameterised_accessor(name: &str) -> Arc<dyn Extension> {
    FakeExtension::new(name, &PARAMETERISED_ACCESSOR)
        .with_depends_upon("foo")
        .into_arc()
}

/// A root container holding `extensions`, in order.
pub fn container_of(extensions: Vec<Arc<dyn Extension>>) -> Arc<ComponentContainer> {
    let mut container = ComponentContainer::new();
    for extension in extensions {
        container.add_singleton(extension);
    }
    Arc::new(container)
}

/// A dictionary over a root container holding `extensions`, in order.
pub fn dictionary_of(extensions: Vec<Arc<dyn Extension>>) -> ScannerExtensionDictionary {
    ScannerExtensionDictionary::new(container_of(extensions))
}

/// Display names, in order.
pub fn names(extensions: &[Arc<dyn Extension>]) -> Vec<String> {
    extensions.iter().map(|ext| ext.name()).collect()
}
