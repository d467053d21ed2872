//! The extension object model consumed by the dictionary.

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::metadata::ExtensionType;
use crate::optimizer::{PostJobDescriptor, SensorDescriptor};

/// An analysis extension contributed by a plugin.
///
/// The dictionary never mutates extensions; it only reads their type
/// metadata and optional capabilities. Identity is reference identity, see
/// [`ExtensionId`].
pub trait Extension: Any + Send + Sync {
    /// The runtime type descriptor: roles, phase and declarations.
    fn extension_type(&self) -> Arc<ExtensionType>;

    /// Access to the concrete value, used by declaration accessors.
    fn as_any(&self) -> &dyn Any;

    /// Human-readable name used in logs and error messages.
    fn name(&self) -> String {
        self.extension_type().name().to_string()
    }

    /// The "should this run on the current unit" capability, if implemented.
    fn as_unit_check(&self) -> Option<&dyn UnitCheck> {
        None
    }

    fn sensor_descriptor(&self) -> Option<SensorDescriptor> {
        None
    }

    fn post_job_descriptor(&self) -> Option<PostJobDescriptor> {
        None
    }
}

impl fmt::Debug for dyn Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name())
            .field("id", &ExtensionId::of(self))
            .finish()
    }
}

/// Eligibility check an extension may implement.
pub trait UnitCheck {
    /// Return `false` to be excluded from the analysis of `unit`.
    fn should_execute_on(&self, unit: &AnalysisUnit) -> bool;
}

/// Reference identity of a registered extension.
///
/// Derived from the address of the shared allocation, so it is stable for as
/// long as the container keeps the extension alive. Two structurally equal
/// extensions registered separately have different ids.
///
/// The id does not keep its target alive. A key built from an extension that
/// is later dropped may match whatever is allocated at the same address
/// afterwards, so keys must only refer to extensions owned by the container
/// hierarchy being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtensionId(usize);

impl ExtensionId {
    pub fn of(extension: &dyn Extension) -> Self {
        Self(std::ptr::from_ref(extension).cast::<()>() as usize)
    }
}

impl From<&Arc<dyn Extension>> for ExtensionId {
    fn from(extension: &Arc<dyn Extension>) -> Self {
        Self::of(extension.as_ref())
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// The unit (project or module) currently being analysed.
///
/// Opaque to the dictionary beyond its key; it is only handed to
/// [`UnitCheck`] implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisUnit {
    key: String,
    tags: BTreeSet<String>,
}

impl AnalysisUnit {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tags: BTreeSet::new(),
        }
    }

    /// Attach a free-form tag (e.g. `root`, `leaf`) extensions may inspect.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl fmt::Display for AnalysisUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}
