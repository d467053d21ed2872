//! Container hierarchy the dictionary reads extensions from.
//!
//! A child container shares its parent through an `Arc`, so once a child
//! exists its ancestors can no longer be modified. Queries are pure reads
//! over that snapshot and may run concurrently.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::capability::{Capability, CapabilitySet};
use crate::extension::{Extension, ExtensionId};
use crate::metadata::resolve_roles;

/// A registered extension with its roles resolved at registration time.
#[derive(Clone)]
struct Registration {
    extension: Arc<dyn Extension>,
    roles: CapabilitySet,
}

/// A registry of extensions, optionally nested in a parent registry.
pub struct ComponentContainer {
    name: String,
    parent: Option<Arc<ComponentContainer>>,
    components: Vec<Registration>,
}

impl Default for ComponentContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentContainer {
    /// Create a root container.
    pub fn new() -> Self {
        Self::named("root")
    }

    /// Create a root container with a name used in logs.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            components: Vec::new(),
        }
    }

    /// Create an empty child whose queries also see this container.
    pub fn create_child(self: &Arc<Self>) -> Self {
        self.create_child_named(format!("{}/child", self.name))
    }

    pub fn create_child_named(self: &Arc<Self>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Some(Arc::clone(self)),
            components: Vec::new(),
        }
    }

    /// Register an extension. Registering the same object twice in one
    /// container is a no-op.
    pub fn add_singleton(&mut self, extension: Arc<dyn Extension>) -> &mut Self {
        let id = ExtensionId::from(&extension);
        if self
            .components
            .iter()
            .any(|r| ExtensionId::from(&r.extension) == id)
        {
            tracing::debug!(container = %self.name, extension = %extension.name(), "Extension already registered");
            return self;
        }

        let roles = resolve_roles(&extension.extension_type());
        self.components.push(Registration { extension, roles });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ComponentContainer>> {
        self.parent.as_ref()
    }

    /// Extensions registered directly in this container, in registration order.
    pub fn components(&self) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.components.iter().map(|r| &r.extension)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Local registrations assignable to `capability`.
    pub fn components_by_capability(&self, capability: Capability) -> Vec<Arc<dyn Extension>> {
        self.components
            .iter()
            .filter(|r| r.roles.is_assignable_to(capability))
            .map(|r| Arc::clone(&r.extension))
            .collect()
    }

    /// Every extension assignable to `capability` visible from here.
    ///
    /// Local registrations come first, then each ancestor's in turn. An
    /// object registered at several levels is returned once, at its first
    /// position.
    pub fn collect_extensions(&self, capability: Capability) -> Vec<Arc<dyn Extension>> {
        let mut seen: HashSet<ExtensionId> = HashSet::new();
        let mut extensions = Vec::new();

        let mut current = Some(self);
        while let Some(container) = current {
            for extension in container.components_by_capability(capability) {
                if seen.insert(ExtensionId::from(&extension)) {
                    extensions.push(extension);
                }
            }
            current = container.parent.as_deref();
        }

        extensions
    }
}

impl fmt::Debug for ComponentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContainer")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("components", &self.components.len())
            .finish()
    }
}
