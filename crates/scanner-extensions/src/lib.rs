//! Scanner extension dictionary.
//!
//! Collects the analysis extensions registered in a container hierarchy,
//! keeps those of a requested capability that are eligible for the current
//! unit, and orders them so every declared dependency runs first.
//!
//! - [`container`]: the container hierarchy extensions are registered in
//! - [`metadata`]: type descriptors, phases and dependency declarations
//! - [`dependency`]: graph construction and the stable topological sort
//! - [`dictionary`]: the selection entry points
//! - [`optimizer`], [`settings`]: descriptor-based skipping and its inputs
//! - [`manifest`]: declarative plans for dry runs

pub mod capability;
pub mod container;
pub mod dependency;
pub mod dictionary;
pub mod error;
pub mod extension;
pub mod manifest;
pub mod metadata;
pub mod optimizer;
pub mod settings;

/// The canonical filename of an extension plan manifest.
pub const PLAN_FILENAME: &str = "scanner-plan.toml";

pub use capability::{Capability, CapabilitySet};
pub use container::ComponentContainer;
pub use dependency::DependencyGraph;
pub use dictionary::{ExtensionMatcher, ScannerExtensionDictionary};
pub use error::{Error, Result};
pub use extension::{AnalysisUnit, Extension, ExtensionId, UnitCheck};
pub use manifest::{BuiltPlan, DeclaredExtension, ExtensionPlan};
pub use metadata::{
    DeclaredAccessor, DeclaredValue, DependencyKey, EffectiveDeclarations, ExtensionType, Phase,
    Relation, Visibility,
};
pub use optimizer::{PostJobDescriptor, PostJobOptimizer, SensorDescriptor, SensorOptimizer};
pub use settings::{AnalysisSettings, SettingsResolver};
