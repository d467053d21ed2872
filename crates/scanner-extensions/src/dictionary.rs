//! The scanner extension dictionary.
//!
//! Answers "which extensions of this capability should run, and in which
//! order" over a container hierarchy.

use std::sync::Arc;

use crate::capability::Capability;
use crate::container::ComponentContainer;
use crate::dependency::DependencyGraph;
use crate::error::Result;
use crate::extension::{AnalysisUnit, Extension};
use crate::metadata::{self, DependencyKey, Relation};
use crate::optimizer::{PostJobOptimizer, SensorOptimizer};

/// Caller-supplied predicate narrowing a selection.
pub trait ExtensionMatcher {
    fn accept(&self, extension: &dyn Extension) -> bool;
}

impl<F> ExtensionMatcher for F
where
    F: Fn(&dyn Extension) -> bool,
{
    fn accept(&self, extension: &dyn Extension) -> bool {
        self(extension)
    }
}

/// Selects and orders the extensions visible from a container.
#[derive(Debug)]
pub struct ScannerExtensionDictionary {
    container: Arc<ComponentContainer>,
    sensor_optimizer: SensorOptimizer,
    post_job_optimizer: PostJobOptimizer,
}

impl ScannerExtensionDictionary {
    pub fn new(container: Arc<ComponentContainer>) -> Self {
        Self {
            container,
            sensor_optimizer: SensorOptimizer::default(),
            post_job_optimizer: PostJobOptimizer::default(),
        }
    }

    pub fn with_sensor_optimizer(mut self, optimizer: SensorOptimizer) -> Self {
        self.sensor_optimizer = optimizer;
        self
    }

    pub fn with_post_job_optimizer(mut self, optimizer: PostJobOptimizer) -> Self {
        self.post_job_optimizer = optimizer;
        self
    }

    pub fn container(&self) -> &Arc<ComponentContainer> {
        &self.container
    }

    /// Extensions assignable to `capability`, filtered and ordered.
    ///
    /// With `check_eligibility` set and a `unit` given, extensions
    /// implementing [`crate::UnitCheck`] that decline the unit are dropped.
    /// The optional `matcher` drops everything it does not accept.
    ///
    /// # Errors
    ///
    /// Fails on any invalid declaration accessor or on a dependency cycle.
    /// No partial result is returned.
    pub fn select(
        &self,
        capability: Capability,
        unit: Option<&AnalysisUnit>,
        check_eligibility: bool,
        matcher: Option<&dyn ExtensionMatcher>,
    ) -> Result<Vec<Arc<dyn Extension>>> {
        let candidates: Vec<Arc<dyn Extension>> = self
            .container
            .collect_extensions(capability)
            .into_iter()
            .filter(|ext| matcher.is_none_or(|m| m.accept(ext.as_ref())))
            .filter(|ext| !check_eligibility || is_eligible(ext.as_ref(), unit))
            .collect();

        tracing::debug!(
            container = %self.container.name(),
            %capability,
            candidates = candidates.len(),
            "Selecting extensions"
        );

        let graph = DependencyGraph::from_candidates(candidates, capability)?;
        let ordered = graph.topological_sort(|ext| ext.name())?;

        tracing::debug!(
            %capability,
            "Execution order: {}",
            ordered
                .iter()
                .map(|ext| ext.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        Ok(ordered)
    }

    /// Every extension assignable to `capability`, ordered, without any
    /// eligibility check or matcher.
    pub fn select_without_filter(&self, capability: Capability) -> Result<Vec<Arc<dyn Extension>>> {
        self.select(capability, None, false, None)
    }

    /// Sensors to run on `unit` in the global or the per-unit pass.
    ///
    /// A sensor with a descriptor runs when the optimizer accepts it and its
    /// `global` flag matches the pass. A sensor without one runs only in the
    /// per-unit pass.
    pub fn select_sensors(
        &self,
        unit: &AnalysisUnit,
        global: bool,
    ) -> Result<Vec<Arc<dyn Extension>>> {
        let matcher = |ext: &dyn Extension| match ext.sensor_descriptor() {
            Some(descriptor) => {
                descriptor.global == global && self.sensor_optimizer.should_execute(&descriptor)
            }
            None => !global,
        };
        self.select(Capability::Sensor, Some(unit), true, Some(&matcher))
    }

    /// Post-jobs the optimizer accepts, build breakers last.
    pub fn select_post_jobs(&self) -> Result<Vec<Arc<dyn Extension>>> {
        let matcher = |ext: &dyn Extension| {
            ext.post_job_descriptor()
                .is_none_or(|descriptor| self.post_job_optimizer.should_execute(&descriptor))
        };
        self.select(Capability::PostJob, None, false, Some(&matcher))
    }

    /// Evaluate one extension's declarations for `relation`.
    pub fn evaluate_declarations(
        &self,
        extension: &dyn Extension,
        relation: Relation,
    ) -> Result<Vec<DependencyKey>> {
        metadata::evaluate_declarations(extension, relation)
    }
}

fn is_eligible(extension: &dyn Extension, unit: Option<&AnalysisUnit>) -> bool {
    let (Some(unit), Some(check)) = (unit, extension.as_unit_check()) else {
        return true;
    };
    let eligible = check.should_execute_on(unit);
    if !eligible {
        tracing::debug!(extension = %extension.name(), %unit, "Extension declined unit");
    }
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::UnitCheck;
    use crate::metadata::{ExtensionType, Phase};
    use crate::optimizer::SensorDescriptor;
    use std::any::Any;

    struct Named {
        name: &'static str,
        ty: Arc<ExtensionType>,
        accepts: Option<&'static str>,
        sensor: Option<SensorDescriptor>,
    }

    impl Extension for Named {
        fn extension_type(&self) -> Arc<ExtensionType> {
            Arc::clone(&self.ty)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn name(&self) -> String {
            self.name.to_string()
        }

        fn as_unit_check(&self) -> Option<&dyn UnitCheck> {
            self.accepts.map(|_| self as &dyn UnitCheck)
        }

        fn sensor_descriptor(&self) -> Option<SensorDescriptor> {
            self.sensor.clone()
        }
    }

    impl UnitCheck for Named {
        fn should_execute_on(&self, unit: &AnalysisUnit) -> bool {
            self.accepts == Some(unit.key())
        }
    }

    fn sensor(name: &'static str) -> Named {
        Named {
            name,
            ty: ExtensionType::builder("Sensor")
                .role(Capability::Sensor)
                .build(),
            accepts: None,
            sensor: None,
        }
    }

    fn dictionary(extensions: Vec<Named>) -> ScannerExtensionDictionary {
        let mut container = ComponentContainer::new();
        for ext in extensions {
            container.add_singleton(Arc::new(ext));
        }
        ScannerExtensionDictionary::new(Arc::new(container))
    }

    fn names(extensions: &[Arc<dyn Extension>]) -> Vec<String> {
        extensions.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_empty_container() {
        let dict = dictionary(Vec::new());
        assert!(dict.select_without_filter(Capability::Sensor).unwrap().is_empty());
    }

    #[test]
    fn test_matcher_narrows_selection() {
        let dict = dictionary(vec![sensor("a"), sensor("b"), sensor("c")]);
        let not_b = |ext: &dyn Extension| ext.name() != "b";

        let selected = dict
            .select(Capability::Sensor, None, false, Some(&not_b))
            .unwrap();
        assert_eq!(names(&selected), vec!["a", "c"]);
    }

    #[test]
    fn test_eligibility_needs_flag_and_unit() {
        let mut picky = sensor("picky");
        picky.accepts = Some("other");
        let dict = dictionary(vec![picky, sensor("plain")]);
        let unit = AnalysisUnit::new("demo");

        let checked = dict
            .select(Capability::Sensor, Some(&unit), true, None)
            .unwrap();
        assert_eq!(names(&checked), vec!["plain"]);

        let unchecked = dict
            .select(Capability::Sensor, Some(&unit), false, None)
            .unwrap();
        assert_eq!(names(&unchecked), vec!["picky", "plain"]);

        let no_unit = dict.select(Capability::Sensor, None, true, None).unwrap();
        assert_eq!(names(&no_unit), vec!["picky", "plain"]);
    }

    #[test]
    fn test_phase_orders_selection() {
        let mut post = sensor("post");
        post.ty = ExtensionType::builder("PostSensor")
            .role(Capability::Sensor)
            .phase(Phase::Post)
            .build();
        let mut pre = sensor("pre");
        pre.ty = ExtensionType::builder("PreSensor")
            .role(Capability::Sensor)
            .phase(Phase::Pre)
            .build();

        let dict = dictionary(vec![sensor("mid"), post, pre]);
        let selected = dict.select_without_filter(Capability::Sensor).unwrap();
        assert_eq!(names(&selected), vec!["pre", "mid", "post"]);
    }

    #[test]
    fn test_global_and_module_sensor_passes() {
        let mut global = sensor("global");
        global.sensor = Some(SensorDescriptor::new("global").global());
        let mut module = sensor("module");
        module.sensor = Some(SensorDescriptor::new("module"));
        let mut java = sensor("java");
        java.sensor = Some(SensorDescriptor::new("java").only_on_languages(["java"]));

        let dict = dictionary(vec![global, module, java, sensor("legacy")]);
        let unit = AnalysisUnit::new("demo");

        assert_eq!(
            names(&dict.select_sensors(&unit, false).unwrap()),
            vec!["module", "legacy"]
        );
        assert_eq!(names(&dict.select_sensors(&unit, true).unwrap()), vec!["global"]);
    }
}
