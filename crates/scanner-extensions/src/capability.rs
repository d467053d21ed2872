//! Capability roles an extension can play.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A role an extension may implement.
///
/// `Extension` is the generic base role: every registered extension is
/// assignable to it. `BuildBreaker` is a specialised post-job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Extension,
    Sensor,
    Decorator,
    PostJob,
    BuildBreaker,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Extension => "extension",
            Capability::Sensor => "sensor",
            Capability::Decorator => "decorator",
            Capability::PostJob => "post-job",
            Capability::BuildBreaker => "build-breaker",
        }
    }

    /// Roles implied by this one, itself excluded.
    pub fn implied(&self) -> &'static [Capability] {
        match self {
            Capability::BuildBreaker => &[Capability::PostJob, Capability::Extension],
            Capability::Extension => &[],
            _ => &[Capability::Extension],
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "extension" => Ok(Capability::Extension),
            "sensor" => Ok(Capability::Sensor),
            "decorator" => Ok(Capability::Decorator),
            "post-job" | "postjob" => Ok(Capability::PostJob),
            "build-breaker" | "buildbreaker" => Ok(Capability::BuildBreaker),
            _ => Err(format!("unknown capability: {}", s)),
        }
    }
}

/// The full set of roles of an extension type, implied roles included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    roles: BTreeSet<Capability>,
}

impl CapabilitySet {
    /// A set holding only the generic `Extension` role.
    pub fn new() -> Self {
        let mut set = Self::default();
        set.roles.insert(Capability::Extension);
        set
    }

    /// Add a role together with everything it implies.
    pub fn insert(&mut self, capability: Capability) {
        self.roles.insert(capability);
        self.roles.extend(capability.implied().iter().copied());
    }

    /// Whether an extension with these roles is assignable to `capability`.
    pub fn is_assignable_to(&self, capability: Capability) -> bool {
        self.roles.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.roles.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_set_is_an_extension() {
        let set = CapabilitySet::new();
        assert!(set.is_assignable_to(Capability::Extension));
        assert!(!set.is_assignable_to(Capability::Sensor));
    }

    #[test]
    fn test_build_breaker_is_a_post_job() {
        let set: CapabilitySet = [Capability::BuildBreaker].into_iter().collect();
        assert!(set.is_assignable_to(Capability::BuildBreaker));
        assert!(set.is_assignable_to(Capability::PostJob));
        assert!(set.is_assignable_to(Capability::Extension));
        assert!(!set.is_assignable_to(Capability::Sensor));
    }

    #[test]
    fn test_post_job_is_not_a_build_breaker() {
        let set: CapabilitySet = [Capability::PostJob].into_iter().collect();
        assert!(!set.is_assignable_to(Capability::BuildBreaker));
    }

    #[test]
    fn test_parse_capability() {
        assert_eq!("sensor".parse::<Capability>(), Ok(Capability::Sensor));
        assert_eq!("post_job".parse::<Capability>(), Ok(Capability::PostJob));
        assert_eq!(
            "Build-Breaker".parse::<Capability>(),
            Ok(Capability::BuildBreaker)
        );
        assert!("widget".parse::<Capability>().is_err());
    }
}
