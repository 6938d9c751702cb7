//! Step domain model

use crate::core::config::ImageStreamTagReference;
use crate::core::scalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single entry in a `pre`/`test`/`post` list of a multi-stage test
///
/// Either a reference into the registry (a step or a chain) or a step
/// spelled out inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestStep {
    /// Reference to a registry step by name
    Reference {
        #[serde(rename = "ref", deserialize_with = "scalar::string")]
        name: String,
    },
    /// Reference to a registry chain by name
    Chain {
        #[serde(deserialize_with = "scalar::string")]
        chain: String,
    },
    /// A step defined in place
    Literal(LiteralTestStep),
}

impl TestStep {
    /// Build a step reference
    pub fn reference(name: impl Into<String>) -> Self {
        TestStep::Reference { name: name.into() }
    }

    /// Build a chain reference
    pub fn chain(name: impl Into<String>) -> Self {
        TestStep::Chain { chain: name.into() }
    }
}

/// A fully specified step: nothing left to look up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralTestStep {
    /// Step name, unique within a resolved test
    #[serde(rename = "as")]
    pub name: String,

    /// Pipeline image the step runs in
    #[serde(default, deserialize_with = "scalar::option_string", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Image stream tag overriding `from`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_image: Option<ImageStreamTagReference>,

    /// Shell commands to run
    #[serde(default, deserialize_with = "scalar::string")]
    pub commands: String,

    /// Resource requests and limits
    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,

    /// Environment exposed to the step
    #[serde(default, deserialize_with = "scalar::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Images the step needs, keyed by the environment variable that
    /// receives the pull spec
    #[serde(default, deserialize_with = "scalar::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
}

impl LiteralTestStep {
    /// Layer outer environment and dependencies under this step's own.
    ///
    /// Keys already declared on the step are kept.
    pub fn inherit(&mut self, env: &BTreeMap<String, String>, dependencies: &BTreeMap<String, String>) {
        for (key, value) in env {
            self.env.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (key, value) in dependencies {
            self.dependencies
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Compute resources for a step, e.g. `cpu: 100m`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default, deserialize_with = "scalar::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "scalar::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.limits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step_references() {
        let yaml = r#"
- ref: ipi-install
- chain: ipi-deprovision
- as: e2e
  from: tests
  commands: make test
"#;
        let steps: Vec<TestStep> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(steps[0], TestStep::reference("ipi-install"));
        assert_eq!(steps[1], TestStep::chain("ipi-deprovision"));
        match &steps[2] {
            TestStep::Literal(step) => {
                assert_eq!(step.name, "e2e");
                assert_eq!(step.from.as_deref(), Some("tests"));
                assert_eq!(step.commands, "make test");
            }
            other => panic!("Expected literal step, got {:?}", other),
        }
    }

    #[test]
    fn test_inherit_keeps_step_values() {
        let mut step = LiteralTestStep {
            name: "step".to_string(),
            env: BTreeMap::from([("A".to_string(), "inner".to_string())]),
            ..Default::default()
        };
        let env = BTreeMap::from([
            ("A".to_string(), "outer".to_string()),
            ("B".to_string(), "outer".to_string()),
        ]);
        let deps = BTreeMap::from([("RELEASE_IMAGE".to_string(), "release:latest".to_string())]);

        step.inherit(&env, &deps);

        assert_eq!(step.env["A"], "inner");
        assert_eq!(step.env["B"], "outer");
        assert_eq!(step.dependencies["RELEASE_IMAGE"], "release:latest");
    }

    #[test]
    fn test_empty_resources_not_serialized() {
        let step = LiteralTestStep {
            name: "step".to_string(),
            commands: "true".to_string(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&step).unwrap();
        assert!(!yaml.contains("resources"));
        assert!(!yaml.contains("env"));
    }
}
