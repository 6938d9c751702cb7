//! Step registry: reusable steps, chains and workflows
//!
//! Steps (refs), chains and workflows live in independent namespaces. The
//! registry is read-only once loaded; resolution only ever borrows it.

pub mod loader;
pub mod metadata;

pub use loader::load_registry;
pub use metadata::{generate_metadata, Owners, RegistryInfo};

use crate::core::{LiteralTestStep, MultiStageTestConfiguration, TestStep};
use crate::core::scalar;
use crate::resolve::{self, ResolveError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which registry namespace a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Ref,
    Chain,
    Workflow,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementKind::Ref => "ref",
            ElementKind::Chain => "chain",
            ElementKind::Workflow => "workflow",
        })
    }
}

/// Named, ordered sequence of steps and nested chains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    #[serde(rename = "as")]
    pub name: String,

    pub steps: Vec<TestStep>,

    /// Environment propagated to every member
    #[serde(default, deserialize_with = "scalar::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Named `pre`/`test`/`post` triple
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(rename = "as")]
    pub name: String,

    pub steps: MultiStageTestConfiguration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Registry error types
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: {kind} {name:?} does not match its location, expected {expected:?}", .path.display())]
    NameMismatch {
        path: PathBuf,
        kind: ElementKind,
        name: String,
        expected: String,
    },

    #[error("duplicate {kind} {name:?}")]
    Duplicate { kind: ElementKind, name: String },

    #[error("{}: not a ref, chain or workflow file", .path.display())]
    UnknownFile { path: PathBuf },

    #[error("invalid registry: {0}")]
    Invalid(#[from] ResolveError),
}

/// All registry definitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    pub refs: BTreeMap<String, LiteralTestStep>,
    pub chains: BTreeMap<String, Chain>,
    pub workflows: BTreeMap<String, Workflow>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step, rejecting a name already taken by another step
    pub fn insert_ref(&mut self, step: LiteralTestStep) -> Result<(), RegistryError> {
        if self.refs.contains_key(&step.name) {
            return Err(RegistryError::Duplicate {
                kind: ElementKind::Ref,
                name: step.name,
            });
        }
        self.refs.insert(step.name.clone(), step);
        Ok(())
    }

    /// Add a chain, rejecting a name already taken by another chain
    pub fn insert_chain(&mut self, chain: Chain) -> Result<(), RegistryError> {
        if self.chains.contains_key(&chain.name) {
            return Err(RegistryError::Duplicate {
                kind: ElementKind::Chain,
                name: chain.name,
            });
        }
        self.chains.insert(chain.name.clone(), chain);
        Ok(())
    }

    /// Add a workflow, rejecting a name already taken by another workflow
    pub fn insert_workflow(&mut self, workflow: Workflow) -> Result<(), RegistryError> {
        if self.workflows.contains_key(&workflow.name) {
            return Err(RegistryError::Duplicate {
                kind: ElementKind::Workflow,
                name: workflow.name,
            });
        }
        self.workflows.insert(workflow.name.clone(), workflow);
        Ok(())
    }

    pub fn reference(&self, name: &str) -> Option<&LiteralTestStep> {
        self.refs.get(name)
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.get(name)
    }

    pub fn workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name)
    }

    /// Total number of definitions across all namespaces
    pub fn len(&self) -> usize {
        self.refs.len() + self.chains.len() + self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that every chain and workflow expands to literal steps.
    ///
    /// Reports all broken chains and workflows at once.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut errors = Vec::new();

        for name in self.chains.keys() {
            if let Err(err) = resolve::expand_chain(name, self) {
                errors.push(err);
            }
        }

        for name in self.workflows.keys() {
            let test = MultiStageTestConfiguration {
                workflow: Some(name.clone()),
                ..Default::default()
            };
            if let Err(err) = resolve::resolve_test(name, &test, self) {
                errors.push(ResolveError::InTest {
                    test: name.clone(),
                    source: Box::new(err),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Invalid(ResolveError::Aggregate(errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str) -> LiteralTestStep {
        LiteralTestStep {
            name: name.to_string(),
            from: Some("cli".to_string()),
            commands: format!("run-{}", name),
            ..Default::default()
        }
    }

    #[test]
    fn test_namespaces_are_independent() {
        let mut registry = Registry::new();
        registry.insert_ref(step("install")).unwrap();
        registry
            .insert_chain(Chain {
                name: "install".to_string(),
                steps: vec![TestStep::reference("install")],
                ..Default::default()
            })
            .unwrap();

        assert!(registry.reference("install").is_some());
        assert!(registry.chain("install").is_some());
        assert!(registry.workflow("install").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_ref_rejected() {
        let mut registry = Registry::new();
        registry.insert_ref(step("install")).unwrap();
        let err = registry.insert_ref(step("install")).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Duplicate { kind: ElementKind::Ref, ref name } if name == "install"
        ));
    }

    #[test]
    fn test_validate_reports_dangling_members() {
        let mut registry = Registry::new();
        registry.insert_ref(step("install")).unwrap();
        registry
            .insert_chain(Chain {
                name: "broken".to_string(),
                steps: vec![TestStep::reference("install"), TestStep::reference("missing")],
                ..Default::default()
            })
            .unwrap();
        registry
            .insert_workflow(Workflow {
                name: "ipi".to_string(),
                steps: MultiStageTestConfiguration {
                    pre: Some(vec![TestStep::chain("absent")]),
                    ..Default::default()
                },
                documentation: None,
            })
            .unwrap();

        let err = registry.validate().unwrap_err();
        match err {
            RegistryError::Invalid(ResolveError::Aggregate(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("Expected aggregated resolution errors, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_consistent_registry() {
        let mut registry = Registry::new();
        registry.insert_ref(step("install")).unwrap();
        registry
            .insert_chain(Chain {
                name: "setup".to_string(),
                steps: vec![TestStep::reference("install")],
                ..Default::default()
            })
            .unwrap();
        registry
            .insert_workflow(Workflow {
                name: "ipi".to_string(),
                steps: MultiStageTestConfiguration {
                    pre: Some(vec![TestStep::chain("setup")]),
                    ..Default::default()
                },
                documentation: None,
            })
            .unwrap();

        registry.validate().unwrap();
    }
}
