//! Resolve symbolic multi-stage tests into literal ones
//!
//! Workflows fill in whatever `pre`/`test`/`post` a test leaves out, chains
//! expand into their members, and refs are replaced by the registry's step
//! definitions. Resolution is a pure function of the configuration and the
//! registry snapshot.

pub mod error;

pub use error::ResolveError;

use crate::core::{
    LiteralTestStep, MultiStageTestConfiguration, MultiStageTestConfigurationLiteral,
    ReleaseBuildConfiguration, TestKind, TestStep,
};
use crate::registry::{ElementKind, Registry};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Environment and dependencies handed down to nested steps
#[derive(Debug, Clone, Default)]
struct Inherited {
    env: BTreeMap<String, String>,
    dependencies: BTreeMap<String, String>,
}

impl Inherited {
    /// Layer `env` over the current values; the new values win
    fn nested(&self, env: &BTreeMap<String, String>) -> Self {
        let mut nested = self.clone();
        nested.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        nested
    }
}

/// Resolve every symbolic test of a configuration.
///
/// Literal and container tests are returned unchanged, so resolving an
/// already resolved configuration is a no-op. Failures of all tests are
/// reported together and no partially resolved configuration is returned.
pub fn resolve_config(
    config: &ReleaseBuildConfiguration,
    registry: &Registry,
) -> Result<ReleaseBuildConfiguration, ResolveError> {
    let mut resolved = config.clone();
    let mut errors = Vec::new();

    for test in &mut resolved.tests {
        let outcome = match &test.kind {
            TestKind::Symbolic(steps) => resolve_test(&test.name, steps, registry),
            _ => continue,
        };
        match outcome {
            Ok(literal) => test.kind = TestKind::Literal(literal),
            Err(err) => errors.push(ResolveError::InTest {
                test: test.name.clone(),
                source: Box::new(err),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(ResolveError::Aggregate(errors));
    }

    if let Some(metadata) = &config.metadata {
        info!("Resolved configuration for {}", metadata);
    }
    Ok(resolved)
}

/// Resolve a single multi-stage test
pub fn resolve_test(
    test_name: &str,
    config: &MultiStageTestConfiguration,
    registry: &Registry,
) -> Result<MultiStageTestConfigurationLiteral, ResolveError> {
    let mut pre = config.pre.clone();
    let mut test = config.test.clone();
    let mut post = config.post.clone();
    let mut cluster_profile = config.cluster_profile.clone();
    let mut inherited = Inherited::default();

    if let Some(name) = &config.workflow {
        let workflow = registry
            .workflow(name)
            .ok_or_else(|| ResolveError::UnresolvedReference {
                kind: ElementKind::Workflow,
                name: name.clone(),
            })?;
        let defaults = &workflow.steps;
        pre = pre.or_else(|| defaults.pre.clone());
        test = test.or_else(|| defaults.test.clone());
        post = post.or_else(|| defaults.post.clone());
        cluster_profile = cluster_profile.or_else(|| defaults.cluster_profile.clone());
        inherited.env.extend(defaults.env.clone());
        inherited.dependencies.extend(defaults.dependencies.clone());
        debug!("Test {} uses workflow {}", test_name, name);
    }

    inherited.env.extend(config.env.clone());
    inherited.dependencies.extend(config.dependencies.clone());

    let mut errors = Vec::new();
    let mut stage = |steps: Option<Vec<TestStep>>| -> Vec<LiteralTestStep> {
        let mut literal = Vec::new();
        for step in steps.unwrap_or_default() {
            match expand_step(&step, registry, &inherited, &[]) {
                Ok(expanded) => literal.extend(expanded),
                Err(err) => errors.push(err),
            }
        }
        literal
    };

    let resolved = MultiStageTestConfigurationLiteral {
        cluster_profile,
        pre: stage(pre),
        test: stage(test),
        post: stage(post),
    };

    match errors.len() {
        0 => {}
        1 => return Err(errors.remove(0)),
        _ => return Err(ResolveError::Aggregate(errors)),
    }

    let mut seen = HashSet::new();
    for step in resolved.steps() {
        if !seen.insert(step.name.as_str()) {
            return Err(ResolveError::DuplicateStep {
                name: step.name.clone(),
            });
        }
    }

    debug!(
        "Resolved test {} into {} steps",
        test_name,
        resolved.pre.len() + resolved.test.len() + resolved.post.len()
    );
    Ok(resolved)
}

/// Expand a registry chain into its literal steps
pub fn expand_chain(name: &str, registry: &Registry) -> Result<Vec<LiteralTestStep>, ResolveError> {
    expand_step(&TestStep::chain(name), registry, &Inherited::default(), &[])
}

/// Expand one entry. `path` holds the chains currently being expanded,
/// outermost first; each recursive call gets its own copy.
fn expand_step(
    step: &TestStep,
    registry: &Registry,
    inherited: &Inherited,
    path: &[String],
) -> Result<Vec<LiteralTestStep>, ResolveError> {
    match step {
        TestStep::Literal(literal) => Ok(vec![inherit(literal.clone(), inherited)]),
        TestStep::Reference { name } => {
            let reference = registry
                .reference(name)
                .ok_or_else(|| ResolveError::UnresolvedReference {
                    kind: ElementKind::Ref,
                    name: name.clone(),
                })?;
            Ok(vec![inherit(reference.clone(), inherited)])
        }
        TestStep::Chain { chain: name } => {
            if path.contains(name) {
                let mut cycle = path.to_vec();
                cycle.push(name.clone());
                return Err(ResolveError::CyclicReference { path: cycle });
            }
            let chain = registry
                .chain(name)
                .ok_or_else(|| ResolveError::UnresolvedReference {
                    kind: ElementKind::Chain,
                    name: name.clone(),
                })?;

            let mut nested_path = path.to_vec();
            nested_path.push(name.clone());
            let nested = inherited.nested(&chain.env);

            let mut steps = Vec::new();
            for member in &chain.steps {
                steps.extend(expand_step(member, registry, &nested, &nested_path)?);
            }
            Ok(steps)
        }
    }
}

fn inherit(mut step: LiteralTestStep, inherited: &Inherited) -> LiteralTestStep {
    step.inherit(&inherited.env, &inherited.dependencies);
    step
}
