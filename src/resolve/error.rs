//! Resolution error types

use crate::registry::ElementKind;
use thiserror::Error;

/// Error types for resolving tests against the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{kind} {name:?} is not in the registry")]
    UnresolvedReference { kind: ElementKind, name: String },

    #[error("cycle in chain references: {}", .path.join(" -> "))]
    CyclicReference { path: Vec<String> },

    #[error("step name {name:?} is used more than once")]
    DuplicateStep { name: String },

    #[error("test {test:?}: {source}")]
    InTest {
        test: String,
        #[source]
        source: Box<ResolveError>,
    },

    #[error("{}", join(.0))]
    Aggregate(Vec<ResolveError>),
}

fn join(errors: &[ResolveError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ResolveError {
    /// The underlying failures, with test context and aggregation peeled off
    pub fn causes(&self) -> Vec<&ResolveError> {
        match self {
            ResolveError::InTest { source, .. } => source.causes(),
            ResolveError::Aggregate(errors) => errors.iter().flat_map(|e| e.causes()).collect(),
            other => vec![other],
        }
    }
}
