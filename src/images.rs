//! Input images referenced by a resolved configuration
//!
//! Used to build image mirroring lists. Only the namespace, name and tag of
//! each reference are kept; the cluster is dropped.

use crate::core::{ImageStreamTagReference, ReleaseBuildConfiguration, TestKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Namespace plus `name:tag` of an image stream tag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl From<&ImageStreamTagReference> for NamespacedName {
    fn from(reference: &ImageStreamTagReference) -> Self {
        Self {
            namespace: reference.namespace.clone(),
            name: format!("{}:{}", reference.name, reference.tag),
        }
    }
}

/// Error types for image extraction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Extraction ran before resolution
    #[error("got unresolved config: tests {} still reference the registry", .tests.join(", "))]
    UnresolvedConfig { tests: Vec<String> },
}

/// All image stream tags the configuration consumes as input, keyed by
/// `namespace/name:tag`.
///
/// The configuration must be resolved; any symbolic test fails the whole
/// extraction.
pub fn test_input_images(
    config: &ReleaseBuildConfiguration,
) -> Result<BTreeMap<String, NamespacedName>, ExtractError> {
    let unresolved = config.symbolic_test_names();
    if !unresolved.is_empty() {
        return Err(ExtractError::UnresolvedConfig { tests: unresolved });
    }

    let mut images = BTreeMap::new();
    let mut insert = |reference: &ImageStreamTagReference| {
        let name = NamespacedName::from(reference);
        images.entry(name.to_string()).or_insert(name);
    };

    config.input.base_images.values().for_each(&mut insert);
    config.input.base_rpm_images.values().for_each(&mut insert);
    if let Some(root) = config
        .input
        .build_root
        .as_ref()
        .and_then(|b| b.image_stream_tag.as_ref())
    {
        insert(root);
    }

    for test in &config.tests {
        if let TestKind::Literal(literal) = &test.kind {
            literal
                .steps()
                .filter_map(|step| step.from_image.as_ref())
                .for_each(&mut insert);
        }
    }

    debug!("Found {} input images", images.len());
    Ok(images)
}
