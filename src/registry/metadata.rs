//! Registry metadata: where each definition lives and who owns it

use crate::registry::loader::{classify_file_name, registry_files};
use crate::registry::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Contents of an `OWNERS` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owners {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<String>,
}

/// Metadata for one registry file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInfo {
    /// Path relative to the registry root, `/`-separated
    pub path: String,

    /// Nearest `OWNERS` at or above the file's directory
    pub owners: Owners,
}

/// Metadata for every definition under `root`, keyed by file name
pub fn generate_metadata(root: &Path) -> Result<BTreeMap<String, RegistryInfo>, RegistryError> {
    let mut metadata = BTreeMap::new();

    for path in registry_files(root)? {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if classify_file_name(&file_name).is_none() {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let owners = nearest_owners(root, path.parent().unwrap_or(root))?;
        debug!("{} owned by {:?}", relative, owners.approvers);

        metadata.insert(file_name, RegistryInfo { path: relative, owners });
    }

    Ok(metadata)
}

fn nearest_owners(root: &Path, dir: &Path) -> Result<Owners, RegistryError> {
    for candidate in dir.ancestors() {
        let owners_file = candidate.join("OWNERS");
        if owners_file.is_file() {
            let content = std::fs::read_to_string(&owners_file).map_err(|source| RegistryError::Io {
                path: owners_file.clone(),
                source,
            })?;
            return serde_yaml::from_str(&content).map_err(|source| RegistryError::Parse {
                path: owners_file,
                source,
            });
        }
        if candidate == root {
            break;
        }
    }
    Ok(Owners::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_generate_metadata_uses_nearest_owners() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "ipi/OWNERS", "approvers:\n- alice\nreviewers:\n- bob\n");
        write(root, "ipi/deprovision/OWNERS", "approvers:\n- carol\n");
        write(root, "ipi/ipi-workflow.yaml", "workflow:\n  as: ipi\n  steps: {}\n");
        write(root, "ipi/install/ipi-install-chain.yaml", "chain:\n  as: ipi-install\n  steps: []\n");
        write(
            root,
            "ipi/deprovision/ipi-deprovision-chain.yaml",
            "chain:\n  as: ipi-deprovision\n  steps: []\n",
        );

        let metadata = generate_metadata(root).unwrap();

        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata["ipi-workflow.yaml"].path, "ipi/ipi-workflow.yaml");
        assert_eq!(metadata["ipi-workflow.yaml"].owners.reviewers, vec!["bob".to_string()]);
        assert_eq!(
            metadata["ipi-install-chain.yaml"].path,
            "ipi/install/ipi-install-chain.yaml"
        );
        assert_eq!(metadata["ipi-install-chain.yaml"].owners.approvers, vec!["alice".to_string()]);
        assert_eq!(
            metadata["ipi-deprovision-chain.yaml"].owners.approvers,
            vec!["carol".to_string()]
        );
    }

    #[test]
    fn test_missing_owners_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ipi/ipi-workflow.yaml", "workflow:\n  as: ipi\n  steps: {}\n");

        let metadata = generate_metadata(dir.path()).unwrap();
        assert_eq!(metadata["ipi-workflow.yaml"].owners, Owners::default());
    }
}
