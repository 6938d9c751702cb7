//! Configuration store backed by the config directory layout
//!
//! Each configuration lives at
//! `<org>/<repo>/<org>-<repo>-<branch>[__<variant>].yaml`. The path is the
//! source of truth for a configuration's metadata.

pub mod agent;

pub use agent::{Agent, ConfigAgent, ConfigSource, RegistryAgent, RegistrySource, Snapshot};

use crate::core::{Metadata, ReleaseBuildConfiguration};
use crate::walk::yaml_files;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
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

    #[error("failed to serialize configuration for {metadata}: {source}")]
    Serialize {
        metadata: Metadata,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("{}: not an <org>/<repo>/<org>-<repo>-<branch>.yaml path", .path.display())]
    BadPath { path: PathBuf },

    #[error("no configuration for {0}")]
    NotFound(Metadata),
}

/// Where a configuration file lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub metadata: Metadata,

    /// Path the configuration was read from
    pub filename: PathBuf,
}

impl Info {
    /// Derive metadata from a configuration path below `root`
    pub fn from_path(root: &Path, path: &Path) -> Result<Self, StoreError> {
        let bad_path = || StoreError::BadPath {
            path: path.to_path_buf(),
        };
        let relative = path.strip_prefix(root).map_err(|_| bad_path())?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let [org, repo, file] = parts.as_slice() else {
            return Err(bad_path());
        };

        let stem = file
            .strip_suffix(".yaml")
            .and_then(|f| f.strip_prefix(&format!("{}-{}-", org, repo)))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(bad_path)?;
        let (branch, variant) = match stem.split_once("__") {
            Some((branch, variant)) => (branch, Some(variant.to_string())),
            None => (stem, None),
        };

        Ok(Self {
            metadata: Metadata {
                org: org.clone(),
                repo: repo.clone(),
                branch: branch.to_string(),
                variant,
            },
            filename: path.to_path_buf(),
        })
    }

    /// Info for a configuration that has not been written yet
    pub fn for_metadata(metadata: Metadata) -> Self {
        let filename = metadata.relative_path();
        Self { metadata, filename }
    }
}

/// A configuration together with where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataWithInfo {
    pub configuration: ReleaseBuildConfiguration,
    pub info: Info,
}

impl DataWithInfo {
    /// Write the configuration to its place under `root`, recording its
    /// metadata inside the file.
    pub fn commit_to(&self, root: &Path) -> Result<PathBuf, StoreError> {
        let path = root.join(self.info.metadata.relative_path());
        let yaml = self.canonical_yaml()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, yaml).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Wrote {} to {}", self.info.metadata, path.display());
        Ok(path)
    }

    /// The file content `commit_to` writes
    pub fn canonical_yaml(&self) -> Result<String, StoreError> {
        let mut configuration = self.configuration.clone();
        configuration.metadata = Some(self.info.metadata.clone());
        serde_yaml::to_string(&configuration).map_err(|source| StoreError::Serialize {
            metadata: self.info.metadata.clone(),
            source,
        })
    }
}

/// Read every configuration under `root`, sorted by path
pub fn walk_configs(root: &Path) -> Result<Vec<DataWithInfo>, StoreError> {
    yaml_files(root, |path, source| StoreError::Io { path, source })?
        .into_iter()
        .map(|path| {
            let info = Info::from_path(root, &path)?;
            let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let configuration: ReleaseBuildConfiguration =
                serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })?;
            configuration.validate().map_err(|err| StoreError::Invalid {
                path: path.clone(),
                reason: err.to_string(),
            })?;
            Ok(DataWithInfo { configuration, info })
        })
        .collect()
}

/// Configurations under `root` whose file differs from its canonical form
pub fn non_canonical(root: &Path) -> Result<Vec<DataWithInfo>, StoreError> {
    let mut changed = Vec::new();
    for data in walk_configs(root)? {
        let current = std::fs::read_to_string(&data.info.filename).map_err(|source| StoreError::Io {
            path: data.info.filename.clone(),
            source,
        })?;
        if data.canonical_yaml()? != current {
            debug!("{} is not in canonical form", data.info.filename.display());
            changed.push(data);
        }
    }
    Ok(changed)
}

/// All configurations of a config directory, indexed by metadata
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    configs: BTreeMap<Metadata, DataWithInfo>,
}

impl ConfigStore {
    /// Load every configuration under `root`
    pub fn load(root: &Path) -> Result<Self, StoreError> {
        let store = Self::from_configs(walk_configs(root)?);
        info!("Loaded {} configurations from {}", store.len(), root.display());
        Ok(store)
    }

    pub fn from_configs(configs: impl IntoIterator<Item = DataWithInfo>) -> Self {
        Self {
            configs: configs
                .into_iter()
                .map(|data| (data.info.metadata.clone(), data))
                .collect(),
        }
    }

    /// The configuration for exactly this org, repo, branch and variant
    pub fn get_matching_config(&self, metadata: &Metadata) -> Result<&ReleaseBuildConfiguration, StoreError> {
        self.configs
            .get(metadata)
            .map(|data| &data.configuration)
            .ok_or_else(|| StoreError::NotFound(metadata.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataWithInfo> {
        self.configs.values()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
