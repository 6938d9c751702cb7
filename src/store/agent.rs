//! Snapshot agents for configurations and the registry
//!
//! An agent owns the current immutable snapshot of a store and a
//! generation counter bumped on every successful reload. Callers clone the
//! snapshot's `Arc` and work against it; a reload never mutates a snapshot
//! in place.

use crate::core::{Metadata, ReleaseBuildConfiguration};
use crate::registry::{load_registry, Registry};
use crate::resolve::{resolve_config, ResolveError};
use crate::store::{ConfigStore, StoreError};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Loads a fresh store value
pub type Loader<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// A store value as of one load
#[derive(Debug)]
pub struct Snapshot<T> {
    pub data: Arc<T>,
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            generation: self.generation,
            loaded_at: self.loaded_at,
        }
    }
}

/// Holds the current snapshot of a store and knows how to reload it
pub struct Agent<T> {
    name: &'static str,
    loader: Loader<T>,
    current: RwLock<Snapshot<T>>,
}

pub type ConfigAgent = Agent<ConfigStore>;
pub type RegistryAgent = Agent<Registry>;

impl<T: Send + Sync + 'static> Agent<T> {
    /// Create an agent, performing the first load
    pub fn new(name: &'static str, loader: Loader<T>) -> Result<Self> {
        let data = loader()?;
        info!("{} agent loaded generation 1", name);
        Ok(Self {
            name,
            loader,
            current: RwLock::new(Snapshot {
                data: Arc::new(data),
                generation: 1,
                loaded_at: Utc::now(),
            }),
        })
    }

    /// The current snapshot
    pub fn snapshot(&self) -> Snapshot<T> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Load a new snapshot and swap it in.
    ///
    /// On failure the previous snapshot stays current.
    pub fn reload(&self) -> Result<u64> {
        let data = match (self.loader)() {
            Ok(data) => data,
            Err(err) => {
                warn!("{} agent reload failed, keeping generation {}: {:#}", self.name, self.generation(), err);
                return Err(err);
            }
        };

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = current.generation + 1;
        *current = Snapshot {
            data: Arc::new(data),
            generation,
            loaded_at: Utc::now(),
        };
        debug!("{} agent loaded generation {}", self.name, generation);
        Ok(generation)
    }

    /// Reload every `cycle` until the returned task is aborted
    pub fn spawn_reloader(self: Arc<Self>, cycle: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cycle);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let agent = Arc::clone(&self);
                if let Err(err) = tokio::task::spawn_blocking(move || agent.reload()).await {
                    error!("{} agent reload task failed: {}", self.name, err);
                }
            }
        })
    }
}

impl ConfigAgent {
    /// Agent over the configurations under `path`
    pub fn for_config_dir(path: PathBuf) -> Result<Self> {
        Agent::new("config", Box::new(move || -> Result<ConfigStore> { Ok(ConfigStore::load(&path)?) }))
    }
}

impl RegistryAgent {
    /// Agent over the registry under `path`, validated on every load
    pub fn for_registry_dir(path: PathBuf, flat: bool) -> Result<Self> {
        Agent::new(
            "registry",
            Box::new(move || -> Result<Registry> {
                let registry = load_registry(&path, flat)?;
                registry.validate()?;
                Ok(registry)
            }),
        )
    }
}

/// Source of build configurations
pub trait ConfigSource {
    fn get_matching_config(&self, metadata: &Metadata) -> Result<ReleaseBuildConfiguration, StoreError>;

    /// Bumped every time the configurations are reloaded
    fn generation(&self) -> u64;
}

/// Source of registry resolution
pub trait RegistrySource {
    fn resolve_config(&self, config: &ReleaseBuildConfiguration) -> Result<ReleaseBuildConfiguration, ResolveError>;

    /// Bumped every time the registry is reloaded
    fn generation(&self) -> u64;
}

impl ConfigSource for ConfigAgent {
    fn get_matching_config(&self, metadata: &Metadata) -> Result<ReleaseBuildConfiguration, StoreError> {
        self.snapshot().data.get_matching_config(metadata).cloned()
    }

    fn generation(&self) -> u64 {
        Agent::generation(self)
    }
}

impl RegistrySource for RegistryAgent {
    fn resolve_config(&self, config: &ReleaseBuildConfiguration) -> Result<ReleaseBuildConfiguration, ResolveError> {
        resolve_config(config, &self.snapshot().data)
    }

    fn generation(&self) -> u64 {
        Agent::generation(self)
    }
}
