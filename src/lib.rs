//! ci-config - resolve, branch and inspect CI build configurations

pub mod branching;
pub mod cli;
pub mod core;
pub mod images;
pub mod registry;
pub mod resolve;
pub mod store;
mod walk;

// Re-export commonly used types
pub use branching::{derive_branches, derive_store, BranchError, Releases};
pub use crate::core::{Metadata, ReleaseBuildConfiguration, TestKind, TestStep};
pub use images::{test_input_images, ExtractError, NamespacedName};
pub use registry::{load_registry, Registry, RegistryError};
pub use resolve::{resolve_config, resolve_test, ResolveError};
pub use store::{ConfigStore, DataWithInfo, Info, StoreError};
