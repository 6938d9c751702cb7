//! CLI command definitions

use crate::branching::Releases;
use crate::core::Metadata;
use clap::Args;
use std::path::PathBuf;

/// Registry location shared by the commands that resolve tests
#[derive(Debug, Args, Clone)]
pub struct RegistryArgs {
    /// Path to the step registry
    #[arg(long)]
    pub registry: PathBuf,

    /// Do not require element names to match their location in the registry
    #[arg(long)]
    pub flat_registry: bool,
}

/// Selects one configuration out of a config directory
#[derive(Debug, Args, Clone, Default)]
pub struct TargetArgs {
    #[arg(long)]
    pub org: Option<String>,

    #[arg(long)]
    pub repo: Option<String>,

    #[arg(long)]
    pub branch: Option<String>,

    #[arg(long)]
    pub variant: Option<String>,
}

impl TargetArgs {
    /// Metadata of the selected configuration, if org, repo and branch are all given
    pub fn metadata(&self) -> Option<Metadata> {
        let (org, repo, branch) = (self.org.as_ref()?, self.repo.as_ref()?, self.branch.as_ref()?);
        let mut metadata = Metadata::new(org.as_str(), repo.as_str(), branch.as_str());
        metadata.variant = self.variant.clone();
        Some(metadata)
    }
}

/// Resolve a configuration's tests against the registry
#[derive(Debug, Args, Clone)]
pub struct ResolveCommand {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Path to a configuration file
    #[arg(short, long, conflicts_with = "config_dir")]
    pub config: Option<PathBuf>,

    /// Config directory to pick the configuration from
    #[arg(long, requires = "org")]
    pub config_dir: Option<PathBuf>,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// List the input images of a configuration
#[derive(Debug, Args, Clone)]
pub struct ImagesCommand {
    /// Path to a configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Resolve the configuration against this registry first
    #[arg(long)]
    pub registry: Option<PathBuf>,

    #[arg(long)]
    pub flat_registry: bool,
}

/// Derive release branch configurations
#[derive(Debug, Args, Clone)]
pub struct BranchCommand {
    /// Config directory to read and write
    #[arg(long)]
    pub config_dir: PathBuf,

    /// Release the development branches currently promote to
    #[arg(long)]
    pub current_release: String,

    /// Release to branch for; repeat for several
    #[arg(long = "future-release", required = true)]
    pub future_releases: Vec<String>,

    /// Move the development branches on to this release
    #[arg(long)]
    pub bump_release: Option<String>,

    /// Only branch configurations of this org
    #[arg(long)]
    pub org: Option<String>,

    /// Only branch configurations of this repo
    #[arg(long)]
    pub repo: Option<String>,

    /// Write the derived configurations
    #[arg(long)]
    pub confirm: bool,
}

impl BranchCommand {
    pub fn releases(&self) -> Releases {
        Releases {
            current: self.current_release.clone(),
            bump: self.bump_release.clone(),
            future: self.future_releases.clone(),
        }
    }

    /// Whether a configuration is selected by the org and repo filters
    pub fn selects(&self, metadata: &Metadata) -> bool {
        self.org.as_ref().map_or(true, |org| *org == metadata.org)
            && self.repo.as_ref().map_or(true, |repo| *repo == metadata.repo)
    }
}

/// Rewrite configurations in canonical form
#[derive(Debug, Args, Clone)]
pub struct DeterminizeCommand {
    #[arg(long)]
    pub config_dir: PathBuf,

    /// Write the rewritten configurations
    #[arg(long)]
    pub confirm: bool,
}

/// Record path and owners of every registry file
#[derive(Debug, Args, Clone)]
pub struct RegistryMetadataCommand {
    #[arg(long)]
    pub registry: PathBuf,

    /// File to write the metadata to instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Validate the registry and the configurations using it
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Also resolve every configuration in this directory
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Keep the registry and configurations loaded, reloading periodically
#[derive(Debug, Args, Clone)]
pub struct WatchCommand {
    #[command(flatten)]
    pub registry: RegistryArgs,

    #[arg(long)]
    pub config_dir: PathBuf,

    /// Seconds between reloads
    #[arg(long, default_value_t = 600)]
    pub cycle: u64,
}
