//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    BranchCommand, DeterminizeCommand, ImagesCommand, RegistryMetadataCommand, ResolveCommand,
    ValidateCommand, WatchCommand,
};
use std::ffi::OsString;

/// Tooling for CI build configurations and the step registry
#[derive(Debug, Parser, Clone)]
#[command(name = "ci-config")]
#[command(version)]
#[command(about = "Resolve, branch and inspect CI build configurations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Resolve a configuration against the step registry
    Resolve(ResolveCommand),

    /// List the input images of a configuration
    Images(ImagesCommand),

    /// Derive release branch configurations
    Branch(BranchCommand),

    /// Rewrite configurations in canonical form
    Determinize(DeterminizeCommand),

    /// Generate registry file metadata
    RegistryMetadata(RegistryMetadataCommand),

    /// Validate the registry and configurations
    Validate(ValidateCommand),

    /// Keep registry and configurations loaded and reload them periodically
    Watch(WatchCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
