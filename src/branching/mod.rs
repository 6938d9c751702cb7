//! Derive per-release branch configurations
//!
//! A configuration on the development branch that promotes to the current
//! release gets one copy per future release, each on its `release-<name>`
//! branch. During a release bump the development branch moves on to the
//! bump release and the release branches take over promotion.

pub mod promotion;

pub use promotion::{promotes_official_images, release_branch, rewrite_release, OFFICIAL_NAMESPACES};

use crate::core::Metadata;
use crate::store::{ConfigStore, DataWithInfo, Info};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// Branch derivation error types
#[derive(Debug, Error)]
pub enum BranchError {
    #[error("{metadata} is derived from both {first} and {second} with different content")]
    Conflict {
        metadata: Metadata,
        first: Metadata,
        second: Metadata,
    },
}

/// Role a branch plays in the release process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchKind {
    /// `master` or `main`
    Development,
    /// `release-<name>`
    Release(String),
    Other,
}

impl BranchKind {
    pub fn classify(branch: &str) -> Self {
        static RELEASE: OnceLock<Regex> = OnceLock::new();
        let release = RELEASE.get_or_init(|| Regex::new(r"^release-(.+)$").expect("static pattern"));

        match branch {
            "master" | "main" => BranchKind::Development,
            _ => match release.captures(branch) {
                Some(caps) => BranchKind::Release(caps[1].to_string()),
                None => BranchKind::Other,
            },
        }
    }
}

/// Release parameters for one brancher run
#[derive(Debug, Clone, Default)]
pub struct Releases {
    /// Release the development branch currently promotes to
    pub current: String,

    /// Release the development branch should move on to, if bumping
    pub bump: Option<String>,

    /// Releases that get a branch of their own
    pub future: Vec<String>,
}

/// Configurations to write for `input`, in order.
///
/// Inputs that do not promote to the current official release, or that live
/// on a branch that does not take part in the release process, produce
/// nothing.
pub fn derive_branches(releases: &Releases, input: &DataWithInfo) -> Vec<DataWithInfo> {
    let metadata = &input.info.metadata;
    let config = &input.configuration;

    if !promotes_official_images(config, true) {
        debug!("{}: does not promote to an official namespace", metadata);
        return Vec::new();
    }
    if config.promotion.as_ref().map(|p| p.name.as_str()) != Some(releases.current.as_str()) {
        debug!("{}: does not promote to release {}", metadata, releases.current);
        return Vec::new();
    }

    let kind = BranchKind::classify(&metadata.branch);
    let development_branch = match (&kind, &releases.bump) {
        (BranchKind::Development, _) => {
            if !promotes_official_images(config, false) {
                debug!("{}: promotion is disabled", metadata);
                return Vec::new();
            }
            metadata.branch.clone()
        }
        (BranchKind::Release(release), Some(_)) if *release == releases.current => "master".to_string(),
        (BranchKind::Release(_), _) => {
            debug!("{}: release branches are not branched further", metadata);
            return Vec::new();
        }
        (BranchKind::Other, _) => {
            debug!("{}: {} is not a valid promotion target", metadata, metadata.branch);
            return Vec::new();
        }
    };

    let mut outputs = Vec::with_capacity(releases.future.len() + 1);
    if let Some(bump) = &releases.bump {
        outputs.push(branched(input, &releases.current, bump, &development_branch, false));
    }

    for future in &releases.future {
        let disabled = match &releases.bump {
            Some(bump) => future == bump,
            None => *future == releases.current,
        };
        outputs.push(branched(input, &releases.current, future, &release_branch(future), disabled));
    }

    debug!("{}: derived {} configurations", metadata, outputs.len());
    outputs
}

/// Configurations to write for every selected configuration of `store`.
///
/// A repository whose development branch is in the store is driven by that
/// branch alone; its `release-<name>` configurations are not used as bump
/// inputs. Outputs derived more than once are kept once when identical and
/// rejected when they differ.
pub fn derive_store(
    releases: &Releases,
    store: &ConfigStore,
    select: impl Fn(&Metadata) -> bool,
) -> Result<Vec<DataWithInfo>, BranchError> {
    let mut outputs: Vec<DataWithInfo> = Vec::new();
    let mut sources: HashMap<Metadata, (usize, Metadata)> = HashMap::new();

    for input in store.iter().filter(|data| select(&data.info.metadata)) {
        let metadata = &input.info.metadata;
        if matches!(BranchKind::classify(&metadata.branch), BranchKind::Release(_)) && has_development_branch(store, metadata)
        {
            debug!("{}: the development branch drives this repository", metadata);
            continue;
        }

        for output in derive_branches(releases, input) {
            match sources.get(&output.info.metadata) {
                Some((index, first)) => {
                    if outputs[*index].configuration != output.configuration {
                        return Err(BranchError::Conflict {
                            metadata: output.info.metadata.clone(),
                            first: first.clone(),
                            second: metadata.clone(),
                        });
                    }
                    debug!("{}: already derived from {}", output.info.metadata, first);
                }
                None => {
                    sources.insert(output.info.metadata.clone(), (outputs.len(), metadata.clone()));
                    outputs.push(output);
                }
            }
        }
    }

    Ok(outputs)
}

fn has_development_branch(store: &ConfigStore, metadata: &Metadata) -> bool {
    ["master", "main"].iter().any(|branch| {
        let mut development = metadata.clone();
        development.branch = branch.to_string();
        store.get_matching_config(&development).is_ok()
    })
}

fn branched(input: &DataWithInfo, current: &str, target: &str, branch: &str, disabled: bool) -> DataWithInfo {
    let mut configuration = input.configuration.clone();
    rewrite_release(&mut configuration, current, target);
    if let Some(promotion) = configuration.promotion.as_mut() {
        promotion.disabled = disabled;
    }

    let mut metadata = input.info.metadata.clone();
    metadata.branch = branch.to_string();
    configuration.metadata = Some(metadata.clone());

    DataWithInfo {
        configuration,
        info: Info::for_metadata(metadata),
    }
}
