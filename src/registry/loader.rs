//! Load a registry from its directory layout
//!
//! Every definition lives in its own file:
//!
//! ```text
//! ipi/ipi-workflow.yaml
//! ipi/install/ipi-install-chain.yaml
//! ipi/install/rbac/ipi-install-rbac-ref.yaml
//! ipi/install/rbac/ipi-install-rbac-commands.sh
//! ```
//!
//! The directory path, joined with `-`, must equal the declared name unless
//! the registry is loaded flat.

use crate::core::LiteralTestStep;
use crate::registry::{Chain, ElementKind, Registry, RegistryError, Workflow};
use crate::walk::yaml_files;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

#[derive(Deserialize)]
struct RefFile {
    #[serde(rename = "ref")]
    reference: LiteralTestStep,
}

#[derive(Deserialize)]
struct ChainFile {
    chain: Chain,
}

#[derive(Deserialize)]
struct WorkflowFile {
    workflow: Workflow,
}

fn element_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<name>.+)-(?P<kind>ref|chain|workflow)\.yaml$").expect("static pattern")
    })
}

/// Split a registry file name into the element name it must declare and
/// its kind. Returns `None` for files that are not definitions.
pub fn classify_file_name(file_name: &str) -> Option<(String, ElementKind)> {
    let captures = element_file_pattern().captures(file_name)?;
    let kind = match &captures["kind"] {
        "ref" => ElementKind::Ref,
        "chain" => ElementKind::Chain,
        _ => ElementKind::Workflow,
    };
    Some((captures["name"].to_string(), kind))
}

/// Load every definition under `root`
pub fn load_registry(root: &Path, flat: bool) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();

    for path in registry_files(root)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some((file_element, kind)) = classify_file_name(&file_name) else {
            return Err(RegistryError::UnknownFile { path });
        };

        let content = read(&path)?;
        let declared = match kind {
            ElementKind::Ref => {
                let mut step = parse::<RefFile>(&path, &content)?.reference;
                inline_commands(&path, &mut step)?;
                let name = step.name.clone();
                registry.insert_ref(step)?;
                name
            }
            ElementKind::Chain => {
                let chain = parse::<ChainFile>(&path, &content)?.chain;
                let name = chain.name.clone();
                registry.insert_chain(chain)?;
                name
            }
            ElementKind::Workflow => {
                let workflow = parse::<WorkflowFile>(&path, &content)?.workflow;
                let name = workflow.name.clone();
                registry.insert_workflow(workflow)?;
                name
            }
        };

        if !flat {
            check_location(root, &path, kind, &declared, &file_element)?;
        }
        debug!("Loaded {} {} from {}", kind, declared, path.display());
    }

    info!(
        "Loaded registry from {}: {} refs, {} chains, {} workflows",
        root.display(),
        registry.refs.len(),
        registry.chains.len(),
        registry.workflows.len()
    );
    Ok(registry)
}

/// All YAML files under `root`, sorted for a stable load order
pub(crate) fn registry_files(root: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    yaml_files(root, |path, source| RegistryError::Io { path, source })
}

/// Directory of `path` relative to `root`, joined with `-`
pub(crate) fn location_prefix(root: &Path, path: &Path) -> String {
    path.parent()
        .and_then(|dir| dir.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("-")
        })
        .unwrap_or_default()
}

fn check_location(
    root: &Path,
    path: &Path,
    kind: ElementKind,
    declared: &str,
    file_element: &str,
) -> Result<(), RegistryError> {
    let expected = location_prefix(root, path);
    if declared != expected || declared != file_element {
        return Err(RegistryError::NameMismatch {
            path: path.to_path_buf(),
            kind,
            name: declared.to_string(),
            expected,
        });
    }
    Ok(())
}

/// A ref's `commands` may name a sibling script; replace it with the
/// script's contents.
fn inline_commands(path: &Path, step: &mut LiteralTestStep) -> Result<(), RegistryError> {
    if !step.commands.ends_with("-commands.sh") {
        return Ok(());
    }
    let script = path
        .parent()
        .map(|dir| dir.join(&step.commands))
        .unwrap_or_else(|| PathBuf::from(&step.commands));
    step.commands = read(&script)?;
    Ok(())
}

fn read(path: &Path) -> Result<String, RegistryError> {
    std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, content: &str) -> Result<T, RegistryError> {
    serde_yaml::from_str(content).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
