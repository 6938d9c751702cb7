//! Build configuration loaded from YAML

use crate::core::test::{TestKind, TestStepConfiguration};
use crate::core::scalar;
use crate::core::step::ResourceRequirements;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// Top-level build configuration for one (org, repo, branch, variant)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseBuildConfiguration {
    /// Where this configuration lives; recorded from the file path
    #[serde(rename = "zz_generated_metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Images the build consumes
    #[serde(flatten)]
    pub input: InputConfiguration,

    /// Image stream the build output is published to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionConfiguration>,

    /// Resource requirements per test or step name (`*` for the default)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceRequirements>,

    /// Tests run against the build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestStepConfiguration>,
}

/// Input images of a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfiguration {
    /// Images pulled into the build, keyed by local name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub base_images: BTreeMap<String, ImageStreamTagReference>,

    /// Images that get the built RPMs injected
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub base_rpm_images: BTreeMap<String, ImageStreamTagReference>,

    /// Image the source is built in
    #[serde(rename = "build_root", default, skip_serializing_if = "Option::is_none")]
    pub build_root: Option<BuildRootImageConfiguration>,

    /// Release payload the build is tested against
    #[serde(rename = "tag_specification", default, skip_serializing_if = "Option::is_none")]
    pub release_tag: Option<ReleaseTagConfiguration>,
}

/// Reference to a tag of an image stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStreamTagReference {
    /// Cluster the image stream lives on (being phased out)
    #[serde(default, deserialize_with = "scalar::option_string", skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    #[serde(deserialize_with = "scalar::string")]
    pub namespace: String,
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,
    #[serde(deserialize_with = "scalar::string")]
    pub tag: String,

    /// Local alias
    #[serde(
        rename = "as",
        default,
        deserialize_with = "scalar::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub alias: Option<String>,
}

impl ImageStreamTagReference {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            tag: tag.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for ImageStreamTagReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.name, self.tag)
    }
}

/// Build root image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRootImageConfiguration {
    #[serde(rename = "image_stream_tag", default, skip_serializing_if = "Option::is_none")]
    pub image_stream_tag: Option<ImageStreamTagReference>,
}

/// Release payload image stream (`tag_specification`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTagConfiguration {
    #[serde(deserialize_with = "scalar::string")]
    pub namespace: String,
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,
}

/// Where build output images get published
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionConfiguration {
    #[serde(deserialize_with = "scalar::string")]
    pub namespace: String,
    #[serde(deserialize_with = "scalar::string")]
    pub name: String,

    /// The target exists but this branch no longer publishes to it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,

    /// Extra images to promote, keyed by target name
    #[serde(default, deserialize_with = "scalar::string_map", skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_images: BTreeMap<String, String>,

    /// Built images that are not promoted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_images: Vec<String>,
}

/// Identity of a configuration: which branch of which repository it builds
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Metadata {
    pub org: String,
    pub repo: String,
    pub branch: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Metadata {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            branch: branch.into(),
            variant: None,
        }
    }

    /// File name of the configuration: `org-repo-branch[__variant].yaml`
    pub fn basename(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{}-{}-{}__{}.yaml", self.org, self.repo, self.branch, variant),
            None => format!("{}-{}-{}.yaml", self.org, self.repo, self.branch),
        }
    }

    /// Path of the configuration relative to the config root
    pub fn relative_path(&self) -> std::path::PathBuf {
        Path::new(&self.org).join(&self.repo).join(self.basename())
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.org, self.repo, self.branch)?;
        if let Some(variant) = &self.variant {
            write!(f, " [{}]", variant)?;
        }
        Ok(())
    }
}

impl ReleaseBuildConfiguration {
    /// Load a build configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a build configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ReleaseBuildConfiguration = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Render in canonical YAML form
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the build configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for test in &self.tests {
            if test.name.is_empty() {
                anyhow::bail!("Test has an empty name");
            }
            if !seen.insert(&test.name) {
                anyhow::bail!("Duplicate test name: {}", test.name);
            }
        }
        Ok(())
    }

    /// Whether any test still carries registry references
    pub fn has_symbolic_tests(&self) -> bool {
        self.tests.iter().any(|t| t.kind.is_symbolic())
    }

    /// Names of tests that are multi-stage but not resolved
    pub fn symbolic_test_names(&self) -> Vec<String> {
        self.tests
            .iter()
            .filter(|t| matches!(t.kind, TestKind::Symbolic(_)))
            .map(|t| t.name.clone())
            .collect()
    }
}
