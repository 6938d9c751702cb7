//! Shared fixtures for the integration tests

#![allow(dead_code)]

use ci_config::core::{
    ImageStreamTagReference, LiteralTestStep, Metadata, MultiStageTestConfiguration, PromotionConfiguration,
    ReleaseBuildConfiguration, TestKind, TestStep, TestStepConfiguration,
};
use ci_config::store::{DataWithInfo, Info};
use std::path::Path;

/// Write `content` to `relative` under `root`, creating directories
pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// A small registry in the nested layout:
///
/// - workflow `ipi`: pre = chain `ipi-install`, test = ref `e2e`,
///   post = ref `gather`, cluster profile `aws`, env `WORKFLOW=1`
/// - chain `ipi-install`: refs `ipi-conf`, `ipi-install-install`, env
///   `SIZE=chain`
/// - refs `ipi-conf` (commands inlined from a sibling script),
///   `ipi-install-install` (declares `SIZE=step`), `e2e`, `gather`
pub fn write_registry(root: &Path) {
    write(
        root,
        "ipi/ipi-workflow.yaml",
        r#"
workflow:
  as: ipi
  steps:
    cluster_profile: aws
    pre:
    - chain: ipi-install
    test:
    - ref: e2e
    post:
    - ref: gather
    env:
      WORKFLOW: "1"
  documentation: Installs a cluster and runs the end-to-end suite.
"#,
    );
    write(
        root,
        "ipi/install/ipi-install-chain.yaml",
        r#"
chain:
  as: ipi-install
  steps:
  - ref: ipi-conf
  - ref: ipi-install-install
  env:
    SIZE: chain
"#,
    );
    write(
        root,
        "ipi/conf/ipi-conf-ref.yaml",
        r#"
ref:
  as: ipi-conf
  from: installer
  commands: ipi-conf-commands.sh
"#,
    );
    write(root, "ipi/conf/ipi-conf-commands.sh", "echo configuring\n");
    write(
        root,
        "ipi/install/install/ipi-install-install-ref.yaml",
        r#"
ref:
  as: ipi-install-install
  from: installer
  commands: openshift-install create cluster
  env:
    SIZE: step
"#,
    );
    write(
        root,
        "e2e/e2e-ref.yaml",
        r#"
ref:
  as: e2e
  from: tests
  from_image:
    namespace: ocp
    name: "4.6"
    tag: tests
  commands: make e2e
"#,
    );
    write(
        root,
        "gather/gather-ref.yaml",
        r#"
ref:
  as: gather
  from: cli
  commands: gather
"#,
    );
    write(root, "ipi/OWNERS", "approvers:\n- alice\nreviewers:\n- bob\n");
}

pub fn literal(name: &str) -> LiteralTestStep {
    LiteralTestStep {
        name: name.to_string(),
        from: Some("src".to_string()),
        commands: format!("run {}", name),
        ..Default::default()
    }
}

/// A multi-stage test referencing the registry
pub fn symbolic_test(name: &str, steps: MultiStageTestConfiguration) -> TestStepConfiguration {
    TestStepConfiguration {
        name: name.to_string(),
        commands: None,
        kind: TestKind::Symbolic(steps),
    }
}

/// A test that only names a workflow
pub fn workflow_test(name: &str, workflow: &str) -> TestStepConfiguration {
    symbolic_test(
        name,
        MultiStageTestConfiguration {
            workflow: Some(workflow.to_string()),
            ..Default::default()
        },
    )
}

pub fn steps(names: &[&str]) -> Vec<TestStep> {
    names.iter().map(|name| TestStep::reference(*name)).collect()
}

/// A configuration promoting to `namespace/name` with release-bearing inputs
pub fn promoting_config(namespace: &str, name: &str) -> ReleaseBuildConfiguration {
    let mut config = ReleaseBuildConfiguration {
        promotion: Some(PromotionConfiguration {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    config
        .input
        .base_images
        .insert("base".to_string(), ImageStreamTagReference::new(namespace, name, "base"));
    config
}

pub fn data(config: ReleaseBuildConfiguration, org: &str, repo: &str, branch: &str) -> DataWithInfo {
    DataWithInfo {
        configuration: config,
        info: Info::for_metadata(Metadata::new(org, repo, branch)),
    }
}
