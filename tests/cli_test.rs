//! Smoke tests for the batch commands, run through the built binary

mod helpers;

use ci_config::core::Metadata;
use ci_config::store::ConfigStore;
use helpers::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn ci_config_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ci-config"))
}

fn run(args: &[&str], config_dir: &Path) -> Output {
    Command::new(ci_config_bin())
        .args(args)
        .arg("--config-dir")
        .arg(config_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("run ci-config")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const BUMP: &[&str] = &[
    "branch",
    "--current-release",
    "4.6",
    "--bump-release",
    "4.7",
    "--future-release",
    "4.6",
    "--future-release",
    "4.7",
];

#[test]
fn smoke_test_branch_bump_with_release_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let mut master = promoting_config("ocp", "4.6");
    master.tests.push(workflow_test("e2e-aws", "ipi"));
    data(master, "org", "repo", "master").commit_to(dir.path()).unwrap();
    let mut mirror = promoting_config("ocp", "4.6");
    if let Some(promotion) = mirror.promotion.as_mut() {
        promotion.disabled = true;
    }
    data(mirror, "org", "repo", "release-4.6").commit_to(dir.path()).unwrap();

    let dry_run = run(BUMP, dir.path());
    assert!(dry_run.status.success(), "{}", String::from_utf8_lossy(&dry_run.stderr));
    assert_eq!(stdout(&dry_run).matches("Would write").count(), 3);
    assert!(!dir.path().join("org/repo/org-repo-release-4.7.yaml").exists());

    let mut confirmed = BUMP.to_vec();
    confirmed.push("--confirm");
    let output = run(&confirmed, dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output).matches("Wrote").count(), 3);

    let store = ConfigStore::load(dir.path()).unwrap();
    assert_eq!(store.len(), 3);
    let master = store.get_matching_config(&Metadata::new("org", "repo", "master")).unwrap();
    assert_eq!(master.tests.len(), 1);
    assert_eq!(master.promotion.as_ref().map(|p| p.name.as_str()), Some("4.7"));
}

#[test]
fn smoke_test_branch_refuses_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    data(promoting_config("ocp", "4.6"), "org", "repo", "master")
        .commit_to(dir.path())
        .unwrap();
    let mut main = promoting_config("ocp", "4.6");
    main.tests.push(workflow_test("e2e-aws", "ipi"));
    data(main, "org", "repo", "main").commit_to(dir.path()).unwrap();

    let mut confirmed = BUMP.to_vec();
    confirmed.push("--confirm");
    let output = run(&confirmed, dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("different content"));
    assert!(!dir.path().join("org/repo/org-repo-release-4.7.yaml").exists());
}

#[test]
fn smoke_test_determinize() {
    let dir = tempfile::tempdir().unwrap();
    data(promoting_config("ocp", "4.6"), "org", "repo", "master")
        .commit_to(dir.path())
        .unwrap();
    write(
        dir.path(),
        "org/repo/org-repo-release-4.6.yaml",
        "promotion: {namespace: ocp, name: '4.6', disabled: true}\n",
    );

    let check = run(&["determinize"], dir.path());
    assert!(check.status.success());
    let report = stdout(&check);
    assert!(report.contains("Not canonical"));
    assert!(report.contains("release-4.6"));
    assert!(!report.contains("@master"));

    let rewrite = run(&["determinize", "--confirm"], dir.path());
    assert!(rewrite.status.success());
    assert!(stdout(&rewrite).contains("Rewrote"));

    let again = run(&["determinize"], dir.path());
    assert!(stdout(&again).contains("canonical form"));
}
