//! Input image extraction from resolved configurations

mod helpers;

use ci_config::core::{BuildRootImageConfiguration, ImageStreamTagReference, ReleaseBuildConfiguration};
use ci_config::images::{test_input_images, ExtractError};
use ci_config::registry::load_registry;
use ci_config::resolve::resolve_config;
use helpers::*;

#[test]
fn test_images_of_resolved_config() {
    let dir = tempfile::tempdir().unwrap();
    write_registry(dir.path());
    let registry = load_registry(dir.path(), false).unwrap();

    let mut config = promoting_config("ocp", "4.6");
    config.input.build_root = Some(BuildRootImageConfiguration {
        image_stream_tag: Some(ImageStreamTagReference::new("openshift", "release", "golang-1.15")),
    });
    config.tests.push(workflow_test("e2e-aws", "ipi"));

    assert_eq!(
        test_input_images(&config),
        Err(ExtractError::UnresolvedConfig {
            tests: vec!["e2e-aws".to_string()]
        })
    );

    let resolved = resolve_config(&config, &registry).unwrap();
    let images = test_input_images(&resolved).unwrap();
    let keys: Vec<_> = images.keys().cloned().collect();
    assert_eq!(keys, vec!["ocp/4.6:base", "ocp/4.6:tests", "openshift/release:golang-1.15"]);

    assert_eq!(test_input_images(&resolved).unwrap(), images);
}

#[test]
fn test_cluster_only_differences_collapse() {
    let mut config = ReleaseBuildConfiguration::default();
    for (key, cluster) in [("a", None), ("b", Some("https://api.ci")), ("c", Some("https://api.build01"))] {
        let mut image = ImageStreamTagReference::new("ocp", "4.6", "base");
        image.cluster = cluster.map(str::to_string);
        config.input.base_rpm_images.insert(key.to_string(), image);
    }

    let images = test_input_images(&config).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images["ocp/4.6:base"].to_string(), "ocp/4.6:base");
}
