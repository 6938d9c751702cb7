//! Promotion targets and release rewriting

use crate::core::{ImageStreamTagReference, ReleaseBuildConfiguration};

/// Namespaces that carry official release images
pub const OFFICIAL_NAMESPACES: &[&str] = &["ocp", "origin"];

/// Whether the configuration publishes into an official namespace.
///
/// With `include_disabled` unset a disabled promotion does not count.
pub fn promotes_official_images(config: &ReleaseBuildConfiguration, include_disabled: bool) -> bool {
    config.promotion.as_ref().is_some_and(|promotion| {
        OFFICIAL_NAMESPACES.contains(&promotion.namespace.as_str()) && (include_disabled || !promotion.disabled)
    })
}

/// Name of the branch that tracks `release`
pub fn release_branch(release: &str) -> String {
    format!("release-{}", release)
}

/// Point every reference to the `current` release at `future` instead.
///
/// Image references are only rewritten when they live in the promotion
/// namespace; references into other namespaces are left alone.
pub fn rewrite_release(config: &mut ReleaseBuildConfiguration, current: &str, future: &str) {
    let Some(promotion) = config.promotion.as_mut() else {
        return;
    };
    promotion.name = future.to_string();
    let namespace = promotion.namespace.clone();

    if let Some(tag) = config.input.release_tag.as_mut() {
        if tag.name == current {
            tag.name = future.to_string();
        }
    }

    let rewrite = |image: &mut ImageStreamTagReference| {
        if image.namespace == namespace && image.name == current {
            image.name = future.to_string();
        }
    };
    let input = &mut config.input;
    input
        .base_images
        .values_mut()
        .chain(input.base_rpm_images.values_mut())
        .chain(
            input
                .build_root
                .as_mut()
                .and_then(|root| root.image_stream_tag.as_mut()),
        )
        .for_each(rewrite);
}
