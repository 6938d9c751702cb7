//! CLI output formatting

use crate::core::Metadata;
use crate::resolve::ResolveError;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static BRANCH: Emoji<'_, '_> = Emoji("🌿 ", "> ");

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(bar_style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress.set_style(bar_style.progress_chars("#>-"));
    }
    progress
}

/// One line naming a configuration
pub fn format_config(metadata: &Metadata) -> String {
    let mut line = format!(
        "{}/{}@{}",
        style(&metadata.org).bold(),
        style(&metadata.repo).bold(),
        style(&metadata.branch).cyan()
    );
    if let Some(variant) = &metadata.variant {
        line.push_str(&format!(" [{}]", style(variant).dim()));
    }
    line
}

/// The individual failures of a resolution error, one per line
pub fn format_resolve_error(err: &ResolveError) -> String {
    let mut lines = Vec::new();
    collect_lines(err, None, &mut lines);
    lines.join("\n")
}

fn collect_lines(err: &ResolveError, test: Option<&str>, lines: &mut Vec<String>) {
    match err {
        ResolveError::Aggregate(errors) => errors.iter().for_each(|e| collect_lines(e, test, lines)),
        ResolveError::InTest { test, source } => collect_lines(source, Some(test), lines),
        other => {
            let prefix = test.map(|t| format!("{}: ", style(t).bold())).unwrap_or_default();
            lines.push(format!("  {} {}{}", CROSS, prefix, style(other).red()));
        }
    }
}
