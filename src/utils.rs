//! Utility functions for naming and completeness checks

use std::path::Path;

/// Produce a stable, filesystem-safe slug from a media title.
///
/// Strips everything except word characters, whitespace, and hyphens, then
/// collapses whitespace runs into single spaces. Deterministic across runs:
/// skip detection and temp-file naming both depend on this.
pub fn slug(title: &str) -> String {
    let stripped: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the destination file stem for a media item.
///
/// Two distinct items with identical titles would otherwise collide on one
/// destination path, so the source identifier is appended as a
/// disambiguating suffix.
pub fn destination_stem(title: &str, identifier: &str) -> String {
    let title_slug = slug(title);
    let id_slug = slug(identifier);
    if title_slug.is_empty() {
        id_slug
    } else {
        format!("{title_slug} [{id_slug}]")
    }
}

/// The completeness predicate: a destination file counts as complete iff it
/// exists and has non-zero size. This is the sole test used by skip logic.
pub fn is_complete(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}
