use regex::Regex;

lazy_static::lazy_static! {
    /// Valid slug pattern: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();

    /// Runs of anything a slug may not contain
    static ref SEPARATOR_RUN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Derive a URL-safe slug from a title.
///
/// The title is lowercased, every run of characters outside `[a-z0-9]`
/// becomes a single hyphen, and leading/trailing hyphens are stripped.
/// Titles with no alphanumeric content produce an empty slug.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    SEPARATOR_RUN
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}
