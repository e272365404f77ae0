use regex::Regex;
use serde::Serialize;
use std::{fmt, sync::OnceLock};
use utoipa::ToSchema;

/// Longest slug accepted anywhere in the system.
pub const SLUG_MAX_LEN: usize = 100;

/// Classified reason a candidate slug was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlugViolation {
    Empty,
    TooLong,
    InvalidCharset,
    BoundaryHyphen,
}

impl SlugViolation {
    /// Stable code returned to API clients.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::TooLong => "TOO_LONG",
            Self::InvalidCharset => "INVALID_CHARSET",
            Self::BoundaryHyphen => "BOUNDARY_HYPHEN",
        }
    }
}

impl fmt::Display for SlugViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Empty => "slug is empty",
            Self::TooLong => "slug is longer than 100 characters",
            Self::InvalidCharset => "slug may only contain a-z, 0-9 and '-'",
            Self::BoundaryHyphen => "slug may not start or end with '-'",
        };
        f.write_str(message)
    }
}

fn valid_charset(candidate: &str) -> bool {
    static CHARSET: OnceLock<Option<Regex>> = OnceLock::new();
    CHARSET
        .get_or_init(|| Regex::new(r"^[a-z0-9-]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(candidate))
}

/// Checks format and length of a candidate slug.
///
/// Runs on both derived and manually entered slugs. Malformed input is an
/// expected case, so failures come back as values rather than errors.
pub fn validate(candidate: &str) -> Result<(), SlugViolation> {
    if candidate.is_empty() {
        return Err(SlugViolation::Empty);
    }
    if candidate.chars().count() > SLUG_MAX_LEN {
        return Err(SlugViolation::TooLong);
    }
    if !valid_charset(candidate) {
        return Err(SlugViolation::InvalidCharset);
    }
    if candidate.starts_with('-') || candidate.ends_with('-') {
        return Err(SlugViolation::BoundaryHyphen);
    }
    Ok(())
}

/// Truncates a normalized slug to [`SLUG_MAX_LEN`] without leaving a dangling hyphen.
pub fn cap_length(slug: &str) -> String {
    let truncated: String = slug.chars().take(SLUG_MAX_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}
