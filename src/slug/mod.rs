//! Slug derivation helpers.
//!
//! Slugs are normalized to lowercase `a-z0-9-`, capped to [`SLUG_MAX_LEN`] and
//! validated before any storage lookup. Collision resolution against stored
//! slugs lives in [`availability`].

pub mod availability;
mod normalize;
mod validate;

pub use availability::{resolve_available, with_suffix};
pub use normalize::normalize;
pub use validate::{cap_length, validate, SlugViolation, SLUG_MAX_LEN};

/// Runs user input through the normalizer, the length cap and the validator.
///
/// This is the path for both manually entered slugs and titles being derived
/// into a slug; the returned value is safe to store.
pub fn prepare(input: &str) -> Result<String, SlugViolation> {
    let slug = cap_length(&normalize(input));
    validate(&slug)?;
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_normalizes_and_caps() {
        assert_eq!(prepare("Mi Proyecto Final").as_deref(), Ok("mi-proyecto-final"));

        let long = "word ".repeat(40);
        let slug = prepare(&long).expect("long titles are capped, not rejected");
        assert!(slug.len() <= SLUG_MAX_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn prepare_rejects_empty_input() {
        assert_eq!(prepare("¡¿?!"), Err(SlugViolation::Empty));
        assert_eq!(prepare(""), Err(SlugViolation::Empty));
    }
}
