//! Collision resolution for derived slugs.
//!
//! All slugs sharing the base's prefix are read in one query, then `base`,
//! `base-1`, `base-2`, … are probed against that set in memory. The number of
//! round-trips stays at one no matter how many numbered variants exist.

use std::collections::HashSet;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::SLUG_MAX_LEN;
use crate::{error::SlugError, store::RecordStore};

// "-" plus the widest u32.
const MAX_SUFFIX_LEN: usize = 11;

/// Builds a slug by appending a numeric `-{suffix}` to an existing base.
/// Returns `None` if the suffix would exceed `max_len` or leaves no non-empty base segment.
/// The base is truncated (and a trailing hyphen dropped) so the result fits `max_len`.
pub fn with_suffix(base: &str, suffix: u32, max_len: usize) -> Option<String> {
    let suffix = format!("-{suffix}");
    if suffix.len() >= max_len {
        return None;
    }
    let allowed = max_len.saturating_sub(suffix.len());
    let base_part: String = base.chars().take(allowed).collect();
    let base_part = base_part.trim_end_matches('-');
    if base_part.is_empty() {
        return None;
    }
    Some(format!("{base_part}{suffix}"))
}

/// Prefix shared by `base` and every `with_suffix(base, n, SLUG_MAX_LEN)`.
fn probe_prefix(base: &str) -> String {
    let prefix: String = base
        .chars()
        .take(SLUG_MAX_LEN.saturating_sub(MAX_SUFFIX_LEN))
        .collect();
    prefix.trim_end_matches('-').to_string()
}

/// Picks `base` or the first free numbered variant from an already loaded set.
pub(crate) fn first_free(base: &str, taken: &HashSet<String>) -> Option<String> {
    if !taken.contains(base) {
        return Some(base.to_string());
    }
    (1..=u32::MAX)
        .map_while(|suffix| with_suffix(base, suffix, SLUG_MAX_LEN))
        .find(|candidate| !taken.contains(candidate))
}

/// Returns `base` or the first free `base-N` that no other record claims.
///
/// `exclude` is the record being saved, so re-saving a record does not collide
/// with its own slug or its own history.
///
/// # Errors
/// Returns `SlugError::Store` if the bulk lookup fails and `SlugError::SlugExists`
/// if no numbered variant fits within the length limit.
#[instrument(skip(store))]
pub async fn resolve_available<S>(
    store: &S,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<String, SlugError>
where
    S: RecordStore + ?Sized,
{
    let prefix = probe_prefix(base);
    let taken: HashSet<String> = store
        .taken_slugs_with_prefix(&prefix, exclude)
        .await?
        .into_iter()
        .collect();

    let slug = first_free(base, &taken).ok_or_else(|| SlugError::SlugExists {
        slug: base.to_string(),
        conflict: None,
    })?;
    debug!(taken = taken.len(), %slug, "resolved available slug");
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RecordStore};

    fn set(slugs: &[&str]) -> HashSet<String> {
        slugs.iter().map(|slug| (*slug).to_string()).collect()
    }

    #[test]
    fn with_suffix_appends_and_truncates() {
        assert_eq!(with_suffix("post", 1, SLUG_MAX_LEN).as_deref(), Some("post-1"));

        let long = "a".repeat(SLUG_MAX_LEN);
        let suffixed = with_suffix(&long, 12, SLUG_MAX_LEN).expect("fits");
        assert_eq!(suffixed.len(), SLUG_MAX_LEN);
        assert!(suffixed.ends_with("-12"));

        let dashed = format!("{}-b", "a".repeat(SLUG_MAX_LEN - 3));
        let suffixed = with_suffix(&dashed, 1, SLUG_MAX_LEN).expect("fits");
        assert!(!suffixed.contains("--"));

        assert_eq!(with_suffix("post", 1, 2), None);
    }

    #[test]
    fn first_free_returns_base_when_unused() {
        assert_eq!(first_free("post", &set(&["other"])).as_deref(), Some("post"));
    }

    #[test]
    fn first_free_skips_taken_suffixes() {
        for k in 0..5u32 {
            let mut taken = set(&["post"]);
            for n in 1..=k {
                taken.insert(format!("post-{n}"));
            }
            let expected = format!("post-{}", k + 1);
            let slug = first_free("post", &taken).expect("free slug");
            assert_eq!(slug, expected);
            assert!(!taken.contains(&slug));
        }
    }

    #[test]
    fn first_free_fills_gaps() {
        let taken = set(&["post", "post-1", "post-3"]);
        assert_eq!(first_free("post", &taken).as_deref(), Some("post-2"));
    }

    #[test]
    fn probe_prefix_covers_truncated_candidates() {
        let base = format!("{}-{}", "a".repeat(88), "b".repeat(11));
        let prefix = probe_prefix(&base);
        assert!(base.starts_with(&prefix));
        for suffix in [1, 99, 12_345, u32::MAX] {
            let candidate = with_suffix(&base, suffix, SLUG_MAX_LEN).expect("fits");
            assert!(candidate.starts_with(&prefix), "{candidate}");
        }
    }

    #[tokio::test]
    async fn resolves_against_store_in_one_lookup() {
        let store = MemoryStore::new();
        store.insert_record("Post", "post").await.expect("insert");
        store.insert_record("Post", "post-1").await.expect("insert");
        store.insert_record("Poster", "poster").await.expect("insert");

        let slug = resolve_available(&store, "post", None).await.expect("resolve");
        assert_eq!(slug, "post-2");
    }

    #[tokio::test]
    async fn excluded_record_keeps_its_slug() {
        let store = MemoryStore::new();
        let record = store.insert_record("Post", "post").await.expect("insert");

        let slug = resolve_available(&store, "post", Some(record.id))
            .await
            .expect("resolve");
        assert_eq!(slug, "post");
    }
}
