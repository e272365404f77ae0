use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{error::SlugError, store::RedirectStore};

/// Deletes self-referencing edges (`slug -> slug`) owned by `record_id`.
///
/// Edges that merely point at `current_slug` from a different slug are the
/// record's published aliases and are left alone.
///
/// # Errors
/// Store errors.
#[instrument(skip(store))]
pub async fn remove_self_redirects<S>(
    store: &S,
    record_id: Uuid,
    current_slug: &str,
) -> Result<u64, SlugError>
where
    S: RedirectStore + ?Sized,
{
    let removed = store.delete_self_redirects(record_id, current_slug).await?;
    if removed > 0 {
        debug!(removed, "removed self-referencing redirects");
    }
    Ok(removed)
}

/// Deletes the edge leaving `slug` once a record goes live under it.
///
/// Only ownerless edges can still sit there after availability checks; the
/// live slug wins and the manual redirect is dropped.
///
/// # Errors
/// Store errors.
#[instrument(skip(store))]
pub async fn release_live_slug<S>(store: &S, slug: &str) -> Result<bool, SlugError>
where
    S: RedirectStore + ?Sized,
{
    let Some(edge) = store.find_redirect(slug).await? else {
        return Ok(false);
    };
    let removed = store.delete_redirect(edge.id).await?;
    if removed {
        info!(redirect_id = %edge.id, new_slug = %edge.new_slug, "redirect shadowed by live slug removed");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewRedirect};

    #[tokio::test]
    async fn releases_shadowed_manual_redirect() {
        let store = MemoryStore::new();
        store
            .insert_redirect(NewRedirect {
                old_slug: "promo".to_string(),
                new_slug: "landing".to_string(),
                record_id: None,
                note: None,
            })
            .await
            .expect("insert");

        assert!(release_live_slug(&store, "promo").await.expect("release"));
        assert!(store.find_redirect("promo").await.expect("query").is_none());
        assert!(!release_live_slug(&store, "promo").await.expect("release"));
    }

    #[tokio::test]
    async fn removes_only_self_references_of_the_record() {
        let store = MemoryStore::new();
        let record_id = Uuid::new_v4();
        let other_id = Uuid::new_v4();
        for (old_slug, new_slug, owner) in [
            ("post", "post", Some(record_id)),
            ("old-post", "post", Some(record_id)),
            ("other", "other", Some(other_id)),
        ] {
            store
                .insert_redirect(NewRedirect {
                    old_slug: old_slug.to_string(),
                    new_slug: new_slug.to_string(),
                    record_id: owner,
                    note: None,
                })
                .await
                .expect("insert");
        }

        let removed = remove_self_redirects(&store, record_id, "post")
            .await
            .expect("cleanup");
        assert_eq!(removed, 1);
        assert!(store.find_redirect("post").await.expect("query").is_none());
        assert!(store.find_redirect("old-post").await.expect("query").is_some());
        assert!(store.find_redirect("other").await.expect("query").is_some());
    }
}
