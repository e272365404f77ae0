use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::CycleCheck;
use crate::{
    error::SlugError,
    store::{NewRedirect, RedirectStore, StoreError},
};

/// Retargets every edge pointing at `old_slug` to `new_slug`, `batch_size` edges at a time.
///
/// Each batch re-reads the table, so edges added by concurrent writers between
/// batches are still picked up. A batch shorter than `batch_size` ends the loop.
///
/// # Errors
/// Store errors; batches finished before the failure stay committed.
#[instrument(skip(store))]
pub async fn flatten_inbound<S>(
    store: &S,
    old_slug: &str,
    new_slug: &str,
    batch_size: usize,
) -> Result<u64, SlugError>
where
    S: RedirectStore + ?Sized,
{
    let batch_size = batch_size.max(1);
    let mut total = 0;
    loop {
        let ids = store.redirect_ids_targeting(old_slug, batch_size).await?;
        if ids.is_empty() {
            break;
        }
        total += store.retarget_redirects(&ids, new_slug).await?;
        debug!(batch = ids.len(), "retargeted redirect batch");
        if ids.len() < batch_size {
            break;
        }
    }
    Ok(total)
}

/// Flattens inbound edges of `old_slug` and links `old_slug -> new_slug` for the record.
///
/// No edge is linked after a reversion; the vacated slug is released instead.
/// A unique conflict on `old_slug` means another writer already linked it;
/// that is logged and treated as success.
///
/// # Errors
/// Store errors other than the duplicate-link race.
#[instrument(skip(store))]
pub async fn rewrite_chain<S>(
    store: &S,
    record_id: Uuid,
    old_slug: &str,
    new_slug: &str,
    batch_size: usize,
    check: CycleCheck,
) -> Result<(), SlugError>
where
    S: RedirectStore + ?Sized,
{
    let flattened = flatten_inbound(store, old_slug, new_slug, batch_size).await?;
    debug!(flattened, "inbound redirects flattened");

    if check == CycleCheck::Reverted {
        return Ok(());
    }

    let redirect = NewRedirect {
        old_slug: old_slug.to_string(),
        new_slug: new_slug.to_string(),
        record_id: Some(record_id),
        note: None,
    };
    match store.insert_redirect(redirect).await {
        Ok(edge) => {
            debug!(redirect_id = %edge.id, "redirect linked");
            Ok(())
        }
        Err(StoreError::UniqueViolation(constraint)) => {
            warn!(old_slug, new_slug, %constraint, "redirect already linked by another writer");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn link(store: &MemoryStore, old_slug: &str, new_slug: &str) {
        store
            .insert_redirect(NewRedirect {
                old_slug: old_slug.to_string(),
                new_slug: new_slug.to_string(),
                record_id: None,
                note: None,
            })
            .await
            .expect("insert redirect");
    }

    #[tokio::test]
    async fn flattens_large_fan_in_in_batches() {
        let store = MemoryStore::new();
        for index in 0..25 {
            link(&store, &format!("alias-{index}"), "current").await;
        }
        link(&store, "unrelated", "elsewhere").await;

        let updated = flatten_inbound(&store, "current", "renamed", 10)
            .await
            .expect("flatten");
        assert_eq!(updated, 25);
        assert!(store
            .redirect_ids_targeting("current", 100)
            .await
            .expect("query")
            .is_empty());
        assert_eq!(
            store.find_redirect("unrelated").await.expect("query").map(|edge| edge.new_slug),
            Some("elsewhere".to_string())
        );
    }

    #[tokio::test]
    async fn exact_multiple_of_batch_size_terminates() {
        let store = MemoryStore::new();
        for index in 0..20 {
            link(&store, &format!("alias-{index}"), "current").await;
        }
        let updated = flatten_inbound(&store, "current", "renamed", 10)
            .await
            .expect("flatten");
        assert_eq!(updated, 20);
    }

    #[tokio::test]
    async fn links_vacated_slug() {
        let store = MemoryStore::new();
        let record_id = Uuid::new_v4();
        link(&store, "first", "second").await;

        rewrite_chain(&store, record_id, "second", "third", 100, CycleCheck::Clear)
            .await
            .expect("rewrite");

        let first = store.find_redirect("first").await.expect("query").expect("edge");
        assert_eq!(first.new_slug, "third");
        let second = store.find_redirect("second").await.expect("query").expect("edge");
        assert_eq!(second.new_slug, "third");
        assert_eq!(second.record_id, Some(record_id));
    }

    #[tokio::test]
    async fn duplicate_link_is_tolerated() {
        let store = MemoryStore::new();
        link(&store, "second", "third").await;

        rewrite_chain(&store, Uuid::new_v4(), "second", "third", 100, CycleCheck::Clear)
            .await
            .expect("duplicate is benign");
        assert_eq!(store.list_redirects(None).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn reversion_links_nothing() {
        let store = MemoryStore::new();
        rewrite_chain(&store, Uuid::new_v4(), "b", "a", 100, CycleCheck::Reverted)
            .await
            .expect("rewrite");
        assert!(store.find_redirect("b").await.expect("query").is_none());
    }
}
