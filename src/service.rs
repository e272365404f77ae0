//! Slug operations exposed to the HTTP layer.
//!
//! `SlugService` owns no state besides a store handle and the rename policy,
//! so one instance is shared by every request.

use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    error::SlugError,
    redirect::{self, CycleCheck, RenamePolicy},
    slug,
    store::{ContentRecord, NewRedirect, RecordStore, RedirectEdge, RedirectStore, Store, StoreError},
};

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub normalized_slug: String,
    pub available: bool,
    pub conflict: Option<ContentRecord>,
}

/// Result of a slug regeneration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugChange {
    pub old_slug: String,
    pub new_slug: String,
    pub changed: bool,
}

#[derive(Clone)]
pub struct SlugService {
    store: Arc<dyn Store>,
    policy: RenamePolicy,
}

impl SlugService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, policy: RenamePolicy) -> Self {
        Self {
            store,
            policy: policy.normalize(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    #[must_use]
    pub const fn policy(&self) -> RenamePolicy {
        self.policy
    }

    /// Normalizes and validates `candidate`, then reports whether another
    /// record already claims it. One store lookup, no suffix probing.
    ///
    /// # Errors
    /// `Validation` for malformed input; store errors.
    #[instrument(skip(self))]
    pub async fn check_availability(
        &self,
        candidate: &str,
        exclude: Option<Uuid>,
    ) -> Result<Availability, SlugError> {
        let normalized_slug = slug::normalize(candidate);
        slug::validate(&normalized_slug)?;

        let conflict = self
            .store
            .find_slug_owner(&normalized_slug, exclude)
            .await?;
        Ok(Availability {
            available: conflict.is_none(),
            normalized_slug,
            conflict,
        })
    }

    /// Creates a content record with a slug derived from `manual_slug`, or from
    /// `title` when none is given. Collisions get a numeric suffix.
    ///
    /// # Errors
    /// `MissingTitle`, `Validation`, `SlugExists` when no variant fits or a
    /// concurrent writer took the slug, or store errors.
    #[instrument(skip(self))]
    pub async fn create_record(
        &self,
        title: &str,
        manual_slug: Option<&str>,
    ) -> Result<ContentRecord, SlugError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SlugError::MissingTitle);
        }

        let base = slug::prepare(manual_slug.unwrap_or(title))?;
        let slug = slug::resolve_available(self.store.as_ref(), &base, None).await?;

        let record = self
            .store
            .insert_record(title, &slug)
            .await
            .map_err(|err| slug_conflict(err, &slug))?;
        redirect::release_live_slug(self.store.as_ref(), &record.slug).await?;
        info!(record_id = %record.id, slug = %record.slug, "content record created");
        Ok(record)
    }

    /// # Errors
    /// `NotFound` or store errors.
    pub async fn record(&self, id: Uuid) -> Result<ContentRecord, SlugError> {
        self.store
            .find_record(id)
            .await?
            .ok_or(SlugError::NotFound("record"))
    }

    /// Picks a new slug for a record and, if it differs, renames the record
    /// while keeping every old slug resolvable.
    ///
    /// With `manual_slug` the normalized value must not be claimed by another
    /// record. Without it the slug is derived from `title` (or the stored
    /// title) and collisions get a numeric suffix. A supplied `title` is also
    /// stored on the record.
    ///
    /// # Errors
    /// `NotFound`, `Validation`, `SlugExists`, `RedirectCycle`/`ChainTooDeep`,
    /// or store errors. A refused rename changes nothing.
    #[instrument(skip(self))]
    pub async fn regenerate_slug(
        &self,
        id: Uuid,
        title: Option<&str>,
        manual_slug: Option<&str>,
    ) -> Result<SlugChange, SlugError> {
        let record = self.record(id).await?;
        let title = title.map(str::trim).filter(|title| !title.is_empty());

        let new_slug = match manual_slug {
            Some(manual) => {
                let slug = slug::prepare(manual)?;
                if slug != record.slug {
                    self.ensure_unclaimed(&slug, Some(record.id)).await?;
                }
                slug
            }
            None => {
                let base = slug::prepare(title.unwrap_or(&record.title))?;
                slug::resolve_available(self.store.as_ref(), &base, Some(record.id)).await?
            }
        };

        if new_slug == record.slug {
            if let Some(title) = title.filter(|title| *title != record.title) {
                self.persist(&record, &new_slug, Some(title)).await?;
            }
            debug!(slug = %record.slug, "slug unchanged");
            return Ok(SlugChange {
                old_slug: record.slug.clone(),
                new_slug,
                changed: false,
            });
        }

        self.rename(&record, &new_slug).await?;
        self.persist(&record, &new_slug, title).await?;

        Ok(SlugChange {
            old_slug: record.slug,
            new_slug,
            changed: true,
        })
    }

    /// Cycle check, release of the new slug, chain rewrite and cleanup, in that order.
    async fn rename(&self, record: &ContentRecord, new_slug: &str) -> Result<(), SlugError> {
        let store = self.store.as_ref();
        let check = redirect::detect_cycle(
            store,
            record.id,
            &record.slug,
            new_slug,
            self.policy.max_depth(),
        )
        .await?;
        redirect::release_live_slug(store, new_slug).await?;
        redirect::rewrite_chain(
            store,
            record.id,
            &record.slug,
            new_slug,
            self.policy.batch_size(),
            check,
        )
        .await?;
        redirect::remove_self_redirects(store, record.id, new_slug).await?;

        info!(
            record_id = %record.id,
            old_slug = %record.slug,
            new_slug,
            reverted = check == CycleCheck::Reverted,
            "slug renamed"
        );
        Ok(())
    }

    async fn persist(
        &self,
        record: &ContentRecord,
        slug: &str,
        title: Option<&str>,
    ) -> Result<ContentRecord, SlugError> {
        self.store
            .update_record(record.id, slug, title)
            .await
            .map_err(|err| slug_conflict(err, slug))?
            .ok_or(SlugError::NotFound("record"))
    }

    async fn ensure_unclaimed(&self, slug: &str, exclude: Option<Uuid>) -> Result<(), SlugError> {
        match self.store.find_slug_owner(slug, exclude).await? {
            Some(owner) => Err(SlugError::SlugExists {
                slug: slug.to_string(),
                conflict: Some(Box::new(owner)),
            }),
            None => Ok(()),
        }
    }

    /// Single point lookup of a vacated slug. By construction the result is
    /// the live slug, never another alias.
    ///
    /// # Errors
    /// Store errors.
    pub async fn resolve_redirect(&self, old_slug: &str) -> Result<Option<String>, SlugError> {
        Ok(self
            .store
            .find_redirect(old_slug)
            .await?
            .map(|edge| edge.new_slug))
    }

    /// # Errors
    /// Store errors.
    pub async fn list_redirects(
        &self,
        record_id: Option<Uuid>,
    ) -> Result<Vec<RedirectEdge>, SlugError> {
        Ok(self.store.list_redirects(record_id).await?)
    }

    /// Adds a manually authored redirect that no record owns.
    ///
    /// The target is followed to its live slug first, so the new edge is
    /// single-hop, and edges already pointing at `old_slug` are retargeted.
    ///
    /// # Errors
    /// `Validation`, `SlugExists` when `old_slug` is live or already redirected,
    /// `RedirectCycle`/`ChainTooDeep`, or store errors.
    #[instrument(skip(self))]
    pub async fn create_redirect(
        &self,
        old_slug: &str,
        new_slug: &str,
        note: Option<&str>,
    ) -> Result<RedirectEdge, SlugError> {
        let old_slug = slug::prepare(old_slug)?;
        let target = slug::prepare(new_slug)?;

        self.ensure_unclaimed(&old_slug, None).await?;
        if self.store.find_redirect(&old_slug).await?.is_some() {
            return Err(SlugError::SlugExists {
                slug: old_slug,
                conflict: None,
            });
        }

        let store = self.store.as_ref();
        let target = redirect::walk_chain(store, &old_slug, &target, self.policy.max_depth()).await?;
        redirect::flatten_inbound(store, &old_slug, &target, self.policy.batch_size()).await?;

        let edge = store
            .insert_redirect(NewRedirect {
                old_slug: old_slug.clone(),
                new_slug: target,
                record_id: None,
                note: note.map(str::trim).filter(|note| !note.is_empty()).map(str::to_string),
            })
            .await
            .map_err(|err| slug_conflict(err, &old_slug))?;
        info!(redirect_id = %edge.id, old_slug = %edge.old_slug, new_slug = %edge.new_slug, "manual redirect created");
        Ok(edge)
    }

    /// # Errors
    /// `NotFound` or store errors.
    #[instrument(skip(self))]
    pub async fn delete_redirect(&self, id: Uuid) -> Result<(), SlugError> {
        if self.store.delete_redirect(id).await? {
            info!(redirect_id = %id, "redirect deleted");
            Ok(())
        } else {
            Err(SlugError::NotFound("redirect"))
        }
    }
}

/// A unique violation on write means another writer took `slug` first.
fn slug_conflict(err: StoreError, slug: &str) -> SlugError {
    match err {
        StoreError::UniqueViolation(_) => SlugError::SlugExists {
            slug: slug.to_string(),
            conflict: None,
        },
        other => SlugError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;

    fn service() -> (SlugService, MemoryStore) {
        let store = MemoryStore::new();
        let service = SlugService::new(Arc::new(store.clone()), RenamePolicy::default());
        (service, store)
    }

    async fn rename(service: &SlugService, id: Uuid, slug: &str) -> Result<SlugChange, SlugError> {
        service.regenerate_slug(id, None, Some(slug)).await
    }

    async fn assert_invariants(store: &MemoryStore) {
        let edges = store.list_redirects(None).await.expect("list");
        let olds: HashSet<&str> = edges.iter().map(|edge| edge.old_slug.as_str()).collect();
        assert_eq!(olds.len(), edges.len(), "duplicate old_slug in {edges:?}");
        for edge in &edges {
            assert_ne!(edge.old_slug, edge.new_slug, "self loop in {edges:?}");
            assert!(
                !olds.contains(edge.new_slug.as_str()),
                "multi-hop chain through {} in {edges:?}",
                edge.new_slug
            );
        }
    }

    #[tokio::test]
    async fn scenario_resolves_in_one_hop() {
        let (service, _store) = service();
        let record = service.create_record("My Project", None).await.expect("create");
        assert_eq!(record.slug, "my-project");

        rename(&service, record.id, "mi-proyecto").await.expect("rename");
        assert_eq!(
            service.resolve_redirect("my-project").await.expect("resolve").as_deref(),
            Some("mi-proyecto")
        );

        let change = rename(&service, record.id, "proyecto-final").await.expect("rename");
        assert_eq!(
            change,
            SlugChange {
                old_slug: "mi-proyecto".to_string(),
                new_slug: "proyecto-final".to_string(),
                changed: true,
            }
        );
        assert_eq!(
            service.resolve_redirect("my-project").await.expect("resolve").as_deref(),
            Some("proyecto-final")
        );
        assert_eq!(
            service.resolve_redirect("mi-proyecto").await.expect("resolve").as_deref(),
            Some("proyecto-final")
        );
        assert_eq!(service.record(record.id).await.expect("record").slug, "proyecto-final");
    }

    #[tokio::test]
    async fn reversion_deletes_edge_without_inverse() {
        let (service, store) = service();
        let record = service.create_record("A", Some("a")).await.expect("create");

        rename(&service, record.id, "b").await.expect("rename");
        assert!(store.find_redirect("a").await.expect("query").is_some());

        let change = rename(&service, record.id, "a").await.expect("revert");
        assert!(change.changed);
        assert!(store.find_redirect("a").await.expect("query").is_none());
        assert!(store.find_redirect("b").await.expect("query").is_none());
        assert_eq!(service.record(record.id).await.expect("record").slug, "a");
    }

    #[tokio::test]
    async fn cycle_is_rejected_without_mutation() {
        let (service, store) = service();
        let record = service.create_record("C", Some("c")).await.expect("create");
        for (old_slug, new_slug) in [("a", "b"), ("b", "c")] {
            store
                .insert_redirect(NewRedirect {
                    old_slug: old_slug.to_string(),
                    new_slug: new_slug.to_string(),
                    record_id: None,
                    note: None,
                })
                .await
                .expect("insert");
        }
        let before = store.list_redirects(None).await.expect("list");

        let err = rename(&service, record.id, "a").await.unwrap_err();
        assert_eq!(err.code(), "REDIRECT_CYCLE");
        assert_eq!(store.list_redirects(None).await.expect("list"), before);
        assert_eq!(service.record(record.id).await.expect("record").slug, "c");
    }

    #[tokio::test]
    async fn live_slug_shadows_manual_redirect() {
        let (service, store) = service();
        let landing = service.create_record("Landing", None).await.expect("create");
        service.create_redirect("promo", "landing", None).await.expect("redirect");
        let record = service.create_record("Promo page", None).await.expect("create");

        rename(&service, record.id, "promo").await.expect("rename");
        assert!(store.find_redirect("promo").await.expect("query").is_none());
        assert_eq!(
            service.resolve_redirect("promo-page").await.expect("resolve").as_deref(),
            Some("promo")
        );
        assert_eq!(service.record(landing.id).await.expect("record").slug, "landing");
        assert_invariants(&store).await;

        service.create_redirect("sale", "landing", None).await.expect("redirect");
        let sale = service.create_record("Sale", None).await.expect("create");
        assert_eq!(sale.slug, "sale");
        assert!(service.resolve_redirect("sale").await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn manual_slug_collision_reports_owner() {
        let (service, _store) = service();
        let first = service.create_record("First", Some("taken")).await.expect("create");
        let second = service.create_record("Second", None).await.expect("create");

        let err = rename(&service, second.id, "Taken").await.unwrap_err();
        match err {
            SlugError::SlugExists { slug, conflict } => {
                assert_eq!(slug, "taken");
                assert_eq!(conflict.map(|record| record.id), Some(first.id));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_suffixes_taken_manual_slug() {
        let (service, _store) = service();
        service.create_record("One", Some("news")).await.expect("create");
        let second = service.create_record("Two", Some("News")).await.expect("create");
        assert_eq!(second.slug, "news-1");

        let err = service.create_record("   ", None).await.unwrap_err();
        assert_eq!(err.reason(), Some("EMPTY_TITLE"));
    }

    #[tokio::test]
    async fn historical_alias_of_other_record_is_claimed() {
        let (service, _store) = service();
        let first = service.create_record("Launch", None).await.expect("create");
        rename(&service, first.id, "launch-day").await.expect("rename");

        let second = service.create_record("Launch", None).await.expect("create");
        assert_eq!(second.slug, "launch-1");

        let err = rename(&service, second.id, "launch").await.unwrap_err();
        assert_eq!(err.code(), "SLUG_EXISTS");
    }

    #[tokio::test]
    async fn derived_slug_uses_title_and_suffixes() {
        let (service, _store) = service();
        service.create_record("Case Study", None).await.expect("create");
        let record = service.create_record("Other", None).await.expect("create");

        let change = service
            .regenerate_slug(record.id, Some("Case Study"), None)
            .await
            .expect("regenerate");
        assert_eq!(change.new_slug, "case-study-1");
        let stored = service.record(record.id).await.expect("record");
        assert_eq!(stored.title, "Case Study");
        assert_eq!(
            service.resolve_redirect("other").await.expect("resolve").as_deref(),
            Some("case-study-1")
        );
    }

    #[tokio::test]
    async fn unchanged_slug_is_a_noop() {
        let (service, store) = service();
        let record = service.create_record("Stable", None).await.expect("create");
        let change = service
            .regenerate_slug(record.id, None, None)
            .await
            .expect("regenerate");
        assert!(!change.changed);
        assert_eq!(change.old_slug, change.new_slug);
        assert!(store.list_redirects(None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn availability_check_does_not_probe() {
        let (service, _store) = service();
        let record = service.create_record("Hello", None).await.expect("create");

        let taken = service.check_availability("HELLO!", None).await.expect("check");
        assert_eq!(taken.normalized_slug, "hello");
        assert!(!taken.available);
        assert_eq!(taken.conflict.map(|owner| owner.id), Some(record.id));

        let own = service
            .check_availability("hello", Some(record.id))
            .await
            .expect("check");
        assert!(own.available);

        let err = service.check_availability("???", None).await.unwrap_err();
        assert_eq!(err.reason(), Some("EMPTY"));
    }

    #[tokio::test]
    async fn rename_sequences_keep_invariants() {
        let (service, store) = service();
        let pool = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
        let first = service.create_record("Alpha", Some("alpha")).await.expect("create");
        let second = service.create_record("Omega", Some("omega")).await.expect("create");
        let records = [first.id, second.id];

        // Deterministic walk over the pool, including reverts and collisions.
        for step in 0..60usize {
            let id = records[step % 2];
            let target = pool[(step * 7 + step / 3) % pool.len()];
            match rename(&service, id, target).await {
                Ok(_) => {}
                Err(err) => assert!(
                    matches!(err.code(), "SLUG_EXISTS" | "REDIRECT_CYCLE"),
                    "unexpected error: {err:?}"
                ),
            }
            assert_invariants(&store).await;

            // Owned edges always land on their owner's live slug.
            for edge in store.list_redirects(None).await.expect("list") {
                if let Some(owner) = edge.record_id {
                    let live = service.record(owner).await.expect("record");
                    assert_eq!(edge.new_slug, live.slug);
                }
            }
        }
    }

    #[tokio::test]
    async fn manual_redirects_are_flattened_and_guarded() {
        let (service, store) = service();
        let record = service.create_record("Guide", None).await.expect("create");
        rename(&service, record.id, "handbook").await.expect("rename");

        // Pointing at an alias lands on the live slug.
        let edge = service
            .create_redirect("old-guide", "guide", Some("  legacy link  "))
            .await
            .expect("create redirect");
        assert_eq!(edge.new_slug, "handbook");
        assert_eq!(edge.record_id, None);
        assert_eq!(edge.note.as_deref(), Some("legacy link"));

        let live = service.create_redirect("handbook", "elsewhere", None).await.unwrap_err();
        assert_eq!(live.code(), "SLUG_EXISTS");

        let dup = service.create_redirect("old-guide", "elsewhere", None).await.unwrap_err();
        assert_eq!(dup.code(), "SLUG_EXISTS");

        let cycle = service.create_redirect("loop", "loop", None).await.unwrap_err();
        assert!(cycle.is_cycle());

        service.delete_redirect(edge.id).await.expect("delete");
        assert!(store.find_redirect("old-guide").await.expect("query").is_none());
        let missing = service.delete_redirect(edge.id).await.unwrap_err();
        assert_eq!(missing.code(), "NOT_FOUND");
        assert_invariants(&store).await;
    }
}
