use super::{
    ContentRecord, NewRedirect, RecordStore, RedirectEdge, RedirectStore, Store, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    records: Vec<ContentRecord>,
    // Insertion order doubles as `created_at` order.
    redirects: Vec<RedirectEdge>,
}

/// Process-local store with the same uniqueness rules as the `PostgreSQL` schema.
///
/// Clones share the same tables. The lock is never held across an await point.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_excluded(id: Uuid, exclude: Option<Uuid>) -> bool {
    exclude != Some(id)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_record(&self, title: &str, slug: &str) -> Result<ContentRecord, StoreError> {
        let mut tables = self.tables();
        if tables.records.iter().any(|record| record.slug == slug) {
            return Err(StoreError::UniqueViolation(
                "content_records_slug_idx".to_string(),
            ));
        }
        let now = Utc::now();
        let record = ContentRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.records.push(record.clone());
        Ok(record)
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self
            .tables()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn find_slug_owner(
        &self,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let tables = self.tables();
        let current = tables
            .records
            .iter()
            .find(|record| record.slug == slug && not_excluded(record.id, exclude));
        if let Some(record) = current {
            return Ok(Some(record.clone()));
        }

        let alias_owner = tables
            .redirects
            .iter()
            .filter(|edge| edge.old_slug == slug)
            .find_map(|edge| edge.record_id)
            .filter(|id| not_excluded(*id, exclude));
        Ok(alias_owner.and_then(|id| tables.records.iter().find(|record| record.id == id).cloned()))
    }

    async fn taken_slugs_with_prefix(
        &self,
        prefix: &str,
        exclude: Option<Uuid>,
    ) -> Result<Vec<String>, StoreError> {
        let tables = self.tables();
        let current = tables
            .records
            .iter()
            .filter(|record| not_excluded(record.id, exclude) && record.slug.starts_with(prefix))
            .map(|record| record.slug.clone());
        let aliases = tables
            .redirects
            .iter()
            .filter(|edge| {
                edge.record_id.is_some_and(|id| not_excluded(id, exclude))
                    && edge.old_slug.starts_with(prefix)
            })
            .map(|edge| edge.old_slug.clone());
        Ok(current.chain(aliases).collect())
    }

    async fn update_record(
        &self,
        id: Uuid,
        slug: &str,
        title: Option<&str>,
    ) -> Result<Option<ContentRecord>, StoreError> {
        let mut tables = self.tables();
        if tables
            .records
            .iter()
            .any(|record| record.slug == slug && record.id != id)
        {
            return Err(StoreError::UniqueViolation(
                "content_records_slug_idx".to_string(),
            ));
        }
        let Some(record) = tables.records.iter_mut().find(|record| record.id == id) else {
            return Ok(None);
        };
        slug.clone_into(&mut record.slug);
        if let Some(title) = title {
            title.clone_into(&mut record.title);
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }
}

#[async_trait]
impl RedirectStore for MemoryStore {
    async fn find_redirect(&self, old_slug: &str) -> Result<Option<RedirectEdge>, StoreError> {
        Ok(self
            .tables()
            .redirects
            .iter()
            .find(|edge| edge.old_slug == old_slug)
            .cloned())
    }

    async fn find_record_redirect(
        &self,
        record_id: Uuid,
        old_slug: &str,
        new_slug: &str,
    ) -> Result<Option<RedirectEdge>, StoreError> {
        Ok(self
            .tables()
            .redirects
            .iter()
            .find(|edge| {
                edge.record_id == Some(record_id)
                    && edge.old_slug == old_slug
                    && edge.new_slug == new_slug
            })
            .cloned())
    }

    async fn redirect_ids_targeting(
        &self,
        new_slug: &str,
        limit: usize,
    ) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .tables()
            .redirects
            .iter()
            .filter(|edge| edge.new_slug == new_slug)
            .take(limit)
            .map(|edge| edge.id)
            .collect())
    }

    async fn retarget_redirects(&self, ids: &[Uuid], new_slug: &str) -> Result<u64, StoreError> {
        let mut updated = 0;
        for edge in self
            .tables()
            .redirects
            .iter_mut()
            .filter(|edge| ids.contains(&edge.id))
        {
            new_slug.clone_into(&mut edge.new_slug);
            updated += 1;
        }
        Ok(updated)
    }

    async fn insert_redirect(&self, redirect: NewRedirect) -> Result<RedirectEdge, StoreError> {
        let mut tables = self.tables();
        if tables
            .redirects
            .iter()
            .any(|edge| edge.old_slug == redirect.old_slug)
        {
            return Err(StoreError::UniqueViolation(
                "slug_redirects_old_slug_idx".to_string(),
            ));
        }
        let edge = RedirectEdge {
            id: Uuid::new_v4(),
            old_slug: redirect.old_slug,
            new_slug: redirect.new_slug,
            record_id: redirect.record_id,
            note: redirect.note,
            created_at: Utc::now(),
        };
        tables.redirects.push(edge.clone());
        Ok(edge)
    }

    async fn delete_redirect(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables();
        let before = tables.redirects.len();
        tables.redirects.retain(|edge| edge.id != id);
        Ok(tables.redirects.len() < before)
    }

    async fn delete_self_redirects(&self, record_id: Uuid, slug: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables();
        let before = tables.redirects.len();
        tables.redirects.retain(|edge| {
            !(edge.record_id == Some(record_id) && edge.old_slug == slug && edge.new_slug == slug)
        });
        Ok((before - tables.redirects.len()) as u64)
    }

    async fn list_redirects(
        &self,
        record_id: Option<Uuid>,
    ) -> Result<Vec<RedirectEdge>, StoreError> {
        Ok(self
            .tables()
            .redirects
            .iter()
            .rev()
            .filter(|edge| record_id.is_none() || edge.record_id == record_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(old_slug: &str, new_slug: &str, record_id: Option<Uuid>) -> NewRedirect {
        NewRedirect {
            old_slug: old_slug.to_string(),
            new_slug: new_slug.to_string(),
            record_id,
            note: None,
        }
    }

    #[tokio::test]
    async fn record_slugs_are_unique() {
        let store = MemoryStore::new();
        store.insert_record("One", "one").await.expect("insert");
        let err = store.insert_record("Uno", "one").await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn redirect_old_slugs_are_unique() {
        let store = MemoryStore::new();
        store.insert_redirect(edge("a", "b", None)).await.expect("insert");
        let err = store.insert_redirect(edge("a", "c", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn slug_owner_covers_owned_aliases() {
        let store = MemoryStore::new();
        let owner = store.insert_record("Post", "post").await.expect("insert");
        store
            .insert_redirect(edge("old-post", "post", Some(owner.id)))
            .await
            .expect("insert");
        store
            .insert_redirect(edge("manual", "post", None))
            .await
            .expect("insert");

        let found = store.find_slug_owner("old-post", None).await.expect("query");
        assert_eq!(found.map(|record| record.id), Some(owner.id));
        assert!(store
            .find_slug_owner("old-post", Some(owner.id))
            .await
            .expect("query")
            .is_none());
        assert!(store.find_slug_owner("manual", None).await.expect("query").is_none());

        let mut taken = store
            .taken_slugs_with_prefix("", None)
            .await
            .expect("query");
        taken.sort();
        assert_eq!(taken, vec!["old-post".to_string(), "post".to_string()]);
    }

    #[tokio::test]
    async fn batches_respect_limit() {
        let store = MemoryStore::new();
        for index in 0..5 {
            store
                .insert_redirect(edge(&format!("alias-{index}"), "target", None))
                .await
                .expect("insert");
        }
        let ids = store.redirect_ids_targeting("target", 3).await.expect("query");
        assert_eq!(ids.len(), 3);
        assert_eq!(store.retarget_redirects(&ids, "next").await.expect("update"), 3);
        let rest = store.redirect_ids_targeting("target", 3).await.expect("query");
        assert_eq!(rest.len(), 2);
    }
}
