//! Edits applied to a cached listing and the per-kind critical section around them

use crate::cache::{CacheError, ListingCache};
use crate::summary::Summary;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Change to apply to one kind's cached list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEdit {
    /// Replace the entry with the same name in place, or append it
    Upsert(Summary),
    /// Remove the entry with this name
    Remove(String),
}

/// What an edit did to the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Appended,
    Replaced,
    Removed,
    /// The entry to remove was not in the list
    Missing,
}

impl ListingEdit {
    pub fn stack_name(&self) -> &str {
        match self {
            ListingEdit::Upsert(summary) => &summary.name,
            ListingEdit::Remove(name) => name,
        }
    }

    pub fn apply(self, list: &mut Vec<Summary>) -> EditOutcome {
        match self {
            ListingEdit::Upsert(summary) => {
                match list.iter_mut().find(|s| s.name == summary.name) {
                    Some(existing) => {
                        *existing = summary;
                        EditOutcome::Replaced
                    }
                    None => {
                        list.push(summary);
                        EditOutcome::Appended
                    }
                }
            }
            ListingEdit::Remove(name) => {
                let before = list.len();
                list.retain(|s| s.name != name);
                if list.len() < before {
                    EditOutcome::Removed
                } else {
                    EditOutcome::Missing
                }
            }
        }
    }
}

/// Result of a read-modify-write on the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Written(EditOutcome),
    /// Nothing cached for the kind, so there was nothing to remove
    Absent,
}

/// One mutex per cache key, held only around cache reads and writes
#[derive(Default)]
pub struct CacheLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the key's lock, giving up after `limit`
    pub async fn acquire(&self, key: &str, limit: Duration) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.to_string()).or_default().clone()
        };
        tokio::time::timeout(limit, lock.lock_owned()).await.ok()
    }
}

/// Read the list for `key`, apply `edit` and write it back
///
/// An absent entry counts as an empty list for upserts, so a mutation never
/// triggers a full engine scan. Removing from an absent entry writes nothing.
pub async fn edit_cached(
    cache: &dyn ListingCache,
    key: &str,
    edit: ListingEdit,
) -> Result<CacheWrite, CacheError> {
    let mut list = match cache.get(key).await {
        Ok(list) => list,
        Err(CacheError::NotFound(_)) => match edit {
            ListingEdit::Upsert(_) => Vec::new(),
            ListingEdit::Remove(_) => return Ok(CacheWrite::Absent),
        },
        Err(e) => return Err(e),
    };

    let outcome = edit.apply(&mut list);
    if outcome != EditOutcome::Missing {
        cache.set(key, &list).await?;
    }
    Ok(CacheWrite::Written(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn site(name: &str, url: &str) -> Summary {
        Summary::site(name, url, format!("https://app.pulumi.com/acme/stackport/{name}"))
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut list = vec![site("a", "http://a1"), site("b", "http://b1"), site("c", "http://c1")];

        let outcome = ListingEdit::Upsert(site("b", "http://b2")).apply(&mut list);

        assert_eq!(outcome, EditOutcome::Replaced);
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].url.as_deref(), Some("http://b2"));
    }

    #[test]
    fn test_upsert_appends_new_name() {
        let mut list = vec![site("a", "http://a1")];
        let outcome = ListingEdit::Upsert(site("b", "http://b1")).apply(&mut list);

        assert_eq!(outcome, EditOutcome::Appended);
        assert_eq!(list.last().unwrap().name, "b");
    }

    #[test]
    fn test_remove() {
        let mut list = vec![site("a", "http://a1"), site("b", "http://b1")];

        assert_eq!(
            ListingEdit::Remove("a".to_string()).apply(&mut list),
            EditOutcome::Removed
        );
        assert_eq!(
            ListingEdit::Remove("a".to_string()).apply(&mut list),
            EditOutcome::Missing
        );
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_cached_upsert_into_absent_entry() {
        let cache = MemoryCache::new();

        let write = edit_cached(&cache, "sites", ListingEdit::Upsert(site("a", "http://a1")))
            .await
            .unwrap();

        assert_eq!(write, CacheWrite::Written(EditOutcome::Appended));
        assert_eq!(cache.get("sites").await.unwrap(), vec![site("a", "http://a1")]);
    }

    #[tokio::test]
    async fn test_edit_cached_remove_from_absent_entry() {
        let cache = MemoryCache::new();

        let write = edit_cached(&cache, "sites", ListingEdit::Remove("a".to_string()))
            .await
            .unwrap();

        assert_eq!(write, CacheWrite::Absent);
        assert!(!cache.exists("sites").await.unwrap());
    }

    #[tokio::test]
    async fn test_edit_cached_writes_back() {
        let cache = MemoryCache::new();
        cache.set("sites", &[site("a", "http://a1")]).await.unwrap();

        let write = edit_cached(&cache, "sites", ListingEdit::Upsert(site("b", "http://b1")))
            .await
            .unwrap();

        assert_eq!(write, CacheWrite::Written(EditOutcome::Appended));
        assert_eq!(cache.get("sites").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lock_acquire_times_out_while_held() {
        let locks = CacheLocks::new();
        let held = locks.acquire("sites", Duration::from_millis(50)).await;
        assert!(held.is_some());

        assert!(locks.acquire("sites", Duration::from_millis(20)).await.is_none());
        assert!(locks.acquire("vms", Duration::from_millis(20)).await.is_some());

        drop(held);
        assert!(locks.acquire("sites", Duration::from_millis(20)).await.is_some());
    }
}
