//! Per-run issue cache so each distinct ticket key or issue id costs one tracker lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use worklog_api::ApiError;

use crate::model::ResolvedTicket;
use crate::services::{IssueTracker, ServiceResult};
use crate::ticket::TicketKey;

#[derive(Default)]
struct CacheState {
    by_key: HashMap<TicketKey, Option<ResolvedTicket>>,
    key_by_id: HashMap<String, Option<String>>,
}

/// Thread-safe cache of tracker answers, including negative ones. Failed lookups are not cached.
#[derive(Clone, Default)]
pub struct IssueCache {
    state: Arc<Mutex<CacheState>>,
}

impl IssueCache {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn cached(&self, key: &TicketKey) -> Option<Option<ResolvedTicket>> {
        self.lock().by_key.get(key).cloned()
    }

    /// Looks the key up in the tracker unless an earlier answer is cached.
    pub async fn validate(
        &self,
        tracker: &dyn IssueTracker,
        key: &TicketKey,
    ) -> ServiceResult<Option<ResolvedTicket>> {
        if let Some(cached) = self.cached(key) {
            return Ok(cached);
        }
        let found = tracker.find_issue(key).await?;
        self.lock().by_key.insert(key.clone(), found.clone());
        Ok(found)
    }

    /// Validates every distinct key concurrently; duplicates in `keys` share one lookup.
    /// A failed lookup does not stop the others: it is returned per key and left uncached.
    pub async fn validate_all<'k, I>(
        &self,
        tracker: &dyn IssueTracker,
        keys: I,
    ) -> BTreeMap<TicketKey, ApiError>
    where
        I: IntoIterator<Item = &'k TicketKey>,
    {
        let distinct: BTreeSet<&TicketKey> = keys
            .into_iter()
            .filter(|key| self.cached(key).is_none())
            .collect();
        log::debug!("Validating {} distinct issue keys", distinct.len());

        join_all(distinct.into_iter().map(|key| async move {
            (key, self.validate(tracker, key).await)
        }))
        .await
        .into_iter()
        .filter_map(|(key, result)| match result {
            Ok(_) => None,
            Err(err) => {
                log::warn!("Could not look up {}: {}", key, err);
                Some((key.clone(), err))
            }
        })
        .collect()
    }

    pub async fn key_for_id(
        &self,
        tracker: &dyn IssueTracker,
        issue_id: &str,
    ) -> ServiceResult<Option<String>> {
        let cached = self.lock().key_by_id.get(issue_id).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        let key = tracker.resolve_ticket_key(issue_id).await?;
        self.lock()
            .key_by_id
            .insert(issue_id.to_string(), key.clone());
        Ok(key)
    }
}
