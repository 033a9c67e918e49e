//! Intent store interface
//!
//! The store owns intent documents and their resource versions. Status
//! writes are conditional on the version the writer observed.

use crate::error::StoreError;
use crate::types::{ContainmentIntent, ContainmentSpec, ContainmentStatus, IntentId};
use async_trait::async_trait;
use dashmap::DashMap;

/// Source of intent records and sink for their status
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Fetch an intent; `None` if it does not exist
    async fn get(&self, id: &IntentId) -> Result<Option<ContainmentIntent>, StoreError>;

    /// Replace the status if the stored version equals `expected_version`
    ///
    /// # Returns
    /// The new resource version
    ///
    /// # Errors
    /// - `StoreError::Conflict` if the version moved
    /// - `StoreError::NotFound` if the intent was deleted
    async fn update_status(
        &self,
        id: &IntentId,
        expected_version: u64,
        status: ContainmentStatus,
    ) -> Result<u64, StoreError>;

    /// Ids of every stored intent
    async fn list(&self) -> Result<Vec<IntentId>, StoreError>;
}

/// Process-local store
///
/// Backs tests and embedders that already hold intents in memory.
#[derive(Debug, Default)]
pub struct InMemoryIntentStore {
    intents: DashMap<IntentId, ContainmentIntent>,
}

impl InMemoryIntentStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an intent, bumping its version
    ///
    /// # Returns
    /// The intent id
    pub fn insert(&self, mut intent: ContainmentIntent) -> IntentId {
        let id = intent.id();
        let previous = self
            .intents
            .get(&id)
            .map_or(intent.metadata.resource_version, |existing| {
                existing.metadata.resource_version
            });
        intent.metadata.resource_version = previous + 1;
        self.intents.insert(id.clone(), intent);
        id
    }

    /// Apply an external spec update (e.g. an approval being granted)
    ///
    /// # Errors
    /// - `StoreError::NotFound` if the intent does not exist
    pub fn update_spec(
        &self,
        id: &IntentId,
        update: impl FnOnce(&mut ContainmentSpec),
    ) -> Result<u64, StoreError> {
        let mut entry = self
            .intents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        update(&mut entry.spec);
        entry.metadata.resource_version += 1;
        Ok(entry.metadata.resource_version)
    }

    /// Remove an intent
    pub fn remove(&self, id: &IntentId) -> Option<ContainmentIntent> {
        self.intents.remove(id).map(|(_, intent)| intent)
    }

    /// Snapshot an intent without going through the async interface
    #[must_use]
    pub fn snapshot(&self, id: &IntentId) -> Option<ContainmentIntent> {
        self.intents.get(id).map(|entry| entry.clone())
    }

    /// Number of stored intents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Check if the store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn get(&self, id: &IntentId) -> Result<Option<ContainmentIntent>, StoreError> {
        Ok(self.snapshot(id))
    }

    async fn update_status(
        &self,
        id: &IntentId,
        expected_version: u64,
        status: ContainmentStatus,
    ) -> Result<u64, StoreError> {
        let mut entry = self
            .intents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let found = entry.metadata.resource_version;
        if found != expected_version {
            return Err(StoreError::Conflict {
                id: id.clone(),
                expected: expected_version,
                found,
            });
        }

        entry.status = status;
        entry.metadata.resource_version += 1;
        Ok(entry.metadata.resource_version)
    }

    async fn list(&self) -> Result<Vec<IntentId>, StoreError> {
        let mut ids: Vec<IntentId> = self.intents.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
