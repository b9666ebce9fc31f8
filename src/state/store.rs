//! The target store: conversation key → target set.
//!
//! # Concurrency
//!
//! - `entries` is an `RwLock`ed map. Every write replaces or removes a whole
//!   set under the write guard, so readers never see a half-applied change
//!   and an emptied set is never visible (it is removed instead).
//! - `write_gate` serializes every mutation together with the save that
//!   follows it. Two handlers touching the same key cannot interleave their
//!   read-modify-write, and an older snapshot can never overwrite a newer
//!   one on disk.
//! - No lock is held while a handler talks to the transport: mutation and
//!   save complete before a reply is attempted.
//!
//! Saves are write-through. A failed save is logged, the store is marked
//! dirty and the in-memory state stays authoritative; the flush task (see
//! [`spawn_flush_task`]) retries until a save succeeds.

use super::key::{self, ConversationKey, TargetSet};
use super::persistence;
use crate::error::StoreError;
use parking_lot::RwLock;
use pingwire_proto::{GuildId, UserId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

/// Result of [`TargetStore::toggle_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub added: BTreeSet<UserId>,
    pub removed: BTreeSet<UserId>,
}

impl ToggleOutcome {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub struct TargetStore {
    entries: RwLock<HashMap<ConversationKey, TargetSet>>,
    write_gate: Mutex<()>,
    path: PathBuf,
    dirty: AtomicBool,
}

impl TargetStore {
    /// An empty store that saves to `path`.
    #[cfg(test)]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_entries(path.into(), HashMap::new())
    }

    /// Load the store from `path`. A missing file yields an empty store;
    /// an unreadable or corrupt one is an error.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = persistence::load(&path).await?;
        let store = Self::with_entries(path, entries);
        info!(
            path = %store.path.display(),
            keys = store.len(),
            "Loaded target list"
        );
        Ok(store)
    }

    fn with_entries(path: PathBuf, mut entries: HashMap<ConversationKey, TargetSet>) -> Self {
        entries.retain(|_, targets| !targets.is_empty());
        crate::metrics::set_store_keys(entries.len());
        Self {
            entries: RwLock::new(entries),
            write_gate: Mutex::new(()),
            path,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of keys with a non-empty target set.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether the last save failed and the file lags behind memory.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Targets for `key`; empty when the key is absent.
    pub fn get(&self, key: &ConversationKey) -> TargetSet {
        self.entries.read().get(key).cloned().unwrap_or_default()
    }

    /// Copy of the whole mapping, taken at one instant.
    #[cfg(test)]
    pub fn snapshot(&self) -> BTreeMap<ConversationKey, TargetSet> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    /// Every key scoped to `guild`.
    pub fn keys_for_guild(&self, guild: GuildId) -> BTreeSet<ConversationKey> {
        key::keys_for_guild(self.entries.read().iter(), guild)
    }

    /// Every key scoped to `guild` whose set contains `user`.
    pub fn keys_containing_identity(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> BTreeSet<ConversationKey> {
        key::keys_containing_identity(self.entries.read().iter(), guild, user)
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Flip membership of every identity in `identities` under `key`.
    ///
    /// Present identities are removed, absent ones added; `self_id` is never
    /// touched. The key is deleted if the resulting set is empty.
    pub async fn toggle_all(
        &self,
        key: ConversationKey,
        identities: &BTreeSet<UserId>,
        self_id: UserId,
    ) -> ToggleOutcome {
        let gate = self.write_gate.lock().await;

        let mut outcome = ToggleOutcome::default();
        {
            let mut entries = self.entries.write();
            let mut targets = entries.get(&key).cloned().unwrap_or_default();
            for &user in identities.iter().filter(|&&u| u != self_id) {
                if targets.remove(&user) {
                    outcome.removed.insert(user);
                } else {
                    targets.insert(user);
                    outcome.added.insert(user);
                }
            }
            if outcome.is_empty() {
                return outcome;
            }
            if targets.is_empty() {
                entries.remove(&key);
            } else {
                entries.insert(key, targets);
            }
        }

        crate::metrics::record_toggle(outcome.added.len(), outcome.removed.len());
        self.persist_locked(&gate).await;
        outcome
    }

    /// Delete `key`. Returns how many identities it held, or `None` if it
    /// was not present.
    pub async fn remove_key(&self, key: &ConversationKey) -> Option<usize> {
        let gate = self.write_gate.lock().await;
        let removed = self.entries.write().remove(key).map(|targets| targets.len());
        if removed.is_some() {
            self.persist_locked(&gate).await;
        }
        removed
    }

    /// Delete every key in `keys`, reporting how many identities each held.
    /// Absent keys are omitted from the result.
    #[cfg(test)]
    pub async fn remove_keys(
        &self,
        keys: &BTreeSet<ConversationKey>,
    ) -> BTreeMap<ConversationKey, usize> {
        let gate = self.write_gate.lock().await;
        let removed = self.remove_keys_locked(keys);
        if !removed.is_empty() {
            self.persist_locked(&gate).await;
        }
        removed
    }

    /// Remove `user` from each key in `keys`, deleting keys left empty.
    /// Maps each named key to whether `user` was removed from it.
    pub async fn remove_identity_from_keys(
        &self,
        user: UserId,
        keys: &BTreeSet<ConversationKey>,
    ) -> BTreeMap<ConversationKey, bool> {
        let gate = self.write_gate.lock().await;
        let result = self.remove_identity_locked(user, keys);
        if result.values().any(|&removed| removed) {
            self.persist_locked(&gate).await;
        }
        result
    }

    /// Delete every key scoped to `guild`, as one batch.
    pub async fn remove_guild(&self, guild: GuildId) -> BTreeMap<ConversationKey, usize> {
        let gate = self.write_gate.lock().await;
        let keys = self.keys_for_guild(guild);
        let removed = self.remove_keys_locked(&keys);
        if !removed.is_empty() {
            self.persist_locked(&gate).await;
        }
        removed
    }

    /// Remove `user` from every list in `guild` that contains them.
    /// Returns the keys that were changed.
    pub async fn remove_identity_from_guild(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> BTreeSet<ConversationKey> {
        let gate = self.write_gate.lock().await;
        let keys = self.keys_containing_identity(guild, user);
        let changed: BTreeSet<_> = self
            .remove_identity_locked(user, &keys)
            .into_iter()
            .filter_map(|(key, removed)| removed.then_some(key))
            .collect();
        if !changed.is_empty() {
            self.persist_locked(&gate).await;
        }
        changed
    }

    fn remove_keys_locked(
        &self,
        keys: &BTreeSet<ConversationKey>,
    ) -> BTreeMap<ConversationKey, usize> {
        let mut entries = self.entries.write();
        keys.iter()
            .filter_map(|key| entries.remove(key).map(|targets| (*key, targets.len())))
            .collect()
    }

    fn remove_identity_locked(
        &self,
        user: UserId,
        keys: &BTreeSet<ConversationKey>,
    ) -> BTreeMap<ConversationKey, bool> {
        let mut entries = self.entries.write();
        keys.iter()
            .map(|key| {
                let removed = match entries.get_mut(key) {
                    Some(targets) => targets.remove(&user),
                    None => false,
                };
                if entries.get(key).is_some_and(|t| t.is_empty()) {
                    entries.remove(key);
                }
                (*key, removed)
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Save now if a previous save failed. Returns whether the store is
    /// clean afterwards.
    pub async fn flush_if_dirty(&self) -> bool {
        let gate = self.write_gate.lock().await;
        if self.is_dirty() {
            self.persist_locked(&gate).await;
        }
        !self.is_dirty()
    }

    /// Write the full store to disk. The caller holds the write gate, so the
    /// snapshot is the latest committed state.
    async fn persist_locked(&self, _gate: &MutexGuard<'_, ()>) {
        let (contents, keys) = {
            let entries = self.entries.read();
            (persistence::encode(entries.iter()), entries.len())
        };
        crate::metrics::set_store_keys(keys);

        match persistence::write_atomic(&self.path, &contents).await {
            Ok(()) => {
                self.set_dirty(false);
                crate::metrics::record_store_save(None);
            }
            Err(e) => {
                self.set_dirty(true);
                crate::metrics::record_store_save(Some(&e));
                error!(error = %e, "Failed to persist target list; keeping in-memory state");
            }
        }
    }

    fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
        crate::metrics::set_store_dirty(dirty);
    }
}

/// Spawn the background task that retries failed saves.
pub fn spawn_flush_task(store: Arc<TargetStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;

        loop {
            interval.tick().await;
            if store.is_dirty() {
                let clean = store.flush_if_dirty().await;
                debug!(clean, "Retried target list save");
            }
        }
    });
}
