use crate::core::error::StoreError;
use crate::models::activation::EmailActivation;
use crate::stores::user_store::UserStore;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Placeholder owner for a key reserved before its record has an id
const RESERVED: u64 = 0;

/// In-memory activation records with a unique key index
pub struct ActivationStore {
    records: DashMap<u64, Arc<EmailActivation>>,
    by_key: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl ActivationStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_key: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Claim `key` if no other record holds it.
    /// The claim becomes permanent once a record carrying the key is stored.
    pub fn reserve_key(&self, key: &str) -> bool {
        match self.by_key.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(RESERVED);
                true
            }
        }
    }

    /// Drop a reservation that never made it into a record
    pub fn release_key(&self, key: &str) {
        self.by_key.remove_if(key, |_, owner| *owner == RESERVED);
    }

    /// Store a new record, assigning its id
    pub fn insert(&self, mut record: EmailActivation) -> Arc<EmailActivation> {
        record.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Some(key) = &record.key {
            self.by_key.insert(key.clone(), record.id);
        }

        let record = Arc::new(record);
        self.records.insert(record.id, Arc::clone(&record));
        record
    }

    /// Put a record back under its existing id (WAL replay)
    pub fn restore(&self, record: EmailActivation) {
        self.next_id.fetch_max(record.id + 1, Ordering::SeqCst);
        if let Some(previous) = self.get(record.id) {
            if let Some(key) = &previous.key {
                self.by_key.remove_if(key, |_, owner| *owner == record.id);
            }
        }
        if let Some(key) = &record.key {
            self.by_key.insert(key.clone(), record.id);
        }
        self.records.insert(record.id, Arc::new(record));
    }

    /// Replace an existing record, moving its key index entry if the key changed
    pub fn update(&self, record: EmailActivation) -> Result<Arc<EmailActivation>, StoreError> {
        let previous = self
            .get(record.id)
            .ok_or(StoreError::ActivationNotFound(record.id))?;

        if previous.key != record.key {
            if let Some(old) = &previous.key {
                self.by_key.remove_if(old, |_, owner| *owner == record.id);
            }
            if let Some(new) = &record.key {
                self.by_key.insert(new.clone(), record.id);
            }
        }

        let record = Arc::new(record);
        self.records.insert(record.id, Arc::clone(&record));
        Ok(record)
    }

    pub fn get(&self, id: u64) -> Option<Arc<EmailActivation>> {
        self.records.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn find_by_key(&self, key: &str) -> Option<Arc<EmailActivation>> {
        let id = *self.by_key.get(key)?;
        if id == RESERVED {
            return None;
        }
        self.get(id)
    }

    pub fn key_exists(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Open records created inside `(now - activation_days, now]`
    pub fn confirmable(&self, now: DateTime<Utc>, activation_days: u32) -> Vec<Arc<EmailActivation>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|entry| entry.value().is_confirmable(now, activation_days))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }

    /// The confirmable filter narrowed to a single record
    pub fn is_confirmable(&self, id: u64, now: DateTime<Utc>, activation_days: u32) -> bool {
        self.records
            .get(&id)
            .map(|entry| entry.value().is_confirmable(now, activation_days))
            .unwrap_or(false)
    }

    /// Unactivated records addressed to `email`, either directly or
    /// through the owning user's current email
    pub fn email_exists(&self, email: &str, users: &UserStore) -> Vec<Arc<EmailActivation>> {
        let owner_id = users.get_by_email(email).map(|user| user.id);

        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                !record.activated && (record.email == email || Some(record.user_id) == owner_id)
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }

    pub fn for_user(&self, user_id: u64) -> Vec<Arc<EmailActivation>> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }

    /// Delete one record and free its key
    pub fn remove_record(&self, id: u64) -> Option<Arc<EmailActivation>> {
        let (_, record) = self.records.remove(&id)?;
        if let Some(key) = &record.key {
            self.by_key.remove_if(key, |_, owner| *owner == id);
        }
        Some(record)
    }

    /// Delete every record owned by `user_id`, returning how many were removed
    pub fn remove_for_user(&self, user_id: u64) -> usize {
        self.for_user(user_id)
            .iter()
            .filter_map(|record| self.remove_record(record.id))
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ActivationStore {
    fn default() -> Self {
        Self::new()
    }
}
