use crate::core::error::StoreError;
use crate::models::user::User;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory user table with unique email and company name indexes
pub struct UserStore {
    users: DashMap<u64, Arc<User>>,
    by_email: DashMap<String, u64>,
    by_company: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_email: DashMap::new(),
            by_company: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a new user, assigning its id.
    /// Fails without side effects if the email or company name is taken.
    pub fn insert(&self, mut user: User) -> Result<Arc<User>, StoreError> {
        user.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.claim_unique(&user)?;

        let user = Arc::new(user);
        self.users.insert(user.id, Arc::clone(&user));
        Ok(user)
    }

    /// Put a user back under its existing id (WAL replay).
    /// Indexes are rewritten unconditionally.
    pub fn restore(&self, user: User) {
        if let Some(previous) = self.users.get(&user.id).map(|e| Arc::clone(e.value())) {
            self.release_unique(&previous);
        }
        self.next_id.fetch_max(user.id + 1, Ordering::SeqCst);
        self.by_email.insert(user.email.clone(), user.id);
        self.by_company.insert(user.company_name.clone(), user.id);
        self.users.insert(user.id, Arc::new(user));
    }

    /// Replace an existing user. Re-checks the unique indexes when the
    /// email or company name changes.
    pub fn update(&self, user: User) -> Result<Arc<User>, StoreError> {
        let previous = self
            .get(user.id)
            .ok_or(StoreError::UserNotFound(user.id))?;

        if previous.email != user.email {
            claim(&self.by_email, &user.email, user.id)
                .map_err(|_| StoreError::EmailTaken(user.email.clone()))?;
        }
        if previous.company_name != user.company_name {
            if let Err(()) = claim(&self.by_company, &user.company_name, user.id) {
                if previous.email != user.email {
                    self.by_email.remove(&user.email);
                }
                return Err(StoreError::CompanyNameTaken(user.company_name.clone()));
            }
        }
        if previous.email != user.email {
            self.by_email.remove(&previous.email);
        }
        if previous.company_name != user.company_name {
            self.by_company.remove(&previous.company_name);
        }

        let user = Arc::new(user);
        self.users.insert(user.id, Arc::clone(&user));
        Ok(user)
    }

    /// Remove a user and release its unique keys
    pub fn remove(&self, id: u64) -> Option<Arc<User>> {
        let (_, user) = self.users.remove(&id)?;
        self.release_unique(&user);
        Some(user)
    }

    pub fn get(&self, id: u64) -> Option<Arc<User>> {
        self.users.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_by_email(&self, email: &str) -> Option<Arc<User>> {
        let id = *self.by_email.get(email)?;
        self.get(id)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn claim_unique(&self, user: &User) -> Result<(), StoreError> {
        claim(&self.by_email, &user.email, user.id)
            .map_err(|_| StoreError::EmailTaken(user.email.clone()))?;

        if claim(&self.by_company, &user.company_name, user.id).is_err() {
            self.by_email.remove(&user.email);
            return Err(StoreError::CompanyNameTaken(user.company_name.clone()));
        }
        Ok(())
    }

    fn release_unique(&self, user: &User) {
        self.by_email.remove_if(&user.email, |_, id| *id == user.id);
        self.by_company.remove_if(&user.company_name, |_, id| *id == user.id);
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn claim(index: &DashMap<String, u64>, value: &str, id: u64) -> Result<(), ()> {
    match index.entry(value.to_string()) {
        Entry::Occupied(_) => Err(()),
        Entry::Vacant(slot) => {
            slot.insert(id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Utc;

    fn new_user(email: &str, company: &str) -> User {
        User {
            id: 0,
            email: email.to_string(),
            company_name: company.to_string(),
            password_hash: "hash".to_string(),
            active: false,
            role: Role::Client,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_insert_assigns_ids() {
        let store = UserStore::new();
        let a = store.insert(new_user("a@x.com", "Acme")).unwrap();
        let b = store.insert(new_user("b@x.com", "Bolt")).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_by_email("b@x.com").unwrap().id, b.id);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = UserStore::new();
        store.insert(new_user("a@x.com", "Acme")).unwrap();

        let err = store.insert(new_user("a@x.com", "Other")).unwrap_err();
        assert_eq!(err, StoreError::EmailTaken("a@x.com".to_string()));
        assert_eq!(store.len(), 1);
        // the rejected company name stays available
        assert!(store.insert(new_user("c@x.com", "Other")).is_ok());
    }

    #[test]
    fn test_duplicate_company_rejected_without_leaking_email() {
        let store = UserStore::new();
        store.insert(new_user("a@x.com", "Acme")).unwrap();

        let err = store.insert(new_user("b@x.com", "Acme")).unwrap_err();
        assert_eq!(err, StoreError::CompanyNameTaken("Acme".to_string()));
        assert!(store.get_by_email("b@x.com").is_none());
        assert!(store.insert(new_user("b@x.com", "Bolt")).is_ok());
    }

    #[test]
    fn test_update_company_name() {
        let store = UserStore::new();
        let a = store.insert(new_user("a@x.com", "Acme")).unwrap();
        store.insert(new_user("b@x.com", "Bolt")).unwrap();

        let mut renamed = (*a).clone();
        renamed.company_name = "Bolt".to_string();
        assert_eq!(
            store.update(renamed.clone()).unwrap_err(),
            StoreError::CompanyNameTaken("Bolt".to_string())
        );

        renamed.company_name = "Acme Ltd".to_string();
        store.update(renamed).unwrap();
        assert_eq!(store.get(a.id).unwrap().company_name, "Acme Ltd");
        // old name is free again
        assert!(store.insert(new_user("c@x.com", "Acme")).is_ok());
    }

    #[test]
    fn test_update_missing_user() {
        let store = UserStore::new();
        let mut user = new_user("a@x.com", "Acme");
        user.id = 42;
        assert_eq!(store.update(user).unwrap_err(), StoreError::UserNotFound(42));
    }

    #[test]
    fn test_remove_releases_unique_keys() {
        let store = UserStore::new();
        let a = store.insert(new_user("a@x.com", "Acme")).unwrap();

        assert!(store.remove(a.id).is_some());
        assert!(store.is_empty());
        assert!(store.insert(new_user("a@x.com", "Acme")).is_ok());
    }

    #[test]
    fn test_restore_keeps_id_and_advances_counter() {
        let store = UserStore::new();
        let mut user = new_user("a@x.com", "Acme");
        user.id = 10;
        store.restore(user);

        let next = store.insert(new_user("b@x.com", "Bolt")).unwrap();
        assert_eq!(next.id, 11);
        assert_eq!(store.get_by_email("a@x.com").unwrap().id, 10);
    }
}
