//! In-process user store
//!
//! Same contract as `PgUserStore`, held in a `BTreeMap` behind one async
//! mutex. The uniqueness check and the write happen under the same lock,
//! so concurrent creates cannot both claim an email. Used by
//! `serve --in-memory` and the HTTP tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{DbError, UserStore};
use crate::models::{EmailAddress, NewUser, User, UserChanges, UserList};

#[derive(Debug)]
struct MemoryState {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

impl MemoryState {
    fn email_taken(&self, email: &EmailAddress, excluding: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|u| u.email == email.as_str() && Some(u.id) != excluding)
    }
}

/// Volatile store; contents are lost when dropped
#[derive(Debug)]
pub struct MemoryUserStore {
    state: Mutex<MemoryState>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<UserList, DbError> {
        let state = self.state.lock().await;
        Ok(UserList::from(state.rows.values().cloned().collect::<Vec<_>>()))
    }

    async fn get(&self, id: i64) -> Result<User, DbError> {
        let state = self.state.lock().await;
        state.rows.get(&id).cloned().ok_or_else(|| not_found(id))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, DbError> {
        let mut state = self.state.lock().await;
        if state.email_taken(&new_user.email, None) {
            return Err(conflict(&new_user.email));
        }

        let id = state.next_id;
        state.next_id += 1;

        let user = User {
            id,
            first_name: new_user.first_name.into_string(),
            last_name: new_user.last_name.into_string(),
            email: new_user.email.into_string(),
        };
        state.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, DbError> {
        let mut state = self.state.lock().await;
        if !state.rows.contains_key(&id) {
            return Err(not_found(id));
        }

        if let Some(email) = &changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(conflict(email));
            }
        }

        let user = state.rows.get_mut(&id).ok_or_else(|| not_found(id))?;
        user.apply(&changes);
        Ok(user.clone())
    }

    async fn delete(&self, id: i64) -> Result<User, DbError> {
        let mut state = self.state.lock().await;
        state.rows.remove(&id).ok_or_else(|| not_found(id))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}

fn not_found(id: i64) -> DbError {
    DbError::NotFound {
        resource: "user",
        id: id.to_string(),
    }
}

fn conflict(email: &EmailAddress) -> DbError {
    DbError::Conflict {
        resource: "user",
        field: "email",
        value: email.as_str().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::models::PersonName;

    fn ada() -> NewUser {
        NewUser::new("Ada", "Lovelace", "ada@x.com").unwrap()
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let store = MemoryUserStore::new();
        let mut seen = HashSet::new();
        for i in 0..5 {
            let user = store
                .create(NewUser::new("Test", "User", &format!("user{i}@x.com")).unwrap())
                .await
                .unwrap();
            assert!(seen.insert(user.id), "id {} reused", user.id);
        }
        assert_eq!(store.list().await.unwrap().count, 5);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryUserStore::new();
        let first = store.create(ada()).await.unwrap();
        store.delete(first.id).await.unwrap();

        let second = store.create(ada()).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryUserStore::new();
        store.create(ada()).await.unwrap();

        let err = store.create(ada()).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { field: "email", .. }));
        assert_eq!(store.list().await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_email_admit_one() {
        let store = Arc::new(MemoryUserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create(ada()).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn update_email_keeps_names() {
        let store = MemoryUserStore::new();
        let user = store.create(ada()).await.unwrap();

        let changes = UserChanges {
            email: Some(EmailAddress::new("countess@x.com").unwrap()),
            ..Default::default()
        };
        let updated = store.update(user.id, changes).await.unwrap();

        assert_eq!(updated.email, "countess@x.com");
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Lovelace");
    }

    #[tokio::test]
    async fn empty_update_is_noop() {
        let store = MemoryUserStore::new();
        let user = store.create(ada()).await.unwrap();

        let updated = store.update(user.id, UserChanges::default()).await.unwrap();
        assert_eq!(updated, user);
    }

    #[tokio::test]
    async fn update_to_own_email_is_not_conflict() {
        let store = MemoryUserStore::new();
        let user = store.create(ada()).await.unwrap();

        let changes = UserChanges {
            first_name: Some(PersonName::new("first_name", "Augusta").unwrap()),
            email: Some(EmailAddress::new("ada@x.com").unwrap()),
            ..Default::default()
        };
        let updated = store.update(user.id, changes).await.unwrap();
        assert_eq!(updated.first_name, "Augusta");
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts_and_leaves_row() {
        let store = MemoryUserStore::new();
        store.create(ada()).await.unwrap();
        let grace = store
            .create(NewUser::new("Grace", "Hopper", "grace@x.com").unwrap())
            .await
            .unwrap();

        let changes = UserChanges {
            last_name: Some(PersonName::new("last_name", "Murray").unwrap()),
            email: Some(EmailAddress::new("ada@x.com").unwrap()),
            ..Default::default()
        };
        let err = store.update(grace.id, changes).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert_eq!(store.get(grace.id).await.unwrap(), grace);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found_even_with_taken_email() {
        let store = MemoryUserStore::new();
        store.create(ada()).await.unwrap();

        let changes = UserChanges {
            email: Some(EmailAddress::new("ada@x.com").unwrap()),
            ..Default::default()
        };
        let err = store.update(99, changes).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_returns_snapshot_then_not_found() {
        let store = MemoryUserStore::new();
        let user = store.create(ada()).await.unwrap();

        let snapshot = store.delete(user.id).await.unwrap();
        assert_eq!(snapshot, user);

        assert!(matches!(store.get(user.id).await, Err(DbError::NotFound { .. })));
        assert!(matches!(store.delete(user.id).await, Err(DbError::NotFound { .. })));
    }
}
