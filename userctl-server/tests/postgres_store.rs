//! PostgreSQL store tests
//!
//! Run with: DATABASE_URL=postgres://... cargo test -p userctl-server -- --ignored
//!
//! Each test uses emails under its own domain and cleans them up first, so
//! tests can share one database.

use std::collections::HashSet;

use sqlx::postgres::PgConnectOptions;
use userctl_server::db::{DbError, PgUserStore, PoolConfig, UserStore};
use userctl_server::models::{EmailAddress, NewUser, PersonName, UserChanges};

async fn store(domain: &str) -> PgUserStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let options: PgConnectOptions = url.parse().expect("invalid DATABASE_URL");
    let store = PgUserStore::connect(options, PoolConfig::default())
        .await
        .expect("store connect failed");

    sqlx::query("DELETE FROM users WHERE email LIKE $1")
        .bind(format!("%@{domain}"))
        .execute(store.pool())
        .await
        .expect("cleanup failed");
    store
}

fn user(first: &str, email: &str) -> NewUser {
    NewUser::new(first, "Tester", email).unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_assigns_unique_ids() {
    let store = store("ids.test").await;
    let mut ids = HashSet::new();
    for i in 0..5 {
        let created = store
            .create(user("Ada", &format!("u{i}@ids.test")))
            .await
            .unwrap();
        assert!(ids.insert(created.id));
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn duplicate_email_is_conflict() {
    let store = store("dup.test").await;
    store.create(user("Ada", "ada@dup.test")).await.unwrap();

    let err = store.create(user("Ada", "ada@dup.test")).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict { field: "email", .. }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn concurrent_duplicate_creates_admit_one() {
    let store = store("race.test").await;
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.create(user("Ada", "ada@race.test")).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(DbError::Conflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn update_applies_only_provided_fields() {
    let store = store("upd.test").await;
    let created = store.create(user("Ada", "ada@upd.test")).await.unwrap();

    let changes = UserChanges {
        email: Some(EmailAddress::new("countess@upd.test").unwrap()),
        ..Default::default()
    };
    let updated = store.update(created.id, changes).await.unwrap();
    assert_eq!(updated.email, "countess@upd.test");
    assert_eq!(updated.first_name, created.first_name);
    assert_eq!(updated.last_name, created.last_name);

    let unchanged = store.update(created.id, UserChanges::default()).await.unwrap();
    assert_eq!(unchanged, updated);
}

#[tokio::test]
#[ignore = "requires database"]
async fn conflicting_update_rolls_back() {
    let store = store("rb.test").await;
    store.create(user("Ada", "ada@rb.test")).await.unwrap();
    let grace = store.create(user("Grace", "grace@rb.test")).await.unwrap();

    let changes = UserChanges {
        first_name: Some(PersonName::new("first_name", "Amazing").unwrap()),
        email: Some(EmailAddress::new("ada@rb.test").unwrap()),
        ..Default::default()
    };
    let err = store.update(grace.id, changes).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict { .. }));
    assert_eq!(store.get(grace.id).await.unwrap(), grace);
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_then_get_is_not_found() {
    let store = store("del.test").await;
    let created = store.create(user("Ada", "ada@del.test")).await.unwrap();

    let snapshot = store.delete(created.id).await.unwrap();
    assert_eq!(snapshot, created);

    assert!(matches!(store.get(created.id).await, Err(DbError::NotFound { .. })));
    assert!(matches!(store.delete(created.id).await, Err(DbError::NotFound { .. })));
}

#[tokio::test]
#[ignore = "requires database"]
async fn list_contains_created_rows() {
    let store = store("list.test").await;
    let a = store.create(user("Ada", "a@list.test")).await.unwrap();
    let b = store.create(user("Bob", "b@list.test")).await.unwrap();

    let list = store.list().await.unwrap();
    assert_eq!(list.count, list.users.len());
    assert!(list.users.contains(&a));
    assert!(list.users.contains(&b));
}
