//! User store handle injected into the HTTP layer
//!
//! `PgUserStore` opens one `Session` per operation and finishes it with the
//! operation's outcome. `MemoryUserStore` (see `memory`) gives the same
//! contract without a database.

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::PgPool;

use super::{create_pool_with_config, migrations, DbError, PoolConfig, Session, UserRepo};
use crate::models::{NewUser, User, UserChanges, UserList};

/// CRUD operations over users
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> Result<UserList, DbError>;

    async fn get(&self, id: i64) -> Result<User, DbError>;

    /// Fails with `Conflict` when the email is already in use.
    async fn create(&self, new_user: NewUser) -> Result<User, DbError>;

    /// Fails with `NotFound` for an unknown id, `Conflict` when a provided
    /// email belongs to another user.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, DbError>;

    /// Returns the row as it was before deletion.
    async fn delete(&self, id: i64) -> Result<User, DbError>;

    /// Cheap liveness probe of the backing store.
    async fn ping(&self) -> Result<(), DbError>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool and initialize the users schema.
    pub async fn connect(options: PgConnectOptions, config: PoolConfig) -> Result<Self, DbError> {
        let pool = create_pool_with_config(options, config).await?;
        migrations::run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> Result<UserList, DbError> {
        let mut session = Session::begin(&self.pool).await?;
        let outcome = UserRepo::new(&mut session).list().await;
        session.finish(outcome).await
    }

    async fn get(&self, id: i64) -> Result<User, DbError> {
        let mut session = Session::begin(&self.pool).await?;
        let outcome = UserRepo::new(&mut session).get(id).await;
        session.finish(outcome).await
    }

    async fn create(&self, new_user: NewUser) -> Result<User, DbError> {
        let mut session = Session::begin(&self.pool).await?;
        let outcome = UserRepo::new(&mut session).create(&new_user).await;
        session.finish(outcome).await
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<User, DbError> {
        let mut session = Session::begin(&self.pool).await?;
        let outcome = UserRepo::new(&mut session).update(id, &changes).await;
        session.finish(outcome).await
    }

    async fn delete(&self, id: i64) -> Result<User, DbError> {
        let mut session = Session::begin(&self.pool).await?;
        let outcome = UserRepo::new(&mut session).delete(id).await;
        session.finish(outcome).await
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
