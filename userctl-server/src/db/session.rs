//! Scoped database sessions
//!
//! A `Session` is one pooled connection with an open transaction. Every
//! exit path releases the connection:
//! - `finish(Ok(..))` commits
//! - `finish(Err(..))` rolls back explicitly
//! - dropping an unfinished session (panic, cancelled request) rolls back
//!   and returns the connection to the pool

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::DbError;

/// Per-operation transaction scope
pub struct Session {
    tx: Transaction<'static, Postgres>,
}

impl Session {
    /// Acquire a connection and begin a transaction.
    ///
    /// Blocks while the pool is exhausted, up to its acquire timeout.
    pub async fn begin(pool: &PgPool) -> Result<Self, DbError> {
        let tx = pool.begin().await?;
        Ok(Self { tx })
    }

    /// Connection to run statements on.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }

    /// Close the session according to the operation outcome.
    ///
    /// A failed rollback is logged and the original error is returned.
    pub async fn finish<T>(self, outcome: Result<T, DbError>) -> Result<T, DbError> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn failed_outcome_rolls_back_writes() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = PgPool::connect(&url).await.expect("pool creation failed");
        crate::db::migrations::run(&pool).await.expect("schema init failed");

        let email = "rollback-probe@session.test";
        let mut session = Session::begin(&pool).await.expect("begin failed");
        sqlx::query("INSERT INTO users (first_name, last_name, email) VALUES ('Roll', 'Back', $1)")
            .bind(email)
            .execute(session.conn())
            .await
            .expect("insert failed");

        let outcome: Result<(), DbError> = Err(DbError::NotFound {
            resource: "probe",
            id: "1".into(),
        });
        assert!(session.finish(outcome).await.is_err());

        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&pool)
                .await
                .expect("query failed");
        assert!(!exists);
    }
}
