//! Schema initialization for the users table
//!
//! Idempotent, runs at startup before the server binds.

use sqlx::PgPool;

use super::DbError;

/// Name of the unique index guarding `users.email`
pub const EMAIL_UNIQUE_INDEX: &str = "users_email_unique";

/// Create the users table and its indexes if missing
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Initializing users schema...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Unique violations on this index surface as SQLSTATE 23505
    sqlx::query(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON users (email)",
        EMAIL_UNIQUE_INDEX
    ))
    .execute(pool)
    .await?;

    tracing::info!("Users schema ready");
    Ok(())
}
