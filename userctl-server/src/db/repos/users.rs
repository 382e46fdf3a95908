//! User repository
//!
//! Runs inside a `Session`, so a create or update and its uniqueness
//! pre-check share one transaction. The unique index on `email` is the
//! final word: a concurrent writer that slips past the pre-check gets a
//! unique violation, reported as `DbError::Conflict`.

use sqlx::PgConnection;

use crate::db::{DbError, Session};
use crate::models::{EmailAddress, NewUser, PersonName, User, UserChanges, UserList};

const RESOURCE: &str = "user";

/// User repository bound to one session
pub struct UserRepo<'s> {
    conn: &'s mut PgConnection,
}

impl<'s> UserRepo<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            conn: session.conn(),
        }
    }

    /// List every user, ordered by id.
    pub async fn list(&mut self) -> Result<UserList, DbError> {
        let users: Vec<User> = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, email
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(UserList::from(users))
    }

    /// Get a single user by id.
    pub async fn get(&mut self, id: i64) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| not_found(id))
    }

    /// Whether a user other than `excluding` already owns `email`.
    pub async fn email_taken(
        &mut self,
        email: &EmailAddress,
        excluding: Option<i64>,
    ) -> Result<bool, DbError> {
        let (taken,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE email = $1
                AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email.as_str())
        .bind(excluding)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(taken)
    }

    /// Insert a user, returning the row with its generated id.
    pub async fn create(&mut self, new_user: &NewUser) -> Result<User, DbError> {
        if self.email_taken(&new_user.email, None).await? {
            return Err(conflict(&new_user.email));
        }

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (first_name, last_name, email)
            VALUES ($1, $2, $3)
            RETURNING id, first_name, last_name, email
            "#,
        )
        .bind(new_user.first_name.as_str())
        .bind(new_user.last_name.as_str())
        .bind(new_user.email.as_str())
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| DbError::from_write(e, RESOURCE, "email", new_user.email.as_str()))?;

        tracing::debug!(user_id = user.id, "user inserted");
        Ok(user)
    }

    /// Apply the provided fields to an existing user.
    ///
    /// The row is locked for the rest of the session. With no fields
    /// provided the current row is returned untouched.
    pub async fn update(&mut self, id: i64, changes: &UserChanges) -> Result<User, DbError> {
        let current: User = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, email
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| not_found(id))?;

        if changes.is_empty() {
            return Ok(current);
        }

        if let Some(email) = &changes.email {
            if email.as_str() != current.email && self.email_taken(email, Some(id)).await? {
                return Err(conflict(email));
            }
        }

        let email = changes.email.as_ref().map(EmailAddress::as_str);
        let user: User = sqlx::query_as(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email)
            WHERE id = $1
            RETURNING id, first_name, last_name, email
            "#,
        )
        .bind(id)
        .bind(changes.first_name.as_ref().map(PersonName::as_str))
        .bind(changes.last_name.as_ref().map(PersonName::as_str))
        .bind(email)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| DbError::from_write(e, RESOURCE, "email", email.unwrap_or_default()))?;

        tracing::debug!(user_id = id, "user updated");
        Ok(user)
    }

    /// Hard-delete a user, returning the row as it was.
    pub async fn delete(&mut self, id: i64) -> Result<User, DbError> {
        let snapshot: User = sqlx::query_as(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, first_name, last_name, email
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| not_found(id))?;

        tracing::debug!(user_id = id, "user deleted");
        Ok(snapshot)
    }
}

fn not_found(id: i64) -> DbError {
    DbError::NotFound {
        resource: RESOURCE,
        id: id.to_string(),
    }
}

fn conflict(email: &EmailAddress) -> DbError {
    DbError::Conflict {
        resource: RESOURCE,
        field: "email",
        value: email.as_str().to_owned(),
    }
}
