use sqlx::{Pool, Sqlite};

use crate::crypto::{hash_password, verify_password};
use crate::db::models::User;
use crate::error::AppError;

pub struct CredentialStore;

impl CredentialStore {
    /// Create a user with a freshly hashed password and empty history.
    ///
    /// Fails with `AppError::Conflict` if the email is taken; the existing row
    /// is left untouched.
    pub async fn register(
        pool: &Pool<Sqlite>,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        if Self::find_by_email(pool, email).await?.is_some() {
            return Err(already_exists());
        }

        let password_hash = hash_password(password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (email, password, history, last_question)
VALUES (?, ?, '', '')
RETURNING *
            "#,
        )
        .bind(email)
        .bind(&password_hash)
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration.
            sqlx::Error::Database(ref db) if db.is_unique_violation() => already_exists(),
            other => AppError::Database(other),
        })?;

        Ok(user)
    }

    /// Check an email/password pair against the stored hash.
    pub async fn verify_credentials(
        pool: &Pool<Sqlite>,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let user = Self::find_by_email(pool, email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    pub async fn find_by_email(
        pool: &Pool<Sqlite>,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }
}

fn already_exists() -> AppError {
    AppError::Conflict("User already exists".to_string())
}

fn invalid_credentials() -> AppError {
    AppError::Auth("Invalid credentials".to_string())
}
