use sqlx::{Pool, Sqlite};

use crate::error::AppError;

/// Append-only transcript stored in `users.history`.
pub struct HistoryLedger;

impl HistoryLedger {
    /// Concatenate `entry` onto the user's stored history.
    ///
    /// A single UPDATE, so each append is atomic on its own; concurrent appends
    /// for one email are ordered by the database only. Unknown emails are a
    /// no-op.
    pub async fn append_history(
        pool: &Pool<Sqlite>,
        email: &str,
        entry: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET history = history || ? WHERE email = ?")
            .bind(entry)
            .bind(email)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(email, "No user row for history append");
        }

        Ok(())
    }

    pub async fn history(pool: &Pool<Sqlite>, email: &str) -> Result<Option<String>, AppError> {
        let history = sqlx::query_scalar::<_, String>("SELECT history FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(history)
    }

    /// The entry written for one exchange.
    pub fn format_entry(question: &str, reply: &str) -> String {
        format!("User: {}\nBot: {}\n", question, reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_db, CredentialStore};

    #[tokio::test]
    async fn appends_concatenate_in_call_order() {
        let pool = test_db().await;
        CredentialStore::register(&pool, "a@example.com", "pw")
            .await
            .unwrap();

        let entries = ["one\n", "two\n", "three"];
        for entry in entries {
            HistoryLedger::append_history(&pool, "a@example.com", entry)
                .await
                .unwrap();
        }

        let stored = HistoryLedger::history(&pool, "a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, entries.concat());
    }

    #[tokio::test]
    async fn append_for_unknown_email_is_noop() {
        let pool = test_db().await;
        HistoryLedger::append_history(&pool, "ghost@example.com", "x")
            .await
            .unwrap();
        assert!(HistoryLedger::history(&pool, "ghost@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn entry_format() {
        assert_eq!(
            HistoryLedger::format_entry("hi", "Hi there!"),
            "User: hi\nBot: Hi there!\n"
        );
    }
}
