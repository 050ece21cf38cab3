use serde::Serialize;
use sqlx::FromRow;

/// A row of the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    /// Durable transcript, appended to by `HistoryLedger`.
    pub history: String,
    /// Written as empty at registration and never updated.
    pub last_question: String,
}
