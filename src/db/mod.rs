pub mod history;
pub mod models;
pub mod users;

pub use history::HistoryLedger;
pub use models::User;
pub use users::CredentialStore;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::Config;
use crate::error::AppError;

/// Open the SQLite pool and run embedded migrations.
pub async fn connect(config: &Config) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Pool over a throwaway database file, removed when dropped.
#[cfg(test)]
pub(crate) struct TestDb {
    pool: SqlitePool,
    _dir: tempfile::TempDir,
}

#[cfg(test)]
impl std::ops::Deref for TestDb {
    type Target = SqlitePool;

    fn deref(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub(crate) async fn test_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("test.db").display()),
        db_max_connections: 4,
        db_min_connections: 0,
        ..Config::default()
    };
    let pool = connect(&config).await.unwrap();
    TestDb { pool, _dir: dir }
}
