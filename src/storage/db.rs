use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// Handle to the watermark database. Cheap to clone; wraps a pool.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    pub async fn open(path: &str) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path);
        // An in-memory database exists per connection, so the pool must not
        // open a second one behind the migration's back.
        let max_connections = if path == ":memory:" { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        // Values are fixed-width RFC 3339 UTC strings with microsecond
        // precision, so SQLite string comparison orders them chronologically.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watermarks (
                feed_key TEXT PRIMARY KEY,
                last_published TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
