use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};

use super::Database;

/// Derives the storage key for a feed URL.
///
/// URL-safe percent encoding keeps the key deterministic and collision-free
/// without normalizing case or trailing slashes; lookups use the exact URL
/// string from the config, so both sides always agree.
pub fn watermark_key(url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    format!("rss_last_pub_date:{}", encoded)
}

impl Database {
    /// Read a feed's watermark. `None` means the feed has never had a
    /// successful delivery (first-run semantics apply).
    pub async fn get_watermark(&self, feed_key: &str) -> Result<Option<DateTime<Utc>>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT last_published FROM watermarks WHERE feed_key = ?")
                .bind(feed_key)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((value,)) => {
                let parsed = DateTime::parse_from_rfc3339(&value)?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }

    /// Compare-and-advance a feed's watermark.
    ///
    /// Writes only when the new value is not older than the stored one, so
    /// overlapping runs converge on the newest timestamp regardless of call
    /// order. Returns whether the stored value changed.
    pub async fn advance_watermark(
        &self,
        feed_key: &str,
        published: DateTime<Utc>,
    ) -> Result<bool> {
        // Microsecond precision, fixed width: truncating to whole seconds
        // would store a value older than the delivered item, leaving it
        // "strictly newer" than its own watermark on every later run.
        let value = published
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = sqlx::query(
            r#"
            INSERT INTO watermarks (feed_key, last_published)
            VALUES (?, ?)
            ON CONFLICT(feed_key) DO UPDATE SET
                last_published = excluded.last_published
            WHERE excluded.last_published >= watermarks.last_published
        "#,
        )
        .bind(feed_key)
        .bind(&value)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
