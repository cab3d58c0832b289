use async_trait::async_trait;
use burrow_core::repository::Result;
use burrow_core::{RecordId, ShortCode, StorageError, UrlRecord, UrlRepository};
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::trace;

/// MySQL implementation of the repository contract.
///
/// Records live in `url_records` (see `ddl/mysql/url_records.sql`). The
/// `UNIQUE` index on `code` is the authority on code uniqueness; expired rows
/// keep their code until a purge job deletes them. Timestamps are stored as
/// epoch milliseconds.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Deletes rows that expired at or before `now`.
    pub async fn purge_expired(&self, now: Timestamp) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM url_records
            WHERE expires_at IS NOT NULL
              AND expires_at <= ?
            "#,
        )
        .bind(now.as_millisecond())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn insert(&self, mut record: UrlRecord) -> Result<UrlRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO url_records (code, long_url, created_at, expires_at, hit_count)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.code.as_str())
        .bind(record.long_url.as_str())
        .bind(record.created_at.as_millisecond())
        .bind(record.expires_at.map(|ts| ts.as_millisecond()))
        .bind(record.hit_count)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                record.id = Some(RecordId::new(done.last_insert_id()));
                trace!(code = %record.code, "inserted record");
                Ok(record)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update(&self, id: RecordId, record: UrlRecord) -> Result<UrlRecord> {
        let result = sqlx::query(
            r#"
            UPDATE url_records
            SET long_url = ?, expires_at = ?, hit_count = ?
            WHERE id = ?
              AND code = ?
            "#,
        )
        .bind(record.long_url.as_str())
        .bind(record.expires_at.map(|ts| ts.as_millisecond()))
        .bind(record.hit_count)
        .bind(id.get())
        .bind(record.code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        // MySQL reports zero affected rows for a no-op update, so only a
        // missing row is an error.
        if result.rows_affected() == 0 && !self.exists_by_id(id, &record.code).await? {
            return Err(StorageError::NotFound(format!("record {id}")));
        }

        Ok(record)
    }

    async fn exists_by_id(&self, id: RecordId, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM url_records WHERE id = ? AND code = ? LIMIT 1")
            .bind(id.get())
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }
}

fn parse_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn parse_record(row: MySqlRow) -> Result<UrlRecord> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let code: String = row.try_get("code").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let hit_count: u64 = row.try_get("hit_count").map_err(map_sqlx_error)?;

    Ok(UrlRecord {
        id: Some(RecordId::new(id)),
        code: ShortCode::new_unchecked(code),
        long_url,
        created_at: parse_timestamp("created_at", created_at)?,
        expires_at: expires_at
            .map(|millis| parse_timestamp("expires_at", millis))
            .transpose()?,
        hit_count,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();
    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl UrlRepository for MySqlRepository {
    async fn exists_by_code(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM url_records
            WHERE code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, long_url, created_at, expires_at, hit_count
            FROM url_records
            WHERE code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(parse_record).transpose()
    }

    async fn save(&self, record: UrlRecord) -> Result<UrlRecord> {
        match record.id {
            None => self.insert(record).await,
            Some(id) => self.update(id, record).await,
        }
    }
}
