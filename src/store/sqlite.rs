//! SQLite-backed license store (production).

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};

use super::{LicenseRecord, LicenseSource, LicenseStore};
use crate::error::Result;

pub type DbPool = Pool<SqliteConnectionManager>;

const LICENSE_COLS: &str =
    "key, email, uses, created_at, activated_at, payment_id, order_id, source";

pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (creating if needed) the license database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        // Wait out writer contention instead of surfacing SQLITE_BUSY
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.busy_timeout(std::time::Duration::from_secs(5)));
        let pool = Pool::builder().max_size(10).build(manager)?;
        {
            let conn = pool.get()?;
            init_schema(&conn)?;
        }
        Ok(Self { pool })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS licenses (
            key TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            uses INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            activated_at INTEGER,
            payment_id TEXT,
            order_id TEXT,
            source TEXT NOT NULL CHECK (source IN ('free', 'paid', 'admin'))
        );
        CREATE INDEX IF NOT EXISTS idx_licenses_email ON licenses(email, source);
        "#,
    )?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<LicenseRecord> {
    let source: String = row.get(7)?;
    let source = LicenseSource::parse(&source).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown license source: {}", source).into(),
        )
    })?;

    Ok(LicenseRecord {
        key: row.get(0)?,
        email: row.get(1)?,
        uses: row.get(2)?,
        created_at: row.get(3)?,
        activated_at: row.get(4)?,
        payment_id: row.get(5)?,
        order_id: row.get(6)?,
        source,
    })
}

impl LicenseStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<LicenseRecord>> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM licenses WHERE key = ?1", LICENSE_COLS),
            params![key],
            row_to_record,
        )
        .optional()
        .map_err(Into::into)
    }

    fn put(&self, record: &LicenseRecord) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR REPLACE INTO licenses
             (key, email, uses, created_at, activated_at, payment_id, order_id, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &record.key,
                &record.email,
                record.uses,
                record.created_at,
                record.activated_at,
                &record.payment_id,
                &record.order_id,
                record.source.as_str(),
            ],
        )?;
        Ok(())
    }

    fn key_for_email(&self, email: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT key FROM licenses WHERE email = ?1 AND source = 'free'
             ORDER BY created_at ASC LIMIT 1",
            params![email],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    fn record_use(&self, key: &str, now: i64) -> Result<Option<LicenseRecord>> {
        let conn = self.pool.get()?;
        // Single-statement increment-and-fetch: concurrent verifications of
        // the same key serialize here, so exactly one observes uses == 1.
        conn.query_row(
            &format!(
                "UPDATE licenses
                 SET uses = uses + 1, activated_at = COALESCE(activated_at, ?2)
                 WHERE key = ?1
                 RETURNING {}",
                LICENSE_COLS
            ),
            params![key, now],
            row_to_record,
        )
        .optional()
        .map_err(Into::into)
    }
}
