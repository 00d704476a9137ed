use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};
use crate::models::{Bill, Design, LedgerEntry};

pub const CATALOG_KEY: &str = "designs";
pub const ADMIN_FLAG_KEY: &str = "is_admin";
pub const CATALOG_VERSION: u32 = 1;

#[derive(Serialize)]
struct CatalogBlob<'a> {
    version: u32,
    designs: &'a [Design],
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: PathBuf) -> SqlResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![
            (
                "001_create_settings.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/001_create_settings.sql"
                )),
            ),
            (
                "002_create_bill_ledger.sql",
                include_str!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/migrations/002_create_bill_ledger.sql"
                )),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    pub fn set_setting(&self, key: &str, value: &str) -> SqlResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> SqlResult<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
        stmt.query_row(params![key], |row| row.get(0)).optional()
    }

    pub fn delete_setting(&self, key: &str) -> SqlResult<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Reads the catalog blob. Accepts the versioned envelope and the older
    /// bare array of designs.
    pub fn load_designs(&self) -> AppResult<Vec<Design>> {
        let raw = match self.get_setting(CATALOG_KEY)? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        let value: Value = serde_json::from_str(&raw)?;
        match value {
            Value::Array(_) => Ok(serde_json::from_value(value)?),
            Value::Object(mut envelope) => {
                let version = envelope.get("version").and_then(Value::as_u64).unwrap_or(0);
                if version == 0 || version > u64::from(CATALOG_VERSION) {
                    return Err(AppError::UnsupportedCatalogVersion(version));
                }
                let designs = envelope.remove("designs").unwrap_or(Value::Array(Vec::new()));
                Ok(serde_json::from_value(designs)?)
            }
            _ => Err(AppError::UnsupportedCatalogVersion(0)),
        }
    }

    pub fn save_designs(&self, designs: &[Design]) -> AppResult<()> {
        let blob = serde_json::to_string(&CatalogBlob {
            version: CATALOG_VERSION,
            designs,
        })?;
        self.set_setting(CATALOG_KEY, &blob)?;
        Ok(())
    }

    pub fn append_bill(&self, bill: &Bill, saved_at: &str) -> AppResult<()> {
        let payload = serde_json::to_string(bill)?;
        self.conn.execute(
            "INSERT INTO bill_ledger (bill_number, customer_name, bill_date, total, payload, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bill.bill_number(),
                bill.customer_name(),
                bill.date(),
                bill.total(),
                payload,
                saved_at
            ],
        )?;
        Ok(())
    }

    /// Highest `BILL-<millis>` number in the ledger.
    pub fn latest_bill_millis(&self) -> AppResult<Option<i64>> {
        let latest = self.conn.query_row(
            "SELECT MAX(CAST(SUBSTR(bill_number, 6) AS INTEGER)) FROM bill_ledger
             WHERE bill_number LIKE 'BILL-%'",
            [],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(latest)
    }

    pub fn get_ledger(&self) -> AppResult<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload, saved_at FROM bill_ledger ORDER BY saved_at ASC, rowid ASC",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<SqlResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(payload, saved_at)| {
                let mut bill: Bill = serde_json::from_str(&payload)?;
                bill.recompute();
                Ok(LedgerEntry { bill, saved_at })
            })
            .collect()
    }
}
