use super::{DatabaseInfo, SchemaExecutor};
use crate::sqlite_persistence::{DdlDialect, SqliteDialect, Table};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// [`SchemaExecutor`] over a SQLite database file.
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    info: DatabaseInfo,
    show_errors: AtomicBool,
}

impl SqliteDatabase {
    /// Open `db_path` for provisioning.
    ///
    /// A read-only handle behaves like a database user without CREATE
    /// privileges: existence checks work, DDL fails.
    pub fn open<P: AsRef<Path>>(db_path: P, info: DatabaseInfo, read_only: bool) -> Result<Self> {
        let path = db_path.as_ref();
        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        info!(
            "Opening database {:?} for provisioning{}",
            path,
            if read_only { " (read-only)" } else { "" }
        );
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("Failed to open database {:?}", path))?;
        Ok(Self::from_connection(conn, info))
    }

    pub fn from_connection(conn: Connection, info: DatabaseInfo) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            info,
            show_errors: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Database connection lock poisoned"))
    }
}

impl SchemaExecutor for SqliteDatabase {
    fn info(&self) -> DatabaseInfo {
        self.info.clone()
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map(params![], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn create_table(&self, table_name: &str, table: &Table) -> Result<()> {
        let create_sql = SqliteDialect.create_table_sql(table_name, table);
        debug!("Executing: {}", create_sql);

        let conn = self.lock()?;
        if let Err(e) = conn.execute(&create_sql, params![]) {
            if self.show_errors.load(Ordering::SeqCst) {
                error!("Database error creating table {}: {}", table_name, e);
            }
            return Err(anyhow::Error::from(e).context(format!("Failed to create table {}", table_name)));
        }
        Ok(())
    }

    fn set_show_errors(&self, show: bool) -> bool {
        self.show_errors.swap(show, Ordering::SeqCst)
    }
}
