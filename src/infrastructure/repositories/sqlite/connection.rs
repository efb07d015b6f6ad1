// bmk/src/infrastructure/repositories/sqlite/connection.rs

use std::fs;
use std::path::Path;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sqlite::SqliteConnection;
use diesel::{sql_query, Connection, RunQueryDsl};
use tracing::{debug, instrument};

use super::ddl;
use super::error::{SqliteRepositoryError, SqliteResult};

pub type ConnectionPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type PooledConnection = r2d2::PooledConnection<ConnectionManager<SqliteConnection>>;

const POOL_MAX_SIZE: u32 = 10;
const POOL_MIN_IDLE: u32 = 5;
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(3600);

/// Applies the session PRAGMAs to every connection handed out by the pool.
#[derive(Debug, Clone, Copy)]
struct SessionPragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SessionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(ddl::SESSION_PRAGMAS)
            .map_err(r2d2::Error::QueryError)
    }
}

/// Build the connection pool for a database path.
pub fn init_pool(database_path: &str) -> SqliteResult<ConnectionPool> {
    debug!("initializing connection pool for: {}", database_path);

    if let Some(parent) = Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(SqliteRepositoryError::IoError)?;
        }
    }

    let manager = ConnectionManager::<SqliteConnection>::new(database_path);
    let pool = r2d2::Pool::builder()
        .max_size(POOL_MAX_SIZE)
        .min_idle(Some(POOL_MIN_IDLE))
        .max_lifetime(Some(POOL_MAX_LIFETIME))
        .connection_customizer(Box::new(SessionPragmas))
        .build(manager)
        .map_err(|e| SqliteRepositoryError::ConnectionPoolError(e.to_string()))?;

    Ok(pool)
}

/// Open an existing database; the file must already be there.
pub fn open_pool(database_path: &str) -> SqliteResult<ConnectionPool> {
    if !Path::new(database_path).exists() {
        return Err(SqliteRepositoryError::DatabaseNotFound(
            database_path.to_string(),
        ));
    }
    init_pool(database_path)
}

/// Create a fresh database with the full schema; the file must not exist.
/// Tables, indexes and triggers are created inside one transaction.
pub fn create_pool(database_path: &str) -> SqliteResult<ConnectionPool> {
    if Path::new(database_path).exists() {
        return Err(SqliteRepositoryError::DatabaseExists(
            database_path.to_string(),
        ));
    }

    let pool = init_pool(database_path)?;

    let mut conn = pool
        .get()
        .map_err(|e| SqliteRepositoryError::ConnectionPoolError(e.to_string()))?;
    conn.immediate_transaction::<_, SqliteRepositoryError, _>(|conn| {
        for statement in ddl::full_schema() {
            conn.batch_execute(&statement)?;
        }
        Ok(())
    })?;

    debug!("created schema at: {}", database_path);
    Ok(pool)
}

#[derive(diesel::QueryableByName)]
struct IntegrityCheckRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    integrity_check: String,
}

/// Run `PRAGMA integrity_check` on a freshly opened handle; anything but the
/// single row `"ok"` means the file is corrupted.
#[instrument(level = "debug")]
pub fn check_integrity(database_path: &str) -> SqliteResult<()> {
    if !Path::new(database_path).exists() {
        return Err(SqliteRepositoryError::DatabaseNotFound(
            database_path.to_string(),
        ));
    }

    let mut conn = SqliteConnection::establish(database_path)?;
    // A file SQLite refuses to read at all is corruption evidence too.
    let rows: Vec<IntegrityCheckRow> = sql_query("PRAGMA integrity_check")
        .load(&mut conn)
        .map_err(|e| {
            SqliteRepositoryError::Corrupted(format!("{}: {}", database_path, e))
        })?;

    match rows.as_slice() {
        [row] if row.integrity_check == "ok" => Ok(()),
        rows => {
            let detail = rows
                .iter()
                .map(|r| r.integrity_check.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            Err(SqliteRepositoryError::Corrupted(format!(
                "{}: {}",
                database_path, detail
            )))
        }
    }
}
