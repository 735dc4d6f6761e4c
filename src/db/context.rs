//! Storage pool and the request-scoped data context.
//!
//! [`Storage`] owns the connection pool for whichever backend was selected at
//! startup and knows how to migrate it. A [`DataContext`] checks a single
//! connection out of that pool for the lifetime of one request; every
//! repository created from it runs on that connection. Dropping the context
//! returns the connection to the pool.

use std::time::Duration;

use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyPool};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::config::{StorageConfig, StorageDriver};
use crate::db::repository::SqlRepository;
use crate::db::{DbError, DbResult, Entity};

static SQLITE_MIGRATIONS: Migrator = sqlx::migrate!("migrations/sqlite");
static POSTGRES_MIGRATIONS: Migrator = sqlx::migrate!("migrations/postgres");

/// How long a request waits for a free connection before failing.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection pool for the selected backend.
#[derive(Clone, Debug)]
pub struct Storage {
    pool: AnyPool,
    driver: StorageDriver,
}

impl Storage {
    /// Open a pool according to the selected configuration.
    pub async fn connect(config: &StorageConfig) -> DbResult<Self> {
        install_default_drivers();

        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT);
        if config.is_in_memory() {
            // An in-memory database disappears with its last connection.
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options
            .connect(&config.connection_string)
            .await
            .map_err(|e| DbError::Connection {
                message: e.to_string(),
            })?;

        debug!(driver = %config.driver, "storage pool opened");
        Ok(Self {
            pool,
            driver: config.driver,
        })
    }

    /// Migrated in-memory SQLite storage (useful for testing).
    pub async fn in_memory() -> DbResult<Self> {
        let storage = Self::connect(&StorageConfig::in_memory()).await?;
        storage.migrate().await?;
        Ok(storage)
    }

    /// Run pending migrations for the active backend.
    pub async fn migrate(&self) -> DbResult<()> {
        let migrator = match self.driver {
            StorageDriver::Sqlite => &SQLITE_MIGRATIONS,
            StorageDriver::Postgres => &POSTGRES_MIGRATIONS,
        };
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration {
                message: e.to_string(),
            })
    }

    /// Open a data context for one unit of work (usually one request).
    pub async fn context(&self) -> DbResult<DataContext> {
        let conn = self.pool.acquire().await.map_err(|e| DbError::Connection {
            message: e.to_string(),
        })?;
        trace!("data context opened");
        Ok(DataContext {
            conn: Mutex::new(conn),
            driver: self.driver,
        })
    }

    pub fn driver(&self) -> StorageDriver {
        self.driver
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A single logical session against the storage backend.
///
/// Repositories borrow the context; they never own it. Changes made through a
/// repository are committed before the repository call returns.
pub struct DataContext {
    conn: Mutex<PoolConnection<Any>>,
    driver: StorageDriver,
}

impl DataContext {
    /// Typed repository for entity kind `T`.
    pub fn set<T: Entity>(&self) -> SqlRepository<'_, T> {
        SqlRepository::new(self)
    }

    pub fn driver(&self) -> StorageDriver {
        self.driver
    }

    /// Exclusive access to the context's connection for one operation.
    pub(crate) async fn connection(&self) -> MutexGuard<'_, PoolConnection<Any>> {
        self.conn.lock().await
    }
}

impl Drop for DataContext {
    fn drop(&mut self) {
        trace!("data context released");
    }
}
