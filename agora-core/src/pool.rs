use crate::{Connection, Error, Result, driver_name};
use std::{
    collections::VecDeque,
    fmt,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds of a connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of connections open at the same time.
    pub max_connections: usize,
    /// How long `acquire` waits for a free connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 8,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

struct PoolInner<C> {
    url: String,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<C>>,
}

/// Bounded pool of lazily opened connections.
///
/// Cloning is cheap, clones share the same connections.
pub struct Pool<C: Connection> {
    inner: Arc<PoolInner<C>>,
}

impl<C: Connection> Clone for Pool<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Connection> fmt::Debug for Pool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("driver", &driver_name::<C>())
            .field("config", &self.inner.config)
            .field("available", &self.inner.permits.available_permits())
            .finish()
    }
}

impl<C: Connection> Pool<C> {
    /// Create the pool, no connection is opened until the first `acquire`.
    pub fn new(url: impl Into<String>, config: PoolConfig) -> Result<Self> {
        if config.max_connections == 0 {
            return Err(Error::query(
                "The connection pool needs at least one connection",
            ));
        }
        Ok(Self {
            inner: Arc::new(PoolInner {
                url: url.into(),
                config,
                permits: Arc::new(Semaphore::new(config.max_connections)),
                idle: Mutex::new(VecDeque::with_capacity(config.max_connections)),
            }),
        })
    }

    /// Create the pool and open one connection right away, to fail early on a bad URL.
    pub async fn connect(url: impl Into<String>, config: PoolConfig) -> Result<Self> {
        let pool = Self::new(url, config)?;
        drop(pool.acquire().await?);
        Ok(pool)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Connections that can be acquired without waiting.
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Take a connection out of the pool, opening a new one if none is idle.
    pub async fn acquire(&self) -> Result<PoolConnection<C>> {
        let timeout = self.inner.config.acquire_timeout;
        let permit =
            match tokio::time::timeout(timeout, self.inner.permits.clone().acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(..)) => return Err(Error::query("The connection pool is closed")),
                Err(..) => {
                    let error = Error::query(format!(
                        "Timed out after {timeout:?} waiting for a {} connection",
                        driver_name::<C>()
                    ));
                    log::error!("{:#}", error);
                    return Err(error);
                }
            };
        let idle = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let connection = match idle {
            Some(connection) => connection,
            None => {
                log::debug!("Opening a new {} connection", driver_name::<C>());
                C::connect(&self.inner.url).await?
            }
        };
        Ok(PoolConnection {
            connection: Some(connection),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }

    /// Refuse new acquisitions, idle connections are closed.
    pub fn close(&self) {
        self.inner.permits.close();
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// A connection borrowed from a [`Pool`], given back when dropped.
pub struct PoolConnection<C: Connection> {
    connection: Option<C>,
    pool: Arc<PoolInner<C>>,
    _permit: OwnedSemaphorePermit,
}

impl<C: Connection> PoolConnection<C> {
    /// Close the connection instead of giving it back, its state is unknown.
    pub fn discard(mut self) {
        self.connection = None;
    }
}

impl<C: Connection> Deref for PoolConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.connection
            .as_ref()
            .expect("The connection is only taken out on drop")
    }
}

impl<C: Connection> DerefMut for PoolConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.connection
            .as_mut()
            .expect("The connection is only taken out on drop")
    }
}

impl<C: Connection> Drop for PoolConnection<C> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take()
            && !self.pool.permits.is_closed()
        {
            self.pool
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(connection);
        }
    }
}
