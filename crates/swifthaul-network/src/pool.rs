//! Reusable per-address connection pool

use std::collections::HashMap;
use std::time::{Duration, Instant};
use swifthaul_types::{Error, Result};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::debug;

struct PooledConnection {
    /// Present while the connection is parked; taken while checked out
    stream: Option<TcpStream>,
    last_used: Instant,
    in_use: bool,
}

/// One reusable TCP connection per address
///
/// Connections are marked in/out of use rather than removed. A parked
/// connection older than the idle timeout is considered stale and replaced
/// transparently on the next checkout.
pub struct ConnectionPool {
    connections: RwLock<HashMap<String, PooledConnection>>,
    idle_timeout: Duration,
    dial_timeout: Duration,
}

impl ConnectionPool {
    /// Create a pool with the given staleness and dial timeouts
    pub fn new(idle_timeout: Duration, dial_timeout: Duration) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            idle_timeout,
            dial_timeout,
        }
    }

    /// Check out a connection to `addr`, reusing a fresh parked one
    ///
    /// Dials a new connection when none is parked, the parked one is stale,
    /// or the slot is already checked out.
    pub async fn checkout(&self, addr: &str) -> Result<TcpStream> {
        {
            let mut connections = self.connections.write().await;
            if let Some(entry) = connections.get_mut(addr) {
                if !entry.in_use && entry.last_used.elapsed() < self.idle_timeout {
                    if let Some(stream) = entry.stream.take() {
                        entry.in_use = true;
                        debug!("Reusing pooled connection to {}", addr);
                        return Ok(stream);
                    }
                }
            }
        }

        let stream = tokio::time::timeout(self.dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                Error::network(format!(
                    "dial to {} timed out after {:?}",
                    addr, self.dial_timeout
                ))
            })?
            .map_err(|e| Error::network(format!("failed to connect to {}: {}", addr, e)))?;

        let mut connections = self.connections.write().await;
        connections.insert(
            addr.to_string(),
            PooledConnection {
                stream: None,
                last_used: Instant::now(),
                in_use: true,
            },
        );
        debug!("Dialed new connection to {}", addr);
        Ok(stream)
    }

    /// Return a connection to the pool and mark it parked
    pub async fn checkin(&self, addr: &str, stream: TcpStream) {
        let mut connections = self.connections.write().await;
        connections.insert(
            addr.to_string(),
            PooledConnection {
                stream: Some(stream),
                last_used: Instant::now(),
                in_use: false,
            },
        );
    }

    /// Whether the slot for `addr` is currently checked out
    pub async fn is_in_use(&self, addr: &str) -> bool {
        let connections = self.connections.read().await;
        connections.get(addr).is_some_and(|e| e.in_use)
    }

    /// Number of addresses the pool has slots for
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether the pool has no slots at all
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn accept_loop(listener: TcpListener) {
        // hold accepted connections so checked-in streams stay alive
        let mut held = Vec::new();
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            held.push(stream);
        }
    }

    #[tokio::test]
    async fn test_checkout_checkin_reuse() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(accept_loop(listener));

        let pool = ConnectionPool::default();
        let stream = pool.checkout(&addr).await.unwrap();
        assert!(pool.is_in_use(&addr).await);

        pool.checkin(&addr, stream).await;
        assert!(!pool.is_in_use(&addr).await);
        assert_eq!(pool.len().await, 1);

        // second checkout reuses the parked connection
        let _stream = pool.checkout(&addr).await.unwrap();
        assert!(pool.is_in_use(&addr).await);
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_stale_connection_replaced() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(accept_loop(listener));

        let pool = ConnectionPool::new(Duration::from_millis(10), Duration::from_secs(5));
        let stream = pool.checkout(&addr).await.unwrap();
        pool.checkin(&addr, stream).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        // past the idle timeout, checkout dials fresh instead of reusing
        let _stream = pool.checkout(&addr).await.unwrap();
        assert!(pool.is_in_use(&addr).await);
    }

    #[tokio::test]
    async fn test_checkout_unreachable_errors() {
        let pool = ConnectionPool::new(Duration::from_secs(60), Duration::from_secs(1));
        let result = pool.checkout("127.0.0.1:1").await;
        assert!(result.is_err());
        assert!(pool.is_empty().await);
    }
}
