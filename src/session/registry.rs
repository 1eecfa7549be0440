//! In-memory session registry.

use super::{Session, SessionId};
use crate::config::ConnectionConfig;
use crate::db::Connector;
use crate::error::{GatewayError, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Maps session identifiers to live connections.
///
/// The map lock is only held for insert, remove and lookup; database round
/// trips happen under the per-session lock.
pub struct SessionRegistry {
    connector: Arc<dyn Connector>,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    /// Creates an empty registry that opens connections through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Connects upstream and registers a new session for the connection.
    pub async fn open(&self, config: &ConnectionConfig) -> Result<SessionId> {
        config.validate()?;
        info!(target_db = %config.display_string(), "Opening session");

        let client = self.connector.connect(config).await.map_err(|e| {
            error!(target_db = %config.display_string(), error = %e, "Connection failed");
            match e {
                GatewayError::ConnectionFailure(_) => e,
                other => GatewayError::connection(other.to_string()),
            }
        })?;

        let id = SessionId::new();
        let session = Arc::new(Session::new(
            id,
            client,
            config.initial_database().map(String::from),
        ));
        self.sessions.write().await.insert(id, session);

        info!(session = %id, "Session opened");
        Ok(id)
    }

    /// Removes and closes a session. Unknown identifiers are ignored.
    pub async fn close(&self, id: &SessionId) {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                if let Err(e) = session.shutdown().await {
                    error!(session = %id, error = %e, "Error closing connection");
                }
                info!(session = %id, "Session closed");
            }
            None => debug!(session = %id, "Close requested for unknown session"),
        }
    }

    /// Returns the session registered under `id`.
    pub async fn lookup(&self, id: &SessionId) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::session_not_found(id))
    }

    /// Switches the session's current database.
    pub async fn select_database(&self, id: &SessionId, database: &str) -> Result<()> {
        let session = self.lookup(id).await?;
        let mut guard = session.acquire().await?;
        guard.switch_database(database).await?;
        info!(session = %id, database, "Database selected");
        Ok(())
    }

    /// Closes every session. Used at shutdown.
    pub async fn close_all(&self) {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .write()
            .await
            .drain()
            .map(|(_, session)| session)
            .collect();
        if sessions.is_empty() {
            return;
        }

        info!(count = sessions.len(), "Closing all sessions");
        let results = join_all(sessions.iter().map(|session| session.shutdown())).await;
        for (session, result) in sessions.iter().zip(results) {
            if let Err(e) = result {
                error!(session = %session.id(), error = %e, "Error closing connection");
            }
        }
    }

    /// Closes sessions idle for longer than `max_idle`. Busy sessions are skipped.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let expired: Vec<SessionId> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|session| session.idle_for().is_some_and(|idle| idle > max_idle))
            .map(|session| session.id())
            .collect();

        for id in &expired {
            info!(session = %id, "Closing idle session");
            self.close(id).await;
        }
        expired.len()
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Starts a background task that periodically closes idle sessions.
pub fn spawn_reaper(
    registry: Arc<SessionRegistry>,
    max_idle: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reaped = registry.reap_idle(max_idle).await;
            if reaped > 0 {
                let remaining = registry.len().await;
                info!(reaped, remaining, "Idle sessions reaped");
            }
        }
    })
}
