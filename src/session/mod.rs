//! Session lifecycle for the gateway.
//!
//! A session binds an opaque identifier to one live upstream connection. The
//! registry owns creation and teardown; callers reach a connection only by
//! acquiring the session's lock.

mod registry;

pub use registry::{spawn_reaper, SessionRegistry};

use crate::db::DatabaseClient;
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Random 128-bit session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| GatewayError::invalid_credential("Token subject is not a session id"))
    }
}

/// A registered session.
pub struct Session {
    id: SessionId,
    state: Mutex<SessionState>,
}

struct SessionState {
    client: Box<dyn DatabaseClient>,
    current_database: Option<String>,
    last_used: Instant,
    closed: bool,
}

impl Session {
    fn new(id: SessionId, client: Box<dyn DatabaseClient>, database: Option<String>) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState {
                client,
                current_database: database,
                last_used: Instant::now(),
                closed: false,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Takes exclusive use of the session's connection.
    ///
    /// Waits for any in-flight operation on the same session. Fails with
    /// `SessionNotFound` if the session was closed while waiting.
    pub async fn acquire(&self) -> Result<SessionGuard<'_>> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(GatewayError::session_not_found(self.id));
        }
        state.last_used = Instant::now();
        Ok(SessionGuard { state })
    }

    /// Takes exclusive use of the session and switches it to `database`.
    pub async fn acquire_in(&self, database: &str) -> Result<SessionGuard<'_>> {
        let mut guard = self.acquire().await?;
        guard.switch_database(database).await?;
        Ok(guard)
    }

    /// Closes the connection and marks the session dead.
    async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.client.close().await
    }

    /// Idle time, or `None` when the session is busy.
    fn idle_for(&self) -> Option<Duration> {
        self.state
            .try_lock()
            .ok()
            .map(|state| state.last_used.elapsed())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// Exclusive access to a session's connection and catalog cursor.
pub struct SessionGuard<'a> {
    state: MutexGuard<'a, SessionState>,
}

impl SessionGuard<'_> {
    /// The connection, for running statements.
    pub fn client(&mut self) -> &mut dyn DatabaseClient {
        self.state.client.as_mut()
    }

    /// The database most recently selected on this connection.
    pub fn current_database(&self) -> Option<&str> {
        self.state.current_database.as_deref()
    }

    /// Switches the connection's catalog and moves the cursor.
    ///
    /// The switch is issued even when the cursor already names `database`.
    pub async fn switch_database(&mut self, database: &str) -> Result<()> {
        if database.trim().is_empty() {
            return Err(GatewayError::invalid_argument("Database name is required"));
        }
        self.state.client.use_database(database).await?;
        self.state.current_database = Some(database.to_string());
        Ok(())
    }
}
