use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::profiles::ConnectionProfile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Driver-specific client lifecycle.
#[async_trait]
pub trait ConnectionBackend: Send + Sync {
    type Connection: Send + Sync;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Connection, BackendError>;
    async fn ping(&self, connection: &Self::Connection) -> Result<(), BackendError>;
    async fn disconnect(&self, connection: Self::Connection) -> Result<(), BackendError>;
}

#[derive(Debug, Error)]
pub enum ConnectionManagerError {
    #[error("already connected to `{active_profile}`")]
    AlreadyConnected { active_profile: String },
    #[error("{0}")]
    Backend(#[source] BackendError),
}

#[derive(Debug)]
struct ActiveConnection<C> {
    profile: ConnectionProfile,
    handle: C,
}

/// Owns at most one live connection and remembers the profile it was
/// opened with.
#[derive(Debug)]
pub struct ConnectionManager<B: ConnectionBackend> {
    backend: B,
    active: Option<ActiveConnection<B::Connection>>,
}

impl<B: ConnectionBackend> ConnectionManager<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn active_profile(&self) -> Option<&ConnectionProfile> {
        self.active.as_ref().map(|active| &active.profile)
    }

    #[must_use]
    pub fn connection(&self) -> Option<&B::Connection> {
        self.active.as_ref().map(|active| &active.handle)
    }

    /// Opens a connection and verifies it with a ping. A connection that
    /// fails the ping is closed again before the error is returned.
    pub async fn connect(
        &mut self,
        profile: ConnectionProfile,
    ) -> Result<Duration, ConnectionManagerError> {
        if let Some(active) = &self.active {
            return Err(ConnectionManagerError::AlreadyConnected {
                active_profile: active.profile.name.clone(),
            });
        }

        let started_at = Instant::now();
        let handle = self
            .backend
            .connect(&profile)
            .await
            .map_err(ConnectionManagerError::Backend)?;
        if let Err(error) = self.backend.ping(&handle).await {
            if let Err(close_error) = self.backend.disconnect(handle).await {
                tracing::warn!(%close_error, "failed to close unhealthy connection");
            }
            return Err(ConnectionManagerError::Backend(error));
        }

        let latency = started_at.elapsed();
        info!(
            profile = %profile.name,
            latency_ms = latency.as_millis(),
            "connected"
        );
        self.active = Some(ActiveConnection { profile, handle });
        Ok(latency)
    }

    pub async fn disconnect(&mut self) -> Result<(), ConnectionManagerError> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        info!(profile = %active.profile.name, "disconnecting");
        self.backend
            .disconnect(active.handle)
            .await
            .map_err(ConnectionManagerError::Backend)
    }
}
