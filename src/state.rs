use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth_service::IdentityVerifier;
use crate::services::doc_store_service::DocumentStore;
use crate::services::user_service::UserDirectory;
use crate::ws::persistence::PersistenceCoordinator;
use crate::ws::registry::PresenceRegistry;

/// State shared by every connection and HTTP handler.
pub struct AppState {
    pub config: Config,
    pub registry: PresenceRegistry,
    pub identity: Arc<dyn IdentityVerifier>,
    pub users: Arc<dyn UserDirectory>,
    pub documents: Arc<dyn DocumentStore>,
    pub persistence: PersistenceCoordinator,
    open_connections: AtomicUsize,
}

impl AppState {
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityVerifier>,
        users: Arc<dyn UserDirectory>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            registry: PresenceRegistry::new(),
            identity,
            users,
            persistence: PersistenceCoordinator::new(documents.clone()),
            documents,
            open_connections: AtomicUsize::new(0),
        }
    }

    pub fn connection_opened(&self) -> usize {
        self.open_connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn connection_closed(&self) -> usize {
        self.open_connections.fetch_sub(1, Ordering::SeqCst).saturating_sub(1)
    }

    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }
}
