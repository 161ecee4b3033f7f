use crate::backend::{BackendClient, BackendError};
use crate::config::Config;
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub sessions: SessionStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend_url, config.request_timeout)?;
        Ok(Self {
            backend,
            sessions: SessionStore::new(config.session_idle_timeout),
            config: Arc::new(config),
        })
    }
}
