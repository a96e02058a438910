use crate::engine::RunManager;
use crate::storage::{CredentialCipher, Storage};
use std::sync::Arc;

/// Application state shared across all API handlers. Every collaborator is
/// constructed once at startup and injected; handlers never reach for
/// ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub runs: Arc<RunManager>,
    pub cipher: Arc<CredentialCipher>,
}

impl AppState {
    pub fn new(
        storage: Arc<Storage>,
        runs: Arc<RunManager>,
        cipher: Arc<CredentialCipher>,
    ) -> Self {
        Self {
            storage,
            runs,
            cipher,
        }
    }
}
