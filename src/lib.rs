pub mod api;
pub mod api_response;
pub mod config;
pub mod engine;
pub mod models;
pub mod node;
pub mod paths;
pub mod storage;

use anyhow::Result;
use config::EngineSettings;
use engine::RunManager;
use std::sync::Arc;
use storage::{CredentialCipher, Storage};

/// Core application state: storage, credential cipher, and the run manager,
/// constructed explicitly and wired together here so tests can assemble the
/// same pieces against fakes or temp databases.
pub struct AppCore {
    pub storage: Arc<Storage>,
    pub cipher: Arc<CredentialCipher>,
    pub runs: Arc<RunManager>,
    pub settings: EngineSettings,
}

impl AppCore {
    pub fn new(db_path: &str, master_key: &str, settings: EngineSettings) -> Result<Self> {
        settings.validate()?;

        let storage = Arc::new(Storage::new(db_path)?);
        let cipher = Arc::new(CredentialCipher::from_passphrase(master_key)?);
        let runs = Arc::new(RunManager::new(
            storage.clone(),
            cipher.clone(),
            settings.clone(),
        ));

        Ok(Self {
            storage,
            cipher,
            runs,
            settings,
        })
    }

    pub fn app_state(&self) -> api::AppState {
        api::AppState::new(self.storage.clone(), self.runs.clone(), self.cipher.clone())
    }
}
