//! Model lifecycle management
//!
//! Owns the model state machine and the single engine handle:
//!
//! ```text
//! Uninitialized -> Loading -> Ready | LoadFailed
//! Uninitialized -> LoadFailed           (model file missing)
//! Uninitialized -> MockReady            (mock mode, or no engine available)
//! ```
//!
//! Status reads never wait on the engine. The status cell is only
//! write-locked for the instant a new snapshot is stored; engine work happens
//! behind a separate mutex.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::i18n::{format_message, Locale};
use crate::inference::engine::{EngineCapability, LoadParams};
use crate::inference::error::ErrorKind;
use crate::inference::mock::MOCK_MODEL_NAME;
use crate::types::config::ServerConfig;
use crate::types::model::{LifecycleState, ModelStatus};

/// The engine handle, shared between load and generation
pub type SharedEngine = Arc<Mutex<Box<dyn EngineCapability>>>;

/// Where a generation request is dispatched
pub enum Backend {
    /// Synthesized responses, no engine access
    Mock,
    /// The loaded engine; lock it before use
    Engine(SharedEngine),
}

/// Owns model state and serializes access to the engine
pub struct ModelLifecycleManager {
    config: Arc<ServerConfig>,
    engine: Option<SharedEngine>,
    load_params: LoadParams,
    status: RwLock<ModelStatus>,
    started: AtomicBool,
}

impl ModelLifecycleManager {
    /// Create a manager in the `Uninitialized` state
    ///
    /// `engine` is `None` when no inference runtime is available; the manager
    /// then degrades to mock operation on [`initialize`](Self::initialize).
    pub fn new(config: Arc<ServerConfig>, engine: Option<Box<dyn EngineCapability>>) -> Self {
        let load_params = LoadParams {
            verbose: config.mode == crate::types::config::RunMode::Development,
            ..LoadParams::default()
        };
        Self {
            config,
            engine: engine.map(|engine| Arc::new(Mutex::new(engine))),
            load_params,
            status: RwLock::new(ModelStatus::uninitialized()),
            started: AtomicBool::new(false),
        }
    }

    /// Run the one load attempt of this process
    ///
    /// Failures are recorded in the status instead of being returned; the
    /// service keeps running and reports itself unhealthy. There is no
    /// automatic retry: a second call only returns the current status.
    pub async fn initialize(&self) -> ModelStatus {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Model initialization already ran; restart the process to retry");
            return self.status();
        }

        let path = self.config.model_path.clone();
        let display_path = path.display().to_string();

        if self.config.mock_mode {
            info!("Mock mode enabled, serving demonstration responses without a model");
            return self.set_status(ModelStatus::ready(MOCK_MODEL_NAME, display_path, true));
        }

        if !path.exists() {
            error!(
                "{}: {}",
                format_message(Locale::default(), "model.notFound"),
                display_path
            );
            return self.set_status(ModelStatus::failed(display_path, ErrorKind::ModelNotFound));
        }

        let Some(engine) = self.engine.clone() else {
            warn!("No inference engine available in this build, falling back to mock responses");
            return self.set_status(ModelStatus::ready(MOCK_MODEL_NAME, display_path, true));
        };

        self.set_status(ModelStatus::loading(display_path.clone()));

        let mut guard = engine.lock_owned().await;
        info!("Loading model from {} with {} backend", display_path, guard.name());

        let params = self.load_params.clone();
        let outcome = tokio::task::spawn_blocking(move || guard.load(&path, &params)).await;

        match outcome {
            Ok(Ok(loaded)) => {
                info!("Model {} loaded from {}", loaded.name, display_path);
                self.set_status(ModelStatus::ready(loaded.name, display_path, false))
            }
            Ok(Err(e)) => {
                error!("Failed to load model from {}: {}", display_path, e);
                self.set_status(ModelStatus::failed(
                    display_path,
                    ErrorKind::ModelLoadFailed(e.to_string()),
                ))
            }
            Err(e) => {
                error!("Model load task aborted: {}", e);
                self.set_status(ModelStatus::failed(
                    display_path,
                    ErrorKind::ModelLoadFailed(format!("load task aborted: {e}")),
                ))
            }
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> ModelStatus {
        match self.status.read() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.status().state
    }

    /// Whether generation requests can be served right now
    pub fn is_generation_capable(&self) -> bool {
        self.state().is_generation_capable()
    }

    /// Resolve where a generation request goes
    ///
    /// Anything short of `Ready`/`MockReady`, including a load still in
    /// progress, is rejected rather than queued.
    pub fn backend(&self) -> Result<Backend, ErrorKind> {
        match (self.state(), &self.engine) {
            (LifecycleState::MockReady, _) | (LifecycleState::Ready, None) => Ok(Backend::Mock),
            (LifecycleState::Ready, Some(engine)) => Ok(Backend::Engine(engine.clone())),
            _ => Err(ErrorKind::ModelNotInitialized),
        }
    }

    fn set_status(&self, status: ModelStatus) -> ModelStatus {
        let mut slot = match self.status.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = status.clone();
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::testing::FakeEngine;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn config(model_path: &Path, mock_mode: bool) -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            model_path: model_path.to_path_buf(),
            mock_mode,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_starts_uninitialized() {
        let manager = ModelLifecycleManager::new(config(Path::new("/x"), false), None);
        let status = manager.status();
        assert_eq!(status.state, LifecycleState::Uninitialized);
        assert!(!status.loaded);
        assert!(!manager.is_generation_capable());
        assert!(matches!(manager.backend(), Err(ErrorKind::ModelNotInitialized)));
    }

    #[tokio::test]
    async fn test_mock_mode_skips_engine_and_filesystem() {
        let engine = FakeEngine::new();
        let probe = engine.probe();
        let manager = ModelLifecycleManager::new(
            config(Path::new("/definitely/not/here.gguf"), true),
            Some(Box::new(engine)),
        );

        let status = manager.initialize().await;
        assert_eq!(status.state, LifecycleState::MockReady);
        assert!(status.loaded);
        assert!(status.mock);
        assert_eq!(status.name.as_deref(), Some(MOCK_MODEL_NAME));
        assert_eq!(probe.load_calls(), 0);
        assert!(matches!(manager.backend(), Ok(Backend::Mock)));
    }

    #[tokio::test]
    async fn test_missing_engine_degrades_to_mock() {
        let model = NamedTempFile::new().unwrap();
        let manager = ModelLifecycleManager::new(config(model.path(), false), None);
        let status = manager.initialize().await;
        assert_eq!(status.state, LifecycleState::MockReady);
        assert!(manager.is_generation_capable());
    }

    #[tokio::test]
    async fn test_missing_model_file_fails_even_without_engine() {
        let manager = ModelLifecycleManager::new(
            config(Path::new("/definitely/not/here.gguf"), false),
            None,
        );
        let status = manager.initialize().await;
        assert!(!status.loaded);
        assert!(!status.mock);
        assert_eq!(status.state, LifecycleState::LoadFailed);
        assert_eq!(status.last_error, Some(ErrorKind::ModelNotFound));
        assert!(matches!(manager.backend(), Err(ErrorKind::ModelNotInitialized)));
    }

    #[tokio::test]
    async fn test_missing_model_file_fails_without_retry() {
        let engine = FakeEngine::new();
        let probe = engine.probe();
        let manager = ModelLifecycleManager::new(
            config(Path::new("/definitely/not/here.gguf"), false),
            Some(Box::new(engine)),
        );

        let status = manager.initialize().await;
        assert!(!status.loaded);
        assert!(status.name.is_none());
        assert_eq!(status.path.as_deref(), Some("/definitely/not/here.gguf"));
        assert_eq!(status.last_error, Some(ErrorKind::ModelNotFound));
        assert_eq!(status.state, LifecycleState::LoadFailed);
        assert_eq!(probe.load_calls(), 0);

        // second call neither reloads nor changes anything
        assert_eq!(manager.initialize().await, status);
        assert_eq!(manager.status(), status);
        assert_eq!(probe.load_calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_load() {
        let model = NamedTempFile::new().unwrap();
        let engine = FakeEngine::new();
        let probe = engine.probe();
        let manager =
            ModelLifecycleManager::new(config(model.path(), false), Some(Box::new(engine)));

        let status = manager.initialize().await;
        assert!(status.loaded);
        assert_eq!(status.state, LifecycleState::Ready);
        assert_eq!(status.name.as_deref(), Some("fake-model"));
        assert!(!status.mock);
        assert_eq!(probe.load_calls(), 1);
        assert_eq!(probe.last_load_params().map(|p| p.context_size), Some(2048));
        assert!(matches!(manager.backend(), Ok(Backend::Engine(_))));
    }

    #[tokio::test]
    async fn test_engine_load_error_is_absorbed() {
        let model = NamedTempFile::new().unwrap();
        let engine = FakeEngine::new().failing_load("unsupported file format");
        let manager =
            ModelLifecycleManager::new(config(model.path(), false), Some(Box::new(engine)));

        let status = manager.initialize().await;
        assert!(!status.loaded);
        assert_eq!(status.state, LifecycleState::LoadFailed);
        match status.last_error {
            Some(ErrorKind::ModelLoadFailed(message)) => {
                assert!(message.contains("unsupported file format"))
            }
            other => panic!("unexpected last_error: {other:?}"),
        }
        assert!(matches!(manager.backend(), Err(ErrorKind::ModelNotInitialized)));
    }

    #[tokio::test]
    async fn test_status_reads_are_stable() {
        let manager = ModelLifecycleManager::new(config(Path::new("/x"), true), None);
        manager.initialize().await;
        let first = serde_json::to_string(&manager.status()).unwrap();
        for _ in 0..10 {
            assert_eq!(serde_json::to_string(&manager.status()).unwrap(), first);
        }
    }

    #[tokio::test]
    async fn test_rejects_while_loading() {
        let model = NamedTempFile::new().unwrap();
        let engine = FakeEngine::new().with_load_delay(std::time::Duration::from_millis(300));
        let manager = Arc::new(ModelLifecycleManager::new(
            config(model.path(), false),
            Some(Box::new(engine)),
        ));

        let loader = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.initialize().await })
        };

        while manager.state() != LifecycleState::Loading {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        // status stays answerable while the engine is busy loading
        assert!(!manager.status().loaded);
        assert!(matches!(manager.backend(), Err(ErrorKind::ModelNotInitialized)));

        let status = loader.await.unwrap();
        assert_eq!(status.state, LifecycleState::Ready);
    }
}
