//! Model types
//!
//! Lifecycle classification and the status snapshot reported to clients.

use serde::{Deserialize, Serialize};

use crate::inference::error::ErrorKind;

/// Readiness of the model owned by the lifecycle manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Loading,
    Ready,
    MockReady,
    LoadFailed,
}

impl LifecycleState {
    /// Whether generation requests may be dispatched in this state
    pub fn is_generation_capable(self) -> bool {
        matches!(self, LifecycleState::Ready | LifecycleState::MockReady)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Loading => "loading",
            LifecycleState::Ready => "ready",
            LifecycleState::MockReady => "mock_ready",
            LifecycleState::LoadFailed => "load_failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of the model status
///
/// `name` is only ever present while `loaded` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorKind>,
    pub state: LifecycleState,
    pub mock: bool,
}

impl ModelStatus {
    /// Status at process start
    pub fn uninitialized() -> Self {
        Self {
            loaded: false,
            name: None,
            path: None,
            last_error: None,
            state: LifecycleState::Uninitialized,
            mock: false,
        }
    }

    /// A load attempt in progress
    pub fn loading(path: impl Into<String>) -> Self {
        Self {
            state: LifecycleState::Loading,
            path: Some(path.into()),
            ..Self::uninitialized()
        }
    }

    /// Model loaded and ready for generation
    pub fn ready(name: impl Into<String>, path: impl Into<String>, mock: bool) -> Self {
        Self {
            loaded: true,
            name: Some(name.into()),
            path: Some(path.into()),
            last_error: None,
            state: if mock {
                LifecycleState::MockReady
            } else {
                LifecycleState::Ready
            },
            mock,
        }
    }

    /// Load attempt failed; the error is kept for status reporting
    pub fn failed(path: impl Into<String>, error: ErrorKind) -> Self {
        Self {
            state: LifecycleState::LoadFailed,
            path: Some(path.into()),
            last_error: Some(error),
            ..Self::uninitialized()
        }
    }
}

impl Default for ModelStatus {
    fn default() -> Self {
        Self::uninitialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_by_state() {
        assert!(LifecycleState::Ready.is_generation_capable());
        assert!(LifecycleState::MockReady.is_generation_capable());
        assert!(!LifecycleState::Uninitialized.is_generation_capable());
        assert!(!LifecycleState::Loading.is_generation_capable());
        assert!(!LifecycleState::LoadFailed.is_generation_capable());
    }

    #[test]
    fn test_unloaded_status_has_no_name() {
        let failed = ModelStatus::failed("/missing.gguf", ErrorKind::ModelNotFound);
        assert!(!failed.loaded);
        assert!(failed.name.is_none());
        assert!(ModelStatus::loading("/m.gguf").name.is_none());
    }

    #[test]
    fn test_status_json_shape() {
        let json = serde_json::to_value(ModelStatus::failed("/m", ErrorKind::ModelNotFound)).unwrap();
        assert_eq!(json["loaded"], false);
        assert_eq!(json["path"], "/m");
        assert_eq!(json["state"], "load_failed");
        assert_eq!(json["last_error"]["kind"], "model_not_found");
        assert!(json.get("name").is_none());
    }
}
