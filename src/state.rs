//! Persistence blob handed to the host.

use crate::{LoadError, Result};
use ampnet_core::ProcessMode;
use serde::{Deserialize, Serialize};

pub const STATE_VERSION: u32 = 1;

/// Everything needed to bring a fresh host back to where it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostState {
    pub version: u32,
    pub mode: ProcessMode,
    /// Preset the model came from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Source text of the active model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl HostState {
    pub fn new(mode: ProcessMode, preset: Option<String>, model: Option<String>) -> Self {
        Self {
            version: STATE_VERSION,
            mode,
            preset,
            model,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LoadError::State(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state: Self =
            serde_json::from_slice(bytes).map_err(|e| LoadError::State(e.to_string()))?;
        if state.version > STATE_VERSION {
            return Err(LoadError::State(format!(
                "state version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_state_round_trip() {
        let state = HostState::new(
            ProcessMode::Static,
            Some("gru".into()),
            Some("{\"in_shape\":[null,null,1],\"layers\":[]}".into()),
        );
        let bytes = state.to_bytes().unwrap();
        assert_eq!(HostState::from_bytes(&bytes).unwrap(), state);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let bytes = HostState::new(ProcessMode::Dynamic, None, None)
            .to_bytes()
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"version":1,"mode":"dynamic"}"#);
    }

    proptest! {
        #[test]
        fn prop_any_state_round_trips(
            is_static in any::<bool>(),
            preset in proptest::option::of("[a-z0-9_]{1,16}"),
            model in proptest::option::of(".{0,256}"),
        ) {
            let mode = if is_static { ProcessMode::Static } else { ProcessMode::Dynamic };
            let state = HostState::new(mode, preset, model);
            let bytes = state.to_bytes().unwrap();
            prop_assert_eq!(HostState::from_bytes(&bytes).unwrap(), state);
        }
    }

    #[test]
    fn test_rejects_garbage_and_future_versions() {
        assert!(matches!(
            HostState::from_bytes(b"\x00\x01"),
            Err(LoadError::State(_))
        ));
        assert!(matches!(
            HostState::from_bytes(br#"{"version":99,"mode":"dynamic"}"#),
            Err(LoadError::State(_))
        ));
    }
}
