//! Save/load persistence with integrity verification
//!
//! Features:
//! - Versioned JSON envelope
//! - Structural validation of the loaded world before it is accepted
//! - LocalStorage slot on wasm32 (native builds keep saves in memory only)

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::{InvariantViolation, WorldState};

/// Current envelope version
pub const SAVE_VERSION: u32 = 1;

/// LocalStorage key (used only in wasm32)
#[allow(dead_code)]
const STORAGE_KEY: &str = "mycelium_save";

/// What goes to storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub version: u32,
    pub saved_at_tick: u64,
    pub state: WorldState,
}

/// Only the header, read before committing to the full parse
#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save version {0} (expected {SAVE_VERSION})")]
    UnsupportedVersion(u32),
    #[error("save holds a corrupt world: {0}")]
    Corrupt(#[from] InvariantViolation),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

/// Serialize a world into a save string
pub fn encode(state: &WorldState) -> Result<String, SaveError> {
    let envelope = SaveEnvelope {
        version: SAVE_VERSION,
        saved_at_tick: state.tick,
        state: state.clone(),
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse and validate a save string
pub fn decode(json: &str) -> Result<WorldState, SaveError> {
    let header: Header = serde_json::from_str(json)?;
    if header.version != SAVE_VERSION {
        return Err(SaveError::UnsupportedVersion(header.version));
    }
    let envelope: SaveEnvelope = serde_json::from_str(json)?;
    envelope.state.check_invariants()?;
    Ok(envelope.state)
}

/// Write the world to LocalStorage (WASM only)
#[cfg(target_arch = "wasm32")]
pub fn save_to_storage(state: &WorldState) -> Result<(), SaveError> {
    let json = encode(state)?;
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
        .ok_or_else(|| SaveError::Storage("no localStorage".to_string()))?;
    storage
        .set_item(STORAGE_KEY, &json)
        .map_err(|e| SaveError::Storage(format!("{e:?}")))?;
    log::info!("saved world at tick {}", state.tick);
    Ok(())
}

/// Read the world from LocalStorage (WASM only). `Ok(None)` if no save exists.
#[cfg(target_arch = "wasm32")]
pub fn load_from_storage() -> Result<Option<WorldState>, SaveError> {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
        .ok_or_else(|| SaveError::Storage("no localStorage".to_string()))?;
    match storage.get_item(STORAGE_KEY) {
        Ok(Some(json)) => {
            let state = decode(&json)?;
            log::info!("loaded world at tick {}", state.tick);
            Ok(Some(state))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(SaveError::Storage(format!("{e:?}"))),
    }
}

/// Native stubs
#[cfg(not(target_arch = "wasm32"))]
pub fn save_to_storage(_state: &WorldState) -> Result<(), SaveError> {
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_from_storage() -> Result<Option<WorldState>, SaveError> {
    Ok(None)
}
