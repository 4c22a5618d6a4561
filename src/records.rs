//! Prestige run leaderboard
//!
//! Persisted to LocalStorage, tracks the 10 best runs by stardust.

use serde::{Deserialize, Serialize};

/// Maximum number of runs to keep
pub const MAX_RUN_RECORDS: usize = 10;

/// One finished (prestiged) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Stardust held when the run was prestiged
    pub stardust: f64,
    /// Length of the run in ticks
    pub ticks: u64,
    /// Prestige number this run earned (1 for the first)
    pub prestige: u32,
}

/// Run leaderboard, sorted by stardust descending
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunRecords {
    pub entries: Vec<RunRecord>,
}

impl RunRecords {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "mycelium_records";

    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a run would make the board
    pub fn qualifies(&self, stardust: f64) -> bool {
        if !stardust.is_finite() || stardust <= 0.0 {
            return false;
        }
        if self.entries.len() < MAX_RUN_RECORDS {
            return true;
        }
        self.entries.last().is_none_or(|e| stardust > e.stardust)
    }

    /// Insert a run if it qualifies.
    /// Returns the rank achieved (1-indexed) or None if it didn't qualify.
    pub fn add_record(&mut self, stardust: f64, ticks: u64, prestige: u32) -> Option<usize> {
        if !self.qualifies(stardust) {
            return None;
        }

        let entry = RunRecord {
            stardust,
            ticks,
            prestige,
        };
        let rank = match self.entries.iter().position(|e| stardust > e.stardust) {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_RUN_RECORDS);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&RunRecord> {
        self.entries.first()
    }

    /// Load records from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(records) = serde_json::from_str::<RunRecords>(&json) {
                    log::info!("Loaded {} run records", records.entries.len());
                    return records;
                }
            }
        }

        log::info!("No run records found, starting fresh");
        Self::new()
    }

    /// Save records to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Run records saved ({} entries)", self.entries.len());
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_descending() {
        let mut records = RunRecords::new();
        assert_eq!(records.add_record(12_000.0, 900, 1), Some(1));
        assert_eq!(records.add_record(30_000.0, 1500, 2), Some(1));
        assert_eq!(records.add_record(20_000.0, 1200, 3), Some(2));
        let order: Vec<f64> = records.entries.iter().map(|e| e.stardust).collect();
        assert_eq!(order, vec![30_000.0, 20_000.0, 12_000.0]);
        assert_eq!(records.best().map(|r| r.prestige), Some(2));
    }

    #[test]
    fn test_board_is_capped() {
        let mut records = RunRecords::new();
        for i in 1..=MAX_RUN_RECORDS {
            records.add_record(10_000.0 * i as f64, 0, i as u32);
        }
        assert!(!records.qualifies(5_000.0));
        assert_eq!(records.add_record(5_000.0, 0, 11), None);
        assert_eq!(records.add_record(15_000.0, 0, 12), Some(10));
        assert_eq!(records.entries.len(), MAX_RUN_RECORDS);
        assert_eq!(records.entries.last().map(|e| e.stardust), Some(15_000.0));
    }

    #[test]
    fn test_rejects_empty_runs() {
        let records = RunRecords::new();
        assert!(!records.qualifies(0.0));
        assert!(!records.qualifies(f64::NAN));
        assert!(records.is_empty());
    }
}
