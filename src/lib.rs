//! Mycelium Idle - fluid/pressure simulation and economy core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (fluid network, economy, rebasing, actions)
//! - `tuning`: Data-driven game balance
//! - `persistence`: Versioned save envelope
//! - `records`: Prestige run leaderboard

pub mod persistence;
pub mod records;
pub mod sim;
pub mod tuning;

pub use records::RunRecords;
pub use tuning::Tuning;

/// Hard numeric bounds. These are invariants of the simulation, not balance
/// knobs, so they are not part of [`Tuning`].
pub mod consts {
    /// Default timestep when a tick carries no explicit dt (60 Hz)
    pub const DEFAULT_DT: f64 = 1.0 / 60.0;
    /// Maximum ticks per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Node pressure is clamped to [-PRESSURE_LIMIT, PRESSURE_LIMIT]
    pub const PRESSURE_LIMIT: f64 = 10_000.0;
    /// Edge flow is clamped to [-FLOW_LIMIT, FLOW_LIMIT]
    pub const FLOW_LIMIT: f64 = 1_000.0;
    /// Flux generated by the fluid pass is capped per tick
    pub const MAX_FLUX_PER_TICK: f64 = 1_000.0;
    /// Smallest resistance used as a divisor
    pub const MIN_RESISTANCE: f64 = 0.01;

    /// Camera zoom range
    pub const ZOOM_MIN: f64 = 0.1;
    pub const ZOOM_MAX: f64 = 5.0;

    /// Dimensions the world can be shifted into
    pub const DIMENSION_MIN: u8 = 1;
    pub const DIMENSION_MAX: u8 = 4;
}

/// Clamp a pressure value into its legal range
#[inline]
pub fn clamp_pressure(p: f64) -> f64 {
    p.clamp(-consts::PRESSURE_LIMIT, consts::PRESSURE_LIMIT)
}

/// Clamp a flow value into its legal range
#[inline]
pub fn clamp_flow(f: f64) -> f64 {
    f.clamp(-consts::FLOW_LIMIT, consts::FLOW_LIMIT)
}

/// Returns `value` if finite, otherwise `fallback`.
///
/// Used wherever an accumulated term is written back into state.
#[inline]
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
