//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Logical tick clock only (no wall time)
//! - Seeded RNG only, derived per tick and per action
//! - Stable iteration order (insertion order, which follows entity ID)
//! - No rendering, storage or platform dependencies

pub mod actions;
pub mod collision;
pub mod economy;
pub mod fluid;
pub mod origin;
pub mod secondary;
pub mod state;
pub mod tick;
pub mod upgrades;

pub use actions::{Action, Rejection};
pub use collision::Blocker;
pub use state::{
    Camera, Desk, Edge, Enemy, EntityId, InvariantViolation, Node, NodeKind, Obstacle, Particle,
    Prism, PrismKind, Resources, RngState, SimEvent, WorldState, MAX_PARTICLES,
};
pub use tick::{dispatch, on_tick};
pub use upgrades::{Skill, UpgradeId, Upgrades};
