//! World state and core simulation types
//!
//! Everything that must survive a save/load lives here. Cosmetic data
//! (particles, per-dispatch events) is skipped by serde.

use std::collections::{BTreeMap, HashSet};

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::upgrades::{Skill, UpgradeId, Upgrades};
use crate::tuning::Tuning;

/// Identifier shared by every entity kind
pub type EntityId = u32;

/// Role of a node in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Pinned to source pressure every tick
    Source,
    /// Player-built junction
    Relay,
    /// Spawned by fractal branching
    Blob,
}

/// A pressure point in world space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: EntityId,
    pub kind: NodeKind,
    pub pos: DVec2,
    pub pressure: f64,
}

impl Node {
    pub fn new(id: EntityId, kind: NodeKind, pos: DVec2) -> Self {
        Self {
            id,
            kind,
            pos,
            pressure: 0.0,
        }
    }

    #[inline]
    pub fn is_source(&self) -> bool {
        self.kind == NodeKind::Source
    }
}

/// Directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EntityId,
    pub source: EntityId,
    pub target: EntityId,
    /// Velocity computed on the last fluid pass
    pub flow: f64,
    pub resistance: f64,
}

impl Edge {
    /// True if this edge joins `a` and `b` in either direction
    #[inline]
    pub fn connects(&self, a: EntityId, b: EntityId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}

/// The three currencies
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub stardust: f64,
    pub flux: f64,
    pub lucidity: f64,
}

impl Resources {
    pub const ZERO: Self = Self {
        stardust: 0.0,
        flux: 0.0,
        lucidity: 0.0,
    };

    pub const fn new(stardust: f64, flux: f64, lucidity: f64) -> Self {
        Self {
            stardust,
            flux,
            lucidity,
        }
    }

    pub const fn stardust(amount: f64) -> Self {
        Self::new(amount, 0.0, 0.0)
    }

    pub const fn lucidity(amount: f64) -> Self {
        Self::new(0.0, 0.0, amount)
    }

    /// Same amount in every currency
    pub const fn splat(amount: f64) -> Self {
        Self::new(amount, amount, amount)
    }

    /// True if every currency is at least the cost
    pub fn covers(&self, cost: &Resources) -> bool {
        self.stardust >= cost.stardust && self.flux >= cost.flux && self.lucidity >= cost.lucidity
    }

    /// Subtract a cost, never going below zero
    pub fn deduct(&mut self, cost: &Resources) {
        self.stardust = (self.stardust - cost.stardust).max(0.0);
        self.flux = (self.flux - cost.flux).max(0.0);
        self.lucidity = (self.lucidity - cost.lucidity).max(0.0);
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.stardust * factor,
            self.flux * factor,
            self.lucidity * factor,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.stardust.is_finite() && self.flux.is_finite() && self.lucidity.is_finite()
    }
}

/// Prism type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrismKind {
    #[default]
    #[serde(rename = "ISOTOPE-322")]
    Isotope322,
    #[serde(rename = "GLITCHED-PRISM")]
    GlitchedPrism,
    #[serde(rename = "QUANTUM")]
    Quantum,
    /// Collecting one starts an invasion instead of paying out
    #[serde(rename = "WATERMARK")]
    Watermark,
}

/// A collectible resource entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prism {
    pub id: EntityId,
    pub pos: DVec2,
    pub value: f64,
    pub kind: PrismKind,
}

/// Static terrain that blocks building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: EntityId,
    pub pos: DVec2,
    pub radius: f64,
}

/// Drifting hostile that blocks building near it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    pub ttl_ticks: u32,
}

/// Bureaucrat desk; compliant desks issue permits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desk {
    pub id: EntityId,
    pub pos: DVec2,
    pub compliant: bool,
}

/// Camera position (world-space center) and zoom
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub offset: DVec2,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: DVec2::ZERO,
            zoom: 1.0,
        }
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: DVec2,
    pub vel: DVec2,
    pub life: f64, // 0-1, decreases over time
    pub size: f64,
}

/// Maximum particles
pub const MAX_PARTICLES: usize = 256;

/// Salt for the generator used while building a fresh world
const WORLDGEN_SALT: u64 = 0x5EED;

/// Something the presentation layer may want to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    NodeBuilt { id: EntityId, free: bool },
    EdgeBuilt { id: EntityId },
    PrismDigested { id: EntityId, value: f64 },
    PrismCollected { id: EntityId, value: f64 },
    InvasionStarted,
    UpgradeUnlocked { id: UpgradeId },
    SkillActivated { skill: Skill },
    EffectExpired { skill: Skill },
    Rebased { shift: DVec2 },
    PermitIssued { desk: EntityId },
    DeskProcessed { id: EntityId },
    DimensionShifted { dimension: u8 },
    Prestiged { stardust: f64, ticks: u64 },
    Crashed { reason: String },
}

/// Seed wrapper. Every tick and every action draws from a generator
/// derived from `(seed, tick, salt)`, so runs replay exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Generator for the simulation pass of `tick`
    pub fn for_tick(&self, tick: u64) -> Pcg32 {
        self.derive(tick, 0)
    }

    /// Generator for an action applied during `tick`
    pub fn for_action(&self, tick: u64, salt: u64) -> Pcg32 {
        self.derive(tick, salt.wrapping_add(1))
    }

    fn derive(&self, tick: u64, salt: u64) -> Pcg32 {
        let mixed = self.seed
            ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ salt.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        Pcg32::seed_from_u64(mixed)
    }
}

/// Corrupted world shape; fatal for the running session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("world has no SOURCE node")]
    NoSource,
    #[error("node id {0} appears more than once")]
    DuplicateNodeId(EntityId),
    #[error("node {0} has a non-finite position")]
    NonFinitePosition(EntityId),
    #[error("resources are not finite")]
    NonFiniteResources,
}

/// Complete world state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub rng_state: RngState,
    /// Logical clock; all timers are expressed in ticks
    pub tick: u64,
    pub resources: Resources,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub prisms: Vec<Prism>,
    pub obstacles: Vec<Obstacle>,
    pub enemies: Vec<Enemy>,
    pub desks: Vec<Desk>,
    pub upgrades: Upgrades,
    /// Skill -> tick at which the effect expires
    pub active_effects: BTreeMap<Skill, u64>,
    /// Skill -> tick at which it may be activated again
    pub cooldowns: BTreeMap<Skill, u64>,
    /// Resources captured when god mode was activated
    pub backup_resources: Option<Resources>,
    pub camera: Camera,
    /// Total shift applied by origin rebasing
    pub global_offset: DVec2,
    pub dimension: u8,
    pub permits: u32,
    /// Ticks left in the current invasion (0 = none)
    pub invasion_ticks: u32,
    /// Ticks since the last player action
    pub idle_ticks: u64,
    pub prestige_count: u32,
    /// Flux produced by the fluid pass during the current tick
    pub flux_generated: f64,
    /// Set when an invariant check fails; ticking stops until reset
    pub crashed: bool,
    /// Visual particles (not gameplay-affecting)
    #[serde(skip)]
    pub particles: Vec<Particle>,
    /// Events produced by the most recent dispatch
    #[serde(skip)]
    pub events: Vec<SimEvent>,
    /// Next entity ID
    next_id: EntityId,
}

impl WorldState {
    /// Create a new world with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, &Tuning::default())
    }

    /// Create a new world: one SOURCE node at the origin, starting stardust,
    /// and a few obstacles kept clear of the origin.
    pub fn with_tuning(seed: u64, tuning: &Tuning) -> Self {
        let mut state = Self {
            rng_state: RngState::new(seed),
            tick: 0,
            resources: Resources::stardust(tuning.world.initial_stardust),
            nodes: Vec::new(),
            edges: Vec::new(),
            prisms: Vec::new(),
            obstacles: Vec::new(),
            enemies: Vec::new(),
            desks: Vec::new(),
            upgrades: Upgrades::new(),
            active_effects: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            backup_resources: None,
            camera: Camera::default(),
            global_offset: DVec2::ZERO,
            dimension: crate::consts::DIMENSION_MIN,
            permits: 0,
            invasion_ticks: 0,
            idle_ticks: 0,
            prestige_count: 0,
            flux_generated: 0.0,
            crashed: false,
            particles: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        };

        let id = state.next_entity_id();
        let mut source = Node::new(id, NodeKind::Source, DVec2::ZERO);
        source.pressure = tuning.fluid.pressure_source;
        state.nodes.push(source);

        let mut rng = state.rng_state.for_action(0, WORLDGEN_SALT);
        for _ in 0..tuning.world.initial_obstacles {
            if let Some(obstacle) = state.generate_obstacle(&mut rng, tuning) {
                state.obstacles.push(obstacle);
            }
        }

        state
    }

    /// Generator for a player action. Mixing in the ID counter gives each
    /// entity-creating action in the same tick its own stream.
    pub fn action_rng(&self, salt: u64) -> Pcg32 {
        self.rng_state
            .for_action(self.tick, salt ^ (u64::from(self.next_id) << 16))
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Roll an obstacle that keeps `obstacle_clearance` from the origin.
    /// Gives up after a few attempts rather than looping.
    pub fn generate_obstacle<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        tuning: &Tuning,
    ) -> Option<Obstacle> {
        let world = &tuning.world;
        for _ in 0..8 {
            let pos = random_point(rng, world.spawn_extent);
            let radius = world.obstacle_min_radius
                + rng.random::<f64>() * (world.obstacle_max_radius - world.obstacle_min_radius);
            if pos.length() >= world.obstacle_clearance + radius {
                let id = self.next_entity_id();
                return Some(Obstacle { id, pos, radius });
            }
        }
        None
    }

    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// True if any edge joins `a` and `b`, in either direction
    pub fn has_edge_between(&self, a: EntityId, b: EntityId) -> bool {
        self.edges.iter().any(|e| e.connects(a, b))
    }

    #[inline]
    pub fn has_upgrade(&self, id: UpgradeId) -> bool {
        self.upgrades.has(id)
    }

    /// True while `skill`'s effect has not reached its expiry tick
    pub fn effect_active(&self, skill: Skill) -> bool {
        self.active_effects
            .get(&skill)
            .is_some_and(|&expiry| self.tick < expiry)
    }

    #[inline]
    pub fn god_mode(&self) -> bool {
        self.effect_active(Skill::GodMode)
    }

    pub fn invasion_active(&self) -> bool {
        self.invasion_ticks > 0
    }

    pub fn compliant_desks(&self) -> usize {
        self.desks.iter().filter(|d| d.compliant).count()
    }

    /// Record an event for the presentation layer
    pub fn emit(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Add a particle, dropping it if the pool is full
    pub fn push_particle(&mut self, particle: Particle) {
        if self.particles.len() < MAX_PARTICLES {
            self.particles.push(particle);
        }
    }

    /// Validate the structural invariants the simulation relies on
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if !self.nodes.iter().any(Node::is_source) {
            return Err(InvariantViolation::NoSource);
        }
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(InvariantViolation::DuplicateNodeId(node.id));
            }
            if !node.pos.is_finite() {
                return Err(InvariantViolation::NonFinitePosition(node.id));
            }
        }
        if !self.resources.is_finite() {
            return Err(InvariantViolation::NonFiniteResources);
        }
        Ok(())
    }
}

/// Uniform point in [-extent, extent]²
pub fn random_point<R: Rng + ?Sized>(rng: &mut R, extent: f64) -> DVec2 {
    DVec2::new(
        (rng.random::<f64>() * 2.0 - 1.0) * extent,
        (rng.random::<f64>() * 2.0 - 1.0) * extent,
    )
}

/// Bernoulli trial that tolerates probabilities outside [0, 1]
#[inline]
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.random::<f64>() < p
}
