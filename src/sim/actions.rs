//! Player actions
//!
//! Every handler validates completely before it writes anything, so a
//! rejected action leaves the world exactly as it was.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::collision::{Blocker, enemy_blocking, nearest_rim_distance, obstacle_blocking};
use super::economy::{digestion_multiplier, spawn_burst};
use super::state::{
    Edge, EntityId, Node, NodeKind, PrismKind, Resources, SimEvent, WorldState, chance,
};
use super::upgrades::{EFFICIENT_SPORULATION_FACTOR, MYCORRHIZAL_FACTOR, Skill, UpgradeId};
use crate::consts::{DIMENSION_MAX, DIMENSION_MIN, ZOOM_MAX, ZOOM_MIN};
use crate::tuning::Tuning;

const MITOSIS_SALT: u64 = 0x4D17;
const COLLECT_SALT: u64 = 0xC011;

/// Inbound intent from the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Advance the simulation; `dt` defaults to one 60 Hz frame
    Tick {
        #[serde(default)]
        dt: Option<f64>,
    },
    AddNode {
        x: f64,
        y: f64,
        #[serde(default)]
        free: bool,
    },
    AddEdge {
        source: EntityId,
        target: EntityId,
    },
    BuildAndConnect {
        x: f64,
        y: f64,
        source: EntityId,
    },
    CollectPrism {
        id: EntityId,
    },
    UnlockUpgrade {
        id: UpgradeId,
    },
    ActivateSkill {
        skill: Skill,
    },
    /// Screen-space pan; divided by zoom before it reaches the camera
    PanCamera {
        dx: f64,
        dy: f64,
    },
    Zoom {
        delta: f64,
    },
    ProcessDesk {
        id: EntityId,
    },
    ShiftDimension {
        dimension: u8,
    },
    Prestige,
    HardReset,
}

impl Action {
    /// True for anything the player did, as opposed to the frame clock
    pub fn is_player_input(&self) -> bool {
        !matches!(self, Action::Tick { .. })
    }
}

/// Why an action was turned down. Never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("cannot afford {needed:?}")]
    Insufficient { needed: Resources },
    #[error("no node with id {0}")]
    UnknownNode(EntityId),
    #[error("no prism with id {0}")]
    UnknownPrism(EntityId),
    #[error("no desk with id {0}")]
    UnknownDesk(EntityId),
    #[error("desk {0} is already compliant")]
    AlreadyCompliant(EntityId),
    #[error("nodes {0} and {1} are already connected")]
    DuplicateEdge(EntityId, EntityId),
    #[error("cannot connect node {0} to itself")]
    SelfLoop(EntityId),
    #[error("edge length {length:.1} exceeds {max:.1}")]
    TooLong { length: f64, max: f64 },
    #[error("position is not finite")]
    InvalidPosition,
    #[error("blocked by {0:?}")]
    Blocked(Blocker),
    #[error("upgrade {0:?} is already unlocked")]
    AlreadyUnlocked(UpgradeId),
    #[error("requires upgrade {0:?}")]
    MissingParent(UpgradeId),
    #[error("requires {required} permits, holding {held}")]
    NotEnoughPermits { required: u32, held: u32 },
    #[error("skill {0:?} is not unlocked")]
    SkillLocked(Skill),
    #[error("skill {skill:?} is on cooldown until tick {ready_at}")]
    OnCooldown { skill: Skill, ready_at: u64 },
    #[error("skill {0:?} is still active")]
    SkillActive(Skill),
    #[error("cannot shift to dimension {0}")]
    InvalidDimension(u8),
    #[error("simulation has crashed")]
    Crashed,
}

/// Apply a non-tick action. `Tick` is driven by the orchestrator and is a
/// no-op here.
pub fn apply(state: &mut WorldState, action: &Action, tuning: &Tuning) -> Result<(), Rejection> {
    if state.crashed && !matches!(action, Action::HardReset) {
        return Err(Rejection::Crashed);
    }

    match *action {
        Action::Tick { .. } => Ok(()),
        Action::AddNode { x, y, free } => add_node(state, DVec2::new(x, y), free, tuning).map(drop),
        Action::AddEdge { source, target } => add_edge(state, source, target, tuning).map(drop),
        Action::BuildAndConnect { x, y, source } => {
            build_and_connect(state, DVec2::new(x, y), source, tuning)
        }
        Action::CollectPrism { id } => collect_prism(state, id, tuning),
        Action::UnlockUpgrade { id } => unlock_upgrade(state, id, tuning),
        Action::ActivateSkill { skill } => activate_skill(state, skill, tuning),
        Action::PanCamera { dx, dy } => pan_camera(state, dx, dy),
        Action::Zoom { delta } => zoom(state, delta),
        Action::ProcessDesk { id } => process_desk(state, id, tuning),
        Action::ShiftDimension { dimension } => shift_dimension(state, dimension, tuning),
        Action::Prestige => prestige(state, tuning),
        Action::HardReset => {
            hard_reset(state, tuning);
            Ok(())
        }
    }
}

/// Stardust cost of a node at `pos` before any mitosis waiver
pub fn node_cost(state: &WorldState, pos: DVec2, tuning: &Tuning) -> f64 {
    let build = &tuning.build;
    let mut cost = build.cost_node;
    if state.has_upgrade(UpgradeId::EfficientSporulation) {
        cost *= EFFICIENT_SPORULATION_FACTOR;
    }
    if state.has_upgrade(UpgradeId::WallClinging)
        && nearest_rim_distance(&state.obstacles, pos).is_some_and(|d| d <= build.wall_cling_range)
    {
        cost *= build.wall_cling_discount;
    }
    cost
}

/// Stardust cost of one edge
pub fn edge_cost(state: &WorldState, tuning: &Tuning) -> f64 {
    if state.has_upgrade(UpgradeId::MycorrhizalNetwork) {
        tuning.build.cost_edge * MYCORRHIZAL_FACTOR
    } else {
        tuning.build.cost_edge
    }
}

/// Longest edge the player may build
pub fn max_edge_length(state: &WorldState, tuning: &Tuning) -> f64 {
    tuning.build.max_edge_length * state.upgrades.edge_length_factor()
}

fn require_stardust(state: &WorldState, amount: f64) -> Result<(), Rejection> {
    if state.god_mode() || state.resources.stardust >= amount {
        Ok(())
    } else {
        Err(Rejection::Insufficient {
            needed: Resources::stardust(amount),
        })
    }
}

fn require_lucidity(state: &WorldState, amount: f64) -> Result<(), Rejection> {
    if state.god_mode() || state.resources.lucidity >= amount {
        Ok(())
    } else {
        Err(Rejection::Insufficient {
            needed: Resources::lucidity(amount),
        })
    }
}

/// Check that a node can stand at `pos`
fn check_site(state: &WorldState, pos: DVec2, tuning: &Tuning) -> Result<(), Rejection> {
    if !pos.is_finite() {
        return Err(Rejection::InvalidPosition);
    }
    if state.god_mode() {
        return Ok(());
    }
    let radius = tuning.build.node_radius;
    if let Some(blocker) = obstacle_blocking(&state.obstacles, pos, radius) {
        return Err(Rejection::Blocked(blocker));
    }
    if !state.has_upgrade(UpgradeId::ParasiticEmbedding) {
        if let Some(blocker) = enemy_blocking(&state.enemies, pos, radius) {
            return Err(Rejection::Blocked(blocker));
        }
    }
    Ok(())
}

fn check_span(state: &WorldState, from: DVec2, to: DVec2, tuning: &Tuning) -> Result<(), Rejection> {
    let length = from.distance(to);
    let max = max_edge_length(state, tuning);
    if length > max {
        return Err(Rejection::TooLong { length, max });
    }
    Ok(())
}

/// Build a relay node. Returns the new node's id.
pub fn add_node(
    state: &mut WorldState,
    pos: DVec2,
    free: bool,
    tuning: &Tuning,
) -> Result<EntityId, Rejection> {
    check_site(state, pos, tuning)?;
    let cost = node_cost(state, pos, tuning);
    if !free {
        require_stardust(state, cost)?;
    }

    let waived = !free
        && state.has_upgrade(UpgradeId::MitosisLottery)
        && chance(&mut state.action_rng(MITOSIS_SALT), tuning.build.mitosis_chance);
    if waived {
        log::debug!("mitosis lottery waived node cost {cost:.1}");
    }
    let free = free || waived;
    if !free {
        state.resources.deduct(&Resources::stardust(cost));
    }

    let id = state.next_entity_id();
    state.nodes.push(Node::new(id, NodeKind::Relay, pos));
    state.emit(SimEvent::NodeBuilt { id, free });

    let every = tuning.build.fractal_every;
    if state.has_upgrade(UpgradeId::FractalBranching) && every > 0 && state.nodes.len() % every == 0
    {
        branch(state, id, pos, tuning);
    }
    Ok(id)
}

/// Fractal branching: two free blobs either side of `parent`, each wired
/// back to it. Sites that are blocked are skipped.
fn branch(state: &mut WorldState, parent: EntityId, pos: DVec2, tuning: &Tuning) {
    let offset = DVec2::new(tuning.build.fractal_offset, 0.0);
    for site in [pos - offset, pos + offset] {
        if check_site(state, site, tuning).is_err() {
            continue;
        }
        let id = state.next_entity_id();
        state.nodes.push(Node::new(id, NodeKind::Blob, site));
        state.emit(SimEvent::NodeBuilt { id, free: true });
        push_edge(state, parent, id, tuning);
    }
}

fn push_edge(state: &mut WorldState, source: EntityId, target: EntityId, tuning: &Tuning) -> EntityId {
    let id = state.next_entity_id();
    state.edges.push(Edge {
        id,
        source,
        target,
        flow: 0.0,
        resistance: tuning.fluid.edge_resistance,
    });
    state.emit(SimEvent::EdgeBuilt { id });
    id
}

/// Connect two existing nodes. Returns the new edge's id.
pub fn add_edge(
    state: &mut WorldState,
    source: EntityId,
    target: EntityId,
    tuning: &Tuning,
) -> Result<EntityId, Rejection> {
    if source == target {
        return Err(Rejection::SelfLoop(source));
    }
    let from = state.node(source).ok_or(Rejection::UnknownNode(source))?.pos;
    let to = state.node(target).ok_or(Rejection::UnknownNode(target))?.pos;
    if state.has_edge_between(source, target) {
        return Err(Rejection::DuplicateEdge(source, target));
    }
    check_span(state, from, to, tuning)?;
    let cost = edge_cost(state, tuning);
    require_stardust(state, cost)?;

    state.resources.deduct(&Resources::stardust(cost));
    Ok(push_edge(state, source, target, tuning))
}

/// Build a node at `pos` and wire it from `source` as one purchase
fn build_and_connect(
    state: &mut WorldState,
    pos: DVec2,
    source: EntityId,
    tuning: &Tuning,
) -> Result<(), Rejection> {
    let from = state.node(source).ok_or(Rejection::UnknownNode(source))?.pos;
    check_site(state, pos, tuning)?;
    check_span(state, from, pos, tuning)?;
    let edge = edge_cost(state, tuning);
    require_stardust(state, node_cost(state, pos, tuning) + edge)?;

    let target = add_node(state, pos, false, tuning)?;
    state.resources.deduct(&Resources::stardust(edge));
    push_edge(state, source, target, tuning);
    Ok(())
}

/// Manually collect a prism anywhere on the map
fn collect_prism(state: &mut WorldState, id: EntityId, tuning: &Tuning) -> Result<(), Rejection> {
    let index = state
        .prisms
        .iter()
        .position(|p| p.id == id)
        .ok_or(Rejection::UnknownPrism(id))?;
    let prism = state.prisms.remove(index);

    if prism.kind == PrismKind::Watermark {
        state.invasion_ticks = tuning.world.invasion_duration_ticks;
        log::info!("watermark collected, invasion for {} ticks", state.invasion_ticks);
        state.emit(SimEvent::InvasionStarted);
        return Ok(());
    }

    let value = crate::finite_or(prism.value * digestion_multiplier(state), 0.0);
    state.resources.stardust += value;
    state.emit(SimEvent::PrismCollected { id, value });
    let mut rng = state.action_rng(COLLECT_SALT);
    spawn_burst(state, prism.pos, tuning.world.particle_burst, &mut rng);
    Ok(())
}

fn unlock_upgrade(state: &mut WorldState, id: UpgradeId, tuning: &Tuning) -> Result<(), Rejection> {
    if state.has_upgrade(id) {
        return Err(Rejection::AlreadyUnlocked(id));
    }
    let def = id.def();
    if let Some(parent) = def.parent {
        if !state.has_upgrade(parent) {
            return Err(Rejection::MissingParent(parent));
        }
    }
    if state.permits < def.permits_required {
        return Err(Rejection::NotEnoughPermits {
            required: def.permits_required,
            held: state.permits,
        });
    }
    let cost = id.cost(tuning);
    if !state.god_mode() && !state.resources.covers(&cost) {
        return Err(Rejection::Insufficient { needed: cost });
    }

    state.resources.deduct(&cost);
    state.upgrades.unlock(id);
    log::info!("unlocked {} at tick {}", id.as_str(), state.tick);
    state.emit(SimEvent::UpgradeUnlocked { id });
    Ok(())
}

fn activate_skill(state: &mut WorldState, skill: Skill, tuning: &Tuning) -> Result<(), Rejection> {
    if !state.has_upgrade(skill.required_upgrade()) {
        return Err(Rejection::SkillLocked(skill));
    }
    if let Some(&ready_at) = state.cooldowns.get(&skill) {
        if ready_at > state.tick {
            return Err(Rejection::OnCooldown { skill, ready_at });
        }
    }

    if skill == Skill::GodMode {
        if state.backup_resources.is_none() {
            state.backup_resources = Some(state.resources);
        }
        state.resources = Resources::splat(tuning.skills.god_mode_amount);
    }
    let tick = state.tick;
    state
        .active_effects
        .insert(skill, tick + skill.duration_ticks(tuning));
    state
        .cooldowns
        .insert(skill, tick + skill.cooldown_ticks(tuning));
    log::info!("{} activated at tick {tick}", skill.as_str());
    state.emit(SimEvent::SkillActivated { skill });
    Ok(())
}

fn pan_camera(state: &mut WorldState, dx: f64, dy: f64) -> Result<(), Rejection> {
    let delta = DVec2::new(dx, dy) / state.camera.zoom;
    if !delta.is_finite() {
        return Err(Rejection::InvalidPosition);
    }
    state.camera.offset += delta;
    Ok(())
}

fn zoom(state: &mut WorldState, delta: f64) -> Result<(), Rejection> {
    if !delta.is_finite() {
        return Err(Rejection::InvalidPosition);
    }
    state.camera.zoom = (state.camera.zoom + delta).clamp(ZOOM_MIN, ZOOM_MAX);
    Ok(())
}

fn process_desk(state: &mut WorldState, id: EntityId, tuning: &Tuning) -> Result<(), Rejection> {
    let desk = state
        .desks
        .iter()
        .find(|d| d.id == id)
        .ok_or(Rejection::UnknownDesk(id))?;
    if desk.compliant {
        return Err(Rejection::AlreadyCompliant(id));
    }
    let cost = tuning.build.desk_compliance_cost;
    require_lucidity(state, cost)?;

    state.resources.deduct(&Resources::lucidity(cost));
    if let Some(desk) = state.desks.iter_mut().find(|d| d.id == id) {
        desk.compliant = true;
    }
    state.emit(SimEvent::DeskProcessed { id });
    Ok(())
}

fn shift_dimension(state: &mut WorldState, dimension: u8, tuning: &Tuning) -> Result<(), Rejection> {
    if !state.has_upgrade(UpgradeId::DimensionalRift) {
        return Err(Rejection::MissingParent(UpgradeId::DimensionalRift));
    }
    if !(DIMENSION_MIN..=DIMENSION_MAX).contains(&dimension) || dimension == state.dimension {
        return Err(Rejection::InvalidDimension(dimension));
    }
    let cost = tuning.build.dimension_shift_cost;
    require_lucidity(state, cost)?;

    state.resources.deduct(&Resources::lucidity(cost));
    state.dimension = dimension;
    log::info!("shifted to dimension {dimension}");
    state.emit(SimEvent::DimensionShifted { dimension });
    Ok(())
}

/// Trade the current run for a permanent lucidity bonus
fn prestige(state: &mut WorldState, tuning: &Tuning) -> Result<(), Rejection> {
    // god mode resources are borrowed, not earned
    if state.god_mode() {
        return Err(Rejection::SkillActive(Skill::GodMode));
    }
    let threshold = tuning.build.prestige_threshold;
    if state.resources.stardust < threshold {
        return Err(Rejection::Insufficient {
            needed: Resources::stardust(threshold),
        });
    }

    let stardust = state.resources.stardust;
    let ticks = state.tick;
    let count = state.prestige_count + 1;
    *state = WorldState::with_tuning(state.rng_state.seed, tuning);
    state.prestige_count = count;
    log::info!("prestige #{count} with {stardust:.0} stardust after {ticks} ticks");
    state.emit(SimEvent::Prestiged { stardust, ticks });
    Ok(())
}

/// Start over from scratch, clearing the crashed flag
pub fn hard_reset(state: &mut WorldState, tuning: &Tuning) {
    let seed = state.rng_state.seed;
    *state = WorldState::with_tuning(seed, tuning);
    log::info!("hard reset (seed {seed})");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Desk, Enemy, Obstacle, Prism};

    /// Fresh world with no random obstacles
    fn open_world() -> WorldState {
        let mut state = WorldState::new(1);
        state.obstacles.clear();
        state
    }

    fn place(state: &mut WorldState, x: f64, y: f64) -> EntityId {
        let id = state.next_entity_id();
        state.nodes.push(Node::new(id, NodeKind::Relay, DVec2::new(x, y)));
        id
    }

    fn source_id(state: &WorldState) -> EntityId {
        state.nodes[0].id
    }

    #[test]
    fn test_basic_build() {
        let tuning = Tuning::default();
        let mut state = WorldState::new(1);
        let action = Action::AddNode {
            x: 50.0,
            y: 0.0,
            free: false,
        };
        assert!(apply(&mut state, &action, &tuning).is_ok());
        assert_eq!(state.resources.stardust, 50.0);
        assert_eq!(state.nodes.len(), 2);
        assert_eq!(state.nodes[1].kind, NodeKind::Relay);
    }

    #[test]
    fn test_unaffordable_node_is_atomic() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.resources.stardust = 49.0;
        let nodes = state.nodes.clone();
        let resources = state.resources;
        let result = add_node(&mut state, DVec2::new(50.0, 0.0), false, &tuning);
        assert!(matches!(result, Err(Rejection::Insufficient { .. })));
        assert_eq!(state.nodes, nodes);
        assert_eq!(state.resources, resources);
    }

    #[test]
    fn test_free_node_costs_nothing() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.resources.stardust = 0.0;
        assert!(add_node(&mut state, DVec2::new(50.0, 0.0), true, &tuning).is_ok());
        assert_eq!(state.resources.stardust, 0.0);
    }

    #[test]
    fn test_obstacle_blocks_unless_god_mode() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.obstacles.push(Obstacle {
            id: 500,
            pos: DVec2::new(300.0, 0.0),
            radius: 40.0,
        });
        let at = DVec2::new(320.0, 0.0);
        assert_eq!(
            add_node(&mut state, at, false, &tuning),
            Err(Rejection::Blocked(Blocker::Obstacle(500)))
        );
        state.active_effects.insert(Skill::GodMode, 10);
        assert!(add_node(&mut state, at, false, &tuning).is_ok());
    }

    #[test]
    fn test_enemy_blocks_unless_parasitic() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.enemies.push(Enemy {
            id: 600,
            pos: DVec2::new(100.0, 0.0),
            vel: DVec2::ZERO,
            radius: 25.0,
            ttl_ticks: 100,
        });
        let at = DVec2::new(110.0, 0.0);
        assert_eq!(
            add_node(&mut state, at, false, &tuning),
            Err(Rejection::Blocked(Blocker::Enemy(600)))
        );
        state.upgrades.unlock(UpgradeId::ParasiticEmbedding);
        assert!(add_node(&mut state, at, false, &tuning).is_ok());
    }

    #[test]
    fn test_node_cost_modifiers() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.obstacles.push(Obstacle {
            id: 500,
            pos: DVec2::new(200.0, 0.0),
            radius: 50.0,
        });
        let near = DVec2::new(100.0, 0.0);
        let far = DVec2::new(-300.0, 0.0);
        assert_eq!(node_cost(&state, near, &tuning), 50.0);

        state.upgrades.unlock(UpgradeId::WallClinging);
        assert_eq!(node_cost(&state, near, &tuning), 25.0);
        assert_eq!(node_cost(&state, far, &tuning), 50.0);

        state.upgrades.unlock(UpgradeId::EfficientSporulation);
        assert!((node_cost(&state, near, &tuning) - 20.0).abs() < 1e-9);
        assert!((node_cost(&state, far, &tuning) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_mitosis_lottery_waives_cost() {
        let mut tuning = Tuning::default();
        tuning.build.mitosis_chance = 1.0;
        let mut state = open_world();
        state.upgrades.unlock(UpgradeId::MitosisLottery);
        assert!(add_node(&mut state, DVec2::new(50.0, 0.0), false, &tuning).is_ok());
        assert_eq!(state.resources.stardust, 100.0);
        assert_eq!(
            state.events[0],
            SimEvent::NodeBuilt {
                id: state.nodes[1].id,
                free: true
            }
        );
    }

    #[test]
    fn test_fractal_branching_on_tenth_node() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.upgrades.unlock(UpgradeId::FractalBranching);
        for i in 1..9 {
            add_node(&mut state, DVec2::new(0.0, 100.0 * i as f64), true, &tuning).unwrap();
        }
        assert_eq!(state.nodes.len(), 9);
        assert!(state.edges.is_empty());

        let tenth = add_node(&mut state, DVec2::new(0.0, 1000.0), true, &tuning).unwrap();
        assert_eq!(state.nodes.len(), 12);
        assert_eq!(state.edges.len(), 2);
        let blobs: Vec<_> = state
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Blob)
            .collect();
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].pos, DVec2::new(-60.0, 1000.0));
        assert_eq!(blobs[1].pos, DVec2::new(60.0, 1000.0));
        assert!(state.edges.iter().all(|e| e.source == tenth));
    }

    #[test]
    fn test_edge_rejected_when_too_long() {
        let tuning = Tuning::default();
        let mut state = open_world();
        let a = place(&mut state, 0.0, 100.0);
        let b = place(&mut state, 600.0, 100.0);
        assert!(matches!(
            add_edge(&mut state, a, b, &tuning),
            Err(Rejection::TooLong { .. })
        ));
        assert!(state.edges.is_empty());
        assert_eq!(state.resources.stardust, 100.0);

        state.upgrades.unlock(UpgradeId::LongHyphae);
        assert!(add_edge(&mut state, a, b, &tuning).is_ok());
    }

    #[test]
    fn test_edge_unique_in_both_directions() {
        let tuning = Tuning::default();
        let mut state = open_world();
        let a = source_id(&state);
        let b = place(&mut state, 100.0, 0.0);
        assert!(add_edge(&mut state, a, b, &tuning).is_ok());
        assert_eq!(state.resources.stardust, 90.0);
        assert_eq!(
            add_edge(&mut state, b, a, &tuning),
            Err(Rejection::DuplicateEdge(b, a))
        );
        assert_eq!(
            add_edge(&mut state, a, b, &tuning),
            Err(Rejection::DuplicateEdge(a, b))
        );
        assert_eq!(state.edges.len(), 1);
    }

    #[test]
    fn test_edge_reference_checks() {
        let tuning = Tuning::default();
        let mut state = open_world();
        let a = source_id(&state);
        assert_eq!(add_edge(&mut state, a, a, &tuning), Err(Rejection::SelfLoop(a)));
        assert_eq!(
            add_edge(&mut state, a, 9999, &tuning),
            Err(Rejection::UnknownNode(9999))
        );
    }

    #[test]
    fn test_mycorrhizal_halves_edge_cost() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.upgrades.unlock(UpgradeId::MycorrhizalNetwork);
        let a = source_id(&state);
        let b = place(&mut state, 100.0, 0.0);
        add_edge(&mut state, a, b, &tuning).unwrap();
        assert_eq!(state.resources.stardust, 95.0);
    }

    #[test]
    fn test_build_and_connect() {
        let tuning = Tuning::default();
        let mut state = open_world();
        let source = source_id(&state);
        let action = Action::BuildAndConnect {
            x: 100.0,
            y: 0.0,
            source,
        };
        assert!(apply(&mut state, &action, &tuning).is_ok());
        assert_eq!(state.resources.stardust, 40.0);
        assert_eq!(state.nodes.len(), 2);
        assert_eq!(state.edges.len(), 1);
        assert!(state.edges[0].connects(source, state.nodes[1].id));
    }

    #[test]
    fn test_build_and_connect_is_atomic() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.resources.stardust = 55.0;
        let source = source_id(&state);
        let action = Action::BuildAndConnect {
            x: 100.0,
            y: 0.0,
            source,
        };
        assert!(matches!(
            apply(&mut state, &action, &tuning),
            Err(Rejection::Insufficient { .. })
        ));
        assert_eq!(state.nodes.len(), 1);
        assert_eq!(state.resources.stardust, 55.0);

        state.resources.stardust = 100.0;
        let far = Action::BuildAndConnect {
            x: 700.0,
            y: 0.0,
            source,
        };
        assert!(matches!(
            apply(&mut state, &far, &tuning),
            Err(Rejection::TooLong { .. })
        ));
        assert_eq!(state.nodes.len(), 1);
    }

    #[test]
    fn test_collect_prism() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.prisms.push(Prism {
            id: 77,
            pos: DVec2::new(400.0, 400.0),
            value: 20.0,
            kind: PrismKind::Isotope322,
        });
        state.upgrades.unlock(UpgradeId::DigestiveEnzymes);
        apply(&mut state, &Action::CollectPrism { id: 77 }, &tuning).unwrap();
        assert_eq!(state.resources.stardust, 130.0);
        assert!(state.prisms.is_empty());
        assert_eq!(
            apply(&mut state, &Action::CollectPrism { id: 77 }, &tuning),
            Err(Rejection::UnknownPrism(77))
        );
    }

    #[test]
    fn test_collect_watermark_starts_invasion() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.prisms.push(Prism {
            id: 78,
            pos: DVec2::ZERO,
            value: 0.0,
            kind: PrismKind::Watermark,
        });
        apply(&mut state, &Action::CollectPrism { id: 78 }, &tuning).unwrap();
        assert_eq!(state.resources.stardust, 100.0);
        assert_eq!(state.invasion_ticks, 1800);
        assert_eq!(state.events, vec![SimEvent::InvasionStarted]);
    }

    #[test]
    fn test_unlock_prerequisites() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.resources = Resources::splat(10_000.0);

        assert_eq!(
            unlock_upgrade(&mut state, UpgradeId::Overclocked, &tuning),
            Err(Rejection::MissingParent(UpgradeId::ActiveTransport))
        );
        assert_eq!(
            unlock_upgrade(&mut state, UpgradeId::SingularityCore, &tuning),
            Err(Rejection::NotEnoughPermits {
                required: 3,
                held: 0
            })
        );

        unlock_upgrade(&mut state, UpgradeId::ActiveTransport, &tuning).unwrap();
        assert_eq!(state.resources.stardust, 9_850.0);
        assert_eq!(
            unlock_upgrade(&mut state, UpgradeId::ActiveTransport, &tuning),
            Err(Rejection::AlreadyUnlocked(UpgradeId::ActiveTransport))
        );
        unlock_upgrade(&mut state, UpgradeId::Overclocked, &tuning).unwrap();
        assert!(state.has_upgrade(UpgradeId::Overclocked));
    }

    #[test]
    fn test_unlock_unaffordable_is_atomic() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.resources = Resources::new(1_000.0, 0.0, 0.0);
        let result = unlock_upgrade(&mut state, UpgradeId::FluxCapacitor, &tuning);
        assert!(matches!(result, Err(Rejection::Insufficient { .. })));
        assert_eq!(state.resources, Resources::new(1_000.0, 0.0, 0.0));
        assert!(state.upgrades.is_empty());
    }

    #[test]
    fn test_god_mode_activation_and_cooldown() {
        let tuning = Tuning::default();
        let mut state = open_world();
        assert_eq!(
            activate_skill(&mut state, Skill::GodMode, &tuning),
            Err(Rejection::SkillLocked(Skill::GodMode))
        );

        state.upgrades.unlock(UpgradeId::GodMode);
        let before = state.resources;
        activate_skill(&mut state, Skill::GodMode, &tuning).unwrap();
        assert_eq!(state.resources, Resources::splat(999_999.0));
        assert_eq!(state.backup_resources, Some(before));
        assert_eq!(state.active_effects.get(&Skill::GodMode), Some(&600));
        assert_eq!(state.cooldowns.get(&Skill::GodMode), Some(&3600));

        state.tick = 3599;
        assert_eq!(
            activate_skill(&mut state, Skill::GodMode, &tuning),
            Err(Rejection::OnCooldown {
                skill: Skill::GodMode,
                ready_at: 3600
            })
        );
    }

    #[test]
    fn test_camera_pan_and_zoom() {
        let tuning = Tuning::default();
        let mut state = open_world();
        apply(&mut state, &Action::Zoom { delta: 1.0 }, &tuning).unwrap();
        assert_eq!(state.camera.zoom, 2.0);
        apply(&mut state, &Action::PanCamera { dx: 10.0, dy: -4.0 }, &tuning).unwrap();
        assert_eq!(state.camera.offset, DVec2::new(5.0, -2.0));

        apply(&mut state, &Action::Zoom { delta: 100.0 }, &tuning).unwrap();
        assert_eq!(state.camera.zoom, ZOOM_MAX);
        apply(&mut state, &Action::Zoom { delta: -100.0 }, &tuning).unwrap();
        assert_eq!(state.camera.zoom, ZOOM_MIN);
        assert!(apply(&mut state, &Action::Zoom { delta: f64::NAN }, &tuning).is_err());
    }

    #[test]
    fn test_process_desk() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.desks.push(Desk {
            id: 300,
            pos: DVec2::ZERO,
            compliant: false,
        });
        let action = Action::ProcessDesk { id: 300 };
        assert!(matches!(
            apply(&mut state, &action, &tuning),
            Err(Rejection::Insufficient { .. })
        ));

        state.resources.lucidity = 6.0;
        apply(&mut state, &action, &tuning).unwrap();
        assert!(state.desks[0].compliant);
        assert_eq!(state.resources.lucidity, 1.0);
        assert_eq!(
            apply(&mut state, &action, &tuning),
            Err(Rejection::AlreadyCompliant(300))
        );
        assert_eq!(
            apply(&mut state, &Action::ProcessDesk { id: 1 }, &tuning),
            Err(Rejection::UnknownDesk(1))
        );
    }

    #[test]
    fn test_shift_dimension() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.resources.lucidity = 25.0;
        let to = |dimension| Action::ShiftDimension { dimension };
        assert_eq!(
            apply(&mut state, &to(2), &tuning),
            Err(Rejection::MissingParent(UpgradeId::DimensionalRift))
        );

        state.upgrades.unlock(UpgradeId::DimensionalRift);
        assert_eq!(apply(&mut state, &to(5), &tuning), Err(Rejection::InvalidDimension(5)));
        assert_eq!(apply(&mut state, &to(1), &tuning), Err(Rejection::InvalidDimension(1)));
        apply(&mut state, &to(3), &tuning).unwrap();
        assert_eq!(state.dimension, 3);
        assert_eq!(state.resources.lucidity, 15.0);
    }

    #[test]
    fn test_prestige() {
        let tuning = Tuning::default();
        let mut state = open_world();
        place(&mut state, 40.0, 0.0);
        assert!(matches!(
            apply(&mut state, &Action::Prestige, &tuning),
            Err(Rejection::Insufficient { .. })
        ));

        state.resources.stardust = 12_000.0;
        state.tick = 5000;
        apply(&mut state, &Action::Prestige, &tuning).unwrap();
        assert_eq!(state.prestige_count, 1);
        assert_eq!(state.tick, 0);
        assert_eq!(state.nodes.len(), 1);
        assert_eq!(state.resources.stardust, 100.0);
        assert_eq!(
            state.events,
            vec![SimEvent::Prestiged {
                stardust: 12_000.0,
                ticks: 5000
            }]
        );
    }

    #[test]
    fn test_prestige_refused_during_god_mode() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.upgrades.unlock(UpgradeId::GodMode);
        let before = state.resources;
        activate_skill(&mut state, Skill::GodMode, &tuning).unwrap();
        state.events.clear();

        assert_eq!(
            apply(&mut state, &Action::Prestige, &tuning),
            Err(Rejection::SkillActive(Skill::GodMode))
        );
        assert_eq!(state.prestige_count, 0);
        assert_eq!(state.backup_resources, Some(before));
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_crashed_world_only_accepts_reset() {
        let tuning = Tuning::default();
        let mut state = open_world();
        state.crashed = true;
        let build = Action::AddNode {
            x: 50.0,
            y: 0.0,
            free: true,
        };
        assert_eq!(apply(&mut state, &build, &tuning), Err(Rejection::Crashed));
        apply(&mut state, &Action::HardReset, &tuning).unwrap();
        assert!(!state.crashed);
        assert!(apply(&mut state, &build, &tuning).is_ok());
    }

    #[test]
    fn test_action_wire_format() {
        let action: Action =
            serde_json::from_str(r#"{"type":"ADD_NODE","x":50.0,"y":0.0}"#).unwrap();
        assert_eq!(
            action,
            Action::AddNode {
                x: 50.0,
                y: 0.0,
                free: false
            }
        );
        let tick: Action = serde_json::from_str(r#"{"type":"TICK"}"#).unwrap();
        assert_eq!(tick, Action::Tick { dt: None });
        let unlock: Action =
            serde_json::from_str(r#"{"type":"UNLOCK_UPGRADE","id":"big_gulp"}"#).unwrap();
        assert_eq!(
            unlock,
            Action::UnlockUpgrade {
                id: UpgradeId::BigGulp
            }
        );
        assert!(!tick.is_player_input());
        assert!(unlock.is_player_input());
    }
}
