//! Secondary systems run after fluid, economy and rebasing
//!
//! Order inside the pass is fixed: idle clock, spawners, enemy drift,
//! particles, permits, invasion countdown, passive bonuses, then timed
//! effect expiry. The god-mode revert is the very last write of the tick
//! so nothing earlier can leak into the restored resources.

use glam::DVec2;
use rand::Rng;

use super::collision::any_node_within;
use super::state::{Desk, Enemy, Prism, PrismKind, SimEvent, WorldState, chance, random_point};
use super::upgrades::{Skill, UpgradeId};
use crate::tuning::Tuning;

/// Run every secondary system for one tick
pub fn update<R: Rng + ?Sized>(state: &mut WorldState, dt: f64, tuning: &Tuning, rng: &mut R) {
    state.idle_ticks = state.idle_ticks.saturating_add(1);

    spawn_enemy(state, tuning, rng);
    spawn_obstacle(state, tuning, rng);
    spawn_desk(state, tuning, rng);
    spawn_watermark(state, tuning, rng);

    drift_enemies(state, dt);
    update_particles(state, dt);
    issue_permits(state, tuning);

    if state.invasion_ticks > 0 {
        state.invasion_ticks -= 1;
        if state.invasion_ticks == 0 {
            log::info!("invasion ended at tick {}", state.tick);
        }
    }

    apply_passives(state, tuning);
    expire_effects(state);
}

fn spawn_enemy<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) {
    let world = &tuning.world;
    if state.enemies.len() >= world.max_enemies {
        return;
    }
    let mut p = world.enemy_spawn_chance;
    if state.invasion_active() {
        p *= 2.0;
    }
    if !chance(rng, p) {
        return;
    }

    let pos = random_point(rng, world.spawn_extent);
    let heading = rng.random::<f64>() * std::f64::consts::TAU;
    let id = state.next_entity_id();
    state.enemies.push(Enemy {
        id,
        pos,
        vel: DVec2::from_angle(heading) * world.enemy_speed,
        radius: world.enemy_radius,
        ttl_ticks: world.enemy_ttl_ticks,
    });
}

fn spawn_obstacle<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) {
    let world = &tuning.world;
    if state.obstacles.len() >= world.max_obstacles || !chance(rng, world.obstacle_spawn_chance) {
        return;
    }
    if let Some(obstacle) = state.generate_obstacle(rng, tuning) {
        // never drop terrain on top of the network
        let reach = obstacle.radius + tuning.build.node_radius;
        if !any_node_within(&state.nodes, obstacle.pos, reach) {
            state.obstacles.push(obstacle);
        }
    }
}

fn spawn_desk<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) {
    let world = &tuning.world;
    if state.desks.len() >= world.max_desks || !chance(rng, world.desk_spawn_chance) {
        return;
    }
    let pos = random_point(rng, world.spawn_extent);
    let id = state.next_entity_id();
    state.desks.push(Desk {
        id,
        pos,
        compliant: false,
    });
}

/// At most one watermark exists at a time
fn spawn_watermark<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) {
    if state.invasion_active()
        || state.prisms.iter().any(|p| p.kind == PrismKind::Watermark)
        || !chance(rng, tuning.world.watermark_spawn_chance)
    {
        return;
    }
    let pos = random_point(rng, tuning.economy.prism_spawn_extent);
    let id = state.next_entity_id();
    state.prisms.push(Prism {
        id,
        pos,
        value: 0.0,
        kind: PrismKind::Watermark,
    });
}

fn drift_enemies(state: &mut WorldState, dt: f64) {
    for enemy in &mut state.enemies {
        let next = enemy.pos + enemy.vel * dt;
        if next.is_finite() {
            enemy.pos = next;
        }
        enemy.ttl_ticks = enemy.ttl_ticks.saturating_sub(1);
    }
    state.enemies.retain(|e| e.ttl_ticks > 0);
}

fn update_particles(state: &mut WorldState, dt: f64) {
    for particle in state.particles.iter_mut() {
        particle.pos += particle.vel * dt;
        particle.vel *= 0.98;
        particle.life -= dt * 1.5;
        particle.size *= 0.995;
    }
    state.particles.retain(|p| p.life > 0.0);
}

fn issue_permits(state: &mut WorldState, tuning: &Tuning) {
    let interval = tuning.world.permit_interval_ticks;
    if interval == 0 || state.tick == 0 || state.tick % interval != 0 {
        return;
    }
    if state.compliant_desks() == 0 {
        return;
    }
    let issuing: Vec<_> = state
        .desks
        .iter()
        .filter(|d| d.compliant)
        .map(|d| d.id)
        .collect();
    for desk in issuing {
        state.permits = state.permits.saturating_add(1);
        state.emit(SimEvent::PermitIssued { desk });
    }
}

/// Upgrade bonuses that read values produced earlier in the tick
fn apply_passives(state: &mut WorldState, tuning: &Tuning) {
    let world = &tuning.world;
    let tick = state.tick;
    let idle = state.idle_ticks;
    let generated = state.flux_generated;
    let prestige = f64::from(state.prestige_count);
    let upgrades = &state.upgrades;
    let r = &mut state.resources;

    if prestige > 0.0 {
        r.lucidity += tuning.economy.passive_lucidity * world.prestige_lucidity_bonus * prestige;
    }
    if upgrades.has(UpgradeId::ZeroPointEnergy) && generated.is_finite() {
        r.flux += (generated * world.zero_point_share).min(world.zero_point_cap);
    }
    if upgrades.has(UpgradeId::FluxCapacitor)
        && world.capacitor_interval_ticks > 0
        && tick > 0
        && tick % world.capacitor_interval_ticks == 0
    {
        r.flux += (r.flux * world.capacitor_share).min(world.capacitor_cap);
    }
    if upgrades.has(UpgradeId::FourthWallBreak) && idle > world.idle_threshold_ticks {
        r.lucidity += world.fourth_wall_lucidity;
    }
}

/// Drop effects that run out with the tick being completed. God mode hands
/// the backed-up resources back.
fn expire_effects(state: &mut WorldState) {
    let tick = state.tick + 1;
    state.cooldowns.retain(|_, ready_at| *ready_at > tick);

    let expired: Vec<Skill> = state
        .active_effects
        .iter()
        .filter(|&(_, &expiry)| tick >= expiry)
        .map(|(&skill, _)| skill)
        .collect();

    // god mode last so its restore is final
    let (god, others): (Vec<Skill>, Vec<Skill>) =
        expired.into_iter().partition(|&s| s == Skill::GodMode);
    for skill in others.into_iter().chain(god) {
        state.active_effects.remove(&skill);
        if skill == Skill::GodMode {
            if let Some(backup) = state.backup_resources.take() {
                state.resources = backup;
                log::info!("god mode expired at tick {tick}, resources restored");
            }
        }
        state.emit(SimEvent::EffectExpired { skill });
    }
}
