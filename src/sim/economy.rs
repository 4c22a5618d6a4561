//! Prism lifecycle and passive resource generation

use glam::DVec2;
use rand::Rng;

use super::collision::any_node_within;
use super::state::{Particle, Prism, PrismKind, SimEvent, WorldState, chance, random_point};
use super::upgrades::{
    BIG_GULP_FACTOR, DIGESTIVE_FACTOR, DIMENSION_3_DIGESTION_FACTOR, PIXEL_INTERPOLATION_FACTOR,
    SCAVENGER_FACTOR, Skill, UpgradeId,
};
use crate::finite_or;
use crate::tuning::Tuning;

/// Run one economy pass: spawn, reroll, digest, then passive income.
///
/// Returns the stardust gained from digestion.
pub fn process<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) -> f64 {
    spawn_prism(state, tuning, rng);
    reroll_quantum(state, tuning, rng);
    let digested = digest(state, tuning, rng);
    passive_income(state, tuning);
    digested
}

/// Current prism cap
pub fn prism_cap(state: &WorldState, tuning: &Tuning) -> usize {
    let cap = tuning.economy.max_prisms;
    if state.has_upgrade(UpgradeId::BigGulp) {
        cap * BIG_GULP_FACTOR
    } else {
        cap
    }
}

/// Multiplier applied to a prism's value when it becomes stardust
pub fn digestion_multiplier(state: &WorldState) -> f64 {
    let mut multiplier = 1.0;
    if state.has_upgrade(UpgradeId::DigestiveEnzymes) {
        multiplier *= DIGESTIVE_FACTOR;
    }
    if state.has_upgrade(UpgradeId::ScavengerEnzymes) {
        multiplier *= SCAVENGER_FACTOR;
    }
    if state.dimension == 3 {
        multiplier *= DIMENSION_3_DIGESTION_FACTOR;
    }
    if state.has_upgrade(UpgradeId::PixelInterpolation) {
        multiplier *= PIXEL_INTERPOLATION_FACTOR;
    }
    multiplier
}

/// Maybe spawn one prism somewhere in the spawn square
pub fn spawn_prism<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) {
    let economy = &tuning.economy;
    if state.invasion_active() || state.prisms.len() >= prism_cap(state, tuning) {
        return;
    }

    let mut p = economy.prism_spawn_chance;
    if state.effect_active(Skill::Overgrowth) {
        p *= tuning.skills.overgrowth_spawn_multiplier;
    }
    if !chance(rng, p) {
        return;
    }

    let pos = random_point(rng, economy.prism_spawn_extent);
    let mut value = economy.prism_base_value + rng.random::<f64>() * economy.prism_value_variance;
    let mut kind = PrismKind::default();
    if state.has_upgrade(UpgradeId::LuckyGlitch) && chance(rng, economy.lucky_glitch_chance) {
        value *= economy.lucky_glitch_multiplier;
        kind = PrismKind::GlitchedPrism;
    }

    let id = state.next_entity_id();
    state.prisms.push(Prism {
        id,
        pos,
        value,
        kind,
    });
}

/// `schrodingers_cat`: periodically reroll prism values
fn reroll_quantum<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) {
    let economy = &tuning.economy;
    if !state.has_upgrade(UpgradeId::SchrodingersCat)
        || economy.quantum_interval_ticks == 0
        || state.tick % economy.quantum_interval_ticks != 0
    {
        return;
    }

    let span = economy.quantum_max_value - economy.quantum_min_value;
    for prism in state
        .prisms
        .iter_mut()
        .filter(|p| p.kind != PrismKind::Watermark)
    {
        if chance(rng, economy.quantum_chance) {
            prism.value = economy.quantum_min_value + rng.random::<f64>() * span;
            prism.kind = PrismKind::Quantum;
        }
    }
}

/// Remove every prism within digestion radius of a node and pay it out.
/// Watermark prisms are never digested passively.
fn digest<R: Rng + ?Sized>(state: &mut WorldState, tuning: &Tuning, rng: &mut R) -> f64 {
    let radius = tuning.economy.digestion_radius;
    let prisms = std::mem::take(&mut state.prisms);
    let (digested, kept): (Vec<Prism>, Vec<Prism>) = prisms.into_iter().partition(|p| {
        p.kind != PrismKind::Watermark && any_node_within(&state.nodes, p.pos, radius)
    });
    state.prisms = kept;

    if digested.is_empty() {
        return 0.0;
    }

    let multiplier = digestion_multiplier(state);
    let mut gained = 0.0;
    for prism in digested {
        let value = finite_or(prism.value * multiplier, 0.0);
        gained += value;
        state.emit(SimEvent::PrismDigested {
            id: prism.id,
            value,
        });
        spawn_burst(state, prism.pos, tuning.world.particle_burst, rng);
    }
    state.resources.stardust += gained;
    gained
}

/// Cosmetic burst where a prism was consumed
pub fn spawn_burst<R: Rng + ?Sized>(state: &mut WorldState, at: DVec2, count: usize, rng: &mut R) {
    for _ in 0..count {
        let angle = rng.random::<f64>() * std::f64::consts::TAU;
        let speed = 40.0 + rng.random::<f64>() * 60.0;
        state.push_particle(Particle {
            pos: at,
            vel: DVec2::from_angle(angle) * speed,
            life: 1.0,
            size: 2.0 + rng.random::<f64>() * 3.0,
        });
    }
}

/// Per-tick income that does not depend on prisms
fn passive_income(state: &mut WorldState, tuning: &Tuning) {
    let economy = &tuning.economy;
    let desks = state.compliant_desks();
    let upgrades = &state.upgrades;
    let r = &mut state.resources;

    r.lucidity += economy.passive_lucidity;

    if upgrades.has(UpgradeId::LeakPlugging) {
        r.stardust += economy.leak_plugging_stardust;
        r.flux += economy.leak_plugging_flux;
    }
    if upgrades.has(UpgradeId::SingularityCore) {
        r.flux += economy.singularity_flux;
        r.lucidity += economy.singularity_lucidity;
    }
    if upgrades.has(UpgradeId::NeonPhotosynthesis) {
        let zoom = state.camera.zoom;
        if zoom < 1.0 {
            r.stardust += economy.photosynthesis_stardust * (1.0 - zoom);
        } else if zoom > 1.0 {
            r.flux += economy.photosynthesis_flux * (zoom - 1.0);
        }
    }
    if upgrades.has(UpgradeId::VampiricDraw) {
        r.flux += economy.vampiric_flux_per_desk * desks as f64;
    }
    if upgrades.has(UpgradeId::AlchemicalFire) && r.stardust > economy.alchemy_floor {
        r.stardust = (r.stardust - economy.alchemy_stardust_cost).max(0.0);
        r.flux += economy.alchemy_flux_yield;
    }
}
