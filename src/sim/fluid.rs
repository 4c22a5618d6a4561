//! Pressure propagation over the node/edge graph
//!
//! One call advances every node's pressure and every edge's flow by `dt`
//! and converts strong flow and high pressure into flux.
//!
//! Edges are applied strictly in collection order: each edge reads the
//! pressures left behind by the edges before it in the same tick, so the
//! loop must stay sequential.

use std::collections::HashMap;

use rand::Rng;

use super::state::{EntityId, WorldState};
use super::upgrades::{
    DIMENSION_2_RESISTANCE_SCALE, DIMENSION_4_DRAG_FACTOR, PIXEL_INTERPOLATION_FACTOR,
    SOURCE_AMPLIFIER_FACTOR, TURBULENT_BONUS_FACTOR, TURBULENT_THRESHOLD_FACTOR, UpgradeId,
};
use crate::consts::{MAX_FLUX_PER_TICK, MIN_RESISTANCE};
use crate::tuning::Tuning;
use crate::{clamp_flow, clamp_pressure, finite_or};

/// Pressure every SOURCE node is pinned to, after upgrades
pub fn source_pressure(state: &WorldState, tuning: &Tuning) -> f64 {
    let base = tuning.fluid.pressure_source;
    if state.has_upgrade(UpgradeId::SourceAmplifier) {
        base * SOURCE_AMPLIFIER_FACTOR
    } else {
        base
    }
}

/// Advance the fluid network by `dt` seconds.
///
/// Returns the flux generated this tick, which has already been added to
/// `state.resources.flux` and recorded in `state.flux_generated`.
///
/// SOURCE nodes behave as infinite reservoirs: transfers never change their
/// pressure, so they always end the pass at [`source_pressure`].
pub fn simulate<R: Rng + ?Sized>(
    state: &mut WorldState,
    dt: f64,
    tuning: &Tuning,
    rng: &mut R,
) -> f64 {
    let fluid = &tuning.fluid;
    let upgrades = &state.upgrades;

    let pinned = source_pressure(state, tuning);
    let decay = if upgrades.has(UpgradeId::ActiveTransport) {
        fluid.decay_active_transport
    } else {
        fluid.decay
    };
    let pump = if upgrades.has(UpgradeId::Overclocked) {
        fluid.overclock_pump
    } else {
        0.0
    };

    // Resistance and drag modifiers are resolved once, before any edge
    let resistance_factor = upgrades.resistance_factor();
    let flow_factor = upgrades.flow_factor();
    let mut drag = fluid.ether_drag * upgrades.drag_factor();
    if state.dimension == 4 {
        drag *= DIMENSION_4_DRAG_FACTOR;
    }
    let length_resistance = state.dimension == 2;
    let sentient = upgrades.has(UpgradeId::SentientFluid);
    let plumbing = upgrades.has(UpgradeId::InterdimensionalPlumbing);
    let capacitor = upgrades.has(UpgradeId::FluxCapacitor);
    let turbulent = upgrades.has(UpgradeId::TurbulentFlow);
    let pixel = upgrades.has(UpgradeId::PixelInterpolation);

    let nodes = &mut state.nodes;
    let edges = &mut state.edges;

    // 1. Pin sources, decay everything else
    for node in nodes.iter_mut() {
        if node.is_source() {
            node.pressure = pinned;
            continue;
        }
        let pressure = node.pressure * decay + pump;
        if pressure.is_finite() {
            node.pressure = clamp_pressure(pressure);
        }
    }

    let index: HashMap<EntityId, usize> =
        nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

    // 2-4. Per-edge velocity and transfer
    for edge in edges.iter_mut() {
        let (Some(&si), Some(&ti)) = (index.get(&edge.source), index.get(&edge.target)) else {
            continue; // dangling edges are inert
        };

        let source_p = nodes[si].pressure;
        let target_p = nodes[ti].pressure;
        let delta = source_p - target_p;

        let resistance = if length_resistance {
            let length = nodes[si].pos.distance(nodes[ti].pos);
            DIMENSION_2_RESISTANCE_SCALE / length.max(1.0)
        } else {
            edge.resistance * resistance_factor
        };

        let raw = (delta / resistance.max(MIN_RESISTANCE)) * (1.0 - drag);
        let velocity = clamp_flow(clamp_flow(raw) * flow_factor);
        if !velocity.is_finite() {
            continue;
        }
        edge.flow = velocity;

        if si == ti {
            continue;
        }

        let transfer = velocity * dt * fluid.transfer_scale;
        if !transfer.is_finite() {
            continue;
        }

        let mut new_source = clamp_pressure(source_p - transfer);
        let mut new_target = clamp_pressure(target_p + transfer);
        if sentient && (new_source - new_target).abs() > fluid.sentient_threshold {
            let nudge = transfer * fluid.sentient_nudge;
            new_source = clamp_pressure(new_source - nudge);
            new_target = clamp_pressure(new_target + nudge);
        }

        if !nodes[si].is_source() {
            nodes[si].pressure = finite_or(new_source, source_p);
        }
        if !nodes[ti].is_source() {
            nodes[ti].pressure = finite_or(new_target, target_p);
        }
    }

    // 5. Random side-channel equalization, independent of topology
    if plumbing && nodes.len() > 2 {
        let a = rng.random_range(0..nodes.len());
        let b = rng.random_range(0..nodes.len());
        if a != b {
            let shift = (nodes[a].pressure - nodes[b].pressure) * fluid.plumbing_share;
            if shift.is_finite() {
                if !nodes[a].is_source() {
                    nodes[a].pressure = clamp_pressure(nodes[a].pressure - shift);
                }
                if !nodes[b].is_source() {
                    nodes[b].pressure = clamp_pressure(nodes[b].pressure + shift);
                }
            }
        }
    }

    // 6. Flux from flow and pressure
    let mut threshold = if capacitor {
        fluid.capacitor_flow_threshold
    } else {
        fluid.flow_flux_threshold
    };
    if turbulent {
        threshold *= TURBULENT_THRESHOLD_FACTOR;
    }

    let mut generated = 0.0;
    for edge in edges.iter() {
        let speed = edge.flow.abs();
        if speed > threshold {
            let mut gain = (speed * fluid.flow_flux_rate).min(fluid.flow_flux_cap);
            if turbulent {
                gain *= TURBULENT_BONUS_FACTOR;
            }
            generated += finite_or(gain, 0.0);
        }
    }
    for node in nodes.iter().filter(|n| !n.is_source()) {
        if node.pressure > fluid.pressure_flux_floor {
            let gain = ((node.pressure - fluid.pressure_flux_floor) * fluid.pressure_flux_rate)
                .min(fluid.pressure_flux_cap);
            generated += finite_or(gain, 0.0);
        }
    }
    generated = generated.min(MAX_FLUX_PER_TICK);
    if pixel {
        generated *= PIXEL_INTERPOLATION_FACTOR;
    }
    let generated = finite_or(generated, 0.0);

    state.resources.flux += generated;
    state.flux_generated = generated;
    generated
}
