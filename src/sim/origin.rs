//! Floating-origin rebasing
//!
//! Long sessions drift the camera far from the origin, which costs float
//! precision in everything positioned relative to it. When the camera
//! strays past the threshold on either axis, the whole world is shifted
//! back so the camera sits at zero again. Relative geometry is preserved
//! exactly; the accumulated shift is kept in `global_offset`.

use glam::DVec2;

use super::state::{SimEvent, WorldState};
use crate::tuning::Tuning;

/// Rebase if the camera is past the threshold. Returns true if a shift
/// was applied.
pub fn rebase(state: &mut WorldState, tuning: &Tuning) -> bool {
    let threshold = tuning.world.rebase_threshold;
    let offset = state.camera.offset;
    if !offset.is_finite() || (offset.x.abs() <= threshold && offset.y.abs() <= threshold) {
        return false;
    }

    shift_world(state, -offset);
    state.global_offset += offset;
    state.camera.offset = DVec2::ZERO;
    log::debug!("rebased origin by ({:.1}, {:.1})", offset.x, offset.y);
    state.emit(SimEvent::Rebased { shift: offset });
    true
}

/// Translate every positioned entity by `delta`
fn shift_world(state: &mut WorldState, delta: DVec2) {
    for node in &mut state.nodes {
        node.pos += delta;
    }
    for prism in &mut state.prisms {
        prism.pos += delta;
    }
    for obstacle in &mut state.obstacles {
        obstacle.pos += delta;
    }
    for enemy in &mut state.enemies {
        enemy.pos += delta;
    }
    for desk in &mut state.desks {
        desk.pos += delta;
    }
    for particle in &mut state.particles {
        particle.pos += delta;
    }
}
