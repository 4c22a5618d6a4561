//! Fixed timestep simulation tick
//!
//! Core loop that advances the world deterministically, plus the single
//! entry point through which every action reaches the world.

use super::actions::{Action, apply};
use super::state::{InvariantViolation, SimEvent, WorldState};
use super::{economy, fluid, origin, secondary};
use crate::consts::DEFAULT_DT;
use crate::tuning::Tuning;

/// Advance the world by one tick.
///
/// Order is fixed: fluid, economy, rebasing, secondary systems, then the
/// tick counter moves exactly once. A missing or unusable `dt` falls back
/// to one 60 Hz frame.
pub fn on_tick(state: &mut WorldState, dt: Option<f64>, tuning: &Tuning) {
    if state.crashed {
        return;
    }
    if let Err(violation) = state.check_invariants() {
        crash(state, violation);
        return;
    }

    let dt = dt
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .unwrap_or(DEFAULT_DT);
    let mut rng = state.rng_state.for_tick(state.tick);

    fluid::simulate(state, dt, tuning, &mut rng);
    economy::process(state, tuning, &mut rng);
    origin::rebase(state, tuning);
    secondary::update(state, dt, tuning, &mut rng);

    state.tick += 1;
}

/// Apply one action. Returns false if it was rejected, in which case the
/// world is untouched apart from the cleared event list.
pub fn dispatch(state: &mut WorldState, action: &Action, tuning: &Tuning) -> bool {
    state.events.clear();

    if let Action::Tick { dt } = *action {
        on_tick(state, dt, tuning);
        return !state.crashed;
    }

    match apply(state, action, tuning) {
        Ok(()) => {
            state.idle_ticks = 0;
            true
        }
        Err(rejection) => {
            log::debug!("rejected {action:?} at tick {}: {rejection}", state.tick);
            false
        }
    }
}

fn crash(state: &mut WorldState, violation: InvariantViolation) {
    log::error!("simulation halted at tick {}: {violation}", state.tick);
    state.crashed = true;
    state.emit(SimEvent::Crashed {
        reason: violation.to_string(),
    });
}
