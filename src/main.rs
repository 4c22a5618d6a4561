//! Mycelium Idle entry point
//!
//! Handles platform-specific initialization and drives the fixed-step loop.
//! The browser build exports `MyceliumGame` to JavaScript; the native build
//! plays a short scripted session headlessly and logs a summary.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use mycelium_idle::consts::{DEFAULT_DT, MAX_SUBSTEPS};
use mycelium_idle::sim::{Action, SimEvent, WorldState, dispatch};
use mycelium_idle::{RunRecords, Tuning};

/// Events kept for the presentation layer before the oldest are dropped
const MAX_PENDING_EVENTS: usize = 1024;

/// Host-side session: world, balance table, leaderboard and frame accumulator
struct Session {
    state: WorldState,
    tuning: Tuning,
    records: RunRecords,
    accumulator: f64,
    /// Events gathered since the presentation layer last looked
    events: Vec<SimEvent>,
}

impl Session {
    fn new(seed: u64) -> Self {
        let tuning = Tuning::load();
        log::info!("Mycelium Idle starting (seed {seed})");
        Self {
            state: WorldState::with_tuning(seed, &tuning),
            tuning,
            records: RunRecords::load(),
            accumulator: 0.0,
            events: Vec::new(),
        }
    }

    /// Swap in a loaded world
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    fn replace(&mut self, state: WorldState) {
        self.state = state;
        self.accumulator = 0.0;
        self.events.clear();
    }

    fn apply(&mut self, action: &Action) -> bool {
        let applied = dispatch(&mut self.state, action, &self.tuning);
        self.collect_events();
        applied
    }

    /// Run as many fixed steps as the elapsed frame time covers
    fn advance(&mut self, dt: f64) -> u32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0;
        }
        self.accumulator += dt.min(0.1);

        let mut substeps = 0;
        while self.accumulator >= DEFAULT_DT && substeps < MAX_SUBSTEPS {
            self.apply(&Action::Tick {
                dt: Some(DEFAULT_DT),
            });
            self.accumulator -= DEFAULT_DT;
            substeps += 1;
        }
        substeps
    }

    fn collect_events(&mut self) {
        for event in std::mem::take(&mut self.state.events) {
            if let SimEvent::Prestiged { stardust, ticks } = &event {
                let prestige = self.state.prestige_count;
                if let Some(rank) = self.records.add_record(*stardust, *ticks, prestige) {
                    log::info!("Prestige run ranked #{rank}");
                    self.records.save();
                }
            }
            self.events.push(event);
        }
        if self.events.len() > MAX_PENDING_EVENTS {
            let excess = self.events.len() - MAX_PENDING_EVENTS;
            self.events.drain(..excess);
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use serde::Serialize;
    use wasm_bindgen::prelude::*;

    use super::Session;
    use mycelium_idle::persistence;
    use mycelium_idle::sim::{Action, Particle, SimEvent, WorldState};

    /// What the renderer reads each frame
    #[derive(Serialize)]
    struct Snapshot<'a> {
        state: &'a WorldState,
        particles: &'a [Particle],
        events: &'a [SimEvent],
    }

    /// Game instance exported to JavaScript
    #[wasm_bindgen]
    pub struct MyceliumGame {
        session: Session,
    }

    #[wasm_bindgen]
    impl MyceliumGame {
        /// New world; without a seed the current time is used
        #[wasm_bindgen(constructor)]
        pub fn new(seed: Option<u32>) -> MyceliumGame {
            let seed = seed
                .map(u64::from)
                .unwrap_or_else(|| js_sys::Date::now() as u64);
            Self {
                session: Session::new(seed),
            }
        }

        /// Apply an action given as JSON, e.g. `{"type":"ADD_NODE","x":50,"y":0}`
        pub fn dispatch(&mut self, json: &str) -> bool {
            match serde_json::from_str::<Action>(json) {
                Ok(action) => self.session.apply(&action),
                Err(e) => {
                    log::warn!("Ignoring malformed action: {e}");
                    false
                }
            }
        }

        /// Feed elapsed frame time in seconds. Returns ticks simulated.
        pub fn tick(&mut self, dt: f64) -> u32 {
            self.session.advance(dt)
        }

        /// World, particles and pending events as JSON. Drains the events.
        pub fn snapshot(&mut self) -> String {
            let state = &self.session.state;
            let json = serde_json::to_string(&Snapshot {
                state,
                particles: &state.particles,
                events: &self.session.events,
            });
            self.session.events.clear();
            json.unwrap_or_else(|e| {
                log::error!("Snapshot failed: {e}");
                "null".to_string()
            })
        }

        pub fn save(&self) -> bool {
            match persistence::save_to_storage(&self.session.state) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Save failed: {e}");
                    false
                }
            }
        }

        /// Replace the world with the stored save, if there is a valid one
        pub fn load(&mut self) -> bool {
            match persistence::load_from_storage() {
                Ok(Some(state)) => {
                    self.session.replace(state);
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    log::warn!("Load failed: {e}");
                    false
                }
            }
        }

        /// Run leaderboard as JSON
        pub fn records(&self) -> String {
            serde_json::to_string(&self.session.records).unwrap_or_else(|_| "null".to_string())
        }
    }

    pub fn init_logging() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"logger already initialised".into());
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::init_logging();
    log::info!("Mycelium Idle (wasm) ready");
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    let seed = env_or("MYCELIUM_SEED", 42);
    let ticks = env_or("MYCELIUM_TICKS", 3600);
    let mut session = Session::new(seed);

    let mut applied = 0;
    let mut rejected = 0;
    for t in 0..ticks {
        if t % 60 == 0 {
            for action in autoplay(&session.state, &session.tuning, t) {
                if session.apply(&action) {
                    applied += 1;
                } else {
                    rejected += 1;
                }
            }
        }
        session.apply(&Action::Tick { dt: None });
        if session.state.crashed {
            log::error!("Session crashed at tick {}", session.state.tick);
            break;
        }
        if t % 600 == 599 {
            let r = session.state.resources;
            log::info!(
                "tick {:>6}: stardust {:.1}, flux {:.2}, lucidity {:.3}",
                session.state.tick,
                r.stardust,
                r.flux,
                r.lucidity
            );
        }
    }

    let state = &session.state;
    log::info!(
        "Finished {} ticks: {} nodes, {} edges, {} upgrades, {} actions applied, {} rejected, {} events",
        state.tick,
        state.nodes.len(),
        state.edges.len(),
        state.upgrades.len(),
        applied,
        rejected,
        session.events.len()
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}

#[cfg(not(target_arch = "wasm32"))]
fn env_or(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Simple scripted player: grow a spiral off the newest node, grab the
/// first prism in sight, and buy the first affordable upgrade.
#[cfg(not(target_arch = "wasm32"))]
fn autoplay(state: &WorldState, tuning: &Tuning, t: u64) -> Vec<Action> {
    use glam::DVec2;
    use mycelium_idle::sim::UpgradeId;

    let mut actions = Vec::new();
    if let Some(last) = state.nodes.last() {
        let step = DVec2::from_angle(state.nodes.len() as f64 * 2.4) * 120.0;
        let pos = last.pos + step;
        actions.push(Action::BuildAndConnect {
            x: pos.x,
            y: pos.y,
            source: last.id,
        });
    }
    if let Some(prism) = state.prisms.first() {
        actions.push(Action::CollectPrism { id: prism.id });
    }
    if t % 600 == 0 {
        let affordable = UpgradeId::ALL
            .into_iter()
            .find(|id| !state.has_upgrade(*id) && state.resources.covers(&id.cost(tuning)));
        if let Some(id) = affordable {
            actions.push(Action::UnlockUpgrade { id });
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_steps() {
        let mut session = Session::new(5);
        assert_eq!(session.advance(0.09), 5);
        assert_eq!(session.state.tick, 5);
        assert_eq!(session.advance(f64::NAN), 0);
        assert_eq!(session.advance(-1.0), 0);
        assert!(session.advance(5.0) <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_prestige_lands_on_board() {
        let mut session = Session::new(5);
        session.state.resources.stardust = 20_000.0;
        assert!(session.apply(&Action::Prestige));
        assert_eq!(session.records.entries.len(), 1);
        assert_eq!(session.records.entries[0].prestige, 1);
        assert!(
            session
                .events
                .iter()
                .any(|e| matches!(e, SimEvent::Prestiged { .. }))
        );
    }
}
