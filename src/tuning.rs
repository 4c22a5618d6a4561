//! Game balance table
//!
//! Every simulation entry point takes `&Tuning` so tests and hosts can
//! override any constant. Missing JSON fields fall back to the shipped
//! defaults, so a tuning file only needs to name what it changes.

use serde::{Deserialize, Serialize};

/// Fluid network coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidTuning {
    /// Pressure every SOURCE node is pinned to each tick
    pub pressure_source: f64,
    /// Non-source pressure decay per tick
    pub decay: f64,
    /// Decay with `active_transport`
    pub decay_active_transport: f64,
    /// Pressure pumped into every non-source node with `overclocked`
    pub overclock_pump: f64,
    /// Global ether drag before upgrades
    pub ether_drag: f64,
    /// Resistance given to freshly built edges
    pub edge_resistance: f64,
    /// Pressure moved per unit of velocity per second
    pub transfer_scale: f64,
    /// Pressure gap above which `sentient_fluid` nudges the pair
    pub sentient_threshold: f64,
    /// Share of the transfer applied again by `sentient_fluid`
    pub sentient_nudge: f64,
    /// Share of the pressure gap equalized by `interdimensional_plumbing`
    pub plumbing_share: f64,
    /// Minimum |flow| that produces flux
    pub flow_flux_threshold: f64,
    /// Minimum |flow| with `flux_capacitor`
    pub capacitor_flow_threshold: f64,
    pub flow_flux_rate: f64,
    pub flow_flux_cap: f64,
    /// Node pressure above which a node produces flux
    pub pressure_flux_floor: f64,
    pub pressure_flux_rate: f64,
    pub pressure_flux_cap: f64,
}

impl Default for FluidTuning {
    fn default() -> Self {
        Self {
            pressure_source: 100.0,
            decay: 0.98,
            decay_active_transport: 0.99,
            overclock_pump: 0.5,
            ether_drag: 0.1,
            edge_resistance: 1.0,
            transfer_scale: 2.0,
            sentient_threshold: 50.0,
            sentient_nudge: 0.5,
            plumbing_share: 0.05,
            flow_flux_threshold: 0.1,
            capacitor_flow_threshold: 0.05,
            flow_flux_rate: 0.005,
            flow_flux_cap: 0.5,
            pressure_flux_floor: 10.0,
            pressure_flux_rate: 0.002,
            pressure_flux_cap: 2.0,
        }
    }
}

/// Prism spawning, digestion and passive income
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyTuning {
    pub prism_spawn_chance: f64,
    pub max_prisms: usize,
    pub prism_base_value: f64,
    pub prism_value_variance: f64,
    /// Prisms spawn uniformly in [-extent, extent]²
    pub prism_spawn_extent: f64,
    pub digestion_radius: f64,
    pub lucky_glitch_chance: f64,
    pub lucky_glitch_multiplier: f64,
    pub quantum_interval_ticks: u64,
    pub quantum_chance: f64,
    pub quantum_min_value: f64,
    pub quantum_max_value: f64,
    /// Unconditional lucidity per tick
    pub passive_lucidity: f64,
    pub leak_plugging_stardust: f64,
    pub leak_plugging_flux: f64,
    pub singularity_flux: f64,
    pub singularity_lucidity: f64,
    pub photosynthesis_stardust: f64,
    pub photosynthesis_flux: f64,
    pub vampiric_flux_per_desk: f64,
    /// Stardust level above which `alchemical_fire` burns
    pub alchemy_floor: f64,
    pub alchemy_stardust_cost: f64,
    pub alchemy_flux_yield: f64,
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            prism_spawn_chance: 0.01,
            max_prisms: 10,
            prism_base_value: 10.0,
            prism_value_variance: 20.0,
            prism_spawn_extent: 500.0,
            digestion_radius: 50.0,
            lucky_glitch_chance: 0.05,
            lucky_glitch_multiplier: 10.0,
            quantum_interval_ticks: 60,
            quantum_chance: 0.2,
            quantum_min_value: 10.0,
            quantum_max_value: 110.0,
            passive_lucidity: 0.001,
            leak_plugging_stardust: 0.02,
            leak_plugging_flux: 0.01,
            singularity_flux: 0.05,
            singularity_lucidity: 0.005,
            photosynthesis_stardust: 0.05,
            photosynthesis_flux: 0.02,
            vampiric_flux_per_desk: 0.01,
            alchemy_floor: 500.0,
            alchemy_stardust_cost: 1.0,
            alchemy_flux_yield: 0.5,
        }
    }
}

/// Costs and constraints for player actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildTuning {
    pub cost_node: f64,
    pub cost_edge: f64,
    pub max_edge_length: f64,
    /// Collision radius of a node
    pub node_radius: f64,
    pub mitosis_chance: f64,
    /// Distance from an obstacle's rim that earns the wall-clinging discount
    pub wall_cling_range: f64,
    pub wall_cling_discount: f64,
    /// Every Nth node triggers fractal branching
    pub fractal_every: usize,
    pub fractal_offset: f64,
    /// Multiplier applied to every catalog upgrade cost
    pub upgrade_cost_scale: f64,
    /// Lucidity needed to make a desk compliant
    pub desk_compliance_cost: f64,
    /// Lucidity needed to shift dimension
    pub dimension_shift_cost: f64,
    pub prestige_threshold: f64,
}

impl Default for BuildTuning {
    fn default() -> Self {
        Self {
            cost_node: 50.0,
            cost_edge: 10.0,
            max_edge_length: 500.0,
            node_radius: 10.0,
            mitosis_chance: 0.1,
            wall_cling_range: 100.0,
            wall_cling_discount: 0.5,
            fractal_every: 10,
            fractal_offset: 60.0,
            upgrade_cost_scale: 1.0,
            desk_compliance_cost: 5.0,
            dimension_shift_cost: 10.0,
            prestige_threshold: 10_000.0,
        }
    }
}

/// World generation, spawners and timers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    /// Camera offset beyond which the origin is rebased
    pub rebase_threshold: f64,
    pub initial_stardust: f64,
    pub initial_obstacles: usize,
    /// Obstacles are never generated closer than this to the origin
    pub obstacle_clearance: f64,
    pub obstacle_min_radius: f64,
    pub obstacle_max_radius: f64,
    pub max_obstacles: usize,
    pub obstacle_spawn_chance: f64,
    /// Decorative entities spawn in [-extent, extent]² around the origin
    pub spawn_extent: f64,
    pub enemy_spawn_chance: f64,
    pub max_enemies: usize,
    pub enemy_radius: f64,
    pub enemy_speed: f64,
    pub enemy_ttl_ticks: u32,
    pub desk_spawn_chance: f64,
    pub max_desks: usize,
    pub permit_interval_ticks: u64,
    pub watermark_spawn_chance: f64,
    pub invasion_duration_ticks: u32,
    /// Ticks without player input before `fourth_wall_break` pays out
    pub idle_threshold_ticks: u64,
    pub fourth_wall_lucidity: f64,
    pub zero_point_share: f64,
    pub zero_point_cap: f64,
    pub capacitor_interval_ticks: u64,
    pub capacitor_share: f64,
    pub capacitor_cap: f64,
    /// Lucidity passive bonus per prestige
    pub prestige_lucidity_bonus: f64,
    /// Particles emitted when a prism is digested
    pub particle_burst: usize,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            rebase_threshold: 5_000.0,
            initial_stardust: 100.0,
            initial_obstacles: 3,
            obstacle_clearance: 150.0,
            obstacle_min_radius: 20.0,
            obstacle_max_radius: 60.0,
            max_obstacles: 12,
            obstacle_spawn_chance: 0.0005,
            spawn_extent: 800.0,
            enemy_spawn_chance: 0.002,
            max_enemies: 5,
            enemy_radius: 25.0,
            enemy_speed: 15.0,
            enemy_ttl_ticks: 1_800,
            desk_spawn_chance: 0.001,
            max_desks: 3,
            permit_interval_ticks: 1_800,
            watermark_spawn_chance: 0.0003,
            invasion_duration_ticks: 1_800,
            idle_threshold_ticks: 3_600,
            fourth_wall_lucidity: 0.01,
            zero_point_share: 0.25,
            zero_point_cap: 1.0,
            capacitor_interval_ticks: 600,
            capacitor_share: 0.05,
            capacitor_cap: 50.0,
            prestige_lucidity_bonus: 0.1,
            particle_burst: 8,
        }
    }
}

/// Timed skill parameters (all durations in ticks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillTuning {
    pub god_mode_amount: f64,
    pub god_mode_duration: u64,
    pub god_mode_cooldown: u64,
    pub overgrowth_duration: u64,
    pub overgrowth_cooldown: u64,
    pub overgrowth_spawn_multiplier: f64,
}

impl Default for SkillTuning {
    fn default() -> Self {
        Self {
            god_mode_amount: 999_999.0,
            god_mode_duration: 600,
            god_mode_cooldown: 3_600,
            overgrowth_duration: 300,
            overgrowth_cooldown: 1_800,
            overgrowth_spawn_multiplier: 5.0,
        }
    }
}

/// Complete balance table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub fluid: FluidTuning,
    pub economy: EconomyTuning,
    pub build: BuildTuning,
    pub world: WorldTuning,
    pub skills: SkillTuning,
}

impl Tuning {
    /// Parse a (possibly partial) tuning table
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "mycelium_tuning";

    /// Environment variable naming a tuning file (native only)
    #[allow(dead_code)]
    const ENV_PATH: &'static str = "MYCELIUM_TUNING";

    /// Load tuning overrides from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(tuning) => {
                        log::info!("Loaded tuning overrides from LocalStorage");
                        return tuning;
                    }
                    Err(e) => log::warn!("Ignoring malformed tuning overrides: {}", e),
                }
            }
        }

        Self::default()
    }

    /// Load tuning overrides from the file named by `MYCELIUM_TUNING`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(Self::ENV_PATH) else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning overrides from {}", path);
                    tuning
                }
                Err(e) => {
                    log::warn!("Ignoring malformed tuning file {}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read tuning file {}: {}", path, e);
                Self::default()
            }
        }
    }
}
