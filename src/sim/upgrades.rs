//! Upgrade catalog and the modifiers upgrades apply
//!
//! Upgrades are permanent flags. Each one is identified by a snake_case
//! string on the wire and carries a cost, an optional parent upgrade and a
//! permit requirement. Skills are upgrades that can additionally be
//! activated as timed effects.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::state::Resources;
use crate::tuning::Tuning;

/// Source pressure multiplier from `source_amplifier`
pub const SOURCE_AMPLIFIER_FACTOR: f64 = 1.1;
/// Resistance multipliers
pub const WIDENED_CHANNELS_FACTOR: f64 = 0.8;
pub const SUPERCONDUCTIVE_FACTOR: f64 = 0.5;
/// Drag multipliers
pub const LUBRICATED_WALLS_FACTOR: f64 = 0.5;
pub const HYDROPHOBIC_FACTOR: f64 = 0.8;
/// Flow multiplier from `peristaltic_pump`
pub const PERISTALTIC_FACTOR: f64 = 1.2;
/// `turbulent_flow` lowers the flux threshold and boosts flow flux
pub const TURBULENT_THRESHOLD_FACTOR: f64 = 0.8;
pub const TURBULENT_BONUS_FACTOR: f64 = 1.2;
/// Final multiplier on generated flux and digested stardust
pub const PIXEL_INTERPOLATION_FACTOR: f64 = 1.1;
/// Digestion multipliers
pub const DIGESTIVE_FACTOR: f64 = 1.5;
pub const SCAVENGER_FACTOR: f64 = 2.0;
pub const DIMENSION_3_DIGESTION_FACTOR: f64 = 2.0;
/// Dimension overrides for the fluid pass
pub const DIMENSION_2_RESISTANCE_SCALE: f64 = 100.0;
pub const DIMENSION_4_DRAG_FACTOR: f64 = 5.0;
/// `big_gulp` doubles the prism cap
pub const BIG_GULP_FACTOR: usize = 2;
/// Edge length extenders
pub const LONG_HYPHAE_FACTOR: f64 = 1.5;
pub const TELESCOPIC_FACTOR: f64 = 2.0;
/// Build cost reducers
pub const EFFICIENT_SPORULATION_FACTOR: f64 = 0.8;
pub const MYCORRHIZAL_FACTOR: f64 = 0.5;

/// Every upgrade in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeId {
    // Fluid
    SourceAmplifier,
    ActiveTransport,
    Overclocked,
    WidenedChannels,
    SuperconductiveHyphae,
    HydrophobicCoating,
    LubricatedWalls,
    PeristalticPump,
    SentientFluid,
    InterdimensionalPlumbing,
    FluxCapacitor,
    TurbulentFlow,
    PixelInterpolation,
    // Economy
    BigGulp,
    LuckyGlitch,
    SchrodingersCat,
    DigestiveEnzymes,
    ScavengerEnzymes,
    LeakPlugging,
    SingularityCore,
    NeonPhotosynthesis,
    VampiricDraw,
    AlchemicalFire,
    // Building
    ParasiticEmbedding,
    MitosisLottery,
    WallClinging,
    FractalBranching,
    LongHyphae,
    TelescopicTendrils,
    EfficientSporulation,
    MycorrhizalNetwork,
    // Secondary passives
    ZeroPointEnergy,
    FourthWallBreak,
    DimensionalRift,
    // Skills
    GodMode,
    Overgrowth,
}

/// Catalog entry for an upgrade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    /// Unscaled cost
    pub cost: Resources,
    /// Upgrade that must already be unlocked
    pub parent: Option<UpgradeId>,
    /// Permits the player must hold (not consumed)
    pub permits_required: u32,
}

const fn def(
    id: UpgradeId,
    stardust: f64,
    flux: f64,
    lucidity: f64,
    parent: Option<UpgradeId>,
    permits_required: u32,
) -> UpgradeDef {
    UpgradeDef {
        id,
        cost: Resources {
            stardust,
            flux,
            lucidity,
        },
        parent,
        permits_required,
    }
}

impl UpgradeId {
    pub const ALL: [UpgradeId; 36] = [
        UpgradeId::SourceAmplifier,
        UpgradeId::ActiveTransport,
        UpgradeId::Overclocked,
        UpgradeId::WidenedChannels,
        UpgradeId::SuperconductiveHyphae,
        UpgradeId::HydrophobicCoating,
        UpgradeId::LubricatedWalls,
        UpgradeId::PeristalticPump,
        UpgradeId::SentientFluid,
        UpgradeId::InterdimensionalPlumbing,
        UpgradeId::FluxCapacitor,
        UpgradeId::TurbulentFlow,
        UpgradeId::PixelInterpolation,
        UpgradeId::BigGulp,
        UpgradeId::LuckyGlitch,
        UpgradeId::SchrodingersCat,
        UpgradeId::DigestiveEnzymes,
        UpgradeId::ScavengerEnzymes,
        UpgradeId::LeakPlugging,
        UpgradeId::SingularityCore,
        UpgradeId::NeonPhotosynthesis,
        UpgradeId::VampiricDraw,
        UpgradeId::AlchemicalFire,
        UpgradeId::ParasiticEmbedding,
        UpgradeId::MitosisLottery,
        UpgradeId::WallClinging,
        UpgradeId::FractalBranching,
        UpgradeId::LongHyphae,
        UpgradeId::TelescopicTendrils,
        UpgradeId::EfficientSporulation,
        UpgradeId::MycorrhizalNetwork,
        UpgradeId::ZeroPointEnergy,
        UpgradeId::FourthWallBreak,
        UpgradeId::DimensionalRift,
        UpgradeId::GodMode,
        UpgradeId::Overgrowth,
    ];

    pub fn as_str(&self) -> &'static str {
        use UpgradeId::*;
        match self {
            SourceAmplifier => "source_amplifier",
            ActiveTransport => "active_transport",
            Overclocked => "overclocked",
            WidenedChannels => "widened_channels",
            SuperconductiveHyphae => "superconductive_hyphae",
            HydrophobicCoating => "hydrophobic_coating",
            LubricatedWalls => "lubricated_walls",
            PeristalticPump => "peristaltic_pump",
            SentientFluid => "sentient_fluid",
            InterdimensionalPlumbing => "interdimensional_plumbing",
            FluxCapacitor => "flux_capacitor",
            TurbulentFlow => "turbulent_flow",
            PixelInterpolation => "pixel_interpolation",
            BigGulp => "big_gulp",
            LuckyGlitch => "lucky_glitch",
            SchrodingersCat => "schrodingers_cat",
            DigestiveEnzymes => "digestive_enzymes",
            ScavengerEnzymes => "scavenger_enzymes",
            LeakPlugging => "leak_plugging",
            SingularityCore => "singularity_core",
            NeonPhotosynthesis => "neon_photosynthesis",
            VampiricDraw => "vampiric_draw",
            AlchemicalFire => "alchemical_fire",
            ParasiticEmbedding => "parasitic_embedding",
            MitosisLottery => "mitosis_lottery",
            WallClinging => "wall_clinging",
            FractalBranching => "fractal_branching",
            LongHyphae => "long_hyphae",
            TelescopicTendrils => "telescopic_tendrils",
            EfficientSporulation => "efficient_sporulation",
            MycorrhizalNetwork => "mycorrhizal_network",
            ZeroPointEnergy => "zero_point_energy",
            FourthWallBreak => "fourth_wall_break",
            DimensionalRift => "dimensional_rift",
            GodMode => "god_mode",
            Overgrowth => "overgrowth",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }

    /// Catalog entry (cost, parent, permits)
    pub fn def(&self) -> UpgradeDef {
        use UpgradeId::*;
        let id = *self;
        match id {
            SourceAmplifier => def(id, 200.0, 0.0, 0.0, None, 0),
            ActiveTransport => def(id, 150.0, 0.0, 0.0, None, 0),
            Overclocked => def(id, 300.0, 20.0, 0.0, Some(ActiveTransport), 0),
            WidenedChannels => def(id, 120.0, 0.0, 0.0, None, 0),
            SuperconductiveHyphae => def(id, 400.0, 50.0, 0.0, Some(WidenedChannels), 0),
            HydrophobicCoating => def(id, 100.0, 0.0, 0.0, None, 0),
            LubricatedWalls => def(id, 250.0, 0.0, 0.0, Some(HydrophobicCoating), 0),
            PeristalticPump => def(id, 300.0, 30.0, 0.0, None, 0),
            SentientFluid => def(id, 500.0, 100.0, 10.0, Some(PeristalticPump), 0),
            InterdimensionalPlumbing => {
                def(id, 1000.0, 200.0, 50.0, Some(DimensionalRift), 2)
            }
            FluxCapacitor => def(id, 0.0, 150.0, 0.0, None, 0),
            TurbulentFlow => def(id, 0.0, 200.0, 0.0, Some(FluxCapacitor), 0),
            PixelInterpolation => def(id, 0.0, 0.0, 50.0, None, 0),
            BigGulp => def(id, 200.0, 0.0, 0.0, None, 0),
            LuckyGlitch => def(id, 100.0, 0.0, 10.0, None, 0),
            SchrodingersCat => def(id, 300.0, 0.0, 20.0, Some(LuckyGlitch), 0),
            DigestiveEnzymes => def(id, 100.0, 0.0, 0.0, None, 0),
            ScavengerEnzymes => def(id, 300.0, 0.0, 0.0, Some(DigestiveEnzymes), 0),
            LeakPlugging => def(id, 80.0, 0.0, 0.0, None, 0),
            SingularityCore => def(id, 2000.0, 500.0, 0.0, None, 3),
            NeonPhotosynthesis => def(id, 150.0, 0.0, 5.0, None, 0),
            VampiricDraw => def(id, 0.0, 100.0, 20.0, None, 1),
            AlchemicalFire => def(id, 600.0, 0.0, 0.0, None, 0),
            ParasiticEmbedding => def(id, 250.0, 25.0, 0.0, None, 0),
            MitosisLottery => def(id, 200.0, 0.0, 0.0, None, 0),
            WallClinging => def(id, 150.0, 0.0, 0.0, None, 0),
            FractalBranching => def(id, 800.0, 100.0, 0.0, Some(MitosisLottery), 0),
            LongHyphae => def(id, 150.0, 0.0, 0.0, None, 0),
            TelescopicTendrils => def(id, 500.0, 50.0, 0.0, Some(LongHyphae), 0),
            EfficientSporulation => def(id, 200.0, 0.0, 0.0, None, 0),
            MycorrhizalNetwork => def(id, 150.0, 0.0, 0.0, None, 0),
            ZeroPointEnergy => def(id, 0.0, 300.0, 30.0, None, 0),
            FourthWallBreak => def(id, 0.0, 0.0, 100.0, None, 0),
            DimensionalRift => def(id, 500.0, 100.0, 25.0, None, 1),
            GodMode => def(id, 5000.0, 1000.0, 200.0, Some(SingularityCore), 5),
            Overgrowth => def(id, 400.0, 0.0, 40.0, Some(BigGulp), 0),
        }
    }

    /// Cost after the tuning scale
    pub fn cost(&self, tuning: &Tuning) -> Resources {
        self.def().cost.scaled(tuning.build.upgrade_cost_scale)
    }
}

/// Set of unlocked upgrades. Purely additive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Upgrades(BTreeSet<UpgradeId>);

impl Upgrades {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has(&self, id: UpgradeId) -> bool {
        self.0.contains(&id)
    }

    /// Returns false if it was already unlocked
    pub fn unlock(&mut self, id: UpgradeId) -> bool {
        self.0.insert(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UpgradeId> + '_ {
        self.0.iter().copied()
    }

    /// Multiplier on edge resistance
    pub fn resistance_factor(&self) -> f64 {
        let mut factor = 1.0;
        if self.has(UpgradeId::WidenedChannels) {
            factor *= WIDENED_CHANNELS_FACTOR;
        }
        if self.has(UpgradeId::SuperconductiveHyphae) {
            factor *= SUPERCONDUCTIVE_FACTOR;
        }
        factor
    }

    /// Multiplier on ether drag
    pub fn drag_factor(&self) -> f64 {
        let mut factor = 1.0;
        if self.has(UpgradeId::HydrophobicCoating) {
            factor *= HYDROPHOBIC_FACTOR;
        }
        if self.has(UpgradeId::LubricatedWalls) {
            factor *= LUBRICATED_WALLS_FACTOR;
        }
        factor
    }

    /// Multiplier on computed edge velocity
    pub fn flow_factor(&self) -> f64 {
        if self.has(UpgradeId::PeristalticPump) {
            PERISTALTIC_FACTOR
        } else {
            1.0
        }
    }

    /// Multiplier on the maximum edge length
    pub fn edge_length_factor(&self) -> f64 {
        let mut factor = 1.0;
        if self.has(UpgradeId::LongHyphae) {
            factor *= LONG_HYPHAE_FACTOR;
        }
        if self.has(UpgradeId::TelescopicTendrils) {
            factor *= TELESCOPIC_FACTOR;
        }
        factor
    }
}

impl FromIterator<UpgradeId> for Upgrades {
    fn from_iter<I: IntoIterator<Item = UpgradeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Activatable timed skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    /// Backs up resources, floods them, and restores the backup on expiry
    GodMode,
    /// Multiplies prism spawn chance while active
    Overgrowth,
}

impl Skill {
    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::GodMode => "god_mode",
            Skill::Overgrowth => "overgrowth",
        }
    }

    /// Upgrade that unlocks this skill
    pub fn required_upgrade(&self) -> UpgradeId {
        match self {
            Skill::GodMode => UpgradeId::GodMode,
            Skill::Overgrowth => UpgradeId::Overgrowth,
        }
    }

    pub fn duration_ticks(&self, tuning: &Tuning) -> u64 {
        match self {
            Skill::GodMode => tuning.skills.god_mode_duration,
            Skill::Overgrowth => tuning.skills.overgrowth_duration,
        }
    }

    pub fn cooldown_ticks(&self, tuning: &Tuning) -> u64 {
        match self {
            Skill::GodMode => tuning.skills.god_mode_cooldown,
            Skill::Overgrowth => tuning.skills.overgrowth_cooldown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for id in UpgradeId::ALL {
            assert_eq!(UpgradeId::from_str(id.as_str()), Some(id));
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
        assert_eq!(UpgradeId::from_str("not_an_upgrade"), None);
    }

    #[test]
    fn test_parents_form_no_cycles() {
        for id in UpgradeId::ALL {
            let mut current = id.def().parent;
            let mut depth = 0;
            while let Some(parent) = current {
                depth += 1;
                assert!(depth < UpgradeId::ALL.len(), "cycle through {:?}", id);
                current = parent.def().parent;
            }
        }
    }

    #[test]
    fn test_def_ids_match() {
        for id in UpgradeId::ALL {
            assert_eq!(id.def().id, id);
        }
    }

    #[test]
    fn test_modifiers_compound() {
        let upgrades: Upgrades = [
            UpgradeId::WidenedChannels,
            UpgradeId::SuperconductiveHyphae,
            UpgradeId::LongHyphae,
            UpgradeId::TelescopicTendrils,
        ]
        .into_iter()
        .collect();
        assert!((upgrades.resistance_factor() - 0.4).abs() < 1e-12);
        assert!((upgrades.edge_length_factor() - 3.0).abs() < 1e-12);
        assert_eq!(upgrades.drag_factor(), 1.0);
        assert_eq!(upgrades.flow_factor(), 1.0);
    }

    #[test]
    fn test_skills_need_their_upgrade() {
        assert_eq!(Skill::GodMode.required_upgrade(), UpgradeId::GodMode);
        assert_eq!(Skill::Overgrowth.required_upgrade().as_str(), Skill::Overgrowth.as_str());
    }

    #[test]
    fn test_cost_scale() {
        let mut tuning = Tuning::default();
        tuning.build.upgrade_cost_scale = 2.0;
        let cost = UpgradeId::SentientFluid.cost(&tuning);
        assert_eq!(cost.stardust, 1000.0);
        assert_eq!(cost.flux, 200.0);
        assert_eq!(cost.lucidity, 20.0);
    }
}
