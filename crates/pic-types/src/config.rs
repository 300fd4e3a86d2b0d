// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Deposition Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{MAX_SHAPE_ORDER, MIN_SHAPE_ORDER};
use crate::error::{PicError, PicResult};
use crate::mesh::{Geometry, IntVect};
use serde::{Deserialize, Serialize};

/// Setup-time configuration of the deposition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositionConfig {
    pub geometry: Geometry,
    /// Interpolation order of the particle shape, 1..=4.
    pub shape_order: u32,
    /// Azimuthal modes kept in RZ geometry (default: 1, axisymmetric).
    #[serde(default = "default_n_modes")]
    pub n_rz_azimuthal_modes: usize,
    /// Parallel hardware the engine runs on (default: auto-detect).
    #[serde(default)]
    pub backend: Backend,
    /// Cells per tile along each axis (default: 8 on every axis).
    #[serde(default = "default_tile_size")]
    pub tile_size: [i64; 3],
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
}

/// Parallel hardware model. Selects the accumulation strategy once, at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Host threads; resolved once when the operation is built.
    #[default]
    Auto,
    /// Host threads: one private buffer per tile, merged under a lock.
    Host,
    /// Fine-grained parallel device: one work item per particle, atomic scatter.
    ManyCore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    /// Charge in units of the elementary charge.
    pub charge: f64,
    /// Mass in kg.
    pub mass: f64,
    /// Per-particle ionization levels scale the charge when set.
    #[serde(default)]
    pub ionizable: bool,
}

fn default_n_modes() -> usize {
    1
}
fn default_tile_size() -> [i64; 3] {
    [8, 8, 8]
}

impl DepositionConfig {
    /// Load from JSON file and validate.
    pub fn from_file(path: &str) -> PicResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PicResult<()> {
        if !(MIN_SHAPE_ORDER..=MAX_SHAPE_ORDER).contains(&self.shape_order) {
            return Err(PicError::ConfigError(format!(
                "shape_order must be in {MIN_SHAPE_ORDER}..={MAX_SHAPE_ORDER}, got {}",
                self.shape_order
            )));
        }
        if self.geometry.is_rz() && self.n_rz_azimuthal_modes == 0 {
            return Err(PicError::ConfigError(
                "n_rz_azimuthal_modes must be >= 1 in RZ geometry".to_string(),
            ));
        }
        if self.tile_size.iter().any(|&n| n < 1) {
            return Err(PicError::ConfigError(format!(
                "tile_size must be >= 1 on every axis, got {:?}",
                self.tile_size
            )));
        }
        for sp in &self.species {
            if !sp.charge.is_finite() {
                return Err(PicError::ConfigError(format!(
                    "species '{}' charge must be finite",
                    sp.name
                )));
            }
            if !sp.mass.is_finite() || sp.mass <= 0.0 {
                return Err(PicError::ConfigError(format!(
                    "species '{}' mass must be finite and > 0",
                    sp.name
                )));
            }
        }
        Ok(())
    }

    /// Real components one deposited quantity occupies.
    pub fn components_per_quantity(&self) -> usize {
        self.geometry
            .components_per_quantity(self.n_rz_azimuthal_modes)
    }

    pub fn tile_size(&self) -> IntVect {
        IntVect(self.tile_size).masked(self.geometry.active_axes()) + inactive_ones(self.geometry)
    }

    pub fn species(&self, name: &str) -> Option<&SpeciesConfig> {
        self.species.iter().find(|sp| sp.name == name)
    }
}

fn inactive_ones(geometry: Geometry) -> IntVect {
    let active = geometry.active_axes();
    IntVect(std::array::from_fn(|d| i64::from(!active[d])))
}

/// Per-call deposition options.
///
/// Every field has a documented default so a plain `DepositionOptions::default()`
/// deposits all particles of a tile into its own level.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositionOptions {
    /// Guard cells used for deposition (default: the destination's allocated
    /// ghost width). Must not exceed the allocation.
    pub deposition_guards: Option<IntVect>,
    /// Level to deposit into (default: the particles' level). Only the
    /// particles' own level or the next coarser one are allowed.
    pub deposition_level: Option<usize>,
    /// Refinement ratio between the particle level and the deposition level
    /// (default: 1). Required when the levels differ.
    pub refinement_ratio: Option<IntVect>,
    /// First particle of the tile to deposit (default: 0).
    pub offset: usize,
    /// Number of particles to deposit (default: all after `offset`).
    pub count: Option<usize>,
    /// Quantity block of a multi-component destination (default: 0).
    pub component: usize,
    /// Time, in seconds, by which current deposition shifts positions along
    /// the velocity (default: 0). Ignored for charge.
    pub relative_time: f64,
}

impl Default for DepositionOptions {
    fn default() -> Self {
        DepositionOptions {
            deposition_guards: None,
            deposition_level: None,
            refinement_ratio: None,
            offset: 0,
            count: None,
            component: 0,
            relative_time: 0.0,
        }
    }
}

impl DepositionOptions {
    /// Deposit into the next coarser level's buffer.
    pub fn coarse_buffer(particle_level: usize, ratio: IntVect) -> PicResult<Self> {
        if particle_level == 0 {
            return Err(PicError::LevelMismatch(
                "level 0 particles have no coarse buffer".to_string(),
            ));
        }
        Ok(DepositionOptions {
            deposition_level: Some(particle_level - 1),
            refinement_ratio: Some(ratio),
            ..DepositionOptions::default()
        })
    }

    /// Restrict deposition to the particles `[offset, offset + count)`.
    pub fn sub_range(mut self, offset: usize, count: usize) -> Self {
        self.offset = offset;
        self.count = Some(count);
        self
    }
}
