// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Grid and Tile Decomposition
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Deterministic splitting of a level into grids and tiles, and binning
//! of particles into the tile whose cells contain them.

use crate::particles::{MacroParticle, ParticleTile};
use pic_types::config::SpeciesConfig;
use pic_types::constants::{Q_ELECTRON, SPACE_DIM};
use pic_types::error::{PicError, PicResult};
use pic_types::mesh::{IndexBox, IntVect, LevelGeometry};

/// Split `n` items across `k` buckets as evenly as possible.
fn balanced_split(n: i64, k: i64) -> Vec<i64> {
    let base = n / k;
    let rem = n % k;
    (0..k).map(|i| base + i64::from(i < rem)).collect()
}

/// Split a cell-centered domain into `parts[d]` grids along each axis.
///
/// Grids are returned in row-major order (last axis fastest).
pub fn decompose_domain(domain: &IndexBox, parts: IntVect) -> PicResult<Vec<IndexBox>> {
    let size = domain.size();
    for d in 0..SPACE_DIM {
        if parts[d] < 1 {
            return Err(PicError::ConfigError(format!(
                "grid count must be >= 1 on every axis, got {parts:?}"
            )));
        }
        if parts[d] > size[d] {
            return Err(PicError::ConfigError(format!(
                "cannot split {} cells into {} grids on axis {d}",
                size[d], parts[d]
            )));
        }
    }
    let bounds: Vec<Vec<(i64, i64)>> = (0..SPACE_DIM)
        .map(|d| {
            let mut cursor = domain.lo[d];
            balanced_split(size[d], parts[d])
                .into_iter()
                .map(|n| {
                    let lo = cursor;
                    cursor += n;
                    (lo, cursor - 1)
                })
                .collect()
        })
        .collect();
    let mut grids = Vec::with_capacity((parts[0] * parts[1] * parts[2]) as usize);
    for &(xl, xh) in &bounds[0] {
        for &(yl, yh) in &bounds[1] {
            for &(zl, zh) in &bounds[2] {
                grids.push(IndexBox::cells(
                    IntVect::new(xl, yl, zl),
                    IntVect::new(xh, yh, zh),
                ));
            }
        }
    }
    Ok(grids)
}

/// Tiles of at most `tile_size` cells covering `grid`, in row-major order.
/// Tiles on the upper edge are truncated to the grid.
pub fn tile_boxes(grid: &IndexBox, tile_size: IntVect) -> Vec<IndexBox> {
    let ts = tile_size.max(&IntVect::unit());
    let starts: Vec<Vec<i64>> = (0..SPACE_DIM)
        .map(|d| (grid.lo[d]..=grid.hi[d]).step_by(ts[d] as usize).collect())
        .collect();
    let mut out = Vec::new();
    for &x in &starts[0] {
        for &y in &starts[1] {
            for &z in &starts[2] {
                let lo = IntVect::new(x, y, z);
                let hi = (lo + ts - IntVect::unit()).min(&grid.hi);
                out.push(IndexBox::with_type(lo, hi, grid.ixtype));
            }
        }
    }
    out
}

/// Particles of one tile together with the tile's place in the level.
#[derive(Debug, Clone)]
pub struct TileParticles {
    pub grid: usize,
    pub tile_box: IndexBox,
    pub particles: ParticleTile,
}

/// One species on one level, binned by (grid, tile).
#[derive(Debug, Clone)]
pub struct ParticleContainer {
    geom: LevelGeometry,
    name: String,
    /// Charge per physical particle (C).
    charge: f64,
    ionizable: bool,
    grids: Vec<IndexBox>,
    tiles: Vec<TileParticles>,
}

impl ParticleContainer {
    pub fn new(
        geom: LevelGeometry,
        species: &SpeciesConfig,
        grids: &[IndexBox],
        tile_size: IntVect,
    ) -> PicResult<Self> {
        if !species.charge.is_finite() {
            return Err(PicError::ConfigError(format!(
                "species '{}' charge must be finite",
                species.name
            )));
        }
        let tile_size = tile_size.masked(geom.geometry.active_axes()).max(&IntVect::unit());
        let tiles = grids
            .iter()
            .enumerate()
            .flat_map(|(ig, g)| {
                tile_boxes(g, tile_size)
                    .into_iter()
                    .map(move |tile_box| (ig, tile_box))
            })
            .map(|(grid, tile_box)| TileParticles {
                grid,
                tile_box,
                particles: ParticleTile::new(species.ionizable),
            })
            .collect();
        Ok(ParticleContainer {
            geom,
            name: species.name.clone(),
            charge: species.charge * Q_ELECTRON,
            ionizable: species.ionizable,
            grids: grids.to_vec(),
            tiles,
        })
    }

    /// Bin particles into the tile holding their cell.
    pub fn add_particles(&mut self, particles: &[MacroParticle]) -> PicResult<()> {
        for (ip, p) in particles.iter().enumerate() {
            let pos = p.position();
            if pos.iter().any(|x| !x.is_finite()) {
                return Err(PicError::PhysicsViolation(format!(
                    "particle[{ip}] of '{}' has a non-finite position",
                    self.name
                )));
            }
            let cell = self.geom.cell_index(self.geom.geometry.mesh_coords(pos));
            let tile = self
                .tiles
                .iter_mut()
                .find(|t| t.tile_box.contains(&cell))
                .ok_or_else(|| {
                    PicError::PhysicsViolation(format!(
                        "particle[{ip}] of '{}' in cell {:?} lies outside every grid",
                        self.name, cell
                    ))
                })?;
            tile.particles.push(p);
        }
        Ok(())
    }

    pub fn geometry(&self) -> &LevelGeometry {
        &self.geom
    }

    pub fn level(&self) -> usize {
        self.geom.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn is_ionizable(&self) -> bool {
        self.ionizable
    }

    pub fn grids(&self) -> &[IndexBox] {
        &self.grids
    }

    pub fn tiles(&self) -> &[TileParticles] {
        &self.tiles
    }

    /// Tiles for in-place particle updates. Particles keep their tile until re-binned.
    pub fn tiles_mut(&mut self) -> &mut [TileParticles] {
        &mut self.tiles
    }

    pub fn num_particles(&self) -> usize {
        self.tiles.iter().map(|t| t.particles.len()).sum()
    }

    /// Sum of weights, i.e. physical particles represented.
    pub fn total_weight(&self) -> f64 {
        self.tiles
            .iter()
            .map(|t| t.particles.weight.iter().sum::<f64>())
            .sum()
    }
}
