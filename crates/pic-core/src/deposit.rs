// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Charge and Current Deposition
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Deposition of one tile of particles into a mesh quantity.
//!
//! A call moves through three states:
//!
//! 1. [`ValidatedDeposit`]: guards, level pairing, component layout and
//!    every particle's position have been checked. Nothing is written yet.
//! 2. [`DepositedTile`]: the strategy has scattered all particles, either
//!    into private buffers (tiled) or straight into the destination (atomic).
//! 3. [`TileReport`]: private buffers, if any, have been merged.
//!
//! Every failure is reported before the destination is touched.

use crate::fab::SharedFab;
use crate::field::{CurrentDensity, MultiField};
use crate::kernel::{charge_quantity, current_components, DepositKernel};
use crate::particles::{ParticleTile, PositionAccessor};
use crate::strategy::{strategy_for, Accumulator, DepositStrategy, Staged, StrategyKind};
use crate::tiling::ParticleContainer;
use log::{debug, trace};
use pic_math::coarsen::{coarsen_box, is_coarsenable, validate_ratio};
use pic_math::shape::ShapeOrder;
use pic_types::config::{Backend, DepositionConfig, DepositionOptions};
use pic_types::constants::SPACE_DIM;
use pic_types::error::{PicError, PicResult};
use pic_types::mesh::{Geometry, IndexBox, IntVect, LevelGeometry};
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Relative tolerance when matching cell spacings across levels.
const DX_REL_TOL: f64 = 1e-12;

/// What a pass deposits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    /// Charge density into one field.
    Charge,
    /// Current density into three Yee-staggered fields, with positions
    /// advanced by `relative_time * v`.
    Current { relative_time: f64 },
}

/// One destination array of a pass.
#[derive(Debug, Clone, Copy)]
pub struct PassTarget<'a> {
    pub kernel: DepositKernel,
    pub fab: &'a SharedFab,
    /// Tile box in the destination's staggering, grown by the deposition guards.
    pub deposit_box: IndexBox,
    /// First destination component of the quantity block.
    pub dst_comp: usize,
    pub ncomp: usize,
}

/// Everything a strategy needs to scatter one tile.
#[derive(Debug)]
pub struct DepositPass<'a> {
    pub particles: &'a ParticleTile,
    /// Positions of particles `offset..offset + count`, indexed from zero.
    pub positions: Box<dyn PositionAccessor + 'a>,
    /// First tile slot of the pass.
    pub offset: usize,
    pub count: usize,
    /// Charge per physical particle (C).
    pub charge: f64,
    /// Inverse cell volume of the destination level.
    pub inv_vol: f64,
    pub geometry: Geometry,
    pub quantity: Quantity,
    pub targets: Vec<PassTarget<'a>>,
}

impl DepositPass<'_> {
    /// Scatter particle `ip` (counted from the pass offset) into `acc`.
    #[inline]
    pub fn deposit_particle<A: Accumulator>(&self, ip: usize, acc: &mut A) {
        let slot = self.offset + ip;
        let q = charge_quantity(
            self.charge,
            self.particles.weight[slot],
            self.particles.ion_level(slot),
        ) * self.inv_vol;
        let pos = self.positions.position(ip);
        match self.quantity {
            Quantity::Charge => {
                self.targets[0]
                    .kernel
                    .scatter(pos, q, &mut |c, iv, v| acc.accumulate(0, c, iv, v));
            }
            Quantity::Current { relative_time } => {
                let v = self.particles.velocity_m_s(slot);
                let pos = shifted(pos, v, relative_time);
                let vc = current_components(self.geometry, pos, v);
                for (t, target) in self.targets.iter().enumerate() {
                    target
                        .kernel
                        .scatter(pos, q * vc[t], &mut |c, iv, val| acc.accumulate(t, c, iv, val));
                }
            }
        }
    }

    /// Position actually deposited for particle `ip`.
    fn deposited_position(&self, ip: usize) -> [f64; 3] {
        let pos = self.positions.position(ip);
        match self.quantity {
            Quantity::Charge => pos,
            Quantity::Current { relative_time } => shifted(
                pos,
                self.particles.velocity_m_s(self.offset + ip),
                relative_time,
            ),
        }
    }
}

#[inline]
fn shifted(pos: [f64; 3], v: [f64; 3], dt: f64) -> [f64; 3] {
    if dt == 0.0 {
        pos
    } else {
        std::array::from_fn(|d| pos[d] + dt * v[d])
    }
}

/// Progress of one tile deposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositState {
    Validated,
    Deposited,
    Merged,
}

/// Outcome of one tile deposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileReport {
    pub tile: usize,
    pub state: DepositState,
    pub particles: usize,
    pub merged_points: usize,
    pub deposit_time: Duration,
    pub merge_time: Duration,
}

/// Outcome of a level pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositReport {
    pub strategy: StrategyKind,
    pub tiles: usize,
    pub particles: usize,
    pub deposit_time: Duration,
    pub merge_time: Duration,
    pub elapsed: Duration,
}

/// A checked tile deposition that has not written anything yet.
#[derive(Debug)]
pub struct ValidatedDeposit<'a> {
    strategy: &'a dyn DepositStrategy,
    tile: usize,
    pass: DepositPass<'a>,
}

impl<'a> ValidatedDeposit<'a> {
    pub fn state(&self) -> DepositState {
        DepositState::Validated
    }

    /// Particles this deposition will scatter.
    pub fn count(&self) -> usize {
        self.pass.count
    }

    pub fn deposit(self) -> PicResult<DepositedTile<'a>> {
        let start = Instant::now();
        let staged = if self.pass.count == 0 {
            Staged::Complete
        } else {
            self.strategy.run(&self.pass)?
        };
        Ok(DepositedTile {
            tile: self.tile,
            particles: self.pass.count,
            staged,
            deposit_time: start.elapsed(),
        })
    }
}

/// A tile whose particles have been scattered.
#[derive(Debug)]
pub struct DepositedTile<'a> {
    tile: usize,
    particles: usize,
    staged: Staged<'a>,
    deposit_time: Duration,
}

impl DepositedTile<'_> {
    pub fn state(&self) -> DepositState {
        DepositState::Deposited
    }

    pub fn needs_merge(&self) -> bool {
        matches!(self.staged, Staged::NeedsMerge(_))
    }

    /// Add private buffers into the destination; a no-op for atomic scatter.
    pub fn merge(self) -> PicResult<TileReport> {
        let start = Instant::now();
        let (state, merged_points) = match self.staged {
            Staged::NeedsMerge(pending) => (DepositState::Merged, pending.merge()?),
            Staged::Complete => (DepositState::Deposited, 0),
        };
        Ok(TileReport {
            tile: self.tile,
            state,
            particles: self.particles,
            merged_points,
            deposit_time: self.deposit_time,
            merge_time: start.elapsed(),
        })
    }
}

/// Particle-to-grid deposition with a fixed shape order and strategy.
#[derive(Debug)]
pub struct DepositionOperation {
    order: ShapeOrder,
    geometry: Geometry,
    n_modes: usize,
    strategy: Box<dyn DepositStrategy>,
}

impl DepositionOperation {
    pub fn from_config(config: &DepositionConfig) -> PicResult<Self> {
        config.validate()?;
        Self::new(
            config.geometry,
            config.shape_order,
            config.n_rz_azimuthal_modes,
            config.backend,
        )
    }

    pub fn new(
        geometry: Geometry,
        shape_order: u32,
        n_rz_azimuthal_modes: usize,
        backend: Backend,
    ) -> PicResult<Self> {
        let order = ShapeOrder::try_from(shape_order)?;
        if geometry.is_rz() && n_rz_azimuthal_modes == 0 {
            return Err(PicError::ConfigError(
                "n_rz_azimuthal_modes must be >= 1 in RZ geometry".to_string(),
            ));
        }
        Ok(DepositionOperation {
            order,
            geometry,
            n_modes: if geometry.is_rz() { n_rz_azimuthal_modes } else { 1 },
            strategy: strategy_for(backend),
        })
    }

    /// Same operation on another backend.
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.strategy = strategy_for(backend);
        self
    }

    pub fn order(&self) -> ShapeOrder {
        self.order
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Real components per deposited quantity.
    pub fn components_per_quantity(&self) -> usize {
        self.geometry.components_per_quantity(self.n_modes)
    }

    /// Guard cells the shape needs on each active axis.
    pub fn required_guard(&self) -> IntVect {
        IntVect::splat(self.order.guard_extent()).masked(self.geometry.active_axes())
    }

    pub fn prepare_charge<'a>(
        &'a self,
        particles: &'a ParticleContainer,
        tile: usize,
        rho: &'a MultiField,
        opts: &DepositionOptions,
    ) -> PicResult<ValidatedDeposit<'a>> {
        self.prepare(particles, tile, None, &[rho], Quantity::Charge, opts)
    }

    /// Like [`prepare_charge`](Self::prepare_charge), reading positions of
    /// the selected particles from `positions` instead of the tile.
    /// Weights and ionization levels still come from the tile; `positions`
    /// is indexed from the first selected particle.
    pub fn prepare_charge_with_positions<'a>(
        &'a self,
        particles: &'a ParticleContainer,
        tile: usize,
        positions: &'a dyn PositionAccessor,
        rho: &'a MultiField,
        opts: &DepositionOptions,
    ) -> PicResult<ValidatedDeposit<'a>> {
        self.prepare(particles, tile, Some(positions), &[rho], Quantity::Charge, opts)
    }

    pub fn prepare_current<'a>(
        &'a self,
        particles: &'a ParticleContainer,
        tile: usize,
        current: &'a CurrentDensity,
        opts: &DepositionOptions,
    ) -> PicResult<ValidatedDeposit<'a>> {
        if !opts.relative_time.is_finite() {
            return Err(PicError::ConfigError(format!(
                "relative_time must be finite, got {}",
                opts.relative_time
            )));
        }
        let quantity = Quantity::Current {
            relative_time: opts.relative_time,
        };
        self.prepare(particles, tile, None, &current.components(), quantity, opts)
    }

    /// Validate, scatter and merge the charge of one tile.
    pub fn deposit_charge(
        &self,
        particles: &ParticleContainer,
        tile: usize,
        rho: &MultiField,
        opts: &DepositionOptions,
    ) -> PicResult<TileReport> {
        self.prepare_charge(particles, tile, rho, opts)?
            .deposit()?
            .merge()
    }

    /// Validate, scatter and merge the current of one tile.
    pub fn deposit_current(
        &self,
        particles: &ParticleContainer,
        tile: usize,
        current: &CurrentDensity,
        opts: &DepositionOptions,
    ) -> PicResult<TileReport> {
        self.prepare_current(particles, tile, current, opts)?
            .deposit()?
            .merge()
    }

    /// Deposit the charge of every tile of a container. Per-tile sub-ranges
    /// in `opts` are ignored: each tile deposits all its particles.
    pub fn deposit_charge_level(
        &self,
        particles: &ParticleContainer,
        rho: &MultiField,
        opts: &DepositionOptions,
    ) -> PicResult<DepositReport> {
        let opts = whole_tiles(opts);
        self.run_level(particles, "charge", |tile| {
            self.deposit_charge(particles, tile, rho, &opts)
        })
    }

    /// Deposit the current of every tile of a container.
    pub fn deposit_current_level(
        &self,
        particles: &ParticleContainer,
        current: &CurrentDensity,
        opts: &DepositionOptions,
    ) -> PicResult<DepositReport> {
        let opts = whole_tiles(opts);
        self.run_level(particles, "current", |tile| {
            self.deposit_current(particles, tile, current, &opts)
        })
    }

    fn run_level<F>(
        &self,
        particles: &ParticleContainer,
        what: &str,
        deposit_tile: F,
    ) -> PicResult<DepositReport>
    where
        F: Fn(usize) -> PicResult<TileReport> + Sync,
    {
        let start = Instant::now();
        let n_tiles = particles.tiles().len();
        let reports: Vec<TileReport> = match self.strategy.kind() {
            // Tiles in parallel; merges serialize on the destination lock.
            StrategyKind::Tiled => (0..n_tiles)
                .into_par_iter()
                .map(&deposit_tile)
                .collect::<PicResult<_>>()?,
            // Parallelism is inside each tile.
            StrategyKind::Atomic => (0..n_tiles).map(&deposit_tile).collect::<PicResult<_>>()?,
        };
        for r in &reports {
            trace!(
                "{what} tile {}: {} particles, deposit {:?}, merge {:?} ({} points)",
                r.tile,
                r.particles,
                r.deposit_time,
                r.merge_time,
                r.merged_points
            );
        }
        let report = DepositReport {
            strategy: self.strategy.kind(),
            tiles: n_tiles,
            particles: reports.iter().map(|r| r.particles).sum(),
            deposit_time: reports.iter().map(|r| r.deposit_time).sum(),
            merge_time: reports.iter().map(|r| r.merge_time).sum(),
            elapsed: start.elapsed(),
        };
        debug!(
            "{} {what} deposition of '{}' on level {}: {} particles in {} tiles, {:?}",
            report.strategy,
            particles.name(),
            particles.level(),
            report.particles,
            report.tiles,
            report.elapsed
        );
        Ok(report)
    }

    fn prepare<'a>(
        &'a self,
        particles: &'a ParticleContainer,
        tile_index: usize,
        positions: Option<&'a dyn PositionAccessor>,
        fields: &[&'a MultiField],
        quantity: Quantity,
        opts: &DepositionOptions,
    ) -> PicResult<ValidatedDeposit<'a>> {
        let tile = particles.tiles().get(tile_index).ok_or_else(|| {
            PicError::ConfigError(format!(
                "tile index {tile_index} out of range ({} tiles)",
                particles.tiles().len()
            ))
        })?;
        let src_geom = particles.geometry();
        if src_geom.geometry != self.geometry {
            return Err(PicError::ConfigError(format!(
                "particles use {:?} geometry, operation is configured for {:?}",
                src_geom.geometry, self.geometry
            )));
        }
        let active = self.geometry.active_axes();

        let len = tile.particles.len();
        if opts.offset > len {
            return Err(PicError::ConfigError(format!(
                "particle offset {} exceeds tile size {len}",
                opts.offset
            )));
        }
        let count = opts.count.unwrap_or(len - opts.offset);
        if opts.offset.checked_add(count).filter(|&end| end <= len).is_none() {
            return Err(PicError::ConfigError(format!(
                "particle range of {count} from offset {} exceeds tile size {len}",
                opts.offset
            )));
        }
        if let Some(p) = positions {
            if p.len() < count {
                return Err(PicError::ConfigError(format!(
                    "position accessor holds {} particles, range needs {count}",
                    p.len()
                )));
            }
        }

        let (dst_level, ratio) = self.level_pairing(src_geom, opts)?;
        let tile_box = if dst_level == src_geom.level {
            tile.tile_box
        } else {
            if !is_coarsenable(&tile.tile_box, ratio) {
                return Err(PicError::LevelMismatch(format!(
                    "tile {:?} does not coarsen evenly by {ratio:?}",
                    tile.tile_box
                )));
            }
            coarsen_box(&tile.tile_box, ratio)
        };
        let dst_geom = match src_geom.level - dst_level {
            0 => *src_geom,
            _ => src_geom.coarsened(ratio)?,
        };

        let nc = self.components_per_quantity();
        let dst_comp = opts.component * nc;
        let required = self.required_guard();
        let mut reference = IntVect::splat(i64::MAX).masked(active);
        let mut targets = Vec::with_capacity(fields.len());
        for &field in fields {
            check_level(field.geometry(), &dst_geom)?;
            if field.ncomp() < dst_comp + nc {
                return Err(PicError::ConfigError(format!(
                    "destination has {} components, quantity block {} needs {}..{}",
                    field.ncomp(),
                    opts.component,
                    dst_comp,
                    dst_comp + nc
                )));
            }
            let allocated = field.ngrow();
            let ng = opts
                .deposition_guards
                .map_or(allocated, |g| g.masked(active));
            for d in 0..SPACE_DIM {
                if ng[d] < 0 || ng[d] > allocated[d] {
                    return Err(PicError::ConfigError(format!(
                        "deposition guards {ng:?} must lie within the allocated {allocated:?}"
                    )));
                }
            }
            let field_reference = self.strategy.reference_guard(ng, allocated);
            for d in (0..SPACE_DIM).filter(|&d| active[d]) {
                if field_reference[d] < required[d] {
                    return Err(PicError::GuardCellViolation {
                        axis: d,
                        required: required[d],
                        available: field_reference[d],
                    });
                }
            }
            reference = reference.min(&field_reference);

            let fab = field.fab(tile.grid)?;
            let deposit_box = tile_box.convert(field.ixtype()).grow(ng);
            if !fab.index_box().contains_box(&deposit_box) {
                return Err(PicError::ConfigError(format!(
                    "deposition region {deposit_box:?} of grid {} exceeds its allocation {:?}",
                    tile.grid,
                    fab.index_box()
                )));
            }
            let kernel = DepositKernel::new(
                self.order,
                &dst_geom,
                field.ixtype(),
                &deposit_box,
                self.n_modes,
                self.strategy.kernel_component(dst_comp),
            );
            targets.push(PassTarget {
                kernel,
                fab,
                deposit_box,
                dst_comp,
                ncomp: nc,
            });
        }

        let positions: Box<dyn PositionAccessor + 'a> = match positions {
            Some(p) => Box::new(p),
            None => Box::new(tile.particles.positions(opts.offset)),
        };
        let pass = DepositPass {
            particles: &tile.particles,
            positions,
            offset: opts.offset,
            count,
            charge: particles.charge(),
            inv_vol: 1.0 / dst_geom.cell_volume(),
            geometry: self.geometry,
            quantity,
            targets,
        };
        if count > 0 {
            tile.particles.validate_range(opts.offset, count)?;
            let range = (reference - required).masked(active);
            check_particle_range(&pass, src_geom, &tile.tile_box, range)?;
        }
        Ok(ValidatedDeposit {
            strategy: self.strategy.as_ref(),
            tile: tile_index,
            pass,
        })
    }

    /// Destination level and refinement ratio for a call.
    fn level_pairing(
        &self,
        src: &LevelGeometry,
        opts: &DepositionOptions,
    ) -> PicResult<(usize, IntVect)> {
        let lev = src.level;
        let dst = opts.deposition_level.unwrap_or(lev);
        if dst == lev {
            let active = self.geometry.active_axes();
            if let Some(r) = opts.refinement_ratio {
                if r.masked(active) != IntVect::unit().masked(active) {
                    return Err(PicError::LevelMismatch(format!(
                        "refinement ratio {r:?} given for a same-level deposition"
                    )));
                }
            }
            return Ok((lev, IntVect::unit()));
        }
        if dst + 1 != lev {
            return Err(PicError::LevelMismatch(format!(
                "level {lev} particles can deposit into level {lev} or its coarse buffer, not level {dst}"
            )));
        }
        let ratio = opts.refinement_ratio.ok_or_else(|| {
            PicError::LevelMismatch(
                "refinement ratio is required when depositing into the coarse buffer".to_string(),
            )
        })?;
        validate_ratio(ratio, self.geometry.active_axes())?;
        Ok((dst, ratio))
    }
}

fn whole_tiles(opts: &DepositionOptions) -> DepositionOptions {
    DepositionOptions {
        offset: 0,
        count: None,
        ..opts.clone()
    }
}

fn check_level(field: &LevelGeometry, expected: &LevelGeometry) -> PicResult<()> {
    if field.geometry != expected.geometry || field.level != expected.level {
        return Err(PicError::LevelMismatch(format!(
            "destination is level {} ({:?}), deposition targets level {} ({:?})",
            field.level, field.geometry, expected.level, expected.geometry
        )));
    }
    let active = expected.geometry.active_axes();
    for d in (0..SPACE_DIM).filter(|&d| active[d]) {
        let rel = (field.dx[d] - expected.dx[d]).abs() / expected.dx[d];
        if rel > DX_REL_TOL {
            return Err(PicError::LevelMismatch(format!(
                "destination dx[{d}] = {} does not match {} implied by the refinement ratio",
                field.dx[d], expected.dx[d]
            )));
        }
    }
    Ok(())
}

/// Count particles whose cell, on their own level, lies outside the tile
/// grown by `range`.
fn check_particle_range(
    pass: &DepositPass<'_>,
    src_geom: &LevelGeometry,
    tile_box: &IndexBox,
    range: IntVect,
) -> PicResult<()> {
    let allowed = tile_box.grow(range);
    let outside = (0..pass.count)
        .into_par_iter()
        .filter(|&ip| {
            let pos = pass.deposited_position(ip);
            !pos.iter().all(|x| x.is_finite())
                || !allowed.contains(&src_geom.cell_index(pass.geometry.mesh_coords(pos)))
        })
        .count();
    if outside > 0 {
        return Err(PicError::ParticleOutOfRange {
            count: outside,
            range: range.0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::{seed_uniform_particles, MacroParticle, SlicePositions};
    use pic_types::config::SpeciesConfig;
    use pic_types::constants::{C_LIGHT, Q_ELECTRON};
    use pic_types::mesh::{IndexType, Stagger};

    const TOL: f64 = 1e-12;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOL * expected.abs().max(1.0),
            "expected {expected}, got {actual}"
        );
    }

    fn unit_species(ionizable: bool) -> SpeciesConfig {
        // Charge of exactly one coulomb per physical particle.
        SpeciesConfig {
            name: "test".to_string(),
            charge: 1.0 / Q_ELECTRON,
            mass: 1.0,
            ionizable,
        }
    }

    fn level(geometry: Geometry, lev: usize, dx: f64) -> LevelGeometry {
        LevelGeometry::new(geometry, lev, [0.0; 3], [dx; 3]).expect("valid geometry")
    }

    fn container(
        geom: LevelGeometry,
        grids: &[IndexBox],
        tile: IntVect,
        particles: &[MacroParticle],
    ) -> ParticleContainer {
        let mut pc = ParticleContainer::new(geom, &unit_species(false), grids, tile)
            .expect("valid container");
        pc.add_particles(particles).expect("particles inside grids");
        pc
    }

    fn op(geometry: Geometry, order: u32, backend: Backend) -> DepositionOperation {
        DepositionOperation::new(geometry, order, 1, backend).expect("valid operation")
    }

    fn one_d_grid(n: i64) -> Vec<IndexBox> {
        vec![IndexBox::cells(IntVect::zero(), IntVect::new(n - 1, 0, 0))]
    }

    fn whole_fab_sum(mf: &MultiField, comp: usize) -> f64 {
        (0..mf.num_grids())
            .map(|g| mf.fab(g).expect("grid").sum(comp))
            .sum()
    }

    #[test]
    fn test_linear_particle_between_cell_centers_splits_evenly() {
        // 1-D cell-centered mesh with dx = 1: the particle sits on the face
        // between cells 3 and 4, equidistant from both centers.
        let geom = level(Geometry::OneD, 0, 1.0);
        let pc = container(
            geom,
            &one_d_grid(8),
            IntVect::splat(8),
            &[MacroParticle::at_rest([0.0, 0.0, 4.0], 1.0)],
        );
        let rho = MultiField::new(geom, one_d_grid(8), IndexType::cell(), 1, IntVect::splat(2))
            .expect("valid field");
        let report = op(Geometry::OneD, 1, Backend::Host)
            .deposit_charge(&pc, 0, &rho, &DepositionOptions::default())
            .expect("deposit");
        assert_eq!(report.state, DepositState::Merged);
        let fab = rho.fab(0).expect("grid 0");
        for iv in fab.index_box().iter() {
            let expected = if iv[0] == 3 || iv[0] == 4 { 0.5 } else { 0.0 };
            assert_close(fab.get(0, iv), expected);
        }
    }

    #[test]
    fn test_linear_particle_at_cell_center_on_nodal_grid_splits_evenly() {
        let geom = level(Geometry::OneD, 0, 1.0);
        let pc = container(
            geom,
            &one_d_grid(8),
            IntVect::splat(8),
            &[MacroParticle::at_rest([0.0, 0.0, 2.5], 1.0)],
        );
        let rho = MultiField::new(
            geom,
            one_d_grid(8),
            Geometry::OneD.nodal_index_type(),
            1,
            IntVect::splat(2),
        )
        .expect("valid field");
        op(Geometry::OneD, 1, Backend::ManyCore)
            .deposit_charge(&pc, 0, &rho, &DepositionOptions::default())
            .expect("deposit");
        let fab = rho.fab(0).expect("grid 0");
        assert_close(fab.get(0, IntVect::new(2, 0, 0)), 0.5);
        assert_close(fab.get(0, IntVect::new(3, 0, 0)), 0.5);
        assert_close(fab.sum(0), 1.0);
    }

    #[test]
    fn test_uniform_particles_cubic_total_charge_is_one() {
        let geom = level(Geometry::Xz, 0, 0.1);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(15, 15, 0))];
        let particles =
            seed_uniform_particles(1000, [0.0; 3], [1.6, 0.0, 1.6], 1.0e-3, 0.0, 42)
                .expect("valid seed");
        let pc = container(geom, &grids, IntVect::new(16, 16, 1), &particles);
        let rho = MultiField::new(geom, grids, IndexType::cell(), 1, IntVect::splat(3))
            .expect("valid field");
        op(Geometry::Xz, 3, Backend::Host)
            .deposit_charge(&pc, 0, &rho, &DepositionOptions::default())
            .expect("deposit");
        let total = whole_fab_sum(&rho, 0) * geom.cell_volume();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
    }

    #[test]
    fn test_insufficient_guards_fail_before_any_write() {
        let geom = level(Geometry::Xz, 0, 1.0);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(7, 7, 0))];
        let pc = container(
            geom,
            &grids,
            IntVect::splat(8),
            &[MacroParticle::at_rest([3.3, 0.0, 4.1], 1.0)],
        );
        let rho = MultiField::new(geom, grids, IndexType::cell(), 1, IntVect::splat(2))
            .expect("valid field");
        // Order 3 needs 3 guard cells.
        for backend in [Backend::Host, Backend::ManyCore] {
            let err = op(Geometry::Xz, 3, backend)
                .prepare_charge(&pc, 0, &rho, &DepositionOptions::default())
                .expect_err("two guards are too few for order 3");
            match err {
                PicError::GuardCellViolation { required, available, .. } => {
                    assert_eq!((required, available), (3, 2));
                }
                other => panic!("Unexpected error: {other:?}"),
            }
        }
        assert_eq!(whole_fab_sum(&rho, 0), 0.0);
    }

    #[test]
    fn test_reduced_deposition_guards_only_limit_tiled_path() {
        let geom = level(Geometry::Xz, 0, 1.0);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(7, 7, 0))];
        let pc = container(
            geom,
            &grids,
            IntVect::splat(8),
            &[MacroParticle::at_rest([3.3, 0.0, 4.1], 1.0)],
        );
        let rho = MultiField::new(geom, grids, IndexType::cell(), 1, IntVect::splat(3))
            .expect("valid field");
        let opts = DepositionOptions {
            deposition_guards: Some(IntVect::splat(1)),
            ..DepositionOptions::default()
        };
        let host_op = op(Geometry::Xz, 1, Backend::Host);
        let tiled = host_op.prepare_charge(&pc, 0, &rho, &opts);
        assert!(matches!(tiled, Err(PicError::GuardCellViolation { .. })));
        let many_op = op(Geometry::Xz, 1, Backend::ManyCore);
        let atomic = many_op.prepare_charge(&pc, 0, &rho, &opts);
        assert!(atomic.is_ok());

        let too_wide = DepositionOptions {
            deposition_guards: Some(IntVect::splat(4)),
            ..DepositionOptions::default()
        };
        let err = op(Geometry::Xz, 1, Backend::Host)
            .prepare_charge(&pc, 0, &rho, &too_wide)
            .expect_err("guards beyond the allocation");
        match err {
            PicError::ConfigError(msg) => assert!(msg.contains("deposition guards")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_escaped_particle_is_rejected_by_pre_pass() {
        let geom = level(Geometry::Xz, 0, 1.0);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(7, 7, 0))];
        let mut pc = container(
            geom,
            &grids,
            IntVect::new(4, 4, 1),
            &[MacroParticle::at_rest([1.0, 0.0, 1.0], 1.0)],
        );
        // Push the particle of tile 0 two cells past the tile edge; with
        // guards 3 and order 1 only one cell of drift is allowed.
        pc.tiles_mut()[0].particles.x[0] = 5.5;
        let rho = MultiField::new(geom, grids, IndexType::cell(), 1, IntVect::splat(3))
            .expect("valid field");
        let err = op(Geometry::Xz, 1, Backend::Host)
            .prepare_charge(&pc, 0, &rho, &DepositionOptions::default())
            .expect_err("particle escaped its tile");
        match err {
            PicError::ParticleOutOfRange { count, range } => {
                assert_eq!(count, 1);
                assert_eq!(range, [1, 1, 0]);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
        assert_eq!(whole_fab_sum(&rho, 0), 0.0);
    }

    #[test]
    fn test_zero_count_is_a_no_op() {
        let geom = level(Geometry::OneD, 0, 1.0);
        let pc = container(
            geom,
            &one_d_grid(8),
            IntVect::splat(8),
            &[MacroParticle::at_rest([0.0, 0.0, 4.0], 1.0)],
        );
        let rho = MultiField::new(geom, one_d_grid(8), IndexType::cell(), 1, IntVect::splat(2))
            .expect("valid field");
        let opts = DepositionOptions::default().sub_range(1, 0);
        for backend in [Backend::Host, Backend::ManyCore] {
            let report = op(Geometry::OneD, 1, backend)
                .deposit_charge(&pc, 0, &rho, &opts)
                .expect("empty range is valid");
            assert_eq!(report.particles, 0);
        }
        assert_eq!(whole_fab_sum(&rho, 0), 0.0);
        // An empty container on the whole level is also fine.
        let empty = container(geom, &one_d_grid(8), IntVect::splat(4), &[]);
        let report = op(Geometry::OneD, 1, Backend::Host)
            .deposit_charge_level(&empty, &rho, &DepositionOptions::default())
            .expect("empty level");
        assert_eq!((report.tiles, report.particles), (2, 0));
    }

    #[test]
    fn test_sub_range_deposits_only_selected_particles() {
        let geom = level(Geometry::OneD, 0, 1.0);
        let particles: Vec<_> = (0..5)
            .map(|i| MacroParticle::at_rest([0.0, 0.0, 1.5 + i as f64], 1.0 + i as f64))
            .collect();
        let pc = container(geom, &one_d_grid(8), IntVect::splat(8), &particles);
        let rho = MultiField::new(geom, one_d_grid(8), IndexType::cell(), 1, IntVect::splat(2))
            .expect("valid field");
        let report = op(Geometry::OneD, 1, Backend::Host)
            .deposit_charge(&pc, 0, &rho, &DepositionOptions::default().sub_range(1, 3))
            .expect("deposit");
        assert_eq!(report.particles, 3);
        // Weights 2, 3, 4 at cell centers 2, 3, 4.
        let fab = rho.fab(0).expect("grid 0");
        assert_eq!(fab.get(0, IntVect::new(1, 0, 0)), 0.0);
        assert_close(fab.get(0, IntVect::new(2, 0, 0)), 2.0);
        assert_close(fab.get(0, IntVect::new(4, 0, 0)), 4.0);
        assert_eq!(fab.get(0, IntVect::new(5, 0, 0)), 0.0);

        let err = op(Geometry::OneD, 1, Backend::Host)
            .prepare_charge(&pc, 0, &rho, &DepositionOptions::default().sub_range(3, 3))
            .expect_err("range past the end");
        match err {
            PicError::ConfigError(msg) => assert!(msg.contains("exceeds tile size")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sub_range_overflow_is_a_config_error() {
        let geom = level(Geometry::OneD, 0, 1.0);
        let particles = [
            MacroParticle::at_rest([0.0, 0.0, 1.5], 1.0),
            MacroParticle::at_rest([0.0, 0.0, 2.5], 1.0),
        ];
        let pc = container(geom, &one_d_grid(8), IntVect::splat(8), &particles);
        let rho = MultiField::new(geom, one_d_grid(8), IndexType::cell(), 1, IntVect::splat(2))
            .expect("valid field");
        let opts = DepositionOptions::default().sub_range(1, usize::MAX);
        for backend in [Backend::Host, Backend::ManyCore] {
            let err = op(Geometry::OneD, 1, backend)
                .prepare_charge(&pc, 0, &rho, &opts)
                .expect_err("offset + count overflows");
            match err {
                PicError::ConfigError(msg) => assert!(msg.contains("exceeds tile size")),
                other => panic!("Unexpected error: {other:?}"),
            }
        }
        assert_eq!(whole_fab_sum(&rho, 0), 0.0);
    }

    #[test]
    fn test_slice_positions_match_tile_positions() {
        let geom = level(Geometry::Xz, 0, 0.25);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(15, 15, 0))];
        let particles = seed_uniform_particles(60, [0.0; 3], [4.0, 0.0, 4.0], 0.5, 0.0, 11)
            .expect("valid seed");
        let pc = container(geom, &grids, IntVect::new(16, 16, 1), &particles);
        // Array-of-structures copy of the tile, in tile order.
        let tile = &pc.tiles()[0].particles;
        let aos: Vec<MacroParticle> = (0..tile.len()).map(|ip| tile.get(ip)).collect();
        let opts = DepositionOptions::default().sub_range(7, 40);

        for backend in [Backend::Host, Backend::ManyCore] {
            let deposit_op = op(Geometry::Xz, 3, backend);
            let from_tile =
                MultiField::new(geom, grids.clone(), IndexType::cell(), 1, IntVect::splat(3))
                    .expect("valid field");
            deposit_op
                .deposit_charge(&pc, 0, &from_tile, &opts)
                .expect("tile deposit");

            let from_slice =
                MultiField::new(geom, grids.clone(), IndexType::cell(), 1, IntVect::splat(3))
                    .expect("valid field");
            let positions = SlicePositions::new(&aos, 7);
            let report = deposit_op
                .prepare_charge_with_positions(&pc, 0, &positions, &from_slice, &opts)
                .expect("valid")
                .deposit()
                .expect("deposit")
                .merge()
                .expect("merge");
            assert_eq!(report.particles, 40);

            let (a, b) = (from_tile.fab(0).expect("grid"), from_slice.fab(0).expect("grid"));
            for iv in a.index_box().iter() {
                assert!((a.get(0, iv) - b.get(0, iv)).abs() < 1e-9, "{backend:?} at {iv:?}");
            }
            assert_close(b.sum(0) * geom.cell_volume(), 20.0);
        }

        let short = SlicePositions::new(&aos[..10], 0);
        let err = op(Geometry::Xz, 3, Backend::Host)
            .prepare_charge_with_positions(
                &pc,
                0,
                &short,
                &MultiField::new(geom, grids, IndexType::cell(), 1, IntVect::splat(3))
                    .expect("valid field"),
                &opts,
            )
            .expect_err("accessor shorter than the range");
        match err {
            PicError::ConfigError(msg) => assert!(msg.contains("position accessor")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tiled_and_atomic_agree() {
        let geom = level(Geometry::Xz, 0, 0.25);
        let domain = IndexBox::cells(IntVect::zero(), IntVect::new(15, 15, 0));
        let grids = crate::tiling::decompose_domain(&domain, IntVect::new(2, 2, 1)).expect("split");
        let particles = seed_uniform_particles(400, [0.0; 3], [4.0, 0.0, 4.0], 0.5, 0.0, 9)
            .expect("valid seed");
        let pc = container(geom, &grids, IntVect::new(4, 4, 1), &particles);
        let deposit = |backend| {
            let rho =
                MultiField::new(geom, grids.clone(), IndexType::cell(), 1, IntVect::splat(3))
                    .expect("valid field");
            let report = op(Geometry::Xz, 2, backend)
                .deposit_charge_level(&pc, &rho, &DepositionOptions::default())
                .expect("deposit");
            assert_eq!(report.particles, 400);
            rho
        };
        let tiled = deposit(Backend::Host);
        let atomic = deposit(Backend::ManyCore);
        for g in 0..grids.len() {
            let (a, b) = (tiled.fab(g).expect("grid"), atomic.fab(g).expect("grid"));
            for iv in a.index_box().iter() {
                assert!((a.get(0, iv) - b.get(0, iv)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_level_pass_conserves_charge_after_ghost_sum() {
        let geom = level(Geometry::ThreeD, 0, 0.5);
        let domain = IndexBox::cells(IntVect::zero(), IntVect::splat(11));
        let grids = crate::tiling::decompose_domain(&domain, IntVect::new(2, 1, 2)).expect("split");
        // Keep clear of the domain edge so no charge lands outside every grid.
        let particles = seed_uniform_particles(300, [1.5; 3], [4.5; 3], 2.0, 0.0, 5)
            .expect("valid seed");
        let pc = container(geom, &grids, IntVect::splat(3), &particles);
        let mut rho = MultiField::new(geom, grids, IndexType::cell(), 1, IntVect::splat(3))
            .expect("valid field");
        op(Geometry::ThreeD, 4, Backend::Host)
            .deposit_charge_level(&pc, &rho, &DepositionOptions::default())
            .expect("deposit");
        rho.sum_boundary();
        let total = rho.sum_unique(0) * geom.cell_volume();
        assert!((total - 600.0).abs() < 1e-9, "total = {total}");
    }

    #[test]
    fn test_coarse_buffer_matches_direct_coarse_deposit() {
        let ratio = IntVect::new(2, 2, 1);
        let fine = level(Geometry::Xz, 1, 0.5);
        let coarse = level(Geometry::Xz, 0, 1.0);
        let fine_grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(15, 15, 0))];
        let coarse_grids = vec![coarsen_box(&fine_grids[0], ratio)];
        let p = MacroParticle::at_rest([3.3, 0.0, 4.6], 1.0);
        let fine_pc = container(fine, &fine_grids, IntVect::new(8, 8, 1), &[p]);
        let coarse_pc = container(coarse, &coarse_grids, IntVect::new(4, 4, 1), &[p]);
        let opts = DepositionOptions::coarse_buffer(1, ratio).expect("level 1");

        for backend in [Backend::Host, Backend::ManyCore] {
            let deposit_op = op(Geometry::Xz, 1, backend);
            let buffer = MultiField::new(
                coarse,
                coarse_grids.clone(),
                IndexType::cell(),
                1,
                IntVect::splat(2),
            )
            .expect("valid field");
            deposit_op
                .deposit_charge_level(&fine_pc, &buffer, &opts)
                .expect("buffer deposit");

            let direct = MultiField::new(
                coarse,
                coarse_grids.clone(),
                IndexType::cell(),
                1,
                IntVect::splat(2),
            )
            .expect("valid field");
            deposit_op
                .deposit_charge_level(&coarse_pc, &direct, &DepositionOptions::default())
                .expect("direct deposit");

            let (a, b) = (buffer.fab(0).expect("grid"), direct.fab(0).expect("grid"));
            for iv in a.index_box().iter() {
                assert!((a.get(0, iv) - b.get(0, iv)).abs() < 1e-12, "{backend:?} at {iv:?}");
            }
            assert_close(a.sum(0), 1.0);
        }
    }

    #[test]
    fn test_level_pairing_errors() {
        let fine = level(Geometry::Xz, 1, 0.5);
        let coarse = level(Geometry::Xz, 0, 1.0);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(7, 7, 0))];
        let pc = container(fine, &grids, IntVect::new(4, 4, 1), &[]);
        let buffer = MultiField::new(
            coarse,
            vec![IndexBox::cells(IntVect::zero(), IntVect::new(3, 3, 0))],
            IndexType::cell(),
            1,
            IntVect::splat(2),
        )
        .expect("valid field");
        let deposit_op = op(Geometry::Xz, 1, Backend::Host);

        let missing_ratio = DepositionOptions {
            deposition_level: Some(0),
            ..DepositionOptions::default()
        };
        let wrong_ratio =
            DepositionOptions::coarse_buffer(1, IntVect::new(4, 4, 1)).expect("level 1");
        let skip_level = DepositionOptions {
            deposition_level: Some(3),
            ..DepositionOptions::default()
        };
        for opts in [missing_ratio, wrong_ratio, skip_level] {
            let err = deposit_op
                .prepare_charge(&pc, 0, &buffer, &opts)
                .expect_err("incompatible level pairing");
            assert!(matches!(err, PicError::LevelMismatch(_)), "got {err:?}");
        }
        // Same-level deposition into a field of another level.
        let err = deposit_op
            .prepare_charge(&pc, 0, &buffer, &DepositionOptions::default())
            .expect_err("field is on level 0");
        assert!(matches!(err, PicError::LevelMismatch(_)));
    }

    #[test]
    fn test_rz_modes_fill_component_block() {
        let geom = level(Geometry::Rz, 0, 1.0);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::new(7, 7, 0))];
        // r = 2 at theta = 90 degrees, z = 3: on a node.
        let pc = container(
            geom,
            &grids,
            IntVect::new(8, 8, 1),
            &[MacroParticle::at_rest([0.0, 2.0, 3.0], 1.0)],
        );
        let deposit_op =
            DepositionOperation::new(Geometry::Rz, 1, 2, Backend::Host).expect("valid operation");
        assert_eq!(deposit_op.components_per_quantity(), 3);
        // Two quantity blocks of three components; write the second.
        let rho = MultiField::new(geom, grids.clone(), IndexType::node(), 6, IntVect::splat(2))
            .expect("valid field");
        let opts = DepositionOptions {
            component: 1,
            ..DepositionOptions::default()
        };
        deposit_op.deposit_charge(&pc, 0, &rho, &opts).expect("deposit");
        let fab = rho.fab(0).expect("grid");
        let node = IntVect::new(2, 3, 0);
        assert_eq!(fab.sum(0), 0.0);
        assert_close(fab.get(3, node), 1.0);
        assert_close(fab.get(4, node), 0.0);
        assert_close(fab.get(5, node), 1.0);

        let small = MultiField::new(geom, grids, IndexType::node(), 3, IntVect::splat(2))
            .expect("valid field");
        let err = deposit_op
            .prepare_charge(&pc, 0, &small, &opts)
            .expect_err("block 1 does not fit");
        match err {
            PicError::ConfigError(msg) => assert!(msg.contains("components")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ionization_level_scales_charge() {
        let geom = level(Geometry::OneD, 0, 1.0);
        let mut pc =
            ParticleContainer::new(geom, &unit_species(true), &one_d_grid(8), IntVect::splat(8))
                .expect("valid container");
        let mut p = MacroParticle::at_rest([0.0, 0.0, 3.5], 1.0);
        p.ion_level = 3;
        pc.add_particles(&[p]).expect("inside");
        let rho = MultiField::new(geom, one_d_grid(8), IndexType::cell(), 1, IntVect::splat(2))
            .expect("valid field");
        op(Geometry::OneD, 1, Backend::ManyCore)
            .deposit_charge(&pc, 0, &rho, &DepositionOptions::default())
            .expect("deposit");
        assert_close(rho.fab(0).expect("grid").get(0, IntVect::new(3, 0, 0)), 3.0);
    }

    #[test]
    fn test_current_is_charge_times_velocity_on_yee_grid() {
        let geom = level(Geometry::ThreeD, 0, 1.0);
        let grids = vec![IndexBox::cells(IntVect::zero(), IntVect::splat(7))];
        let mut p = MacroParticle::at_rest([3.2, 4.7, 2.9], 2.0);
        p.ux_m_s = 1.0e6;
        p.uy_m_s = -2.0e6;
        p.uz_m_s = 3.0e5;
        let v = p.velocity_m_s();
        let pc = container(geom, &grids, IntVect::splat(8), &[p]);
        for backend in [Backend::Host, Backend::ManyCore] {
            let j = CurrentDensity::new(geom, grids.clone(), 1, IntVect::splat(2))
                .expect("valid current");
            op(Geometry::ThreeD, 2, backend)
                .deposit_current(&pc, 0, &j, &DepositionOptions::default())
                .expect("deposit");
            for (k, field) in j.components().iter().enumerate() {
                let total = field.fab(0).expect("grid").sum(0);
                assert!((total - 2.0 * v[k]).abs() < 1e-6 * v[k].abs(), "component {k}");
            }
            // jx is cell-centered along x only.
            assert_eq!(j.jx.ixtype().0, [Stagger::Cell, Stagger::Node, Stagger::Node]);
        }
    }

    #[test]
    fn test_relative_time_shifts_current_deposition() {
        let geom = level(Geometry::OneD, 0, 1.0);
        let mut p = MacroParticle::at_rest([0.0, 0.0, 3.0], 1.0);
        p.uz_m_s = 0.5 * C_LIGHT;
        let vz = p.velocity_m_s()[2];
        let pc = container(geom, &one_d_grid(8), IntVect::splat(8), &[p]);
        let j =
            CurrentDensity::new(geom, one_d_grid(8), 1, IntVect::splat(2)).expect("valid current");
        // Half a cell forward puts the particle on jz's cell center 3.
        let opts = DepositionOptions {
            relative_time: 0.5 / vz,
            ..DepositionOptions::default()
        };
        op(Geometry::OneD, 1, Backend::Host)
            .deposit_current(&pc, 0, &j, &opts)
            .expect("deposit");
        let jz = j.jz.fab(0).expect("grid");
        assert!((jz.get(0, IntVect::new(3, 0, 0)) - vz).abs() < 1e-6 * vz);
        assert_eq!(j.jx.fab(0).expect("grid").sum(0), 0.0);

        let bad = DepositionOptions {
            relative_time: f64::NAN,
            ..DepositionOptions::default()
        };
        assert!(op(Geometry::OneD, 1, Backend::Host)
            .prepare_current(&pc, 0, &j, &bad)
            .is_err());
    }

    #[test]
    fn test_state_machine_paths() {
        let geom = level(Geometry::OneD, 0, 1.0);
        let pc = container(
            geom,
            &one_d_grid(8),
            IntVect::splat(8),
            &[MacroParticle::at_rest([0.0, 0.0, 4.0], 1.0)],
        );
        let rho = MultiField::new(geom, one_d_grid(8), IndexType::cell(), 1, IntVect::splat(2))
            .expect("valid field");
        let tiled = op(Geometry::OneD, 1, Backend::Host);
        let validated = tiled
            .prepare_charge(&pc, 0, &rho, &DepositionOptions::default())
            .expect("valid");
        assert_eq!(validated.state(), DepositState::Validated);
        let deposited = validated.deposit().expect("deposit");
        assert!(deposited.needs_merge());
        // Nothing reaches the destination before the merge.
        assert_eq!(rho.fab(0).expect("grid").sum(0), 0.0);
        assert_eq!(deposited.merge().expect("merge").state, DepositState::Merged);
        assert_close(rho.fab(0).expect("grid").sum(0), 1.0);

        let atomic = tiled.with_backend(Backend::ManyCore);
        let deposited = atomic
            .prepare_charge(&pc, 0, &rho, &DepositionOptions::default())
            .expect("valid")
            .deposit()
            .expect("deposit");
        assert!(!deposited.needs_merge());
        assert_close(rho.fab(0).expect("grid").sum(0), 2.0);
        assert_eq!(deposited.merge().expect("no-op merge").state, DepositState::Deposited);
    }

    #[test]
    fn test_from_config_rejects_invalid_order() {
        let cfg = DepositionConfig {
            geometry: Geometry::Xz,
            shape_order: 5,
            n_rz_azimuthal_modes: 1,
            backend: Backend::Auto,
            tile_size: [8, 8, 8],
            species: vec![],
        };
        let err = DepositionOperation::from_config(&cfg).expect_err("order 5");
        match err {
            PicError::ConfigError(msg) => assert!(msg.contains("shape_order")),
            other => panic!("Unexpected error: {other:?}"),
        }
        let operation = DepositionOperation::from_config(&DepositionConfig {
            shape_order: 2,
            ..cfg
        })
        .expect("valid config");
        assert_eq!(operation.strategy_kind(), StrategyKind::Tiled);
        assert_eq!(operation.required_guard(), IntVect::new(2, 2, 0));
    }
}
