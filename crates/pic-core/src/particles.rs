//! Macro-particle storage and layout-independent position access.
//!
//! Tiles keep particles as structure-of-arrays. Deposition reads them
//! through [`PositionAccessor`], which also accepts an index offset so a
//! contiguous sub-range (e.g. the part of a tile that belongs to a coarse
//! buffer) can be addressed from zero.

use pic_types::constants::C_LIGHT;
use pic_types::error::{PicError, PicResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fmt;

const INV_C2: f64 = 1.0 / (C_LIGHT * C_LIGHT);

/// One macro-particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacroParticle {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    /// Momentum per unit mass, `gamma * v`.
    pub ux_m_s: f64,
    pub uy_m_s: f64,
    pub uz_m_s: f64,
    /// Number of physical particles represented.
    pub weight: f64,
    /// Charge state; only read for ionizable species.
    pub ion_level: i32,
}

impl MacroParticle {
    /// Particle at rest.
    pub fn at_rest(position: [f64; 3], weight: f64) -> Self {
        MacroParticle {
            x_m: position[0],
            y_m: position[1],
            z_m: position[2],
            ux_m_s: 0.0,
            uy_m_s: 0.0,
            uz_m_s: 0.0,
            weight,
            ion_level: 1,
        }
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x_m, self.y_m, self.z_m]
    }

    pub fn velocity_m_s(&self) -> [f64; 3] {
        velocity_from_momentum([self.ux_m_s, self.uy_m_s, self.uz_m_s])
    }
}

/// `v = u / gamma` with `gamma = sqrt(1 + |u|^2 / c^2)`.
pub fn velocity_from_momentum(u: [f64; 3]) -> [f64; 3] {
    let u2 = u[0] * u[0] + u[1] * u[1] + u[2] * u[2];
    let inv_gamma = 1.0 / (1.0 + u2 * INV_C2).sqrt();
    [u[0] * inv_gamma, u[1] * inv_gamma, u[2] * inv_gamma]
}

/// Structure-of-arrays particle storage of one tile.
#[derive(Debug, Clone, Default)]
pub struct ParticleTile {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub ux: Vec<f64>,
    pub uy: Vec<f64>,
    pub uz: Vec<f64>,
    pub weight: Vec<f64>,
    /// Present only for ionizable species.
    pub ion_level: Option<Vec<i32>>,
}

impl ParticleTile {
    pub fn new(ionizable: bool) -> Self {
        ParticleTile {
            ion_level: ionizable.then(Vec::new),
            ..ParticleTile::default()
        }
    }

    pub fn from_particles(particles: &[MacroParticle], ionizable: bool) -> Self {
        let mut tile = ParticleTile::new(ionizable);
        for p in particles {
            tile.push(p);
        }
        tile
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn push(&mut self, p: &MacroParticle) {
        self.x.push(p.x_m);
        self.y.push(p.y_m);
        self.z.push(p.z_m);
        self.ux.push(p.ux_m_s);
        self.uy.push(p.uy_m_s);
        self.uz.push(p.uz_m_s);
        self.weight.push(p.weight);
        if let Some(levels) = self.ion_level.as_mut() {
            levels.push(p.ion_level);
        }
    }

    pub fn get(&self, ip: usize) -> MacroParticle {
        MacroParticle {
            x_m: self.x[ip],
            y_m: self.y[ip],
            z_m: self.z[ip],
            ux_m_s: self.ux[ip],
            uy_m_s: self.uy[ip],
            uz_m_s: self.uz[ip],
            weight: self.weight[ip],
            ion_level: self.ion_level.as_ref().map_or(1, |lv| lv[ip]),
        }
    }

    /// Accessor whose index 0 is slot `offset`.
    pub fn positions(&self, offset: usize) -> TilePositions<'_> {
        TilePositions { tile: self, offset }
    }

    pub fn velocity_m_s(&self, ip: usize) -> [f64; 3] {
        velocity_from_momentum([self.ux[ip], self.uy[ip], self.uz[ip]])
    }

    /// Ionization level of slot `ip`, if the species is ionizable.
    pub fn ion_level(&self, ip: usize) -> Option<i32> {
        self.ion_level.as_ref().map(|lv| lv[ip])
    }

    /// Check that slots `[offset, offset + count)` hold finite state.
    pub fn validate_range(&self, offset: usize, count: usize) -> PicResult<()> {
        for ip in offset..offset + count {
            if !self.x[ip].is_finite() || !self.y[ip].is_finite() || !self.z[ip].is_finite() {
                return Err(PicError::PhysicsViolation(format!(
                    "particle[{ip}] position components must be finite"
                )));
            }
            if !self.ux[ip].is_finite() || !self.uy[ip].is_finite() || !self.uz[ip].is_finite() {
                return Err(PicError::PhysicsViolation(format!(
                    "particle[{ip}] momentum components must be finite"
                )));
            }
            if !self.weight[ip].is_finite() {
                return Err(PicError::PhysicsViolation(format!(
                    "particle[{ip}].weight must be finite"
                )));
            }
        }
        Ok(())
    }
}

/// Read access to particle positions, independent of storage layout.
pub trait PositionAccessor: Sync + fmt::Debug {
    /// Cartesian position (m) of the `ip`-th particle after the accessor's offset.
    fn position(&self, ip: usize) -> [f64; 3];

    /// Particles addressable from the offset.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: PositionAccessor + ?Sized> PositionAccessor for &P {
    #[inline]
    fn position(&self, ip: usize) -> [f64; 3] {
        (**self).position(ip)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Positions of a structure-of-arrays tile.
#[derive(Debug, Clone, Copy)]
pub struct TilePositions<'a> {
    tile: &'a ParticleTile,
    offset: usize,
}

impl TilePositions<'_> {
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl PositionAccessor for TilePositions<'_> {
    #[inline]
    fn position(&self, ip: usize) -> [f64; 3] {
        let i = self.offset + ip;
        [self.tile.x[i], self.tile.y[i], self.tile.z[i]]
    }

    fn len(&self) -> usize {
        self.tile.len().saturating_sub(self.offset)
    }
}

/// Positions of an array-of-structures particle slice.
#[derive(Debug, Clone, Copy)]
pub struct SlicePositions<'a> {
    particles: &'a [MacroParticle],
    offset: usize,
}

impl<'a> SlicePositions<'a> {
    pub fn new(particles: &'a [MacroParticle], offset: usize) -> Self {
        SlicePositions { particles, offset }
    }
}

impl PositionAccessor for SlicePositions<'_> {
    #[inline]
    fn position(&self, ip: usize) -> [f64; 3] {
        self.particles[self.offset + ip].position()
    }

    fn len(&self) -> usize {
        self.particles.len().saturating_sub(self.offset)
    }
}

/// Deterministic particles uniformly filling the box `[lo, hi)`, with
/// Gaussian momenta of spread `u_thermal` per component.
pub fn seed_uniform_particles(
    n_particles: usize,
    lo: [f64; 3],
    hi: [f64; 3],
    weight_per_particle: f64,
    u_thermal: f64,
    seed: u64,
) -> PicResult<Vec<MacroParticle>> {
    for d in 0..3 {
        if !lo[d].is_finite() || !hi[d].is_finite() || hi[d] < lo[d] {
            return Err(PicError::PhysicsViolation(format!(
                "seed box axis {d} must be finite with lo <= hi, got [{}, {}]",
                lo[d], hi[d]
            )));
        }
    }
    if !weight_per_particle.is_finite() || weight_per_particle <= 0.0 {
        return Err(PicError::PhysicsViolation(
            "weight_per_particle must be finite and > 0".to_string(),
        ));
    }
    if !u_thermal.is_finite() || u_thermal < 0.0 {
        return Err(PicError::PhysicsViolation(
            "u_thermal must be finite and >= 0".to_string(),
        ));
    }
    let thermal = Normal::new(0.0, u_thermal)
        .map_err(|e| PicError::PhysicsViolation(format!("thermal distribution: {e}")))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(n_particles);
    for _ in 0..n_particles {
        let mut pos = [0.0; 3];
        for d in 0..3 {
            pos[d] = if hi[d] > lo[d] {
                rng.gen_range(lo[d]..hi[d])
            } else {
                lo[d]
            };
        }
        let mut p = MacroParticle::at_rest(pos, weight_per_particle);
        p.ux_m_s = thermal.sample(&mut rng);
        p.uy_m_s = thermal.sample(&mut rng);
        p.uz_m_s = thermal.sample(&mut rng);
        out.push(p);
    }
    Ok(out)
}
