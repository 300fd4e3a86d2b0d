// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Index-Space Mesh Types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Integer index space of a structured, block-decomposed mesh.
//!
//! Every vector carries three slots. Axes that a geometry does not resolve
//! are "inactive": their boxes span the single index 0 and they are always
//! cell-centered, so loops over them run exactly once.

use crate::constants::SPACE_DIM;
use crate::error::{PicError, PicResult};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Index, IndexMut, Mul, Sub};

/// Integer vector in index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntVect(pub [i64; SPACE_DIM]);

impl IntVect {
    pub const fn new(i: i64, j: i64, k: i64) -> Self {
        IntVect([i, j, k])
    }

    pub const fn splat(v: i64) -> Self {
        IntVect([v; SPACE_DIM])
    }

    pub const fn zero() -> Self {
        IntVect([0; SPACE_DIM])
    }

    pub const fn unit() -> Self {
        IntVect([1; SPACE_DIM])
    }

    pub fn all_le(&self, other: &IntVect) -> bool {
        (0..SPACE_DIM).all(|d| self.0[d] <= other.0[d])
    }

    pub fn all_ge(&self, other: &IntVect) -> bool {
        (0..SPACE_DIM).all(|d| self.0[d] >= other.0[d])
    }

    pub fn min(&self, other: &IntVect) -> IntVect {
        IntVect(std::array::from_fn(|d| self.0[d].min(other.0[d])))
    }

    pub fn max(&self, other: &IntVect) -> IntVect {
        IntVect(std::array::from_fn(|d| self.0[d].max(other.0[d])))
    }

    /// Zero the slots of inactive axes.
    pub fn masked(&self, active: [bool; SPACE_DIM]) -> IntVect {
        IntVect(std::array::from_fn(|d| if active[d] { self.0[d] } else { 0 }))
    }
}

impl Add for IntVect {
    type Output = IntVect;
    fn add(self, rhs: IntVect) -> IntVect {
        IntVect(std::array::from_fn(|d| self.0[d] + rhs.0[d]))
    }
}

impl Sub for IntVect {
    type Output = IntVect;
    fn sub(self, rhs: IntVect) -> IntVect {
        IntVect(std::array::from_fn(|d| self.0[d] - rhs.0[d]))
    }
}

impl Mul for IntVect {
    type Output = IntVect;
    fn mul(self, rhs: IntVect) -> IntVect {
        IntVect(std::array::from_fn(|d| self.0[d] * rhs.0[d]))
    }
}

impl Index<usize> for IntVect {
    type Output = i64;
    fn index(&self, axis: usize) -> &i64 {
        &self.0[axis]
    }
}

impl IndexMut<usize> for IntVect {
    fn index_mut(&mut self, axis: usize) -> &mut i64 {
        &mut self.0[axis]
    }
}

/// Placement of a mesh quantity along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stagger {
    /// Values live at cell centers, `lo + (i + 1/2) dx`.
    Cell,
    /// Values live on cell nodes, `lo + i dx`.
    Node,
}

/// Per-axis staggering of a mesh quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexType(pub [Stagger; SPACE_DIM]);

impl IndexType {
    pub const fn cell() -> Self {
        IndexType([Stagger::Cell; SPACE_DIM])
    }

    pub const fn node() -> Self {
        IndexType([Stagger::Node; SPACE_DIM])
    }

    pub fn is_node(&self, axis: usize) -> bool {
        self.0[axis] == Stagger::Node
    }

    /// Shift (in cells) between a cell's lower corner and the grid point of that index.
    pub fn stagger_shift(&self, axis: usize) -> f64 {
        match self.0[axis] {
            Stagger::Cell => 0.5,
            Stagger::Node => 0.0,
        }
    }
}

impl Default for IndexType {
    fn default() -> Self {
        IndexType::cell()
    }
}

/// Inclusive rectangular region of index space with a staggering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBox {
    pub lo: IntVect,
    pub hi: IntVect,
    pub ixtype: IndexType,
}

impl IndexBox {
    /// Cell-centered box `[lo, hi]`.
    pub fn cells(lo: IntVect, hi: IntVect) -> Self {
        IndexBox {
            lo,
            hi,
            ixtype: IndexType::cell(),
        }
    }

    pub fn with_type(lo: IntVect, hi: IntVect, ixtype: IndexType) -> Self {
        IndexBox { lo, hi, ixtype }
    }

    pub fn is_empty(&self) -> bool {
        (0..SPACE_DIM).any(|d| self.hi[d] < self.lo[d])
    }

    /// Number of points along each axis.
    pub fn size(&self) -> IntVect {
        IntVect(std::array::from_fn(|d| (self.hi[d] - self.lo[d] + 1).max(0)))
    }

    /// Number of points along each axis, ready for array allocation.
    pub fn shape(&self) -> [usize; SPACE_DIM] {
        let size = self.size();
        std::array::from_fn(|d| size[d] as usize)
    }

    pub fn num_pts(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn contains(&self, iv: &IntVect) -> bool {
        self.lo.all_le(iv) && iv.all_le(&self.hi)
    }

    pub fn contains_box(&self, other: &IndexBox) -> bool {
        other.is_empty() || (self.contains(&other.lo) && self.contains(&other.hi))
    }

    /// Grow by `n` points on both sides of every axis.
    pub fn grow(&self, n: IntVect) -> IndexBox {
        IndexBox {
            lo: self.lo - n,
            hi: self.hi + n,
            ixtype: self.ixtype,
        }
    }

    /// Change staggering; a cell axis becoming nodal gains its upper node.
    pub fn convert(&self, ixtype: IndexType) -> IndexBox {
        let mut hi = self.hi;
        for d in 0..SPACE_DIM {
            match (self.ixtype.0[d], ixtype.0[d]) {
                (Stagger::Cell, Stagger::Node) => hi[d] += 1,
                (Stagger::Node, Stagger::Cell) => hi[d] -= 1,
                _ => {}
            }
        }
        IndexBox {
            lo: self.lo,
            hi,
            ixtype,
        }
    }

    /// Overlap of two boxes of the same staggering.
    pub fn intersect(&self, other: &IndexBox) -> Option<IndexBox> {
        if self.ixtype != other.ixtype {
            return None;
        }
        let out = IndexBox {
            lo: self.lo.max(&other.lo),
            hi: self.hi.min(&other.hi),
            ixtype: self.ixtype,
        };
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    /// Position of `iv` relative to the box's lower corner.
    pub fn offset_of(&self, iv: &IntVect) -> [usize; SPACE_DIM] {
        std::array::from_fn(|d| (iv[d] - self.lo[d]) as usize)
    }

    /// Points of the box in row-major order (last axis fastest).
    pub fn iter(&self) -> impl Iterator<Item = IntVect> + '_ {
        let lo = self.lo;
        let size = self.size();
        let n = if self.is_empty() { 0 } else { self.num_pts() };
        (0..n).map(move |flat| {
            let k = (flat as i64) % size[2];
            let j = ((flat as i64) / size[2]) % size[1];
            let i = (flat as i64) / (size[2] * size[1]);
            IntVect::new(lo[0] + i, lo[1] + j, lo[2] + k)
        })
    }
}

/// Spatial geometry of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Geometry {
    /// One resolved axis, z.
    #[serde(rename = "1d")]
    OneD,
    /// Two resolved Cartesian axes, x and z.
    #[serde(rename = "xz")]
    Xz,
    /// Cylindrical r-z mesh with azimuthal Fourier modes.
    #[serde(rename = "rz")]
    Rz,
    /// Three resolved Cartesian axes.
    #[serde(rename = "3d")]
    ThreeD,
}

impl Geometry {
    pub fn active_axes(&self) -> [bool; SPACE_DIM] {
        match self {
            Geometry::OneD => [true, false, false],
            Geometry::Xz | Geometry::Rz => [true, true, false],
            Geometry::ThreeD => [true, true, true],
        }
    }

    pub fn n_active(&self) -> usize {
        self.active_axes().iter().filter(|&&a| a).count()
    }

    pub fn is_rz(&self) -> bool {
        matches!(self, Geometry::Rz)
    }

    /// Cartesian component (0 = x, 1 = y, 2 = z) carried by each mesh axis.
    /// In RZ the first mesh axis is the radius, reported as component 0.
    pub fn mesh_axis_components(&self) -> [Option<usize>; SPACE_DIM] {
        match self {
            Geometry::OneD => [Some(2), None, None],
            Geometry::Xz | Geometry::Rz => [Some(0), Some(2), None],
            Geometry::ThreeD => [Some(0), Some(1), Some(2)],
        }
    }

    /// Map a Cartesian particle position to mesh coordinates.
    pub fn mesh_coords(&self, pos: [f64; 3]) -> [f64; SPACE_DIM] {
        match self {
            Geometry::OneD => [pos[2], 0.0, 0.0],
            Geometry::Xz => [pos[0], pos[2], 0.0],
            Geometry::Rz => [(pos[0] * pos[0] + pos[1] * pos[1]).sqrt(), pos[2], 0.0],
            Geometry::ThreeD => pos,
        }
    }

    /// Real components one quantity occupies: `2 n - 1` in RZ, otherwise one.
    pub fn components_per_quantity(&self, n_rz_azimuthal_modes: usize) -> usize {
        if self.is_rz() {
            (2 * n_rz_azimuthal_modes).saturating_sub(1)
        } else {
            1
        }
    }

    /// Yee staggering of current component `comp` (0 = x/r, 1 = y/theta, 2 = z):
    /// cell-centered along the mesh axis carrying that component, nodal elsewhere.
    pub fn current_index_type(&self, comp: usize) -> IndexType {
        let components = self.mesh_axis_components();
        IndexType(std::array::from_fn(|d| match components[d] {
            Some(c) if c == comp => Stagger::Cell,
            Some(_) => Stagger::Node,
            None => Stagger::Cell,
        }))
    }

    /// Nodal on every active axis, cell-centered on inactive ones.
    pub fn nodal_index_type(&self) -> IndexType {
        let active = self.active_axes();
        IndexType(std::array::from_fn(|d| {
            if active[d] {
                Stagger::Node
            } else {
                Stagger::Cell
            }
        }))
    }
}

/// Physical layout of one refinement level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelGeometry {
    pub geometry: Geometry,
    pub level: usize,
    /// Physical coordinate of index 0's lower corner.
    pub prob_lo: [f64; SPACE_DIM],
    /// Cell spacing; ignored on inactive axes.
    pub dx: [f64; SPACE_DIM],
}

impl LevelGeometry {
    pub fn new(
        geometry: Geometry,
        level: usize,
        prob_lo: [f64; SPACE_DIM],
        dx: [f64; SPACE_DIM],
    ) -> PicResult<Self> {
        let active = geometry.active_axes();
        for d in 0..SPACE_DIM {
            if !active[d] {
                continue;
            }
            if !prob_lo[d].is_finite() {
                return Err(PicError::ConfigError(format!(
                    "prob_lo[{d}] must be finite, got {}",
                    prob_lo[d]
                )));
            }
            if !dx[d].is_finite() || dx[d] <= 0.0 {
                return Err(PicError::ConfigError(format!(
                    "dx[{d}] must be finite and > 0, got {}",
                    dx[d]
                )));
            }
        }
        Ok(LevelGeometry {
            geometry,
            level,
            prob_lo: std::array::from_fn(|d| if active[d] { prob_lo[d] } else { 0.0 }),
            dx: std::array::from_fn(|d| if active[d] { dx[d] } else { 1.0 }),
        })
    }

    pub fn inv_dx(&self) -> [f64; SPACE_DIM] {
        std::array::from_fn(|d| 1.0 / self.dx[d])
    }

    /// Product of the active cell spacings.
    pub fn cell_volume(&self) -> f64 {
        let active = self.geometry.active_axes();
        (0..SPACE_DIM)
            .filter(|&d| active[d])
            .map(|d| self.dx[d])
            .product()
    }

    /// Physical position of a box's lower cell corner.
    pub fn lower_corner(&self, bx: &IndexBox) -> [f64; SPACE_DIM] {
        let active = self.geometry.active_axes();
        std::array::from_fn(|d| {
            if active[d] {
                self.prob_lo[d] + bx.lo[d] as f64 * self.dx[d]
            } else {
                0.0
            }
        })
    }

    /// Index of the cell containing a point given in mesh coordinates.
    pub fn cell_index(&self, mesh_pos: [f64; SPACE_DIM]) -> IntVect {
        let active = self.geometry.active_axes();
        IntVect(std::array::from_fn(|d| {
            if active[d] {
                ((mesh_pos[d] - self.prob_lo[d]) / self.dx[d]).floor() as i64
            } else {
                0
            }
        }))
    }

    /// Geometry of the next coarser level for a refinement ratio.
    pub fn coarsened(&self, ratio: IntVect) -> PicResult<LevelGeometry> {
        if self.level == 0 {
            return Err(PicError::LevelMismatch(
                "level 0 has no coarser level".to_string(),
            ));
        }
        let active = self.geometry.active_axes();
        let mut dx = self.dx;
        for d in 0..SPACE_DIM {
            if !active[d] {
                continue;
            }
            if ratio[d] < 1 {
                return Err(PicError::LevelMismatch(format!(
                    "refinement ratio must be >= 1, got {ratio:?}"
                )));
            }
            dx[d] *= ratio[d] as f64;
        }
        LevelGeometry::new(self.geometry, self.level - 1, self.prob_lo, dx)
    }
}
