// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Block-Decomposed Mesh Fields
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Mesh quantities stored as one ghost-padded array per grid.
//!
//! Deposition leaves contributions in the ghost cells of the grid that
//! owns a particle. [`MultiField::sum_boundary`] folds every copy of a
//! physical point into all fabs that hold it, after which each valid
//! point carries the complete deposited value.

use crate::fab::SharedFab;
use pic_types::error::{PicError, PicResult};
use pic_types::mesh::{IndexBox, IndexType, IntVect, LevelGeometry};

/// One mesh quantity over a list of grids of a single level.
#[derive(Debug)]
pub struct MultiField {
    geom: LevelGeometry,
    grids: Vec<IndexBox>,
    ixtype: IndexType,
    ncomp: usize,
    ngrow: IntVect,
    fabs: Vec<SharedFab>,
}

impl MultiField {
    /// Allocate zeroed fabs of `ncomp` components over cell-centered `grids`,
    /// converted to `ixtype` and grown by `ngrow` ghost points per side.
    pub fn new(
        geom: LevelGeometry,
        grids: Vec<IndexBox>,
        ixtype: IndexType,
        ncomp: usize,
        ngrow: IntVect,
    ) -> PicResult<Self> {
        if ncomp == 0 {
            return Err(PicError::ConfigError(
                "field needs at least one component".to_string(),
            ));
        }
        if grids.is_empty() {
            return Err(PicError::ConfigError(
                "field needs at least one grid".to_string(),
            ));
        }
        let active = geom.geometry.active_axes();
        if !ngrow.all_ge(&IntVect::zero()) {
            return Err(PicError::ConfigError(format!(
                "ghost width must be >= 0, got {ngrow:?}"
            )));
        }
        for (ig, g) in grids.iter().enumerate() {
            if g.ixtype != IndexType::cell() || g.is_empty() {
                return Err(PicError::ConfigError(format!(
                    "grid {ig} must be a non-empty cell box, got {g:?}"
                )));
            }
            for d in 0..3 {
                if !active[d] && (g.lo[d] != 0 || g.hi[d] != 0) {
                    return Err(PicError::ConfigError(format!(
                        "grid {ig} must span only index 0 on inactive axis {d}"
                    )));
                }
            }
        }
        // Inactive axes and their staggering are fixed by the geometry.
        let ngrow = ngrow.masked(active);
        let ixtype = IndexType(std::array::from_fn(|d| {
            if active[d] {
                ixtype.0[d]
            } else {
                IndexType::cell().0[d]
            }
        }));
        let fabs = grids
            .iter()
            .map(|g| SharedFab::zeros(g.convert(ixtype).grow(ngrow), ncomp))
            .collect();
        Ok(MultiField {
            geom,
            grids,
            ixtype,
            ncomp,
            ngrow,
            fabs,
        })
    }

    pub fn geometry(&self) -> &LevelGeometry {
        &self.geom
    }

    pub fn grids(&self) -> &[IndexBox] {
        &self.grids
    }

    pub fn ixtype(&self) -> IndexType {
        self.ixtype
    }

    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Allocated ghost width.
    pub fn ngrow(&self) -> IntVect {
        self.ngrow
    }

    pub fn num_grids(&self) -> usize {
        self.fabs.len()
    }

    pub fn fab(&self, grid: usize) -> PicResult<&SharedFab> {
        self.fabs.get(grid).ok_or_else(|| {
            PicError::ConfigError(format!(
                "grid index {grid} out of range (field has {} grids)",
                self.fabs.len()
            ))
        })
    }

    /// Points of grid `grid` owned by this field's staggering, without ghosts.
    pub fn valid_box(&self, grid: usize) -> PicResult<IndexBox> {
        self.grids
            .get(grid)
            .map(|g| g.convert(self.ixtype))
            .ok_or_else(|| PicError::ConfigError(format!("grid index {grid} out of range")))
    }

    pub fn set_val(&self, value: f64) {
        for fab in &self.fabs {
            fab.set_val(value);
        }
    }

    /// Make every copy of a point, valid or ghost, hold the sum of all copies.
    pub fn sum_boundary(&mut self) {
        let snapshot: Vec<_> = self.fabs.iter().map(SharedFab::to_field_box).collect();
        for (a, dst) in self.fabs.iter().enumerate() {
            for (b, src) in snapshot.iter().enumerate() {
                if a == b {
                    continue;
                }
                if let Some(overlap) = dst.index_box().intersect(src.index_box()) {
                    for comp in 0..self.ncomp {
                        for iv in overlap.iter() {
                            let v = src.get(comp, iv);
                            if v != 0.0 {
                                dst.atomic_add(comp, iv, v);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Sum of one component over all valid points, each counted once.
    pub fn sum_unique(&self, comp: usize) -> f64 {
        let valid: Vec<IndexBox> = self.grids.iter().map(|g| g.convert(self.ixtype)).collect();
        let mut total = 0.0;
        for (ig, vb) in valid.iter().enumerate() {
            for iv in vb.iter() {
                if valid[..ig].iter().any(|earlier| earlier.contains(&iv)) {
                    continue;
                }
                total += self.fabs[ig].get(comp, iv);
            }
        }
        total
    }

    /// Value at a point, read from the first grid whose valid region holds it.
    pub fn value_at(&self, comp: usize, iv: IntVect) -> Option<f64> {
        self.grids
            .iter()
            .position(|g| g.convert(self.ixtype).contains(&iv))
            .map(|ig| self.fabs[ig].get(comp, iv))
    }
}

/// The three Yee-staggered components of current density.
#[derive(Debug)]
pub struct CurrentDensity {
    pub jx: MultiField,
    pub jy: MultiField,
    pub jz: MultiField,
}

impl CurrentDensity {
    pub fn new(
        geom: LevelGeometry,
        grids: Vec<IndexBox>,
        ncomp: usize,
        ngrow: IntVect,
    ) -> PicResult<Self> {
        let g = geom.geometry;
        Ok(CurrentDensity {
            jx: MultiField::new(geom, grids.clone(), g.current_index_type(0), ncomp, ngrow)?,
            jy: MultiField::new(geom, grids.clone(), g.current_index_type(1), ncomp, ngrow)?,
            jz: MultiField::new(geom, grids, g.current_index_type(2), ncomp, ngrow)?,
        })
    }

    pub fn components(&self) -> [&MultiField; 3] {
        [&self.jx, &self.jy, &self.jz]
    }

    pub fn sum_boundary(&mut self) {
        self.jx.sum_boundary();
        self.jy.sum_boundary();
        self.jz.sum_boundary();
    }
}
