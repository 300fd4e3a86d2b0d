// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Deposition Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-particle scatter onto a staggered grid.
//!
//! The kernel is anchored at a reference box: physical position
//! `xyzmin` is the lower cell corner of index `lo`. A particle at mesh
//! coordinate `p` sits at fractional index
//! `(p - xyzmin) / dx - shift + lo`, where `shift` is 1/2 on
//! cell-centered axes and 0 on nodal ones. The shape factor of that
//! fractional index gives the touched points and their weights, and the
//! tensor product over axes is multiplied by the particle quantity.
//!
//! In RZ geometry the same stencil is written once per azimuthal mode,
//! scaled by the real and imaginary parts of `exp(i m theta)`.

use pic_math::azimuthal::{mode_component, to_cylindrical, unit_phase, ModePart, ModePhases};
use pic_math::shape::{ShapeFactor, ShapeOrder};
use pic_types::constants::SPACE_DIM;
use pic_types::mesh::{Geometry, IndexBox, IndexType, IntVect, LevelGeometry};

/// Scatter parameters of one destination quantity on one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositKernel {
    order: ShapeOrder,
    geometry: Geometry,
    ixtype: IndexType,
    xyzmin: [f64; SPACE_DIM],
    lo: IntVect,
    inv_dx: [f64; SPACE_DIM],
    n_modes: usize,
    comp0: usize,
}

impl DepositKernel {
    /// Kernel anchored at the lower corner of `reference` on level `geom`.
    /// Contributions go to components starting at `comp0`.
    pub fn new(
        order: ShapeOrder,
        geom: &LevelGeometry,
        ixtype: IndexType,
        reference: &IndexBox,
        n_modes: usize,
        comp0: usize,
    ) -> Self {
        DepositKernel {
            order,
            geometry: geom.geometry,
            ixtype,
            xyzmin: geom.lower_corner(reference),
            lo: reference.lo,
            inv_dx: geom.inv_dx(),
            n_modes: if geom.geometry.is_rz() { n_modes.max(1) } else { 1 },
            comp0,
        }
    }

    pub fn ixtype(&self) -> IndexType {
        self.ixtype
    }

    /// Real components written per particle.
    pub fn ncomp(&self) -> usize {
        self.geometry.components_per_quantity(self.n_modes)
    }

    /// Per-axis shape factors of a point in mesh coordinates, in global indices.
    pub fn stencil(&self, mesh_pos: [f64; SPACE_DIM]) -> [ShapeFactor; SPACE_DIM] {
        let active = self.geometry.active_axes();
        std::array::from_fn(|d| {
            if !active[d] {
                return ShapeFactor::point(self.lo[d]);
            }
            let x = (mesh_pos[d] - self.xyzmin[d]) * self.inv_dx[d] - self.ixtype.stagger_shift(d);
            let mut sf = self.order.compute(x);
            sf.first += self.lo[d];
            sf
        })
    }

    /// Deposit `quantity` carried by a particle at Cartesian `pos`.
    ///
    /// `sink(component, index, value)` receives every contribution.
    #[inline]
    pub fn scatter<F>(&self, pos: [f64; 3], quantity: f64, sink: &mut F)
    where
        F: FnMut(usize, IntVect, f64),
    {
        let sf = self.stencil(self.geometry.mesh_coords(pos));
        let comp0 = self.comp0;
        for_each_point(&sf, |iv, w| sink(comp0, iv, w * quantity));
        if self.n_modes > 1 {
            for (k, phase) in ModePhases::new(pos[0], pos[1], self.n_modes).enumerate() {
                let m = k + 1;
                let re = comp0 + mode_component(m, ModePart::Re);
                let im = comp0 + mode_component(m, ModePart::Im);
                let (qr, qi) = (quantity * phase.re, quantity * phase.im);
                for_each_point(&sf, |iv, w| {
                    sink(re, iv, w * qr);
                    sink(im, iv, w * qi);
                });
            }
        }
    }
}

#[inline]
fn for_each_point<F: FnMut(IntVect, f64)>(sf: &[ShapeFactor; SPACE_DIM], mut f: F) {
    for (i, wx) in sf[0].iter() {
        for (j, wy) in sf[1].iter() {
            let wxy = wx * wy;
            for (k, wz) in sf[2].iter() {
                f(IntVect::new(i, j, k), wxy * wz);
            }
        }
    }
}

/// Charge carried by a macro-particle, scaled by its ionization level when present.
#[inline]
pub fn charge_quantity(charge: f64, weight: f64, ion_level: Option<i32>) -> f64 {
    match ion_level {
        Some(level) => charge * weight * f64::from(level),
        None => charge * weight,
    }
}

/// Velocity components in the frame the current fields use: Cartesian
/// `(vx, vy, vz)`, or `(v_r, v_theta, v_z)` in RZ.
#[inline]
pub fn current_components(geometry: Geometry, pos: [f64; 3], v: [f64; 3]) -> [f64; 3] {
    if geometry.is_rz() {
        let (vr, vt) = to_cylindrical(v[0], v[1], unit_phase(pos[0], pos[1]));
        [vr, vt, v[2]]
    } else {
        v
    }
}
