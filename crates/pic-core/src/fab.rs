// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Field Array Boxes
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Dense multi-component arrays over an index box.
//!
//! [`FieldBox`] is privately owned scratch space: one worker accumulates a
//! tile into it without synchronization. [`SharedFab`] is the destination
//! array shared by all workers; it accepts either a locked region merge
//! of a `FieldBox` or per-point atomic adds.

use ndarray::Array4;
use pic_types::error::{PicError, PicResult};
use pic_types::mesh::{IndexBox, IntVect};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Private accumulation buffer, indexed `(component, i, j, k)` relative to the box.
#[derive(Debug, Clone)]
pub struct FieldBox {
    bx: IndexBox,
    data: Array4<f64>,
}

impl FieldBox {
    pub fn zeros(bx: IndexBox, ncomp: usize) -> Self {
        let [nx, ny, nz] = bx.shape();
        FieldBox {
            bx,
            data: Array4::zeros((ncomp, nx, ny, nz)),
        }
    }

    pub fn index_box(&self) -> &IndexBox {
        &self.bx
    }

    pub fn ncomp(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn add(&mut self, comp: usize, iv: IntVect, value: f64) {
        let [i, j, k] = self.bx.offset_of(&iv);
        self.data[[comp, i, j, k]] += value;
    }

    pub fn get(&self, comp: usize, iv: IntVect) -> f64 {
        let [i, j, k] = self.bx.offset_of(&iv);
        self.data[[comp, i, j, k]]
    }

    pub fn set(&mut self, comp: usize, iv: IntVect, value: f64) {
        let [i, j, k] = self.bx.offset_of(&iv);
        self.data[[comp, i, j, k]] = value;
    }

    pub fn set_val(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Sum of one component over the whole box.
    pub fn sum(&self, comp: usize) -> f64 {
        self.data.index_axis(ndarray::Axis(0), comp).sum()
    }
}

/// Destination array shared between deposition workers.
#[derive(Debug)]
pub struct SharedFab {
    bx: IndexBox,
    ncomp: usize,
    data: Vec<AtomicU64>,
    merge_lock: Mutex<()>,
}

/// Compare-exchange `f64` addition on bit-cast storage.
#[inline]
fn atomic_add_f64(atomic: &AtomicU64, val: f64) {
    let mut old = atomic.load(Ordering::Relaxed);
    loop {
        let new = (f64::from_bits(old) + val).to_bits();
        match atomic.compare_exchange_weak(old, new, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(x) => old = x,
        }
    }
}

impl SharedFab {
    pub fn zeros(bx: IndexBox, ncomp: usize) -> Self {
        let n = bx.num_pts() * ncomp;
        SharedFab {
            bx,
            ncomp,
            data: (0..n).map(|_| AtomicU64::new(0.0f64.to_bits())).collect(),
            merge_lock: Mutex::new(()),
        }
    }

    pub fn index_box(&self) -> &IndexBox {
        &self.bx
    }

    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    #[inline]
    fn flat(&self, comp: usize, iv: &IntVect) -> usize {
        let [nx, ny, nz] = self.bx.shape();
        let [i, j, k] = self.bx.offset_of(iv);
        ((comp * nx + i) * ny + j) * nz + k
    }

    /// Thread-safe add of one value.
    #[inline]
    pub fn atomic_add(&self, comp: usize, iv: IntVect, value: f64) {
        atomic_add_f64(&self.data[self.flat(comp, &iv)], value);
    }

    /// Add components `[src_comp, src_comp + ncomp)` of `src` into
    /// `[dst_comp, dst_comp + ncomp)` over `region` clipped to both boxes.
    ///
    /// Merges into the same fab are serialized. Returns the number of points added.
    pub fn lock_add(
        &self,
        src: &FieldBox,
        region: &IndexBox,
        src_comp: usize,
        dst_comp: usize,
        ncomp: usize,
    ) -> PicResult<usize> {
        if src_comp + ncomp > src.ncomp() || dst_comp + ncomp > self.ncomp {
            return Err(PicError::ConfigError(format!(
                "lock_add components out of range: src {src_comp}+{ncomp} of {}, dst {dst_comp}+{ncomp} of {}",
                src.ncomp(),
                self.ncomp
            )));
        }
        let overlap = match region
            .intersect(src.index_box())
            .and_then(|r| r.intersect(&self.bx))
        {
            Some(r) => r,
            None => return Ok(0),
        };
        let _guard = self
            .merge_lock
            .lock()
            .map_err(|e| PicError::LockPoisoned(format!("merge lock: {e}")))?;
        for n in 0..ncomp {
            for iv in overlap.iter() {
                let v = src.get(src_comp + n, iv);
                if v != 0.0 {
                    atomic_add_f64(&self.data[self.flat(dst_comp + n, &iv)], v);
                }
            }
        }
        Ok(overlap.num_pts())
    }

    pub fn get(&self, comp: usize, iv: IntVect) -> f64 {
        f64::from_bits(self.data[self.flat(comp, &iv)].load(Ordering::Relaxed))
    }

    pub fn store(&self, comp: usize, iv: IntVect, value: f64) {
        self.data[self.flat(comp, &iv)].store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn set_val(&self, value: f64) {
        for a in &self.data {
            a.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// Snapshot into a private buffer.
    pub fn to_field_box(&self) -> FieldBox {
        let mut out = FieldBox::zeros(self.bx, self.ncomp);
        for comp in 0..self.ncomp {
            for iv in self.bx.iter() {
                out.set(comp, iv, self.get(comp, iv));
            }
        }
        out
    }

    /// Sum of one component over `region` clipped to the fab.
    pub fn sum_over(&self, comp: usize, region: &IndexBox) -> f64 {
        match region.intersect(&self.bx) {
            Some(r) => r.iter().map(|iv| self.get(comp, iv)).sum(),
            None => 0.0,
        }
    }

    pub fn sum(&self, comp: usize) -> f64 {
        self.sum_over(comp, &self.bx)
    }
}
