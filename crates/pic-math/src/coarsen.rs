// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Index-Space Coarsening
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Mapping of index boxes between adjacent refinement levels.
//!
//! Pure integer transforms: fine index `i` lies in coarse cell
//! `floor(i / ratio)`, with floor division also for negative indices.

use pic_types::constants::SPACE_DIM;
use pic_types::error::{PicError, PicResult};
use pic_types::mesh::{IndexBox, IntVect, Stagger};

/// Coarse index holding fine index `i`.
pub fn coarsen_index(i: i64, ratio: i64) -> i64 {
    i.div_euclid(ratio)
}

pub fn coarsen_intvect(iv: IntVect, ratio: IntVect) -> IntVect {
    IntVect(std::array::from_fn(|d| coarsen_index(iv[d], ratio[d])))
}

/// Coarsen a box. Nodal axes keep every coarse node touched by the fine box,
/// so a fine node that is not coarse-aligned rounds its upper bound up.
pub fn coarsen_box(bx: &IndexBox, ratio: IntVect) -> IndexBox {
    let lo = coarsen_intvect(bx.lo, ratio);
    let mut hi = coarsen_intvect(bx.hi, ratio);
    for d in 0..SPACE_DIM {
        if bx.ixtype.0[d] == Stagger::Node && bx.hi[d].rem_euclid(ratio[d]) != 0 {
            hi[d] += 1;
        }
    }
    IndexBox::with_type(lo, hi, bx.ixtype)
}

/// Inverse of [`coarsen_box`] for boxes that coarsen exactly.
pub fn refine_box(bx: &IndexBox, ratio: IntVect) -> IndexBox {
    let lo = bx.lo * ratio;
    let mut hi = bx.hi * ratio;
    for d in 0..SPACE_DIM {
        if bx.ixtype.0[d] == Stagger::Cell {
            hi[d] += ratio[d] - 1;
        }
    }
    IndexBox::with_type(lo, hi, bx.ixtype)
}

/// Whether a cell box maps onto whole coarse cells.
pub fn is_coarsenable(bx: &IndexBox, ratio: IntVect) -> bool {
    let size = bx.size();
    (0..SPACE_DIM).all(|d| bx.lo[d].rem_euclid(ratio[d]) == 0 && size[d] % ratio[d] == 0)
}

/// Check a refinement ratio: at least one on active axes, exactly one elsewhere.
pub fn validate_ratio(ratio: IntVect, active: [bool; SPACE_DIM]) -> PicResult<()> {
    for d in 0..SPACE_DIM {
        if ratio[d] < 1 {
            return Err(PicError::LevelMismatch(format!(
                "refinement ratio must be >= 1 on every axis, got {ratio:?}"
            )));
        }
        if !active[d] && ratio[d] != 1 {
            return Err(PicError::LevelMismatch(format!(
                "refinement ratio must be 1 on inactive axis {d}, got {ratio:?}"
            )));
        }
    }
    Ok(())
}
