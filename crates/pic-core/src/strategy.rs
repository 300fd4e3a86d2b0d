// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — Deposition Strategies
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! How particle contributions reach the shared destination.
//!
//! - [`TiledStrategy`]: the tile's particles are scattered sequentially
//!   into private [`FieldBox`] buffers, which are later added into the
//!   destination under its merge lock. Tiles run in parallel.
//! - [`AtomicStrategy`]: one task per particle writes straight into the
//!   destination with atomic adds. No staging, so the destination's
//!   allocated ghost region must already hold every stencil.
//!
//! Both write through the [`Accumulator`] seam, so the particle loop in
//! [`DepositPass::deposit_particle`](crate::deposit::DepositPass::deposit_particle)
//! is shared.

use crate::deposit::{DepositPass, PassTarget};
use crate::fab::{FieldBox, SharedFab};
use pic_types::config::Backend;
use pic_types::error::PicResult;
use pic_types::mesh::{IndexBox, IntVect};
use rayon::prelude::*;
use std::fmt;

/// Which accumulation model a strategy implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Tiled,
    Atomic,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Tiled => write!(f, "tiled"),
            StrategyKind::Atomic => write!(f, "atomic"),
        }
    }
}

/// Destination of kernel output during one pass.
pub trait Accumulator {
    /// Add `value` to component `comp` at `iv` of pass target `target`.
    fn accumulate(&mut self, target: usize, comp: usize, iv: IntVect, value: f64);
}

/// Private per-tile buffers, one per pass target.
#[derive(Debug)]
pub struct LocalBuffers {
    buffers: Vec<FieldBox>,
}

impl LocalBuffers {
    pub fn for_targets(targets: &[PassTarget<'_>]) -> Self {
        LocalBuffers {
            buffers: targets
                .iter()
                .map(|t| FieldBox::zeros(t.deposit_box, t.ncomp))
                .collect(),
        }
    }

    pub fn buffers(&self) -> &[FieldBox] {
        &self.buffers
    }
}

impl Accumulator for LocalBuffers {
    #[inline]
    fn accumulate(&mut self, target: usize, comp: usize, iv: IntVect, value: f64) {
        self.buffers[target].add(comp, iv, value);
    }
}

/// Direct atomic writes into the shared destinations.
#[derive(Debug, Clone)]
pub struct AtomicScatter<'a> {
    fabs: Vec<&'a SharedFab>,
}

impl<'a> AtomicScatter<'a> {
    pub fn for_targets(targets: &[PassTarget<'a>]) -> Self {
        AtomicScatter {
            fabs: targets.iter().map(|t| t.fab).collect(),
        }
    }
}

impl Accumulator for AtomicScatter<'_> {
    #[inline]
    fn accumulate(&mut self, target: usize, comp: usize, iv: IntVect, value: f64) {
        self.fabs[target].atomic_add(comp, iv, value);
    }
}

/// Buffers waiting to be added into their destinations.
#[derive(Debug)]
pub struct PendingMerge<'a> {
    local: LocalBuffers,
    merges: Vec<MergeTarget<'a>>,
}

#[derive(Debug, Clone, Copy)]
struct MergeTarget<'a> {
    fab: &'a SharedFab,
    region: IndexBox,
    dst_comp: usize,
    ncomp: usize,
}

impl PendingMerge<'_> {
    /// Lock-add every buffer into its destination; returns the points merged.
    pub fn merge(self) -> PicResult<usize> {
        let mut points = 0;
        for (buf, m) in self.local.buffers.iter().zip(&self.merges) {
            points += m.fab.lock_add(buf, &m.region, 0, m.dst_comp, m.ncomp)?;
        }
        Ok(points)
    }
}

/// Result of running a strategy over one tile.
#[derive(Debug)]
pub enum Staged<'a> {
    /// Contributions sit in private buffers.
    NeedsMerge(PendingMerge<'a>),
    /// Contributions are already in the destination.
    Complete,
}

/// Accumulation model, fixed when the deposition operation is built.
pub trait DepositStrategy: Send + Sync + fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Guard width that bounds how far a particle's stencil may reach
    /// past its tile: the deposition guards when staging through a
    /// tile-sized buffer, the whole allocation when writing in place.
    fn reference_guard(&self, deposition_guards: IntVect, allocated: IntVect) -> IntVect;

    /// First component the kernel writes, given the destination's.
    fn kernel_component(&self, dst_comp: usize) -> usize;

    fn run<'a>(&self, pass: &DepositPass<'a>) -> PicResult<Staged<'a>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TiledStrategy;

impl DepositStrategy for TiledStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Tiled
    }

    fn reference_guard(&self, deposition_guards: IntVect, _allocated: IntVect) -> IntVect {
        deposition_guards
    }

    fn kernel_component(&self, _dst_comp: usize) -> usize {
        0
    }

    fn run<'a>(&self, pass: &DepositPass<'a>) -> PicResult<Staged<'a>> {
        let mut local = LocalBuffers::for_targets(&pass.targets);
        for ip in 0..pass.count {
            pass.deposit_particle(ip, &mut local);
        }
        let merges = pass
            .targets
            .iter()
            .map(|t| MergeTarget {
                fab: t.fab,
                region: t.deposit_box,
                dst_comp: t.dst_comp,
                ncomp: t.ncomp,
            })
            .collect();
        Ok(Staged::NeedsMerge(PendingMerge { local, merges }))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicStrategy;

impl DepositStrategy for AtomicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Atomic
    }

    fn reference_guard(&self, _deposition_guards: IntVect, allocated: IntVect) -> IntVect {
        allocated
    }

    fn kernel_component(&self, dst_comp: usize) -> usize {
        dst_comp
    }

    fn run<'a>(&self, pass: &DepositPass<'a>) -> PicResult<Staged<'a>> {
        (0..pass.count).into_par_iter().for_each_init(
            || AtomicScatter::for_targets(&pass.targets),
            |acc, ip| pass.deposit_particle(ip, acc),
        );
        Ok(Staged::Complete)
    }
}

/// Strategy for a hardware backend; `Auto` runs on host threads.
pub fn strategy_for(backend: Backend) -> Box<dyn DepositStrategy> {
    match backend {
        Backend::Auto | Backend::Host => Box::new(TiledStrategy),
        Backend::ManyCore => Box::new(AtomicStrategy),
    }
}
