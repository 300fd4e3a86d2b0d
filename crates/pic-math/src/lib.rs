//! Numeric primitives for the PIC deposition engine.

pub mod azimuthal;
pub mod coarsen;
pub mod shape;
