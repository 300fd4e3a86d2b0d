// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Elementary charge (C)
pub const Q_ELECTRON: f64 = 1.602176634e-19;

/// Electron mass (kg)
pub const M_ELECTRON: f64 = 9.1093837015e-31;

/// Proton mass (kg)
pub const M_PROTON: f64 = 1.67262192369e-27;

/// Speed of light in vacuum (m/s)
pub const C_LIGHT: f64 = 299_792_458.0;

/// Lowest supported shape-function order.
pub const MIN_SHAPE_ORDER: u32 = 1;

/// Highest supported shape-function order.
pub const MAX_SHAPE_ORDER: u32 = 4;

/// Largest stencil along one axis (`MAX_SHAPE_ORDER + 1`).
pub const MAX_STENCIL: usize = MAX_SHAPE_ORDER as usize + 1;

/// Spatial slots carried by every index vector; unused axes have extent one.
pub const SPACE_DIM: usize = 3;
