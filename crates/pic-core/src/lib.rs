// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Deposition Engine
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle-to-grid deposition of charge and current.
//!
//! Storage: particles, fab, field, tiling
//! Scatter: kernel, strategy, deposit

pub mod deposit;
pub mod fab;
pub mod field;
pub mod kernel;
pub mod particles;
pub mod strategy;
pub mod tiling;
