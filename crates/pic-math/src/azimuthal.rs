//! Azimuthal Fourier mode factors for cylindrical (RZ) deposition.
//!
//! A quantity with `n` modes occupies `2n - 1` real components:
//! component 0 is the axisymmetric mode, then (real, imaginary) pairs
//! of `exp(i m theta)` for `m = 1..n`.

use num_complex::Complex64;

/// Real and imaginary part of one azimuthal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModePart {
    Re,
    Im,
}

/// Component holding `part` of mode `m` (mode 0 has only a real part).
pub fn mode_component(m: usize, part: ModePart) -> usize {
    match (m, part) {
        (0, _) => 0,
        (m, ModePart::Re) => 2 * m - 1,
        (m, ModePart::Im) => 2 * m,
    }
}

/// `exp(i theta)` of the particle azimuth; on the axis the azimuth is taken as zero.
pub fn unit_phase(x: f64, y: f64) -> Complex64 {
    let r = (x * x + y * y).sqrt();
    if r > 0.0 {
        Complex64::new(x / r, y / r)
    } else {
        Complex64::new(1.0, 0.0)
    }
}

/// Phases `exp(i m theta)` for `m = 1, 2, ...` by repeated multiplication.
#[derive(Debug, Clone)]
pub struct ModePhases {
    step: Complex64,
    current: Complex64,
    remaining: usize,
}

impl ModePhases {
    /// Phases of modes `1..n_modes` for a particle at Cartesian `(x, y)`.
    pub fn new(x: f64, y: f64, n_modes: usize) -> Self {
        let step = unit_phase(x, y);
        ModePhases {
            step,
            current: Complex64::new(1.0, 0.0),
            remaining: n_modes.saturating_sub(1),
        }
    }
}

impl Iterator for ModePhases {
    type Item = Complex64;

    fn next(&mut self) -> Option<Complex64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.current *= self.step;
        Some(self.current)
    }
}

/// Rotate a Cartesian (vx, vy) into cylindrical (v_r, v_theta) at azimuth `phase`.
pub fn to_cylindrical(vx: f64, vy: f64, phase: Complex64) -> (f64, f64) {
    let (c, s) = (phase.re, phase.im);
    (vx * c + vy * s, -vx * s + vy * c)
}
