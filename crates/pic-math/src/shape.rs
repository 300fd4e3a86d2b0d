//! B-spline particle shape factors of order 1 to 4.
//!
//! Odd orders measure the particle from the grid point at or below it,
//! even orders from the nearest grid point. Either way the result is the
//! first grid index touched plus `order + 1` weights summing to one.

use pic_types::constants::{MAX_SHAPE_ORDER, MAX_STENCIL, MIN_SHAPE_ORDER};
use pic_types::error::{PicError, PicResult};

const ONE_SIXTH: f64 = 1.0 / 6.0;
const TWO_THIRDS: f64 = 2.0 / 3.0;
const ONE_24TH: f64 = 1.0 / 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeOrder {
    /// Cloud-in-cell.
    Linear = 1,
    /// Triangular-shaped cloud.
    Quadratic = 2,
    Cubic = 3,
    Quartic = 4,
}

impl TryFrom<u32> for ShapeOrder {
    type Error = PicError;

    fn try_from(order: u32) -> PicResult<Self> {
        match order {
            1 => Ok(ShapeOrder::Linear),
            2 => Ok(ShapeOrder::Quadratic),
            3 => Ok(ShapeOrder::Cubic),
            4 => Ok(ShapeOrder::Quartic),
            other => Err(PicError::ConfigError(format!(
                "shape order must be in {MIN_SHAPE_ORDER}..={MAX_SHAPE_ORDER}, got {other}"
            ))),
        }
    }
}

/// Weights of one particle along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFactor {
    /// Lowest grid index receiving a weight.
    pub first: i64,
    pub weights: [f64; MAX_STENCIL],
    pub len: usize,
}

impl ShapeFactor {
    /// Full weight on a single index; used on axes the geometry does not resolve.
    pub fn point(index: i64) -> Self {
        let mut weights = [0.0; MAX_STENCIL];
        weights[0] = 1.0;
        ShapeFactor {
            first: index,
            weights,
            len: 1,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights[..self.len]
    }

    /// Last grid index receiving a weight.
    pub fn last(&self) -> i64 {
        self.first + self.len as i64 - 1
    }

    /// `(grid index, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.weights()
            .iter()
            .enumerate()
            .map(move |(k, &w)| (self.first + k as i64, w))
    }
}

impl ShapeOrder {
    pub fn order(self) -> usize {
        self as usize
    }

    /// Grid points touched along one axis.
    pub fn stencil_len(self) -> usize {
        self.order() + 1
    }

    /// Guard cells an axis needs so that a particle anywhere in its tile
    /// stays inside allocated memory: `ceil(order / 2) + 1`.
    pub fn guard_extent(self) -> i64 {
        (self.order() as i64 + 1) / 2 + 1
    }

    /// Weights for a reduced offset: in `[0, 1)` from the lower grid point for
    /// odd orders, in `[-1/2, 1/2)` from the nearest grid point for even orders.
    pub fn weights(self, t: f64) -> [f64; MAX_STENCIL] {
        let mut s = [0.0; MAX_STENCIL];
        match self {
            ShapeOrder::Linear => {
                s[0] = 1.0 - t;
                s[1] = t;
            }
            ShapeOrder::Quadratic => {
                s[0] = 0.5 * (0.5 - t) * (0.5 - t);
                s[1] = 0.75 - t * t;
                s[2] = 0.5 * (0.5 + t) * (0.5 + t);
            }
            ShapeOrder::Cubic => {
                let u = 1.0 - t;
                s[0] = ONE_SIXTH * u * u * u;
                s[1] = TWO_THIRDS - t * t * (1.0 - 0.5 * t);
                s[2] = TWO_THIRDS - u * u * (1.0 - 0.5 * u);
                s[3] = ONE_SIXTH * t * t * t;
            }
            ShapeOrder::Quartic => {
                let t2 = t * t;
                let a = 0.5 - t;
                let b = 0.5 + t;
                s[0] = ONE_24TH * a * a * a * a;
                s[1] = ONE_24TH * (4.75 - 11.0 * t + 4.0 * t2 * (1.5 + t - t2));
                s[2] = ONE_24TH * (14.375 + 6.0 * t2 * (t2 - 2.5));
                s[3] = ONE_24TH * (4.75 + 11.0 * t + 4.0 * t2 * (1.5 - t - t2));
                s[4] = ONE_24TH * b * b * b * b;
            }
        }
        s
    }

    /// Shape factor of a particle at fractional grid coordinate `x`.
    pub fn compute(self, x: f64) -> ShapeFactor {
        let order = self.order() as i64;
        let (anchor, t) = if order % 2 == 1 {
            let i = x.floor();
            (i as i64, x - i)
        } else {
            let j = (x + 0.5).floor();
            (j as i64, x - j)
        };
        ShapeFactor {
            first: anchor - order / 2,
            weights: self.weights(t),
            len: self.stencil_len(),
        }
    }
}
