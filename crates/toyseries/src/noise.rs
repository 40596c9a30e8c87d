//! Additive noise for the series of a single cluster.
//!
//! Two independent effects are combined:
//!
//! * amplitude noise, a value drawn uniformly from `[0, A)` for every sample, and
//! * offset noise, a value drawn uniformly from `[-O, O)` once per series and
//!   added to every sample of that series.
//!
//! An unset bound contributes exact zeros and consumes nothing from the
//! random number generator. A bound of zero still draws, so the two are not
//! interchangeable when a seeded generator is shared between calls.

use ndarray::{Array2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthError};

/// The bounds of the noise added to each cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[allow(clippy::module_name_repetitions)]
pub struct NoiseSpec {
    /// Upper bound of the per-sample amplitude noise.
    pub ampl: Option<f64>,
    /// Bound of the per-series offset noise.
    pub offset: Option<f64>,
}

impl NoiseSpec {
    /// Creates a new `NoiseSpec`.
    #[must_use]
    pub const fn new(ampl: Option<f64>, offset: Option<f64>) -> Self {
        Self { ampl, offset }
    }

    /// Whether neither kind of noise is enabled.
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        self.ampl.is_none() && self.offset.is_none()
    }

    /// Checks that every set bound is finite and non-negative.
    ///
    /// # Errors
    ///
    /// * If a bound is negative, infinite or NaN.
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("r_ampl", self.ampl), ("r_off", self.offset)] {
            if let Some(b) = bound {
                if !b.is_finite() || b < 0.0 {
                    return Err(SynthError::invalid(format!(
                        "{name} must be a finite non-negative number, got {b}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Draws a noise matrix of shape `(rows, cols)`.
    ///
    /// Amplitude values are drawn first, in row-major order, followed by one
    /// offset per row.
    ///
    /// # Errors
    ///
    /// * If the bounds are invalid. See `validate`.
    pub fn sample<R: Rng>(&self, (rows, cols): (usize, usize), rng: &mut R) -> Result<Array2<f64>> {
        self.validate()?;

        let mut noise = match self.ampl {
            Some(a) => {
                let values = (0..rows * cols).map(|_| rng.gen::<f64>() * a).collect::<Vec<_>>();
                Array2::from_shape_vec((rows, cols), values).map_err(|e| SynthError::invalid(e.to_string()))?
            }
            None => Array2::zeros((rows, cols)),
        };

        if let Some(o) = self.offset {
            for mut row in noise.axis_iter_mut(Axis(0)) {
                let shift = rng.gen::<f64>().mul_add(2.0, -1.0) * o;
                row += shift;
            }
        }

        Ok(noise)
    }

    /// Adds freshly drawn noise to `block` in place.
    ///
    /// # Errors
    ///
    /// * If the bounds are invalid. See `validate`.
    pub fn apply<R: Rng>(&self, block: &mut Array2<f64>, rng: &mut R) -> Result<()> {
        if self.is_silent() {
            return Ok(());
        }
        let noise = self.sample(block.dim(), rng)?;
        *block += &noise;
        Ok(())
    }
}
