//! Shape functions: the noiseless signal shared by every series of a cluster.

use ndarray::{Array2, ArrayView2};

use crate::params::Params;

/// A function that maps a block of time samples to the noiseless signal of one cluster.
///
/// The input is a `(n_series_for_cluster, T)` block in which every row is the time
/// axis. The output must have exactly the same shape. Failures are reported as a
/// plain message and surface to the caller as a callback failure.
pub trait ShapeFn: Send + Sync {
    /// Evaluates the shape on `x` with the merged keyword arguments `params`.
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn eval(&self, x: ArrayView2<f64>, params: &Params) -> Result<Array2<f64>, String>;
}

impl<F> ShapeFn for F
where
    F: Fn(ArrayView2<f64>, &Params) -> Result<Array2<f64>, String> + Send + Sync,
{
    fn eval(&self, x: ArrayView2<f64>, params: &Params) -> Result<Array2<f64>, String> {
        self(x, params)
    }
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ShapeFn for Identity {
    fn eval(&self, x: ArrayView2<f64>, _: &Params) -> Result<Array2<f64>, String> {
        Ok(x.to_owned())
    }
}

/// `ampl * sin(freq * x + phi) + q`.
///
/// Every parameter is optional: `ampl` and `freq` default to 1, `phi` and `q` to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sine;

impl ShapeFn for Sine {
    fn eval(&self, x: ArrayView2<f64>, params: &Params) -> Result<Array2<f64>, String> {
        let ampl = params.f64_or("ampl", 1.0)?;
        let freq = params.f64_or("freq", 1.0)?;
        let phi = params.f64_or("phi", 0.0)?;
        let q = params.f64_or("q", 0.0)?;
        Ok(x.mapv(|t| ampl.mul_add(freq.mul_add(t, phi).sin(), q)))
    }
}

/// `slope * x + intercept`, with `slope` defaulting to 1 and `intercept` to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Linear;

impl ShapeFn for Linear {
    fn eval(&self, x: ArrayView2<f64>, params: &Params) -> Result<Array2<f64>, String> {
        let slope = params.f64_or("slope", 1.0)?;
        let intercept = params.f64_or("intercept", 0.0)?;
        Ok(x.mapv(|t| slope.mul_add(t, intercept)))
    }
}
