//! Building the time grid that every series is evaluated on.

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{Result, SynthError};

/// Generates `num` evenly spaced samples over the closed interval `[start, stop]`.
///
/// # Arguments
///
/// * `start`: the first sample.
/// * `stop`: the last sample.
/// * `num`: the number of samples.
///
/// # Errors
///
/// * If `num` is zero.
/// * If either end point is not finite.
pub fn linspace(start: f64, stop: f64, num: usize) -> Result<Vec<f64>> {
    if num == 0 {
        return Err(SynthError::invalid("a time axis needs at least one sample"));
    }
    if !(start.is_finite() && stop.is_finite()) {
        return Err(SynthError::invalid(format!(
            "time axis bounds must be finite, got [{start}, {stop}]"
        )));
    }
    if num == 1 {
        return Ok(vec![start]);
    }

    // Pin the last sample to `stop` so that rounding never shortens the interval.
    let mut samples = Array1::linspace(start, stop, num).to_vec();
    if let Some(last) = samples.last_mut() {
        *last = stop;
    }
    Ok(samples)
}

/// Repeats the time axis across `rows` rows.
///
/// Every row of the returned `(rows, time.len())` matrix equals `time` verbatim.
///
/// # Errors
///
/// * If `rows` is zero.
/// * If `time` is empty.
pub fn replicate(time: &[f64], rows: usize) -> Result<Array2<f64>> {
    if rows == 0 {
        return Err(SynthError::invalid("the grid must have at least one row"));
    }
    if time.is_empty() {
        return Err(SynthError::invalid("the time axis must not be empty"));
    }

    let axis = ArrayView1::from(time);
    let grid = axis
        .broadcast((rows, time.len()))
        .ok_or_else(|| SynthError::invalid("could not broadcast the time axis"))?
        .to_owned();

    ftlog::debug!("Replicated a time axis of length {} across {rows} rows", time.len());
    Ok(grid)
}
