//! Numeric helpers shared by the curve, network and calibration code.
use crate::calibrate::Evaluation;
use crate::errors;

/// Linear interpolation of `fp` against `xp` at the point `x`.
///  - `xp` must be non-decreasing and the same length as `fp`.
///  - Values of `x` outside `xp` clamp to the first or last value of `fp`, there is no extrapolation.
///  - Where `xp` repeats a value equal to `x`, the last of the repeated samples is used.
///  - Returns `f64::NAN` if `xp` is empty.
///
/// # Examples
///
/// ```rust
/// let xp = vec![0.0, 1.0, 2.0];
/// let fp = vec![0.0, 10.0, 30.0];
/// assert_eq!(floodify::utils::interp(1.5, &xp, &fp), 20.0);
/// assert_eq!(floodify::utils::interp(5.0, &xp, &fp), 30.0);
/// ```
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if x < xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    // first sample strictly above x, so xp[j - 1] <= x < xp[j]
    let j = xp[..n].partition_point(|v| *v <= x);
    let i = j - 1;
    fp[i] + (x - xp[i]) * (fp[j] - fp[i]) / (xp[j] - xp[i])
}

/// Cumulative trapezoidal integral of `y` over `x`, starting from zero.
///  - Returns a vector the same length as the shorter of `x` and `y`.
pub fn cumulative_trapezoid(y: &[f64], x: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    let mut total = Vec::with_capacity(n);
    if n == 0 {
        return total;
    }
    total.push(0.0);
    for i in 1..n {
        let step = (y[i - 1] + y[i]) / 2.0 * (x[i] - x[i - 1]);
        total.push(total[i - 1] + step);
    }
    total
}

/// Add the series `other` into `sum`, element by element.
/// Both series must be the same length; extra values in the longer series are ignored.
pub fn add_series(sum: &mut [f64], other: &[f64]) {
    for (s, o) in sum.iter_mut().zip(other) {
        *s += o;
    }
}

/// Largest value in a series, or zero for an empty series.
pub fn peak(series: &[f64]) -> f64 {
    series.iter().cloned().fold(0.0, f64::max)
}

/// Write an evaluation trace to csv file.
///  - `labels` names each calibrated parameter, one column per label.
///  - A final `objective` column holds the score of each evaluation.
pub fn record(rec: &[Evaluation], labels: &[String], path: &str) -> Result<(), errors::FloodError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut header = labels.to_vec();
    header.push("objective".to_string());
    wtr.write_record(&header)?;
    for eval in rec {
        wtr.serialize(eval.row())?;
    }
    wtr.flush()?;
    Ok(())
}
