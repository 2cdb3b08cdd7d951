//! Stage-volume relationship of a storage area, derived from an area-elevation survey.
use crate::errors::FloodError;
use crate::utils;

/// Hypsometric curve relating stage (elevation) to stored volume.
///
/// Volume is the trapezoidal integral of surveyed area over elevation, zero at the lowest sample.
/// The curve is immutable once built; basins that share a survey hold it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct HypsoCurve {
    area: Vec<f64>,
    elevation: Vec<f64>,
    volume: Vec<f64>,
}

impl HypsoCurve {
    /// Build a curve from parallel `area` and `elevation` samples.
    /// Accepts anything that yields floats (vectors, slices, iterators over table columns).
    ///
    /// Fails if the samples are empty or of unequal length, if elevation is not strictly increasing,
    /// or if any area is negative or not finite.
    pub fn new<A, E>(area: A, elevation: E) -> Result<Self, FloodError>
    where
        A: IntoIterator<Item = f64>,
        E: IntoIterator<Item = f64>,
    {
        let area: Vec<f64> = area.into_iter().collect();
        let elevation: Vec<f64> = elevation.into_iter().collect();
        if area.is_empty() {
            return Err(FloodError::InvalidCurve("no survey samples".to_string()));
        }
        if area.len() != elevation.len() {
            return Err(FloodError::InvalidCurve(format!(
                "{} areas but {} elevations",
                area.len(),
                elevation.len()
            )));
        }
        if area.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(FloodError::InvalidCurve(
                "areas must be finite and non-negative".to_string(),
            ));
        }
        if elevation.iter().any(|e| !e.is_finite()) || elevation.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FloodError::InvalidCurve(
                "elevations must be finite and strictly increasing".to_string(),
            ));
        }
        let volume = utils::cumulative_trapezoid(&area, &elevation);
        Ok(HypsoCurve {
            area,
            elevation,
            volume,
        })
    }

    /// Stage at which the curve holds `volume`, clamped to the surveyed range.
    pub fn get_stage(&self, volume: f64) -> f64 {
        utils::interp(volume, &self.volume, &self.elevation)
    }

    /// Volume held below `stage`, clamped to the surveyed range.
    pub fn get_volume(&self, stage: f64) -> f64 {
        utils::interp(stage, &self.elevation, &self.volume)
    }

    /// Surveyed areas.
    pub fn area(&self) -> &[f64] {
        &self.area
    }

    /// Surveyed elevations.
    pub fn elevation(&self) -> &[f64] {
        &self.elevation
    }

    /// Cumulative volume at each surveyed elevation.
    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    /// Volume held when the stage reaches the top of the survey.
    pub fn capacity(&self) -> f64 {
        self.volume[self.volume.len() - 1]
    }
}
