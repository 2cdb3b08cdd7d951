//! Discharge formulas for the orifice and weir outlets of a flood storage area.
//!
//! All functions are total over finite inputs.  Driving heads below an invert clamp to zero,
//! so a dry outlet passes no flow rather than producing a NaN.
use serde::{Deserialize, Serialize};

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f64 = 9.81;

/// An orifice is treated as drowned once the stage stands this many orifice heights above its invert.
pub const SUBMERGENCE_RATIO: f64 = 1.5;

/// Rectangular orifice at the base of an outlet structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orifice {
    /// Elevation of the orifice sill.
    pub invert: f64,
    /// Height of the opening.
    pub height: f64,
    /// Width of the opening.
    pub width: f64,
    /// Discharge coefficient when drowned.
    pub coefficient: f64,
}

/// Broad-crested weir at the top of an outlet structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weir {
    /// Elevation of the weir crest.
    pub invert: f64,
    /// Crest length.
    pub width: f64,
    /// Weir coefficient.  Also governs the orifice while it runs part full.
    pub coefficient: f64,
}

/// Which law governs flow through an orifice at a given stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrificeRegime {
    /// Free surface below the drowning threshold, the opening behaves as a low weir.
    Weir,
    /// Opening fully drowned.
    Submerged,
}

/// Non-negative difference between `top` and `bottom`.
pub fn depth(top: f64, bottom: f64) -> f64 {
    (top - bottom).max(0.0)
}

/// Broad-crested weir discharge, `width * coefficient * head^1.5`.
pub fn weir_flow(stage: f64, invert: f64, width: f64, coefficient: f64) -> f64 {
    width * coefficient * depth(stage, invert).powf(1.5)
}

/// Drowned orifice discharge, `width * height * coefficient * sqrt(2 g head)`.
pub fn submerged_orifice_flow(
    stage: f64,
    invert: f64,
    width: f64,
    height: f64,
    coefficient: f64,
) -> f64 {
    width * height * coefficient * (2.0 * GRAVITY * depth(stage, invert)).sqrt()
}

/// Regime of an orifice with sill `invert` and opening `height` at `stage`.
/// The switch is sharp: exactly at the threshold the orifice still runs as a weir.
pub fn orifice_regime(stage: f64, invert: f64, height: f64) -> OrificeRegime {
    if stage > invert + height * SUBMERGENCE_RATIO {
        OrificeRegime::Submerged
    } else {
        OrificeRegime::Weir
    }
}

/// Orifice discharge under whichever regime applies at `stage`.
/// Part full, the opening is a weir of the orifice's width crested at its sill, using `weir_coefficient`.
/// The two laws are not blended, so flow may jump at the threshold.
pub fn total_orifice_flow(
    stage: f64,
    invert: f64,
    width: f64,
    height: f64,
    orifice_coefficient: f64,
    weir_coefficient: f64,
) -> f64 {
    match orifice_regime(stage, invert, height) {
        OrificeRegime::Submerged => {
            submerged_orifice_flow(stage, invert, width, height, orifice_coefficient)
        }
        OrificeRegime::Weir => weir_flow(stage, invert, width, weir_coefficient),
    }
}

/// Total discharge from a flood storage area: flow through the orifice plus flow over the weir.
/// The weir's coefficient is shared with the part-full orifice.
pub fn fsa_flow(stage: f64, orifice: &Orifice, weir: &Weir) -> f64 {
    total_orifice_flow(
        stage,
        orifice.invert,
        orifice.width,
        orifice.height,
        orifice.coefficient,
        weir.coefficient,
    ) + weir_flow(stage, weir.invert, weir.width, weir.coefficient)
}
