/*!
* # Floodify - A library for routing floods through networks of flood storage areas.
* A flood storage area (FSA) is a basin that fills during a flood and drains through a combined outlet:
* a rectangular orifice at its base and a broad-crested weir above it.  The functions in this crate route
* inflow series through single FSAs, chain FSAs, junctions and inflows into a directed network, and
* calibrate outlet dimensions against an objective of the user's choosing.
*
* Storage is tracked with an explicit mass balance.  At each time step the change in volume is the
* previous step's inflow minus its outflow, times the time step.  The new volume gives a stage through the
* FSA's hypsometric (stage-volume) curve, and the stage gives the outflow through the outlet.
*
*  ## Quick Start
*
* To use floodify, add it to your `Cargo.toml`
* ```toml
* [dependencies]
* floodify = "^0.1.0"
* ```
*
*  - Load the crate prelude in the preamble of your `main.rs`.
*  - Build a curve from an area-elevation survey, an FSA on that curve, and a network around the FSA:
* ```rust
* use floodify::prelude::*;
* use std::sync::Arc;
*
* fn main() -> Result<(), FloodError> {
*     // survey of a 1 m² tank, 10 m deep
*     let curve = Arc::new(HypsoCurve::new(vec![1.0, 1.0], vec![0.0, 10.0])?);
*     let fsa = Fsa::new(curve)
*         .orifice(0.0, 1.0, 1.0, 0.6) // invert, height, width, coefficient
*         .weir(5.0, 2.0, 1.7); // invert, width, coefficient
*
*     let mut net = Network::new(1.0);
*     net.add_inflow("storm", vec![10.0, 0.0, 0.0, 0.0])?;
*     net.add_fsa("tank", fsa)?;
*     net.add_edge("storm", "tank")?;
*     net.run()?;
*     assert_eq!(net.stage("tank").unwrap()[1], 10.0);
*
*     // shrink the orifice until the peak outflow is as small as the bounds allow
*     let cal = Calibrator::new(vec![ParameterConfig::new(
*         "tank",
*         Parameter::OrificeWidth,
*         1.0,
*         (0.2, 2.0),
*     )])?
*     .method(Method::RandomSearch)
*     .samples(50);
*     let best = cal.optimize(&mut net, |n: &Network| Ok(utils::peak(n.flow("tank").unwrap_or(&[]))))?;
*     assert!(best.params[0] < 1.0);
*
*     Ok(())
* }
* ```
*/

#![warn(missing_docs)]
pub mod calibrate;
pub mod curve;
pub mod errors;
pub mod fsa;
pub mod hydraulics;
pub mod network;
pub mod utils;

/// Commonly used types.
pub mod prelude {
    pub use crate::calibrate::{Calibration, Calibrator, Evaluation, Method, ParameterConfig};
    pub use crate::curve::HypsoCurve;
    pub use crate::errors::FloodError;
    pub use crate::fsa::{Fsa, Parameter, Routing};
    pub use crate::hydraulics::{Orifice, Weir};
    pub use crate::network::{Network, Node};
    pub use crate::utils;
}
