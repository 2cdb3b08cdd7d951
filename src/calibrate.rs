//! Calibration of FSA outlet parameters against a user objective.
//!
//! Each evaluation writes a candidate point into the network's FSAs, re-runs the whole network
//! and scores it with the objective.  Evaluations share one network, so they run one at a time;
//! [scan](struct.Calibrator.html#method.scan) is the exception and works on private clones.
use crate::errors::FloodError;
use crate::fsa::Parameter;
use crate::network::Network;
use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use log::{debug, info, trace, warn};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// One FSA parameter to calibrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Name of the FSA node.
    pub name: String,
    /// Which field of the FSA to vary.
    pub parameter: Parameter,
    /// Starting value.
    pub initial: f64,
    /// Closed interval of permitted values, `(lower, upper)`.
    pub bounds: (f64, f64),
}

impl ParameterConfig {
    /// Vary `parameter` of FSA `name` from `initial` within `bounds`.
    pub fn new(name: &str, parameter: Parameter, initial: f64, bounds: (f64, f64)) -> Self {
        ParameterConfig {
            name: name.to_string(),
            parameter,
            initial,
            bounds,
        }
    }

    /// Label of the form `node.parameter`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.name, self.parameter)
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.bounds.0).min(self.bounds.1)
    }
}

/// Search strategy used by [optimize](struct.Calibrator.html#method.optimize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Nelder-Mead simplex, with trial points projected into the bounds.
    NelderMead,
    /// Best of uniformly sampled points within the bounds.
    RandomSearch,
}

impl Default for Method {
    fn default() -> Self {
        Method::NelderMead
    }
}

/// A point in parameter space and its objective value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Parameter values, in configuration order.
    pub params: Vec<f64>,
    /// Objective value.
    pub cost: f64,
}

impl Evaluation {
    /// Parameter values followed by the objective value, flattened for one csv record.
    pub fn row(&self) -> Vec<f64> {
        let mut row = self.params.clone();
        row.push(self.cost);
        row
    }
}

/// Outcome of a calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Best parameter values found, in configuration order.
    pub params: Vec<f64>,
    /// Objective value at `params`.
    pub cost: f64,
    /// Number of objective evaluations.
    pub evaluations: usize,
    /// Every evaluation, in the order made.
    pub trace: Vec<Evaluation>,
}

/// Drives a derivative-free search over FSA parameters.
#[derive(Debug, Clone)]
pub struct Calibrator {
    params: Vec<ParameterConfig>,
    method: Method,
    max_iters: u64,
    tolerance: f64,
    samples: usize,
    seed: u64,
}

impl Calibrator {
    /// Calibrate the parameters in `params`.
    /// Fails if `params` is empty or a bound interval is empty or not finite.
    /// Initial values outside their bounds are clipped.
    pub fn new(params: Vec<ParameterConfig>) -> Result<Self, FloodError> {
        if params.is_empty() {
            return Err(FloodError::InvalidParameter(
                "nothing to calibrate".to_string(),
            ));
        }
        let mut params = params;
        for p in params.iter_mut() {
            let (lo, hi) = p.bounds;
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(FloodError::InvalidBounds(format!(
                    "{} has bounds ({}, {})",
                    p.label(),
                    lo,
                    hi
                )));
            }
            let clipped = p.clamp(p.initial);
            if clipped != p.initial {
                warn!("Initial value of {} clipped to {}.", p.label(), clipped);
                p.initial = clipped;
            }
        }
        Ok(Calibrator {
            params,
            method: Method::default(),
            max_iters: 500,
            tolerance: 1e-8,
            samples: 100,
            seed: 0,
        })
    }

    /// Choose the search method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Iteration limit for Nelder-Mead.
    pub fn max_iters(mut self, iters: u64) -> Self {
        self.max_iters = iters;
        self
    }

    /// Nelder-Mead stops once the spread of objective values over the simplex falls below `tol`.
    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Number of points sampled by random search and by [scan](#method.scan).
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Seed for the random number generator used by random search and by [scan](#method.scan).
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Parameters under calibration.
    pub fn params(&self) -> &[ParameterConfig] {
        &self.params
    }

    /// Labels of the parameters under calibration, in order.
    pub fn labels(&self) -> Vec<String> {
        self.params.iter().map(|p| p.label()).collect()
    }

    /// Initial values of the parameters under calibration.
    pub fn initial(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.initial).collect()
    }

    fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(&self.params)
            .map(|(v, p)| p.clamp(*v))
            .collect()
    }

    /// Write the values `x` into the FSAs of `network`, clipped to their bounds, then run it.
    pub fn apply(&self, network: &mut Network, x: &[f64]) -> Result<(), FloodError> {
        if x.len() != self.params.len() {
            return Err(FloodError::InvalidParameter(format!(
                "expected {} values, got {}",
                self.params.len(),
                x.len()
            )));
        }
        for (value, p) in x.iter().zip(&self.params) {
            let v = p.clamp(*value);
            if v != *value {
                debug!("{} = {} lies outside bounds, using {}.", p.label(), value, v);
            }
            network.set_parameter(&p.name, p.parameter, v)?;
        }
        network.run()
    }

    /// Objective wrapper: apply `x` to `network`, run it, and score it with `objective`.
    pub fn evaluate<F>(&self, network: &mut Network, x: &[f64], objective: &mut F) -> Result<f64, FloodError>
    where
        F: FnMut(&Network) -> Result<f64, FloodError>,
    {
        self.apply(network, x)?;
        objective(&*network)
    }

    /// Minimize `objective` over the configured parameters.
    ///
    /// The FSAs of `network` are left holding the last point evaluated, which need not be the best.
    /// Pass the result to [apply](#method.apply) to restore the best point.
    /// Errors raised by `objective` abort the search and are returned unchanged.
    pub fn optimize<F>(&self, network: &mut Network, objective: F) -> Result<Calibration, FloodError>
    where
        F: FnMut(&Network) -> Result<f64, FloodError>,
    {
        info!(
            "Calibrating {} parameters with {:?}.",
            self.params.len(),
            self.method
        );
        let trace = RefCell::new(Vec::new());
        let failed = RefCell::new(None);
        let (params, cost) = {
            let problem = Problem {
                calibrator: self,
                network: RefCell::new(network),
                objective: RefCell::new(objective),
                trace: &trace,
                failed: &failed,
            };
            match self.method {
                Method::NelderMead => self.nelder_mead(problem)?,
                Method::RandomSearch => self.random_search(&problem)?,
            }
        };
        let trace = trace.into_inner();
        info!(
            "Calibration finished after {} evaluations, objective {}.",
            trace.len(),
            cost
        );
        Ok(Calibration {
            params,
            cost,
            evaluations: trace.len(),
            trace,
        })
    }

    fn nelder_mead<F>(&self, problem: Problem<'_, F>) -> Result<(Vec<f64>, f64), FloodError>
    where
        F: FnMut(&Network) -> Result<f64, FloodError>,
    {
        let x0 = self.initial();
        let solver = NelderMead::new(self.simplex(&x0)).with_sd_tolerance(self.tolerance)?;
        let max_iters = self.max_iters;
        let failed = problem.failed;
        let res = Executor::new(problem, solver)
            .configure(|state| state.max_iters(max_iters))
            .run();
        if let Some(err) = failed.borrow_mut().take() {
            return Err(err);
        }
        let res = res?;
        let best = match res.state().get_best_param() {
            Some(p) => self.clamp(p),
            None => x0,
        };
        Ok((best, res.state().get_best_cost()))
    }

    // Starting simplex: the initial point plus one vertex per parameter, offset by a tenth of its range.
    fn simplex(&self, x0: &[f64]) -> Vec<Vec<f64>> {
        let mut simplex = vec![x0.to_vec()];
        for (i, p) in self.params.iter().enumerate() {
            let (lo, hi) = p.bounds;
            let step = 0.1 * (hi - lo);
            let mut vertex = x0.to_vec();
            vertex[i] = if x0[i] + step <= hi {
                x0[i] + step
            } else {
                x0[i] - step
            };
            simplex.push(vertex);
        }
        simplex
    }

    fn random_search<F>(&self, problem: &Problem<'_, F>) -> Result<(Vec<f64>, f64), FloodError>
    where
        F: FnMut(&Network) -> Result<f64, FloodError>,
    {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let x0 = self.initial();
        let mut best_cost = problem.score(&x0)?;
        let mut best = x0;
        for x in self.sample(&mut rng, self.samples) {
            let cost = problem.score(&x)?;
            if cost < best_cost {
                best_cost = cost;
                best = x;
            }
        }
        Ok((best, best_cost))
    }

    fn sample(&self, rng: &mut StdRng, n: usize) -> Vec<Vec<f64>> {
        let ranges: Vec<Uniform<f64>> = self
            .params
            .iter()
            .map(|p| Uniform::new_inclusive(p.bounds.0, p.bounds.1))
            .collect();
        (0..n)
            .map(|_| ranges.iter().map(|r| r.sample(rng)).collect())
            .collect()
    }

    /// Score uniformly sampled points within the bounds, in parallel.
    ///
    /// Every evaluation runs on its own clone of `network`, which is left untouched.
    /// Returns the evaluations in sampling order; fails on the first objective error.
    pub fn scan<F>(&self, network: &Network, objective: F) -> Result<Vec<Evaluation>, FloodError>
    where
        F: Fn(&Network) -> Result<f64, FloodError> + Sync,
    {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let points = self.sample(&mut rng, self.samples);
        info!("Scanning {} parameter sets.", points.len());
        points
            .into_par_iter()
            .map(|x| -> Result<Evaluation, FloodError> {
                let mut net = network.clone();
                let cost = self.evaluate(&mut net, &x, &mut |n: &Network| objective(n))?;
                Ok(Evaluation { params: x, cost })
            })
            .collect()
    }
}

// Cost function handed to the minimizer.  The minimizer only lends `&self`,
// so the network and objective sit behind `RefCell`s.
// Nelder-Mead unwraps the costs of its starting simplex, so failures are parked in
// `failed` and reported once the run returns.
struct Problem<'a, F> {
    calibrator: &'a Calibrator,
    network: RefCell<&'a mut Network>,
    objective: RefCell<F>,
    trace: &'a RefCell<Vec<Evaluation>>,
    failed: &'a RefCell<Option<FloodError>>,
}

impl<'a, F> Problem<'a, F>
where
    F: FnMut(&Network) -> Result<f64, FloodError>,
{
    fn score(&self, x: &[f64]) -> Result<f64, FloodError> {
        let mut network = self.network.borrow_mut();
        let mut objective = self.objective.borrow_mut();
        let cost = self
            .calibrator
            .evaluate(&mut **network, x, &mut *objective)?;
        let params = self.calibrator.clamp(x);
        trace!("Evaluated {:?}: {}", params, cost);
        self.trace.borrow_mut().push(Evaluation { params, cost });
        Ok(cost)
    }
}

impl<'a, F> CostFunction for Problem<'a, F>
where
    F: FnMut(&Network) -> Result<f64, FloodError>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        // after a failure every remaining point scores infinity and is not evaluated
        if self.failed.borrow().is_some() {
            return Ok(f64::INFINITY);
        }
        match self.score(x) {
            Ok(cost) => Ok(cost),
            Err(err) => {
                debug!("Evaluation of {:?} failed: {}", x, err);
                *self.failed.borrow_mut() = Some(err);
                Ok(f64::INFINITY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::HypsoCurve;
    use crate::fsa::Fsa;
    use crate::utils;
    use std::cell::Cell;
    use std::sync::Arc;

    fn network() -> Network {
        let curve = Arc::new(HypsoCurve::new(vec![1.0, 1.0], vec![0.0, 10.0]).unwrap());
        let mut net = Network::new(1.0);
        net.add_inflow("in", vec![10.0, 0.0, 0.0, 0.0]).unwrap();
        net.add_fsa("pond", Fsa::new(curve).orifice(0.0, 1.0, 1.0, 0.6).weir(20.0, 1.0, 1.7))
            .unwrap();
        net.add_edge("in", "pond").unwrap();
        net
    }

    fn coefficient() -> Vec<ParameterConfig> {
        vec![ParameterConfig::new(
            "pond",
            Parameter::OrificeCoefficient,
            0.5,
            (0.1, 1.0),
        )]
    }

    fn peak(net: &Network) -> Result<f64, FloodError> {
        Ok(utils::peak(net.flow("pond").unwrap_or(&[])))
    }

    #[test]
    fn rejects_bad_configs() {
        assert!(Calibrator::new(Vec::new()).is_err());
        let flipped = vec![ParameterConfig::new("pond", Parameter::WeirWidth, 1.0, (2.0, 1.0))];
        match Calibrator::new(flipped) {
            Err(FloodError::InvalidBounds(_)) => {}
            other => panic!("expected bounds error, got {:?}", other),
        }
        let outside = vec![ParameterConfig::new("pond", Parameter::WeirWidth, 5.0, (0.0, 1.0))];
        assert_eq!(Calibrator::new(outside).unwrap().initial(), vec![1.0]);
    }

    #[test]
    fn evaluate_sets_parameter_and_runs() {
        let cal = Calibrator::new(coefficient()).unwrap();
        let mut net = network();
        let cost = cal.evaluate(&mut net, &[0.8], &mut peak).unwrap();
        assert_eq!(net.fsa("pond").unwrap().parameter(Parameter::OrificeCoefficient), 0.8);
        assert!((cost - 0.8 * (2.0 * 9.81 * 10.0f64).sqrt()).abs() < 1e-9);

        // clipped to the upper bound
        cal.evaluate(&mut net, &[3.0], &mut peak).unwrap();
        assert_eq!(net.fsa("pond").unwrap().parameter(Parameter::OrificeCoefficient), 1.0);
        assert!(cal.evaluate(&mut net, &[0.3, 0.4], &mut peak).is_err());
    }

    #[test]
    fn peak_outflow_never_falls_as_coefficient_rises() {
        let cal = Calibrator::new(coefficient()).unwrap();
        let mut net = network();
        let mut last = 0.0;
        for i in 0..=18 {
            let c = 0.1 + 0.05 * i as f64;
            let cost = cal.evaluate(&mut net, &[c], &mut peak).unwrap();
            assert!(cost >= last);
            last = cost;
        }
    }

    #[test]
    fn objective_errors_propagate() {
        let cal = Calibrator::new(coefficient()).unwrap().max_iters(10);
        let mut net = network();
        let res = cal.optimize(&mut net, |_: &Network| Err(FloodError::Objective("boom".to_string())));
        assert_eq!(res, Err(FloodError::Objective("boom".to_string())));
        let cal = cal.method(Method::RandomSearch);
        let res = cal.optimize(&mut net, |_: &Network| Err(FloodError::Objective("boom".to_string())));
        assert_eq!(res, Err(FloodError::Objective("boom".to_string())));
    }

    #[test]
    fn unknown_node_surfaces_from_optimize() {
        let params = vec![ParameterConfig::new("nowhere", Parameter::WeirWidth, 1.0, (0.0, 2.0))];
        for method in &[Method::NelderMead, Method::RandomSearch] {
            let cal = Calibrator::new(params.clone()).unwrap().method(*method);
            let mut net = network();
            assert_eq!(
                cal.optimize(&mut net, peak),
                Err(FloodError::UnknownNode("nowhere".to_string()))
            );
        }
    }

    #[test]
    fn disconnected_network_surfaces_from_optimize() {
        let mut net = network();
        net.add_junction("stray").unwrap();
        let cal = Calibrator::new(coefficient()).unwrap();
        assert_eq!(cal.optimize(&mut net, peak), Err(FloodError::Disconnected));
    }

    #[test]
    fn late_objective_failure_stops_the_search() {
        for method in &[Method::NelderMead, Method::RandomSearch] {
            let cal = Calibrator::new(coefficient())
                .unwrap()
                .method(*method)
                .samples(25);
            let calls = Cell::new(0);
            let objective = |n: &Network| -> Result<f64, FloodError> {
                calls.set(calls.get() + 1);
                if calls.get() >= 5 {
                    Err(FloodError::Objective("diverged".to_string()))
                } else {
                    peak(n)
                }
            };
            let mut net = network();
            assert_eq!(
                cal.optimize(&mut net, objective),
                Err(FloodError::Objective("diverged".to_string()))
            );
            assert_eq!(calls.get(), 5);
        }
    }

    #[test]
    fn nelder_mead_finds_lower_bound() {
        let cal = Calibrator::new(coefficient()).unwrap().max_iters(200);
        let mut net = network();
        let res = cal.optimize(&mut net, peak).unwrap();
        assert!((res.params[0] - 0.1).abs() < 1e-3);
        assert_eq!(res.evaluations, res.trace.len());
        let best = res
            .trace
            .iter()
            .map(|e| e.cost)
            .fold(f64::INFINITY, f64::min);
        assert!((res.cost - best).abs() < 1e-12);
    }

    #[test]
    fn random_search_is_seeded() {
        let cal = Calibrator::new(coefficient())
            .unwrap()
            .method(Method::RandomSearch)
            .samples(25)
            .seed(7);
        let a = cal.optimize(&mut network(), peak).unwrap();
        let b = cal.optimize(&mut network(), peak).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.evaluations, 26);
        assert!(a.trace.iter().all(|e| e.cost >= a.cost));
        assert!(a.trace.iter().all(|e| e.params[0] >= 0.1 && e.params[0] <= 1.0));
    }

    #[test]
    fn apply_restores_best_point() {
        let cal = Calibrator::new(coefficient())
            .unwrap()
            .method(Method::RandomSearch)
            .samples(10)
            .seed(3);
        let mut net = network();
        let res = cal.optimize(&mut net, peak).unwrap();
        cal.apply(&mut net, &res.params).unwrap();
        assert_eq!(peak(&net).unwrap(), res.cost);
    }

    #[test]
    fn scan_leaves_network_untouched() {
        let cal = Calibrator::new(coefficient()).unwrap().samples(16).seed(11);
        let net = network();
        let evals = cal.scan(&net, |n: &Network| peak(n)).unwrap();
        assert_eq!(evals.len(), 16);
        assert!(net.flow("pond").is_none());
        assert_eq!(net.fsa("pond").unwrap().parameter(Parameter::OrificeCoefficient), 0.6);
        for e in &evals {
            let mut own = network();
            let cost = cal.evaluate(&mut own, &e.params, &mut peak).unwrap();
            assert_eq!(cost, e.cost);
        }
        assert_eq!(evals, cal.scan(&net, |n: &Network| peak(n)).unwrap());
    }
}
