use floodify::hydraulics::{submerged_orifice_flow, weir_flow};
use floodify::prelude::*;
use std::sync::Arc;

fn tank() -> Arc<HypsoCurve> {
    Arc::new(HypsoCurve::new(vec![1.0, 1.0], vec![0.0, 10.0]).unwrap())
}

fn single_pond() -> Network {
    let fsa = Fsa::new(tank())
        .orifice(0.0, 1.0, 1.0, 0.6)
        .weir(5.0, 1.0, 1.7);
    let mut net = Network::new(1.0);
    net.add_inflow("storm", vec![10.0, 0.0, 0.0, 0.0]).unwrap();
    net.add_fsa("pond", fsa).unwrap();
    net.add_edge("storm", "pond").unwrap();
    net
}

#[test]
fn pulse_fills_pond_to_the_top() {
    let mut net = single_pond();
    net.run().unwrap();
    let volume = net.volume("pond").unwrap();
    let stage = net.stage("pond").unwrap();
    let flow = net.flow("pond").unwrap();

    assert_eq!(volume[0], 0.0);
    assert_eq!(flow[0], 0.0);
    assert_eq!(volume[1], 10.0);
    assert_eq!(stage[1], 10.0);

    let expected = submerged_orifice_flow(10.0, 0.0, 1.0, 1.0, 0.6) + weir_flow(10.0, 5.0, 1.0, 1.7);
    assert!(flow[1] > 0.0);
    assert!((flow[1] - expected).abs() < 1e-9);
    // more than the pond holds drains in one step
    assert_eq!(volume[2], 0.0);
    assert_eq!(stage[2], 0.0);
}

#[test]
fn basins_in_series_attenuate_the_peak() {
    let curve = tank();
    let mut net = Network::new(0.5);
    net.add_inflow("storm", vec![4.0, 8.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0])
        .unwrap();
    net.add_fsa(
        "upper",
        Fsa::new(curve.clone()).orifice(0.0, 0.5, 0.5, 0.6).weir(9.0, 1.0, 1.7),
    )
    .unwrap();
    net.add_fsa(
        "lower",
        Fsa::new(curve).orifice(0.0, 0.5, 0.5, 0.6).weir(9.0, 1.0, 1.7),
    )
    .unwrap();
    net.add_junction("outfall").unwrap();
    net.add_edge("storm", "upper").unwrap();
    net.add_edge("upper", "lower").unwrap();
    net.add_edge("lower", "outfall").unwrap();
    net.run().unwrap();

    assert_eq!(net.node_inflow("lower").unwrap(), net.flow("upper").unwrap().to_vec());
    assert_eq!(net.flow("outfall").unwrap(), net.flow("lower").unwrap());
    let storm_peak = utils::peak(net.flow("storm").unwrap());
    let upper_peak = utils::peak(net.flow("upper").unwrap());
    assert!(upper_peak < storm_peak);
    assert_eq!(net.outlets(), vec!["outfall"]);
}

#[test]
fn disconnected_basin_fails_the_run() {
    let mut net = single_pond();
    net.add_fsa("stray", Fsa::new(tank())).unwrap();
    assert_eq!(net.run(), Err(FloodError::Disconnected));
}

#[test]
fn peak_outflow_is_monotone_in_orifice_coefficient() {
    let cal = Calibrator::new(vec![ParameterConfig::new(
        "pond",
        Parameter::OrificeCoefficient,
        0.6,
        (0.1, 1.0),
    )])
    .unwrap();
    let mut net = single_pond();
    let mut peak = |n: &Network| -> Result<f64, FloodError> {
        Ok(utils::peak(n.flow("pond").unwrap_or(&[])))
    };
    let mut last = f64::NEG_INFINITY;
    for i in 0..10 {
        let c = 0.1 + 0.1 * i as f64;
        let cost = cal.evaluate(&mut net, &[c], &mut peak).unwrap();
        assert!(cost >= last);
        last = cost;
    }
}

#[test]
fn calibration_minimizes_peak_outflow() {
    let cal = Calibrator::new(vec![ParameterConfig::new(
        "pond",
        Parameter::OrificeCoefficient,
        0.6,
        (0.1, 1.0),
    )])
    .unwrap();
    let mut net = single_pond();
    let res = cal
        .optimize(&mut net, |n: &Network| {
            Ok(utils::peak(n.flow("pond").unwrap_or(&[])))
        })
        .unwrap();
    assert!((res.params[0] - 0.1).abs() < 1e-3);

    cal.apply(&mut net, &res.params).unwrap();
    assert_eq!(
        net.fsa("pond").unwrap().parameter(Parameter::OrificeCoefficient),
        res.params[0]
    );
    assert!((utils::peak(net.flow("pond").unwrap()) - res.cost).abs() < 1e-12);
}

#[test]
fn parameter_configs_read_from_strings() {
    let param: Parameter = "weir_coefficient".parse().unwrap();
    let config = ParameterConfig::new("pond", param, 1.7, (1.0, 2.0));
    assert_eq!(config.label(), "pond.weir_coefficient");
}
