//! Directed networks of inflows, junctions and flood storage areas.
//!
//! Flow moves strictly downstream.  A run visits nodes in topological order, so every node
//! sums the flows of its direct predecessors after they have been computed.
use crate::errors::FloodError;
use crate::fsa::{Fsa, Parameter, Routing};
use crate::utils;
use log::{debug, trace};
use petgraph::algo::{connected_components, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

/// A node of a [Network](struct.Network.html).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Source of a fixed flow series.  Upstream nodes, if any, are ignored.
    Inflow {
        /// Node name.
        name: String,
        /// Flow at each time step.
        flow: Vec<f64>,
    },
    /// Sums the flows of its upstream nodes.
    Junction {
        /// Node name.
        name: String,
        /// Summed flow, `None` until the network has run.
        flow: Option<Vec<f64>>,
    },
    /// Routes the summed upstream flow through a flood storage area.
    Basin {
        /// Node name.
        name: String,
        /// The storage area.
        fsa: Fsa,
        /// Result of the last run, `None` until the network has run.
        routing: Option<Routing>,
    },
}

impl Node {
    /// Node name.
    pub fn name(&self) -> &str {
        match self {
            Node::Inflow { name, .. } | Node::Junction { name, .. } | Node::Basin { name, .. } => {
                name
            }
        }
    }

    /// Flow leaving the node, if computed.
    pub fn flow(&self) -> Option<&[f64]> {
        match self {
            Node::Inflow { flow, .. } => Some(flow.as_slice()),
            Node::Junction { flow, .. } => flow.as_deref(),
            Node::Basin { routing, .. } => routing.as_ref().map(|r| r.flow.as_slice()),
        }
    }

    /// Routing result of a basin node, if computed.
    pub fn routing(&self) -> Option<&Routing> {
        match self {
            Node::Basin { routing, .. } => routing.as_ref(),
            _ => None,
        }
    }
}

/// Network of flood storage areas driven by inflow series, all stepped with one time step `dt`.
///
/// # Examples
///
/// ```
/// use floodify::prelude::*;
/// use std::sync::Arc;
///
/// let curve = Arc::new(HypsoCurve::new(vec![1.0, 1.0], vec![0.0, 10.0])?);
/// let mut net = Network::new(1.0);
/// net.add_inflow("rain", vec![10.0, 0.0, 0.0, 0.0])?;
/// net.add_fsa("pond", Fsa::new(curve).orifice(0.0, 1.0, 1.0, 0.6))?;
/// net.add_edge("rain", "pond")?;
/// net.run()?;
/// assert_eq!(net.volume("pond").unwrap()[1], 10.0);
/// # Ok::<(), FloodError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Network {
    graph: DiGraph<Node, ()>,
    index: HashMap<String, NodeIndex>,
    dt: f64,
}

impl Network {
    /// Create an empty network stepped with time step `dt`.
    pub fn new(dt: f64) -> Self {
        Network {
            graph: DiGraph::new(),
            index: HashMap::new(),
            dt,
        }
    }

    /// Time step applied to every FSA.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// True if the network has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn add_node(&mut self, node: Node) -> Result<(), FloodError> {
        let name = node.name().to_string();
        if self.index.contains_key(&name) {
            return Err(FloodError::DuplicateNode(name));
        }
        let idx = self.graph.add_node(node);
        self.index.insert(name, idx);
        Ok(())
    }

    /// Add an FSA node called `name`.
    pub fn add_fsa(&mut self, name: &str, fsa: Fsa) -> Result<(), FloodError> {
        self.add_node(Node::Basin {
            name: name.to_string(),
            fsa,
            routing: None,
        })
    }

    /// Add an inflow node called `name` carrying the series `flow`.
    pub fn add_inflow(&mut self, name: &str, flow: Vec<f64>) -> Result<(), FloodError> {
        self.add_node(Node::Inflow {
            name: name.to_string(),
            flow,
        })
    }

    /// Add a junction node called `name`.
    pub fn add_junction(&mut self, name: &str) -> Result<(), FloodError> {
        self.add_node(Node::Junction {
            name: name.to_string(),
            flow: None,
        })
    }

    /// Route the flow of node `from` into node `to`.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), FloodError> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        self.graph.update_edge(a, b, ());
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, FloodError> {
        self.index
            .get(name)
            .cloned()
            .ok_or_else(|| FloodError::UnknownNode(name.to_string()))
    }

    /// Node called `name`.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.index.get(name).map(|idx| &self.graph[*idx])
    }

    /// Names of all nodes, in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.graph.node_weights().map(|n| n.name()).collect()
    }

    /// Names of nodes with no downstream neighbours.
    pub fn outlets(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|idx| self.graph[idx].name())
            .collect()
    }

    /// Flow leaving node `name`, if it has been computed.
    pub fn flow(&self, name: &str) -> Option<&[f64]> {
        self.node(name).and_then(|n| n.flow())
    }

    /// Stage series of FSA `name` from the last run.
    pub fn stage(&self, name: &str) -> Option<&[f64]> {
        self.node(name)
            .and_then(|n| n.routing())
            .map(|r| r.stage.as_slice())
    }

    /// Volume series of FSA `name` from the last run.
    pub fn volume(&self, name: &str) -> Option<&[f64]> {
        self.node(name)
            .and_then(|n| n.routing())
            .map(|r| r.volume.as_slice())
    }

    /// The FSA at node `name`.
    pub fn fsa(&self, name: &str) -> Result<&Fsa, FloodError> {
        match &self.graph[self.index_of(name)?] {
            Node::Basin { fsa, .. } => Ok(fsa),
            _ => Err(FloodError::NotBasin(name.to_string())),
        }
    }

    /// Mutable access to the FSA at node `name`.
    pub fn fsa_mut(&mut self, name: &str) -> Result<&mut Fsa, FloodError> {
        let idx = self.index_of(name)?;
        match &mut self.graph[idx] {
            Node::Basin { fsa, .. } => Ok(fsa),
            _ => Err(FloodError::NotBasin(name.to_string())),
        }
    }

    /// Set `param` of the FSA at node `name` to `value`.
    pub fn set_parameter(&mut self, name: &str, param: Parameter, value: f64) -> Result<(), FloodError> {
        self.fsa_mut(name)?.set_parameter(param, value);
        Ok(())
    }

    /// Total inflow to node `name`: the element-wise sum of the flows of its direct predecessors.
    pub fn node_inflow(&self, name: &str) -> Result<Vec<f64>, FloodError> {
        self.inflow_at(self.index_of(name)?, |p| self.graph[p].flow())
    }

    fn inflow_at<'a, L>(&self, idx: NodeIndex, lookup: L) -> Result<Vec<f64>, FloodError>
    where
        L: Fn(NodeIndex) -> Option<&'a [f64]>,
    {
        let name = self.graph[idx].name();
        let mut total: Option<Vec<f64>> = None;
        for pred in self.graph.neighbors_directed(idx, Direction::Incoming) {
            let flow = lookup(pred)
                .ok_or_else(|| FloodError::MissingFlow(self.graph[pred].name().to_string()))?;
            match total.as_mut() {
                None => total = Some(flow.to_vec()),
                Some(sum) => {
                    if sum.len() != flow.len() {
                        return Err(FloodError::LengthMismatch {
                            node: name.to_string(),
                            expected: sum.len(),
                            found: flow.len(),
                        });
                    }
                    utils::add_series(sum, flow);
                }
            }
        }
        total.ok_or_else(|| FloodError::NoInflow(name.to_string()))
    }

    // Flow of `idx` during a run: inflow series are fixed, everything else comes from this run.
    fn pending_flow<'a>(
        &'a self,
        idx: NodeIndex,
        pending: &'a HashMap<NodeIndex, Pending>,
    ) -> Option<&'a [f64]> {
        match &self.graph[idx] {
            Node::Inflow { flow, .. } => Some(flow.as_slice()),
            _ => pending.get(&idx).map(|p| p.flow()),
        }
    }

    /// Calculate flow through the network.
    ///
    /// Checks that the network is weakly connected, then, in order from upstream to downstream,
    /// sums the inflow to each junction and FSA and routes it through each FSA.
    /// Results of earlier runs are overwritten only if every node succeeds; a failed run leaves
    /// the network as it was.
    pub fn run(&mut self) -> Result<(), FloodError> {
        if connected_components(&self.graph) != 1 {
            // necessary but not sufficient, cycles surface from the sort below
            return Err(FloodError::Disconnected);
        }
        let order = toposort(&self.graph, None)
            .map_err(|cycle| FloodError::Cycle(self.graph[cycle.node_id()].name().to_string()))?;
        debug!("Running network of {} nodes.", order.len());

        let mut pending: HashMap<NodeIndex, Pending> = HashMap::new();
        for idx in order {
            let done = match &self.graph[idx] {
                Node::Inflow { .. } => continue,
                Node::Junction { name, .. } => {
                    let inflow = self.inflow_at(idx, |p| self.pending_flow(p, &pending))?;
                    trace!("Junction {} summed {} steps.", name, inflow.len());
                    Pending::Junction(inflow)
                }
                Node::Basin { name, fsa, .. } => {
                    let inflow = self.inflow_at(idx, |p| self.pending_flow(p, &pending))?;
                    let res = fsa.run(&inflow, self.dt);
                    trace!("FSA {} routed, peak outflow {}.", name, res.peak());
                    Pending::Basin(res)
                }
            };
            pending.insert(idx, done);
        }

        for (idx, done) in pending {
            match (&mut self.graph[idx], done) {
                (Node::Junction { flow, .. }, Pending::Junction(sum)) => *flow = Some(sum),
                (Node::Basin { routing, .. }, Pending::Basin(res)) => *routing = Some(res),
                _ => {}
            }
        }
        Ok(())
    }
}

// Result of one node, held back until the whole run has succeeded.
#[derive(Debug)]
enum Pending {
    Junction(Vec<f64>),
    Basin(Routing),
}

impl Pending {
    fn flow(&self) -> &[f64] {
        match self {
            Pending::Junction(flow) => flow,
            Pending::Basin(res) => &res.flow,
        }
    }
}
