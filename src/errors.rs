/// Custom error type for the floodify crate.
#[derive(Debug, Clone, PartialEq)]
pub enum FloodError {
    /// Error type from csv crate.
    CsvError,
    /// Error type from std::io.
    IoError,
    /// Survey data cannot form a stage-volume curve.
    InvalidCurve(String),
    /// A node with this name is already in the network.
    DuplicateNode(String),
    /// No node with this name is in the network.
    UnknownNode(String),
    /// The named node exists but is not a flood storage area.
    NotBasin(String),
    /// The network is empty or not weakly connected.
    Disconnected,
    /// The network contains a cycle through the named node.
    Cycle(String),
    /// A junction or basin has no upstream nodes to draw flow from.
    NoInflow(String),
    /// An upstream node has not produced a flow series.
    MissingFlow(String),
    /// Upstream flow series reaching a node differ in length.
    LengthMismatch {
        /// Node receiving the flows.
        node: String,
        /// Length of the first upstream series.
        expected: usize,
        /// Length of the offending series.
        found: usize,
    },
    /// Calibration bounds are empty or not finite.
    InvalidBounds(String),
    /// Unknown or unusable calibration parameter.
    InvalidParameter(String),
    /// Failure raised by a user objective function.
    Objective(String),
    /// Failure inside the minimizer.
    Optimizer(String),
}

impl std::error::Error for FloodError {}

impl std::fmt::Display for FloodError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FloodError::CsvError => write!(f, "Could not serialize/deserialize csv file."),
            FloodError::IoError => write!(f, "Could not read or write file at path provided."),
            FloodError::InvalidCurve(why) => write!(f, "Invalid hypsometric curve: {}.", why),
            FloodError::DuplicateNode(name) => write!(f, "Node {} already exists.", name),
            FloodError::UnknownNode(name) => write!(f, "Node {} does not exist.", name),
            FloodError::NotBasin(name) => write!(f, "Node {} is not an FSA.", name),
            FloodError::Disconnected => write!(f, "Network structure is not valid."),
            FloodError::Cycle(name) => write!(f, "Network contains a cycle at node {}.", name),
            FloodError::NoInflow(name) => write!(f, "Node {} has no upstream nodes.", name),
            FloodError::MissingFlow(name) => write!(f, "Node {} has no flow series.", name),
            FloodError::LengthMismatch {
                node,
                expected,
                found,
            } => write!(
                f,
                "Inflows to node {} have mismatched lengths ({} and {}).",
                node, expected, found
            ),
            FloodError::InvalidBounds(why) => write!(f, "Invalid parameter bounds: {}.", why),
            FloodError::InvalidParameter(why) => write!(f, "Invalid parameter: {}.", why),
            FloodError::Objective(why) => write!(f, "Objective function failed: {}.", why),
            FloodError::Optimizer(why) => write!(f, "Optimizer failed: {}.", why),
        }
    }
}

impl From<csv::Error> for FloodError {
    fn from(_: csv::Error) -> Self {
        FloodError::CsvError
    }
}

impl From<std::io::Error> for FloodError {
    fn from(_: std::io::Error) -> Self {
        FloodError::IoError
    }
}

impl From<argmin::core::Error> for FloodError {
    fn from(err: argmin::core::Error) -> Self {
        // objective failures travel through the minimizer boxed, unwrap them intact
        match err.downcast::<FloodError>() {
            Ok(inner) => inner,
            Err(other) => FloodError::Optimizer(other.to_string()),
        }
    }
}
