//! Port references for node inputs and outputs.
//!
//! Ports are never stored on a node. They are derived from the node variant
//! and an index, and addressed through a [`PortRef`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a port (input or output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Default port colors
pub mod port_colors {
    pub const OPTICAL: &str = "#64c8ff";
    pub const ETHERNET: &str = "#ffc864";
    pub const FLOOR: &str = "#c864ff";
}

/// Address of one port: `(node id, direction, index)`.
///
/// This is also the locator used to key computed power values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRef {
    /// Owning node ID
    pub node_id: String,

    /// Port direction (input or output)
    #[serde(rename = "portType")]
    pub direction: PortDirection,

    /// Index within the node's inputs or outputs
    #[serde(rename = "portIndex")]
    pub index: usize,
}

impl PortRef {
    pub fn new(node_id: impl Into<String>, direction: PortDirection, index: usize) -> Self {
        Self {
            node_id: node_id.into(),
            direction,
            index,
        }
    }

    /// Reference an input port
    pub fn input(node_id: impl Into<String>, index: usize) -> Self {
        Self::new(node_id, PortDirection::Input, index)
    }

    /// Reference an output port
    pub fn output(node_id: impl Into<String>, index: usize) -> Self {
        Self::new(node_id, PortDirection::Output, index)
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

/// Formats as `{node_id}-{direction}-{index}`.
impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.node_id, self.direction, self.index)
    }
}
