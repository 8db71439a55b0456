//! Connection types for wiring nodes together.

use serde::{Deserialize, Serialize};

use crate::{PortRef, Position};

/// Cable length given to connections drawn on the canvas, in meters
pub const DEFAULT_CABLE_LENGTH_M: f64 = 100.0;

/// Connector count given to connections drawn on the canvas
pub const DEFAULT_CONNECTOR_COUNT: u32 = 2;

/// A directed cable from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier
    pub id: String,

    /// Source (output) port
    pub from: PortRef,

    /// Target (input) port
    pub to: PortRef,

    /// Cable length in meters
    pub cable_length: f64,

    /// Number of connectors along the cable
    pub connector_count: u32,

    /// Display offset of the cable label from the curve midpoint
    #[serde(default)]
    pub label_offset: Position,
}

impl Connection {
    /// Create a connection with default cable length and connector count
    pub fn new(id: impl Into<String>, from: PortRef, to: PortRef) -> Self {
        Self {
            id: id.into(),
            from,
            to,
            cable_length: DEFAULT_CABLE_LENGTH_M,
            connector_count: DEFAULT_CONNECTOR_COUNT,
            label_offset: Position::zero(),
        }
    }

    /// Builder-style cable parameters
    pub fn with_cable(mut self, cable_length: f64, connector_count: u32) -> Self {
        self.cable_length = cable_length;
        self.connector_count = connector_count;
        self
    }

    /// Check whether this connection joins the same two ports
    pub fn joins(&self, from: &PortRef, to: &PortRef) -> bool {
        &self.from == from && &self.to == to
    }

    /// Check whether either end belongs to `node_id`
    pub fn touches(&self, node_id: &str) -> bool {
        self.from.node_id == node_id || self.to.node_id == node_id
    }
}
