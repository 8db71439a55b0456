//! Node types for fiber-distribution diagrams.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    port_colors, PortDirection, PortRef, SplitterCategory, SplitterLoss, SplitterSpec,
    NODE_BASE_HEIGHT, NODE_BASE_WIDTH, PORT_SPACING,
};

/// Position in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Clamp both coordinates to be non-negative
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.max(0.0),
            y: self.y.max(0.0),
        }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::zero()
    }
}

/// Bounding size of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Node variant without its payload, used for rule tables and layout columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeVariant {
    Olt,
    Splitter,
    Onu,
    Switch,
    Building,
}

impl NodeVariant {
    pub const ALL: [NodeVariant; 5] = [
        NodeVariant::Olt,
        NodeVariant::Splitter,
        NodeVariant::Onu,
        NodeVariant::Switch,
        NodeVariant::Building,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeVariant::Olt => "OLT",
            NodeVariant::Splitter => "Splitter",
            NodeVariant::Onu => "ONU",
            NodeVariant::Switch => "Switch",
            NodeVariant::Building => "Building",
        }
    }

    /// Prefix for generated node IDs
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NodeVariant::Olt => "olt",
            NodeVariant::Splitter => "splitter",
            NodeVariant::Onu => "onu",
            NodeVariant::Switch => "switch",
            NodeVariant::Building => "building",
        }
    }
}

impl fmt::Display for NodeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Optical line terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OltNode {
    /// Number of PON ports (one output each)
    pub pon_ports: usize,

    /// Transmit power override in dBm; the diagram setting applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_power: Option<f64>,

    /// Catalog OLT this node was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_olt_id: Option<String>,
}

/// Optical splitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitterNode {
    /// Loss table key (e.g., "1:8", "30/70")
    pub splitter_type: String,

    pub category: SplitterCategory,

    pub output_ports: usize,

    pub loss: SplitterLoss,

    /// Display-only fiber length hint, in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_length_hint: Option<f64>,
}

impl SplitterNode {
    pub fn from_spec(spec: &SplitterSpec) -> Self {
        Self {
            splitter_type: spec.key.clone(),
            category: spec.category,
            output_ports: spec.output_ports,
            loss: spec.loss.clone(),
            fiber_length_hint: None,
        }
    }

    /// Replace type, category, port count and loss in one step
    pub fn apply_spec(&mut self, spec: &SplitterSpec) {
        self.splitter_type = spec.key.clone();
        self.category = spec.category;
        self.output_ports = spec.output_ports;
        self.loss = spec.loss.clone();
    }
}

/// Optical network unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnuNode {
    /// Distance from the feeding splitter, in meters
    #[serde(default)]
    pub distance_m: f64,

    /// Receiver sensitivity override in dBm; the diagram setting applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f64>,

    /// Catalog ONU this node is linked to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_onu_id: Option<String>,

    #[serde(default)]
    pub online: bool,
}

impl Default for OnuNode {
    fn default() -> Self {
        Self {
            distance_m: 0.0,
            sensitivity: None,
            catalog_onu_id: None,
            online: false,
        }
    }
}

/// Ethernet switch fed by an ONU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchNode {
    /// Number of downstream ports
    pub ports: usize,

    /// Physical port used as uplink
    #[serde(default)]
    pub uplink_port: usize,
}

/// One unit (apartment, shop) on a building floor
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingUnit {
    pub label: String,

    /// Assigned customer, empty when vacant
    #[serde(default)]
    pub customer: String,
}

/// A building floor holding two units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub units: [BuildingUnit; 2],
}

impl Floor {
    /// Floor `number` (1-based) with units labelled "{number}A" and "{number}B"
    pub fn numbered(number: usize) -> Self {
        Self {
            units: [
                BuildingUnit {
                    label: format!("{}A", number),
                    customer: String::new(),
                },
                BuildingUnit {
                    label: format!("{}B", number),
                    customer: String::new(),
                },
            ],
        }
    }
}

/// Multi-unit building; each floor is one input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingNode {
    pub floors: Vec<Floor>,
}

impl BuildingNode {
    pub fn with_floors(count: usize) -> Self {
        Self {
            floors: (1..=count).map(Floor::numbered).collect(),
        }
    }

    pub fn floor_count(&self) -> usize {
        self.floors.len()
    }

    /// Grow or shrink to `count` floors, keeping existing floor data
    pub fn set_floor_count(&mut self, count: usize) {
        if count < self.floors.len() {
            self.floors.truncate(count);
        } else {
            let start = self.floors.len() + 1;
            self.floors.extend((start..=count).map(Floor::numbered));
        }
    }
}

/// Variant-specific node data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Olt(OltNode),
    Splitter(SplitterNode),
    Onu(OnuNode),
    Switch(SwitchNode),
    Building(BuildingNode),
}

impl NodeKind {
    pub fn variant(&self) -> NodeVariant {
        match self {
            NodeKind::Olt(_) => NodeVariant::Olt,
            NodeKind::Splitter(_) => NodeVariant::Splitter,
            NodeKind::Onu(_) => NodeVariant::Onu,
            NodeKind::Switch(_) => NodeVariant::Switch,
            NodeKind::Building(_) => NodeVariant::Building,
        }
    }

    /// Number of input ports derived from the variant
    pub fn input_count(&self) -> usize {
        match self {
            NodeKind::Olt(_) => 0,
            NodeKind::Splitter(_) | NodeKind::Onu(_) | NodeKind::Switch(_) => 1,
            NodeKind::Building(b) => b.floor_count(),
        }
    }

    /// Number of output ports derived from the variant
    pub fn output_count(&self) -> usize {
        match self {
            NodeKind::Olt(o) => o.pon_ports,
            NodeKind::Splitter(s) => s.output_ports,
            NodeKind::Onu(_) => 1,
            NodeKind::Switch(s) => s.ports,
            NodeKind::Building(_) => 0,
        }
    }
}

/// A node in the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: String,

    /// User-editable display name
    pub name: String,

    /// Position on the canvas (top-left corner)
    pub position: Position,

    /// Bounding size on the canvas
    pub size: Size,

    pub kind: NodeKind,
}

impl Node {
    /// Create a node, sizing it to fit its ports
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Position, kind: NodeKind) -> Self {
        let size = Self::fitted_size(&kind);
        Self {
            id: id.into(),
            name: name.into(),
            position,
            size,
            kind,
        }
    }

    pub fn olt(id: impl Into<String>, name: impl Into<String>, pon_ports: usize) -> Self {
        Self::new(
            id,
            name,
            Position::zero(),
            NodeKind::Olt(OltNode {
                pon_ports,
                tx_power: None,
                source_olt_id: None,
            }),
        )
    }

    pub fn splitter(id: impl Into<String>, name: impl Into<String>, spec: &SplitterSpec) -> Self {
        Self::new(id, name, Position::zero(), NodeKind::Splitter(SplitterNode::from_spec(spec)))
    }

    pub fn onu(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, Position::zero(), NodeKind::Onu(OnuNode::default()))
    }

    pub fn switch(id: impl Into<String>, name: impl Into<String>, ports: usize) -> Self {
        Self::new(
            id,
            name,
            Position::zero(),
            NodeKind::Switch(SwitchNode { ports, uplink_port: 0 }),
        )
    }

    pub fn building(id: impl Into<String>, name: impl Into<String>, floors: usize) -> Self {
        Self::new(
            id,
            name,
            Position::zero(),
            NodeKind::Building(BuildingNode::with_floors(floors)),
        )
    }

    /// Builder-style position setter
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn variant(&self) -> NodeVariant {
        self.kind.variant()
    }

    pub fn input_count(&self) -> usize {
        self.kind.input_count()
    }

    pub fn output_count(&self) -> usize {
        self.kind.output_count()
    }

    pub fn port_count(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::Input => self.input_count(),
            PortDirection::Output => self.output_count(),
        }
    }

    /// Check whether the referenced port exists on this node
    pub fn has_port(&self, port: &PortRef) -> bool {
        port.node_id == self.id && port.index < self.port_count(port.direction)
    }

    /// All ports of this node, inputs first
    pub fn ports(&self) -> Vec<PortRef> {
        let inputs = (0..self.input_count()).map(|i| PortRef::input(&self.id, i));
        let outputs = (0..self.output_count()).map(|i| PortRef::output(&self.id, i));
        inputs.chain(outputs).collect()
    }

    /// Canvas anchor of a port: inputs on the left edge, outputs on the right,
    /// evenly spaced along the height.
    pub fn port_anchor(&self, direction: PortDirection, index: usize) -> Position {
        let count = self.port_count(direction).max(1) as f32;
        let y = self.position.y + self.size.height * (index as f32 + 1.0) / (count + 1.0);
        let x = match direction {
            PortDirection::Input => self.position.x,
            PortDirection::Output => self.position.x + self.size.width,
        };
        Position::new(x, y)
    }

    /// Visual color of a port
    pub fn port_color(&self, direction: PortDirection) -> &'static str {
        match (&self.kind, direction) {
            (NodeKind::Building(_), PortDirection::Input) => port_colors::FLOOR,
            (NodeKind::Onu(_), PortDirection::Output)
            | (NodeKind::Switch(_), _) => port_colors::ETHERNET,
            _ => port_colors::OPTICAL,
        }
    }

    /// Check whether `pos` lies inside the node body
    pub fn contains(&self, pos: &Position) -> bool {
        pos.x >= self.position.x
            && pos.x <= self.position.x + self.size.width
            && pos.y >= self.position.y
            && pos.y <= self.position.y + self.size.height
    }

    /// Recompute the bounding size after a port count change
    pub fn refit(&mut self) {
        self.size = Self::fitted_size(&self.kind);
    }

    fn fitted_size(kind: &NodeKind) -> Size {
        let ports = kind.input_count().max(kind.output_count()) as f32;
        let height = ((ports + 1.0) * PORT_SPACING).max(NODE_BASE_HEIGHT);
        Size::new(NODE_BASE_WIDTH, height)
    }

    pub fn as_olt(&self) -> Option<&OltNode> {
        match &self.kind {
            NodeKind::Olt(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_splitter(&self) -> Option<&SplitterNode> {
        match &self.kind {
            NodeKind::Splitter(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_onu(&self) -> Option<&OnuNode> {
        match &self.kind {
            NodeKind::Onu(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_building(&self) -> Option<&BuildingNode> {
        match &self.kind {
            NodeKind::Building(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LossTables;

    #[test]
    fn test_port_counts_follow_variant() {
        let tables = LossTables::standard();
        assert_eq!(Node::olt("o", "OLT", 4).output_count(), 4);
        assert_eq!(Node::olt("o", "OLT", 4).input_count(), 0);

        let splitter = Node::splitter("s", "S", tables.get("1:8").unwrap());
        assert_eq!(splitter.input_count(), 1);
        assert_eq!(splitter.output_count(), 8);

        let onu = Node::onu("n", "ONU");
        assert_eq!((onu.input_count(), onu.output_count()), (1, 1));

        let switch = Node::switch("w", "SW", 8);
        assert_eq!((switch.input_count(), switch.output_count()), (1, 8));

        let building = Node::building("b", "Tower", 5);
        assert_eq!((building.input_count(), building.output_count()), (5, 0));
    }

    #[test]
    fn test_has_port_checks_owner_and_range() {
        let onu = Node::onu("onu-1", "ONU");
        assert!(onu.has_port(&PortRef::input("onu-1", 0)));
        assert!(!onu.has_port(&PortRef::input("onu-1", 1)));
        assert!(!onu.has_port(&PortRef::input("onu-2", 0)));
    }

    #[test]
    fn test_building_floor_resize_keeps_existing_floors() {
        let mut building = BuildingNode::with_floors(2);
        building.floors[0].units[1].customer = "Dewi".to_string();

        building.set_floor_count(4);
        assert_eq!(building.floor_count(), 4);
        assert_eq!(building.floors[0].units[1].customer, "Dewi");
        assert_eq!(building.floors[3].units[0].label, "4A");

        building.set_floor_count(1);
        assert_eq!(building.floor_count(), 1);
        assert_eq!(building.floors[0].units[1].customer, "Dewi");
    }

    #[test]
    fn test_port_anchors_sit_on_edges() {
        let node = Node::switch("w", "SW", 3).at(Position::new(100.0, 50.0));
        let input = node.port_anchor(PortDirection::Input, 0);
        let output = node.port_anchor(PortDirection::Output, 2);
        assert_eq!(input.x, 100.0);
        assert_eq!(output.x, 100.0 + node.size.width);
        assert!(output.y > node.port_anchor(PortDirection::Output, 1).y);
    }

    #[test]
    fn test_port_colors_follow_medium() {
        let tables = LossTables::standard();
        let splitter = Node::splitter("s", "S", tables.get("1:4").unwrap());
        assert_eq!(splitter.port_color(PortDirection::Input), port_colors::OPTICAL);
        assert_eq!(splitter.port_color(PortDirection::Output), port_colors::OPTICAL);

        let onu = Node::onu("n", "ONU");
        assert_eq!(onu.port_color(PortDirection::Input), port_colors::OPTICAL);
        assert_eq!(onu.port_color(PortDirection::Output), port_colors::ETHERNET);

        let switch = Node::switch("w", "SW", 4);
        assert_eq!(switch.port_color(PortDirection::Input), port_colors::ETHERNET);
        assert_eq!(Node::building("b", "Tower", 2).port_color(PortDirection::Input), port_colors::FLOOR);
    }

    #[test]
    fn test_clamped_position() {
        let pos = Position::new(-4.0, 12.0).clamped();
        assert_eq!(pos, Position::new(0.0, 12.0));
    }
}
