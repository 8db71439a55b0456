//! Graph state management - node and connection edits on a diagram.

use fiberplan_types::{
    CatalogOlt, CatalogOnu, Connection, Diagram, LossTables, Node, NodeKind, NodeVariant, PortRef,
    Position,
};
use thiserror::Error;

use crate::layout;
use crate::validator::{self, ConnectionRejection};

/// PON ports on a freshly placed OLT
pub const DEFAULT_PON_PORTS: usize = 16;

/// Downstream ports on a freshly placed switch
pub const DEFAULT_SWITCH_PORTS: usize = 8;

/// Floors of a freshly placed building
pub const DEFAULT_FLOORS: usize = 3;

/// Errors from metadata edits
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Node {0} does not exist")]
    UnknownNode(String),

    #[error("Connection {0} does not exist")]
    UnknownConnection(String),

    #[error("Unknown splitter type: {0}")]
    UnknownSplitterType(String),

    #[error("{edit} does not apply to a {variant} node")]
    NotApplicable { edit: &'static str, variant: NodeVariant },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Building has no unit {unit} on floor {floor}")]
    NoSuchUnit { floor: usize, unit: usize },
}

/// Template for a node to add
#[derive(Debug, Clone, PartialEq)]
pub enum NewNode {
    Olt { pon_ports: usize },
    Splitter { splitter_type: String },
    Onu,
    Switch { ports: usize },
    Building { floors: usize },
    FromCatalogOlt(CatalogOlt),
    FromCatalogOnu(CatalogOnu),
}

impl NewNode {
    /// Template with default attributes for a variant
    pub fn default_for(variant: NodeVariant) -> Self {
        match variant {
            NodeVariant::Olt => NewNode::Olt {
                pon_ports: DEFAULT_PON_PORTS,
            },
            NodeVariant::Splitter => NewNode::Splitter {
                splitter_type: LossTables::DEFAULT_KEY.to_string(),
            },
            NodeVariant::Onu => NewNode::Onu,
            NodeVariant::Switch => NewNode::Switch {
                ports: DEFAULT_SWITCH_PORTS,
            },
            NodeVariant::Building => NewNode::Building {
                floors: DEFAULT_FLOORS,
            },
        }
    }

    pub fn variant(&self) -> NodeVariant {
        match self {
            NewNode::Olt { .. } | NewNode::FromCatalogOlt(_) => NodeVariant::Olt,
            NewNode::Splitter { .. } => NodeVariant::Splitter,
            NewNode::Onu | NewNode::FromCatalogOnu(_) => NodeVariant::Onu,
            NewNode::Switch { .. } => NodeVariant::Switch,
            NewNode::Building { .. } => NodeVariant::Building,
        }
    }
}

/// Scalar edit applied to a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEdit {
    Rename(String),
    /// OLT transmit power override; `None` uses the diagram setting
    TxPower(Option<f64>),
    PonPorts(usize),
    /// Switch the splitter to another loss table entry
    SplitterType(String),
    FiberLengthHint(Option<f64>),
    Distance(f64),
    /// ONU sensitivity override; `None` uses the diagram setting
    Sensitivity(Option<f64>),
    Online(bool),
    SwitchPorts(usize),
    UplinkPort(usize),
    FloorCount(usize),
    UnitCustomer {
        floor: usize,
        unit: usize,
        customer: String,
    },
}

impl NodeEdit {
    fn name(&self) -> &'static str {
        match self {
            NodeEdit::Rename(_) => "Rename",
            NodeEdit::TxPower(_) => "Transmit power",
            NodeEdit::PonPorts(_) => "PON port count",
            NodeEdit::SplitterType(_) => "Splitter type",
            NodeEdit::FiberLengthHint(_) => "Fiber length hint",
            NodeEdit::Distance(_) => "Distance",
            NodeEdit::Sensitivity(_) => "Sensitivity",
            NodeEdit::Online(_) => "Online flag",
            NodeEdit::SwitchPorts(_) => "Switch port count",
            NodeEdit::UplinkPort(_) => "Uplink port",
            NodeEdit::FloorCount(_) => "Floor count",
            NodeEdit::UnitCustomer { .. } => "Unit customer",
        }
    }
}

/// Scalar edit applied to a connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionEdit {
    CableLength(f64),
    ConnectorCount(u32),
    LabelOffset(Position),
}

/// Edit of the diagram-wide settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsEdit {
    OltTxPower(f64),
    OnuSensitivity(f64),
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, EditError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EditError::InvalidValue {
            field,
            reason: format!("{} must be a non-negative number", value),
        })
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, EditError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EditError::InvalidValue {
            field,
            reason: format!("{} is not a finite number", value),
        })
    }
}

fn at_least_one(field: &'static str, value: usize) -> Result<usize, EditError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(EditError::InvalidValue {
            field,
            reason: "must be at least 1".to_string(),
        })
    }
}

/// State for editing the nodes and connections of a diagram
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    /// Splitter loss tables
    pub tables: LossTables,
}

impl GraphState {
    pub fn new() -> Self {
        Self::with_tables(LossTables::standard())
    }

    pub fn with_tables(tables: LossTables) -> Self {
        Self { tables }
    }

    /// Generate a node ID not yet used in the diagram
    pub fn generate_id(diagram: &Diagram, variant: NodeVariant) -> String {
        let prefix = variant.id_prefix();
        (diagram.nodes_of(variant).count() + 1..)
            .map(|n| format!("{}-{}", prefix, n))
            .find(|id| !diagram.contains_node(id))
            .unwrap_or_else(|| prefix.to_string())
    }

    /// Generate a connection ID not yet used in the diagram
    pub fn generate_connection_id(diagram: &Diagram) -> String {
        (diagram.connections.len() + 1..)
            .map(|n| format!("conn-{}", n))
            .find(|id| diagram.connection(id).is_none())
            .unwrap_or_else(|| "conn".to_string())
    }

    /// Build a node from a template without adding it
    pub fn build_node(&self, diagram: &Diagram, template: NewNode) -> Result<Node, EditError> {
        let variant = template.variant();
        let id = Self::generate_id(diagram, variant);
        let name = format!("{} {}", variant, diagram.nodes_of(variant).count() + 1);

        let node = match template {
            NewNode::Olt { pon_ports } => Node::olt(id, name, at_least_one("PON port count", pon_ports)?),
            NewNode::Splitter { splitter_type } => {
                let spec = self
                    .tables
                    .get(&splitter_type)
                    .ok_or(EditError::UnknownSplitterType(splitter_type))?;
                Node::splitter(id, name, spec)
            }
            NewNode::Onu => Node::onu(id, name),
            NewNode::Switch { ports } => Node::switch(id, name, at_least_one("Switch port count", ports)?),
            NewNode::Building { floors } => Node::building(id, name, at_least_one("Floor count", floors)?),
            NewNode::FromCatalogOlt(olt) => Node::from_catalog_olt(id, &olt),
            NewNode::FromCatalogOnu(onu) => Node::from_catalog_onu(id, &onu),
        };
        Ok(node)
    }

    /// Add a node at the default position for its variant
    pub fn add_node(&self, diagram: &mut Diagram, template: NewNode) -> Result<String, EditError> {
        let position = layout::next_position(diagram, template.variant());
        self.add_node_at(diagram, template, position)
    }

    /// Add a node at a given position
    pub fn add_node_at(
        &self,
        diagram: &mut Diagram,
        template: NewNode,
        position: Position,
    ) -> Result<String, EditError> {
        let node = self.build_node(diagram, template)?.at(position.clamped());
        let id = node.id.clone();
        log::debug!("Added {} node {}", node.variant(), id);
        diagram.add_node(node);
        Ok(id)
    }

    /// Delete a node and every connection touching it
    pub fn delete_node(diagram: &mut Diagram, node_id: &str) -> Option<Vec<Connection>> {
        let removed = diagram.remove_node(node_id)?;
        log::debug!("Deleted node {} with {} connection(s)", node_id, removed.len());
        Some(removed)
    }

    /// Propose a connection; the validator decides
    pub fn connect(diagram: &mut Diagram, from: PortRef, to: PortRef) -> Result<Connection, ConnectionRejection> {
        let id = Self::generate_connection_id(diagram);
        validator::try_connect(diagram, id, from, to)
    }

    pub fn disconnect(diagram: &mut Diagram, connection_id: &str) -> Option<Connection> {
        diagram.remove_connection(connection_id)
    }

    /// Move a node, clamped to non-negative coordinates
    pub fn move_node(diagram: &mut Diagram, node_id: &str, position: Position) -> bool {
        match diagram.node_mut(node_id) {
            Some(node) => {
                node.position = position.clamped();
                true
            }
            None => false,
        }
    }

    /// Apply a scalar edit to a node
    pub fn edit_node(&self, diagram: &mut Diagram, node_id: &str, edit: NodeEdit) -> Result<(), EditError> {
        let node = diagram
            .node_mut(node_id)
            .ok_or_else(|| EditError::UnknownNode(node_id.to_string()))?;
        let not_applicable = EditError::NotApplicable {
            edit: edit.name(),
            variant: node.variant(),
        };

        match (edit, &mut node.kind) {
            (NodeEdit::Rename(name), _) => node.name = name,
            (NodeEdit::TxPower(tx), NodeKind::Olt(olt)) => {
                olt.tx_power = tx.map(|v| finite("Transmit power", v)).transpose()?;
            }
            (NodeEdit::PonPorts(count), NodeKind::Olt(olt)) => {
                olt.pon_ports = at_least_one("PON port count", count)?;
            }
            (NodeEdit::SplitterType(key), NodeKind::Splitter(splitter)) => {
                let spec = self.tables.get(&key).ok_or(EditError::UnknownSplitterType(key))?;
                splitter.apply_spec(spec);
            }
            (NodeEdit::FiberLengthHint(hint), NodeKind::Splitter(splitter)) => {
                splitter.fiber_length_hint = hint.map(|v| non_negative("Fiber length hint", v)).transpose()?;
            }
            (NodeEdit::Distance(distance), NodeKind::Onu(onu)) => {
                onu.distance_m = non_negative("Distance", distance)?;
            }
            (NodeEdit::Sensitivity(sensitivity), NodeKind::Onu(onu)) => {
                onu.sensitivity = sensitivity.map(|v| finite("Sensitivity", v)).transpose()?;
            }
            (NodeEdit::Online(online), NodeKind::Onu(onu)) => onu.online = online,
            (NodeEdit::SwitchPorts(count), NodeKind::Switch(switch)) => {
                switch.ports = at_least_one("Switch port count", count)?;
                switch.uplink_port = switch.uplink_port.min(switch.ports - 1);
            }
            (NodeEdit::UplinkPort(port), NodeKind::Switch(switch)) => {
                if port >= switch.ports {
                    return Err(EditError::InvalidValue {
                        field: "Uplink port",
                        reason: format!("switch has {} ports", switch.ports),
                    });
                }
                switch.uplink_port = port;
            }
            (NodeEdit::FloorCount(count), NodeKind::Building(building)) => {
                building.set_floor_count(at_least_one("Floor count", count)?);
            }
            (NodeEdit::UnitCustomer { floor, unit, customer }, NodeKind::Building(building)) => {
                let slot = building
                    .floors
                    .get_mut(floor)
                    .and_then(|f| f.units.get_mut(unit))
                    .ok_or(EditError::NoSuchUnit { floor, unit })?;
                slot.customer = customer;
            }
            _ => return Err(not_applicable),
        }

        node.refit();

        let orphans = diagram.orphaned_connections().len();
        if orphans > 0 {
            log::debug!("Diagram {} has {} orphaned connection(s)", diagram.id, orphans);
        }
        Ok(())
    }

    /// Apply a scalar edit to a connection
    pub fn edit_connection(diagram: &mut Diagram, connection_id: &str, edit: ConnectionEdit) -> Result<(), EditError> {
        let connection = diagram
            .connection_mut(connection_id)
            .ok_or_else(|| EditError::UnknownConnection(connection_id.to_string()))?;
        match edit {
            ConnectionEdit::CableLength(length) => connection.cable_length = non_negative("Cable length", length)?,
            ConnectionEdit::ConnectorCount(count) => connection.connector_count = count,
            ConnectionEdit::LabelOffset(offset) => connection.label_offset = offset,
        }
        Ok(())
    }

    /// Apply an edit to the diagram-wide settings
    pub fn edit_settings(diagram: &mut Diagram, edit: SettingsEdit) -> Result<(), EditError> {
        match edit {
            SettingsEdit::OltTxPower(tx) => diagram.settings.olt_tx_power = finite("OLT transmit power", tx)?,
            SettingsEdit::OnuSensitivity(s) => diagram.settings.onu_sensitivity = finite("ONU sensitivity", s)?,
        }
        Ok(())
    }
}
