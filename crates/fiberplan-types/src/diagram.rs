//! Diagram aggregate and its persistence records.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Connection, DiagramSettings, Node, NodeVariant, PortRef};

/// Ownership and timestamp metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramOwner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl DiagramOwner {
    pub fn new(user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A named fiber-distribution diagram: nodes, connections and settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub id: String,

    pub name: String,

    /// Nodes in insertion order
    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub connections: Vec<Connection>,

    #[serde(default)]
    pub settings: DiagramSettings,

    pub owner: DiagramOwner,
}

impl Diagram {
    /// Create an empty diagram
    pub fn new(id: impl Into<String>, name: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
            settings: DiagramSettings::default(),
            owner: DiagramOwner::new(user_id),
        }
    }

    /// Get a node by ID
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Add a node to the diagram
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Remove a node and every connection touching it.
    ///
    /// Returns the removed connections, or `None` when the node does not exist.
    pub fn remove_node(&mut self, node_id: &str) -> Option<Vec<Connection>> {
        let index = self.nodes.iter().position(|n| n.id == node_id)?;
        self.nodes.remove(index);

        let (removed, kept): (Vec<Connection>, Vec<Connection>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.touches(node_id));
        self.connections = kept;
        Some(removed)
    }

    /// Nodes of one variant, in insertion order
    pub fn nodes_of(&self, variant: NodeVariant) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.variant() == variant)
    }

    /// Add a connection without validation
    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Remove a connection by ID
    pub fn remove_connection(&mut self, connection_id: &str) -> Option<Connection> {
        let index = self.connections.iter().position(|c| c.id == connection_id)?;
        Some(self.connections.remove(index))
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn connection_mut(&mut self, id: &str) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    /// Connections leaving a specific output port
    pub fn connections_from<'a>(&'a self, port: &'a PortRef) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| &c.from == port)
    }

    /// The connection feeding a specific input port, if any
    pub fn inbound(&self, port: &PortRef) -> Option<&Connection> {
        self.connections.iter().find(|c| &c.to == port)
    }

    /// Check whether a connection between these two ports already exists
    pub fn has_connection(&self, from: &PortRef, to: &PortRef) -> bool {
        self.connections.iter().any(|c| c.joins(from, to))
    }

    /// Connections touching a node at either end
    pub fn connections_of_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.touches(node_id))
    }

    /// Connections whose port index no longer exists on their node.
    ///
    /// These appear after a splitter type or floor count shrinks the port
    /// count; they are kept as-is and carry no power.
    pub fn orphaned_connections(&self) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| {
                let from_ok = self.node(&c.from.node_id).is_some_and(|n| n.has_port(&c.from));
                let to_ok = self.node(&c.to.node_id).is_some_and(|n| n.has_port(&c.to));
                !(from_ok && to_ok)
            })
            .collect()
    }

    /// Load from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Encode as a wire record with nodes, connections and settings as JSON text
    pub fn to_record(&self) -> Result<DiagramRecord, serde_json::Error> {
        Ok(DiagramRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            nodes: serde_json::to_string(&self.nodes)?,
            connections: serde_json::to_string(&self.connections)?,
            settings: serde_json::to_string(&self.settings)?,
            user_id: self.owner.user_id.clone(),
            created_at: self.owner.created_at,
            updated_at: self.owner.updated_at,
        })
    }

    /// Decode a wire record. Blank JSON fields decode to their empty defaults.
    pub fn from_record(record: &DiagramRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            nodes: parse_or_default(&record.nodes)?,
            connections: parse_or_default(&record.connections)?,
            settings: parse_or_default(&record.settings)?,
            owner: DiagramOwner {
                user_id: record.user_id.clone(),
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
        })
    }
}

fn parse_or_default<T: DeserializeOwned + Default>(text: &str) -> Result<T, serde_json::Error> {
    if text.trim().is_empty() {
        Ok(T::default())
    } else {
        serde_json::from_str(text)
    }
}

/// Diagram as exchanged with the remote store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramRecord {
    pub id: String,
    pub name: String,
    /// JSON array of nodes
    pub nodes: String,
    /// JSON array of connections
    pub connections: String,
    /// JSON settings object
    pub settings: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a stored diagram; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<String>,
}

impl DiagramPatch {
    /// Patch carrying the graph contents and settings of `record`
    pub fn contents(record: &DiagramRecord) -> Self {
        Self {
            name: None,
            nodes: Some(record.nodes.clone()),
            connections: Some(record.connections.clone()),
            settings: Some(record.settings.clone()),
        }
    }

    /// Patch that only renames
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.nodes.is_none() && self.connections.is_none() && self.settings.is_none()
    }

    /// Apply the present fields to a record
    pub fn apply_to(&self, record: &mut DiagramRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(nodes) = &self.nodes {
            record.nodes = nodes.clone();
        }
        if let Some(connections) = &self.connections {
            record.connections = connections.clone();
        }
        if let Some(settings) = &self.settings {
            record.settings = settings.clone();
        }
        record.updated_at = Utc::now();
    }
}
