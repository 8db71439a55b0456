//! Canvas interaction state - selection, dragging and connection drawing.

use std::collections::HashSet;

use fiberplan_types::{Connection, Diagram, PortDirection, PortRef, Position};

use super::GraphState;
use crate::validator::ConnectionRejection;

/// Pointer distance within which a port counts as hit
pub const PORT_HIT_RADIUS: f32 = 8.0;

/// Connection being drawn from an anchor port
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConnection {
    pub anchor: PortRef,
    pub anchor_pos: Position,
    /// Preview endpoint following the pointer
    pub current_pos: Position,
}

/// What a metadata edit is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Node(String),
    Connection(String),
    Settings,
}

/// Current pointer interaction; exactly one is active
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Dragging {
        node_id: String,
        /// Pointer position relative to the node origin when the drag began
        grab_offset: Position,
    },
    Connecting(PendingConnection),
    Editing(EditTarget),
}

/// Element under the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    Port(PortRef),
    Node(String),
    Empty,
}

/// Find what lies under `pos`. Ports win over node bodies; among bodies the
/// last drawn (topmost) wins.
pub fn hit_test(diagram: &Diagram, pos: Position) -> Hit {
    let nearest_port = diagram
        .nodes
        .iter()
        .flat_map(|node| {
            node.ports().into_iter().map(move |port| {
                let anchor = node.port_anchor(port.direction, port.index);
                (anchor.distance(&pos), port)
            })
        })
        .filter(|(distance, _)| *distance <= PORT_HIT_RADIUS)
        .min_by(|a, b| a.0.total_cmp(&b.0));

    if let Some((_, port)) = nearest_port {
        return Hit::Port(port);
    }

    diagram
        .nodes
        .iter()
        .rev()
        .find(|node| node.contains(&pos))
        .map(|node| Hit::Node(node.id.clone()))
        .unwrap_or(Hit::Empty)
}

/// Result of a pointer event
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    None,
    Selected(String),
    DragStarted(String),
    Moved(String),
    ConnectionStarted(PortRef),
    Connected(Connection),
    Rejected(ConnectionRejection),
    Discarded,
}

impl PointerOutcome {
    /// Whether the diagram was changed by the event
    pub fn mutated(&self) -> bool {
        matches!(self, PointerOutcome::Moved(_) | PointerOutcome::Connected(_))
    }
}

/// State for managing canvas interaction
#[derive(Debug, Clone, Default)]
pub struct CanvasState {
    /// Selected node IDs
    pub selected_nodes: HashSet<String>,

    /// Selected connection IDs
    pub selected_connections: HashSet<String>,

    pub mode: InteractionMode,
}

impl CanvasState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_selection(&mut self) {
        self.selected_nodes.clear();
        self.selected_connections.clear();
    }

    /// Replace the selection with a single node
    pub fn select_node(&mut self, node_id: String) {
        self.clear_selection();
        self.selected_nodes.insert(node_id);
    }

    pub fn select_connection(&mut self, conn_id: String) {
        self.clear_selection();
        self.selected_connections.insert(conn_id);
    }

    pub fn is_node_selected(&self, node_id: &str) -> bool {
        self.selected_nodes.contains(node_id)
    }

    pub fn is_connection_selected(&self, conn_id: &str) -> bool {
        self.selected_connections.contains(conn_id)
    }

    pub fn pending_connection(&self) -> Option<&PendingConnection> {
        match &self.mode {
            InteractionMode::Connecting(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn dragging_node(&self) -> Option<&str> {
        match &self.mode {
            InteractionMode::Dragging { node_id, .. } => Some(node_id.as_str()),
            _ => None,
        }
    }

    /// Enter metadata editing; ends any drag or pending connection
    pub fn begin_editing(&mut self, target: EditTarget) {
        self.mode = InteractionMode::Editing(target);
    }

    pub fn end_editing(&mut self) {
        if matches!(self.mode, InteractionMode::Editing(_)) {
            self.mode = InteractionMode::Idle;
        }
    }

    /// Drop references to a deleted node
    pub fn forget_node(&mut self, node_id: &str, removed_connections: &[Connection]) {
        self.selected_nodes.remove(node_id);
        for connection in removed_connections {
            self.selected_connections.remove(&connection.id);
        }
        let stale = match &self.mode {
            InteractionMode::Dragging { node_id: dragged, .. } => dragged == node_id,
            InteractionMode::Connecting(pending) => pending.anchor.node_id == node_id,
            InteractionMode::Editing(EditTarget::Node(edited)) => edited == node_id,
            InteractionMode::Editing(EditTarget::Connection(edited)) => {
                removed_connections.iter().any(|c| &c.id == edited)
            }
            InteractionMode::Editing(EditTarget::Settings) | InteractionMode::Idle => false,
        };
        if stale {
            self.mode = InteractionMode::Idle;
        }
    }

    pub fn pointer_down(&mut self, diagram: &Diagram, pos: Position) -> PointerOutcome {
        self.end_editing();
        if self.mode != InteractionMode::Idle {
            return PointerOutcome::None;
        }

        match hit_test(diagram, pos) {
            Hit::Port(port) => {
                let anchor_pos = diagram
                    .node(&port.node_id)
                    .map(|n| n.port_anchor(port.direction, port.index))
                    .unwrap_or(pos);
                self.mode = InteractionMode::Connecting(PendingConnection {
                    anchor: port.clone(),
                    anchor_pos,
                    current_pos: pos,
                });
                PointerOutcome::ConnectionStarted(port)
            }
            Hit::Node(node_id) => {
                let origin = diagram.node(&node_id).map(|n| n.position).unwrap_or(pos);
                self.select_node(node_id.clone());
                self.mode = InteractionMode::Dragging {
                    node_id: node_id.clone(),
                    grab_offset: Position::new(pos.x - origin.x, pos.y - origin.y),
                };
                PointerOutcome::DragStarted(node_id)
            }
            Hit::Empty => {
                self.clear_selection();
                PointerOutcome::None
            }
        }
    }

    pub fn pointer_move(&mut self, diagram: &mut Diagram, pos: Position) -> PointerOutcome {
        match &mut self.mode {
            InteractionMode::Dragging { node_id, grab_offset } => {
                let target = Position::new(pos.x - grab_offset.x, pos.y - grab_offset.y);
                if GraphState::move_node(diagram, node_id, target) {
                    PointerOutcome::Moved(node_id.clone())
                } else {
                    self.mode = InteractionMode::Idle;
                    PointerOutcome::None
                }
            }
            InteractionMode::Connecting(pending) => {
                pending.current_pos = pos;
                PointerOutcome::None
            }
            InteractionMode::Idle | InteractionMode::Editing(_) => PointerOutcome::None,
        }
    }

    pub fn pointer_up(&mut self, diagram: &mut Diagram, pos: Position) -> PointerOutcome {
        match std::mem::take(&mut self.mode) {
            InteractionMode::Dragging { node_id, .. } => PointerOutcome::Selected(node_id),
            InteractionMode::Connecting(pending) => {
                let Hit::Port(target) = hit_test(diagram, pos) else {
                    return PointerOutcome::Discarded;
                };
                let (from, to) = orient(pending.anchor, target);
                match GraphState::connect(diagram, from, to) {
                    Ok(connection) => PointerOutcome::Connected(connection),
                    Err(rejection) => PointerOutcome::Rejected(rejection),
                }
            }
            editing @ InteractionMode::Editing(_) => {
                self.mode = editing;
                PointerOutcome::None
            }
            InteractionMode::Idle => PointerOutcome::None,
        }
    }

    /// Return to idle without committing anything
    pub fn cancel(&mut self) {
        self.mode = InteractionMode::Idle;
    }

    pub fn reset(&mut self) {
        self.clear_selection();
        self.mode = InteractionMode::Idle;
    }
}

/// Order two ports output-first so drawing from either end works
fn orient(anchor: PortRef, target: PortRef) -> (PortRef, PortRef) {
    match (anchor.direction, target.direction) {
        (PortDirection::Input, PortDirection::Output) => (target, anchor),
        _ => (anchor, target),
    }
}
