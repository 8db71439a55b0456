//! Connection rules between node ports.
//!
//! A connection always runs from an output port to an input port, and only
//! these variant pairings carry a signal:
//!
//! ```text
//! OLT      output -> Splitter input
//! Splitter output -> Splitter input | ONU input
//! ONU      output -> Switch input
//! Switch   output -> Building input (one per floor)
//! ```
//!
//! An input port accepts at most one inbound connection; output ports fan out
//! freely.

use fiberplan_types::{Connection, Diagram, NodeVariant, PortRef};
use thiserror::Error;

/// Reason a proposed connection was not created
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionRejection {
    #[error("Node {0} does not exist")]
    UnknownNode(String),

    #[error("Port {0} does not exist")]
    PortOutOfRange(PortRef),

    #[error("Connections must run from an output port to an input port")]
    WrongDirection,

    #[error("{from} output cannot feed a {to} input")]
    InvalidPairing { from: NodeVariant, to: NodeVariant },

    #[error("Connection {from} -> {to} already exists")]
    Duplicate { from: PortRef, to: PortRef },

    #[error("Input {0} already has an inbound connection")]
    InputOccupied(PortRef),
}

/// Check whether an output of `from` may feed an input of `to`
pub fn is_valid_pairing(from: NodeVariant, to: NodeVariant) -> bool {
    use NodeVariant::*;
    match from {
        Olt => matches!(to, Splitter),
        Splitter => matches!(to, Splitter | Onu),
        Onu => matches!(to, Switch),
        Switch => matches!(to, Building),
        Building => false,
    }
}

/// Run every rule against a proposed connection
pub fn check(diagram: &Diagram, from: &PortRef, to: &PortRef) -> Result<(), ConnectionRejection> {
    if !from.is_output() || !to.is_input() {
        return Err(ConnectionRejection::WrongDirection);
    }

    let source = diagram
        .node(&from.node_id)
        .ok_or_else(|| ConnectionRejection::UnknownNode(from.node_id.clone()))?;
    let target = diagram
        .node(&to.node_id)
        .ok_or_else(|| ConnectionRejection::UnknownNode(to.node_id.clone()))?;

    if !source.has_port(from) {
        return Err(ConnectionRejection::PortOutOfRange(from.clone()));
    }
    if !target.has_port(to) {
        return Err(ConnectionRejection::PortOutOfRange(to.clone()));
    }

    if !is_valid_pairing(source.variant(), target.variant()) {
        return Err(ConnectionRejection::InvalidPairing {
            from: source.variant(),
            to: target.variant(),
        });
    }

    if diagram.has_connection(from, to) {
        return Err(ConnectionRejection::Duplicate {
            from: from.clone(),
            to: to.clone(),
        });
    }

    if diagram.inbound(to).is_some() {
        return Err(ConnectionRejection::InputOccupied(to.clone()));
    }

    Ok(())
}

/// Check whether a connection between two ports would be accepted
pub fn can_connect(diagram: &Diagram, from: &PortRef, to: &PortRef) -> bool {
    check(diagram, from, to).is_ok()
}

/// Create the connection if every rule passes.
///
/// Rejections leave the diagram untouched.
pub fn try_connect(
    diagram: &mut Diagram,
    id: impl Into<String>,
    from: PortRef,
    to: PortRef,
) -> Result<Connection, ConnectionRejection> {
    if let Err(rejection) = check(diagram, &from, &to) {
        log::debug!("Connection {} -> {} rejected: {}", from, to, rejection);
        return Err(rejection);
    }

    let connection = Connection::new(id, from, to);
    diagram.add_connection(connection.clone());
    Ok(connection)
}

/// A stored connection that breaks a rule
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionIssue {
    pub connection_id: String,
    pub rejection: ConnectionRejection,
}

/// Re-check every stored connection, in order, as if it were being drawn.
///
/// Diagrams loaded from storage bypass the validator, so this reports what
/// the canvas would have refused.
pub fn audit(diagram: &Diagram) -> Vec<ConnectionIssue> {
    let mut replay = Diagram {
        connections: Vec::with_capacity(diagram.connections.len()),
        ..diagram.clone()
    };
    let mut issues = Vec::new();

    for connection in &diagram.connections {
        match check(&replay, &connection.from, &connection.to) {
            Ok(()) => replay.add_connection(connection.clone()),
            Err(rejection) => issues.push(ConnectionIssue {
                connection_id: connection.id.clone(),
                rejection,
            }),
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiberplan_types::{LossTables, Node};

    fn plant() -> Diagram {
        let tables = LossTables::standard();
        let mut diagram = Diagram::new("d", "Test", None);
        diagram.add_node(Node::olt("olt", "OLT", 2));
        diagram.add_node(Node::splitter("sp", "Splitter", tables.get("1:4").unwrap()));
        diagram.add_node(Node::onu("onu", "ONU"));
        diagram
    }

    #[test]
    fn test_pairing_table() {
        use NodeVariant::*;
        let valid = [
            (Olt, Splitter),
            (Splitter, Splitter),
            (Splitter, Onu),
            (Onu, Switch),
            (Switch, Building),
        ];
        for from in NodeVariant::ALL {
            for to in NodeVariant::ALL {
                assert_eq!(
                    is_valid_pairing(from, to),
                    valid.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_direction_is_checked_first() {
        let diagram = plant();
        let result = check(&diagram, &PortRef::input("sp", 0), &PortRef::output("olt", 0));
        assert_eq!(result, Err(ConnectionRejection::WrongDirection));
    }

    #[test]
    fn test_out_of_range_port() {
        let diagram = plant();
        let result = check(&diagram, &PortRef::output("olt", 5), &PortRef::input("sp", 0));
        assert_eq!(result, Err(ConnectionRejection::PortOutOfRange(PortRef::output("olt", 5))));
    }

    #[test]
    fn test_duplicate_reported_before_occupied() {
        let mut diagram = plant();
        try_connect(&mut diagram, "c1", PortRef::output("olt", 0), PortRef::input("sp", 0)).unwrap();

        let again = try_connect(&mut diagram, "c2", PortRef::output("olt", 0), PortRef::input("sp", 0));
        assert!(matches!(again, Err(ConnectionRejection::Duplicate { .. })));

        let other = try_connect(&mut diagram, "c3", PortRef::output("olt", 1), PortRef::input("sp", 0));
        assert_eq!(other, Err(ConnectionRejection::InputOccupied(PortRef::input("sp", 0))));
        assert_eq!(diagram.connections.len(), 1);
    }

    #[test]
    fn test_audit_flags_second_inbound() {
        let mut diagram = plant();
        diagram.add_connection(Connection::new("a", PortRef::output("olt", 0), PortRef::input("sp", 0)));
        diagram.add_connection(Connection::new("b", PortRef::output("olt", 1), PortRef::input("sp", 0)));
        diagram.add_connection(Connection::new("c", PortRef::output("olt", 0), PortRef::input("onu", 0)));

        let issues = audit(&diagram);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].connection_id, "b");
        assert!(matches!(issues[1].rejection, ConnectionRejection::InvalidPairing { .. }));
    }
}
