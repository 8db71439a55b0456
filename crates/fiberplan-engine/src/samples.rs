//! Sample fiber plants.
//!
//! Pre-built diagrams used by the CLI `sample` command and as fixtures.

use fiberplan_types::{Connection, Diagram, Node, PortRef, Position, SplitterSpec};

/// Connection with explicit cable length and connector count
fn cable(id: &str, from: PortRef, to: PortRef, length_m: f64, connectors: u32) -> Connection {
    Connection::new(id, from, to).with_cable(length_m, connectors)
}

/// Single feeder through a 1:8 PLC splitter to one ONU.
///
/// ```text
/// OLT (5 dBm) --500 m, 2 conn--> 1:8 PLC --200 m, 2 conn--> ONU (-28 dBm)
/// ```
///
/// Expected ONU receive power is -7.745 dBm, a margin of 20.255 dB.
pub fn worked_example() -> Diagram {
    let mut diagram = Diagram::new("sample-worked", "Worked example", None);

    diagram.add_node(Node::olt("olt-1", "OLT Central", 1).at(Position::new(50.0, 50.0)));
    diagram.add_node(
        Node::splitter("splitter-1", "Splitter 1:8", &SplitterSpec::plc("1:8", 8, 10.5))
            .at(Position::new(300.0, 50.0)),
    );
    diagram.add_node(Node::onu("onu-1", "ONU 1").at(Position::new(550.0, 50.0)));

    diagram.add_connection(cable(
        "conn-a",
        PortRef::output("olt-1", 0),
        PortRef::input("splitter-1", 0),
        500.0,
        2,
    ));
    diagram.add_connection(cable(
        "conn-b",
        PortRef::output("splitter-1", 0),
        PortRef::input("onu-1", 0),
        200.0,
        2,
    ));

    diagram
}

/// Asymmetric 30/70 tap feeding a nearby ONU and a 1:8 PLC cascade.
///
/// ```text
///                      +--5.2 dB--> ONU near tap
/// OLT --> FBT 30/70 ---+
///                      +--1.5 dB--> 1:8 PLC --> ONU 2, ONU 3
/// ```
pub fn fbt_cascade() -> Diagram {
    let mut diagram = Diagram::new("sample-fbt", "FBT cascade", None);

    diagram.add_node(Node::olt("olt-1", "OLT Central", 2).at(Position::new(50.0, 50.0)));
    diagram.add_node(
        Node::splitter("splitter-1", "Tap 30/70", &SplitterSpec::fbt("30/70", &[5.2, 1.5]))
            .at(Position::new(300.0, 50.0)),
    );
    diagram.add_node(
        Node::splitter("splitter-2", "Splitter 1:8", &SplitterSpec::plc("1:8", 8, 10.5))
            .at(Position::new(300.0, 260.0)),
    );
    diagram.add_node(Node::onu("onu-1", "ONU near tap").at(Position::new(550.0, 50.0)));
    diagram.add_node(Node::onu("onu-2", "ONU 2").at(Position::new(550.0, 260.0)));
    diagram.add_node(Node::onu("onu-3", "ONU 3").at(Position::new(550.0, 350.0)));

    diagram.add_connection(cable(
        "conn-1",
        PortRef::output("olt-1", 0),
        PortRef::input("splitter-1", 0),
        300.0,
        2,
    ));
    diagram.add_connection(cable(
        "conn-2",
        PortRef::output("splitter-1", 0),
        PortRef::input("onu-1", 0),
        150.0,
        2,
    ));
    diagram.add_connection(cable(
        "conn-3",
        PortRef::output("splitter-1", 1),
        PortRef::input("splitter-2", 0),
        800.0,
        2,
    ));
    diagram.add_connection(cable(
        "conn-4",
        PortRef::output("splitter-2", 0),
        PortRef::input("onu-2", 0),
        400.0,
        2,
    ));
    diagram.add_connection(cable(
        "conn-5",
        PortRef::output("splitter-2", 1),
        PortRef::input("onu-3", 0),
        1200.0,
        4,
    ));

    diagram
}

/// The worked example extended past the ONU to a switch and a building
pub fn building_drop() -> Diagram {
    let mut diagram = worked_example();
    diagram.id = "sample-building".to_string();
    diagram.name = "Building drop".to_string();

    diagram.add_node(Node::switch("switch-1", "Switch", 8).at(Position::new(800.0, 50.0)));
    diagram.add_node(Node::building("building-1", "Tower A", 3).at(Position::new(1050.0, 50.0)));

    diagram.add_connection(Connection::new(
        "conn-c",
        PortRef::output("onu-1", 0),
        PortRef::input("switch-1", 0),
    ));
    for floor in 0..3 {
        diagram.add_connection(Connection::new(
            format!("conn-floor-{}", floor + 1),
            PortRef::output("switch-1", floor),
            PortRef::input("building-1", floor),
        ));
    }

    diagram
}

/// Get list of available samples
pub fn list_samples() -> Vec<(&'static str, &'static str)> {
    vec![
        ("worked", "Worked example (1:8 PLC, one ONU)"),
        ("fbt", "FBT cascade (30/70 tap into 1:8 PLC)"),
        ("building", "Building drop (ONU, switch, three floors)"),
    ]
}

/// Load a sample by name
pub fn load_sample(name: &str) -> Option<Diagram> {
    match name {
        "worked" => Some(worked_example()),
        "fbt" => Some(fbt_cascade()),
        "building" => Some(building_drop()),
        _ => None,
    }
}
