//! Optical power budget.
//!
//! Power is derived, never stored: [`compute_power`] walks the diagram
//! breadth-first from every OLT output and records the expected level at each
//! port it reaches. Each cable costs
//! `length_km * fiber_loss_per_km + connectors * connector_loss_db`, each
//! splitter output costs its insertion loss, and the walk stops at ONUs.

use std::collections::{HashMap, HashSet, VecDeque};

use fiberplan_types::{
    CatalogOnu, Connection, Diagram, LossModel, LossTables, Node, NodeKind, PortRef, SplitterLoss,
};
use serde::Serialize;

/// Minimum margin over sensitivity for a link to count as healthy, in dB
pub const GOOD_MARGIN_DB: f64 = 3.0;

/// Health of a received power level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkStatus {
    Good,
    Marginal,
    Fail,
    Unknown,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Good => "GOOD",
            LinkStatus::Marginal => "MARGINAL",
            LinkStatus::Fail => "FAIL",
            LinkStatus::Unknown => "UNKNOWN",
        }
    }

    /// Link color on the canvas
    pub fn color(&self) -> &'static str {
        match self {
            LinkStatus::Good => "#22c55e",
            LinkStatus::Marginal => "#eab308",
            LinkStatus::Fail => "#ef4444",
            LinkStatus::Unknown => "#969696",
        }
    }
}

/// Classify a power level against a receiver sensitivity
pub fn classify(power: Option<f64>, sensitivity: f64) -> LinkStatus {
    let Some(power) = power else {
        return LinkStatus::Unknown;
    };
    let margin = power - sensitivity;
    if margin >= GOOD_MARGIN_DB {
        LinkStatus::Good
    } else if margin >= 0.0 {
        LinkStatus::Marginal
    } else {
        LinkStatus::Fail
    }
}

/// Loss across one cable, in dB
pub fn link_loss_db(connection: &Connection, model: &LossModel) -> f64 {
    model.cable_loss_db(connection.cable_length, connection.connector_count)
}

/// Computed power levels keyed by port
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerMap {
    levels: HashMap<PortRef, f64>,

    /// Connections skipped because their target was already reached
    skipped: Vec<String>,
}

impl PowerMap {
    /// Power at a port, in dBm
    pub fn get(&self, port: &PortRef) -> Option<f64> {
        self.levels.get(port).copied()
    }

    /// Power arriving at a node's first input
    pub fn input_power(&self, node_id: &str) -> Option<f64> {
        self.get(&PortRef::input(node_id, 0))
    }

    pub fn output_power(&self, node_id: &str, index: usize) -> Option<f64> {
        self.get(&PortRef::output(node_id, index))
    }

    /// Power arriving at the target end of a connection
    pub fn at_target(&self, connection: &Connection) -> Option<f64> {
        self.get(&connection.to)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PortRef, f64)> {
        self.levels.iter().map(|(port, level)| (port, *level))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Connections the walk refused to follow because they would revisit a port
    pub fn skipped_connections(&self) -> &[String] {
        &self.skipped
    }
}

fn splitter_loss<'a>(tables: &'a LossTables, splitter_type: &str, stored: &'a SplitterLoss) -> &'a SplitterLoss {
    tables.get(splitter_type).map(|spec| &spec.loss).unwrap_or(stored)
}

/// Compute power at every port reachable from an OLT.
///
/// Splitter losses come from `tables` by type key, falling back to the loss
/// stored on the node for keys the table does not know. Each connection is
/// followed at most once and each input keeps the first level that reaches
/// it, so cyclic or doubly-fed diagrams still terminate.
pub fn compute_power(diagram: &Diagram, tables: &LossTables, model: &LossModel) -> PowerMap {
    let mut power = PowerMap::default();
    let mut queue: VecDeque<(PortRef, f64)> = VecDeque::new();

    for node in &diagram.nodes {
        if let NodeKind::Olt(olt) = &node.kind {
            let tx = olt.tx_power.unwrap_or(diagram.settings.olt_tx_power);
            for index in 0..olt.pon_ports {
                let port = PortRef::output(&node.id, index);
                power.levels.insert(port.clone(), tx);
                queue.push_back((port, tx));
            }
        }
    }

    let mut outgoing: HashMap<&PortRef, Vec<usize>> = HashMap::new();
    for (index, connection) in diagram.connections.iter().enumerate() {
        outgoing.entry(&connection.from).or_default().push(index);
    }
    let mut visited: HashSet<usize> = HashSet::new();

    while let Some((port, level)) = queue.pop_front() {
        let Some(indices) = outgoing.get(&port) else {
            continue;
        };
        for &index in indices {
            let connection = &diagram.connections[index];
            if !visited.insert(index) {
                continue;
            }

            let Some(target) = diagram.node(&connection.to.node_id) else {
                continue;
            };
            if !target.has_port(&connection.to) {
                continue;
            }
            if power.levels.contains_key(&connection.to) {
                power.skipped.push(connection.id.clone());
                continue;
            }

            let at_input = level - link_loss_db(connection, model);
            power.levels.insert(connection.to.clone(), at_input);

            match &target.kind {
                NodeKind::Splitter(splitter) => {
                    let loss = splitter_loss(tables, &splitter.splitter_type, &splitter.loss);
                    for out in 0..splitter.output_ports {
                        let out_port = PortRef::output(&target.id, out);
                        let out_level = at_input - loss.for_port(out);
                        power.levels.insert(out_port.clone(), out_level);
                        queue.push_back((out_port, out_level));
                    }
                }
                // ONUs terminate the optical path
                NodeKind::Onu(_) => {}
                NodeKind::Olt(_) | NodeKind::Switch(_) | NodeKind::Building(_) => {}
            }
        }
    }

    if !power.skipped.is_empty() {
        log::debug!(
            "Power walk on {} skipped {} connection(s) into already-reached ports",
            diagram.id,
            power.skipped.len()
        );
    }

    power
}

/// Sensitivity that applies to a node: its own override for ONUs, otherwise
/// the diagram default
pub fn effective_sensitivity(diagram: &Diagram, node: &Node) -> f64 {
    node.as_onu()
        .and_then(|onu| onu.sensitivity)
        .unwrap_or(diagram.settings.onu_sensitivity)
}

/// Status of one connection, for link coloring.
///
/// The level at the connection's target is classified against the target's
/// sensitivity.
pub fn connection_status(diagram: &Diagram, power: &PowerMap, connection: &Connection) -> LinkStatus {
    let sensitivity = diagram
        .node(&connection.to.node_id)
        .map(|node| effective_sensitivity(diagram, node))
        .unwrap_or(diagram.settings.onu_sensitivity);
    classify(power.at_target(connection), sensitivity)
}

/// Budget line for one ONU
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnuBudget {
    pub onu_id: String,
    pub name: String,
    /// Estimated receive power, dBm
    pub rx_power: Option<f64>,
    pub sensitivity: f64,
    pub margin: Option<f64>,
    pub status: LinkStatus,
    /// Last polled receive power of the linked catalog ONU
    pub live_rx_power: Option<f64>,
    /// Live minus estimated, dB
    pub deviation: Option<f64>,
}

/// Power budget of a whole diagram
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BudgetReport {
    pub onus: Vec<OnuBudget>,
    /// Status per connection ID
    pub links: HashMap<String, LinkStatus>,
}

impl BudgetReport {
    /// Build the report from computed power, matching ONUs to catalog entries
    /// for live readings
    pub fn build(diagram: &Diagram, power: &PowerMap, catalog: &[CatalogOnu]) -> Self {
        let onus = diagram
            .nodes
            .iter()
            .filter_map(|node| {
                let onu = node.as_onu()?;
                let rx_power = power.input_power(&node.id);
                let sensitivity = effective_sensitivity(diagram, node);
                let live_rx_power = onu
                    .catalog_onu_id
                    .as_deref()
                    .and_then(|id| catalog.iter().find(|c| c.id == id))
                    .and_then(|c| c.rx_power);
                Some(OnuBudget {
                    onu_id: node.id.clone(),
                    name: node.name.clone(),
                    rx_power,
                    sensitivity,
                    margin: rx_power.map(|rx| rx - sensitivity),
                    status: classify(rx_power, sensitivity),
                    live_rx_power,
                    deviation: live_rx_power.zip(rx_power).map(|(live, est)| live - est),
                })
            })
            .collect();

        let links = diagram
            .connections
            .iter()
            .map(|c| (c.id.clone(), connection_status(diagram, power, c)))
            .collect();

        Self { onus, links }
    }

    pub fn onu(&self, onu_id: &str) -> Option<&OnuBudget> {
        self.onus.iter().find(|o| o.onu_id == onu_id)
    }

    /// Number of ONUs with the given status
    pub fn count(&self, status: LinkStatus) -> usize {
        self.onus.iter().filter(|o| o.status == status).count()
    }
}
