//! Read-only inventory records used to seed diagram nodes.

use serde::{Deserialize, Serialize};

use crate::{Node, NodeKind, OltNode, OnuNode, Position};

/// OLT as listed by the inventory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOlt {
    pub id: String,
    pub name: String,
    pub ip_address: String,
    pub pon_port_count: usize,
}

/// ONU as listed by the inventory service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOnu {
    pub id: String,
    pub olt_id: String,
    pub pon_port: usize,
    #[serde(default)]
    pub description: String,
    pub mac_address: String,
    /// Distance reported by the OLT, in meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Last polled receive power in dBm
    #[serde(default)]
    pub rx_power: Option<f64>,
    #[serde(default)]
    pub is_online: bool,
}

impl CatalogOnu {
    /// Name shown on the node: the description, or the MAC when blank
    pub fn display_name(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.mac_address
        } else {
            &self.description
        }
    }
}

impl Node {
    /// OLT node pre-populated from a catalog entry
    pub fn from_catalog_olt(id: impl Into<String>, olt: &CatalogOlt) -> Self {
        Self::new(
            id,
            olt.name.clone(),
            Position::zero(),
            NodeKind::Olt(OltNode {
                pon_ports: olt.pon_port_count,
                tx_power: None,
                source_olt_id: Some(olt.id.clone()),
            }),
        )
    }

    /// ONU node linked to a catalog entry
    pub fn from_catalog_onu(id: impl Into<String>, onu: &CatalogOnu) -> Self {
        Self::new(
            id,
            onu.display_name().to_string(),
            Position::zero(),
            NodeKind::Onu(OnuNode {
                distance_m: onu.distance.unwrap_or(0.0),
                sensitivity: None,
                catalog_onu_id: Some(onu.id.clone()),
                online: onu.is_online,
            }),
        )
    }
}
