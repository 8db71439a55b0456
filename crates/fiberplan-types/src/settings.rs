//! Diagram settings and loss model coefficients.

use serde::{Deserialize, Serialize};

/// Per-diagram power settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramSettings {
    /// OLT transmit power in dBm, used by OLTs without an override
    pub olt_tx_power: f64,

    /// ONU receiver sensitivity in dBm, used by ONUs without an override
    pub onu_sensitivity: f64,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            olt_tx_power: 5.0,
            onu_sensitivity: -28.0,
        }
    }
}

/// Linear loss coefficients for cables and connectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossModel {
    /// Fiber attenuation in dB per kilometer
    pub fiber_loss_per_km: f64,

    /// Loss per connector in dB
    pub connector_loss_db: f64,
}

impl LossModel {
    /// Total loss of a cable of `length_m` meters with `connectors` connectors
    pub fn cable_loss_db(&self, length_m: f64, connectors: u32) -> f64 {
        (length_m / 1000.0) * self.fiber_loss_per_km + connectors as f64 * self.connector_loss_db
    }
}

impl Default for LossModel {
    fn default() -> Self {
        Self {
            fiber_loss_per_km: 0.35,
            connector_loss_db: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_cable_loss() {
        let model = LossModel::default();
        assert_relative_eq!(model.cable_loss_db(500.0, 2), 1.175, epsilon = 1e-9);
        assert_relative_eq!(model.cable_loss_db(200.0, 2), 1.07, epsilon = 1e-9);
        assert_relative_eq!(model.cable_loss_db(0.0, 0), 0.0);
    }

    #[test]
    fn test_loss_model_partial_json_uses_defaults() {
        let model: LossModel = serde_json::from_str(r#"{"fiber_loss_per_km": 0.25}"#).unwrap();
        assert_relative_eq!(model.fiber_loss_per_km, 0.25);
        assert_relative_eq!(model.connector_loss_db, 0.5);
    }
}
