//! Splitter types and their insertion-loss characteristics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Splitter construction category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SplitterCategory {
    /// Planar lightwave circuit, uniform loss on every output
    Plc,
    /// Fused biconic taper, per-output (usually asymmetric) loss
    Fbt,
}

impl SplitterCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitterCategory::Plc => "PLC",
            SplitterCategory::Fbt => "FBT",
        }
    }
}

impl fmt::Display for SplitterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Insertion loss of a splitter, in dB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SplitterLoss {
    /// Same loss on every output port
    Uniform(f64),
    /// Loss per output port, indexed by port
    PerPort(Vec<f64>),
}

impl SplitterLoss {
    /// Loss applied to the given output port.
    ///
    /// Per-port tables fall back to the first entry when `index` is past the
    /// end, and to zero when the table is empty.
    pub fn for_port(&self, index: usize) -> f64 {
        match self {
            SplitterLoss::Uniform(loss) => *loss,
            SplitterLoss::PerPort(losses) => losses
                .get(index)
                .or_else(|| losses.first())
                .copied()
                .unwrap_or(0.0),
        }
    }
}

/// One entry of the splitter catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitterSpec {
    /// Catalog key (e.g., "1:8", "30/70")
    pub key: String,

    pub category: SplitterCategory,

    /// Number of output ports
    pub output_ports: usize,

    pub loss: SplitterLoss,
}

impl SplitterSpec {
    /// PLC splitter with `outputs` ports and the same loss on each
    pub fn plc(key: &str, outputs: usize, loss: f64) -> Self {
        Self {
            key: key.to_string(),
            category: SplitterCategory::Plc,
            output_ports: outputs,
            loss: SplitterLoss::Uniform(loss),
        }
    }

    /// FBT splitter with one output port per entry in `losses`
    pub fn fbt(key: &str, losses: &[f64]) -> Self {
        Self {
            key: key.to_string(),
            category: SplitterCategory::Fbt,
            output_ports: losses.len(),
            loss: SplitterLoss::PerPort(losses.to_vec()),
        }
    }
}

/// Catalog of splitter types keyed by [`SplitterSpec::key`]
#[derive(Debug, Clone, PartialEq)]
pub struct LossTables {
    specs: Vec<SplitterSpec>,
}

impl LossTables {
    /// Key used for new splitter nodes
    pub const DEFAULT_KEY: &'static str = "1:8";

    /// Standard PLC and FBT splitter catalog
    pub fn standard() -> Self {
        Self {
            specs: vec![
                // PLC
                SplitterSpec::plc("1:2", 2, 3.7),
                SplitterSpec::plc("1:4", 4, 7.3),
                SplitterSpec::plc("1:8", 8, 10.5),
                SplitterSpec::plc("1:16", 16, 13.7),
                SplitterSpec::plc("1:32", 32, 17.1),
                // FBT, port 0 is the smaller tap
                SplitterSpec::fbt("50/50", &[3.6, 3.6]),
                SplitterSpec::fbt("30/70", &[5.2, 1.5]),
                SplitterSpec::fbt("20/80", &[7.0, 1.0]),
                SplitterSpec::fbt("10/90", &[10.0, 0.5]),
            ],
        }
    }

    /// Build a catalog from custom entries
    pub fn from_specs(specs: Vec<SplitterSpec>) -> Self {
        Self { specs }
    }

    /// Get a splitter type by key
    pub fn get(&self, key: &str) -> Option<&SplitterSpec> {
        self.specs.iter().find(|s| s.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SplitterSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for LossTables {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_table_port_counts() {
        let tables = LossTables::standard();
        assert_eq!(tables.get("1:2").unwrap().output_ports, 2);
        assert_eq!(tables.get("1:32").unwrap().output_ports, 32);
        assert_eq!(tables.get("10/90").unwrap().output_ports, 2);
        assert!(tables.get("1:64").is_none());
    }

    #[test]
    fn test_fbt_entries_are_asymmetric() {
        let tables = LossTables::standard();
        for key in ["30/70", "20/80", "10/90"] {
            let spec = tables.get(key).unwrap();
            assert_eq!(spec.category, SplitterCategory::Fbt);
            assert!(spec.loss.for_port(0) > spec.loss.for_port(1), "{key}");
        }
    }

    #[test]
    fn test_per_port_loss_falls_back_to_first_entry() {
        let loss = SplitterLoss::PerPort(vec![5.2, 1.5]);
        assert_relative_eq!(loss.for_port(0), 5.2);
        assert_relative_eq!(loss.for_port(1), 1.5);
        assert_relative_eq!(loss.for_port(7), 5.2);
        assert_relative_eq!(SplitterLoss::PerPort(vec![]).for_port(3), 0.0);
    }

    #[test]
    fn test_loss_serializes_with_variant_key() {
        let json = serde_json::to_string(&SplitterLoss::Uniform(10.5)).unwrap();
        assert_eq!(json, r#"{"uniform":10.5}"#);
        let json = serde_json::to_string(&SplitterLoss::PerPort(vec![5.2, 1.5])).unwrap();
        assert_eq!(json, r#"{"perPort":[5.2,1.5]}"#);
    }
}
