//! Shared types for FiberPlan fiber-distribution diagrams.
//!
//! This crate defines the core data structures used across all FiberPlan components:
//! - Node variants (OLT, splitter, ONU, switch, building) and their properties
//! - Derived ports and directed connections between them
//! - Splitter insertion-loss tables
//! - Diagram aggregates, per-diagram settings and their wire records
//! - Read-only catalog records supplied by the inventory collaborator

mod catalog;
mod connection;
mod diagram;
mod node;
mod port;
mod settings;
mod splitter;

pub use catalog::*;
pub use connection::*;
pub use diagram::*;
pub use node::*;
pub use port::*;
pub use settings::*;
pub use splitter::*;

/// Grid size for snapping positions (in pixels)
pub const GRID_SIZE: f32 = 10.0;

/// Port spacing (2 grid units)
pub const PORT_SPACING: f32 = 20.0;

/// Base node width
pub const NODE_BASE_WIDTH: f32 = 120.0;

/// Base node height
pub const NODE_BASE_HEIGHT: f32 = 60.0;

/// Snap a value to the grid
pub fn snap_to_grid(value: f32) -> f32 {
    (value / GRID_SIZE).round() * GRID_SIZE
}
