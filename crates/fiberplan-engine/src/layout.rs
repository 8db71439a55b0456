//! Default placement for newly added nodes.
//!
//! Each variant has its own column, left to right in signal order. A new node
//! goes below the lowest node of the same variant, so repeated additions stack
//! instead of overlapping. This is a placement heuristic, not a packing
//! algorithm: nodes the user dragged into a column are not avoided.

use fiberplan_types::{snap_to_grid, Diagram, NodeVariant, Position};

/// Left margin of the first column
const LEFT_MARGIN: f32 = 50.0;

/// Top margin of every column
const TOP_MARGIN: f32 = 50.0;

/// Horizontal distance between columns
const COLUMN_SPACING: f32 = 250.0;

/// Vertical gap between stacked nodes
const ROW_GAP: f32 = 30.0;

/// Column index of a variant, in signal order
fn column(variant: NodeVariant) -> usize {
    match variant {
        NodeVariant::Olt => 0,
        NodeVariant::Splitter => 1,
        NodeVariant::Onu => 2,
        NodeVariant::Switch => 3,
        NodeVariant::Building => 4,
    }
}

/// Position for the next node of `variant`
pub fn next_position(diagram: &Diagram, variant: NodeVariant) -> Position {
    let x = LEFT_MARGIN + column(variant) as f32 * COLUMN_SPACING;
    let y = diagram
        .nodes_of(variant)
        .map(|n| n.position.y + n.size.height + ROW_GAP)
        .fold(TOP_MARGIN, f32::max);
    Position::new(snap_to_grid(x), snap_to_grid(y))
}
