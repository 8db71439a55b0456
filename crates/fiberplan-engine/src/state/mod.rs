//! Application state management.

mod app_state;
mod canvas_state;
mod graph_state;


pub use app_state::*;
pub use canvas_state::*;
pub use graph_state::*;
