//! FiberPlan engine: connection rules, power budget, diagram store and
//! interaction state

pub mod config;
pub mod layout;
pub mod power;
pub mod samples;
pub mod state;
pub mod store;
pub mod validator;

// Re-export commonly used items
pub use config::{ConfigError, EngineConfig, StoreConfig};
pub use power::{classify, compute_power, BudgetReport, LinkStatus, OnuBudget, PowerMap};
pub use samples::{list_samples, load_sample};
pub use state::AppState;
pub use store::{DiagramApi, DiagramStore, FallbackCache, FileCache, InMemoryDiagramApi, MemoryCache};
pub use validator::{can_connect, try_connect, ConnectionRejection};
