//! Main application state combining the store, graph editing and canvas.

use std::time::Instant;

use fiberplan_types::{CatalogOnu, Connection, Diagram, LossModel, LossTables, PortRef, Position};
use thiserror::Error;

use super::{
    CanvasState, ConnectionEdit, EditError, EditTarget, GraphState, NewNode, NodeEdit, PointerOutcome,
    SettingsEdit,
};
use crate::power::{self, BudgetReport, LinkStatus, PowerMap};
use crate::store::{DiagramApi, DiagramStore, FallbackCache, StoreResult};
use crate::validator::ConnectionRejection;

/// Errors from editing operations on the active diagram
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("No diagram is open")]
    NoActiveDiagram,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("Connection rejected: {0}")]
    Rejected(#[from] ConnectionRejection),
}

/// Unified application state.
///
/// Every successful mutation recomputes the power map and schedules an
/// autosave of the active diagram.
pub struct AppState<A: DiagramApi, C: FallbackCache> {
    pub store: DiagramStore<A, C>,

    /// Graph editing rules and loss tables
    pub graph_state: GraphState,

    /// Selection and pointer interaction
    pub canvas_state: CanvasState,

    /// Live ONU readings from the inventory collaborator
    pub catalog_onus: Vec<CatalogOnu>,

    loss_model: LossModel,

    power: PowerMap,
}

impl<A: DiagramApi, C: FallbackCache> AppState<A, C> {
    pub fn new(store: DiagramStore<A, C>, tables: LossTables, loss_model: LossModel) -> Self {
        let mut state = Self {
            store,
            graph_state: GraphState::with_tables(tables),
            canvas_state: CanvasState::new(),
            catalog_onus: Vec::new(),
            loss_model,
            power: PowerMap::default(),
        };
        state.recompute();
        state
    }

    /// Load diagrams and compute power for the active one
    pub async fn bootstrap(&mut self) -> StoreResult<()> {
        let result = self.store.bootstrap().await;
        self.canvas_state.reset();
        self.recompute();
        result
    }

    pub fn diagram(&self) -> Option<&Diagram> {
        self.store.active()
    }

    pub fn power(&self) -> &PowerMap {
        &self.power
    }

    pub fn loss_model(&self) -> &LossModel {
        &self.loss_model
    }

    pub fn set_loss_model(&mut self, loss_model: LossModel) {
        self.loss_model = loss_model;
        self.recompute();
    }

    pub fn set_catalog(&mut self, onus: Vec<CatalogOnu>) {
        self.catalog_onus = onus;
    }

    /// Recompute power for the active diagram from scratch
    pub fn recompute(&mut self) {
        self.power = match self.store.active() {
            Some(diagram) => power::compute_power(diagram, &self.graph_state.tables, &self.loss_model),
            None => PowerMap::default(),
        };
        log::debug!("Recomputed power at {} port(s)", self.power.len());
    }

    pub fn report(&self) -> BudgetReport {
        match self.store.active() {
            Some(diagram) => BudgetReport::build(diagram, &self.power, &self.catalog_onus),
            None => BudgetReport::default(),
        }
    }

    /// Status used to color a connection
    pub fn link_status(&self, connection_id: &str) -> LinkStatus {
        self.store
            .active()
            .and_then(|d| d.connection(connection_id).map(|c| power::connection_status(d, &self.power, c)))
            .unwrap_or(LinkStatus::Unknown)
    }

    fn mutate<R>(
        &mut self,
        now: Instant,
        edit: impl FnOnce(&GraphState, &mut Diagram) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let diagram = self.store.active_mut().ok_or(AppError::NoActiveDiagram)?;
        let result = edit(&self.graph_state, diagram)?;
        self.store.touch(now);
        self.recompute();
        Ok(result)
    }

    // Graph operations

    /// Add a node at the default position for its variant
    pub fn add_node(&mut self, now: Instant, template: NewNode) -> Result<String, AppError> {
        self.mutate(now, |graph, diagram| Ok(graph.add_node(diagram, template)?))
    }

    pub fn add_node_at(&mut self, now: Instant, template: NewNode, position: Position) -> Result<String, AppError> {
        self.mutate(now, |graph, diagram| Ok(graph.add_node_at(diagram, template, position)?))
    }

    /// Delete a node, its connections, and any selection of them
    pub fn delete_node(&mut self, now: Instant, node_id: &str) -> Result<Vec<Connection>, AppError> {
        let removed = self.mutate(now, |_, diagram| {
            GraphState::delete_node(diagram, node_id)
                .ok_or_else(|| EditError::UnknownNode(node_id.to_string()).into())
        })?;
        self.canvas_state.forget_node(node_id, &removed);
        Ok(removed)
    }

    /// Delete every selected node and connection
    pub fn delete_selected(&mut self, now: Instant) -> Result<(), AppError> {
        let nodes: Vec<String> = self.canvas_state.selected_nodes.iter().cloned().collect();
        let connections: Vec<String> = self.canvas_state.selected_connections.iter().cloned().collect();
        if nodes.is_empty() && connections.is_empty() {
            return Ok(());
        }

        self.mutate(now, |_, diagram| {
            for id in &connections {
                GraphState::disconnect(diagram, id);
            }
            for id in &nodes {
                GraphState::delete_node(diagram, id);
            }
            Ok(())
        })?;
        self.canvas_state.reset();
        Ok(())
    }

    pub fn connect(&mut self, now: Instant, from: PortRef, to: PortRef) -> Result<Connection, AppError> {
        self.mutate(now, |_, diagram| Ok(GraphState::connect(diagram, from, to)?))
    }

    pub fn disconnect(&mut self, now: Instant, connection_id: &str) -> Result<Connection, AppError> {
        let removed = self.mutate(now, |_, diagram| {
            GraphState::disconnect(diagram, connection_id)
                .ok_or_else(|| EditError::UnknownConnection(connection_id.to_string()).into())
        })?;
        self.canvas_state.selected_connections.remove(connection_id);
        Ok(removed)
    }

    pub fn edit_node(&mut self, now: Instant, node_id: &str, edit: NodeEdit) -> Result<(), AppError> {
        self.mutate(now, |graph, diagram| Ok(graph.edit_node(diagram, node_id, edit)?))
    }

    pub fn edit_connection(&mut self, now: Instant, connection_id: &str, edit: ConnectionEdit) -> Result<(), AppError> {
        self.mutate(now, |_, diagram| Ok(GraphState::edit_connection(diagram, connection_id, edit)?))
    }

    pub fn edit_settings(&mut self, now: Instant, edit: SettingsEdit) -> Result<(), AppError> {
        self.mutate(now, |_, diagram| Ok(GraphState::edit_settings(diagram, edit)?))
    }

    pub fn begin_editing(&mut self, target: EditTarget) {
        self.canvas_state.begin_editing(target);
    }

    // Pointer events

    pub fn pointer_down(&mut self, pos: Position) -> PointerOutcome {
        match self.store.active() {
            Some(diagram) => self.canvas_state.pointer_down(diagram, pos),
            None => PointerOutcome::None,
        }
    }

    pub fn pointer_move(&mut self, now: Instant, pos: Position) -> PointerOutcome {
        let Some(diagram) = self.store.active_mut() else {
            return PointerOutcome::None;
        };
        let outcome = self.canvas_state.pointer_move(diagram, pos);
        self.after_pointer(now, &outcome);
        outcome
    }

    pub fn pointer_up(&mut self, now: Instant, pos: Position) -> PointerOutcome {
        let Some(diagram) = self.store.active_mut() else {
            return PointerOutcome::None;
        };
        let outcome = self.canvas_state.pointer_up(diagram, pos);
        self.after_pointer(now, &outcome);
        outcome
    }

    fn after_pointer(&mut self, now: Instant, outcome: &PointerOutcome) {
        if outcome.mutated() {
            self.store.touch(now);
            self.recompute();
        }
    }

    // Diagram lifecycle

    /// Drive autosave; call regularly from the event loop
    pub async fn tick(&mut self, now: Instant) -> StoreResult<bool> {
        self.store.poll(now).await
    }

    pub async fn create_diagram(&mut self, name: Option<String>) -> StoreResult<String> {
        let id = self.store.create(name).await?;
        self.canvas_state.reset();
        self.recompute();
        Ok(id)
    }

    pub async fn switch_to(&mut self, id: &str) -> StoreResult<()> {
        self.store.switch_to(id).await?;
        self.canvas_state.reset();
        self.recompute();
        Ok(())
    }

    pub async fn rename_diagram(&mut self, id: &str, name: &str) -> StoreResult<()> {
        self.store.rename(id, name).await
    }

    pub async fn delete_diagram(&mut self, id: &str) -> StoreResult<()> {
        let was_active = self.store.active_id() == Some(id);
        self.store.delete(id).await?;
        if was_active {
            self.canvas_state.reset();
            self.recompute();
        }
        Ok(())
    }

    /// Final flush before the view goes away
    pub async fn close(&mut self) -> StoreResult<()> {
        self.canvas_state.reset();
        self.store.close().await
    }
}
