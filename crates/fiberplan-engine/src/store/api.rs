//! Remote diagram persistence API.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use fiberplan_types::{DiagramPatch, DiagramRecord};

use super::{ApiError, ApiResult};

/// Remote store of diagrams belonging to the current user.
///
/// `nodes`, `connections` and `settings` travel as JSON text.
#[async_trait]
pub trait DiagramApi: Send + Sync {
    /// All diagrams of the current user
    async fn list(&self) -> ApiResult<Vec<DiagramRecord>>;

    /// Store a new diagram and return it with its assigned ID
    async fn create(
        &self,
        name: &str,
        nodes: &str,
        connections: &str,
        settings: &str,
    ) -> ApiResult<DiagramRecord>;

    /// Overwrite the fields present in `patch`
    async fn update(&self, id: &str, patch: DiagramPatch) -> ApiResult<()>;

    async fn delete(&self, id: &str) -> ApiResult<()>;
}

/// Number of calls received per operation, failed attempts included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiCalls {
    pub list: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<DiagramRecord>,
    next_id: u64,
    offline: bool,
    queued_failures: usize,
    calls: ApiCalls,
}

impl MemoryState {
    fn reachable(&mut self) -> ApiResult<()> {
        if self.offline {
            return Err(ApiError::Network("remote store offline".to_string()));
        }
        if self.queued_failures > 0 {
            self.queued_failures -= 1;
            return Err(ApiError::Network("connection reset".to_string()));
        }
        Ok(())
    }
}

fn require_name(name: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::Rejected("diagram name must not be blank".to_string()));
    }
    Ok(())
}

/// In-process remote store with failure injection
#[derive(Debug, Default)]
pub struct InMemoryDiagramApi {
    state: Mutex<MemoryState>,
    user_id: Option<String>,
}

impl InMemoryDiagramApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with records
    pub fn with_records(records: Vec<DiagramRecord>) -> Self {
        let api = Self::default();
        {
            let mut state = api.lock();
            state.next_id = records.len() as u64;
            state.records = records;
        }
        api
    }

    /// Owner stamped on created records
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Fail every call until switched back online
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Fail the next `count` calls
    pub fn fail_next(&self, count: usize) {
        self.lock().queued_failures = count;
    }

    pub fn calls(&self) -> ApiCalls {
        self.lock().calls
    }

    /// Snapshot of stored records
    pub fn records(&self) -> Vec<DiagramRecord> {
        self.lock().records.clone()
    }

    pub fn record(&self, id: &str) -> Option<DiagramRecord> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DiagramApi for InMemoryDiagramApi {
    async fn list(&self) -> ApiResult<Vec<DiagramRecord>> {
        let mut state = self.lock();
        state.calls.list += 1;
        state.reachable()?;
        Ok(state.records.clone())
    }

    async fn create(
        &self,
        name: &str,
        nodes: &str,
        connections: &str,
        settings: &str,
    ) -> ApiResult<DiagramRecord> {
        let mut state = self.lock();
        state.calls.create += 1;
        state.reachable()?;
        require_name(name)?;

        state.next_id += 1;
        let now = Utc::now();
        let record = DiagramRecord {
            id: format!("diagram-{}", state.next_id),
            name: name.to_string(),
            nodes: nodes.to_string(),
            connections: connections.to_string(),
            settings: settings.to_string(),
            user_id: self.user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: DiagramPatch) -> ApiResult<()> {
        let mut state = self.lock();
        state.calls.update += 1;
        state.reachable()?;
        if let Some(name) = &patch.name {
            require_name(name)?;
        }

        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        patch.apply_to(record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let mut state = self.lock();
        state.calls.delete += 1;
        state.reachable()?;

        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_names_are_rejected() {
        let api = InMemoryDiagramApi::new();
        let result = api.create("  ", "[]", "[]", "{}").await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
        assert!(api.records().is_empty());

        let created = api.create("North", "[]", "[]", "{}").await.unwrap();
        let result = api.update(&created.id, DiagramPatch::rename("")).await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
        assert_eq!(api.record(&created.id).unwrap().name, "North");
        assert_eq!(api.calls().update, 1);
    }

    #[tokio::test]
    async fn test_queued_failures_run_out() {
        let api = InMemoryDiagramApi::new();
        api.fail_next(2);
        assert!(matches!(api.list().await, Err(ApiError::Network(_))));
        assert!(api.list().await.is_err());
        assert!(api.list().await.unwrap().is_empty());
        assert_eq!(api.calls().list, 3);
    }
}
