//! Named diagrams with debounced autosave.
//!
//! The store owns the in-memory copy of every diagram of the current user
//! and is the only writer to the remote API and the fallback cache. Edits
//! land in memory immediately and mark the active diagram dirty; a commit
//! happens when the autosave timer fires, on [`DiagramStore::flush`], or when
//! switching away. Remote failures never roll back memory: the serialized
//! list goes to the fallback cache and the status reports the error.
//! Diagrams restored from the cache count as unsaved until the remote store
//! accepts them, and failed remote deletes are re-sent after the next commit.

use std::time::Instant;

use fiberplan_types::{Diagram, DiagramPatch, DiagramRecord};

use super::{ApiError, DiagramApi, Debouncer, FallbackCache, StoreError, StoreResult};
use crate::config::StoreConfig;

/// Prefix of IDs given to diagrams the remote store has not accepted yet
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Outcome of the most recent persistence activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    /// Edits waiting for the autosave timer
    Pending,
    Saving,
    Saved,
    /// Last commit failed; state was written to the fallback cache
    Failed(String),
}

/// Where the diagram list came from at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Loading,
    /// Loaded from the remote store
    Ready,
    /// Remote listing failed; loaded from the fallback cache
    Offline,
    /// Remote and cache both failed; the user has to retry
    NeedsRetry,
}

#[derive(Debug, Clone)]
struct Entry {
    diagram: Diagram,
    /// The remote store knows this diagram under its current ID
    remote: bool,
    /// In-memory state differs from the last successful commit
    dirty: bool,
}

impl Entry {
    fn from_record(record: &DiagramRecord) -> Result<Self, serde_json::Error> {
        let diagram = Diagram::from_record(record)?;
        let remote = !diagram.id.starts_with(LOCAL_ID_PREFIX);
        Ok(Self {
            diagram,
            remote,
            dirty: !remote,
        })
    }
}

pub struct DiagramStore<A: DiagramApi, C: FallbackCache> {
    api: A,
    cache: C,
    config: StoreConfig,
    entries: Vec<Entry>,
    active: Option<String>,
    autosave: Debouncer,
    status: SaveStatus,
    bootstrap: BootstrapState,
    local_seq: u64,
    /// Diagrams deleted locally whose remote delete has not gone through
    pending_deletes: Vec<String>,
}

impl<A: DiagramApi, C: FallbackCache> DiagramStore<A, C> {
    pub fn new(api: A, cache: C, config: StoreConfig) -> Self {
        let autosave = Debouncer::new(config.autosave_delay());
        Self {
            api,
            cache,
            config,
            entries: Vec::new(),
            active: None,
            autosave,
            status: SaveStatus::Idle,
            bootstrap: BootstrapState::Loading,
            local_seq: 0,
            pending_deletes: Vec::new(),
        }
    }

    /// Load the diagram list, falling back to the local cache.
    ///
    /// An empty remote list gets one fresh diagram so the user always has
    /// something to edit. Fails only when neither source has diagrams.
    pub async fn bootstrap(&mut self) -> StoreResult<()> {
        self.bootstrap = BootstrapState::Loading;

        match self.api.list().await {
            Ok(records) => {
                let records: Vec<_> = records
                    .into_iter()
                    .filter(|r| !self.pending_deletes.contains(&r.id))
                    .collect();
                self.load_records(&records);
                self.bootstrap = BootstrapState::Ready;
                log::info!("Loaded {} diagram(s) from remote store", self.entries.len());
                if self.entries.is_empty() {
                    self.create(None).await?;
                } else {
                    self.write_cache();
                }
                self.retry_deletes().await;
                Ok(())
            }
            Err(err) => {
                log::error!("Remote diagram listing failed: {}", err);
                let cached = match self.cache.load() {
                    Ok(cached) => cached.unwrap_or_default(),
                    Err(cache_err) => {
                        log::warn!("Fallback cache unreadable: {}", cache_err);
                        Vec::new()
                    }
                };
                self.load_records(&cached);
                if self.entries.is_empty() {
                    self.bootstrap = BootstrapState::NeedsRetry;
                    return Err(StoreError::BootstrapFailed(err));
                }
                // The cache may hold commits the remote never received
                for entry in &mut self.entries {
                    entry.dirty = true;
                }
                self.bootstrap = BootstrapState::Offline;
                log::warn!("Working offline with {} cached diagram(s)", self.entries.len());
                Ok(())
            }
        }
    }

    fn load_records(&mut self, records: &[DiagramRecord]) {
        self.entries = records
            .iter()
            .filter_map(|record| match Entry::from_record(record) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("Skipping unreadable diagram {}: {}", record.id, err);
                    None
                }
            })
            .collect();
        self.local_seq = self
            .entries
            .iter()
            .filter_map(|e| e.diagram.id.strip_prefix(LOCAL_ID_PREFIX)?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.active = self.entries.first().map(|e| e.diagram.id.clone());
    }

    pub fn list(&self) -> impl Iterator<Item = &Diagram> {
        self.entries.iter().map(|e| &e.diagram)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Diagram> {
        self.position(id).map(|idx| &self.entries[idx].diagram)
    }

    /// Whether the remote store knows the diagram under this ID
    pub fn is_remote(&self, id: &str) -> bool {
        self.position(id).is_some_and(|idx| self.entries[idx].remote)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Diagram> {
        self.active_index().map(|idx| &self.entries[idx].diagram)
    }

    /// Mutable access to the active diagram. Call [`touch`](Self::touch)
    /// after mutating so the change is committed.
    pub fn active_mut(&mut self) -> Option<&mut Diagram> {
        let idx = self.active_index()?;
        Some(&mut self.entries[idx].diagram)
    }

    /// Record a mutation of the active diagram and (re)start the autosave timer
    pub fn touch(&mut self, now: Instant) {
        let Some(idx) = self.active_index() else {
            return;
        };
        self.entries[idx].dirty = true;
        self.autosave.schedule(now);
        self.status = SaveStatus::Pending;
    }

    /// Mutate the active diagram and schedule its autosave
    pub fn edit_active<R>(&mut self, now: Instant, edit: impl FnOnce(&mut Diagram) -> R) -> StoreResult<R> {
        let diagram = self.active_mut().ok_or(StoreError::NoActiveDiagram)?;
        let result = edit(diagram);
        self.touch(now);
        Ok(result)
    }

    /// Create an empty diagram and make it active.
    ///
    /// The current diagram is flushed first. If the remote store refuses, the
    /// diagram gets a local ID and is created remotely on its next commit.
    pub async fn create(&mut self, name: Option<String>) -> StoreResult<String> {
        self.flush().await?;

        let name = name.unwrap_or_else(|| self.default_name());
        let mut diagram = Diagram::new(String::new(), name, self.config.user_id.clone());
        let record = diagram.to_record()?;

        let entry = match self
            .api
            .create(&record.name, &record.nodes, &record.connections, &record.settings)
            .await
        {
            Ok(created) => {
                log::info!("Created diagram {} ({})", created.id, created.name);
                diagram.id = created.id;
                diagram.owner.created_at = created.created_at;
                diagram.owner.updated_at = created.updated_at;
                self.status = SaveStatus::Saved;
                Entry {
                    diagram,
                    remote: true,
                    dirty: false,
                }
            }
            Err(err) => {
                self.local_seq += 1;
                diagram.id = format!("{}{}", LOCAL_ID_PREFIX, self.local_seq);
                log::warn!("Remote create failed, keeping {} locally: {}", diagram.id, err);
                self.status = SaveStatus::Failed(err.to_string());
                Entry {
                    diagram,
                    remote: false,
                    dirty: true,
                }
            }
        };

        let id = entry.diagram.id.clone();
        self.entries.push(entry);
        self.active = Some(id.clone());
        self.write_cache();
        Ok(id)
    }

    /// First "<prefix> <n>" not already used as a name
    fn default_name(&self) -> String {
        let prefix = &self.config.default_name_prefix;
        (self.entries.len() + 1..)
            .map(|n| format!("{} {}", prefix, n))
            .find(|name| !self.entries.iter().any(|e| &e.diagram.name == name))
            .unwrap_or_else(|| prefix.clone())
    }

    /// Rename a diagram and commit it right away
    pub async fn rename(&mut self, id: &str, name: impl Into<String>) -> StoreResult<()> {
        let idx = self.position(id).ok_or_else(|| StoreError::UnknownDiagram(id.to_string()))?;
        let entry = &mut self.entries[idx];
        entry.diagram.name = name.into();
        entry.diagram.owner.updated_at = chrono::Utc::now();
        entry.dirty = true;
        self.commit(idx).await
    }

    /// Delete a diagram. The last remaining diagram cannot be deleted.
    ///
    /// Deleting the active diagram cancels its autosave and activates the
    /// first remaining one.
    pub async fn delete(&mut self, id: &str) -> StoreResult<()> {
        let idx = self.position(id).ok_or_else(|| StoreError::UnknownDiagram(id.to_string()))?;
        if self.entries.len() == 1 {
            return Err(StoreError::LastDiagram);
        }

        let entry = self.entries.remove(idx);
        if entry.remote {
            if let Err(err) = self.api.delete(id).await {
                log::warn!("Remote delete of {} failed, retrying after the next commit: {}", id, err);
                self.status = SaveStatus::Failed(format!("{} is still stored remotely: {}", id, err));
                self.pending_deletes.push(id.to_string());
            }
        }

        if self.active.as_deref() == Some(id) {
            self.autosave.cancel();
            self.active = self.entries.first().map(|e| e.diagram.id.clone());
            log::info!(
                "Deleted active diagram {}, switched to {}",
                id,
                self.active.as_deref().unwrap_or("none")
            );
        } else {
            log::info!("Deleted diagram {}", id);
        }

        self.write_cache();
        Ok(())
    }

    /// Flush the current diagram, then activate `id`
    pub async fn switch_to(&mut self, id: &str) -> StoreResult<()> {
        if self.position(id).is_none() {
            return Err(StoreError::UnknownDiagram(id.to_string()));
        }
        if self.active.as_deref() == Some(id) {
            return Ok(());
        }
        self.flush().await?;
        self.active = Some(id.to_string());
        log::debug!("Activated diagram {}", id);
        Ok(())
    }

    /// Commit the active diagram now if it has unsaved changes, and cancel
    /// the autosave timer
    pub async fn flush(&mut self) -> StoreResult<()> {
        self.autosave.cancel();
        match self.active_index() {
            Some(idx) if self.entries[idx].dirty => self.commit(idx).await,
            _ => Ok(()),
        }
    }

    /// Drive the autosave timer. Returns true if a commit was attempted.
    pub async fn poll(&mut self, now: Instant) -> StoreResult<bool> {
        if !self.autosave.fire(now) {
            return Ok(false);
        }
        match self.active_index() {
            Some(idx) if self.entries[idx].dirty => {
                self.commit(idx).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Commit every diagram with unsaved changes. Returns the number of
    /// commits attempted.
    pub async fn sync_all(&mut self) -> StoreResult<usize> {
        self.autosave.cancel();
        let mut attempted = 0;
        for idx in 0..self.entries.len() {
            if self.entries[idx].dirty {
                self.commit(idx).await?;
                attempted += 1;
            }
        }
        Ok(attempted)
    }

    /// Final flush when the diagram view goes away, including diagrams
    /// restored from the fallback cache that were never reopened
    pub async fn close(&mut self) -> StoreResult<()> {
        self.sync_all().await?;
        Ok(())
    }

    /// Write one diagram to the remote store; the fallback cache is written
    /// either way
    async fn commit(&mut self, idx: usize) -> StoreResult<()> {
        if self.active_index() == Some(idx) {
            self.autosave.cancel();
        }
        self.status = SaveStatus::Saving;
        let record = self.entries[idx].diagram.to_record()?;

        let result = if self.entries[idx].remote {
            let patch = DiagramPatch {
                name: Some(record.name.clone()),
                ..DiagramPatch::contents(&record)
            };
            self.api.update(&record.id, patch).await.map(|()| None)
        } else {
            self.api
                .create(&record.name, &record.nodes, &record.connections, &record.settings)
                .await
                .map(Some)
        };

        let committed = match result {
            Ok(created) => {
                let entry = &mut self.entries[idx];
                if let Some(created) = created {
                    log::info!("Diagram {} created remotely as {}", record.id, created.id);
                    entry.diagram.id = created.id.clone();
                    entry.remote = true;
                    if self.active.as_deref() == Some(record.id.as_str()) {
                        self.active = Some(created.id);
                    }
                } else {
                    log::info!("Committed diagram {}", record.id);
                }
                entry.dirty = false;
                self.status = SaveStatus::Saved;
                true
            }
            Err(err) => {
                log::warn!("Commit of {} failed, kept in fallback cache: {}", record.id, err);
                self.status = SaveStatus::Failed(err.to_string());
                false
            }
        };

        if committed {
            self.retry_deletes().await;
        }
        self.write_cache();
        Ok(())
    }

    /// Re-send remote deletes that failed earlier
    async fn retry_deletes(&mut self) {
        for id in std::mem::take(&mut self.pending_deletes) {
            match self.api.delete(&id).await {
                Ok(()) | Err(ApiError::NotFound(_)) => log::info!("Deleted diagram {} remotely", id),
                Err(err) => {
                    log::warn!("Remote delete of {} still failing: {}", id, err);
                    self.pending_deletes.push(id);
                }
            }
        }
    }

    fn write_cache(&mut self) {
        let records: Result<Vec<_>, _> = self.entries.iter().map(|e| e.diagram.to_record()).collect();
        let result = match records {
            Ok(records) => self.cache.save(&records),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            log::warn!("Failed to write fallback cache: {}", err);
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.diagram.id == id)
    }

    fn active_index(&self) -> Option<usize> {
        self.position(self.active.as_deref()?)
    }

    pub fn status(&self) -> &SaveStatus {
        &self.status
    }

    pub fn bootstrap_state(&self) -> BootstrapState {
        self.bootstrap
    }

    /// Whether an autosave is scheduled
    pub fn is_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Whether the diagram has changes not yet accepted by the remote store
    pub fn is_dirty(&self, id: &str) -> bool {
        self.position(id).is_some_and(|idx| self.entries[idx].dirty)
    }

    /// IDs deleted locally but still present on the remote store
    pub fn pending_deletes(&self) -> &[String] {
        &self.pending_deletes
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}
