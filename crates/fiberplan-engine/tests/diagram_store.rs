//! Diagram store persistence protocol

use std::time::{Duration, Instant};

use fiberplan_engine::store::{
    BootstrapState, DiagramApi, DiagramStore, FallbackCache, FileCache, InMemoryDiagramApi, MemoryCache, SaveStatus,
    StoreError, LOCAL_ID_PREFIX,
};
use fiberplan_engine::StoreConfig;
use fiberplan_types::{Diagram, Node};

const DELAY: Duration = Duration::from_millis(500);

type MemoryStore = DiagramStore<InMemoryDiagramApi, MemoryCache>;

async fn ready_store() -> MemoryStore {
    let mut store = DiagramStore::new(InMemoryDiagramApi::new(), MemoryCache::new(), StoreConfig::default());
    store.bootstrap().await.unwrap();
    store
}

fn remote_of(store: &MemoryStore, id: &str) -> Diagram {
    Diagram::from_record(&store.api().record(id).unwrap()).unwrap()
}

#[tokio::test]
async fn test_bootstrap_creates_first_diagram() {
    let store = ready_store().await;

    assert_eq!(store.bootstrap_state(), BootstrapState::Ready);
    assert_eq!(store.len(), 1);
    let active = store.active().unwrap();
    assert_eq!(active.name, "Diagram 1");
    assert!(active.nodes.is_empty());
    assert_eq!(store.api().calls().create, 1);
}

#[tokio::test]
async fn test_bootstrap_loads_existing_records() {
    let records = vec![
        Diagram::new("diagram-7", "North", None).to_record().unwrap(),
        Diagram::new("diagram-9", "South", None).to_record().unwrap(),
    ];
    let mut store = DiagramStore::new(
        InMemoryDiagramApi::with_records(records),
        MemoryCache::new(),
        StoreConfig::default(),
    );
    store.bootstrap().await.unwrap();

    assert_eq!(store.active_id(), Some("diagram-7"));
    assert_eq!(store.list().count(), 2);
    assert_eq!(store.api().calls().create, 0);
    assert_eq!(store.cache().save_count(), 1);
}

#[tokio::test]
async fn test_mutation_burst_commits_once() {
    let mut store = ready_store().await;
    let id = store.active_id().unwrap().to_string();
    let start = Instant::now();

    for i in 0..5 {
        let now = start + Duration::from_millis(100 * i);
        store
            .edit_active(now, |d| d.add_node(Node::onu(format!("onu-{}", i), "ONU")))
            .unwrap();
    }
    assert_eq!(store.status(), &SaveStatus::Pending);

    let last = start + Duration::from_millis(400);
    assert!(!store.poll(last + DELAY - Duration::from_millis(1)).await.unwrap());
    assert_eq!(store.api().calls().update, 0);

    assert!(store.poll(last + DELAY).await.unwrap());
    assert!(!store.poll(last + DELAY * 4).await.unwrap());

    assert_eq!(store.api().calls().update, 1);
    assert_eq!(store.status(), &SaveStatus::Saved);
    assert_eq!(remote_of(&store, &id).nodes.len(), 5);
    assert!(!store.is_dirty(&id));
}

#[tokio::test]
async fn test_failed_commit_falls_back_to_cache() {
    let mut store = ready_store().await;
    let id = store.active_id().unwrap().to_string();
    let saves_before = store.cache().save_count();
    let now = Instant::now();

    store.edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU"))).unwrap();
    store.api().fail_next(1);
    assert!(store.poll(now + DELAY).await.unwrap());

    assert!(matches!(store.status(), SaveStatus::Failed(_)));
    assert_eq!(store.active().unwrap().nodes.len(), 1);
    assert!(store.is_dirty(&id));
    assert!(remote_of(&store, &id).nodes.is_empty());

    assert_eq!(store.cache().save_count(), saves_before + 1);
    let cached = Diagram::from_record(&store.cache().records().unwrap()[0]).unwrap();
    assert_eq!(cached.nodes.len(), 1);

    store.flush().await.unwrap();
    assert_eq!(store.status(), &SaveStatus::Saved);
    assert_eq!(remote_of(&store, &id).nodes.len(), 1);
}

#[tokio::test]
async fn test_delete_guards_last_diagram() {
    let mut store = ready_store().await;
    let first = store.active_id().unwrap().to_string();

    assert!(matches!(store.delete(&first).await, Err(StoreError::LastDiagram)));
    assert_eq!(store.len(), 1);

    let second = store.create(Some("Second".to_string())).await.unwrap();
    assert_eq!(store.active_id(), Some(second.as_str()));

    store.delete(&second).await.unwrap();
    assert_eq!(store.active_id(), Some(first.as_str()));
    assert!(store.api().record(&second).is_none());
    assert!(matches!(store.delete("missing").await, Err(StoreError::UnknownDiagram(_))));
}

#[tokio::test]
async fn test_deleting_inactive_keeps_active() {
    let mut store = ready_store().await;
    let first = store.active_id().unwrap().to_string();
    let second = store.create(None).await.unwrap();
    assert_eq!(store.get(&second).unwrap().name, "Diagram 2");

    store.delete(&first).await.unwrap();
    assert_eq!(store.active_id(), Some(second.as_str()));
}

#[tokio::test]
async fn test_switch_flushes_pending_edits() {
    let mut store = ready_store().await;
    let first = store.active_id().unwrap().to_string();
    let second = store.create(None).await.unwrap();
    store.switch_to(&first).await.unwrap();

    let now = Instant::now();
    store.edit_active(now, |d| d.add_node(Node::olt("olt-1", "OLT", 8))).unwrap();
    assert!(store.is_pending());

    store.switch_to(&second).await.unwrap();
    assert!(!store.is_pending());
    assert_eq!(store.active_id(), Some(second.as_str()));
    assert_eq!(remote_of(&store, &first).nodes.len(), 1);

    // Nothing left to fire for the diagram we left
    assert!(!store.poll(now + DELAY).await.unwrap());
}

#[tokio::test]
async fn test_switch_without_changes_does_not_commit() {
    let mut store = ready_store().await;
    let first = store.active_id().unwrap().to_string();
    let second = store.create(None).await.unwrap();
    let updates = store.api().calls().update;

    store.switch_to(&first).await.unwrap();
    store.switch_to(&second).await.unwrap();
    assert_eq!(store.api().calls().update, updates);
    assert!(matches!(store.switch_to("missing").await, Err(StoreError::UnknownDiagram(_))));
}

#[tokio::test]
async fn test_rename_commits_immediately() {
    let mut store = ready_store().await;
    let id = store.active_id().unwrap().to_string();

    store.rename(&id, "Riverside POP").await.unwrap();
    assert_eq!(store.api().record(&id).unwrap().name, "Riverside POP");
    assert_eq!(store.active().unwrap().name, "Riverside POP");
}

#[tokio::test]
async fn test_close_flushes_and_cancels() {
    let mut store = ready_store().await;
    let id = store.active_id().unwrap().to_string();
    let now = Instant::now();
    store.edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU"))).unwrap();

    store.close().await.unwrap();
    assert!(!store.is_pending());
    assert_eq!(remote_of(&store, &id).nodes.len(), 1);
    assert_eq!(store.api().calls().update, 1);
}

#[tokio::test]
async fn test_bootstrap_from_cache_when_remote_down() {
    let cached = vec![Diagram::new("diagram-3", "Cached", None).to_record().unwrap()];
    let api = InMemoryDiagramApi::new();
    api.set_offline(true);
    let mut store = DiagramStore::new(api, MemoryCache::with_records(cached), StoreConfig::default());

    store.bootstrap().await.unwrap();
    assert_eq!(store.bootstrap_state(), BootstrapState::Offline);
    assert_eq!(store.active().unwrap().name, "Cached");
}

#[tokio::test]
async fn test_bootstrap_without_cache_needs_retry() {
    let api = InMemoryDiagramApi::new();
    api.set_offline(true);
    let mut store = DiagramStore::new(api, MemoryCache::new(), StoreConfig::default());

    let result = store.bootstrap().await;
    assert!(matches!(result, Err(StoreError::BootstrapFailed(_))));
    assert_eq!(store.bootstrap_state(), BootstrapState::NeedsRetry);
    assert!(store.active().is_none());

    store.api().set_offline(false);
    store.bootstrap().await.unwrap();
    assert_eq!(store.bootstrap_state(), BootstrapState::Ready);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_offline_create_is_rebound_on_commit() {
    let mut store = ready_store().await;
    store.api().set_offline(true);

    let local = store.create(Some("Field survey".to_string())).await.unwrap();
    assert!(local.starts_with(LOCAL_ID_PREFIX));
    assert!(!store.is_remote(&local));

    store.api().set_offline(false);
    let now = Instant::now();
    store.edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU"))).unwrap();
    store.poll(now + DELAY).await.unwrap();

    let rebound = store.active_id().unwrap().to_string();
    assert!(!rebound.starts_with(LOCAL_ID_PREFIX));
    assert!(store.is_remote(&rebound));
    assert!(store.get(&local).is_none());

    let remote = remote_of(&store, &rebound);
    assert_eq!(remote.name, "Field survey");
    assert_eq!(remote.nodes.len(), 1);
}

#[tokio::test]
async fn test_file_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        user_id: Some("tech-7".to_string()),
        ..StoreConfig::default()
    };
    let key = config.cache_key();

    let api = InMemoryDiagramApi::new().for_user("tech-7");
    let mut store = DiagramStore::new(api, FileCache::new(dir.path(), &key), config.clone());
    store.bootstrap().await.unwrap();

    let now = Instant::now();
    store.edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU"))).unwrap();
    store.api().set_offline(true);
    store.flush().await.unwrap();
    assert!(matches!(store.status(), SaveStatus::Failed(_)));

    let cached = FileCache::new(dir.path(), &key).load().unwrap().unwrap();
    let diagram = Diagram::from_record(&cached[0]).unwrap();
    assert_eq!(diagram.nodes.len(), 1);
    assert_eq!(diagram.owner.user_id.as_deref(), Some("tech-7"));

    let offline = InMemoryDiagramApi::new();
    offline.set_offline(true);
    let mut restarted = DiagramStore::new(offline, FileCache::new(dir.path(), &key), config);
    restarted.bootstrap().await.unwrap();
    assert_eq!(restarted.bootstrap_state(), BootstrapState::Offline);
    assert_eq!(restarted.active().unwrap().nodes.len(), 1);
}

#[tokio::test]
async fn test_api_round_trips_json_fields() {
    let api = InMemoryDiagramApi::new();
    let diagram = fiberplan_engine::samples::fbt_cascade();
    let record = diagram.to_record().unwrap();

    let created = api
        .create(&record.name, &record.nodes, &record.connections, &record.settings)
        .await
        .unwrap();
    let listed = api.list().await.unwrap();
    let decoded = Diagram::from_record(&listed[0]).unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(decoded.id, created.id);
    assert_eq!(decoded.nodes, diagram.nodes);
    assert_eq!(decoded.connections, diagram.connections);
    assert_eq!(decoded.settings, diagram.settings);
}

#[tokio::test]
async fn test_offline_bootstrap_resends_cached_edits() {
    let mut first_session = ready_store().await;
    let id = first_session.active_id().unwrap().to_string();
    let now = Instant::now();
    first_session
        .edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU")))
        .unwrap();
    first_session.api().set_offline(true);
    first_session.flush().await.unwrap();
    assert!(matches!(first_session.status(), SaveStatus::Failed(_)));

    // Same remote contents, still unreachable at startup
    let api = InMemoryDiagramApi::with_records(first_session.api().records());
    api.set_offline(true);
    let cache = MemoryCache::with_records(first_session.cache().records().unwrap().to_vec());
    let mut store = DiagramStore::new(api, cache, StoreConfig::default());
    store.bootstrap().await.unwrap();

    assert_eq!(store.bootstrap_state(), BootstrapState::Offline);
    assert!(store.is_dirty(&id));
    assert!(remote_of(&store, &id).nodes.is_empty());

    store.api().set_offline(false);
    store.close().await.unwrap();

    assert_eq!(store.status(), &SaveStatus::Saved);
    assert_eq!(remote_of(&store, &id).nodes.len(), 1);
    assert!(!store.is_dirty(&id));
}

#[tokio::test]
async fn test_close_syncs_every_cached_diagram() {
    let records = vec![
        Diagram::new("diagram-1", "North", None).to_record().unwrap(),
        Diagram::new("diagram-2", "South", None).to_record().unwrap(),
    ];
    let api = InMemoryDiagramApi::with_records(records.clone());
    api.set_offline(true);
    let mut store = DiagramStore::new(api, MemoryCache::with_records(records), StoreConfig::default());
    store.bootstrap().await.unwrap();

    store.api().set_offline(false);
    store.close().await.unwrap();
    assert_eq!(store.api().calls().update, 2);
    assert!(!store.is_dirty("diagram-1"));
    assert!(!store.is_dirty("diagram-2"));
}

#[tokio::test]
async fn test_rename_inside_debounce_window_commits_once() {
    let mut store = ready_store().await;
    let id = store.active_id().unwrap().to_string();
    let now = Instant::now();

    store.edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU"))).unwrap();
    store.rename(&id, "Harbour POP").await.unwrap();
    assert_eq!(store.api().calls().update, 1);
    assert!(!store.is_pending());

    assert!(!store.poll(now + DELAY).await.unwrap());
    assert_eq!(store.api().calls().update, 1);

    let remote = remote_of(&store, &id);
    assert_eq!(remote.name, "Harbour POP");
    assert_eq!(remote.nodes.len(), 1);
}

#[tokio::test]
async fn test_renaming_another_diagram_keeps_autosave() {
    let mut store = ready_store().await;
    let first = store.active_id().unwrap().to_string();
    let second = store.create(None).await.unwrap();
    let now = Instant::now();

    store.edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU"))).unwrap();
    store.rename(&first, "Old town").await.unwrap();
    assert!(store.is_pending());

    assert!(store.poll(now + DELAY).await.unwrap());
    assert_eq!(remote_of(&store, &second).nodes.len(), 1);
    assert_eq!(store.api().calls().update, 2);
}

#[tokio::test]
async fn test_failed_remote_delete_is_retried() {
    let mut store = ready_store().await;
    let second = store.create(None).await.unwrap();

    store.api().fail_next(1);
    store.delete(&second).await.unwrap();
    assert!(matches!(store.status(), SaveStatus::Failed(msg) if msg.contains(&second)));
    assert_eq!(store.pending_deletes(), [second.clone()]);
    assert!(store.api().record(&second).is_some());

    let now = Instant::now();
    store.edit_active(now, |d| d.add_node(Node::onu("onu-1", "ONU"))).unwrap();
    store.flush().await.unwrap();

    assert!(store.pending_deletes().is_empty());
    assert!(store.api().record(&second).is_none());
}

#[tokio::test]
async fn test_pending_delete_stays_gone_after_rebootstrap() {
    let mut store = ready_store().await;
    let second = store.create(None).await.unwrap();

    store.api().fail_next(1);
    store.delete(&second).await.unwrap();

    store.bootstrap().await.unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.get(&second).is_none());
    assert!(store.api().record(&second).is_none());
    assert!(store.pending_deletes().is_empty());
}
