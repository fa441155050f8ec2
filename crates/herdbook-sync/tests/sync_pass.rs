//! End-to-end sync passes against the in-memory remote store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use herdbook_core::{
    AnimalPatch, EntityKind, ExpenseCategory, Money, NewAnimal, NewAnimalEvent, NewExpense,
    NewPaddock, NewProduction, Record, SyncState,
};
use herdbook_db::{Database, DbConfig};
use herdbook_sync::{
    FailurePolicy, FieldFilter, MemoryRemoteStore, RemoteDocument, RemoteStore, SyncConfig,
    SyncError, SyncEventEmitter, SyncManager, SyncReport, SyncResult,
};

const FARM: &str = "finca-1";

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

async fn setup(config: SyncConfig) -> (Database, Arc<MemoryRemoteStore>, SyncManager) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());
    let manager = SyncManager::new(db.clone(), remote.clone(), config).unwrap();
    (db, remote, manager)
}

#[tokio::test]
async fn holstein_a1_round_trip() {
    let (db, remote, manager) = setup(SyncConfig::for_farm(FARM)).await;

    let id = db
        .animals()
        .create(NewAnimal::new("A1", "Holstein"))
        .await
        .unwrap();

    let report = manager.sync_all().await.unwrap();
    assert_eq!(report.synced_for(EntityKind::Animals), Some(1));
    assert_eq!(report.total_synced(), 1);
    assert_eq!(report.results.len(), EntityKind::ALL.len());

    let doc = remote.document("farms/finca-1/animals", &id).unwrap();
    assert_eq!(doc.get("code"), Some(&json!("A1")));
    assert_eq!(doc.get("breed"), Some(&json!("Holstein")));
    assert_eq!(doc.get("deleted"), Some(&json!(false)));
    assert!(doc.get("server_updated_at").is_some());

    let local = db.animals().get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(local.sync_state(), SyncState::Clean);
    assert_eq!(local.remote_id(), Some(id.as_str()));

    // Nothing dirty: every table reports zero and no batch is sent
    let pushes = remote.push_count();
    let again = manager.sync_all().await.unwrap();
    assert_eq!(again.total_synced(), 0);
    assert!(again.results.iter().all(|r| r.synced_count == 0));
    assert_eq!(remote.push_count(), pushes);
}

#[tokio::test]
async fn upsert_converges_on_one_remote_document() {
    let (db, remote, manager) = setup(SyncConfig::for_farm(FARM)).await;
    let cow = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();

    let first = db
        .production()
        .upsert(NewProduction::new(&cow, d(1), 10.0, 8.0))
        .await
        .unwrap();
    manager.sync_all().await.unwrap();

    let second = db
        .production()
        .upsert(NewProduction::new(&cow, d(1), 12.0, 8.0))
        .await
        .unwrap();
    assert_eq!(first, second);

    let report = manager.sync_all().await.unwrap();
    assert_eq!(report.synced_for(EntityKind::Production), Some(1));
    assert_eq!(report.synced_for(EntityKind::Animals), Some(0));

    let docs = remote.documents("farms/finca-1/production");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, first);
    assert_eq!(docs[0].get("total_liters"), Some(&json!(20.0)));
    assert_eq!(docs[0].get("morning_liters"), Some(&json!(12.0)));
}

#[tokio::test]
async fn soft_delete_reaches_remote_once() {
    let (db, remote, manager) = setup(SyncConfig::for_farm(FARM)).await;
    let id = db
        .expenses()
        .create(NewExpense::new(d(3), ExpenseCategory::Feed, Money::from_cents(25_000)))
        .await
        .unwrap();
    manager.sync_all().await.unwrap();

    db.expenses().soft_delete(&id).await.unwrap();
    let report = manager.sync_all().await.unwrap();
    assert_eq!(report.synced_for(EntityKind::Expenses), Some(1));

    let doc = remote.document("farms/finca-1/expenses", &id).unwrap();
    assert_eq!(doc.get("deleted"), Some(&json!(true)));
    assert_eq!(doc.get("amount_cents"), Some(&json!(25_000)));

    // Clean tombstone is terminal
    assert_eq!(manager.sync_all().await.unwrap().total_synced(), 0);
    assert!(db.expenses().get_by_id(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn edits_are_pushed_again() {
    let (db, remote, manager) = setup(SyncConfig::for_farm(FARM)).await;
    let id = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();
    manager.sync_all().await.unwrap();

    db.animals()
        .update(
            &id,
            AnimalPatch {
                breed: Some("Jersey".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(manager.total_pending().await.unwrap(), 1);

    manager.sync_all().await.unwrap();
    let doc = remote.document("farms/finca-1/animals", &id).unwrap();
    assert_eq!(doc.get("breed"), Some(&json!("Jersey")));
    assert_eq!(manager.total_pending().await.unwrap(), 0);
}

/// Seeds one dirty row in animals, paddocks and animal_events.
async fn seed_three_tables(db: &Database) {
    let cow = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();
    db.paddocks().create(NewPaddock::new("North")).await.unwrap();
    db.animal_events()
        .create(NewAnimalEvent {
            animal_id: cow,
            kind: "weighing".into(),
            date: d(2),
            description: "512 kg".into(),
            notes: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn abort_policy_stops_at_first_failed_table() {
    let (db, remote, manager) = setup(SyncConfig::for_farm(FARM)).await;
    seed_three_tables(&db).await;
    remote.fail_collection("farms/finca-1/paddocks", 503);

    let err = manager.sync_all().await.unwrap_err();
    match &err {
        SyncError::PushFailed { table, .. } => assert_eq!(*table, EntityKind::Paddocks),
        other => panic!("expected PushFailed, got {other:?}"),
    }
    assert!(err.is_retryable());

    // Animals precede paddocks; animal_events come after and were not attempted
    assert_eq!(remote.len("farms/finca-1/animals"), 1);
    assert_eq!(db.paddocks().count_unsynced().await.unwrap(), 1);
    assert_eq!(db.animal_events().count_unsynced().await.unwrap(), 1);

    remote.heal();
    let report = manager.sync_all().await.unwrap();
    assert_eq!(report.synced_for(EntityKind::Animals), Some(0));
    assert_eq!(report.synced_for(EntityKind::Paddocks), Some(1));
    assert_eq!(report.synced_for(EntityKind::AnimalEvents), Some(1));
}

#[tokio::test]
async fn continue_policy_records_failure_and_finishes() {
    let mut config = SyncConfig::for_farm(FARM);
    config.sync.failure_policy = FailurePolicy::Continue;
    let (db, remote, manager) = setup(config).await;
    seed_three_tables(&db).await;
    remote.fail_collection("farms/finca-1/paddocks", 400);

    let report = manager.sync_all().await.unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].table, EntityKind::Paddocks);
    assert!(!report.failures[0].retryable);
    assert_eq!(report.synced_for(EntityKind::Paddocks), None);
    assert_eq!(report.synced_for(EntityKind::AnimalEvents), Some(1));

    assert_eq!(db.paddocks().count_unsynced().await.unwrap(), 1);
    assert_eq!(manager.total_pending().await.unwrap(), 1);
}

/// Remote that edits a row in the local store while a batch is in flight.
struct EditDuringPush {
    inner: MemoryRemoteStore,
    db: Database,
    victim: Mutex<Option<String>>,
}

#[async_trait]
impl RemoteStore for EditDuringPush {
    async fn push_batch(
        &self,
        collection_path: &str,
        documents: &[RemoteDocument],
    ) -> SyncResult<Vec<String>> {
        let victim = self.victim.lock().unwrap().take();
        if let Some(id) = victim {
            let patch = AnimalPatch {
                notes: Some(Some("limping".into())),
                ..Default::default()
            };
            self.db.animals().update(&id, patch).await.unwrap();
        }
        self.inner.push_batch(collection_path, documents).await
    }

    async fn fetch(
        &self,
        collection_path: &str,
        filters: &[FieldFilter],
    ) -> SyncResult<Vec<RemoteDocument>> {
        self.inner.fetch(collection_path, filters).await
    }
}

#[tokio::test]
async fn row_edited_during_push_stays_dirty() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let a1 = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();
    let a2 = db.animals().create(NewAnimal::new("A2", "Jersey")).await.unwrap();

    let remote = Arc::new(EditDuringPush {
        inner: MemoryRemoteStore::new(),
        db: db.clone(),
        victim: Mutex::new(Some(a2.clone())),
    });
    let manager = SyncManager::new(db.clone(), remote.clone(), SyncConfig::for_farm(FARM)).unwrap();

    let report = manager.sync_all().await.unwrap();
    assert_eq!(report.synced_for(EntityKind::Animals), Some(2));

    let unsynced = db.animals().get_unsynced().await.unwrap();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].id, a2);
    assert_eq!(
        db.animals().get_by_id(&a1).await.unwrap().unwrap().sync_state(),
        SyncState::Clean
    );

    // The edit goes out with the next pass
    let report = manager.sync_all().await.unwrap();
    assert_eq!(report.synced_for(EntityKind::Animals), Some(1));
    let doc = remote.inner.document("farms/finca-1/animals", &a2).unwrap();
    assert_eq!(doc.get("notes"), Some(&json!("limping")));
}

#[derive(Default)]
struct RecordingEmitter {
    progress: Mutex<Vec<(EntityKind, usize)>>,
    errors: Mutex<Vec<EntityKind>>,
    completed: Mutex<Option<SyncReport>>,
}

impl SyncEventEmitter for RecordingEmitter {
    fn emit_progress(&self, table: EntityKind, synced: usize) {
        self.progress.lock().unwrap().push((table, synced));
    }

    fn emit_error(&self, table: EntityKind, _message: &str, _retryable: bool) {
        self.errors.lock().unwrap().push(table);
    }

    fn emit_complete(&self, report: &SyncReport) {
        *self.completed.lock().unwrap() = Some(report.clone());
    }
}

#[tokio::test]
async fn emitter_sees_every_table() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());
    let emitter = Arc::new(RecordingEmitter::default());

    let mut config = SyncConfig::for_farm(FARM);
    config.sync.failure_policy = FailurePolicy::Continue;
    let manager =
        SyncManager::with_emitter(db.clone(), remote.clone(), config, emitter.clone()).unwrap();

    seed_three_tables(&db).await;
    remote.fail_collection("farms/finca-1/animal_events", 500);

    let report = manager.sync_all().await.unwrap();

    let progress = emitter.progress.lock().unwrap().clone();
    assert_eq!(progress.len(), EntityKind::ALL.len() - 1);
    assert_eq!(progress[0], (EntityKind::Animals, 1));
    assert_eq!(*emitter.errors.lock().unwrap(), vec![EntityKind::AnimalEvents]);
    assert_eq!(emitter.completed.lock().unwrap().as_ref(), Some(&report));
}

#[tokio::test]
async fn pushed_documents_are_queryable_by_field() {
    let (db, remote, manager) = setup(SyncConfig::for_farm(FARM)).await;
    db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();
    db.animals().create(NewAnimal::new("A2", "Jersey")).await.unwrap();
    db.animals().create(NewAnimal::new("A3", "Holstein")).await.unwrap();
    manager.sync_all().await.unwrap();

    let holsteins = remote
        .fetch(
            "farms/finca-1/animals",
            &[FieldFilter::equals("breed", "Holstein")],
        )
        .await
        .unwrap();
    assert_eq!(holsteins.len(), 2);
}
