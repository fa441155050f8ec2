//! On-disk store behavior: schema initialization, re-open and the record
//! lifecycle across tables.

use chrono::NaiveDate;
use tempfile::TempDir;

use herdbook_core::{
    AnimalPatch, AnimalStatus, DateRange, Expense, ExpenseCategory, Money, NewAnimal, NewExpense,
    NewProduction, Production, Record, SyncState,
};
use herdbook_db::{Database, DbConfig, Repository, SyncAck};

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

async fn open(dir: &TempDir) -> Database {
    Database::new(DbConfig::new(dir.path().join("herdbook.db")))
        .await
        .unwrap()
}

#[tokio::test]
async fn schema_init_is_idempotent_and_data_survives_reopen() {
    let dir = TempDir::new().unwrap();

    let db = open(&dir).await;
    let cow = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();
    db.close().await;

    // Second open re-runs migrations against the existing file
    let db = open(&dir).await;
    let (total, applied) = db.migration_status().await.unwrap();
    assert_eq!(total, applied);

    let animal = db.animals().get_by_id(&cow).await.unwrap().unwrap();
    assert_eq!(animal.code, "A1");
    assert_eq!(animal.sync_state(), SyncState::Dirty);
}

#[tokio::test]
async fn wal_mode_is_enabled_on_disk() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir).await;

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    let fks: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(fks, 1);
}

#[tokio::test]
async fn concurrent_upserts_of_one_key_leave_one_row() {
    let dir = TempDir::new().unwrap();
    let db = open(&dir).await;
    let cow = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let repo = db.production();
        let cow = cow.clone();
        handles.push(tokio::spawn(async move {
            repo.upsert(NewProduction::new(cow, d(1), 10.0 + n as f64, 8.0)).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(db.production().count().await.unwrap(), 1);
}

#[tokio::test]
async fn record_lifecycle_dirty_clean_tombstone() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let animals = db.animals();

    // created -> dirty
    let id = animals.create(NewAnimal::new("A1", "Holstein")).await.unwrap();
    let created = animals.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(created.sync_state(), SyncState::Dirty);

    // pushed -> clean
    let marked = animals
        .mark_batch_synced(&[SyncAck::for_record(&created, &id)])
        .await
        .unwrap();
    assert_eq!(marked, 1);
    assert!(animals.get_unsynced().await.unwrap().is_empty());

    // edited with identical values -> dirty again, newer version
    animals
        .update(
            &id,
            AnimalPatch {
                status: Some(AnimalStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let edited = animals.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(edited.sync_state(), SyncState::Dirty);
    assert!(edited.updated_at > created.updated_at);

    // soft-deleted -> dirty tombstone
    animals.soft_delete(&id).await.unwrap();
    let tombstone = animals.get_unsynced().await.unwrap().remove(0);
    assert_eq!(tombstone.sync_state(), SyncState::DirtyTombstone);

    // pushed -> clean tombstone, terminal
    animals
        .mark_batch_synced(&[SyncAck::for_record(&tombstone, &id)])
        .await
        .unwrap();
    assert!(animals.get_unsynced().await.unwrap().is_empty());
    let patch = AnimalPatch {
        breed: Some("Jersey".into()),
        ..Default::default()
    };
    assert!(animals.update(&id, patch).await.unwrap_err().is_not_found());
    assert!(animals.soft_delete(&id).await.is_err());
}

#[tokio::test]
async fn generic_repository_works_for_every_table() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let cow = db.animals().create(NewAnimal::new("A1", "Holstein")).await.unwrap();
    db.production()
        .upsert(NewProduction::new(&cow, d(1), 10.0, 8.0))
        .await
        .unwrap();
    db.expenses()
        .create(NewExpense::new(d(2), ExpenseCategory::Feed, Money::from_cents(5_000)))
        .await
        .unwrap();

    let production: Repository<Production> = db.repository();
    let expenses: Repository<Expense> = db.repository();

    assert_eq!(production.count_unsynced().await.unwrap(), 1);
    assert_eq!(expenses.count_unsynced().await.unwrap(), 1);
    assert_eq!(Production::TABLE, "production");

    let row = production.get_unsynced().await.unwrap().remove(0);
    production.mark_synced(&row.id, &row.id).await.unwrap();
    assert_eq!(production.count_unsynced().await.unwrap(), 0);
    assert_eq!(
        db.production().total_by_range(DateRange::new(d(1), d(31))).await.unwrap(),
        18.0
    );
}
