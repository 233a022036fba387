use std::sync::Arc;

use vocab_core::bootstrap::ensure_unit_started;
use vocab_core::model::{LearnerDeck, LearnerId, Rating, UnitId, VocabularyItem, WordId};
use vocab_core::session::{Answer, SessionPolicy};
use vocab_core::time::fixed_now;
use storage::repository::{DeckBackend, StorageError};
use storage::sqlite::SqliteDeckStore;
use storage::{CardStore, InMemoryDeckStore};

fn items(n: usize) -> Vec<VocabularyItem> {
    (0..n)
        .map(|i| VocabularyItem {
            id: WordId::new(format!("u1-{i}")).unwrap(),
            source: format!("palabra {i}"),
            target: format!("word {i}"),
            hint: None,
            image_path: None,
        })
        .collect()
}

fn learner() -> LearnerId {
    LearnerId::new("0xsqlite").unwrap()
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_session_fields() {
    let store = SqliteDeckStore::open("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("open");

    let mut deck = LearnerDeck::new(learner(), fixed_now());
    ensure_unit_started(&mut deck, UnitId::FIRST, &items(3), fixed_now());
    let word = deck.cards()[0].word_id.clone();
    SessionPolicy::default()
        .record_answer(&mut deck, &Answer::from_rating(word.clone(), Rating::GotBoth), fixed_now())
        .unwrap();

    store.save(&deck).await.unwrap();
    let loaded = store.load(&learner()).await.unwrap().expect("stored deck");

    assert_eq!(loaded, deck);
    let card = loaded.card(&word).unwrap();
    assert_eq!(card.repetitions, 2);
    assert!(card.actual_next_review.is_some());
    assert_eq!(loaded.xp(), 5);
}

#[tokio::test]
async fn sqlite_upsert_replaces_previous_payload() {
    let store = SqliteDeckStore::open("sqlite:file:memdb_upsert?mode=memory&cache=shared")
        .await
        .expect("open");

    let mut deck = LearnerDeck::new(learner(), fixed_now());
    store.save(&deck).await.unwrap();
    ensure_unit_started(&mut deck, UnitId::FIRST, &items(4), fixed_now());
    store.save(&deck).await.unwrap();

    let loaded = store.load(&learner()).await.unwrap().unwrap();
    assert_eq!(loaded.cards().len(), 4);

    let row: (i64, i64) = sqlx::query_as(
        "SELECT card_count, xp FROM learner_decks WHERE learner_id = ?1",
    )
    .bind(learner().as_str())
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(row, (4, 0));
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let store = SqliteDeckStore::open("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("open");
    store.migrate().await.expect("second migrate");
    store.migrate().await.expect("third migrate");

    let (versions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(versions, 1);
}

#[tokio::test]
async fn sqlite_corrupt_payload_is_reported_and_replaced() {
    let store = SqliteDeckStore::open("sqlite:file:memdb_corrupt?mode=memory&cache=shared")
        .await
        .expect("open");

    sqlx::query(
        r"
        INSERT INTO learner_decks (learner_id, payload, xp, card_count, completed_units, updated_at)
        VALUES (?1, 'not json', 0, 0, 0, '2023-11-14T22:13:20Z')
        ",
    )
    .bind(learner().as_str())
    .execute(store.pool())
    .await
    .unwrap();

    assert!(matches!(
        store.load(&learner()).await,
        Err(StorageError::Corrupt(_))
    ));

    let cards = CardStore::new(Arc::new(store.clone()));
    let fresh = cards.load_or_create(&learner(), fixed_now()).await.unwrap();
    assert!(fresh.cards().is_empty());
    cards.save(&fresh).await.unwrap();
    assert_eq!(store.load(&learner()).await.unwrap(), Some(fresh));
}

#[tokio::test]
async fn sqlite_local_with_in_memory_remote() {
    let local = SqliteDeckStore::open("sqlite:file:memdb_pair?mode=memory&cache=shared")
        .await
        .expect("open");
    let remote = InMemoryDeckStore::new();
    let cards = CardStore::new(Arc::new(local.clone())).with_remote(Arc::new(remote.clone()));

    let mut deck = cards.load_or_create(&learner(), fixed_now()).await.unwrap();
    ensure_unit_started(&mut deck, UnitId::FIRST, &items(2), fixed_now());
    let outcome = cards.save(&deck).await.unwrap();
    assert!(outcome.remote_error.is_none());

    cards.reset(&learner()).await.unwrap();
    assert_eq!(local.load(&learner()).await.unwrap(), None);
    assert!(remote.is_empty().unwrap());
}
