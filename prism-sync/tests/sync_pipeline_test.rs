//! End-to-end synchronizer behaviour over in-memory stores: ordered
//! application, replay tolerance, divergence detection and restart
//! resume.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prism_domain::{Address, AssetKey, ChainEvent, Fact, OrderId, UserTokenId};
use prism_engine::{ClaimValidator, Engine, FeeSchedule};
use prism_store::{CheckpointStore, FactLog, MemoryCheckpointStore, MemoryFactLog};
use prism_sync::{run, EventEnvelope, EventId, EventPosition, EventSource, SyncError, Synchronizer};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn asset() -> AssetKey {
    AssetKey { contract: addr("0xc0ffee"), asset_id: 1 }
}

fn engine() -> Arc<RwLock<Engine>> {
    Arc::new(RwLock::new(Engine::new(
        FeeSchedule::free(addr("0xfee")),
        Box::new(ClaimValidator::new(["erc1155"])),
    )))
}

fn envelope(block: u64, index: u32, event: ChainEvent) -> EventEnvelope {
    EventEnvelope {
        id: EventId {
            tx_hash: format!("0x{block:02x}{index:02x}"),
            log_index: index,
        },
        position: EventPosition { block, index },
        occurred_at: DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
        event,
    }
}

fn projected(block: u64, index: u32, owner: &str) -> EventEnvelope {
    envelope(
        block,
        index,
        ChainEvent::Projected {
            owner: addr(owner),
            amount: dec!(5),
            verification: Some(json!({"amount": "5", "standard": "erc1155"})),
        },
    )
}

fn order_created(block: u64, index: u32, order_id: u64) -> EventEnvelope {
    envelope(
        block,
        index,
        ChainEvent::OrderCreated {
            order_id: OrderId(order_id),
            asset: asset(),
            seller: addr("0x5e11e4"),
            amount: dec!(10),
            price_per_asset: dec!(2),
            maker_fee_bp: 0,
            taker_fee_bp: 0,
            creation_fee_paid: dec!(0),
        },
    )
}

async fn synchronizer(
    engine: Arc<RwLock<Engine>>,
) -> (
    Synchronizer<Arc<MemoryCheckpointStore>, Arc<MemoryFactLog>>,
    Arc<MemoryCheckpointStore>,
    Arc<MemoryFactLog>,
) {
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let facts = Arc::new(MemoryFactLog::new());
    let sync = Synchronizer::resume(engine, Arc::clone(&checkpoints), Arc::clone(&facts))
        .await
        .unwrap();
    (sync, checkpoints, facts)
}

#[tokio::test]
async fn applies_batch_and_persists_cursor_and_facts() {
    let engine = engine();
    let (mut sync, checkpoints, facts) = synchronizer(Arc::clone(&engine)).await;

    let batch = vec![projected(1, 0, "0xa11ce"), order_created(1, 1, 1)];
    let stats = sync.apply_batch(&batch).await.unwrap();
    assert_eq!(stats.applied, 2);
    assert_eq!(stats.replayed, 0);

    let cursor = checkpoints.load().await.unwrap().unwrap();
    assert_eq!((cursor.block, cursor.index), (1, 1));

    let records = facts.list_since(0).await.unwrap();
    assert!(records
        .iter()
        .any(|r| matches!(r.fact, Fact::Projected { .. })));
    assert!(records
        .iter()
        .any(|r| matches!(r.fact, Fact::OrderCreated { .. })));

    let engine = engine.read().await;
    assert!(engine
        .projection(&addr("0xa11ce"), UserTokenId(1))
        .is_some());
    assert!(engine.order(OrderId(1)).is_some());
}

#[tokio::test]
async fn redelivered_batch_is_a_no_op() {
    let engine = engine();
    let (mut sync, _, facts) = synchronizer(Arc::clone(&engine)).await;

    let batch = vec![projected(1, 0, "0xa11ce"), projected(1, 1, "0xa11ce")];
    sync.apply_batch(&batch).await.unwrap();
    let appended = facts.len();

    let stats = sync.apply_batch(&batch).await.unwrap();
    assert_eq!(stats.applied, 0);
    assert_eq!(stats.replayed, 2);
    assert_eq!(facts.len(), appended);

    // No extra ids were allocated by the replay.
    let engine = engine.read().await;
    assert_eq!(engine.owner_projections(&addr("0xa11ce")).len(), 2);
}

#[tokio::test]
async fn divergent_replay_at_cursor_faults() {
    let (mut sync, _, _) = synchronizer(engine()).await;

    sync.apply_batch(&[projected(1, 0, "0xa11ce")]).await.unwrap();

    // Same position, different content.
    let err = sync
        .apply_batch(&[projected(1, 0, "0xb0b")])
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::DivergentReplay { .. }));
}

#[tokio::test]
async fn out_of_order_batch_faults_after_the_ordered_prefix() {
    let engine = engine();
    let (mut sync, checkpoints, _) = synchronizer(Arc::clone(&engine)).await;

    let batch = vec![
        projected(2, 0, "0xa11ce"),
        projected(2, 2, "0xa11ce"),
        projected(2, 1, "0xa11ce"),
    ];
    let err = sync.apply_batch(&batch).await.unwrap_err();
    assert!(matches!(err, SyncError::OutOfOrder { .. }));

    // The ordered prefix was applied; the cursor was not persisted for
    // the failed batch.
    assert_eq!(engine.read().await.owner_projections(&addr("0xa11ce")).len(), 2);
    assert!(checkpoints.load().await.unwrap().is_none());
}

#[tokio::test]
async fn rejected_content_is_absorbed_and_the_stream_continues() {
    let engine = engine();
    let (mut sync, _, facts) = synchronizer(Arc::clone(&engine)).await;

    // A burn for a projection this mirror has never seen, followed by a
    // normal event. The burn advances the cursor but emits nothing.
    let batch = vec![
        envelope(
            3,
            0,
            ChainEvent::Burned {
                owner: addr("0xa11ce"),
                user_token_id: UserTokenId(9),
                amount: dec!(1),
            },
        ),
        projected(3, 1, "0xa11ce"),
    ];
    let stats = sync.apply_batch(&batch).await.unwrap();
    assert_eq!(stats.applied, 2);

    let records = facts.list_since(0).await.unwrap();
    assert!(records.iter().all(|r| !matches!(r.fact, Fact::Burned { .. })));
    assert_eq!(sync.cursor().unwrap().block, 3);
}

#[tokio::test]
async fn restart_resumes_from_persisted_cursor() {
    let engine = engine();
    let checkpoints = Arc::new(MemoryCheckpointStore::new());
    let facts = Arc::new(MemoryFactLog::new());

    let batch = vec![projected(1, 0, "0xa11ce"), order_created(1, 1, 1)];
    {
        let mut sync = Synchronizer::resume(
            Arc::clone(&engine),
            Arc::clone(&checkpoints),
            Arc::clone(&facts),
        )
        .await
        .unwrap();
        sync.apply_batch(&batch).await.unwrap();
    }

    // Fresh synchronizer over the same stores: redelivery of the full
    // batch replays cleanly, and only genuinely new events apply.
    let mut sync = Synchronizer::resume(
        Arc::clone(&engine),
        Arc::clone(&checkpoints),
        Arc::clone(&facts),
    )
    .await
    .unwrap();
    let mut redelivery = batch.clone();
    redelivery.push(order_created(2, 0, 2));
    let stats = sync.apply_batch(&redelivery).await.unwrap();
    assert_eq!(stats.replayed, 2);
    assert_eq!(stats.applied, 1);
    assert!(engine.read().await.order(OrderId(2)).is_some());
}

struct ScriptedSource {
    batches: Vec<Vec<EventEnvelope>>,
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<EventEnvelope>>, SyncError> {
        if self.batches.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.batches.remove(0)))
        }
    }
}

#[tokio::test]
async fn run_drains_a_source_to_exhaustion() {
    let engine = engine();
    let (mut sync, checkpoints, _) = synchronizer(Arc::clone(&engine)).await;

    let mut source = ScriptedSource {
        batches: vec![
            vec![projected(1, 0, "0xa11ce")],
            vec![order_created(2, 0, 1)],
        ],
    };
    run(&mut sync, &mut source).await.unwrap();

    let cursor = checkpoints.load().await.unwrap().unwrap();
    assert_eq!(cursor.block, 2);
    assert!(engine.read().await.order(OrderId(1)).is_some());
}
