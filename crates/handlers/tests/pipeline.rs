//! End-to-end derivation tests: built-in handlers, pipeline and memory store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use karscan_core::models::{BlockContext, EntityKind, Record, Transfer, TxHash};
use karscan_core::ports::{ExtrinsicRef, Phase, RawArg, RawEvent, RawExtrinsic, RecordStore};
use karscan_core::services::{EventPhasePolicy, Pipeline, PipelineConfig};
use karscan_core::token::TracingDiagnostics;
use karscan_handlers::{HandlerConfig, default_registry};
use karscan_storage::MemoryStore;

fn pipeline(store: Arc<MemoryStore>) -> Pipeline {
    let handlers = default_registry(HandlerConfig::default(), Arc::new(TracingDiagnostics));
    Pipeline::new(
        PipelineConfig {
            event_phase: EventPhasePolicy::ApplyExtrinsicOnly,
        },
        store,
        Arc::new(handlers),
    )
}

fn block(number: u64) -> BlockContext {
    BlockContext::new(number, Utc.timestamp_millis_opt(1_650_000_000_000).single())
}

fn event(index: u32, module: &str, method: &str, data: Value) -> RawEvent {
    RawEvent {
        index,
        module: module.into(),
        method: method.into(),
        data,
        phase: Phase::ApplyExtrinsic(0),
        extrinsic: Some(ExtrinsicRef {
            hash: TxHash([0x01; 32]),
            success: true,
        }),
    }
}

fn balances_transfer(success: bool) -> RawExtrinsic {
    RawExtrinsic {
        hash: TxHash([0x02; 32]),
        index: 4,
        signer: Some("A".into()),
        module: "balances".into(),
        method: "transfer".into(),
        args: vec![
            RawArg {
                name: "dest".into(),
                value: json!("B"),
            },
            RawArg {
                name: "value".into(),
                value: json!("1000000000000000000000000000000000000000"),
            },
        ],
        success,
        events: vec![
            event(10, "balances", "Withdraw", json!(["A", "12"])),
            event(11, "system", "NewAccount", json!(["B"])),
            event(
                12,
                "balances",
                "Transfer",
                json!(["A", "B", "1000000000000000000000000000000000000000"]),
            ),
        ],
    }
}

async fn transfer(store: &MemoryStore, id: &str) -> Transfer {
    match store.get(EntityKind::Transfer, id).await.unwrap() {
        Some(Record::Transfer(t)) => t,
        other => panic!("expected transfer {id}, got {other:?}"),
    }
}

#[tokio::test]
async fn deposit_creates_transfer_and_recipient() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let ev = event(3, "currencies", "Deposited", json!([{"token": "KSM"}, "Bob", "500"]));
    let outcome = pipeline.on_event(&ev, &block(100)).await.unwrap();

    assert_eq!(outcome.transfers, 1);
    assert_eq!(outcome.events, 1);
    assert_eq!(outcome.accounts, 1);

    let t = transfer(&store, "100-3").await;
    assert_eq!(t.token, "KSM");
    assert_eq!(t.amount.as_str(), "500");
    assert_eq!(t.to.as_str(), "Bob");
    assert!(t.from.is_none());
    assert!(t.timestamp.is_some());
    assert!(store.exists(EntityKind::Account, "Bob").await.unwrap());
}

#[tokio::test]
async fn wide_numeric_amount_is_kept() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let data: Value =
        serde_json::from_str(r#"[{"token":"KSM"},"Bob",100000000000000000000]"#).unwrap();
    let ev = event(7, "currencies", "Deposited", data);
    let outcome = pipeline.on_event(&ev, &block(100)).await.unwrap();

    assert_eq!(outcome.transfers, 1);
    assert_eq!(outcome.skipped, 0);
    let t = transfer(&store, "100-7").await;
    assert_eq!(t.amount.as_str(), "100000000000000000000");
}

#[tokio::test]
async fn lp_token_transfer() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let ev = event(
        1,
        "currencies",
        "Transferred",
        json!([{"dexShare": [{"token": "KAR"}, {"token": "KUSD"}]}, "Alice", "Bob", "10"]),
    );
    pipeline.on_event(&ev, &block(200)).await.unwrap();

    let t = transfer(&store, "200-1").await;
    assert_eq!(t.token, "KAR<>KUSD LP");
    assert_eq!(t.from.unwrap().as_str(), "Alice");
    assert_eq!(store.count(EntityKind::Account).await, 2);
}

#[tokio::test]
async fn embedded_native_transfer() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let outcome = pipeline
        .on_extrinsic(&balances_transfer(true), &block(300))
        .await
        .unwrap();

    assert_eq!(outcome.extrinsics, 1);
    assert_eq!(outcome.transfers, 1);
    // Sender A and recipient B
    assert_eq!(outcome.accounts, 2);

    let t = transfer(&store, "300-4-2").await;
    assert_eq!(t.token, "KAR");
    assert_eq!(t.amount.as_str(), "1000000000000000000000000000000000000000");
    assert_eq!(t.tx_hash, Some(TxHash([0x02; 32])));

    let key = TxHash([0x02; 32]).to_hex();
    let Some(Record::Extrinsic(ext)) = store.get(EntityKind::Extrinsic, &key).await.unwrap() else {
        panic!("extrinsic missing");
    };
    assert_eq!(ext.arg_names.len(), ext.args.len());
    assert_eq!(ext.arg_names, vec!["dest", "value"]);
    assert_eq!(ext.args[0], "B");
    assert_eq!(ext.block_position, "300-4");
    assert!(ext.success);
}

#[tokio::test]
async fn failed_extrinsic_has_no_transfer() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let outcome = pipeline
        .on_extrinsic(&balances_transfer(false), &block(300))
        .await
        .unwrap();

    assert_eq!(outcome.extrinsics, 1);
    assert_eq!(outcome.transfers, 0);
    assert_eq!(store.count(EntityKind::Transfer).await, 0);
    // The signer is still recorded
    assert_eq!(store.count(EntityKind::Account).await, 1);
}

#[tokio::test]
async fn replay_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());
    let ev = event(
        7,
        "currencies",
        "Transferred",
        json!([{"token": "KUSD"}, "Alice", "Bob", "42"]),
    );
    let ext = balances_transfer(true);

    pipeline.on_extrinsic(&ext, &block(9)).await.unwrap();
    pipeline.on_event(&ev, &block(9)).await.unwrap();
    let writes = store.writes();

    let again_ext = pipeline.on_extrinsic(&ext, &block(9)).await.unwrap();
    let again_ev = pipeline.on_event(&ev, &block(9)).await.unwrap();

    assert_eq!(store.writes(), writes);
    assert_eq!(again_ext.written() + again_ev.written(), 0);
    assert!(again_ext.duplicates > 0);
    assert!(again_ev.duplicates > 0);
}

#[tokio::test]
async fn shared_account_created_once() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    for index in 0..5 {
        let ev = event(
            index,
            "currencies",
            "Transferred",
            json!([{"token": "KAR"}, "Alice", "Bob", "1"]),
        );
        pipeline.on_event(&ev, &block(1)).await.unwrap();
    }

    assert_eq!(store.count(EntityKind::Transfer).await, 5);
    assert_eq!(store.count(EntityKind::Account).await, 2);
}

#[tokio::test]
async fn malformed_currency_skips_transfer_only() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let ev = event(2, "currencies", "Deposited", json!(["{not json", "Bob", "1"]));
    let outcome = pipeline.on_event(&ev, &block(5)).await.unwrap();

    assert_eq!(outcome.skipped, 1);
    assert_eq!(store.count(EntityKind::Transfer).await, 0);
    assert!(store.exists(EntityKind::Event, "5-2").await.unwrap());
}

#[tokio::test]
async fn unrecognized_currency_uses_placeholder() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let ev = event(0, "Currencies", "Deposited", json!([{"stableAsset": 1}, "Bob", "3"]));
    pipeline.on_event(&ev, &block(6)).await.unwrap();

    assert_eq!(transfer(&store, "6-0").await.token, "??");
}

#[tokio::test]
async fn unhandled_module_only_records_event() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(store.clone());

    let ev = event(0, "system", "ExtrinsicSuccess", json!([]));
    let outcome = pipeline.on_event(&ev, &block(8)).await.unwrap();

    assert_eq!(outcome.events, 1);
    assert_eq!(outcome.transfers, 0);
    assert_eq!(store.writes(), 1);
}
