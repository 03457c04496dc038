// Integration tests for draining a server render.
// Unit tests for the tracker itself are in src/ssr.rs

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use universal_query::prelude::*;
use universal_query::provider::SERIALIZATION_KEY;

fn provider(api: &MockLink) -> UniversalProvider<impl Fn() -> ClientOptions> {
    let api = api.clone();
    UniversalProvider::new(
        move || ClientOptions::new().with_link(Arc::new(api.clone())),
        ExecutionMode::Server,
        SerializationChannel::new(),
    )
}

fn order() -> Operation {
    Operation::new(&"Order", &"{ order { customer } }")
}

fn customer(id: &Value) -> Operation {
    Operation::new(
        &"Customer",
        &"query Customer($id: ID!) { customer(id: $id) { name } }",
    )
    .with_variables(json!({"id": id}))
}

// Helper: the storefront component, which loads an order and then its customer
fn render_order_page(ctx: &ClientContext) {
    let client = ctx.client().clone();
    ctx.spawn(async move {
        let order = client.query(order()).await?;
        client.query(customer(&order["order"]["customer"])).await
    });
}

fn expected_order_snapshot() -> Value {
    json!({
        "Order": {"order": {"customer": 42}},
        "Customer:{\"id\":42}": {"customer": {"name": "Ada"}},
    })
}

#[tokio::test(start_paused = true)]
async fn test_follow_up_requests_are_captured() {
    let api = MockLink::new()
        .respond(&"Order", json!({"order": {"customer": 42}}))
        .with_latency(&"Order", Duration::from_millis(40))
        .respond(&"Customer", json!({"customer": {"name": "Ada"}}))
        .with_latency(&"Customer", Duration::from_millis(80));

    let server = provider(&api);
    server.render(render_order_page).expect("render");

    server.serialize().await.expect("serialize");
    let snapshot = server.channel().take(SERIALIZATION_KEY).expect("snapshot");
    assert_eq!(snapshot, expected_order_snapshot());
}

#[tokio::test(start_paused = true)]
async fn test_follow_up_from_another_task_is_captured() {
    let api = MockLink::new()
        .respond(&"First", json!(1))
        .with_latency(&"First", Duration::from_millis(10))
        .respond(&"Second", json!(2))
        .with_latency(&"Second", Duration::from_millis(10));

    let server = provider(&api);
    server
        .render(|ctx| {
            let first = ctx.spawn(ctx.client().query(Operation::new(&"First", &"{ first }")));
            let client = ctx.client().clone();
            ctx.spawn(async move {
                if first.await.is_ok() {
                    let _ = client.query(Operation::new(&"Second", &"{ second }")).await;
                }
            });
        })
        .expect("render");

    server.serialize().await.expect("serialize");
    let snapshot = server.channel().take(SERIALIZATION_KEY).expect("snapshot");
    assert_eq!(snapshot, json!({"First": 1, "Second": 2}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_lazy_render_tasks_are_captured_across_workers() {
    let api = MockLink::new()
        .respond(&"Order", json!({"order": {"customer": 42}}))
        .respond(&"Customer", json!({"customer": {"name": "Ada"}}));

    for _ in 0..500 {
        let server = provider(&api);
        server.render(render_order_page).expect("render");

        server.serialize().await.expect("serialize");
        let snapshot = server.channel().take(SERIALIZATION_KEY).expect("snapshot");
        assert_eq!(snapshot, expected_order_snapshot());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_settled_queries_are_in_snapshot_across_workers() {
    let api = MockLink::new().respond(&"Shop", json!({"shop": {"name": "Snowdevil"}}));

    for _ in 0..2000 {
        let server = provider(&api);
        server
            .render(|ctx| tokio::spawn(ctx.client().query(Operation::new(&"Shop", &"{ shop }"))))
            .expect("render");

        server.serialize().await.expect("serialize");
        let snapshot = server.channel().take(SERIALIZATION_KEY).expect("snapshot");
        assert_eq!(snapshot, json!({"Shop": {"shop": {"name": "Snowdevil"}}}));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_requests_from_many_tasks() {
    let api = MockLink::new()
        .respond(&"Item", json!({"item": true}))
        .with_latency(&"Item", Duration::from_millis(1));

    let server = provider(&api);
    server
        .render(|ctx| {
            for task in 0..16_u64 {
                let client = ctx.client().clone();
                ctx.spawn(async move {
                    for index in 0..8_u64 {
                        let id = task * 8 + index;
                        let item = Operation::new(&"Item", &"query Item($id: ID!) { item }")
                            .with_variables(json!({"id": id}));
                        let _ = client.query(item).await;
                    }
                });
            }
        })
        .expect("render");

    server.serialize().await.expect("serialize");
    let written = server.channel().take(SERIALIZATION_KEY).expect("snapshot");
    let snapshot: CacheSnapshot = serde_json::from_value(written).expect("snapshot should decode");
    assert_eq!(snapshot.len(), 128);
    assert_eq!(api.call_count(&"Item"), 128);
}

#[tokio::test]
async fn test_nothing_issued_serializes_empty_snapshot() {
    let api = MockLink::new();
    let server = provider(&api);

    let page = tokio::time::timeout(
        Duration::from_millis(100),
        server.render_to_page(|_| "<p>static</p>"),
    )
    .await
    .expect("drain should not wait")
    .expect("render");

    assert_eq!(page.payload, r#"{"apollo":{}}"#);
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_csrf_token_reaches_terminal_link() {
    let api = MockLink::new().respond(&"Save", json!({"saved": true}));
    let server = provider(&api);

    let save =
        Operation::new(&"Save", &"mutation { save }").with_context(&"csrfToken", json!("t0k3n"));
    server
        .client()
        .expect("client")
        .mutate(save)
        .await
        .expect("mutation");

    let seen = api.operations();
    assert_eq!(
        seen[0].headers.get("X-CSRF-Token").map(String::as_str),
        Some("t0k3n")
    );
}
