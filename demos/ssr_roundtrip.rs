//! Example demonstrating a server render followed by client hydration.
//!
//! The server pass renders a page whose components issue two queries, one of
//! which triggers a follow-up. The provider drains all three before writing
//! the cache snapshot. The client pass restores that snapshot and renders the
//! same tree without touching the network.
//!
//! # Running the example
//!
//! ```bash
//! RUST_LOG=universal_query=debug cargo run --example ssr_roundtrip
//! ```

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use universal_query::prelude::*;

fn api() -> MockLink {
    MockLink::new()
        .respond(&"Shop", json!({"shop": {"name": "Snowdevil", "featured": 3}}))
        .with_latency(&"Shop", Duration::from_millis(120))
        .respond(&"Product", json!({"product": {"title": "Snowboard", "price": 610}}))
        .with_latency(&"Product", Duration::from_millis(80))
        .respond(&"Viewer", json!({"viewer": null}))
        .with_latency(&"Viewer", Duration::from_millis(40))
}

fn shop() -> Operation {
    Operation::new(&"Shop", &"{ shop { name featured } }")
}

fn product(id: &Value) -> Operation {
    Operation::new(&"Product", &"query Product($id: ID!) { product(id: $id) { title price } }")
        .with_variables(json!({"id": id}))
}

fn viewer() -> Operation {
    Operation::new(&"Viewer", &"{ viewer { name } }")
}

// Components: the header shows the viewer, the storefront shows the shop and
// then its featured product.
fn render_page(ctx: &ClientContext) -> String {
    let client = ctx.client().clone();
    ctx.spawn(async move {
        let shop = client.query(shop()).await?;
        client.query(product(&shop["shop"]["featured"])).await
    });
    ctx.spawn(ctx.client().query(viewer()));

    "<header></header><main id=\"storefront\"></main>".to_string()
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let network = api();

    // Server pass
    let link = network.clone();
    let server = UniversalProvider::new(
        move || ClientOptions::new().with_link(Arc::new(link.clone())).with_name(&"storefront"),
        ExecutionMode::Server,
        SerializationChannel::new(),
    );
    let page = server.render_to_page(render_page).await?;
    println!("server body:    {}", page.body);
    println!("server payload: {}", page.payload);
    println!("network calls:  {}", network.total_calls());

    // Client pass. Without UNIVERSAL_QUERY_MODE set, the host oracle reports
    // a client context.
    let link = network.clone();
    let browser = UniversalProvider::new(
        move || ClientOptions::new().with_link(Arc::new(link.clone())).with_name(&"storefront"),
        HostOracle::new(),
        SerializationChannel::from_payload(&page.payload),
    );
    let client = browser.client()?;
    let shop = client.query(shop()).await?;
    let featured = client
        .query_with_policy(product(&shop["shop"]["featured"]), FetchPolicy::CacheOnly)
        .await?;
    println!("client shop:    {shop}");
    println!("client product: {featured}");

    if network.total_calls() != 3 {
        return Err(eyre!("client pass went to the network"));
    }

    // A toast hides itself after a delay, unless the page is left first.
    let lifetime = Lifetime::new();
    let hide_toast =
        DelayedCallback::new(|| println!("toast hidden"), Duration::from_millis(200), &lifetime);
    let first = hide_toast.trigger();
    tokio::time::sleep(Duration::from_millis(250)).await;
    let second = hide_toast.trigger();
    lifetime.teardown();
    println!("toast timers fired: {} {}", first.await?, second.await?);

    Ok(())
}
