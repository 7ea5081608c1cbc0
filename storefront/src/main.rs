//! Storefront state demo.
//!
//! Drives the storefront slices against the in-memory commerce backend: a
//! product search with suggestions, the user's addresses and cart, and the
//! checkout review.

use anyhow::Context;
use std::sync::Arc;
use storefront::app::build_store;
use storefront::cart::CartAction;
use storefront::checkout::delivery_modes::DeliveryModesAction;
use storefront::checkout::review::{shipping_address_card, shipping_method_card, ReviewSubmit};
use storefront::config::StorefrontConfig;
use storefront::environment::StorefrontEnvironment;
use storefront::occ::InMemoryBackend;
use storefront::product::ProductSearchAction;
use storefront::selectors;
use storefront::user::UserAddressesAction;
use storefront_state_runtime::metrics::MetricsRecorder;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USER: &str = "current";
const CART: &str = "current";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StorefrontConfig::from_env().context("Invalid storefront configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(?config, "Configuration loaded");

    let backend = match &config.catalog_path {
        Some(path) => InMemoryBackend::from_path(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?,
        None => InMemoryBackend::sample().context("Failed to load the bundled catalog")?,
    };

    let mut metrics = MetricsRecorder::new();
    match config.metrics_addr {
        Some(addr) => metrics.serve(addr)?,
        None => metrics.install()?,
    }

    let environment = StorefrontEnvironment::new(Arc::new(backend))
        .with_retry(config.retry_policy())
        .with_search(config.search_settings());
    let store = build_store(environment, config.store_config());
    let timeout = config.store_config().shutdown_timeout;

    info!("Searching products");
    store
        .send(
            ProductSearchAction::SearchProducts {
                query: "lens:relevance".into(),
                auxiliary: false,
            }
            .into(),
        )
        .await?;
    store
        .send(ProductSearchAction::GetProductSuggestions { term: "tr".into() }.into())
        .await?;

    info!("Loading user data");
    store
        .send(UserAddressesAction::LoadUserAddresses { user_id: USER.into() }.into())
        .await?;
    store
        .send(
            CartAction::LoadCart {
                user_id: USER.into(),
                cart_id: CART.into(),
            }
            .into(),
        )
        .await?;
    store.wait_idle(timeout).await?;

    let state = store.snapshot();
    info!(
        products = selectors::search_results(&state).products.len(),
        suggestions = selectors::product_suggestions(&state).len(),
        addresses = selectors::addresses(&state).len(),
        cart_items = selectors::mini_cart_summary(&state).total_items,
        "Storefront loaded"
    );

    let delivery_address = selectors::addresses(&state)
        .into_iter()
        .find(|address| address.default_address)
        .context("The user has no default address")?;

    store
        .send(DeliveryModesAction::SetDeliveryMode("standard-gross".into()).into())
        .await?;

    info!("Opening checkout review");
    let mut review = ReviewSubmit::open(&store, &delivery_address, USER, CART).await?;
    let details = review
        .wait_for(|details| details.delivery_mode.is_some() && details.country_name.is_some(), timeout)
        .await?;

    println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
    println!(
        "{}",
        serde_json::to_string_pretty(&shipping_address_card(&delivery_address, details.country_name.as_deref()))?
    );
    if let Some(mode) = &details.delivery_mode {
        println!("{}", serde_json::to_string_pretty(&shipping_method_card(mode))?);
    }

    store.shutdown(timeout).await?;

    if let Some(rendered) = metrics.render() {
        println!("{rendered}");
    }
    info!("Storefront demo finished");
    Ok(())
}
