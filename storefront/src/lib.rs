//! Storefront state slices on the storefront store runtime.
//!
//! Each logical resource of the storefront (product search, facet navigation,
//! user addresses, delivery countries, the active cart and checkout delivery
//! modes) is an immutable slice with a pure reducer. The application state is
//! the union of the slices and is driven by a single [`app::AppStore`].
//!
//! # Data flow
//!
//! ```text
//! send(action) ──▶ app reducer ──▶ slice reducers ──▶ new AppState ──▶ observers
//!                      │                                                 │
//!                      └── effects (backend calls) ──▶ SUCCESS / FAIL ───┘
//! ```
//!
//! - `*_START` actions return backend calls as effects; product searches are
//!   cancellable per channel and carry a request id.
//! - `*_SUCCESS` actions commit payloads; responses for superseded requests
//!   are dropped.
//! - `*_FAIL` actions reset the slice to its initial value.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront::app::build_store;
//! use storefront::environment::StorefrontEnvironment;
//! use storefront::occ::InMemoryBackend;
//! use storefront::product::ProductSearchAction;
//! use storefront_state_runtime::StoreConfig;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let backend = Arc::new(InMemoryBackend::sample()?);
//! let store = build_store(StorefrontEnvironment::new(backend), StoreConfig::default());
//!
//! store
//!     .send(ProductSearchAction::SearchProducts { query: "camera".into(), auxiliary: false }.into())
//!     .await?;
//! store.wait_idle(std::time::Duration::from_secs(1)).await?;
//!
//! let found = store.state(|s| s.search.results.products.len()).await;
//! # let _ = found;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod environment;
pub mod occ;
pub mod product;
pub mod selectors;
pub mod user;

pub use app::{build_store, AppAction, AppState, AppStore};
pub use config::{ConfigError, StorefrontConfig};
pub use environment::{SearchSettings, StorefrontEnvironment};
