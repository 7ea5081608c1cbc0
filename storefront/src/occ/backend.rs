//! The commerce backend seam.
//!
//! Reducers never call the backend. Start actions return an effect that
//! holds an `Arc<dyn CommerceBackend>` from the environment and turns the
//! call's outcome into a success or fail action.

use super::models::{Address, Cart, Country, DeliveryMode, ProductList, Suggestion};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the commerce backend.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OccError {
    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to access the resource
    #[error("Unauthorized")]
    Unauthorized,

    /// The backend could not answer right now
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something that could not be understood
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl OccError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Future returned by backend calls.
pub type BackendFuture<'a, T> = BoxFuture<'a, Result<T, OccError>>;

/// The backend operations, for logging and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendOperation {
    /// `search_products`
    SearchProducts,
    /// `product_suggestions`
    ProductSuggestions,
    /// `load_addresses`
    LoadAddresses,
    /// `load_cart`
    LoadCart,
    /// `load_supported_delivery_modes`
    LoadDeliveryModes,
    /// `load_delivery_countries`
    LoadDeliveryCountries,
}

impl BackendOperation {
    /// Operation name used in logs and retry metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchProducts => "search_products",
            Self::ProductSuggestions => "product_suggestions",
            Self::LoadAddresses => "load_addresses",
            Self::LoadCart => "load_cart",
            Self::LoadDeliveryModes => "load_supported_delivery_modes",
            Self::LoadDeliveryCountries => "load_delivery_countries",
        }
    }
}

/// A product search request.
///
/// The query string uses the storefront query syntax:
/// `free text[:sort[:key:value]...]`, e.g. `camera:price-asc:category:576`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free text part
    pub text: String,
    /// Sort code, `relevance` when absent
    pub sort: String,
    /// `key:value` filters in query order
    pub filters: Vec<(String, String)>,
    /// Zero-based page
    pub page: u32,
    /// Products per page
    pub page_size: u32,
}

impl SearchQuery {
    /// Default sort code
    pub const RELEVANCE: &'static str = "relevance";

    /// Parse a storefront query for the first page.
    ///
    /// A trailing key without a value is ignored.
    #[must_use]
    pub fn parse(raw: &str, page_size: u32) -> Self {
        let mut parts = raw.split(':');
        let text = parts.next().unwrap_or_default().trim().to_string();
        let sort = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(Self::RELEVANCE)
            .to_string();

        let rest: Vec<&str> = parts.collect();
        let filters = rest
            .chunks_exact(2)
            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
            .collect();

        Self {
            text,
            sort,
            filters,
            page: 0,
            page_size,
        }
    }

    /// Select a page.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// The filter value for `key`, if any.
    #[must_use]
    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render back to the query syntax.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut out = format!("{}:{}", self.text, self.sort);
        for (key, value) in &self.filters {
            out.push(':');
            out.push_str(key);
            out.push(':');
            out.push_str(value);
        }
        out
    }

    /// This query with `key:value` toggled: removed when present, added otherwise.
    #[must_use]
    pub fn toggled(&self, key: &str, value: &str) -> Self {
        let mut next = self.clone();
        let before = next.filters.len();
        next.filters.retain(|(k, v)| !(k == key && v == value));
        if next.filters.len() == before {
            next.filters.push((key.to_string(), value.to_string()));
        }
        next.page = 0;
        next
    }
}

/// A commerce backend (the OCC REST API, or a stand-in).
///
/// Object safe: every method returns a boxed future borrowing `self`.
pub trait CommerceBackend: Send + Sync {
    /// Search the catalog.
    fn search_products<'a>(&'a self, query: &'a SearchQuery) -> BackendFuture<'a, ProductList>;

    /// Suggest search terms starting with `term`, at most `max`.
    fn product_suggestions<'a>(&'a self, term: &'a str, max: usize) -> BackendFuture<'a, Vec<Suggestion>>;

    /// Addresses of a user.
    fn load_addresses<'a>(&'a self, user_id: &'a str) -> BackendFuture<'a, Vec<Address>>;

    /// A cart of a user.
    fn load_cart<'a>(&'a self, user_id: &'a str, cart_id: &'a str) -> BackendFuture<'a, Cart>;

    /// Delivery modes the cart can use.
    fn load_supported_delivery_modes<'a>(
        &'a self,
        user_id: &'a str,
        cart_id: &'a str,
    ) -> BackendFuture<'a, Vec<DeliveryMode>>;

    /// Countries the store delivers to.
    fn load_delivery_countries(&self) -> BackendFuture<'_, Vec<Country>>;
}
