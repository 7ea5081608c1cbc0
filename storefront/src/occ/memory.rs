//! In-memory commerce backend.
//!
//! Serves a catalog loaded from JSON. Used by the demo binary and by tests:
//! - [`InMemoryBackend::sample`]: the bundled sample catalog
//! - [`InMemoryBackend::with_query_latency`]: slow down one search query, to
//!   make responses arrive out of order
//! - [`InMemoryBackend::fail_next`]: inject failures per operation

use super::backend::{BackendFuture, BackendOperation, CommerceBackend, OccError, SearchQuery};
use super::models::{
    Address, Cart, Country, DeliveryMode, Facet, FacetValue, Pagination, Product, ProductList, Sort,
    Suggestion,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

const SAMPLE_CATALOG: &str = include_str!("../../data/catalog.json");

/// Name of the category facet in search results
pub const CATEGORY_FACET: &str = "Category";

/// Sorts offered with every search result, as `(code, name)`
const SORTS: [(&str, &str); 4] = [
    ("relevance", "Relevance"),
    ("name-asc", "Name (ascending)"),
    ("price-asc", "Price (lowest first)"),
    ("price-desc", "Price (highest first)"),
];

/// Errors loading a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        /// Catalog path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The catalog is not valid JSON of the expected shape
    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Data of one user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserData {
    /// Saved addresses
    pub addresses: Vec<Address>,
    /// Carts, the first is the current one
    pub carts: Vec<Cart>,
}

/// A catalog as stored in JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogData {
    /// Products in relevance order
    pub products: Vec<Product>,
    /// Category names by category code
    pub categories: BTreeMap<String, String>,
    /// Delivery countries
    pub countries: Vec<Country>,
    /// Delivery modes offered for every cart
    pub delivery_modes: Vec<DeliveryMode>,
    /// Users by id
    pub users: BTreeMap<String, UserData>,
}

/// A [`CommerceBackend`] over an in-memory catalog.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    catalog: CatalogData,
    default_latency: Duration,
    query_latency: HashMap<String, Duration>,
    failures: Mutex<HashMap<BackendOperation, VecDeque<OccError>>>,
}

impl InMemoryBackend {
    /// Serve the given catalog.
    #[must_use]
    pub fn new(catalog: CatalogData) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Parse a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] if the JSON does not describe a catalog.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The bundled sample catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled catalog does not parse.
    pub fn sample() -> Result<Self, CatalogError> {
        Self::from_json(SAMPLE_CATALOG)
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Delay searches whose free text is `text` by `latency`.
    #[must_use]
    pub fn with_query_latency(mut self, text: impl Into<String>, latency: Duration) -> Self {
        self.query_latency.insert(text.into(), latency);
        self
    }

    /// Make the next `times` calls of `operation` fail with `error`.
    pub fn fail_next(&self, operation: BackendOperation, error: OccError, times: usize) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures
            .entry(operation)
            .or_default()
            .extend(std::iter::repeat_n(error, times));
    }

    /// The catalog being served.
    #[must_use]
    pub const fn catalog(&self) -> &CatalogData {
        &self.catalog
    }

    async fn call(&self, operation: BackendOperation, latency: Duration) -> Result<(), OccError> {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&operation)
            .and_then(VecDeque::pop_front);

        match injected {
            Some(error) => {
                tracing::debug!(operation = operation.as_str(), %error, "Injected backend failure");
                Err(error)
            },
            None => Ok(()),
        }
    }

    fn user(&self, user_id: &str) -> Result<&UserData, OccError> {
        self.catalog
            .users
            .get(user_id)
            .ok_or_else(|| OccError::NotFound(format!("user {user_id}")))
    }

    fn cart(&self, user_id: &str, cart_id: &str) -> Result<&Cart, OccError> {
        let user = self.user(user_id)?;
        let cart = if cart_id == "current" {
            user.carts.first()
        } else {
            user.carts.iter().find(|c| c.code.as_deref() == Some(cart_id))
        };
        cart.ok_or_else(|| OccError::NotFound(format!("cart {cart_id}")))
    }

    /// Run a search against the catalog.
    #[must_use]
    pub fn search(&self, query: &SearchQuery) -> ProductList {
        let terms: Vec<String> = query
            .text
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let text_matches: Vec<&Product> = self
            .catalog
            .products
            .iter()
            .filter(|p| matches_terms(p, &terms))
            .collect();

        let selected_categories: BTreeSet<&str> = query
            .filters
            .iter()
            .filter(|(key, _)| key == "category")
            .map(|(_, value)| value.as_str())
            .collect();

        let mut matches: Vec<&Product> = text_matches
            .iter()
            .copied()
            .filter(|p| {
                selected_categories.is_empty()
                    || p.categories.iter().any(|c| selected_categories.contains(c.as_str()))
            })
            .collect();

        sort_products(&mut matches, &query.sort);

        let page_size = query.page_size.max(1);
        let total_results = u32::try_from(matches.len()).unwrap_or(u32::MAX);
        let total_pages = total_results.div_ceil(page_size);
        let products = matches
            .iter()
            .skip(query.page.saturating_mul(page_size) as usize)
            .take(page_size as usize)
            .map(|p| (*p).clone())
            .collect();

        ProductList {
            products,
            facets: self.category_facet(query, &text_matches, &selected_categories),
            pagination: Some(Pagination {
                current_page: query.page,
                page_size,
                total_pages,
                total_results,
                sort: Some(query.sort.clone()),
            }),
            sorts: SORTS
                .iter()
                .map(|(code, name)| Sort {
                    code: (*code).to_string(),
                    name: Some((*name).to_string()),
                    selected: *code == query.sort,
                })
                .collect(),
            free_text_search: Some(query.text.clone()),
            current_query: Some(query.to_query_string()),
        }
    }

    /// Category counts over the text matches, ignoring the category filter
    /// so that every category stays selectable.
    fn category_facet(
        &self,
        query: &SearchQuery,
        text_matches: &[&Product],
        selected: &BTreeSet<&str>,
    ) -> Vec<Facet> {
        let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
        for product in text_matches {
            for category in &product.categories {
                *counts.entry(category.as_str()).or_default() += 1;
            }
        }

        if counts.is_empty() {
            return Vec::new();
        }

        let mut values: Vec<FacetValue> = counts
            .into_iter()
            .map(|(code, count)| FacetValue {
                name: self
                    .catalog
                    .categories
                    .get(code)
                    .cloned()
                    .unwrap_or_else(|| code.to_string()),
                count,
                query: query.toggled("category", code).to_query_string(),
                selected: selected.contains(code),
            })
            .collect();
        values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        vec![Facet {
            name: CATEGORY_FACET.to_string(),
            category: true,
            multi_select: true,
            values,
        }]
    }

    fn suggest(&self, term: &str, max: usize) -> Vec<Suggestion> {
        let prefix = term.trim().to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }

        let words: BTreeSet<String> = self
            .catalog
            .products
            .iter()
            .filter_map(|p| p.name.as_deref())
            .flat_map(str::split_whitespace)
            .map(str::to_lowercase)
            .filter(|word| word.starts_with(&prefix))
            .collect();

        words
            .into_iter()
            .take(max)
            .map(|value| Suggestion { value })
            .collect()
    }
}

fn matches_terms(product: &Product, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }

    let haystack = [
        Some(product.code.as_str()),
        product.name.as_deref(),
        product.summary.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    terms.iter().all(|term| haystack.contains(term.as_str()))
}

fn price_of(product: &Product) -> f64 {
    product
        .price
        .as_ref()
        .and_then(|p| p.value)
        .unwrap_or_default()
}

fn sort_products(products: &mut [&Product], sort: &str) {
    match sort {
        "name-asc" => products.sort_by(|a, b| a.name.cmp(&b.name)),
        "price-asc" => products.sort_by(|a, b| price_of(a).total_cmp(&price_of(b))),
        "price-desc" => products.sort_by(|a, b| price_of(b).total_cmp(&price_of(a))),
        _ => {},
    }
}

impl CommerceBackend for InMemoryBackend {
    fn search_products<'a>(&'a self, query: &'a SearchQuery) -> BackendFuture<'a, ProductList> {
        Box::pin(async move {
            let latency = self
                .query_latency
                .get(&query.text)
                .copied()
                .unwrap_or(self.default_latency);
            self.call(BackendOperation::SearchProducts, latency).await?;
            Ok(self.search(query))
        })
    }

    fn product_suggestions<'a>(&'a self, term: &'a str, max: usize) -> BackendFuture<'a, Vec<Suggestion>> {
        Box::pin(async move {
            self.call(BackendOperation::ProductSuggestions, self.default_latency)
                .await?;
            Ok(self.suggest(term, max))
        })
    }

    fn load_addresses<'a>(&'a self, user_id: &'a str) -> BackendFuture<'a, Vec<Address>> {
        Box::pin(async move {
            self.call(BackendOperation::LoadAddresses, self.default_latency)
                .await?;
            Ok(self.user(user_id)?.addresses.clone())
        })
    }

    fn load_cart<'a>(&'a self, user_id: &'a str, cart_id: &'a str) -> BackendFuture<'a, Cart> {
        Box::pin(async move {
            self.call(BackendOperation::LoadCart, self.default_latency).await?;
            self.cart(user_id, cart_id).cloned()
        })
    }

    fn load_supported_delivery_modes<'a>(
        &'a self,
        user_id: &'a str,
        cart_id: &'a str,
    ) -> BackendFuture<'a, Vec<DeliveryMode>> {
        Box::pin(async move {
            self.call(BackendOperation::LoadDeliveryModes, self.default_latency)
                .await?;
            self.cart(user_id, cart_id)?;
            Ok(self.catalog.delivery_modes.clone())
        })
    }

    fn load_delivery_countries(&self) -> BackendFuture<'_, Vec<Country>> {
        Box::pin(async move {
            self.call(BackendOperation::LoadDeliveryCountries, self.default_latency)
                .await?;
            Ok(self.catalog.countries.clone())
        })
    }
}
