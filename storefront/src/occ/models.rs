//! Commerce API (OCC) payload types.
//!
//! These mirror the JSON the commerce backend returns: camelCase keys and
//! mostly optional fields. Missing fields deserialize to their defaults, so
//! an empty object `{}` is a valid value of every type here.

use serde::{Deserialize, Serialize};

/// A price as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Price {
    /// ISO 4217 currency code
    pub currency_iso: Option<String>,
    /// Numeric value
    pub value: Option<f64>,
    /// Display value, e.g. `$999.98`
    pub formatted_value: Option<String>,
}

impl Price {
    /// A USD price with a `$` formatted value.
    #[must_use]
    pub fn usd(value: f64) -> Self {
        Self {
            currency_iso: Some("USD".to_string()),
            value: Some(value),
            formatted_value: Some(format!("${value:.2}")),
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    /// Product code (SKU)
    pub code: String,
    /// Display name
    pub name: Option<String>,
    /// One-line summary
    pub summary: Option<String>,
    /// Long description
    pub description: Option<String>,
    /// Unit price
    pub price: Option<Price>,
    /// Codes of the categories this product belongs to
    pub categories: Vec<String>,
    /// Units in stock
    pub stock_level: Option<u32>,
}

/// One value of a facet, with the query that toggles it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacetValue {
    /// Display name
    pub name: String,
    /// Number of matching products
    pub count: u32,
    /// Search query that applies (or removes) this value
    pub query: String,
    /// Whether the value is part of the current query
    pub selected: bool,
}

/// A facet of a search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Facet {
    /// Facet name, unique within a result
    pub name: String,
    /// Whether this is the category facet
    pub category: bool,
    /// Whether several values can be selected at once
    pub multi_select: bool,
    /// Values in display order
    pub values: Vec<FacetValue>,
}

/// Paging information of a search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    /// Zero-based page index
    pub current_page: u32,
    /// Products per page
    pub page_size: u32,
    /// Number of pages
    pub total_pages: u32,
    /// Number of matching products
    pub total_results: u32,
    /// Sort code in effect
    pub sort: Option<String>,
}

/// A sort option offered with a search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sort {
    /// Sort code, e.g. `price-asc`
    pub code: String,
    /// Display name
    pub name: Option<String>,
    /// Whether this sort is in effect
    pub selected: bool,
}

/// A page of product search results.
///
/// The default value is the empty result `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductList {
    /// Products of this page
    pub products: Vec<Product>,
    /// Facets over all matching products
    pub facets: Vec<Facet>,
    /// Paging information
    pub pagination: Option<Pagination>,
    /// Available sorts
    pub sorts: Vec<Sort>,
    /// Free text part of the query
    pub free_text_search: Option<String>,
    /// The full query that produced this result
    pub current_query: Option<String>,
}

impl ProductList {
    /// Whether this is the empty result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A search term suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Suggestion {
    /// Suggested term
    pub value: String,
}

/// A country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Country {
    /// ISO 3166-1 code
    pub isocode: String,
    /// Display name
    pub name: Option<String>,
}

/// A region (state, prefecture) of a country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Region {
    /// ISO 3166-2 code, e.g. `JP-27`
    pub isocode: String,
    /// Display name
    pub name: Option<String>,
}

/// A postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    /// Address id
    pub id: Option<String>,
    /// Title code, e.g. `mr`
    pub title_code: Option<String>,
    /// First name
    pub first_name: Option<String>,
    /// Last name
    pub last_name: Option<String>,
    /// First address line
    pub line1: Option<String>,
    /// Second address line
    pub line2: Option<String>,
    /// Town or city
    pub town: Option<String>,
    /// Region
    pub region: Option<Region>,
    /// Postal code
    pub postal_code: Option<String>,
    /// Country
    pub country: Option<Country>,
    /// Phone number
    pub phone: Option<String>,
    /// Whether this is the default address
    pub default_address: bool,
}

/// A promotion attached to a cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromotionResult {
    /// Display text
    pub description: Option<String>,
}

/// One line of a cart or order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderEntry {
    /// Position in the cart
    pub entry_number: u32,
    /// Units ordered
    pub quantity: u32,
    /// Ordered product
    pub product: Option<Product>,
    /// Line total
    pub total_price: Option<Price>,
}

/// A shopping cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cart {
    /// Cart code
    pub code: Option<String>,
    /// Cart guid (for anonymous carts)
    pub guid: Option<String>,
    /// Number of units over all entries
    pub total_items: u32,
    /// Total before delivery
    pub sub_total: Option<Price>,
    /// Total including delivery
    pub total_price: Option<Price>,
    /// Cart lines
    pub entries: Vec<OrderEntry>,
    /// Promotions the cart could still qualify for
    pub potential_product_promotions: Vec<PromotionResult>,
}

/// A delivery mode offered for a cart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryMode {
    /// Mode code, e.g. `standard-gross`
    pub code: String,
    /// Display name
    pub name: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Delivery cost
    pub delivery_cost: Option<Price>,
}

/// A payment card type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardType {
    /// Type code, e.g. `visa`
    pub code: String,
    /// Display name
    pub name: Option<String>,
}

/// Payment details entered during checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDetails {
    /// Payment details id
    pub id: Option<String>,
    /// Name on the card
    pub account_holder_name: Option<String>,
    /// Card number
    pub card_number: Option<String>,
    /// Card type
    pub card_type: Option<CardType>,
    /// Two-digit expiry month
    pub expiry_month: Option<String>,
    /// Four-digit expiry year
    pub expiry_year: Option<String>,
    /// Card verification number
    #[serde(skip_serializing)]
    pub cvn: Option<String>,
}
