//! Checkout review.
//!
//! The review step shows the cart, its entries, the chosen delivery mode and
//! the delivery address with its country name. [`ReviewSubmit::open`] loads
//! what is missing and returns a live view combining the latest values of
//! those slices.

use crate::app::{AppState, AppStore};
use crate::cart::{active_cart, cart_entries};
use crate::checkout::delivery_modes::{selected_delivery_mode, DeliveryModesAction};
use crate::occ::models::{Address, Cart, DeliveryMode, OrderEntry, PaymentDetails};
use crate::user::countries::{country, DeliveryCountriesAction};
use serde::Serialize;
use storefront_state_runtime::{Selection, StoreError};

/// Content of a summary card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Card title
    pub title: String,
    /// Emphasised first line
    pub text_bold: Option<String>,
    /// Remaining lines
    pub text: Vec<String>,
}

/// Everything the review step displays besides the user's own input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetails {
    /// The active cart
    pub cart: Cart,
    /// Its entries
    pub entries: Vec<OrderEntry>,
    /// The chosen delivery mode, once resolved
    pub delivery_mode: Option<DeliveryMode>,
    /// Name of the delivery country, once loaded
    pub country_name: Option<String>,
}

impl ReviewDetails {
    /// Combine the current slices for a delivery country
    #[must_use]
    pub fn from_state(state: &AppState, country_isocode: Option<&str>) -> Self {
        Self {
            cart: active_cart(&state.cart).clone(),
            entries: cart_entries(&state.cart).to_vec(),
            delivery_mode: selected_delivery_mode(&state.delivery_modes).cloned(),
            country_name: country_isocode
                .and_then(|isocode| country(&state.countries, isocode))
                .and_then(|c| c.name.clone()),
        }
    }
}

/// Entry point of the review step
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewSubmit;

impl ReviewSubmit {
    /// Start the review for a delivery address.
    ///
    /// Loads the supported delivery modes when no delivery mode is resolved,
    /// and the delivery countries when the address country is unknown. The
    /// returned selection updates as those loads complete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn open(
        store: &AppStore,
        delivery_address: &Address,
        user_id: &str,
        cart_id: &str,
    ) -> Result<Selection<ReviewDetails>, StoreError> {
        let state = store.snapshot();
        let isocode = delivery_address.country.as_ref().map(|c| c.isocode.clone());

        if selected_delivery_mode(&state.delivery_modes).is_none() {
            store
                .send(
                    DeliveryModesAction::LoadSupportedDeliveryModes {
                        user_id: user_id.to_string(),
                        cart_id: cart_id.to_string(),
                    }
                    .into(),
                )
                .await?;
        }

        if let Some(code) = isocode.as_deref() {
            if country(&state.countries, code).is_none() {
                store
                    .send(DeliveryCountriesAction::LoadDeliveryCountries.into())
                    .await?;
            }
        }

        Ok(store.select(move |state| ReviewDetails::from_state(state, isocode.as_deref())))
    }
}

/// Card for the delivery address.
///
/// Lines: street lines, `town, region, country`, postal code and phone;
/// missing parts are left out.
#[must_use]
pub fn shipping_address_card(address: &Address, country_name: Option<&str>) -> Card {
    let name = [address.first_name.as_deref(), address.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let locality = [
        address.town.as_deref(),
        address.region.as_ref().map(|r| r.isocode.as_str()),
        country_name,
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");

    let text = [
        address.line1.clone(),
        address.line2.clone(),
        (!locality.is_empty()).then_some(locality),
        address.postal_code.clone(),
        address.phone.clone(),
    ]
    .into_iter()
    .flatten()
    .collect();

    Card {
        title: "Ship To".to_string(),
        text_bold: (!name.is_empty()).then_some(name),
        text,
    }
}

/// Card for the delivery mode
#[must_use]
pub fn shipping_method_card(mode: &DeliveryMode) -> Card {
    Card {
        title: "Shipping Method".to_string(),
        text_bold: Some(mode.code.clone()),
        text: mode.description.iter().cloned().collect(),
    }
}

/// Card for the payment details; the card verification number is never shown
#[must_use]
pub fn payment_method_card(details: &PaymentDetails) -> Card {
    let mut text: Vec<String> = details.card_number.iter().cloned().collect();
    if let (Some(month), Some(year)) = (&details.expiry_month, &details.expiry_year) {
        text.push(format!("Expires: {month}/{year}"));
    }

    Card {
        title: "Payment".to_string(),
        text_bold: details.account_holder_name.clone(),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occ::models::{CardType, Country, Region};

    fn delivery_address() -> Address {
        Address {
            first_name: Some("John".into()),
            last_name: Some("Doe".into()),
            title_code: Some("mr".into()),
            line1: Some("Toyosaki 2 create on cart".into()),
            line2: Some("line2".into()),
            town: Some("town".into()),
            region: Some(Region {
                isocode: "JP-27".into(),
                name: None,
            }),
            postal_code: Some("zip".into()),
            country: Some(Country {
                isocode: "JP".into(),
                name: None,
            }),
            ..Address::default()
        }
    }

    #[test]
    fn address_card() {
        let card = shipping_address_card(&delivery_address(), Some("Canada"));
        assert_eq!(card.title, "Ship To");
        assert_eq!(card.text_bold.as_deref(), Some("John Doe"));
        assert_eq!(
            card.text,
            vec!["Toyosaki 2 create on cart", "line2", "town, JP-27, Canada", "zip"]
        );
    }

    #[test]
    fn address_card_without_country_name() {
        let card = shipping_address_card(&delivery_address(), None);
        assert_eq!(card.text[2], "town, JP-27");
    }

    #[test]
    fn shipping_method() {
        let card = shipping_method_card(&DeliveryMode {
            code: "standard-gross".into(),
            description: Some("Standard Delivery description".into()),
            ..DeliveryMode::default()
        });
        assert_eq!(card.title, "Shipping Method");
        assert_eq!(card.text_bold.as_deref(), Some("standard-gross"));
        assert_eq!(card.text, vec!["Standard Delivery description"]);
    }

    #[test]
    fn payment_method() {
        let card = payment_method_card(&PaymentDetails {
            account_holder_name: Some("Name".into()),
            card_number: Some("123456789".into()),
            card_type: Some(CardType {
                code: "Visa".into(),
                name: Some("Visa".into()),
            }),
            expiry_month: Some("01".into()),
            expiry_year: Some("2022".into()),
            cvn: Some("123".into()),
            ..PaymentDetails::default()
        });
        assert_eq!(card.title, "Payment");
        assert_eq!(card.text_bold.as_deref(), Some("Name"));
        assert_eq!(card.text, vec!["123456789", "Expires: 01/2022"]);
    }

    #[test]
    fn details_from_empty_state() {
        let details = ReviewDetails::from_state(&AppState::default(), Some("JP"));
        assert_eq!(details, ReviewDetails::default());
    }
}
