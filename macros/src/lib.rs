//! Derive macros for storefront state actions
//!
//! # Available Macros
//!
//! - `#[derive(Action)]` - Implements `storefront_state_core::action::Action`
//!   for a slice action enum
//!
//! # Example
//!
//! ```ignore
//! use storefront_state_macros::Action;
//!
//! #[derive(Action, Clone, Debug)]
//! enum UserAddressesAction {
//!     #[start]
//!     LoadUserAddresses { user_id: String },
//!
//!     #[success]
//!     LoadUserAddressesSuccess(Vec<Address>),
//!
//!     #[fail]
//!     LoadUserAddressesFail(OccError),
//! }
//!
//! // Generated:
//! assert_eq!(action.kind(), "LOAD_USER_ADDRESSES_SUCCESS");
//! assert_eq!(action.tag_class(), ActionKind::Success);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields};

/// Tag class attributes, paired with the `ActionKind` variant they select.
const CLASS_ATTRIBUTES: [(&str, &str); 4] = [
    ("start", "Start"),
    ("success", "Success"),
    ("fail", "Fail"),
    ("reset", "Reset"),
];

/// Derive macro for slice action enums
///
/// Generates an `Action` implementation:
/// - `kind()` - The SCREAMING_SNAKE tag of the variant
///   (`SearchProductsSuccess` becomes `SEARCH_PRODUCTS_SUCCESS`)
/// - `tag_class()` - The `ActionKind` selected by the variant attribute
///
/// # Attributes
///
/// - `#[start]` - Begins an asynchronous operation
/// - `#[success]` - Completes an operation with a payload
/// - `#[fail]` - Completes an operation with an error
/// - `#[reset]` - Returns the slice to its initial value
///
/// Variants without an attribute are `ActionKind::Command`.
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type
/// - A variant has more than one class attribute
#[proc_macro_derive(Action, attributes(start, success, fail, reset))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(input, "#[derive(Action)] can only be used on enums")
            .to_compile_error()
            .into();
    };

    let mut kind_arms = Vec::new();
    let mut class_arms = Vec::new();

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;

        let classes: Vec<&str> = CLASS_ATTRIBUTES
            .iter()
            .filter(|(attr, _)| has_attribute(&variant.attrs, attr))
            .map(|(_, class)| *class)
            .collect();

        if classes.len() > 1 {
            return syn::Error::new_spanned(
                variant,
                "Variant can carry at most one of #[start], #[success], #[fail], #[reset]",
            )
            .to_compile_error()
            .into();
        }

        let class = syn::Ident::new(
            classes.first().copied().unwrap_or("Command"),
            proc_macro2::Span::call_site(),
        );
        let tag = screaming_snake(&variant_name.to_string());

        let pattern = match &variant.fields {
            Fields::Named(_) => quote! { Self::#variant_name { .. } },
            Fields::Unnamed(_) => quote! { Self::#variant_name(..) },
            Fields::Unit => quote! { Self::#variant_name },
        };

        kind_arms.push(quote! { #pattern => #tag, });
        class_arms.push(quote! {
            #pattern => ::storefront_state_core::action::ActionKind::#class,
        });
    }

    let (kind_body, class_body) = if kind_arms.is_empty() {
        (quote! { match *self {} }, quote! { match *self {} })
    } else {
        (
            quote! { match self { #(#kind_arms)* } },
            quote! { match self { #(#class_arms)* } },
        )
    };

    let expanded = quote! {
        impl #impl_generics ::storefront_state_core::action::Action for #name #ty_generics #where_clause {
            fn kind(&self) -> &'static str {
                #kind_body
            }

            fn tag_class(&self) -> ::storefront_state_core::action::ActionKind {
                #class_body
            }
        }
    };

    TokenStream::from(expanded)
}

/// Convert a `PascalCase` variant name into a `SCREAMING_SNAKE` tag.
///
/// Acronyms stay together: `LoadOCCConfig` becomes `LOAD_OCC_CONFIG`.
fn screaming_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
    }

    out
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
