//! # Storefront State Testing
//!
//! Testing utilities and helpers for storefront state reducers.
//!
//! This crate provides:
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects and snapshot identity
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use storefront_state_testing::{assertions, ReducerTest};
//!
//! #[test]
//! fn stale_success_is_dropped() {
//!     ReducerTest::new(ProductSearchReducer)
//!         .with_env(test_environment())
//!         .given_state(loading_state(RequestId::new(2)))
//!         .when_action(stale_success(RequestId::new(1)))
//!         .then_unchanged()
//!         .then_effects(assertions::assert_no_effects)
//!         .run();
//! }
//! ```


pub use reducer_test::{assertions, ReducerTest, SharedIdentity};

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::vec;
    use proptest::prelude::*;

    /// Short lowercase identifiers, for codes such as product or address ids
    pub fn short_ids() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,7}"
    }

    /// Vectors of up to `max_len` elements drawn from `element`
    pub fn vec_of<S: Strategy>(element: S, max_len: usize) -> impl Strategy<Value = Vec<S::Value>> {
        vec(element, 0..=max_len)
    }

    /// Unique short identifiers, as a vector of at most `max_len`
    pub fn unique_ids(max_len: usize) -> impl Strategy<Value = Vec<String>> {
        proptest::collection::btree_set(short_ids(), 0..=max_len)
            .prop_map(|ids| ids.into_iter().collect())
    }
}
