//! Declarative macros for effect construction

/// Create an `Effect::Future` from an async block
///
/// The block evaluates to `Option<Action>`; `Some` is fed back into the store.
///
/// # Example
///
/// ```rust,ignore
/// use storefront_state_core::async_effect;
///
/// async_effect! {
///     let cart = backend.load_cart(&user_id, &cart_id).await;
///     Some(CartAction::from(cart))
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Future` that dispatches one action right away
///
/// # Example
///
/// ```rust,ignore
/// use storefront_state_core::emit;
///
/// emit!(FacetNavigationAction::Filter(query))
/// ```
#[macro_export]
macro_rules! emit {
    ($action:expr) => {{
        let action = $action;
        $crate::async_effect! { ::std::option::Option::Some(action) }
    }};
}
