//! Injected dependencies shared by every storefront slice.

use crate::occ::CommerceBackend;
use std::sync::Arc;
use storefront_state_core::request::{RequestId, RequestIdSource, SequentialRequestIds};
use storefront_state_runtime::retry::RetryPolicy;

/// Search tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    /// Products per result page
    pub page_size: u32,
    /// Maximum suggestions per term
    pub max_suggestions: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_suggestions: 10,
        }
    }
}

/// Environment dependencies for the storefront reducers
#[derive(Clone)]
pub struct StorefrontEnvironment {
    /// Commerce backend called by effects
    pub backend: Arc<dyn CommerceBackend>,
    /// Source of request ids for keyed responses
    pub request_ids: Arc<dyn RequestIdSource>,
    /// Retry policy for transient backend failures
    pub retry: RetryPolicy,
    /// Search tuning
    pub search: SearchSettings,
}

impl StorefrontEnvironment {
    /// Creates an environment over `backend` with sequential request ids and
    /// default retry and search settings
    #[must_use]
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self {
            backend,
            request_ids: Arc::new(SequentialRequestIds::new()),
            retry: RetryPolicy::default(),
            search: SearchSettings::default(),
        }
    }

    /// Replace the request id source
    #[must_use]
    pub fn with_request_ids(mut self, request_ids: Arc<dyn RequestIdSource>) -> Self {
        self.request_ids = request_ids;
        self
    }

    /// Replace the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the search settings
    #[must_use]
    pub const fn with_search(mut self, search: SearchSettings) -> Self {
        self.search = search;
        self
    }

    /// Allocate a request id
    #[must_use]
    pub fn next_request_id(&self) -> RequestId {
        self.request_ids.next_request_id()
    }
}

impl std::fmt::Debug for StorefrontEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontEnvironment")
            .field("retry", &self.retry)
            .field("search", &self.search)
            .finish_non_exhaustive()
    }
}

/// Create an `Effect::Future` that calls the backend with retries and maps
/// the outcome to a success or fail action.
///
/// Transient errors are retried with the environment's [`RetryPolicy`];
/// the final error is logged at `warn` before `on_error` runs.
///
/// ```rust,ignore
/// backend_effect! {
///     env: env,
///     operation: BackendOperation::LoadAddresses,
///     call: |backend| backend.load_addresses(&user_id),
///     on_success: |addresses| UserAddressesAction::LoadUserAddressesSuccess(addresses),
///     on_error: |error| UserAddressesAction::LoadUserAddressesFail(error)
/// }
/// ```
macro_rules! backend_effect {
    (
        env: $env:expr,
        operation: $operation:expr,
        call: |$backend:ident| $call:expr,
        on_success: |$ok:pat_param| $ok_body:expr,
        on_error: |$err:ident| $err_body:expr
    ) => {{
        let backend = ::std::sync::Arc::clone(&$env.backend);
        let retry = $env.retry.clone();
        let operation: $crate::occ::BackendOperation = $operation;
        ::storefront_state_core::async_effect! {
            let $backend: &dyn $crate::occ::CommerceBackend = &*backend;
            let outcome = ::storefront_state_runtime::retry::retry_if(
                &retry,
                operation.as_str(),
                || $call,
                $crate::occ::OccError::is_transient,
            )
            .await;
            match outcome {
                Ok($ok) => Some($ok_body),
                Err($err) => {
                    ::tracing::warn!(operation = operation.as_str(), error = %$err, "Backend call failed");
                    Some($err_body)
                },
            }
        }
    }};
}

pub(crate) use backend_effect;
