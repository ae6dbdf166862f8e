//! # crmkit
//!
//! Blocking Rust client for the CRM workspace REST API.
//!
//! This crate provides:
//! - Typed requests and responses for objects, attributes, select options,
//!   statuses, lists, entries, records, notes, tasks and webhooks
//! - Categorized errors ([`ErrorKind`]) with retry hints
//! - Exponential backoff retry for transient failures
//! - A [`Backend`](backend::Backend) trait with an HTTP implementation and
//!   an in-memory [`MockBackend`] for tests
//!
//! ## Example
//!
//! ```no_run
//! use crmkit::Client;
//!
//! let client = Client::new("api-token");
//!
//! // Every remote call goes through the retry policy
//! let deals = client.call("get_object", |api| api.get_object("deals"))?;
//! println!("{} ({})", deals.plural_noun, deals.object_id);
//! # Ok::<(), crmkit::Error>(())
//! ```
//!
//! ## Testing
//!
//! ```
//! use crmkit::{Client, MockBackend};
//!
//! let mock = MockBackend::with_standard_objects();
//! let client = Client::with_backend(Box::new(mock.clone()));
//!
//! let people = client.call("get_object", |api| api.get_object("people")).unwrap();
//! assert_eq!(people.singular_noun, "Person");
//! assert_eq!(mock.calls("get_object"), 1);
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod ids;
pub mod retry;
pub mod types;

pub use backend::mock::MockBackend;
pub use error::{Error, ErrorKind, Result};
pub use ids::is_uuid;
pub use types::*;

use backend::Backend;
use backend::http::HttpBackend;
use retry::LogCallback;

/// High-level client: a backend plus the retry policy applied to every call.
///
/// Remote operations are reached through [`Client::call`], which hands the
/// closure a `&dyn Backend` and retries it on transient failures. Call sites
/// name the operation so retries can be reported.
pub struct Client {
    backend: Box<dyn Backend>,
    retry: RetryConfig,
}

impl Client {
    /// Create a client for the public API with the default retry policy.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_backend(Box::new(HttpBackend::new(token)))
    }

    /// Create a client against a custom API base URL.
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_backend(Box::new(HttpBackend::with_api_base(api_base, token)))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The retry policy applied by [`Client::call`].
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Direct access to the backend, bypassing retries.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Run one remote operation under the client's retry policy.
    ///
    /// # Errors
    ///
    /// Returns the operation's error immediately when it is not retryable,
    /// or the last error once the attempt ceiling is reached.
    pub fn call<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnMut(&dyn Backend) -> Result<T>,
    {
        self.call_with(&self.retry, operation, f)
    }

    /// Run one remote operation under an explicit retry policy.
    ///
    /// # Errors
    ///
    /// See [`Client::call`].
    pub fn call_with<T, F>(&self, config: &RetryConfig, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut(&dyn Backend) -> Result<T>,
    {
        log::trace!("calling {operation}");
        let callback = LogCallback { operation };
        retry::with_retry(config, Some(&callback), || f(self.backend.as_ref()))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("retry", &self.retry).finish_non_exhaustive()
    }
}
