mod http;

pub use http::{ReqwestHttpService, JSON_CONTENT_TYPE};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::IntegrationError;
use crate::headers::Headers;

/// Performs a single JSON POST.
///
/// With `fail_fast` unset every failure (error status, connection error,
/// timeout) resolves to `Ok(())`. Callers that build alerting on top must opt
/// in to see delivery problems at all.
#[async_trait]
pub trait HttpService: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: String,
        headers: &Headers,
        timeout: Option<Duration>,
        fail_fast: bool,
    ) -> Result<(), IntegrationError>;
}

/// Factory handing out the [`HttpService`] used for a request.
///
/// Any `Fn() -> Arc<dyn HttpService>` closure is a provider.
pub trait HttpServiceProvider: Send + Sync {
    fn provide(&self) -> Arc<dyn HttpService>;
}

impl<F> HttpServiceProvider for F
where
    F: Fn() -> Arc<dyn HttpService> + Send + Sync,
{
    fn provide(&self) -> Arc<dyn HttpService> {
        self()
    }
}

/// Builds a new [`ReqwestHttpService`] with its own client on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHttpServiceProvider;

impl HttpServiceProvider for DefaultHttpServiceProvider {
    fn provide(&self) -> Arc<dyn HttpService> {
        Arc::new(ReqwestHttpService::default())
    }
}

/// Hands out the same service every time, so connections are reused.
#[derive(Clone)]
pub struct SharedHttpServiceProvider {
    service: Arc<dyn HttpService>,
}

impl SharedHttpServiceProvider {
    pub fn new(service: impl HttpService + 'static) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    pub fn from_arc(service: Arc<dyn HttpService>) -> Self {
        Self { service }
    }
}

impl HttpServiceProvider for SharedHttpServiceProvider {
    fn provide(&self) -> Arc<dyn HttpService> {
        Arc::clone(&self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl HttpService for Noop {
        async fn post(
            &self,
            _url: &str,
            _body: String,
            _headers: &Headers,
            _timeout: Option<Duration>,
            _fail_fast: bool,
        ) -> Result<(), IntegrationError> {
            Ok(())
        }
    }

    #[test]
    fn shared_provider_returns_same_instance() {
        let provider = SharedHttpServiceProvider::new(Noop);
        assert!(Arc::ptr_eq(&provider.provide(), &provider.provide()));
    }

    #[test]
    fn default_provider_returns_fresh_instances() {
        let provider = DefaultHttpServiceProvider;
        assert!(!Arc::ptr_eq(&provider.provide(), &provider.provide()));
    }

    #[test]
    fn closures_are_providers() {
        let shared: Arc<dyn HttpService> = Arc::new(Noop);
        let handle = Arc::clone(&shared);
        let provider = move || Arc::clone(&handle);
        assert!(Arc::ptr_eq(&provider.provide(), &shared));
    }
}
