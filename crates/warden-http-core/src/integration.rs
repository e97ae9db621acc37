//! HTTP API integration.
//!
//! [`HttpApiIntegration`] turns payloads into JSON POSTs against the configured
//! base URL. Besides the generic [`post`](HttpApiIntegration::post) it knows the
//! two panel endpoints: iterations and check results.

use serde::Serialize;
use tracing::debug;

use crate::config::{ApiOptions, IntegrationConfig, IntegrationConfigBuilder};
use crate::endpoint::{checks_endpoint, encode_warden_name, full_url, iterations_endpoint};
use crate::error::{ConfigError, IntegrationError};
use crate::json::to_json;
use crate::model::{WardenCheckResult, WardenIteration};

#[derive(Debug, Clone)]
pub struct HttpApiIntegration {
    config: IntegrationConfig,
}

/// Body of the check result endpoint.
#[derive(Serialize)]
struct CheckEnvelope<'a, C: ?Sized> {
    check: &'a C,
}

impl HttpApiIntegration {
    pub fn new(config: IntegrationConfig) -> Self {
        Self { config }
    }

    /// Builds the configuration from `url` and `options`, lets `configure`
    /// adjust the builder, then creates the integration.
    pub fn create<F>(url: &str, options: ApiOptions, configure: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(IntegrationConfigBuilder) -> Result<IntegrationConfigBuilder, ConfigError>,
    {
        let builder = configure(IntegrationConfigBuilder::new(url, options)?)?;
        Ok(Self::new(builder.build()))
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// POSTs `data` to the base URL.
    pub async fn post<T>(&self, data: &T) -> Result<(), IntegrationError>
    where
        T: Serialize + ?Sized,
    {
        self.post_to("", data).await
    }

    /// POSTs `data` to `endpoint`, relative to the base URL.
    pub async fn post_to<T>(&self, endpoint: &str, data: &T) -> Result<(), IntegrationError>
    where
        T: Serialize + ?Sized,
    {
        let url = full_url(self.config.uri.as_str(), endpoint);
        self.send(&url, data).await
    }

    /// Iteration URL for `warden_name`; spaces in the name become `%20`.
    pub fn iteration_url(&self, warden_name: &str) -> String {
        let endpoint = iterations_endpoint(self.organization_id(), &encode_warden_name(warden_name));
        full_url(self.config.uri.as_str(), &endpoint)
    }

    pub fn check_result_url(&self) -> String {
        let endpoint = checks_endpoint(
            self.organization_id(),
            self.config.warden_id.as_deref().unwrap_or_default(),
        );
        full_url(self.config.uri.as_str(), &endpoint)
    }

    /// POSTs an iteration to
    /// `organizations/{organization_id}/wardens/{warden_name}/iterations`.
    pub async fn post_iteration_to_panel<I>(&self, iteration: Option<&I>) -> Result<(), IntegrationError>
    where
        I: WardenIteration,
    {
        let iteration = iteration
            .ok_or_else(|| IntegrationError::missing("iteration", "Warden iteration can not be null."))?;
        if iteration.warden_name().trim().is_empty() {
            return Err(IntegrationError::invalid("warden_name", "Warden name can not be empty."));
        }

        let url = self.iteration_url(iteration.warden_name());
        self.send(&url, iteration).await
    }

    /// POSTs `{"check": <check_result>}` to
    /// `organizations/{organization_id}/wardens/{warden_id}/checks`.
    pub async fn post_check_result_to_panel<C>(&self, check_result: Option<&C>) -> Result<(), IntegrationError>
    where
        C: WardenCheckResult,
    {
        let check_result = check_result.ok_or_else(|| {
            IntegrationError::missing("check_result", "Warden check result can not be null.")
        })?;
        if check_result.watcher_name().trim().is_empty() {
            return Err(IntegrationError::invalid("watcher_name", "Watcher name can not be empty."));
        }

        let url = self.check_result_url();
        self.send(&url, &CheckEnvelope { check: check_result }).await
    }

    fn organization_id(&self) -> &str {
        self.config.organization_id.as_deref().unwrap_or_default()
    }

    async fn send<T>(&self, url: &str, data: &T) -> Result<(), IntegrationError>
    where
        T: Serialize + ?Sized,
    {
        let body = to_json(data, &self.config.serializer)?;
        debug!(url, bytes = body.len(), fail_fast = self.config.fail_fast, "Posting to HTTP API");
        let service = self.config.http_service_provider.provide();
        service
            .post(url, body, &self.config.headers, self.config.timeout, self.config.fail_fast)
            .await
    }
}
