use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::headers::Headers;
use crate::json::SerializerOptions;
use crate::transport::{DefaultHttpServiceProvider, HttpServiceProvider};

/// Request header carrying the API key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Settings shared by every request an integration sends. Read-only once
/// built.
#[derive(Clone)]
pub struct IntegrationConfig {
    pub(crate) uri: Url,
    pub(crate) api_key: Option<String>,
    pub(crate) organization_id: Option<String>,
    pub(crate) warden_id: Option<String>,
    pub(crate) headers: Headers,
    pub(crate) timeout: Option<Duration>,
    pub(crate) fail_fast: bool,
    pub(crate) serializer: SerializerOptions,
    pub(crate) http_service_provider: Arc<dyn HttpServiceProvider>,
}

impl IntegrationConfig {
    pub fn builder(url: &str) -> Result<IntegrationConfigBuilder, ConfigError> {
        IntegrationConfigBuilder::new(url, ApiOptions::default())
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    pub fn warden_id(&self) -> Option<&str> {
        self.warden_id.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether transport failures are returned to the caller. Off by default,
    /// in which case failed deliveries are only logged.
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn serializer_options(&self) -> &SerializerOptions {
        &self.serializer
    }

    pub fn http_service_provider(&self) -> &dyn HttpServiceProvider {
        self.http_service_provider.as_ref()
    }
}

impl fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("uri", &self.uri.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("organization_id", &self.organization_id)
            .field("warden_id", &self.warden_id)
            .field("header_count", &self.headers.len())
            .field("timeout", &self.timeout)
            .field("fail_fast", &self.fail_fast)
            .field("serializer", &self.serializer)
            .finish_non_exhaustive()
    }
}

/// Optional identity settings passed when the builder is created.
#[derive(Debug, Clone, Default)]
pub struct ApiOptions {
    /// Sent in the `X-Api-Key` header.
    pub api_key: Option<String>,
    /// Organization used by the panel endpoints.
    pub organization_id: Option<String>,
    /// Warden used by the check result endpoint.
    pub warden_id: Option<String>,
    /// Initial request headers. The API key header is added on top.
    pub headers: Option<Headers>,
}

impl ApiOptions {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_warden_id(mut self, warden_id: impl Into<String>) -> Self {
        self.warden_id = Some(warden_id.into());
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }
}

pub struct IntegrationConfigBuilder {
    config: IntegrationConfig,
}

impl IntegrationConfigBuilder {
    pub fn new(url: &str, options: ApiOptions) -> Result<Self, ConfigError> {
        if url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        let uri = Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut headers = options.headers.unwrap_or_default();
        let api_key = options.api_key.filter(|key| !key.trim().is_empty());
        if let Some(key) = &api_key {
            headers.insert(API_KEY_HEADER, key.clone());
        }

        Ok(Self {
            config: IntegrationConfig {
                uri,
                api_key,
                organization_id: options.organization_id,
                warden_id: options.warden_id,
                headers,
                timeout: None,
                fail_fast: false,
                serializer: SerializerOptions::default(),
                http_service_provider: Arc::new(DefaultHttpServiceProvider),
            },
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        self.config.timeout = Some(timeout);
        Ok(self)
    }

    /// Replaces the whole header map, including a previously added API key
    /// header.
    pub fn with_headers(mut self, headers: Headers) -> Result<Self, ConfigError> {
        if headers.is_empty() {
            return Err(ConfigError::EmptyHeaders);
        }
        self.config.headers = headers;
        Ok(self)
    }

    pub fn with_serializer_options(mut self, options: SerializerOptions) -> Self {
        self.config.serializer = options;
        self
    }

    pub fn with_http_service_provider(
        mut self,
        provider: impl HttpServiceProvider + 'static,
    ) -> Self {
        self.config.http_service_provider = Arc::new(provider);
        self
    }

    pub fn fail_fast(mut self) -> Self {
        self.config.fail_fast = true;
        self
    }

    pub fn build(self) -> IntegrationConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::KeyCase;
    use crate::transport::{HttpService, ReqwestHttpService, SharedHttpServiceProvider};

    #[test]
    fn empty_url_is_rejected() {
        assert!(matches!(IntegrationConfig::builder(""), Err(ConfigError::EmptyUrl)));
        assert!(matches!(IntegrationConfig::builder("  "), Err(ConfigError::EmptyUrl)));
    }

    #[test]
    fn relative_url_is_rejected() {
        let err = IntegrationConfig::builder("Invalid").err().unwrap();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn defaults() {
        let config = IntegrationConfig::builder("http://my-api.com").unwrap().build();
        assert_eq!(config.uri().as_str(), "http://my-api.com/");
        assert!(config.api_key().is_none());
        assert!(config.headers().is_empty());
        assert!(config.timeout().is_none());
        assert!(!config.fail_fast());
        assert_eq!(config.serializer_options(), &SerializerOptions::default());
    }

    #[test]
    fn api_key_is_added_to_headers() {
        let options = ApiOptions::default()
            .with_api_key("api-key")
            .with_organization_id("org")
            .with_warden_id("w1")
            .with_headers([("X-Source", "warden")].into_iter().collect());
        let config = IntegrationConfigBuilder::new("http://my-api.com", options)
            .unwrap()
            .build();

        assert_eq!(config.api_key(), Some("api-key"));
        assert_eq!(config.headers().get("x-api-key"), Some("api-key"));
        assert_eq!(config.headers().get("X-Source"), Some("warden"));
        assert_eq!(config.organization_id(), Some("org"));
        assert_eq!(config.warden_id(), Some("w1"));
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let options = ApiOptions::default().with_api_key("   ");
        let config = IntegrationConfigBuilder::new("http://my-api.com", options)
            .unwrap()
            .build();
        assert!(config.api_key().is_none());
        assert!(!config.headers().contains_key(API_KEY_HEADER));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let builder = IntegrationConfig::builder("http://my-api.com").unwrap();
        assert!(matches!(builder.with_timeout(Duration::ZERO), Err(ConfigError::ZeroTimeout)));

        let config = IntegrationConfig::builder("http://my-api.com")
            .unwrap()
            .with_timeout(Duration::from_secs(3))
            .unwrap()
            .build();
        assert_eq!(config.timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn headers_replace_wholesale() {
        let options = ApiOptions::default().with_api_key("api-key");
        let config = IntegrationConfigBuilder::new("http://my-api.com", options)
            .unwrap()
            .with_headers([("X-Other", "1")].into_iter().collect())
            .unwrap()
            .build();
        assert_eq!(config.headers().len(), 1);
        assert!(!config.headers().contains_key(API_KEY_HEADER));
        assert_eq!(config.api_key(), Some("api-key"));
    }

    #[test]
    fn empty_headers_are_rejected() {
        let builder = IntegrationConfig::builder("http://my-api.com").unwrap();
        assert!(matches!(builder.with_headers(Headers::new()), Err(ConfigError::EmptyHeaders)));
    }

    #[test]
    fn setters_are_applied() {
        let service: Arc<dyn HttpService> = Arc::new(ReqwestHttpService::default());
        let config = IntegrationConfig::builder("https://panel.example.com/api/")
            .unwrap()
            .with_serializer_options(SerializerOptions::default().with_key_case(KeyCase::Preserve))
            .with_http_service_provider(SharedHttpServiceProvider::from_arc(Arc::clone(&service)))
            .fail_fast()
            .build();

        assert!(config.fail_fast());
        assert_eq!(config.serializer_options().key_case, KeyCase::Preserve);
        assert!(Arc::ptr_eq(&config.http_service_provider().provide(), &service));
    }

    #[test]
    fn debug_redacts_api_key() {
        let options = ApiOptions::default().with_api_key("top-secret");
        let config = IntegrationConfigBuilder::new("http://my-api.com", options)
            .unwrap()
            .build();
        assert!(!format!("{config:?}").contains("top-secret"));
    }
}
