//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [log]
//! format = "json"
//!
//! [api]
//! url = "https://panel.example.com/api"
//! api_key = "secret"
//! organization_id = "org-1"
//! warden_id = "warden-1"
//! timeout_ms = 5000
//! fail_fast = true
//! headers = { "X-Source" = "warden" }
//!
//! [serializer]
//! key_case = "camel_case"
//! date_format = "%Y-%m-%d %-H:%M:%S"
//! include_nulls = true
//! pretty = false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use warden_http_core::{ApiOptions, Headers, HttpApiIntegration, SerializerOptions};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log: LogConfig,

    pub api: ApiConfig,

    /// Missing keys keep their library defaults. An empty `date_format`
    /// leaves timestamps in RFC 3339.
    #[serde(default)]
    pub serializer: SerializerOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub organization_id: Option<String>,

    #[serde(default)]
    pub warden_id: Option<String>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub headers: Option<Headers>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.api.url)
            .map_err(|e| format!("Invalid api.url: {} ({})", self.api.url, e))?;

        if self.api.timeout_ms == Some(0) {
            return Err("api.timeout_ms must be greater than zero".into());
        }

        match self.log.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }

    /// Builds the integration, posting to `url_override` instead of
    /// `api.url` when given.
    pub fn to_integration(&self, url_override: Option<&str>) -> Result<HttpApiIntegration, String> {
        let api = &self.api;
        let url = url_override.unwrap_or(&api.url);

        let options = ApiOptions {
            api_key: api.api_key.clone(),
            organization_id: api.organization_id.clone(),
            warden_id: api.warden_id.clone(),
            headers: api.headers.clone(),
        };

        let mut serializer = self.serializer.clone();
        if serializer.date_format.as_deref().is_some_and(str::is_empty) {
            serializer.date_format = None;
        }

        HttpApiIntegration::create(url, options, |mut b| {
            if let Some(ms) = api.timeout_ms {
                b = b.with_timeout(Duration::from_millis(ms))?;
            }
            b = b.with_serializer_options(serializer);
            Ok(if api.fail_fast { b.fail_fast() } else { b })
        })
        .map_err(|e| format!("Invalid API configuration: {}", e))
    }
}
