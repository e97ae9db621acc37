#![forbid(unsafe_code)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod integration;
pub mod json;
pub mod model;
pub mod transport;

pub use config::{ApiOptions, IntegrationConfig, IntegrationConfigBuilder, API_KEY_HEADER};
pub use endpoint::full_url;
pub use error::{ConfigError, IntegrationError};
pub use headers::Headers;
pub use integration::HttpApiIntegration;
pub use json::{to_json, KeyCase, SerializerOptions, DEFAULT_DATE_FORMAT};
pub use model::{
    CheckResult, ExceptionInfo, Iteration, WardenCheckResult, WardenIteration, WatcherCheckResult,
};
pub use transport::{
    DefaultHttpServiceProvider, HttpService, HttpServiceProvider, ReqwestHttpService,
    SharedHttpServiceProvider, JSON_CONTENT_TYPE,
};
