use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, warn};

use super::HttpService;
use crate::error::IntegrationError;
use crate::headers::Headers;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// [`HttpService`] backed by a `reqwest::Client`.
///
/// Headers and timeout are attached to each request rather than to the
/// client, so one instance can be shared between concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpService {
    client: Client,
}

impl ReqwestHttpService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        url: &str,
        body: String,
        headers: &Headers,
        timeout: Option<Duration>,
    ) -> Result<(), IntegrationError> {
        let header_map = build_header_map(headers).map_err(|source| IntegrationError::Transport {
            url: url.to_string(),
            source,
        })?;

        let mut req = self.client.post(url).headers(header_map).body(body);
        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            req = req.timeout(timeout);
        }

        let response = req
            .send()
            .await
            .map_err(|e| IntegrationError::Transport {
                url: url.to_string(),
                source: Box::new(e),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(IntegrationError::UnsuccessfulResponse {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }
}

#[async_trait]
impl HttpService for ReqwestHttpService {
    async fn post(
        &self,
        url: &str,
        body: String,
        headers: &Headers,
        timeout: Option<Duration>,
        fail_fast: bool,
    ) -> Result<(), IntegrationError> {
        match self.send(url, body, headers, timeout).await {
            Ok(()) => {
                debug!(url, "POST delivered");
                Ok(())
            }
            Err(e) if fail_fast => Err(e),
            Err(e) => {
                warn!(url, error = %e, "POST failed, ignoring since fail-fast is off");
                Ok(())
            }
        }
    }
}

fn build_header_map(
    headers: &Headers,
) -> Result<HeaderMap, Box<dyn std::error::Error + Send + Sync>> {
    let mut map = HeaderMap::with_capacity(headers.len() + 1);
    for (name, value) in headers.iter() {
        map.insert(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(value)?);
    }
    map.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_key_headers() -> Headers {
        [("X-Api-Key", "api-key")].into_iter().collect()
    }

    #[tokio::test]
    async fn post_sends_json_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/endpoint"))
            .and(header("content-type", JSON_CONTENT_TYPE))
            .and(header("x-api-key", "api-key"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let service = ReqwestHttpService::default();
        let result = service
            .post(
                &format!("{}/endpoint", server.uri()),
                r#"{"a":1}"#.to_string(),
                &api_key_headers(),
                Some(Duration::from_secs(5)),
                true,
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn error_status_is_swallowed_without_fail_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let service = ReqwestHttpService::default();
        let result = service
            .post(&server.uri(), "{}".into(), &Headers::new(), None, false)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn error_status_fails_with_fail_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let service = ReqwestHttpService::default();
        let err = service
            .post(&server.uri(), "{}".into(), &Headers::new(), None, true)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        match err {
            IntegrationError::UnsuccessfulResponse { reason, .. } => {
                assert_eq!(reason, "Service Unavailable")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_policy_gated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let service = ReqwestHttpService::default();
        let timeout = Some(Duration::from_millis(50));

        let swallowed = service
            .post(&server.uri(), "{}".into(), &Headers::new(), timeout, false)
            .await;
        assert!(swallowed.is_ok());

        let err = service
            .post(&server.uri(), "{}".into(), &Headers::new(), timeout, true)
            .await
            .unwrap_err();
        assert!(matches!(err, IntegrationError::Transport { .. }));
    }

    #[tokio::test]
    async fn connection_failure_is_policy_gated() {
        // Nothing listens on port 9 locally.
        let url = "http://127.0.0.1:9/endpoint";
        let service = ReqwestHttpService::default();

        assert!(service
            .post(url, "{}".into(), &Headers::new(), None, false)
            .await
            .is_ok());

        let err = service
            .post(url, "{}".into(), &Headers::new(), None, true)
            .await
            .unwrap_err();
        assert!(err.is_transport_error());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn header_map_keeps_fixed_content_type() {
        let headers: Headers = [("Content-Type", "text/plain"), ("X-Source", "warden")]
            .into_iter()
            .collect();
        let map = build_header_map(&headers).unwrap();
        assert_eq!(map.get_all(CONTENT_TYPE).iter().count(), 1);
        assert_eq!(map[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert_eq!(map["x-source"], "warden");
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let headers: Headers = [("bad header", "x")].into_iter().collect();
        assert!(build_header_map(&headers).is_err());
    }
}
