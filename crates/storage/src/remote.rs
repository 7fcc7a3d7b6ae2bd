//! Remote HTTP storage driver.
//!
//! Talks to a repository service at `{base}/repository/{namespace}/{key}`,
//! mapping each driver primitive to one REST method:
//!
//! | primitive | request | success | absence |
//! |---|---|---|---|
//! | exists | HEAD object | 200 | 404 |
//! | read | GET object | 200 body | 404 |
//! | write | PUT object (+`If-None-Match: *` when create-only) | 200/201 | |
//! | delete | DELETE object | 200 | 404 |
//! | list | GET prefix + `/?prefix=&max-keys=` | 200 JSON array | |
//!
//! Every request carries fresh credentials from the injected
//! [`CredentialSource`] in the `nebula-credentials` header, plus
//! `nebula-digest` (lower-hex) when the request targets a citation, and the
//! `application/bali` accept/content types. A 403 maps to
//! [`DriverError::InvalidCredentials`]; a request that got no response maps
//! to [`DriverError::ServerDown`]; a 409 on write maps to
//! [`DriverError::Conflict`].
//!
//! Failure-mode note: the service performs its own borrow/ack logic behind
//! these primitives, so the driver never retries on its own; retry policy
//! belongs to the caller, and the facade's borrow loop only retries on
//! genuine lost races.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use nebula_repository_types::Digest;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::context::OpContext;
use crate::driver::{DriverError, Namespace, Result, StorageDriver, WriteMode};

/// Request header carrying the signed credential blob.
const HEADER_CREDENTIALS: &str = "nebula-credentials";

/// Request header carrying the cited object's digest.
const HEADER_DIGEST: &str = "nebula-digest";

/// Media type of repository objects on the wire.
const MEDIA_TYPE: &str = "application/bali";

/// Default TCP connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default whole-request timeout, when the caller's context sets no
/// deadline of its own.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of fresh request credentials.
///
/// A notary implements this by signing a short-lived blob per request; the
/// driver never caches the result, so revocation takes effect immediately.
pub trait CredentialSource: Send + Sync + fmt::Debug {
    /// Produces one base-32 signed credential blob.
    ///
    /// # Errors
    ///
    /// Returns the source's own error when signing fails; the driver maps it
    /// to [`DriverError::InvalidCredentials`].
    fn credentials(&self) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Remote HTTP storage driver.
#[derive(Debug, Clone)]
pub struct RemoteDriver {
    client: reqwest::Client,
    base: Url,
    credentials: Arc<dyn CredentialSource>,
}

impl RemoteDriver {
    /// Creates a driver for the service at `base` (e.g.
    /// `https://repo.example.org`).
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidUrl`] for an unparseable base URL.
    pub fn new(
        base: &str,
        user_agent: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self> {
        Self::with_timeout(base, user_agent, DEFAULT_REQUEST_TIMEOUT, credentials)
    }

    /// Creates a driver with an explicit whole-request timeout.
    ///
    /// A shorter per-call deadline on the [`OpContext`] still wins.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidUrl`] for an unparseable base URL.
    pub fn with_timeout(
        base: &str,
        user_agent: impl Into<String>,
        request_timeout: Duration,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self> {
        let invalid =
            |message: String| DriverError::InvalidUrl { url: base.to_string(), message };
        let parsed = Url::parse(base).map_err(|error| invalid(error.to_string()))?;
        let client = reqwest::Client::builder()
            .user_agent(user_agent.into())
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|error| invalid(error.to_string()))?;
        Ok(Self { client, base: parsed, credentials })
    }

    /// URL of one object, or of a listing when `key` ends with `/`.
    fn object_url(&self, namespace: Namespace, key: &str) -> Result<Url> {
        let path = format!("repository/{namespace}/{key}");
        self.base.join(&path).map_err(|error| DriverError::InvalidUrl {
            url: format!("{}/{path}", self.base),
            message: error.to_string(),
        })
    }

    /// Issues one request with the required repository headers.
    async fn send(
        &self,
        method: Method,
        url: Url,
        digest: Option<&Digest>,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response> {
        let blob = self.credentials.credentials().map_err(|error| {
            tracing::warn!(%url, %error, "credential source refused to sign");
            DriverError::InvalidCredentials { url: url.to_string(), status: 0 }
        })?;

        let mut request = self
            .client
            .request(method, url.clone())
            .header(HEADER_CREDENTIALS, blob)
            .header(reqwest::header::ACCEPT, MEDIA_TYPE);
        if let Some(digest) = digest {
            request = request.header(HEADER_DIGEST, digest.to_string());
        }
        if let Some(body) = body {
            request = request.header(reqwest::header::CONTENT_TYPE, MEDIA_TYPE).body(body);
        }

        request.send().await.map_err(|error| {
            if error.is_connect() || error.is_timeout() || error.is_request() {
                DriverError::ServerDown { url: url.to_string(), message: error.to_string() }
            } else {
                DriverError::MalformedResponse { url: url.to_string(), message: error.to_string() }
            }
        })
    }
}

/// Maps an unexpected status to a driver error.
fn unexpected_status(
    namespace: Namespace,
    key: &str,
    method: &'static str,
    url: &Url,
    status: StatusCode,
) -> DriverError {
    match status {
        StatusCode::FORBIDDEN => {
            DriverError::InvalidCredentials { url: url.to_string(), status: status.as_u16() }
        },
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            DriverError::Conflict { namespace, key: key.to_string() }
        },
        status if status.is_server_error() => {
            DriverError::ServerDown { url: url.to_string(), message: status.to_string() }
        },
        status => DriverError::Backend {
            namespace,
            key: key.to_string(),
            method,
            message: format!("unexpected status {status}"),
        },
    }
}

#[async_trait]
impl StorageDriver for RemoteDriver {
    async fn exists(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        let url = self.object_url(namespace, key)?;
        ctx.run("exists", async {
            let response = self.send(Method::HEAD, url.clone(), None, None).await?;
            match response.status() {
                StatusCode::OK => Ok(true),
                StatusCode::NOT_FOUND => Ok(false),
                status => Err(unexpected_status(namespace, key, "exists", &url, status)),
            }
        })
        .await
    }

    async fn read(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
    ) -> Result<Option<Bytes>> {
        let url = self.object_url(namespace, key)?;
        ctx.run("read", async {
            let response = self.send(Method::GET, url.clone(), None, None).await?;
            match response.status() {
                StatusCode::OK => {
                    let body = response.bytes().await.map_err(|error| {
                        DriverError::MalformedResponse {
                            url: url.to_string(),
                            message: error.to_string(),
                        }
                    })?;
                    Ok(Some(body))
                },
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(unexpected_status(namespace, key, "read", &url, status)),
            }
        })
        .await
    }

    async fn write(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        key: &str,
        payload: Bytes,
        mode: WriteMode,
        digest: Option<&Digest>,
    ) -> Result<()> {
        let url = self.object_url(namespace, key)?;
        ctx.run("write", async {
            let blob = self.credentials.credentials().map_err(|error| {
                tracing::warn!(%url, %error, "credential source refused to sign");
                DriverError::InvalidCredentials { url: url.to_string(), status: 0 }
            })?;
            let mut request = self
                .client
                .put(url.clone())
                .header(HEADER_CREDENTIALS, blob)
                .header(reqwest::header::ACCEPT, MEDIA_TYPE)
                .header(reqwest::header::CONTENT_TYPE, MEDIA_TYPE)
                .body(payload);
            if mode == WriteMode::CreateOnly {
                request = request.header(reqwest::header::IF_NONE_MATCH, "*");
            }
            if let Some(digest) = digest {
                request = request.header(HEADER_DIGEST, digest.to_string());
            }

            let response = request.send().await.map_err(|error| {
                if error.is_connect() || error.is_timeout() || error.is_request() {
                    DriverError::ServerDown { url: url.to_string(), message: error.to_string() }
                } else {
                    DriverError::MalformedResponse {
                        url: url.to_string(),
                        message: error.to_string(),
                    }
                }
            })?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(()),
                status => Err(unexpected_status(namespace, key, "write", &url, status)),
            }
        })
        .await
    }

    async fn delete(&self, ctx: &OpContext, namespace: Namespace, key: &str) -> Result<bool> {
        let url = self.object_url(namespace, key)?;
        ctx.run("delete", async {
            let response = self.send(Method::DELETE, url.clone(), None, None).await?;
            match response.status() {
                StatusCode::OK => Ok(true),
                StatusCode::NOT_FOUND => Ok(false),
                status => Err(unexpected_status(namespace, key, "delete", &url, status)),
            }
        })
        .await
    }

    async fn list(
        &self,
        ctx: &OpContext,
        namespace: Namespace,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<String>> {
        let mut url = self.object_url(namespace, "")?;
        url.query_pairs_mut()
            .append_pair("prefix", prefix)
            .append_pair("max-keys", &max_keys.to_string());
        ctx.run("list", async {
            let response = self.send(Method::GET, url.clone(), None, None).await?;
            match response.status() {
                StatusCode::OK => {
                    let body = response.bytes().await.map_err(|error| {
                        DriverError::MalformedResponse {
                            url: url.to_string(),
                            message: error.to_string(),
                        }
                    })?;
                    let keys: Vec<String> =
                        serde_json::from_slice(&body).map_err(|error| {
                            DriverError::MalformedResponse {
                                url: url.to_string(),
                                message: format!("listing is not a JSON string array: {error}"),
                            }
                        })?;
                    Ok(keys)
                },
                status => Err(unexpected_status(namespace, prefix, "list", &url, status)),
            }
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StaticCredentials;

    impl CredentialSource for StaticCredentials {
        fn credentials(
            &self,
        ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Ok("0123456789ABCDFGHJKLMNPQRSTVWXYZ".to_string())
        }
    }

    fn driver() -> RemoteDriver {
        RemoteDriver::new(
            "https://repo.example.org",
            "nebula-repository/0.3",
            Arc::new(StaticCredentials),
        )
        .unwrap()
    }

    #[test]
    fn test_object_urls_follow_the_wire_layout() {
        let driver = driver();
        let url = driver.object_url(Namespace::Documents, "TAG/v1.2.3").unwrap();
        assert_eq!(url.as_str(), "https://repo.example.org/repository/documents/TAG/v1.2.3");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result =
            RemoteDriver::new("not a url", "nebula-repository/0.3", Arc::new(StaticCredentials));
        assert!(matches!(result, Err(DriverError::InvalidUrl { .. })));
    }

    #[test]
    fn test_status_mapping() {
        let url = Url::parse("https://repo.example.org/repository/names/a").unwrap();
        let forbidden =
            unexpected_status(Namespace::Names, "a", "write", &url, StatusCode::FORBIDDEN);
        assert!(matches!(forbidden, DriverError::InvalidCredentials { status: 403, .. }));

        let conflict =
            unexpected_status(Namespace::Names, "a", "write", &url, StatusCode::CONFLICT);
        assert!(conflict.is_conflict());

        let precondition =
            unexpected_status(Namespace::Names, "a", "write", &url, StatusCode::PRECONDITION_FAILED);
        assert!(precondition.is_conflict());

        let unavailable =
            unexpected_status(Namespace::Names, "a", "read", &url, StatusCode::BAD_GATEWAY);
        assert!(matches!(unavailable, DriverError::ServerDown { .. }));

        let odd = unexpected_status(Namespace::Names, "a", "read", &url, StatusCode::IM_A_TEAPOT);
        assert!(matches!(odd, DriverError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_maps_to_server_down() {
        // Port 9 (discard) on localhost is not listening.
        let driver = RemoteDriver::new(
            "http://127.0.0.1:9",
            "nebula-repository/0.3",
            Arc::new(StaticCredentials),
        )
        .unwrap();
        let err = driver
            .exists(&OpContext::new(), Namespace::Names, "a/v1")
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::ServerDown { .. }), "got {err:?}");
    }
}
