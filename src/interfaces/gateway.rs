//! Blocking JSON fetcher for the Envoy gateway's local HTTP API
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use ureq::http::{header, Response, StatusCode};
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};
use ureq::{Agent, Body};
use url::Url;

use crate::helpers::{backoff_retry, RetryPolicy, Retryable};

use super::digest_auth::{self, DigestChallenge, DigestCredentials, DigestError};

/// Server errors worth another attempt; anything else non-2xx is final
const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} did not return valid JSON: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("digest authentication with {url} failed: {source}")]
    Digest {
        url: String,
        #[source]
        source: DigestError,
    },
    #[error("{url} rejected the supplied credentials")]
    Unauthorized { url: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            _ => None,
        }
    }
}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            _ => self
                .status()
                .is_some_and(|status| RETRY_STATUSES.contains(&status)),
        }
    }
}

/// How requests to an endpoint authenticate
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Auth {
    #[default]
    None,
    /// Answer a `WWW-Authenticate: Digest` challenge with these credentials
    Digest(DigestCredentials),
    /// Send `Authorization: Bearer <token>` up front
    Bearer(String),
}

pub struct JsonFetcher {
    agent: Agent,
    retry: RetryPolicy,
}

impl JsonFetcher {
    /// `verify_tls = false` accepts the self-signed certificate the gateway ships with
    pub fn new(timeout: Duration, verify_tls: bool, retry: RetryPolicy) -> Self {
        let tls_config = TlsConfig::builder()
            .provider(TlsProvider::NativeTls)
            .root_certs(RootCerts::PlatformVerifier)
            .disable_verification(!verify_tls)
            .build();

        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .tls_config(tls_config)
            .build();

        JsonFetcher {
            agent: Agent::new_with_config(config),
            retry,
        }
    }

    /// GET `url` and parse the body as JSON, retrying transient failures
    pub fn fetch_json(&self, url: &str, auth: &Auth) -> Result<Value, FetchError> {
        backoff_retry(&self.retry, || self.fetch_once(url, auth))
    }

    fn fetch_once(&self, url: &str, auth: &Auth) -> Result<Value, FetchError> {
        let authorization = match auth {
            Auth::Bearer(token) => Some(format!("Bearer {token}")),
            _ => None,
        };

        let mut response = self.get(url, authorization)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Auth::Digest(credentials) = auth {
                response = self.answer_digest_challenge(url, credentials, &response)?;
                if response.status() == StatusCode::UNAUTHORIZED {
                    return Err(FetchError::Unauthorized {
                        url: url.to_string(),
                    });
                }
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        log::trace!("Response from {url}: {body}");

        serde_json::from_str(&body).map_err(|source| FetchError::Json {
            url: url.to_string(),
            source,
        })
    }

    fn get(&self, url: &str, authorization: Option<String>) -> Result<Response<Body>, FetchError> {
        log::debug!("GET {url}");
        let mut request = self.agent.get(url);
        if let Some(value) = authorization {
            request = request.header("Authorization", value);
        }
        request.call().map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }

    fn answer_digest_challenge(
        &self,
        url: &str,
        credentials: &DigestCredentials,
        unauthorized: &Response<Body>,
    ) -> Result<Response<Body>, FetchError> {
        let digest_err = |source: DigestError| FetchError::Digest {
            url: url.to_string(),
            source,
        };

        let challenge_header = unauthorized
            .headers()
            .get_all(header::WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.trim_start().to_ascii_lowercase().starts_with("digest"))
            .ok_or_else(|| {
                digest_err(DigestError::NotDigest(
                    "no Digest challenge in WWW-Authenticate".into(),
                ))
            })?;
        let challenge = DigestChallenge::parse(challenge_header).map_err(digest_err)?;

        let authorization = digest_auth::authorization(
            credentials,
            &challenge,
            "GET",
            &request_uri(url)?,
            &digest_auth::new_cnonce(),
        );
        log::debug!("Answering digest challenge for realm '{}'", challenge.realm);
        self.get(url, Some(authorization))
    }
}

/// Path and query of `url`, as the digest `uri` parameter expects
fn request_uri(url: &str) -> Result<String, FetchError> {
    let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    Ok(match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    })
}
