use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::defaults;
use crate::helpers::RetryPolicy;
use crate::interfaces::digest_auth::DigestCredentials;
use crate::interfaces::{Auth, SinkConfig};

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("could not read token file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("token file {} is empty", .0.display())]
    EmptyToken(PathBuf),
}

/// Everything one push run needs
#[derive(Clone, Debug, PartialEq)]
pub struct PushConfig {
    pub aggregate_url: String,
    pub per_inverter: Option<PerInverterConfig>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub sink: SinkConfig,
    /// Exit non-zero when a phase fails
    pub strict: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            aggregate_url: defaults::AGGREGATE_URL.into(),
            per_inverter: None,
            timeout: defaults::FETCH_TIMEOUT,
            retry: RetryPolicy::default(),
            sink: SinkConfig::default(),
            strict: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PerInverterConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token_file: Option<PathBuf>,
}

impl PerInverterConfig {
    /// A bearer token file takes precedence over digest credentials
    pub fn resolve_auth(&self) -> Result<Auth, CredentialsError> {
        if let Some(path) = &self.auth_token_file {
            let token = fs::read_to_string(path).map_err(|source| CredentialsError::Read {
                path: path.clone(),
                source,
            })?;
            let token = token.trim();
            if token.is_empty() {
                return Err(CredentialsError::EmptyToken(path.clone()));
            }
            if self.username.is_some() {
                log::debug!("Token file given; ignoring digest credentials");
            }
            return Ok(Auth::Bearer(token.to_string()));
        }

        Ok(match &self.username {
            Some(username) => Auth::Digest(DigestCredentials {
                username: username.clone(),
                password: self.password.clone().unwrap_or_default(),
            }),
            None => Auth::None,
        })
    }
}
