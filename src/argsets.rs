#[cfg(test)]
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use pico_args::Arguments;
use url::Url;

use crate::config::{PerInverterConfig, PushConfig};
use crate::interfaces::SinkConfig;

pub const USAGE: &str = "\
Push Enphase Envoy readings to InfluxDB (one pass per invocation)

USAGE:
    enphase-push [OPTIONS]

OPTIONS:
    --url <URL>                       Production/consumption JSON endpoint
                                      [default: http://enphase.ayent/production.json]
    --per_inverter_url <URL>          Per-inverter JSON endpoint; skipped when omitted
    --per_inverter_username <USER>    Digest username for the per-inverter endpoint
    --per_inverter_password <PASS>    Digest password for the per-inverter endpoint
    --auth_token_file <PATH>          File holding a bearer token (overrides digest auth)
    --timeout <SECONDS>               Per-request timeout [default: 5]
    --strict                          Exit with an error if any phase failed
    -h, --help                        Print this help

ENVIRONMENT:
    INFLUX_HOST, INFLUX_PORT, INFLUX_USER, INFLUX_PASSWORD, INFLUX_DB
    LOG_LEVEL
";

#[derive(Debug, Default, PartialEq)]
pub struct PushArgs {
    pub help: bool,
    pub url: Option<String>,
    pub per_inverter_url: Option<String>,
    pub per_inverter_username: Option<String>,
    pub per_inverter_password: Option<String>,
    pub auth_token_file: Option<PathBuf>,
    pub timeout_secs: Option<f64>,
    pub strict: bool,
}

impl PushArgs {
    pub fn from_env() -> Result<Self> {
        Self::parse(Arguments::from_env())
    }

    #[cfg(test)]
    pub fn from_vec(args: Vec<OsString>) -> Result<Self> {
        Self::parse(Arguments::from_vec(args))
    }

    fn parse(mut args: Arguments) -> Result<Self> {
        let parsed = PushArgs {
            help: args.contains(["-h", "--help"]),
            strict: args.contains("--strict"),
            url: args.opt_value_from_str("--url")?,
            per_inverter_url: args.opt_value_from_str("--per_inverter_url")?,
            per_inverter_username: args.opt_value_from_str("--per_inverter_username")?,
            per_inverter_password: args.opt_value_from_str("--per_inverter_password")?,
            auth_token_file: args.opt_value_from_str("--auth_token_file")?,
            timeout_secs: args.opt_value_from_str("--timeout")?,
        };

        let remaining = args.finish();
        if !remaining.is_empty() {
            return Err(anyhow!("Unexpected arguments: {:?}", remaining));
        }
        Ok(parsed)
    }

    /// Credential flags that the given combination of flags leaves unused
    fn ignored_credentials(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.per_inverter_url.is_none() {
            if self.per_inverter_username.is_some() {
                ignored.push("--per_inverter_username");
            }
            if self.per_inverter_password.is_some() {
                ignored.push("--per_inverter_password");
            }
            if self.auth_token_file.is_some() {
                ignored.push("--auth_token_file");
            }
        } else if self.per_inverter_password.is_some()
            && self.per_inverter_username.is_none()
            && self.auth_token_file.is_none()
        {
            ignored.push("--per_inverter_password");
        }
        ignored
    }

    pub fn into_config(self, sink: SinkConfig) -> Result<PushConfig> {
        let ignored = self.ignored_credentials();
        if !ignored.is_empty() {
            log::warn!(
                "Ignoring {} (needs --per_inverter_url, and a password needs --per_inverter_username)",
                ignored.join(", ")
            );
        }

        let mut config = PushConfig {
            sink,
            strict: self.strict,
            ..PushConfig::default()
        };

        if let Some(url) = self.url {
            config.aggregate_url = url;
        }
        Url::parse(&config.aggregate_url)
            .with_context(|| format!("Invalid --url '{}'", config.aggregate_url))?;

        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|t| !t.is_zero())
                .ok_or_else(|| anyhow!("--timeout must be a positive number of seconds"))?;
        }

        config.per_inverter = match self.per_inverter_url {
            Some(url) => {
                Url::parse(&url).with_context(|| format!("Invalid --per_inverter_url '{url}'"))?;
                Some(PerInverterConfig {
                    url,
                    username: self.per_inverter_username,
                    password: self.per_inverter_password,
                    auth_token_file: self.auth_token_file,
                })
            }
            None => None,
        };

        Ok(config)
    }
}
