//! Time-series sink backed by the InfluxDB 1.x HTTP write API
use std::env;

use influxdb::{Client, Timestamp, Type, WriteQuery};
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

use crate::constants::{defaults, envvars};
use crate::data_mgmt::models::{FieldValue, Point};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("malformed point for '{measurement}': {reason}")]
    MalformedPoint {
        measurement: String,
        reason: &'static str,
    },
    #[error("InfluxDB write failed: {0}")]
    Write(#[from] influxdb::Error),
    #[error("could not start I/O runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Anything that accepts a batch of points in one write call
pub trait PointSink {
    fn write_points(&self, points: &[Point]) -> Result<(), SinkError>;
}

/// Where and as whom to write
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            host: defaults::INFLUX_HOST.into(),
            port: defaults::INFLUX_PORT,
            username: defaults::INFLUX_USER.into(),
            password: defaults::INFLUX_PASSWORD.into(),
            database: defaults::INFLUX_DB.into(),
        }
    }
}

impl SinkConfig {
    /// Defaults, overridden by any `INFLUX_*` variables that are set
    pub fn from_env() -> Self {
        let defaults = SinkConfig::default();
        let port = match env::var(envvars::INFLUX_PORT) {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                log::warn!(
                    "Ignoring invalid {}='{raw}' ({e}); using {}",
                    envvars::INFLUX_PORT,
                    defaults.port
                );
                defaults.port
            }),
            Err(_) => defaults.port,
        };
        SinkConfig {
            host: env::var(envvars::INFLUX_HOST).unwrap_or(defaults.host),
            port,
            username: env::var(envvars::INFLUX_USER).unwrap_or(defaults.username),
            password: env::var(envvars::INFLUX_PASSWORD).unwrap_or(defaults.password),
            database: env::var(envvars::INFLUX_DB).unwrap_or(defaults.database),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

pub struct InfluxSink {
    client: Client,
    runtime: Runtime,
}

impl InfluxSink {
    pub fn new(config: &SinkConfig) -> Result<Self, SinkError> {
        let client = Client::new(config.url(), &config.database)
            .with_auth(&config.username, &config.password);
        // The client is async; the rest of the run is not
        let runtime = Builder::new_current_thread().enable_all().build()?;
        log::debug!(
            "InfluxDB sink at {} (database '{}')",
            config.url(),
            config.database
        );
        Ok(InfluxSink { client, runtime })
    }
}

impl PointSink for InfluxSink {
    fn write_points(&self, points: &[Point]) -> Result<(), SinkError> {
        if points.is_empty() {
            return Ok(());
        }
        let queries = points
            .iter()
            .map(write_query)
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!("Writing points: {:?}", points);

        self.runtime.block_on(self.client.query(queries))?;
        Ok(())
    }
}

fn write_query(point: &Point) -> Result<WriteQuery, SinkError> {
    let malformed = |reason| SinkError::MalformedPoint {
        measurement: point.measurement.clone(),
        reason,
    };

    if point.fields.is_empty() {
        return Err(malformed("no fields"));
    }
    let time = u128::try_from(point.time).map_err(|_| malformed("negative timestamp"))?;

    let query = point.tags.iter().fold(
        WriteQuery::new(Timestamp::Seconds(time), point.measurement.as_str()),
        |query, (key, value)| query.add_tag(key.as_str(), value.as_str()),
    );
    Ok(point.fields.iter().fold(query, |query, (key, value)| {
        query.add_field(key.as_str(), field_type(value))
    }))
}

fn field_type(value: &FieldValue) -> Type {
    match value {
        FieldValue::Int(i) => Type::SignedInteger(*i),
        FieldValue::Float(f) => Type::Float(*f),
        FieldValue::Bool(b) => Type::Boolean(*b),
        FieldValue::String(s) => Type::Text(s.clone()),
    }
}
