use std::time::Duration;

pub const LOG_LEVEL: &str = "info";

pub const AGGREGATE_URL: &str = "http://enphase.ayent/production.json";

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const FETCH_RETRIES: u32 = 3;
pub const BACKOFF_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
pub const BACKOFF_MULTIPLIER: f64 = 2.0;
pub const BACKOFF_RANDOMIZATION: f64 = 0.1;

pub const INFLUX_HOST: &str = "localhost";
pub const INFLUX_PORT: u16 = 8086;
pub const INFLUX_USER: &str = "admin";
pub const INFLUX_PASSWORD: &str = "admin";
pub const INFLUX_DB: &str = "enphase";
