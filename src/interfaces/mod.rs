pub mod digest_auth;
pub mod gateway;
pub mod influx;

pub use gateway::{Auth, FetchError, JsonFetcher};
pub use influx::{InfluxSink, PointSink, SinkConfig, SinkError};
