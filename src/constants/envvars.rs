pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub const INFLUX_HOST: &str = "INFLUX_HOST";
pub const INFLUX_PORT: &str = "INFLUX_PORT";
pub const INFLUX_USER: &str = "INFLUX_USER";
pub const INFLUX_PASSWORD: &str = "INFLUX_PASSWORD";
pub const INFLUX_DB: &str = "INFLUX_DB";
