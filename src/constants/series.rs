pub const GENERAL_INFO: &str = "general_info";
pub const PRODUCTION: &str = "production";
pub const TOTAL_CONSUMPTION: &str = "total_consumption";
pub const NET_CONSUMPTION: &str = "net_consumption";

pub const PER_INVERTER: &str = "per_inverter";
