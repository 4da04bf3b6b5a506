pub mod aggregate;
pub mod models;
pub mod payload;
pub mod per_inverter;
pub mod watermark;
