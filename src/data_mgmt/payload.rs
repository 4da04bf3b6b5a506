use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("missing or non-array '{0}' section")]
    MissingSection(&'static str),
    #[error("'{section}' has no entry at index {index}")]
    MissingEntry { section: &'static str, index: usize },
    #[error("'{section}[{index}]' is not an object")]
    NotAnObject { section: &'static str, index: usize },
    #[error("'{section}[{index}]' has no valid readingTime")]
    InvalidReadingTime { section: &'static str, index: usize },
    #[error("could not parse inverter statuses: {0}")]
    InverterStatuses(#[from] serde_json::Error),
}
