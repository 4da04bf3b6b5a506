mod backoff_retry;
mod load_dotenv;
mod time;

pub use backoff_retry::{backoff_retry, RetryPolicy, Retryable};
pub use load_dotenv::load_dotenv;
pub use time::epoch_to_iso;
