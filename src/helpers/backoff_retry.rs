use std::fmt::Display;
use std::time::Duration;

use backoff::{retry_notify, Error, ExponentialBackoff, ExponentialBackoffBuilder};

use crate::constants::defaults;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Exponential backoff bounded by a fixed number of retries after the first attempt
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub randomization_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: defaults::FETCH_RETRIES,
            initial_interval: defaults::BACKOFF_INITIAL_INTERVAL,
            multiplier: defaults::BACKOFF_MULTIPLIER,
            randomization_factor: defaults::BACKOFF_RANDOMIZATION,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        // Retries are bounded by count, not by elapsed time
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.randomization_factor)
            .with_max_elapsed_time(None)
            .build()
    }
}

pub fn backoff_retry<F, T, E>(policy: &RetryPolicy, mut fn_to_try: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display + Retryable,
{
    let mut attempt: u32 = 0;
    let operation = || {
        attempt += 1;
        fn_to_try().map_err(|err| {
            if err.is_transient() && attempt <= policy.max_retries {
                Error::transient(err)
            } else {
                Error::permanent(err)
            }
        })
    };

    let notify = |err: E, dur: Duration| {
        log::error!(
            "Temporary error, retrying in {:.1}s: {}",
            dur.as_secs_f32(),
            err
        );
    };

    retry_notify(policy.backoff(), operation, notify).map_err(|e| match e {
        Error::Permanent(err) => err,
        Error::Transient { err, .. } => err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (transient: {})", self.transient)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn quick_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_interval: Duration::from_millis(1),
            multiplier: 1.0,
            randomization_factor: 0.0,
        }
    }

    #[test]
    fn test_transient_error_then_success() {
        let mut calls = 0;
        let result = backoff_retry(&quick_policy(3), || {
            calls += 1;
            if calls < 3 {
                Err(TestError { transient: true })
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = backoff_retry(&quick_policy(3), || {
            calls += 1;
            Err(TestError { transient: false })
        });
        assert!(!result.unwrap_err().transient);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_retries_are_bounded() {
        let mut calls = 0;
        let result: Result<(), _> = backoff_retry(&quick_policy(2), || {
            calls += 1;
            Err(TestError { transient: true })
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
