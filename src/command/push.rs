use std::time::Duration;

use anyhow::{anyhow, Result};
use thiserror::Error;

use crate::config::{CredentialsError, PerInverterConfig, PushConfig};
use crate::constants::series;
use crate::data_mgmt::aggregate::{extract_readings, forward_reading, log_reading_times};
use crate::data_mgmt::models::Point;
use crate::data_mgmt::payload::PayloadError;
use crate::data_mgmt::per_inverter::{parse_statuses, InverterStatus};
use crate::data_mgmt::watermark::Watermarks;
use crate::helpers::RetryPolicy;
use crate::interfaces::{Auth, FetchError, InfluxSink, JsonFetcher, PointSink, SinkError};

#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("unexpected payload: {0}")]
    Payload(#[from] PayloadError),
    #[error("credentials unavailable: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("write failed: {0}")]
    Sink(#[from] SinkError),
    #[error("{failed} of {attempted} writes failed")]
    Write { failed: usize, attempted: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub written: usize,
    pub skipped: usize,
}

/// Outcome of each phase of one run; a failed phase never prevents the other
#[derive(Debug)]
pub struct RunSummary {
    pub aggregate: Result<PhaseReport, PhaseError>,
    /// `None` when no per-inverter endpoint is configured
    pub per_inverter: Option<Result<PhaseReport, PhaseError>>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.aggregate.is_ok() && !matches!(self.per_inverter, Some(Err(_)))
    }
}

/// Fetch, transform and write both phases once against the given sink
pub fn push_once(
    config: &PushConfig,
    sink: &dyn PointSink,
    watermarks: &mut Watermarks,
) -> RunSummary {
    let aggregate = push_aggregate(config, sink, watermarks);
    log_phase("Aggregate", &aggregate);

    let per_inverter = match &config.per_inverter {
        Some(per_inverter) => {
            let result = push_per_inverter(per_inverter, config.timeout, &config.retry, sink);
            log_phase("Per-inverter", &result);
            Some(result)
        }
        None => {
            log::debug!("No per-inverter endpoint configured; skipping");
            None
        }
    };

    RunSummary {
        aggregate,
        per_inverter,
    }
}

/// One full run against the InfluxDB sink described by `config.sink`
pub fn push(config: &PushConfig) -> Result<RunSummary> {
    let sink = InfluxSink::new(&config.sink)?;
    let mut watermarks = Watermarks::default();
    Ok(push_once(config, &sink, &mut watermarks))
}

/// Phase failures, including a sink that could not be set up, only fail the process in strict mode
pub fn finish(outcome: Result<RunSummary>, strict: bool) -> Result<()> {
    let succeeded = match outcome {
        Ok(summary) => summary.is_success(),
        Err(e) => {
            log::error!("Push not attempted: {e:#}");
            false
        }
    };

    if strict && !succeeded {
        return Err(anyhow!("One or more phases failed"));
    }
    Ok(())
}

fn push_aggregate(
    config: &PushConfig,
    sink: &dyn PointSink,
    watermarks: &mut Watermarks,
) -> Result<PhaseReport, PhaseError> {
    let fetcher = JsonFetcher::new(config.timeout, true, config.retry.clone());
    let payload = fetcher.fetch_json(&config.aggregate_url, &Auth::None)?;

    // Shape problems abort before anything is written
    let readings = extract_readings(&payload)?;
    log_reading_times(&readings);

    let attempted = readings.len();
    let mut report = PhaseReport::default();
    let mut failed = 0;
    for reading in readings {
        let kind = reading.kind;
        match forward_reading(reading, watermarks, sink) {
            Ok(true) => report.written += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                log::error!("Failed to push {} reading: {}", kind.description(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(PhaseError::Write { failed, attempted });
    }
    Ok(report)
}

fn push_per_inverter(
    config: &PerInverterConfig,
    timeout: Duration,
    retry: &RetryPolicy,
    sink: &dyn PointSink,
) -> Result<PhaseReport, PhaseError> {
    let auth = config.resolve_auth()?;
    // The gateway serves a self-signed certificate
    let fetcher = JsonFetcher::new(timeout, false, retry.clone());
    let payload = fetcher.fetch_json(&config.url, &auth)?;

    let points: Vec<Point> = parse_statuses(payload)?
        .iter()
        .map(InverterStatus::to_point)
        .collect();
    log::info!(
        "Pushing {} inverter statuses to '{}'",
        points.len(),
        series::PER_INVERTER
    );
    sink.write_points(&points)?;

    Ok(PhaseReport {
        written: points.len(),
        skipped: 0,
    })
}

fn log_phase(phase: &str, result: &Result<PhaseReport, PhaseError>) {
    match result {
        Ok(report) => log::info!(
            "{} phase done: {} written, {} skipped",
            phase,
            report.written,
            report.skipped
        ),
        Err(e) => log::error!("{} phase failed: {}", phase, e),
    }
}
