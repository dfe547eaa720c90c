use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use solax_protocol::{Inverter, ValidatedResponse};
use types::SensorReadings;

#[derive(Debug, Clone)]
pub struct ActorConfig {
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub jitter_ms: u64,
    /// Give up after this many failed polls in a row; 0 keeps polling forever.
    pub max_consecutive_failures: u32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            jitter_ms: 0,
            max_consecutive_failures: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("{failures} consecutive polls failed, last error: {last}")]
    TooManyFailures { failures: u32, last: String },
}

/// One successful poll of one inverter.
#[derive(Debug, Clone, Serialize)]
pub struct PollSample {
    pub host: String,
    pub port: u16,
    pub variant: &'static str,
    pub serial: String,
    pub firmware: String,
    pub readings: SensorReadings,
    pub collected_at_ms: u64,
}

impl PollSample {
    pub fn new(
        inverter: &Inverter,
        response: ValidatedResponse,
        readings: SensorReadings,
        collected_at_ms: u64,
    ) -> Self {
        let endpoint = inverter.endpoint();
        Self {
            host: endpoint.host.clone(),
            port: endpoint.port,
            variant: inverter.variant().name,
            serial: response.serial,
            firmware: response.version,
            readings,
            collected_at_ms,
        }
    }
}

/// Polls one discovered inverter until shutdown or too many failures.
pub struct PollerActor {
    inverter: Inverter,
    sender: mpsc::Sender<PollSample>,
    shutdown: watch::Receiver<bool>,
    config: ActorConfig,
}

impl PollerActor {
    pub fn new(
        inverter: Inverter,
        sender: mpsc::Sender<PollSample>,
        shutdown: watch::Receiver<bool>,
        config: ActorConfig,
    ) -> Self {
        Self {
            inverter,
            sender,
            shutdown,
            config,
        }
    }

    pub async fn run(mut self) -> Result<(), PollerError> {
        let host = self.inverter.endpoint().host.clone();
        let variant = self.inverter.variant().name;
        let mut iteration = 0u64;
        let mut consecutive_failures = 0u32;

        loop {
            if *self.shutdown.borrow() {
                info!(host = %host, "poller shutdown requested");
                break;
            }

            let started = Instant::now();
            let outcome = match timeout(self.config.request_timeout, self.inverter.get_response()).await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(err)) => Err(err.to_string()),
                Err(_) => Err(format!(
                    "poll timed out after {}ms",
                    self.config.request_timeout.as_millis()
                )),
            };
            let elapsed = started.elapsed();
            histogram!("solax_poll_duration_seconds", "variant" => variant).record(elapsed.as_secs_f64());

            match outcome {
                Ok((response, readings)) => {
                    consecutive_failures = 0;
                    counter!("solax_poll_success_total", "variant" => variant).increment(1);
                    let sample = PollSample::new(&self.inverter, response, readings, unix_ms());

                    if let Err(err) = self.sender.send(sample).await {
                        warn!(host = %host, error = %err, "telemetry channel closed");
                        break;
                    }
                }
                Err(last) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    counter!("solax_poll_failure_total", "variant" => variant).increment(1);
                    warn!(
                        host = %host,
                        variant,
                        consecutive_failures,
                        error = %last,
                        "inverter poll failed"
                    );
                    if self.config.max_consecutive_failures > 0
                        && consecutive_failures >= self.config.max_consecutive_failures
                    {
                        return Err(PollerError::TooManyFailures {
                            failures: consecutive_failures,
                            last,
                        });
                    }
                }
            }

            iteration = iteration.wrapping_add(1);
            let delay = jittered_delay(self.config.poll_interval, self.config.jitter_ms, iteration);
            info!(
                host = %host,
                variant,
                elapsed_ms = elapsed.as_millis() as u64,
                consecutive_failures,
                delay_ms = delay.as_millis() as u64,
                "poll cycle complete"
            );

            tokio::select! {
                _ = sleep(delay) => {},
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!(host = %host, "poller shutdown requested");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

fn jittered_delay(base: Duration, jitter_ms: u64, iteration: u64) -> Duration {
    if jitter_ms == 0 {
        return base;
    }

    let seed = unix_ms().wrapping_add(iteration.wrapping_mul(1_664_525));
    base + Duration::from_millis(seed % jitter_ms)
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
