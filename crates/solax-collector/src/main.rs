use std::env;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{info, warn};

use discovery::discover;
use http_client::{HttpClient, Transport};
use poller_actor::{unix_ms, PollSample, PollerActor};
use solax_collector::CollectorConfig;
use solax_protocol::{Inverter, Registry};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON samples.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = parse_args();
    let config = CollectorConfig::load_with_path(args.config).context("load config failed")?;
    config.validate().context("config validation failed")?;

    let transport: Arc<dyn Transport> =
        Arc::new(HttpClient::new(config.http.clone()).context("http client init failed")?);
    let registry = Registry::builtin().context("builtin variant registry invalid")?;

    if args.once {
        return poll_once(&config, transport, &registry).await;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let sink_handle = tokio::spawn(sink_task(rx, shutdown_rx.clone()));
    let supervisor_handle = tokio::spawn(supervise(
        config,
        transport,
        registry,
        tx,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal failed")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    if let Err(err) = supervisor_handle.await {
        warn!(error = %err, "supervisor task join failed");
    }
    if let Err(err) = sink_handle.await {
        warn!(error = %err, "sink task join failed");
    }
    Ok(())
}

async fn poll_once(
    config: &CollectorConfig,
    transport: Arc<dyn Transport>,
    registry: &Registry,
) -> Result<()> {
    let inverter = discover(&config.inverter, transport, registry)
        .await
        .context("inverter discovery failed")?;
    let (response, readings) = inverter
        .get_response()
        .await
        .context("inverter poll failed")?;

    let sample = PollSample::new(&inverter, response, readings, unix_ms());
    write_sample(&sample).context("write sample failed")?;
    Ok(())
}

/// Discover, poll until the poller gives up, then start over.
async fn supervise(
    config: CollectorConfig,
    transport: Arc<dyn Transport>,
    registry: Registry,
    sender: mpsc::Sender<PollSample>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let inverter = match discover_with_backoff(&config, &transport, &registry, &mut shutdown).await {
            Some(inverter) => inverter,
            None => break,
        };

        let actor = PollerActor::new(
            inverter,
            sender.clone(),
            shutdown.clone(),
            config.poller.clone(),
        );
        match actor.run().await {
            Ok(()) => {
                info!("poller exited cleanly");
                break;
            }
            Err(err) => warn!(error = %err, "poller exited with error"),
        }

        tokio::select! {
            _ = sleep(Duration::from_millis(config.respawn_delay_ms)) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Returns `None` once shutdown is requested.
async fn discover_with_backoff(
    config: &CollectorConfig,
    transport: &Arc<dyn Transport>,
    registry: &Registry,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<Inverter> {
    let mut failures: u32 = 0;
    loop {
        if *shutdown.borrow() {
            return None;
        }

        tokio::select! {
            result = discover(&config.inverter, Arc::clone(transport), registry) => {
                match result {
                    Ok(inverter) => return Some(inverter),
                    Err(err) => {
                        failures = failures.saturating_add(1);
                        warn!(error = %err, failures, "inverter discovery failed");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return None;
                }
                continue;
            }
        }

        let delay = discovery_delay(
            failures,
            Duration::from_millis(config.discovery_backoff_ms),
            Duration::from_millis(config.discovery_backoff_max_ms),
        );
        tokio::select! {
            _ = sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return None;
                }
            }
        }
    }
}

async fn sink_task(mut rx: mpsc::Receiver<PollSample>, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            maybe_sample = rx.recv() => {
                match maybe_sample {
                    Some(sample) => {
                        if let Err(err) = write_sample(&sample) {
                            warn!(error = %err, "sample output failed");
                        }
                    }
                    None => break,
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("sink shutdown requested");
                    break;
                }
            }
        }
    }
}

fn write_sample(sample: &PollSample) -> Result<()> {
    let line = serde_json::to_string(sample).context("serialize sample")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").context("write stdout")?;
    stdout.flush().context("flush stdout")?;
    Ok(())
}

fn discovery_delay(failures: u32, backoff_base: Duration, backoff_max: Duration) -> Duration {
    let shift = failures.saturating_sub(1).min(31);
    let candidate = backoff_base.saturating_mul(1u32 << shift);
    candidate.min(backoff_max)
}

struct Args {
    config: Option<String>,
    once: bool,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        once: false,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            parsed.config = args.next();
        } else if let Some(path) = arg.strip_prefix("--config=") {
            parsed.config = Some(path.to_string());
        } else if arg == "--once" {
            parsed.once = true;
        } else {
            warn!(argument = %arg, "ignoring unknown argument");
        }
    }
    parsed
}
