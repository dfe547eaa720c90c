use std::fmt;
use std::sync::Arc;

use http_client::Transport;
use solax_protocol::{Inverter, InverterError, Registry, VariantDefinition};
use thiserror::Error;
use tracing::{debug, info, warn};
use types::{InverterEndpoint, SensorReadings};

/// Why one registered variant did not match the device.
#[derive(Debug)]
pub struct VariantFailure {
    pub variant: &'static str,
    pub error: InverterError,
}

impl fmt::Display for VariantFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.variant, self.error)
    }
}

#[derive(Debug, Error)]
#[error(
    "unable to connect to the inverter at host={host} port={port}, or the inverter is not supported yet; failures=[{}]",
    render_failures(.failures)
)]
pub struct DiscoveryError {
    pub host: String,
    pub port: u16,
    /// One entry per registered variant, in registry order.
    pub failures: Vec<VariantFailure>,
}

fn render_failures(failures: &[VariantFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Probe each registered variant in order and return the first that decodes.
///
/// Probes run one at a time. Dropping the returned future abandons the run
/// without exposing a bound instance.
pub async fn discover(
    endpoint: &InverterEndpoint,
    transport: Arc<dyn Transport>,
    registry: &Registry,
) -> Result<Inverter, DiscoveryError> {
    let mut failures = Vec::with_capacity(registry.len());

    for (attempt, variant) in registry.iter().enumerate() {
        debug!(
            host = %endpoint.host,
            port = endpoint.port,
            attempt,
            variant = variant.name,
            "probing inverter variant"
        );
        match probe(variant, endpoint, &transport).await {
            Ok((inverter, readings)) => {
                info!(
                    host = %endpoint.host,
                    port = endpoint.port,
                    variant = variant.name,
                    sensors = readings.len(),
                    "inverter discovered"
                );
                return Ok(inverter);
            }
            Err(error) => {
                warn!(
                    host = %endpoint.host,
                    port = endpoint.port,
                    variant = variant.name,
                    error = %error,
                    "variant did not match"
                );
                failures.push(VariantFailure {
                    variant: variant.name,
                    error,
                });
            }
        }
    }

    Err(DiscoveryError {
        host: endpoint.host.clone(),
        port: endpoint.port,
        failures,
    })
}

async fn probe(
    variant: &'static VariantDefinition,
    endpoint: &InverterEndpoint,
    transport: &Arc<dyn Transport>,
) -> Result<(Inverter, SensorReadings), InverterError> {
    let inverter = Inverter::new(variant, endpoint.clone(), Arc::clone(transport))?;
    let readings = inverter.get_data().await?;
    Ok((inverter, readings))
}
