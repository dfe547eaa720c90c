use std::fmt;
use std::sync::Arc;

use http_client::{Transport, TransportError};
use thiserror::Error;
use tracing::debug;
use types::{InverterEndpoint, SensorReadings};

use crate::schema::{SchemaError, ValidatedResponse};
use crate::variant::{DefinitionError, VariantDefinition};

#[derive(Debug, Error)]
pub enum InverterError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("definition: {0}")]
    Definition(#[from] DefinitionError),
}

/// Body of the real-time data request.
pub fn real_time_request_body(password: &str) -> String {
    format!("optType=ReadRealTimeData, pwd={password}")
}

/// A variant bound to one device. Each call is independent of the last.
#[derive(Clone)]
pub struct Inverter {
    variant: &'static VariantDefinition,
    endpoint: InverterEndpoint,
    transport: Arc<dyn Transport>,
}

impl Inverter {
    /// Fails when `variant` does not pass [`VariantDefinition::check`].
    pub fn new(
        variant: &'static VariantDefinition,
        endpoint: InverterEndpoint,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DefinitionError> {
        variant.check()?;
        Ok(Self {
            variant,
            endpoint,
            transport,
        })
    }

    pub fn variant(&self) -> &'static VariantDefinition {
        self.variant
    }

    pub fn endpoint(&self) -> &InverterEndpoint {
        &self.endpoint
    }

    /// Issue one real-time data request and return the raw body.
    pub async fn make_request(&self) -> Result<Vec<u8>, InverterError> {
        let url = self.endpoint.url();
        let body = real_time_request_body(&self.endpoint.password);
        debug!(url = %url, variant = self.variant.name, "requesting real-time data");
        let raw = self
            .transport
            .post(&url, &self.endpoint.headers, &body)
            .await?;
        Ok(raw)
    }

    pub async fn get_data(&self) -> Result<SensorReadings, InverterError> {
        self.get_response().await.map(|(_, readings)| readings)
    }

    /// Like [`Inverter::get_data`] but also returns the validated envelope.
    pub async fn get_response(&self) -> Result<(ValidatedResponse, SensorReadings), InverterError> {
        let raw = self.make_request().await?;
        Ok(self.variant.handle_response(&raw)?)
    }
}

impl fmt::Debug for Inverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inverter")
            .field("variant", &self.variant.name)
            .field("host", &self.endpoint.host)
            .field("port", &self.endpoint.port)
            .finish_non_exhaustive()
    }
}
