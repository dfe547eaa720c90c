//! Wire schema, register decoding and the registry of SolaX local-API variants.

pub mod inverter;
pub mod registry;
pub mod schema;
pub mod transforms;
pub mod variant;
pub mod variants;

pub use inverter::{real_time_request_body, Inverter, InverterError};
pub use registry::Registry;
pub use schema::{parse_response, SchemaError, ValidatedResponse, WireSchema};
pub use variant::{DefinitionError, SensorDescriptor, Transform, VariantDefinition};
pub use variants::X3_HYBRID_G4;
