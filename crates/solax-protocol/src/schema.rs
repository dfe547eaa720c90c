use serde_json::{Map, Value};
use thiserror::Error;

/// Shape a real-time data response must have for one protocol revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireSchema {
    /// Exact value of the `type` field.
    pub discriminant: i64,
    /// Exact length of the `Data` register array.
    pub data_len: usize,
    /// Exact length of the `Information` array.
    pub information_len: usize,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("response is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is not a json object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("unexpected protocol type {found}, expected {expected}")]
    Discriminant { expected: i64, found: String },
    #[error("field `{field}` must hold exactly {expected} values, got {found}")]
    Length {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("`{field}[{index}]` is not numeric")]
    NotNumeric { field: &'static str, index: usize },
}

/// A response that fully satisfied its schema; unknown keys are gone.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedResponse {
    pub kind: i64,
    pub serial: String,
    pub version: String,
    pub data: Vec<f64>,
    /// Kept as sent; firmware mixes numbers and strings here.
    pub information: Vec<Value>,
}

pub fn parse_response(raw: &[u8]) -> Result<Value, SchemaError> {
    Ok(serde_json::from_slice(raw)?)
}

impl WireSchema {
    pub fn validate(&self, response: &Value) -> Result<ValidatedResponse, SchemaError> {
        let object = response.as_object().ok_or(SchemaError::NotAnObject)?;

        let kind = required(object, "type")?;
        match kind.as_i64() {
            Some(found) if found == self.discriminant => {}
            Some(_) => {
                return Err(SchemaError::Discriminant {
                    expected: self.discriminant,
                    found: kind.to_string(),
                })
            }
            None => {
                return Err(SchemaError::WrongType {
                    field: "type",
                    expected: "an integer",
                })
            }
        }

        let serial = required_str(object, "sn")?;
        let version = required_str(object, "ver")?;
        let data = numeric_array(object, "Data", self.data_len)?;
        let information = sized_array(object, "Information", self.information_len)?.to_vec();

        Ok(ValidatedResponse {
            kind: self.discriminant,
            serial,
            version,
            data,
            information,
        })
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, SchemaError> {
    object.get(field).ok_or(SchemaError::MissingField(field))
}

fn required_str(object: &Map<String, Value>, field: &'static str) -> Result<String, SchemaError> {
    required(object, field)?
        .as_str()
        .map(str::to_string)
        .ok_or(SchemaError::WrongType {
            field,
            expected: "a string",
        })
}

fn sized_array<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
    expected: usize,
) -> Result<&'a [Value], SchemaError> {
    let items = required(object, field)?
        .as_array()
        .ok_or(SchemaError::WrongType {
            field,
            expected: "an array",
        })?;
    if items.len() != expected {
        return Err(SchemaError::Length {
            field,
            expected,
            found: items.len(),
        });
    }
    Ok(items.as_slice())
}

fn numeric_array(
    object: &Map<String, Value>,
    field: &'static str,
    expected: usize,
) -> Result<Vec<f64>, SchemaError> {
    sized_array(object, field, expected)?
        .iter()
        .enumerate()
        .map(|(index, item)| coerce_number(item).ok_or(SchemaError::NotNumeric { field, index }))
        .collect()
}

/// Numbers pass through; strings are accepted when they parse as a finite float.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
        _ => None,
    }
}
