use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 80;
/// Address of the Pocket WiFi dongle in access-point mode.
pub const DEFAULT_HOST: &str = "5.8.8.8";

/// Address and credentials of one inverter's local HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverterEndpoint {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    /// Extra request headers sent with every probe.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl InverterEndpoint {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

impl Default for InverterEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, "")
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "V")]
    Volt,
    #[serde(rename = "A")]
    Ampere,
    #[serde(rename = "W")]
    Watt,
    #[serde(rename = "Hz")]
    Hertz,
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "kWh")]
    KilowattHour,
    #[serde(rename = "")]
    None,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Watt => "W",
            Unit::Hertz => "Hz",
            Unit::Celsius => "C",
            Unit::Percent => "%",
            Unit::KilowattHour => "kWh",
            Unit::None => "",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded sensor value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub name: String,
    pub value: f64,
    pub unit: Unit,
}

/// Decoded readings in sensor-map order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorReadings(Vec<Reading>);

impl SensorReadings {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, reading: Reading) {
        self.0.push(reading);
    }

    pub fn get(&self, name: &str) -> Option<&Reading> {
        self.0.iter().find(|reading| reading.name == name)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).map(|reading| reading.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for SensorReadings {
    type Item = Reading;
    type IntoIter = std::vec::IntoIter<Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a SensorReadings {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
