use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http_client::{Transport, TransportError};
use poller_actor::{unix_ms, ActorConfig, PollSample, PollerActor, PollerError};
use solax_protocol::{Inverter, SensorDescriptor, VariantDefinition, WireSchema};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use types::{InverterEndpoint, Unit};

static TEST_VARIANT: VariantDefinition = VariantDefinition {
    name: "TestVariant",
    description: "four registers",
    schema: WireSchema {
        discriminant: 5,
        data_len: 4,
        information_len: 1,
    },
    sensors: &[SensorDescriptor::raw("Power", 2, Unit::Watt)],
};

const GOOD: &str = r#"{"type":5,"sn":"SN123","ver":"2.01","Data":[0,0,321,0],"Information":[0]}"#;

struct FixedTransport {
    body: Option<&'static str>,
    calls: AtomicUsize,
}

#[async_trait]
impl Transport for FixedTransport {
    async fn post(
        &self,
        _url: &str,
        _headers: &[(String, String)],
        _body: &str,
    ) -> Result<Vec<u8>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.body {
            Some(body) => Ok(body.as_bytes().to_vec()),
            None => Err(TransportError::Status { status: 502 }),
        }
    }
}

fn inverter(body: Option<&'static str>) -> (Inverter, Arc<FixedTransport>) {
    let transport = Arc::new(FixedTransport {
        body,
        calls: AtomicUsize::new(0),
    });
    let inverter = Inverter::new(
        &TEST_VARIANT,
        InverterEndpoint::new("10.0.0.7", 80, ""),
        transport.clone(),
    )
    .expect("inverter");
    (inverter, transport)
}

fn fast_config(max_consecutive_failures: u32) -> ActorConfig {
    ActorConfig {
        poll_interval: Duration::from_millis(10),
        request_timeout: Duration::from_millis(500),
        jitter_ms: 0,
        max_consecutive_failures,
    }
}

#[test]
fn sample_carries_device_and_envelope() {
    let (inverter, _) = inverter(Some(GOOD));
    let (response, readings) = TEST_VARIANT
        .handle_response(GOOD.as_bytes())
        .expect("decode");
    let before = unix_ms();
    let sample = PollSample::new(&inverter, response, readings, unix_ms());

    assert_eq!(sample.host, "10.0.0.7");
    assert_eq!(sample.port, 80);
    assert_eq!(sample.variant, "TestVariant");
    assert_eq!(sample.serial, "SN123");
    assert_eq!(sample.firmware, "2.01");
    assert_eq!(sample.readings.value("Power"), Some(321.0));
    assert!(sample.collected_at_ms >= before);
}

#[tokio::test]
async fn emits_samples_until_shutdown() {
    let (inverter, _) = inverter(Some(GOOD));
    let (tx, mut rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(PollerActor::new(inverter, tx, shutdown_rx, fast_config(3)).run());

    let sample = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("sample in time")
        .expect("sample");
    assert_eq!(sample.host, "10.0.0.7");
    assert_eq!(sample.port, 80);
    assert_eq!(sample.variant, "TestVariant");
    assert_eq!(sample.serial, "SN123");
    assert_eq!(sample.firmware, "2.01");
    assert_eq!(sample.readings.value("Power"), Some(321.0));

    shutdown_tx.send(true).expect("shutdown");
    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("actor stops")
        .expect("join");
    assert!(result.is_ok());
}

#[tokio::test]
async fn gives_up_after_consecutive_failures() {
    let (inverter, transport) = inverter(None);
    let (tx, _rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let result = timeout(
        Duration::from_secs(2),
        PollerActor::new(inverter, tx, shutdown_rx, fast_config(3)).run(),
    )
    .await
    .expect("actor stops");

    match result {
        Err(PollerError::TooManyFailures { failures, last }) => {
            assert_eq!(failures, 3);
            assert!(last.contains("502"), "unexpected error {last}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn stops_when_receiver_is_dropped() {
    let (inverter, _) = inverter(Some(GOOD));
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let result = timeout(
        Duration::from_secs(2),
        PollerActor::new(inverter, tx, shutdown_rx, fast_config(0)).run(),
    )
    .await
    .expect("actor stops");
    assert!(result.is_ok());
}

#[tokio::test]
async fn stops_immediately_when_already_shut_down() {
    let (inverter, transport) = inverter(Some(GOOD));
    let (tx, _rx) = mpsc::channel(1);
    let (_shutdown_tx, shutdown_rx) = watch::channel(true);

    PollerActor::new(inverter, tx, shutdown_rx, fast_config(0))
        .run()
        .await
        .expect("clean exit");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}
