//! End-to-end scenarios for the persistence and upload pipeline, exercising
//! `Feature` against a real `wiremock` server and fake device providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use obs_pipeline::{
    BatteryStatusProvider, Feature, FeatureConfig, NetworkInfoProvider, PerformancePreset,
    PowerState, RequestBuilder, UploadConditions,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedBattery {
    level: u8,
    state: PowerState,
}

#[async_trait]
impl BatteryStatusProvider for FixedBattery {
    async fn status(&self) -> (u8, PowerState) {
        (self.level, self.state)
    }
    async fn low_power_mode_on(&self) -> bool {
        false
    }
}

struct FixedNetwork(bool);

#[async_trait]
impl NetworkInfoProvider for FixedNetwork {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}

struct EndpointBuilder(String);

impl RequestBuilder for EndpointBuilder {
    fn endpoint(&self) -> String {
        self.0.clone()
    }
    fn headers(&self) -> Vec<(String, String)> {
        vec![("DD-API-KEY".to_string(), "test-token".to_string())]
    }
}

fn fast_config(feature_name: &str) -> FeatureConfig {
    FeatureConfig::new(
        feature_name,
        PerformancePreset::RealTime,
        1024,
        4096,
        Duration::from_millis(0),
        Duration::from_millis(5),
        Duration::from_secs(3600),
        10,
        1024 * 1024,
    )
    .expect("valid config")
}

// S4: no writes; first tick finds an empty directory, no HTTP request is made.
#[tokio::test]
async fn s4_empty_directory_makes_no_request() {
    let mock_server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path("/intake"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let uploader = Arc::new(obs_pipeline::upload::http::HttpUploader::new(Arc::new(
        EndpointBuilder(format!("{}/intake", mock_server.uri())),
    )));
    let feature = Feature::new(
        dir.path(),
        fast_config("s4"),
        UploadConditions::new(
            Box::new(FixedBattery {
                level: 100,
                state: PowerState::Charging,
            }),
            Box::new(FixedNetwork(true)),
        ),
        uploader,
    )
    .expect("feature construction");

    feature.flush().await;
    feature.cancel().await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(mock_server.received_requests().await.expect("requests").len(), 0);
}

// S5: one write, battery unplugged at 5% blocks the upload; data remains on disk.
#[tokio::test]
async fn s5_low_battery_blocks_upload_and_retains_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intake"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let uploader = Arc::new(obs_pipeline::upload::http::HttpUploader::new(Arc::new(
        EndpointBuilder(format!("{}/intake", mock_server.uri())),
    )));
    let feature = Feature::new(
        dir.path(),
        fast_config("s5"),
        UploadConditions::new(
            Box::new(FixedBattery {
                level: 5,
                state: PowerState::Unplugged,
            }),
            Box::new(FixedNetwork(true)),
        ),
        uploader,
    )
    .expect("feature construction");

    feature.write(b"\"event\"").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    feature.cancel().await;

    assert_eq!(mock_server.received_requests().await.expect("requests").len(), 0);
    let feature_dir = dir.path().join("s5");
    assert_eq!(std::fs::read_dir(&feature_dir).expect("read_dir").count(), 1);
}

// S6: cancel mid-flight blocks until the in-flight tick completes, then
// guarantees no further ticks run even though more would have been due.
#[tokio::test]
async fn s6_cancel_stops_future_ticks_after_inflight_completes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/intake"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(30)))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let uploader = Arc::new(obs_pipeline::upload::http::HttpUploader::new(Arc::new(
        EndpointBuilder(format!("{}/intake", mock_server.uri())),
    )));
    let feature = Feature::new(
        dir.path(),
        fast_config("s6"),
        UploadConditions::new(
            Box::new(FixedBattery {
                level: 100,
                state: PowerState::Charging,
            }),
            Box::new(FixedNetwork(true)),
        ),
        uploader,
    )
    .expect("feature construction");

    feature.write(b"\"e1\"").await;
    feature.write(b"\"e2\"").await;

    // Give the worker time to start an in-flight upload, then cancel while
    // it is still running.
    tokio::time::sleep(Duration::from_millis(15)).await;
    feature.cancel().await;

    let requests_at_cancel = mock_server.received_requests().await.expect("requests").len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let requests_after_wait = mock_server.received_requests().await.expect("requests").len();
    assert_eq!(requests_at_cancel, requests_after_wait);
}
