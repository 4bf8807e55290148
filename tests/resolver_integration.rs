//! End-to-end resolution against a mocked Nominatim instance.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use mappicker_rs::{
    BroadcastPublisher, Coordinate, Error, ManualClock, MapPicker, MapPickerConfig, MapView,
    NominatimConfig, NominatimGeocoder, SearchMessage, SpecificityLevel,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MARUNOUCHI: &str = "東京都千代田区丸の内１丁目９−１ 丸の内ビル";

fn place(lat: &str, lon: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!([
        { "lat": lat, "lon": lon, "display_name": "丸の内, 千代田区, 東京都, 日本" }
    ]))
}

fn empty() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!([]))
}

fn config(server: &MockServer) -> MapPickerConfig {
    MapPickerConfig::builder()
        .endpoint(server.uri())
        .user_agent("mappicker-rs-integration/1.0")
        .request_timeout(Duration::from_secs(5))
        .build()
}

/// Real HTTP against the mock server, throttle waits on a manual clock.
fn picker_with_clock(server: &MockServer) -> (MapPicker, ManualClock) {
    let config = config(server);
    let clock = ManualClock::new();
    let geocoder = NominatimGeocoder::new(NominatimConfig::from(&config)).unwrap();
    let picker = MapPicker::with_geocoder(config, Arc::new(geocoder), Arc::new(clock.clone()))
        .unwrap();
    (picker, clock)
}

fn picker(server: &MockServer) -> MapPicker {
    picker_with_clock(server).0
}

async fn mount_fallback(server: &MockServer, query: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", query))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_falls_back_to_banchi() {
    let server = MockServer::start().await;
    mount_fallback(&server, "東京都千代田区丸の内1丁目9", place("35.6812", "139.7671")).await;
    Mock::given(method("GET"))
        .respond_with(empty())
        .mount(&server)
        .await;

    let outcome = picker(&server).resolve(MARUNOUCHI).await.unwrap();

    assert!(outcome.matched);
    assert_eq!(outcome.coordinate, Some(Coordinate::new(35.6812, 139.7671)));
    assert_eq!(outcome.specificity, Some(SpecificityLevel::Banchi));
    assert_eq!(outcome.zoom, Some(18));
    // full input, then 9-1, then 9
    assert_eq!(outcome.attempts, 3);

    let requests = server.received_requests().await.unwrap();
    let queries: Vec<String> = requests
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "q")
                .map(|(_, value)| value.into_owned())
        })
        .collect();
    assert_eq!(
        queries,
        [
            "東京都千代田区丸の内1丁目9-1丸の内ビル",
            "東京都千代田区丸の内1丁目9-1",
            "東京都千代田区丸の内1丁目9",
        ]
    );
}

#[tokio::test]
async fn test_exhaustion_issues_one_request_per_level() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(empty())
        .expect(7)
        .mount(&server)
        .await;

    let outcome = picker(&server).resolve(MARUNOUCHI).await.unwrap();

    assert!(!outcome.matched);
    assert_eq!(outcome.coordinate, None);
    assert_eq!(outcome.attempts, 7);
}

#[tokio::test]
async fn test_provider_errors_are_not_fatal() {
    let server = MockServer::start().await;
    mount_fallback(&server, "東京都千代田区", place("35.6938", "139.7532")).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let outcome = picker(&server).resolve("東京都千代田区永田町").await.unwrap();

    assert!(outcome.matched);
    assert_eq!(outcome.specificity, Some(SpecificityLevel::City));
    assert_eq!(outcome.zoom, Some(13));
}

#[tokio::test]
async fn test_requests_respect_floor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(empty())
        .mount(&server)
        .await;

    let (picker, clock) = picker_with_clock(&server);

    let outcome = picker.resolve("東京都千代田区").await.unwrap();
    // full input and prefecture; the city query equals the full input
    assert_eq!(outcome.attempts, 2);
    assert_eq!(clock.elapsed(), Duration::from_millis(1000));
}

#[test]
fn test_sub_second_floor_is_rejected() {
    let config = MapPickerConfig::builder()
        .endpoint("http://localhost:8080")
        .min_request_interval(Duration::from_millis(20))
        .build();
    assert_matches!(
        MapPicker::with_config(config),
        Err(Error::Configuration { .. })
    );
}

#[tokio::test]
async fn test_empty_query_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(empty())
        .expect(0)
        .mount(&server)
        .await;

    let outcome = picker(&server).resolve(" \u{3000} ").await.unwrap();
    assert!(!outcome.matched);
    assert_eq!(outcome.attempts, 0);
}

#[tokio::test]
async fn test_concurrent_resolution_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(empty().set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let picker = picker(&server);
    let (first, second) = tokio::join!(picker.resolve("東京都"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        picker.resolve("大阪府").await
    });

    assert!(first.is_ok());
    assert_matches!(second, Err(Error::SearchInProgress));
}

#[derive(Debug, Default)]
struct Recorder {
    centers: Vec<(Coordinate, u8)>,
}

impl MapView for Recorder {
    fn set_center(&mut self, coordinate: Coordinate, zoom: u8) {
        self.centers.push((coordinate, zoom));
    }

    fn set_marker(&mut self, _coordinate: Coordinate) {}
}

#[tokio::test]
async fn test_location_picker_search() {
    let server = MockServer::start().await;
    mount_fallback(&server, "東京都千代田区丸の内1丁目", place("35.6825", "139.7660")).await;
    Mock::given(method("GET"))
        .respond_with(empty())
        .mount(&server)
        .await;

    let app = picker(&server);
    let publisher = BroadcastPublisher::default();
    let mut changes = publisher.subscribe();
    let mut location = app.location_picker(Recorder::default(), Arc::new(publisher));

    assert_eq!(location.initialize(None, None), Coordinate::TOKYO_STATION);

    location.set_query(MARUNOUCHI);
    let outcome = location.search().await.unwrap();
    assert_eq!(outcome.specificity, Some(SpecificityLevel::Chome));
    assert_eq!(location.message(), None);
    assert_eq!(location.map().centers.last().map(|(_, zoom)| *zoom), Some(17));

    let change = changes.try_recv().unwrap();
    assert!((change.latitude - 35.6825).abs() < 1e-9);
    assert!((change.longitude - 139.7660).abs() < 1e-9);

    location.set_query("存在しない住所");
    let outcome = location.search().await.unwrap();
    assert!(!outcome.matched);
    assert_eq!(location.message(), Some(SearchMessage::NotFound));
    assert!(changes.try_recv().is_err());
}
