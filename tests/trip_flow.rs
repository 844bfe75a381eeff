// Full planning flow against a mock backend: plan, render, modify, download.

use chrono::NaiveDate;
use itinerary_client::{
    prepare_download, AppState, ClientConfig, ExportError, FillerPolicy, HttpTripClient,
    ModifyState, TripPlannerApi, TripRequest,
};
use mockito::{Matcher, Server};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn trip_body() -> String {
    json!({
        "status": "success",
        "itinerary": {
            "itinerary": {"data": "# Day 1\n- **9:00 - 11:00:** Fort Aguada\n\n### Day 2\nSpice farm visit"},
            "flights": {"data": "Flights from DEL to GOI:\nIndiGo 6E123 - DEL (06:00) -> GOI (08:30) [2h 30m] - Airbus A320\nPrice (INR): 5400"},
            "hotels": {"data": "Accommodations in Goa:\n\nTaj Holiday Village\nRate per night: $150\nRating: 4.6 (900)\nLocation Rating: Excellent\nAmenities: WiFi, Pool, Spa"},
            "places": {"data": "Top sights\nBaga Beach\nDescription: Lively beach\nRating: 4.5 (2000)\nPrice: Free"}
        },
        "document_type": "markdown"
    })
    .to_string()
}

#[tokio::test]
async fn test_plan_modify_and_download() {
    init_tracing();
    let mut server = Server::new_async().await;

    let plan = server
        .mock("POST", "/plan-trip")
        .match_body(Matcher::PartialJson(json!({"from_city": "DEL", "to_city": "Goa"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(trip_body())
        .create_async()
        .await;
    let modify = server
        .mock("POST", "/modify-itinerary")
        .match_body(Matcher::PartialJson(json!({"modification_feedback": "add a sunset cruise"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r###"{"status": "success", "modified_itinerary": "## Day 1\nSunset cruise on the Mandovi"}"###)
        .create_async()
        .await;
    let log = server
        .mock("POST", "/log-download")
        .with_status(200)
        .create_async()
        .await;

    let client = assert_ok!(HttpTripClient::new(ClientConfig {
        base_url: server.url(),
        ..ClientConfig::default()
    }));
    let state = AppState::new();
    let request = TripRequest::new("DEL", "Goa", "2025-03-01", "2025-03-04");

    let rendered = assert_ok!(state.plan_trip(&client, &request, FillerPolicy::Deterministic).await);
    plan.assert_async().await;

    assert!(rendered.show_modify_button);
    assert!(rendered.itinerary_html.contains("Day 2"));
    assert!(rendered.flights_html.contains("IndiGo"));
    assert!(rendered.hotels_html.contains("Taj Holiday Village"));
    // Padded with generic hotels up to the minimum
    assert!(rendered.hotels_html.contains("Grand City Hotel"));
    assert!(rendered.places_html.contains("Baga Beach"));
    assert!(!rendered.has_document);

    assert_ok!(state.show_modify());
    let html = assert_ok!(
        state
            .apply_modification(&client, "add a sunset cruise", "en")
            .await
    );
    modify.assert_async().await;
    assert!(html.contains("Sunset cruise"));
    assert_eq!(state.modify_state(), ModifyState::Idle);

    client.log_download().await;
    log.assert_async().await;

    let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let artifact = assert_ok!(prepare_download(&state, today));
    assert!(artifact.is_pdf());
    assert_eq!(artifact.file_name, "Journezy-Itinerary-2025-03-01.pdf");
    assert!(artifact.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_failed_plan_leaves_nothing_to_download() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _plan = server
        .mock("POST", "/plan-trip")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let client = assert_ok!(HttpTripClient::new(ClientConfig {
        base_url: server.url(),
        ..ClientConfig::default()
    }));
    let state = AppState::new();
    let request = TripRequest::new("DEL", "Goa", "2025-03-01", "");

    assert_err!(state.plan_trip(&client, &request, FillerPolicy::Deterministic).await);
    assert!(!state.is_request_in_flight());

    let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let err = assert_err!(prepare_download(&state, today));
    assert!(matches!(err, ExportError::NoDocument));
}
