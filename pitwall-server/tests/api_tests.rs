//! Integration tests for the REST API
//!
//! Every test drives the full router (correlation middleware included) against an
//! in-memory database with fake upstream sources.

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::*;
use pitwall_common::api::CORRELATION_ID_HEADER;
use pitwall_server::db::{replace_race_results, upsert_constructor, upsert_driver, upsert_race};
use pitwall_server::sources::DriverRecord;
use serde_json::json;

#[tokio::test]
async fn test_status_endpoints_use_envelope() {
    let app = offline_app().await;

    for uri in ["/", "/api/v1"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["success"], true);
        assert_eq!(response.body["data"]["status"], "OK");
        assert!(response.body["correlationId"].as_str().unwrap().starts_with("req-"));
        assert!(response.body["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_supplied_correlation_id_is_echoed() {
    let app = offline_app().await;
    let response = send(
        &app,
        Method::GET,
        "/health",
        None,
        &[(CORRELATION_ID_HEADER, "trace-abc-123")],
    )
    .await;

    assert_eq!(response.body["correlationId"], "trace-abc-123");
    assert_eq!(response.headers[CORRELATION_ID_HEADER], "trace-abc-123");
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_404_envelope() {
    let app = offline_app().await;
    let response = get(&app, "/api/v1/teams").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"]["code"], "NOT_FOUND");
    let header = response.headers[CORRELATION_ID_HEADER].to_str().unwrap();
    assert_eq!(response.body["correlationId"], header);
}

#[tokio::test]
async fn test_bad_query_parameter_is_400_envelope() {
    let app = offline_app().await;
    let response = get(&app, "/api/v1/drivers?limit=lots").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["code"], "BAD_REQUEST");
    assert!(response.body["correlationId"].is_string());
}

#[tokio::test]
async fn test_driver_listing_is_paged_and_sorted() {
    let app = offline_app().await;
    for (id, forename, surname) in [
        ("verstappen", "Max", "Verstappen"),
        ("alonso", "Fernando", "Alonso"),
        ("norris", "Lando", "Norris"),
    ] {
        upsert_driver(&app.pool, &driver(id, forename, surname)).await.unwrap();
    }

    let response = get(&app, "/api/v1/drivers?limit=2&offset=0").await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["items"].as_array().unwrap().len(), 2);
    assert_eq!(data["items"][0]["driverId"], "alonso");
    assert!(data.get("source").is_none());
}

#[tokio::test]
async fn test_future_season_listing_falls_back_to_active_drivers() {
    let app = offline_app().await;
    let teams = ["Williams", "Ferrari", "McLaren", "Alpine", "Mercedes"];
    for i in 0..20 {
        let record = DriverRecord {
            is_active: Some(true),
            current_team: Some(teams[i % teams.len()].to_string()),
            ..driver(&format!("active_{}", i), "Active", &format!("Driver{:02}", i))
        };
        upsert_driver(&app.pool, &record).await.unwrap();
    }
    upsert_driver(&app.pool, &driver("retired", "Old", "Timer")).await.unwrap();

    let response = get(&app, "/api/v1/drivers?season=2027&limit=100").await;
    let data = &response.body["data"];

    assert_eq!(data["source"], "active_heuristic");
    assert_eq!(data["total"], 20);
    let items = data["items"].as_array().unwrap();
    let keys: Vec<(String, String)> = items
        .iter()
        .map(|d| {
            (
                d["currentTeam"].as_str().unwrap().to_string(),
                d["surname"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys[0].0, "Alpine");
}

#[tokio::test]
async fn test_past_season_listing_uses_participation() {
    let app = offline_app().await;
    upsert_driver(&app.pool, &driver("button", "Jenson", "Button")).await.unwrap();
    let race_id = upsert_race(&app.pool, &race(2009, 1), 2009).await.unwrap();
    replace_race_results(
        &app.pool,
        &race_id,
        &[result(driver("barrichello", "Rubens", "Barrichello"), constructor("brawn", "Brawn"), Some(2))],
    )
    .await
    .unwrap();

    let response = get(&app, "/api/v1/drivers?season=2009").await;
    let data = &response.body["data"];
    assert_eq!(data["source"], "participation");
    assert_eq!(data["total"], 1);
    assert_eq!(data["items"][0]["driverId"], "barrichello");

    let response = get(&app, "/api/v1/constructors?season=2009").await;
    assert_eq!(response.body["data"]["source"], "participation");
    assert_eq!(response.body["data"]["items"][0]["constructorId"], "brawn");
}

#[tokio::test]
async fn test_driver_detail_results_and_stats() {
    let app = offline_app().await;
    let hamilton = driver("hamilton", "Lewis", "Hamilton");
    let mercedes = constructor("mercedes", "Mercedes");
    for round in 1..=3 {
        let race_id = upsert_race(&app.pool, &race(2020, round), 2020).await.unwrap();
        let position = if round == 3 { None } else { Some(round as i64) };
        replace_race_results(&app.pool, &race_id, &[result(hamilton.clone(), mercedes.clone(), position)])
            .await
            .unwrap();
    }

    let response = get(&app, "/api/v1/drivers/hamilton").await;
    assert_eq!(response.body["data"]["code"], "HAM");

    let response = get(&app, "/api/v1/drivers/hamilton/results?limit=2").await;
    let results = response.body["data"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    // Newest first
    assert_eq!(results[0]["round"], 3);

    let response = get(&app, "/api/v1/drivers/hamilton/stats").await;
    let stats = &response.body["data"];
    assert_eq!(stats["totalRaces"], 3);
    assert_eq!(stats["wins"], 1);
    assert_eq!(stats["podiums"], 2);
    assert_eq!(stats["totalPoints"], 43.0);

    let response = get(&app, "/api/v1/constructors/mercedes/stats").await;
    assert_eq!(response.body["data"]["wins"], 1);

    let response = get(&app, "/api/v1/drivers/nobody/stats").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.body["error"]["message"],
        "Driver with id 'nobody' not found"
    );
}

#[tokio::test]
async fn test_race_endpoints() {
    let app = offline_app().await;
    let race_id = upsert_race(&app.pool, &race(CURRENT_YEAR, 1), CURRENT_YEAR).await.unwrap();
    upsert_race(&app.pool, &race(CURRENT_YEAR, 2), CURRENT_YEAR).await.unwrap();
    upsert_race(&app.pool, &race(2019, 1), 2019).await.unwrap();

    let results = vec![
        result(driver("leclerc", "Charles", "Leclerc"), constructor("ferrari", "Ferrari"), None),
        result(driver("sainz", "Carlos", "Sainz"), constructor("ferrari", "Ferrari"), Some(1)),
    ];
    replace_race_results(&app.pool, &race_id, &results).await.unwrap();

    let response = get(&app, "/api/v1/races?season=2025").await;
    assert_eq!(response.body["data"]["total"], 2);

    let response = get(&app, "/api/v1/races/current/schedule").await;
    let schedule = response.body["data"].as_array().unwrap();
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule[0]["round"], 1);

    let response = get(&app, &format!("/api/v1/races/{}", race_id)).await;
    assert_eq!(response.body["data"]["circuitName"], "Circuit 1");

    let response = get(&app, &format!("/api/v1/races/{}/results", race_id)).await;
    let rows = response.body["data"].as_array().unwrap();
    assert_eq!(rows[0]["driverId"], "sainz");
    assert!(rows[1]["position"].is_null());

    let response = get(&app, &format!("/api/v1/races/{}/qualifying", race_id)).await;
    assert_eq!(response.body["data"], json!([]));

    let response = get(&app, "/api/v1/races/no-such-race/results").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_circuit_endpoints() {
    let app = offline_app().await;
    upsert_race(&app.pool, &race(2023, 4), 2023).await.unwrap();
    upsert_race(&app.pool, &race(2024, 4), 2024).await.unwrap();

    let response = get(&app, "/api/v1/circuits").await;
    assert_eq!(response.body["data"].as_array().unwrap().len(), 1);

    let response = get(&app, "/api/v1/circuits/circuit_4").await;
    assert_eq!(response.body["data"]["name"], "Circuit 4");

    let response = get(&app, "/api/v1/circuits/circuit_4/races").await;
    let races = response.body["data"].as_array().unwrap();
    assert_eq!(races.len(), 2);
    assert_eq!(races[0]["season"], 2024);

    let response = get(&app, "/api/v1/circuits/atlantis").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_driver_lifecycle() {
    let app = offline_app().await;
    let create = json!({
        "driverId": "bearman",
        "forename": "Oliver",
        "surname": "Bearman",
        "permanentNumber": 87
    });

    let response = send(&app, Method::POST, "/api/v1/admin/drivers", Some(create.clone()), &[]).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["isActive"], true);
    assert_eq!(response.body["data"]["driverChampionships"], 0);

    let response = send(&app, Method::POST, "/api/v1/admin/drivers", Some(create), &[]).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"]["code"], "CONFLICT");

    let response = send(
        &app,
        Method::PUT,
        "/api/v1/admin/drivers",
        Some(json!({"driverId": "bearman", "code": "BEA"})),
        &[],
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["code"], "BEA");
    assert_eq!(response.body["data"]["permanentNumber"], 87);

    let response = send(
        &app,
        Method::PATCH,
        "/api/v1/admin/drivers/bearman/team",
        Some(json!({"currentTeam": "haas"})),
        &[],
    )
    .await;
    assert_eq!(response.body["data"]["currentTeam"], "Haas F1 Team");

    let response = send(
        &app,
        Method::PATCH,
        "/api/v1/admin/drivers/bearman/team",
        Some(json!({"currentTeam": null})),
        &[],
    )
    .await;
    assert!(response.body["data"]["currentTeam"].is_null());
}

#[tokio::test]
async fn test_admin_validation_errors() {
    let app = offline_app().await;

    let response = send(
        &app,
        Method::POST,
        "/api/v1/admin/drivers",
        Some(json!({"driverId": "x", "forename": "A", "surname": "B", "permanentNumber": 100})),
        &[],
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        Method::POST,
        "/api/v1/admin/drivers",
        Some(json!({"driverId": "y", "forename": "A", "surname": "B", "driverChampionships": -1})),
        &[],
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        Method::PUT,
        "/api/v1/admin/drivers",
        Some(json!({"driverId": "ghost", "code": "GHO"})),
        &[],
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    // Missing required field: extractor rejection still comes back as an envelope
    let response = send(
        &app,
        Method::POST,
        "/api/v1/admin/constructors",
        Some(json!({"constructorId": "audi"})),
        &[],
    )
    .await;
    assert!(response.status.is_client_error());
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_admin_constructor_create_and_update() {
    let app = offline_app().await;

    let response = send(
        &app,
        Method::POST,
        "/api/v1/admin/constructors",
        Some(json!({"constructorId": "cadillac", "name": "Cadillac", "nationality": "American"})),
        &[],
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = send(
        &app,
        Method::PUT,
        "/api/v1/admin/constructors",
        Some(json!({"constructorId": "cadillac", "url": "https://example.test/cadillac"})),
        &[],
    )
    .await;
    assert_eq!(response.body["data"]["url"], "https://example.test/cadillac");
    assert_eq!(response.body["data"]["nationality"], "American");
}

#[tokio::test]
async fn test_lineup_views_after_lineup_sync() {
    let app = test_app(
        std::sync::Arc::new(FakeSource::failing("roster")),
        std::sync::Arc::new(FakeSource::failing("historical")),
        FakeLineupProvider {
            response: lineup_response(2026),
            status: None,
        },
    )
    .await;
    for (id, forename, surname) in [
        ("hamilton", "Lewis", "Hamilton"),
        ("norris", "Lando", "Norris"),
        ("piastri", "Oscar", "Piastri"),
    ] {
        upsert_driver(&app.pool, &driver(id, forename, surname)).await.unwrap();
    }
    upsert_constructor(&app.pool, &constructor("mclaren", "McLaren")).await.unwrap();
    upsert_constructor(&app.pool, &constructor("ferrari", "Ferrari")).await.unwrap();

    let response = send(&app, Method::POST, "/api/v1/sync/lineups", Some(json!({"season": 2026})), &[]).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["drivers"], 3);

    let response = get(&app, "/api/v1/drivers/lineup?season=2026").await;
    let entries = response.body["data"].as_array().unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e["driver"]["driverId"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["hamilton", "norris", "piastri"]);
    assert_eq!(entries[0]["teamName"], "Ferrari");
    assert_eq!(entries[0]["driverNumber"], 44);

    let response = get(&app, "/api/v1/drivers?season=2026").await;
    assert_eq!(response.body["data"]["source"], "lineup");

    let response = get(&app, "/api/v1/constructors/lineup?season=2026").await;
    let constructors = response.body["data"].as_array().unwrap();
    assert_eq!(constructors[0]["constructor"]["name"], "Ferrari");
    assert_eq!(constructors[1]["drivers"].as_array().unwrap().len(), 2);

    // No document for another season
    let response = get(&app, "/api/v1/drivers/lineup?season=2030").await;
    assert_eq!(response.body["data"], json!([]));
}

#[tokio::test]
async fn test_malformed_lineup_document_is_treated_as_absent() {
    let app = offline_app().await;
    upsert_driver(&app.pool, &driver("norris", "Lando", "Norris")).await.unwrap();
    store_raw_driver_lineup(&app.pool, 2026, r#"{"teams": "not a list"}"#).await;

    let response = get(&app, "/api/v1/drivers/lineup?season=2026").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"], json!([]));

    let response = get(&app, "/api/v1/drivers?season=2026").await;
    // No active drivers either, so the listing is unfiltered
    assert_eq!(response.body["data"]["source"], "unfiltered");
}
