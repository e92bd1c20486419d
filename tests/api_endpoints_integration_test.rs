// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hodr-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Integration tests for every gateway endpoint
//!
//! Each test builds the Rocket instance around a `MockControlClient` and
//! drives it with Rocket's local asynchronous client, then checks both the
//! HTTP answer and the calls the mock received.

use std::path::Path;
use std::sync::Arc;

use hodr_gateway::config::Config;
use hodr_gateway::control::{ControlCall, InstrumentState, MockControlClient, MockFailure};
use hodr_gateway::server::build_rocket;
use rocket::config::LogLevel;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::Value;
use tempfile::tempdir;

fn get_figment() -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("address", "127.0.0.1"))
        .merge(("port", 0))
        .merge(("log_level", LogLevel::Off))
}

fn sample_state() -> InstrumentState {
    InstrumentState {
        active: false,
        temperature: 21.5,
        target_temperature: -70.0,
        temperature_status: "Stable".to_string(),
        number_spectra: 0,
        acquisition_status: 0,
        data_ready: false,
        data_path: String::new(),
    }
}

async fn client_with(mock: &MockControlClient, config: Config) -> Client {
    let rocket = build_rocket(get_figment(), Arc::new(config), Arc::new(mock.clone()));
    Client::tracked(rocket)
        .await
        .expect("valid rocket instance")
}

async fn client_for(mock: &MockControlClient) -> Client {
    client_with(mock, Config::default()).await
}

async fn get_text(client: &Client, path: &str) -> (Status, String) {
    let response = client.get(path).dispatch().await;
    let status = response.status();
    (status, response.into_string().await.unwrap_or_default())
}

async fn post_text(client: &Client, path: &str, body: &str) -> (Status, String) {
    let response = client
        .post(path)
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_string().await.unwrap_or_default())
}

#[rocket::async_test]
async fn test_property_reads_return_text_with_newline() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    let expected = [
        ("/temperature", "21.5\n"),
        ("/target_temperature", "-70.0\n"),
        ("/temperature_status", "Stable\n"),
        ("/data_ready", "false\n"),
        ("/number_spectra", "0\n"),
        ("/acquisition_status", "0\n"),
        ("/power_status", "OFF\n"),
    ];
    for (path, body) in expected {
        // Reads are idempotent
        for _ in 0..2 {
            let response = client.get(path).dispatch().await;
            assert_eq!(response.status(), Status::Ok, "GET {path}");
            assert_eq!(response.content_type(), Some(ContentType::Plain));
            assert_eq!(response.into_string().await.unwrap(), body, "GET {path}");
        }
    }
    assert!(mock.calls().is_empty());
}

#[rocket::async_test]
async fn test_status_has_exactly_six_keys() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    let response = client.get("/status").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let body = response.into_string().await.unwrap();
    assert!(!body.ends_with('\n'));

    let json: Value = serde_json::from_str(&body).unwrap();
    let object = json.as_object().unwrap();
    let keys: Vec<&str> = object.keys().map(String::as_str).collect();
    let mut expected = vec![
        "power_status",
        "temperature",
        "target_temperature",
        "temperature_status",
        "number_spectra",
        "acquisition_status",
    ];
    let mut sorted_keys = keys.clone();
    sorted_keys.sort_unstable();
    expected.sort_unstable();
    assert_eq!(sorted_keys, expected);
    assert!(body.starts_with(r#"{"power_status":"OFF","temperature":21.5"#));
    assert_eq!(object["target_temperature"], -70.0);
}

#[rocket::async_test]
async fn test_power_commands() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    assert_eq!(
        get_text(&client, "/activate").await,
        (Status::Ok, "Device activated successfully\n".to_string())
    );
    assert_eq!(get_text(&client, "/power_status").await.1, "ON\n");
    assert_eq!(
        get_text(&client, "/deactivate").await,
        (Status::Ok, "Device deactivated successfully\n".to_string())
    );
    assert_eq!(
        get_text(&client, "/stop_acquisition").await,
        (Status::Ok, "Acquisition stopped successfully\n".to_string())
    );
    assert_eq!(
        get_text(&client, "/reset").await,
        (Status::Ok, "Device reset successfully\n".to_string())
    );
    assert_eq!(
        mock.calls(),
        vec![
            ControlCall::Activate,
            ControlCall::Deactivate,
            ControlCall::StopAcquisition,
            ControlCall::Reset,
        ]
    );
}

#[rocket::async_test]
async fn test_set_target_temperature() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    assert_eq!(
        post_text(&client, "/set_target_temperature", r#"{"target_temperature": 25}"#).await,
        (Status::Ok, "Target temperature set successfully\n".to_string())
    );
    assert_eq!(mock.calls(), vec![ControlCall::SetTemperature(25)]);
    assert_eq!(get_text(&client, "/target_temperature").await.1, "25.0\n");
}

#[rocket::async_test]
async fn test_set_target_temperature_validation_makes_no_call() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    let cases = [
        (r#"{"target_temperature": "abc"}"#, "Invalid temperature value\n"),
        (r#"{"target_temperature": 1e12}"#, "Invalid temperature value\n"),
        (r#"{}"#, "Missing target_temperature in request\n"),
        ("", "Missing target_temperature in request\n"),
        ("{broken", "Malformed JSON body\n"),
    ];
    for (body, message) in cases {
        assert_eq!(
            post_text(&client, "/set_target_temperature", body).await,
            (Status::BadRequest, message.to_string()),
            "body {body}"
        );
    }
    assert!(mock.calls().is_empty());
}

#[rocket::async_test]
async fn test_start_acquisition_forwards_arguments_in_order() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    let body = r#"{"integration_time": 1.5, "interval_time": 0.5, "acquisition_mode": "series", "n_captures": 3}"#;
    assert_eq!(
        post_text(&client, "/start_acquisition", body).await,
        (Status::Ok, "0\n".to_string())
    );
    assert_eq!(
        mock.calls(),
        vec![ControlCall::StartAcquisition {
            integration_time: 1.5,
            interval_time: 0.5,
            mode: 3,
            n_captures: 3,
        }]
    );
}

#[rocket::async_test]
async fn test_start_acquisition_unknown_mode_and_defaults() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    let (status, _) = post_text(&client, "/start_acquisition", r#"{"acquisition_mode": "bogus"}"#).await;
    assert_eq!(status, Status::Ok);
    let (status, _) = post_text(&client, "/start_acquisition", "").await;
    assert_eq!(status, Status::Ok);

    let default_call = ControlCall::StartAcquisition {
        integration_time: -1.0,
        interval_time: -1.0,
        mode: 0,
        n_captures: 1,
    };
    assert_eq!(mock.calls(), vec![default_call.clone(), default_call]);

    let (status, body) =
        post_text(&client, "/start_acquisition", r#"{"n_captures": -2}"#).await;
    assert_eq!(status, Status::BadRequest);
    assert_eq!(body, "Invalid number of captures value\n");
    assert_eq!(mock.calls().len(), 2);
}

#[rocket::async_test]
async fn test_get_spectrum() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    assert_eq!(
        post_text(&client, "/get_spectrum", "{}").await,
        (Status::NotFound, "Spectrum not found\n".to_string())
    );
    assert_eq!(
        post_text(&client, "/get_spectrum", r#"{"spectrum_id": "first"}"#).await,
        (Status::BadRequest, "Invalid spectrum ID value\n".to_string())
    );

    post_text(&client, "/start_acquisition", r#"{"integration_time": 2.0}"#).await;

    let response = client
        .post("/get_spectrum")
        .body(r#"{"spectrum_id": 0}"#)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let json: Value = serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
    assert_eq!(json["integration_time"], 2.0);
    assert_eq!(json["temperature"], 21.5);
    assert!(json["timestamp"].is_string());
    assert!(!json["data"].as_array().unwrap().is_empty());
}

fn write_data_file(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[rocket::async_test]
async fn test_data_file_is_annotated() {
    let data_dir = tempdir().unwrap();
    write_data_file(
        data_dir.path(),
        "run.csv",
        "a,b,c,d,e,f,,g\n1,t,0.5,-70.0,1,2,3,4\n",
    );

    let mock = MockControlClient::with_state(InstrumentState {
        data_path: "'run.csv'".to_string(),
        ..sample_state()
    });
    let mut config = Config::default();
    config.data.base_dir = data_dir.path().to_path_buf();
    let client = client_with(&mock, config).await;

    let (status, body) = get_text(&client, "/data").await;
    assert_eq!(status, Status::Ok);
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines[0], "number, timestamp, integration_time, temperature,4,5,7");
    assert_eq!(lines[1], "a,b,c,d,e,f,,g");
    assert_eq!(lines[2], "1,t,0.5,-70.0,1,2,3,4");
}

#[rocket::async_test]
async fn test_data_file_errors() {
    let data_dir = tempdir().unwrap();
    std::fs::write(data_dir.path().join("binary.csv"), [0xc3, 0x28, 0x2c]).unwrap();

    let mock = MockControlClient::with_state(sample_state());
    let mut config = Config::default();
    config.data.base_dir = data_dir.path().to_path_buf();
    let client = client_with(&mock, config).await;

    assert_eq!(
        get_text(&client, "/data").await,
        (Status::NotFound, "Data path is empty\n".to_string())
    );

    mock.set_state(InstrumentState {
        data_path: "missing.csv".to_string(),
        ..sample_state()
    });
    assert_eq!(
        get_text(&client, "/data").await,
        (Status::NotFound, "Data file does not exist\n".to_string())
    );

    mock.set_state(InstrumentState {
        data_path: "binary.csv".to_string(),
        ..sample_state()
    });
    assert_eq!(
        get_text(&client, "/data").await,
        (
            Status::InternalServerError,
            "Error decoding data file\n".to_string()
        )
    );

    mock.set_state(InstrumentState {
        data_path: "../outside.csv".to_string(),
        ..sample_state()
    });
    assert_eq!(get_text(&client, "/data").await.0, Status::NotFound);
}

#[rocket::async_test]
async fn test_unknown_path_is_404_with_path() {
    let mock = MockControlClient::new();
    let client = client_for(&mock).await;

    let (status, body) = get_text(&client, "/xyz").await;
    assert_eq!(status, Status::NotFound);
    assert!(body.contains("xyz"));
    assert_eq!(body, "File Not Found: /xyz\n");

    let (status, _) = post_text(&client, "/activate", "{}").await;
    assert_eq!(status, Status::NotFound);
}

#[rocket::async_test]
async fn test_query_string_makes_an_unknown_path() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    assert_eq!(
        get_text(&client, "/temperature?anything").await,
        (
            Status::NotFound,
            "File Not Found: /temperature?anything\n".to_string()
        )
    );
    let (status, _) = post_text(
        &client,
        "/set_target_temperature?unit=celsius",
        r#"{"target_temperature": 25}"#,
    )
    .await;
    assert_eq!(status, Status::NotFound);
    assert!(mock.calls().is_empty());

    assert_eq!(get_text(&client, "/temperature").await.0, Status::Ok);
}

#[rocket::async_test]
async fn test_control_failures_map_to_gateway_statuses() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    mock.set_failure(Some(MockFailure::Unreachable));
    assert_eq!(get_text(&client, "/temperature").await.0, Status::BadGateway);
    assert_eq!(get_text(&client, "/status").await.0, Status::BadGateway);

    mock.set_failure(Some(MockFailure::CallFault));
    assert_eq!(get_text(&client, "/activate").await.0, Status::BadGateway);

    mock.set_failure(Some(MockFailure::Timeout));
    let (status, body) = get_text(&client, "/power_status").await;
    assert_eq!(status, Status::GatewayTimeout);
    assert!(body.ends_with('\n'));

    // Validation still happens first
    let (status, _) =
        post_text(&client, "/set_target_temperature", r#"{"target_temperature": "x"}"#).await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_health_reports_control_reachability() {
    let mock = MockControlClient::new();
    let client = client_for(&mock).await;

    let (status, body) = get_text(&client, "/health").await;
    assert_eq!(status, Status::Ok);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "mock");
    assert_eq!(json["control_reachable"], true);

    mock.set_failure(Some(MockFailure::Unreachable));
    let json: Value = serde_json::from_str(&get_text(&client, "/health").await.1).unwrap();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["control_reachable"], false);
    assert!(json["error"].is_string());
}

#[rocket::async_test]
async fn test_static_files() {
    let www = tempdir().unwrap();
    std::fs::write(www.path().join("index.html"), "<html>console</html>").unwrap();
    std::fs::write(www.path().join("style.css"), "body {}").unwrap();

    let mock = MockControlClient::new();
    let mut config = Config::default();
    config.server.www_dir = Some(www.path().to_path_buf());
    let client = client_with(&mock, config).await;

    for path in ["/", "/index.html"] {
        let response = client.get(path).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::HTML));
        assert_eq!(response.into_string().await.unwrap(), "<html>console</html>");
    }

    let response = client.get("/style.css").dispatch().await;
    assert_eq!(response.content_type(), Some(ContentType::CSS));

    let (status, body) = get_text(&client, "/favicon.ico").await;
    assert_eq!(status, Status::NotFound);
    assert_eq!(body, "File Not Found: /favicon.ico\n");
}

#[rocket::async_test]
async fn test_cors_headers_and_preflight() {
    let mock = MockControlClient::with_state(sample_state());
    let client = client_for(&mock).await;

    let response = client
        .get("/temperature")
        .header(Header::new("Origin", "http://console.local"))
        .dispatch()
        .await;
    assert_eq!(
        response.headers().get_one("Access-Control-Allow-Origin"),
        Some("*")
    );

    let response = client.options("/set_target_temperature").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}
