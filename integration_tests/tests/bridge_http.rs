mod common;

use std::io::Read;
use std::time::{Duration, Instant};

use bridge_core::{BridgeConfig, WorldBuilder};
use common::BridgeHarness;

fn shop_world() -> WorldBuilder {
    WorldBuilder::new()
        .shop()
        .money(4)
        .shop_item("Blueprint", "Joker", 10)
        .shop_item("Joker", "Joker", 2)
}

#[test]
fn health_counts_requests_before_itself() {
    let bridge = BridgeHarness::start(WorldBuilder::new().menu());
    let first = bridge.get("/health").unwrap();
    assert_eq!(first["status"], "ok");
    assert_eq!(first["request_count"], 0);
    assert!(first["version"].is_string());

    let second = bridge.get("/health").unwrap();
    assert_eq!(second["request_count"], 1);
    assert_eq!(second["error_count"], 0);
}

#[test]
fn state_and_legal_report_the_same_phase() {
    let bridge = BridgeHarness::start(shop_world());
    let state = bridge.get("/state").unwrap();
    let legal = bridge.get("/legal").unwrap();
    assert_eq!(state["phase"], "SHOP");
    assert_eq!(state["phase"], legal["phase"]);
    assert_eq!(state["money"], 4);
    assert_eq!(state["shop"]["items"].as_array().unwrap().len(), 2);
}

#[test]
fn inactive_run_has_no_legal_actions() {
    let bridge = BridgeHarness::start(WorldBuilder::new().menu());
    let state = bridge.get("/state").unwrap();
    assert_eq!(state["phase"], "MENU");
    assert_eq!(state["error"], "No active run");
    let legal = bridge.get("/legal").unwrap();
    assert_eq!(legal["actions"], serde_json::json!([]));
}

#[test]
fn unknown_paths_are_404() {
    let bridge = BridgeHarness::start(WorldBuilder::new().menu());
    let reply = bridge.request("GET", "/does-not-exist", None).unwrap();
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, serde_json::json!({"error": "Not found"}));
}

#[test]
fn malformed_request_line_is_400() {
    let bridge = BridgeHarness::start(WorldBuilder::new().menu());
    let reply = bridge.send_raw(b"HELLO\r\n\r\n").unwrap();
    assert_eq!(reply.status, 400);
    assert!(reply.body["error"].is_string());

    let health = bridge.get("/health").unwrap();
    assert_eq!(health["request_count"], 1);
    assert_eq!(health["error_count"], 0);
}

#[test]
fn preflight_carries_cors_headers() {
    let bridge = BridgeHarness::start(WorldBuilder::new().menu());
    let reply = bridge.request("OPTIONS", "/action", None).unwrap();
    assert_eq!(reply.status, 200);
    assert!(reply.body.is_null());
    assert!(reply.head.contains("Access-Control-Allow-Origin: *"));
    assert!(reply.head.contains("Access-Control-Allow-Methods: GET, POST, OPTIONS"));
}

#[test]
fn idle_connections_are_dropped_without_a_response() {
    let bridge = BridgeHarness::start_with(
        WorldBuilder::new().menu(),
        BridgeConfig {
            connection_timeout_ms: 50,
            ..Default::default()
        },
    );
    let mut idle = bridge.connect().unwrap();
    let started = Instant::now();
    let mut buffer = Vec::new();
    let read = idle.read_to_end(&mut buffer).unwrap_or(0);
    assert_eq!(read, 0);
    assert!(started.elapsed() < Duration::from_secs(5));

    let health = bridge.get("/health").unwrap();
    assert_eq!(health["request_count"], 0);
}

#[test]
fn reset_is_refused_and_config_echoes() {
    let bridge = BridgeHarness::start(WorldBuilder::new().menu());
    let reset = bridge.post("/reset", "").unwrap();
    assert_eq!(reset["ok"], false);
    assert!(reset["error"].as_str().unwrap().contains("not supported"));

    let config = bridge.post("/config", r#"{"frame_skip": 2}"#).unwrap();
    assert_eq!(config, serde_json::json!({"ok": true, "config": {"frame_skip": 2}}));
}
