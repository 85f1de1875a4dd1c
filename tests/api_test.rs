//! API integration tests
//!
//! Tests for the REST endpoints: numbering CRUD, duplicate detection, the
//! assign workflow, bulk creation and CSV import/export.

#![cfg(feature = "server")]

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use ipphone::config::AppConfig;
use ipphone::database::connection::setup_database;
use ipphone::server::app::create_app;
use sea_orm::Database;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

/// Create a test server backed by a temporary SQLite file
async fn setup_server_with(config: AppConfig) -> Result<(TestServer, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    let app = create_app(db, &config).await?;
    let server = TestServer::new(app)?;

    Ok((server, temp_file))
}

async fn setup_test_server() -> Result<(TestServer, NamedTempFile)> {
    setup_server_with(AppConfig::default()).await
}

async fn create_partition(server: &TestServer, name: &str, enforce_unique: bool) -> i64 {
    let response = server
        .post("/api/v1/partitions")
        .json(&json!({ "name": name, "enforce_unique": enforce_unique }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

/// Returns (device id, line id) for a device with one line `L1`
async fn create_device_with_line(server: &TestServer, name: &str) -> (i64, i64) {
    let response = server
        .post("/api/v1/devices")
        .json(&json!({ "name": name }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let device_id = response.json::<Value>()["id"].as_i64().unwrap();

    let response = server
        .post(&format!("/api/v1/devices/{}/lines", device_id))
        .json(&json!({ "name_pattern": "L1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let lines: Vec<Value> = response.json();
    (device_id, lines[0]["id"].as_i64().unwrap())
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (server, _db) = setup_test_server().await?;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "ipphone");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());

    let response = server.get("/api-docs/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<Value>()["paths"]["/api/v1/extensions"].is_object());

    Ok(())
}

#[tokio::test]
async fn test_extension_crud_api() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    let partition_id = create_partition(&server, "Internal", true).await;

    let response = server
        .post("/api/v1/extensions")
        .json(&json!({
            "dn": "1000",
            "partition": partition_id,
            "description": "Front desk",
            "tags": ["office"]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let extension: Value = response.json();
    let id = extension["id"].as_i64().unwrap();
    assert_eq!(extension["status"], "active");
    assert_eq!(extension["status_label"], "Active");
    assert_eq!(extension["status_class"], "primary");
    assert_eq!(extension["partition"]["name"], "Internal");

    let response = server
        .get("/api/v1/extensions")
        .add_query_param("partition_id", partition_id)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let page: Value = response.json();
    assert_eq!(page["count"], 1);
    assert_eq!(page["limit"], 50);
    assert_eq!(page["results"][0]["dn"], "1000");

    let response = server
        .put(&format!("/api/v1/extensions/{}", id))
        .json(&json!({ "dn": "1001", "partition": partition_id, "status": 2 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["dn"], "1001");
    assert_eq!(updated["status"], "inactive");

    let response = server
        .get(&format!("/api/v1/extensions/{}/changelog", id))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let changes: Vec<Value> = response.json();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0]["action"], "update");

    let response = server.delete(&format!("/api/v1/extensions/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server.get(&format!("/api/v1/extensions/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_dn_rules() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    let internal = create_partition(&server, "Internal", true).await;
    let lab = create_partition(&server, "Lab", false).await;

    let first = server
        .post("/api/v1/extensions")
        .json(&json!({ "dn": "1000", "partition": internal }))
        .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);
    let first_id = first.json::<Value>()["id"].as_i64().unwrap();

    let response = server
        .post("/api/v1/extensions")
        .json(&json!({ "dn": "1000", "partition": internal }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["field"], "dn");
    assert_eq!(
        body["message"],
        format!("Duplicate DN found in Partition Internal: 1000 (#{})", first_id)
    );
    assert_eq!(body["details"]["conflict_id"], first_id);

    // A partition without enforcement accepts repeats, as do partition-less
    // records while the global policy is off
    for partition in [json!(lab), json!(lab), Value::Null, Value::Null] {
        let response = server
            .post("/api/v1/extensions")
            .json(&json!({ "dn": "1000", "partition": partition }))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
    }

    // Turning enforcement on over existing duplicates is refused
    let response = server
        .put(&format!("/api/v1/partitions/{}", lab))
        .json(&json!({ "name": "Lab", "enforce_unique": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["details"]["dns"], json!(["1000"]));

    Ok(())
}

#[tokio::test]
async fn test_global_uniqueness_when_enabled() -> Result<()> {
    let mut config = AppConfig::default();
    config.numbering.enforce_global_unique = true;
    let (server, _db) = setup_server_with(config).await?;

    let response = server
        .post("/api/v1/extensions")
        .json(&json!({ "dn": "5000" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = server
        .post("/api/v1/extensions")
        .json(&json!({ "dn": "5000" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let message = response.json::<Value>()["message"].as_str().unwrap().to_string();
    assert!(message.starts_with("Duplicate DN found in global table: 5000"));

    let response = server.get("/api/v1/extensions/add").await;
    assert_eq!(response.json::<Value>()["enforce_global_unique"], true);

    Ok(())
}

#[tokio::test]
async fn test_parent_hints_on_create_and_edit() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    let (device_id, line_id) = create_device_with_line(&server, "desk-1").await;

    let response = server
        .post("/api/v1/extensions")
        .add_query_param("line", line_id)
        .json(&json!({ "dn": "2000" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let extension: Value = response.json();
    let id = extension["id"].as_i64().unwrap();
    assert_eq!(extension["parent"]["type"], "line");
    assert_eq!(extension["parent"]["id"], line_id);
    assert_eq!(extension["device"]["id"], device_id);

    // Unknown and malformed selectors are ignored
    let response = server
        .post("/api/v1/extensions")
        .add_query_param("line", "abc")
        .json(&json!({ "dn": "2001" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert!(response.json::<Value>()["parent"].is_null());

    let response = server
        .put(&format!("/api/v1/extensions/{}", id))
        .add_query_param("line", 9999)
        .json(&json!({ "dn": "2000" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["parent"]["id"], line_id);

    let response = server.get(&format!("/api/v1/lines/{}", line_id)).await;
    let line: Value = response.json();
    assert_eq!(line["extensions"][0]["dn"], "2000");

    let response = server
        .put(&format!("/api/v1/extensions/{}", id))
        .json(&json!({ "dn": "2000", "unlink": true }))
        .await;
    assert!(response.json::<Value>()["parent"].is_null());

    Ok(())
}

#[tokio::test]
async fn test_assign_workflow() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    let (_device_id, line_id) = create_device_with_line(&server, "desk-2").await;

    for dn in ["3000", "3001", "4000"] {
        server
            .post("/api/v1/extensions")
            .json(&json!({ "dn": dn }))
            .await;
    }

    let response = server.get("/api/v1/extensions/assign").await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
    assert_eq!(response.header("location"), "/api/v1/extensions/add");

    let response = server
        .post("/api/v1/extensions/assign")
        .json(&json!({ "dn": "30" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

    let response = server
        .get("/api/v1/extensions/assign")
        .add_query_param("line", line_id)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let form: Value = response.json();
    assert_eq!(form["target"]["id"], line_id);
    assert_eq!(form["fields"][0]["name"], "dn");

    let response = server
        .post("/api/v1/extensions/assign")
        .add_query_param("line", line_id)
        .json(&json!({ "dn": "30", "unassigned_only": true }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let results: Value = response.json();
    let matches = results["results"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    let edit_url = matches[0]["edit_url"].as_str().unwrap();
    assert!(edit_url.ends_with(&format!("?line={}", line_id)));

    let response = server
        .post("/api/v1/extensions/assign")
        .add_query_param("line", line_id)
        .json(&json!({ "dn": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["field"], "dn");

    let response = server
        .post("/api/v1/extensions/assign")
        .add_query_param("line", line_id)
        .json(&json!({ "dn": "9" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<Value>()["results"].as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_bulk_add_reports_per_dn_failures() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    let partition_id = create_partition(&server, "Internal", true).await;

    server
        .post("/api/v1/extensions")
        .json(&json!({ "dn": "1005", "partition": partition_id }))
        .await;

    let response = server
        .post("/api/v1/extensions/bulk-add")
        .json(&json!({ "pattern": "10[00-09]", "partition": partition_id }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let result: Value = response.json();
    assert_eq!(result["created"].as_array().unwrap().len(), 9);
    assert_eq!(result["created"][0]["dn"], "1000");
    assert_eq!(result["errors"][0]["dn"], "1005");

    let response = server
        .post("/api/v1/extensions/bulk-add")
        .json(&json!({ "pattern": "10[9-" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["field"], "pattern");
    let response = server
        .get("/api/v1/extensions")
        .add_query_param("q", "10[")
        .await;
    assert_eq!(response.json::<Value>()["count"], 0);

    Ok(())
}

#[tokio::test]
async fn test_partition_protect_and_bulk_operations() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    let used = create_partition(&server, "Used", true).await;
    let spare = create_partition(&server, "Spare", false).await;

    server
        .post("/api/v1/extensions")
        .json(&json!({ "dn": "1000", "partition": used }))
        .await;

    let response = server.delete(&format!("/api/v1/partitions/{}", used)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["details"]["extensions"], 1);

    let response = server
        .post("/api/v1/partitions/edit")
        .json(&json!({ "ids": [used, spare], "add_tags": ["voice"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let edited: Vec<Value> = response.json();
    assert!(edited.iter().all(|p| p["tags"] == json!(["voice"])));

    let response = server
        .get("/api/v1/partitions")
        .add_query_param("tag", "voice")
        .add_query_param("enforce_unique", "true")
        .await;
    assert_eq!(response.json::<Value>()["count"], 1);

    // All or nothing: the used partition blocks the whole batch
    let response = server
        .post("/api/v1/partitions/delete")
        .json(&json!({ "ids": [used, spare] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let response = server.get(&format!("/api/v1/partitions/{}", spare)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = server
        .post("/api/v1/partitions/delete")
        .json(&json!({ "ids": [spare] }))
        .await;
    assert_eq!(response.json::<Value>()["deleted"], 1);

    Ok(())
}

#[tokio::test]
async fn test_extension_csv_import_and_export() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    create_partition(&server, "Internal", true).await;
    create_device_with_line(&server, "desk-3").await;

    let bad = "dn,partition,status,device,line_name,description\n\
               1000,Internal,active,,,ok\n\
               1001,Nowhere,active,,,\n\
               1002,,active,,L1,\n\
               1003,,active,desk-3,L9,\n";
    let response = server.post("/api/v1/extensions/import").text(bad).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "IMPORT_FAILED");
    let messages: Vec<&str> = body["details"]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["message"].as_str().unwrap())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Partition not found.",
            "line_name requires device",
            "Invalid line L9 for device desk-3"
        ]
    );

    // Nothing was saved
    let response = server.get("/api/v1/extensions").await;
    assert_eq!(response.json::<Value>()["count"], 0);

    let good = "dn,partition,status,device,line_name,description\n\
                1000,Internal,Active,desk-3,L1,Reception\n\
                1001,,2,,,\n";
    let response = server.post("/api/v1/extensions/import").text(good).await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Vec<Value> = response.json();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0]["parent"]["name"], "L1");
    assert_eq!(created[1]["status"], "inactive");

    let response = server.get("/api/v1/extensions/export").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let csv = response.text();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("dn,partition,status,device,line_name,description")
    );
    assert_eq!(lines.next(), Some("1000,Internal,Active,desk-3,L1,Reception"));

    Ok(())
}

#[tokio::test]
async fn test_device_lines_and_interfaces() -> Result<()> {
    let (server, _db) = setup_test_server().await?;
    let (device_id, line_id) = create_device_with_line(&server, "desk-4").await;

    let response = server
        .post(&format!("/api/v1/devices/{}/lines", device_id))
        .json(&json!({ "name_pattern": "L[2-3]" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let response = server
        .post(&format!("/api/v1/devices/{}/lines", device_id))
        .json(&json!({ "name_pattern": "L1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "VALIDATION_FAILED");
    assert_eq!(body["field"], "name");

    let response = server
        .post(&format!("/api/v1/devices/{}/interfaces", device_id))
        .json(&json!({ "name": "eth0" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let interface_id = response.json::<Value>()["id"].as_i64().unwrap();

    let response = server
        .post("/api/v1/extensions")
        .add_query_param("interface", interface_id)
        .json(&json!({ "dn": "7000" }))
        .await;
    let extension_id = response.json::<Value>()["id"].as_i64().unwrap();

    let response = server
        .delete(&format!("/api/v1/interfaces/{}", interface_id))
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let response = server
        .get(&format!("/api/v1/extensions/{}", extension_id))
        .await;
    assert!(response.json::<Value>()["parent"].is_null());

    let response = server
        .post(&format!("/api/v1/devices/{}/lines/delete", device_id))
        .json(&json!({ "ids": [line_id] }))
        .await;
    assert_eq!(response.json::<Value>()["deleted"], 1);

    let response = server
        .get(&format!("/api/v1/devices/{}/lines", device_id))
        .await;
    assert_eq!(response.json::<Vec<Value>>().len(), 2);

    let response = server.delete(&format!("/api/v1/devices/{}", device_id)).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    let response = server.get("/api/v1/lines").await;
    assert_eq!(response.json::<Value>()["count"], 0);

    Ok(())
}
