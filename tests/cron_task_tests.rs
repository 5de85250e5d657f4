//! Admin management of scheduled tasks.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::TestApp;

#[tokio::test]
async fn lists_registered_commands() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, body) = app
        .get("/api/admin/cron-tasks/commands", Some(&admin.token))
        .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"invoices:mark-overdue"));
    assert!(names.contains(&"system:ping"));
}

#[tokio::test]
async fn custom_expression_is_validated() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, body) = app
        .post(
            "/api/admin/cron-tasks",
            Some(&admin.token),
            json!({
                "name": "Every now and then",
                "base_command": "system:ping",
                "frequency": "custom",
                "custom_expression": "61 * * * *"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["custom_expression"].is_array());

    let (status, created) = app
        .post(
            "/api/admin/cron-tasks",
            Some(&admin.token),
            json!({
                "name": "Every quarter hour",
                "base_command": "system:ping",
                "frequency": "custom",
                "custom_expression": "*/15 * * * *"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["expression"], "*/15 * * * *");
    assert!(created["next_run_at"].is_string());
    assert!(created["last_run"].is_null());
}

#[tokio::test]
async fn frequency_specific_fields_are_required() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, body) = app
        .post(
            "/api/admin/cron-tasks",
            Some(&admin.token),
            json!({
                "name": "Weekly report",
                "base_command": "system:ping",
                "frequency": "weekly"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("run_at"));
    assert!(details.contains_key("day_of_week"));
    assert!(!details.contains_key("day_of_month"));
    assert!(!details.contains_key("custom_expression"));

    let (status, created) = app
        .post(
            "/api/admin/cron-tasks",
            Some(&admin.token),
            json!({
                "name": "Weekly report",
                "base_command": "system:ping",
                "frequency": "weekly",
                "run_at": "07:30",
                "day_of_week": 1
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["expression"], "30 7 * * 1");
}

#[tokio::test]
async fn unknown_command_and_frequency_are_rejected() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, body) = app
        .post(
            "/api/admin/cron-tasks",
            Some(&admin.token),
            json!({
                "name": "Archive",
                "base_command": "db:archive",
                "frequency": "yearly"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("base_command"));
    assert!(details.contains_key("frequency"));
}

#[tokio::test]
async fn manual_run_records_output() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (_, created) = app
        .post(
            "/api/admin/cron-tasks",
            Some(&admin.token),
            json!({
                "name": "Ping",
                "base_command": "system:ping",
                "command_params": "hello",
                "frequency": "daily",
                "run_at": "00:05",
                "is_active": false
            }),
        )
        .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .post(
            &format!("/api/admin/cron-tasks/{id}/run"),
            Some(&admin.token),
            json!({}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], true);
    assert_eq!(body["task"]["last_output"], "pong hello");
    assert!(body["task"]["last_run"].is_string());
}

#[tokio::test]
async fn task_names_are_unique_and_updates_keep_their_own_name() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();
    let task = json!({
        "name": "Overdue sweep",
        "base_command": "invoices:mark-overdue",
        "frequency": "daily",
        "run_at": "06:00"
    });

    let (status, created) = app
        .post("/api/admin/cron-tasks", Some(&admin.token), task.clone())
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/api/admin/cron-tasks", Some(&admin.token), task.clone())
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["name"].is_array());

    let id = created["id"].as_str().unwrap();
    let mut update = task;
    update["run_at"] = json!("05:45");
    let (status, updated) = app
        .put(&format!("/api/admin/cron-tasks/{id}"), Some(&admin.token), update)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["expression"], "45 5 * * *");

    let (status, _) = app
        .delete(&format!("/api/admin/cron-tasks/{id}"), Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .get(&format!("/api/admin/cron-tasks/{id}"), Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
