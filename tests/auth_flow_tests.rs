//! Registration, login and token use for both guards.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::{TEST_PASSWORD, TestApp};

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new().await.unwrap();

    let (status, registered) = app
        .post(
            "/api/register",
            None,
            json!({
                "name": "Jana Nováková",
                "email": "Jana@Example.cz",
                "password": "tajne-heslo"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(registered["token_type"], "Bearer");
    assert_eq!(registered["guard"], "web");
    assert_eq!(registered["user"]["email"], "jana@example.cz");
    assert_eq!(registered["user"]["roles"][0]["name"], "customer");

    let (status, logged_in) = app
        .post(
            "/api/login",
            None,
            json!({ "email": "jana@example.cz", "password": "tajne-heslo" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = logged_in["access_token"].as_str().unwrap();

    let (status, me) = app.get("/api/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["guard"], "web");
    let permissions: Vec<&str> = me["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_str().unwrap())
        .collect();
    assert!(permissions.contains(&"invoices.manage"));
    assert!(!permissions.contains(&"users.manage"));

    // A frontend token opens the frontend surface only.
    let (status, _) = app.get("/api/invoices", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/admin/invoices", Some(token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_rejects_taken_email_and_short_password() {
    let app = TestApp::new().await.unwrap();
    let existing = app.web_user().await.unwrap();

    let (status, body) = app
        .post(
            "/api/register",
            None,
            json!({
                "name": "Kopie",
                "email": existing.user.email.to_uppercase(),
                "password": "short"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("email"));
    assert!(details.contains_key("password"));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = TestApp::new().await.unwrap();
    let user = app.web_user().await.unwrap();

    let (status, body) = app
        .post(
            "/api/login",
            None,
            json!({ "email": user.user.email, "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = app
        .post(
            "/api/login",
            None,
            json!({ "email": "nobody@example.cz", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_login_requires_an_admin_role() {
    let app = TestApp::new().await.unwrap();
    let customer = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, _) = app
        .post(
            "/api/admin/login",
            None,
            json!({ "email": customer.user.email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, issued) = app
        .post(
            "/api/admin/login",
            None,
            json!({ "email": admin.user.email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issued["guard"], "backpack");

    let token = issued["access_token"].as_str().unwrap();
    let (status, _) = app.get("/api/admin/users", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deactivated_user_loses_access() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();
    let user = app.web_user().await.unwrap();

    let (status, _) = app
        .put(
            &format!("/api/admin/users/{}", user.user.id),
            Some(&admin.token),
            json!({ "name": user.user.name, "email": user.user.email, "is_active": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/me", Some(&user.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/api/login",
            None,
            json!({ "email": user.user.email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
