//! Guard separation and owner scoping across both route surfaces.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::TestApp;

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app.get("/api/clients", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/admin/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/clients", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn public_routes_answer_without_a_token() {
    let app = TestApp::new().await.unwrap();

    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = app.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn web_token_is_rejected_on_admin_surface() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (status, _) = app.get("/api/admin/clients", Some(&web.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/admin/cron-tasks", Some(&web.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn backpack_token_is_accepted_on_frontend_surface() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();

    app.post(
        "/api/clients",
        Some(&alice.token),
        json!({ "name": "Novák s.r.o." }),
    )
    .await;

    let (status, listed) = app.get("/api/clients", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn web_users_only_see_their_own_clients() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let bob = app.web_user().await.unwrap();

    let (status, created) = app
        .post(
            "/api/clients",
            Some(&alice.token),
            json!({ "name": "Novák s.r.o.", "company_id": "27082440" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], alice.user.id.to_string());
    let client_id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .get(&format!("/api/clients/{client_id}"), Some(&bob.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            &format!("/api/clients/{client_id}"),
            Some(&bob.token),
            json!({ "name": "Hijacked" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/clients/{client_id}"), Some(&bob.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = app.get("/api/clients", Some(&bob.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 0);

    let (status, listed) = app.get("/api/clients", Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn web_users_cannot_touch_foreign_suppliers() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let bob = app.web_user().await.unwrap();

    let (status, created) = app
        .post(
            "/api/suppliers",
            Some(&alice.token),
            json!({ "name": "Dodavatel a.s." }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let supplier_id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .get(&format!("/api/suppliers/{supplier_id}"), Some(&bob.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            &format!("/api/suppliers/{supplier_id}"),
            Some(&bob.token),
            json!({ "name": "Hijacked" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/suppliers/{supplier_id}"), Some(&bob.token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, fetched) = app
        .get(&format!("/api/suppliers/{supplier_id}"), Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Dodavatel a.s.");
}

#[tokio::test]
async fn web_user_cannot_reassign_owner() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let bob = app.web_user().await.unwrap();

    let (status, created) = app
        .post(
            "/api/suppliers",
            Some(&alice.token),
            json!({ "name": "Dodavatel a.s.", "user_id": bob.user.id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], alice.user.id.to_string());
}

#[tokio::test]
async fn admin_reaches_every_owner_rows() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (_, created) = app
        .post(
            "/api/suppliers",
            Some(&alice.token),
            json!({ "name": "Dodavatel a.s." }),
        )
        .await;
    let supplier_id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = app
        .get(&format!("/api/admin/suppliers/{supplier_id}"), Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Dodavatel a.s.");

    let (status, listed) = app
        .get(
            &format!("/api/admin/suppliers?user_id={}", alice.user.id),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .delete(&format!("/api/admin/suppliers/{supplier_id}"), Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .get(&format!("/api/suppliers/{supplier_id}"), Some(&alice.token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_creates_rows_for_a_chosen_owner() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, created) = app
        .post(
            "/api/admin/clients",
            Some(&admin.token),
            json!({ "name": "Pro Alici", "user_id": alice.user.id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], alice.user.id.to_string());

    let (status, body) = app
        .post(
            "/api/admin/clients",
            Some(&admin.token),
            json!({ "name": "Nikdo", "user_id": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["user_id"].is_array());
}

#[tokio::test]
async fn lookups_are_listed_for_web_users_but_managed_by_admins() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, created) = app
        .post(
            "/api/admin/banks",
            Some(&admin.token),
            json!({ "name": "Česká spořitelna", "code": "0800", "swift": "GIBACZPX" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"], "0800");

    let (status, listed) = app.get("/api/banks", Some(&web.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .post(
            "/api/banks",
            Some(&web.token),
            json!({ "name": "Fio banka", "code": "2010" }),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (status, _) = app
        .get(
            &format!("/api/invoices/{}", uuid::Uuid::new_v4()),
            Some(&web.token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
