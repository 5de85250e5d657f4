//! Request validation through the HTTP surface: field errors come back as
//! 422 with per-field messages, malformed bodies as 400.

mod test_utils;

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};
use test_utils::TestApp;
use tower::ServiceExt;

fn invoice_body(number: &str) -> Value {
    json!({
        "number": number,
        "client_name": "Novák s.r.o.",
        "client_address": "Václavské náměstí 1, Praha",
        "supplier_name": "Dodavatel a.s.",
        "supplier_address": "Masarykova 5, Brno",
        "amount": 121000,
        "currency": "CZK",
        "issued_on": "2026-01-01",
        "due_in": 14
    })
}

#[tokio::test]
async fn missing_required_fields_are_reported_per_field() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (status, body) = app.post("/api/clients", Some(&web.token), json!({})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    let messages = body["details"]["name"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (status, body) = app
        .post("/api/clients", Some(&web.token), json!({ "name": 42 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn company_id_is_unique_per_owner() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let bob = app.web_user().await.unwrap();
    let client = json!({ "name": "Novák s.r.o.", "company_id": "27082440" });

    let (status, created) = app.post("/api/clients", Some(&alice.token), client.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/clients", Some(&alice.token), client.clone()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["company_id"].is_array());

    // Another owner may register the same company.
    let (status, _) = app.post("/api/clients", Some(&bob.token), client.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    // Updating a row does not collide with itself.
    let id = created["id"].as_str().unwrap();
    let (status, updated) = app
        .put(&format!("/api/clients/{id}"), Some(&alice.token), client)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["company_id"], "27082440");
}

#[tokio::test]
async fn malformed_company_and_vat_ids_are_rejected() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (status, body) = app
        .post(
            "/api/clients",
            Some(&web.token),
            json!({ "name": "Novák", "company_id": "123", "vat_id": "27082440", "email": "nope" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("company_id"));
    assert!(details.contains_key("vat_id"));
    assert!(details.contains_key("email"));
    assert!(!details.contains_key("name"));
}

#[tokio::test]
async fn supplier_bank_details_come_in_pairs() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (status, body) = app
        .post(
            "/api/suppliers",
            Some(&web.token),
            json!({
                "name": "Dodavatel a.s.",
                "account_number": "19-2000145399",
                "iban": "CZ6508000000192000145399"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("bank_code"));
    assert!(details.contains_key("swift"));
    assert!(!details.contains_key("account_number"));
    assert!(!details.contains_key("iban"));
}

#[tokio::test]
async fn supplier_bank_code_must_name_a_known_bank() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();
    let supplier = json!({
        "name": "Dodavatel a.s.",
        "account_number": "19-2000145399",
        "bank_code": "0800"
    });

    let (status, body) = app
        .post("/api/suppliers", Some(&web.token), supplier.clone())
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["bank_code"].is_array());

    let (status, _) = app
        .post(
            "/api/admin/banks",
            Some(&admin.token),
            json!({ "name": "Česká spořitelna", "code": "0800" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = app.post("/api/suppliers", Some(&web.token), supplier).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["bank_code"], "0800");
}

#[tokio::test]
async fn duplicate_bank_code_is_rejected() {
    let app = TestApp::new().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, _) = app
        .post(
            "/api/admin/banks",
            Some(&admin.token),
            json!({ "name": "Česká spořitelna", "code": "0800" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post(
            "/api/admin/banks",
            Some(&admin.token),
            json!({ "name": "Jiná banka", "code": "0800" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["code"].is_array());
}

#[tokio::test]
async fn bank_in_use_cannot_be_deleted() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (_, bank) = app
        .post(
            "/api/admin/banks",
            Some(&admin.token),
            json!({ "name": "Česká spořitelna", "code": "0800" }),
        )
        .await;
    let bank_id = bank["id"].as_str().unwrap();
    let (_, supplier) = app
        .post(
            "/api/suppliers",
            Some(&web.token),
            json!({ "name": "Dodavatel a.s.", "account_number": "19-2000145399", "bank_code": "0800" }),
        )
        .await;

    let (status, body) = app
        .delete(&format!("/api/admin/banks/{bank_id}"), Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "BANK_IN_USE");

    let supplier_id = supplier["id"].as_str().unwrap();
    let (status, _) = app
        .delete(&format!("/api/suppliers/{supplier_id}"), Some(&web.token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .delete(&format!("/api/admin/banks/{bank_id}"), Some(&admin.token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn invoice_derives_due_date_and_defaults_to_draft() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (status, created) = app
        .post("/api/invoices", Some(&web.token), invoice_body("2026-0001"))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["due_on"], "2026-01-15");
    assert_eq!(created["user_id"], web.user.id.to_string());
}

#[tokio::test]
async fn invoice_rejects_impossible_dates_and_unknown_currency() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let mut body = invoice_body("2026-0002");
    body["issued_on"] = json!("2026-02-30");
    body["currency"] = json!("GBP");
    body["status"] = json!("lost");

    let (status, response) = app.post("/api/invoices", Some(&web.token), body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = response["details"].as_object().unwrap();
    assert!(details.contains_key("issued_on"));
    assert!(details.contains_key("currency"));
    assert!(details.contains_key("status"));
}

#[tokio::test]
async fn invoice_party_must_belong_to_owner() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let bob = app.web_user().await.unwrap();

    let (_, client) = app
        .post("/api/clients", Some(&alice.token), json!({ "name": "Alicin klient" }))
        .await;

    let mut body = invoice_body("2026-0003");
    body["client_id"] = client["id"].clone();
    let (status, response) = app.post("/api/invoices", Some(&bob.token), body.clone()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response["details"]["client_id"].is_array());

    let (status, created) = app.post("/api/invoices", Some(&alice.token), body).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["client_id"], client["id"]);
}

#[tokio::test]
async fn invoice_update_keeps_status_when_omitted() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let mut body = invoice_body("2026-0004");
    body["status"] = json!("issued");
    let (_, created) = app.post("/api/invoices", Some(&web.token), body).await;
    let id = created["id"].as_str().unwrap();

    let mut update = invoice_body("2026-0004");
    update["note"] = json!("Splatné převodem");
    let (status, updated) = app
        .put(&format!("/api/invoices/{id}"), Some(&web.token), update)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "issued");
    assert_eq!(updated["note"], "Splatné převodem");
}

#[tokio::test]
async fn deleting_a_client_keeps_its_invoices_addressed() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (_, client) = app
        .post(
            "/api/clients",
            Some(&web.token),
            json!({ "name": "Novák s.r.o.", "street": "Dlouhá 5", "zip": "110 00", "city": "Praha" }),
        )
        .await;
    let mut body = invoice_body("2026-0005");
    body["client_id"] = client["id"].clone();
    body["client_name"] = Value::Null;
    body["client_address"] = Value::Null;
    let (status, invoice) = app.post("/api/invoices", Some(&web.token), body).await;
    assert_eq!(status, StatusCode::CREATED);
    let invoice_id = invoice["id"].as_str().unwrap();

    let client_id = client["id"].as_str().unwrap();
    let (status, _) = app
        .delete(&format!("/api/clients/{client_id}"), Some(&web.token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, invoice) = app
        .get(&format!("/api/invoices/{invoice_id}"), Some(&web.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(invoice["client_id"].is_null());
    assert_eq!(invoice["client_name"], "Novák s.r.o.");
    assert_eq!(invoice["client_address"], "Dlouhá 5, 110 00 Praha");
}

#[tokio::test]
async fn deleting_a_supplier_keeps_its_invoices_addressed() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let (_, supplier) = app
        .post("/api/suppliers", Some(&web.token), json!({ "name": "Dodavatel a.s." }))
        .await;
    let mut body = invoice_body("2026-0006");
    body["supplier_id"] = supplier["id"].clone();
    body["supplier_name"] = Value::Null;
    body["supplier_address"] = Value::Null;
    let (status, invoice) = app.post("/api/invoices", Some(&web.token), body).await;
    assert_eq!(status, StatusCode::CREATED);
    let invoice_id = invoice["id"].as_str().unwrap();

    let supplier_id = supplier["id"].as_str().unwrap();
    let (status, _) = app
        .delete(&format!("/api/suppliers/{supplier_id}"), Some(&web.token))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, invoice) = app
        .get(&format!("/api/invoices/{invoice_id}"), Some(&web.token))
        .await;
    assert!(invoice["supplier_id"].is_null());
    assert_eq!(invoice["supplier_name"], "Dodavatel a.s.");
    // No address on file, so the name stands in for it.
    assert_eq!(invoice["supplier_address"], "Dodavatel a.s.");

    // The invoice still satisfies its own rules on an unchanged update.
    let (status, _) = app
        .put(&format!("/api/invoices/{invoice_id}"), Some(&web.token), invoice)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn messages_follow_accept_language() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/clients")
        .header("authorization", format!("Bearer {}", web.token))
        .header("content-type", "application/json")
        .header("accept-language", "cs-CZ,cs;q=0.9")
        .body(axum::body::Body::from("{}"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let english = app.post("/api/clients", Some(&web.token), json!({})).await.1;

    assert_ne!(body["details"]["name"], english["details"]["name"]);
}

#[tokio::test]
async fn product_tax_must_exist_and_price_is_not_negative() {
    let app = TestApp::new().await.unwrap();
    let web = app.web_user().await.unwrap();
    let admin = app.admin().await.unwrap();

    let (status, body) = app
        .post(
            "/api/products",
            Some(&web.token),
            json!({ "name": "Konzultace", "price": -1, "tax_id": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("price"));
    assert!(details.contains_key("tax_id"));

    let (_, tax) = app
        .post(
            "/api/admin/taxes",
            Some(&admin.token),
            json!({ "name": "Základní sazba", "rate": 21, "is_default": true }),
        )
        .await;

    let (status, created) = app
        .post(
            "/api/products",
            Some(&web.token),
            json!({ "name": "Konzultace", "sku": "KONZ-1", "unit": "hod", "price": 150000, "tax_id": tax["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["tax_id"], tax["id"]);
}

#[tokio::test]
async fn expense_supplier_must_belong_to_owner() {
    let app = TestApp::new().await.unwrap();
    let alice = app.web_user().await.unwrap();
    let bob = app.web_user().await.unwrap();

    let (_, supplier) = app
        .post("/api/suppliers", Some(&alice.token), json!({ "name": "Dodavatel a.s." }))
        .await;
    let expense = json!({
        "supplier_id": supplier["id"],
        "description": "Kancelářské potřeby",
        "amount": 45000,
        "currency": "CZK",
        "spent_on": "2026-03-12"
    });

    let (status, body) = app.post("/api/expenses", Some(&bob.token), expense.clone()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["details"]["supplier_id"].is_array());

    let (status, created) = app.post("/api/expenses", Some(&alice.token), expense).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["spent_on"], "2026-03-12");
}
