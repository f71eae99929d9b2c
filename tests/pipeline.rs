//! End-to-end checks of the request pipeline against a live server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Months, Utc};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use clinic_guard::store::{
    MemoryStore, NOTIFICATION_OUTBOX, PATIENTS, PAYMENTS, SECURITY_EVENTS, STAFF_INVITATIONS,
};
use common::{eventually, seeded_store, spawn_app, spawn_app_with, test_config, FaultyStore};

fn valid_patient() -> Value {
    json!({
        "firstName": "Jane",
        "lastName": "Doe",
        "email": "jane.doe@example.com",
        "phone": "+1 (555) 123-4567",
        "dateOfBirth": "1980-05-17",
        "gender": "female",
        "favouriteColour": "teal",
    })
}

fn actions(store: &MemoryStore) -> Vec<String> {
    store
        .rows(SECURITY_EVENTS)
        .iter()
        .filter_map(|e| e["action_type"].as_str().map(str::to_owned))
        .collect()
}

#[tokio::test]
async fn test_public_routes_need_no_credentials() {
    let app = spawn_app(Arc::new(seeded_store())).await;

    let res = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let (cookie, token) = app.csrf().await;
    assert!(cookie.starts_with("csrf_token="));
    assert!(cookie.ends_with(&token));
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    let res = app.client.get(app.url("/api/patients")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    let res = app.get("/api/patients", "forged").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_profile_is_forbidden_not_unauthenticated() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    let res = app.get("/api/patients", "tok-inactive").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Profile not found or inactive");
}

#[tokio::test]
async fn test_authenticated_access_is_audited() {
    let store = seeded_store();
    let app = spawn_app(Arc::new(store.clone())).await;
    let res = app
        .client
        .get(app.url("/api/patients"))
        .bearer_auth("tok-dentist")
        .header("user-agent", "pipeline-test")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(eventually(|| actions(&store).contains(&"api_access".to_string())).await);
    let event = store
        .rows(SECURITY_EVENTS)
        .into_iter()
        .find(|e| e["action_type"] == "api_access")
        .unwrap();
    assert_eq!(event["user_id"], "u-dentist");
    assert_eq!(event["risk_level"], "low");
    assert_eq!(event["metadata"]["method"], "GET");
    assert_eq!(event["metadata"]["path"], "/api/patients");
    assert_eq!(event["metadata"]["ip"], "127.0.0.1");
    assert_eq!(event["metadata"]["user_agent"], "pipeline-test");
}

#[tokio::test]
async fn test_csrf_runs_before_authentication() {
    let app = spawn_app(Arc::new(seeded_store())).await;

    // No token, no CSRF: refused by CSRF, not by auth.
    let res = app
        .client
        .post(app.url("/api/patients"))
        .json(&valid_patient())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "CSRF_TOKEN_INVALID");
}

#[tokio::test]
async fn test_csrf_missing_mismatched_and_matching() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    let (cookie, token) = app.csrf().await;

    let missing_header = app
        .client
        .post(app.url("/api/patients"))
        .bearer_auth("tok-manager")
        .header("cookie", &cookie)
        .json(&valid_patient())
        .send()
        .await
        .unwrap();
    assert_eq!(missing_header.status(), StatusCode::FORBIDDEN);

    let mismatched = app
        .client
        .post(app.url("/api/patients"))
        .bearer_auth("tok-manager")
        .header("cookie", &cookie)
        .header("x-csrf-token", format!("{token}x"))
        .json(&valid_patient())
        .send()
        .await
        .unwrap();
    assert_eq!(mismatched.status(), StatusCode::FORBIDDEN);

    let matching = app
        .client
        .post(app.url("/api/patients"))
        .bearer_auth("tok-manager")
        .header("cookie", &cookie)
        .header("x-csrf-token", &token)
        .json(&valid_patient())
        .send()
        .await
        .unwrap();
    assert_eq!(matching.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_role_gate_reveals_required_and_current() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    let res = app.post("/api/patients", "tok-hygienist", valid_patient()).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Insufficient permissions");
    assert_eq!(body["current"], "hygienist");
    assert_eq!(
        body["required"],
        json!(["super_admin", "practice_admin", "manager", "dentist", "receptionist"])
    );
}

#[tokio::test]
async fn test_role_gate_runs_before_validation() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    let res = app.post("/api/patients", "tok-hygienist", json!({})).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_patient_scenario_reports_four_errors() {
    let store = seeded_store();
    let app = spawn_app(Arc::new(store.clone())).await;
    let fifteen_years_ago = Utc::now()
        .date_naive()
        .checked_sub_months(Months::new(15 * 12))
        .unwrap()
        .to_string();

    let res = app
        .post(
            "/api/patients",
            "tok-reception",
            json!({
                "firstName": "J",
                "lastName": "Doe",
                "email": "bad",
                "phone": "123",
                "dateOfBirth": fifteen_years_ago,
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    let errors = body["details"]["errors"].as_array().unwrap();
    let fields: Vec<&str> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, vec!["firstName", "email", "phone", "dateOfBirth"]);
    for e in errors {
        assert!(e["message"].is_string());
        assert!(e["code"].is_string());
    }
    assert!(store.rows(PATIENTS).is_empty());
}

#[tokio::test]
async fn test_non_object_body_fails_validation() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    let res = app.post("/api/patients", "tok-manager", json!([1, 2, 3])).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["details"]["errors"][0]["field"], "body");
}

#[tokio::test]
async fn test_created_patient_is_sanitized_stripped_and_audited() {
    let store = seeded_store();
    let app = spawn_app(Arc::new(store.clone())).await;
    let mut patient = valid_patient();
    patient["notes"] = json!("<script>alert(1)</script> prefers mornings");

    let res = app.post("/api/patients", "tok-practice", patient).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let rows = store.rows(PATIENTS);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["notes"], "scriptalert(1)/script prefers mornings");
    assert!(rows[0].get("favouriteColour").is_none());
    assert_eq!(rows[0]["created_by"], "u-practice");

    let created = store
        .rows(SECURITY_EVENTS)
        .into_iter()
        .find(|e| e["action_type"] == "patient_created")
        .unwrap();
    assert_eq!(created["resource_id"], rows[0]["id"]);
    assert_eq!(created["risk_level"], "medium");
}

#[tokio::test]
async fn test_delete_patient_is_admin_only_and_audited() {
    let store = seeded_store();
    store.seed(PATIENTS, [json!({ "id": "p-1", "firstName": "Old" })]);
    let app = spawn_app(Arc::new(store.clone())).await;

    let res = app.send(Method::DELETE, "/api/patients/p-1", "tok-dentist", None).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.send(Method::DELETE, "/api/patients/p-1", "tok-practice", None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(store.rows(PATIENTS).is_empty());
    assert!(actions(&store).contains(&"patient_deleted".to_string()));

    let res = app.send(Method::DELETE, "/api/patients/p-1", "tok-practice", None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_denies_101st_request() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    for i in 0..100 {
        let res = app.get("/api/patients", "tok-dentist").await;
        assert_eq!(res.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let res = app.get("/api/patients", "tok-dentist").await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()["retry-after"], "900");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Too many requests", "retryAfter": 900 }));

    // Another client has its own window.
    let res = app.get("/api/patients", "tok-manager").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_requests_do_not_consume_rate_limit() {
    let mut config = test_config();
    config.rate_limit.default.max_requests = 2;
    let app = spawn_app_with(config, Arc::new(seeded_store())).await;

    for _ in 0..5 {
        let res = app.post("/api/patients", "tok-reception", json!({})).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.get("/api/patients", "tok-reception").await.status(), StatusCode::OK);
    assert_eq!(app.get("/api/patients", "tok-reception").await.status(), StatusCode::OK);
    assert_eq!(
        app.get("/api/patients", "tok-reception").await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_request() {
    let store = FaultyStore {
        inner: seeded_store(),
        fail_audit: true,
        delay: None,
    };
    let inner = store.inner.clone();
    let app = spawn_app(Arc::new(store)).await;

    let res = app.post("/api/patients", "tok-manager", valid_patient()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(inner.rows(PATIENTS).len(), 1);
    assert!(inner.rows(SECURITY_EVENTS).is_empty());
}

#[tokio::test]
async fn test_slow_store_is_service_unavailable() {
    let mut config = test_config();
    config.store.timeout_ms = 50;
    let store = FaultyStore {
        inner: seeded_store(),
        fail_audit: false,
        delay: Some(Duration::from_millis(500)),
    };
    let app = spawn_app_with(config, Arc::new(store)).await;

    let res = app.get("/api/patients", "tok-dentist").await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["retryable"], true);
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_debug_mode_exposes_collaborator_detail() {
    let mut config = test_config();
    config.server.debug = true;
    config.store.timeout_ms = 50;
    let store = FaultyStore {
        inner: seeded_store(),
        fail_audit: false,
        delay: Some(Duration::from_millis(500)),
    };
    let app = spawn_app_with(config, Arc::new(store)).await;

    let res = app.get("/api/patients", "tok-dentist").await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("record store"));
}

#[tokio::test]
async fn test_card_payment_stores_last_four_only() {
    let store = seeded_store();
    let app = spawn_app(Arc::new(store.clone())).await;
    let expiry = Utc::now()
        .date_naive()
        .checked_add_months(Months::new(24))
        .unwrap()
        .format("%m/%y")
        .to_string();

    let res = app
        .post(
            "/api/payments",
            "tok-reception",
            json!({
                "patientId": "3f2b8c4e-2d7a-4c1e-9b6f-0a1b2c3d4e5f",
                "amount": 80,
                "paymentMethod": "card",
                "cardNumber": "4242 4242 4242 4242",
                "expiryDate": expiry,
                "cvv": "123",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let rows = store.rows(PAYMENTS);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["cardLastFour"], "4242");
    assert!(rows[0].get("cardNumber").is_none());
    assert!(rows[0].get("cvv").is_none());
    assert!(actions(&store).contains(&"payment_recorded".to_string()));
}

#[tokio::test]
async fn test_expired_card_is_rejected() {
    let app = spawn_app(Arc::new(seeded_store())).await;
    let expiry = Utc::now()
        .date_naive()
        .checked_sub_months(Months::new(1))
        .unwrap()
        .format("%m/%y")
        .to_string();

    let res = app
        .post(
            "/api/payments",
            "tok-manager",
            json!({
                "patientId": "3f2b8c4e-2d7a-4c1e-9b6f-0a1b2c3d4e5f",
                "amount": 80,
                "paymentMethod": "card",
                "cardNumber": "4242424242424242",
                "expiryDate": expiry,
                "cvv": "123",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    let errors = body["details"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "expiryDate");
    assert_eq!(errors[0]["message"], "Card has expired");
}

#[tokio::test]
async fn test_appointment_and_invitation_enqueue_notifications() {
    let store = seeded_store();
    let app = spawn_app(Arc::new(store.clone())).await;

    let res = app
        .post(
            "/api/appointments",
            "tok-hygienist",
            json!({
                "patientId": "3f2b8c4e-2d7a-4c1e-9b6f-0a1b2c3d4e5f",
                "dentistId": "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
                "startTime": "2099-01-05T09:30:00Z",
                "durationMinutes": 45,
                "type": "cleaning",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .post(
            "/api/staff/invitations",
            "tok-super",
            json!({
                "email": "new.hire@clinic.test",
                "role": "hygienist",
                "firstName": "Sam",
                "lastName": "Lee",
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert!(body.get("token").is_none());
    assert_eq!(store.rows(STAFF_INVITATIONS).len(), 1);

    let outbox = store.rows(NOTIFICATION_OUTBOX);
    let kinds: Vec<&str> = outbox.iter().map(|r| r["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["appointment_scheduled", "staff_invitation"]);
    assert_eq!(outbox[1]["recipient"], "new.hire@clinic.test");
    assert!(actions(&store).contains(&"staff_invited".to_string()));
}

#[tokio::test]
async fn test_audit_log_is_admin_only() {
    let store = seeded_store();
    let app = spawn_app(Arc::new(store.clone())).await;

    let res = app.get("/api/audit-events", "tok-manager").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.get("/api/audit-events?action_type=api_access&limit=5", "tok-practice").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["events"].as_array().unwrap().len() <= 5);
}
