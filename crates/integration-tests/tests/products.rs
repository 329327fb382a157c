//! Catalog endpoints.

use axum::http::StatusCode;
use cornerstore_integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_product_crud() {
    let app = TestApp::new();
    let token = app.token_for(1);

    let created = app
        .post(
            "/products",
            Some(&token),
            json!({
                "name": "Enamel Mug",
                "description": "12oz",
                "price": 14,
                "imageUrl": "https://cdn.example.com/mug.png"
            }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["price"], "14.00");
    assert_eq!(created.body["imageUrl"], "https://cdn.example.com/mug.png");
    let id = created.body["id"].as_i64().expect("id");

    let listed = app.get("/products", None).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().map(Vec::len), Some(1));

    let updated = app
        .put(
            &format!("/products/{id}"),
            Some(&token),
            json!({ "description": null, "price": "12.50" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Enamel Mug");
    assert_eq!(updated.body["price"], "12.50");
    assert!(updated.body["description"].is_null());
    assert_eq!(updated.body["imageUrl"], "https://cdn.example.com/mug.png");

    let deleted = app.delete(&format!("/products/{id}"), Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Product deleted successfully");

    let gone = app.get(&format!("/products/{id}"), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["error"], "Product not found");
}

#[tokio::test]
async fn test_product_writes_require_auth() {
    let app = TestApp::new();

    let resp = app
        .post("/products", None, json!({ "name": "Mug", "price": 1 }))
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.delete("/products/1", None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_validation() {
    let app = TestApp::new();
    let token = app.token_for(1);

    for body in [
        json!({ "price": 1 }),
        json!({ "name": "  ", "price": 1 }),
        json!({ "name": "Mug" }),
        json!({ "name": "Mug", "price": -1 }),
        json!({ "name": "Mug", "price": "1.005" }),
        json!({ "name": "Mug", "price": "10000000000.00" }),
    ] {
        let resp = app.post("/products", Some(&token), body.clone()).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{body}");
        assert!(resp.body["error"].is_string());
    }
}

#[tokio::test]
async fn test_unknown_product_update_and_delete() {
    let app = TestApp::new();
    let token = app.token_for(1);

    let resp = app
        .put("/products/42", Some(&token), json!({ "name": "Mug" }))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app.delete("/products/42", Some(&token)).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
