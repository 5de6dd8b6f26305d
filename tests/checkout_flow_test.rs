//! End-to-end tests for the storefront checkout flow:
//! catalog seeding, promo validation, order creation with discounts,
//! idempotent resubmission, and the order status lifecycle.

mod common;

use axum::http::Method;
use common::{decimal_field, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn seed_product(app: &TestApp, name: &str, price: &str, stock: i64) -> Value {
    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({
                "name_en": name,
                "name_si": "ඔසු තෙල්",
                "price": price,
                "stock": stock,
            })),
        )
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["data"].clone()
}

async fn seed_promo(app: &TestApp, body: Value) -> Value {
    let response = app
        .request(Method::POST, "/api/v1/admin/promo-codes", Some(body))
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["data"].clone()
}

fn checkout_payload(product_id: &str, quantity: i64) -> Value {
    json!({
        "customer_name": "Nimal Perera",
        "customer_phone": "0771234567",
        "shipping_address": {
            "street": "12 Temple Road",
            "city": "Kandy",
            "province": "Central",
        },
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "payment_method": "cod",
    })
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn checkout_applies_promo_and_computes_totals() {
    let app = TestApp::new().await;

    let product = seed_product(&app, "Herbal Hair Oil", "2000.00", 10).await;
    let product_id = product["id"].as_str().expect("product id");

    seed_promo(
        &app,
        json!({
            "code": "SAVE10",
            "kind": "percent",
            "value": "10",
            "min_order_amount": "1000",
            "max_discount": "500",
        }),
    )
    .await;

    // 3 x 2000 = 6000; 10% is 600, capped at 500
    let mut payload = checkout_payload(product_id, 3);
    payload["promo_code"] = json!("save10"); // case-insensitive match

    let response = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(response.status(), 200);
    let order = response_json(response).await["data"].clone();

    assert_eq!(decimal_field(&order["subtotal"]), dec!(6000));
    assert_eq!(decimal_field(&order["discount_amount"]), dec!(500));
    assert_eq!(decimal_field(&order["total_amount"]), dec!(5500));
    assert_eq!(order["status"], json!("pending"));
    assert!(order["order_number"]
        .as_str()
        .expect("order number")
        .starts_with("ORD-"));

    // stock was decremented inside the checkout transaction
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/admin/products/{}", product_id),
            None,
        )
        .await;
    let product = response_json(response).await["data"].clone();
    assert_eq!(product["stock"], json!(7));
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn unknown_promo_code_rejects_checkout() {
    let app = TestApp::new().await;

    let product = seed_product(&app, "Herbal Balm", "500.00", 5).await;
    let product_id = product["id"].as_str().expect("product id");

    let mut payload = checkout_payload(product_id, 1);
    payload["promo_code"] = json!("XYZ");

    let response = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("Invalid promo code"));

    // no order was created
    let response = app.request(Method::GET, "/api/v1/admin/orders", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], json!(0));
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn validate_endpoint_reports_eligibility_as_data() {
    let app = TestApp::new().await;

    seed_promo(
        &app,
        json!({
            "code": "FLAT300",
            "kind": "fixed",
            "value": "300",
        }),
    )
    .await;

    // fixed discount clamps to the order amount
    let response = app
        .request(
            Method::POST,
            "/api/v1/promo-codes/validate",
            Some(json!({ "code": "FLAT300", "order_amount": "200" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["valid"], json!(true));
    assert_eq!(decimal_field(&body["data"]["discount"]), dec!(200));

    // an unknown code is a 200 with valid=false, not an error status
    let response = app
        .request(
            Method::POST,
            "/api/v1/promo-codes/validate",
            Some(json!({ "code": "XYZ", "order_amount": "200" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["valid"], json!(false));
    assert_eq!(decimal_field(&body["data"]["discount"]), dec!(0));
    assert_eq!(body["data"]["reason"], json!("Invalid promo code"));
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn duplicate_checkout_suppressed_by_idempotency_key() {
    let app = TestApp::new().await;

    let product = seed_product(&app, "Herbal Tonic", "1500.00", 10).await;
    let product_id = product["id"].as_str().expect("product id");

    let mut payload = checkout_payload(product_id, 1);
    payload["idempotency_key"] = json!("checkout-abc-123");

    let first = app
        .request(Method::POST, "/api/v1/orders", Some(payload.clone()))
        .await;
    assert_eq!(first.status(), 200);
    let first_order = response_json(first).await["data"].clone();

    let second = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(second.status(), 200);
    let second_order = response_json(second).await["data"].clone();

    assert_eq!(first_order["id"], second_order["id"]);

    let response = app.request(Method::GET, "/api/v1/admin/orders", None).await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], json!(1));
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn usage_limit_blocks_further_redemptions() {
    let app = TestApp::new().await;

    let product = seed_product(&app, "Herbal Soap", "1000.00", 10).await;
    let product_id = product["id"].as_str().expect("product id");

    seed_promo(
        &app,
        json!({
            "code": "ONCE",
            "kind": "fixed",
            "value": "100",
            "usage_limit": 1,
        }),
    )
    .await;

    let mut payload = checkout_payload(product_id, 1);
    payload["promo_code"] = json!("ONCE");

    let first = app
        .request(Method::POST, "/api/v1/orders", Some(payload.clone()))
        .await;
    assert_eq!(first.status(), 200);

    let second = app.request(Method::POST, "/api/v1/orders", Some(payload)).await;
    assert_eq!(second.status(), 400);
    let body = response_json(second).await;
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("usage limit reached"));
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn insufficient_stock_rejects_checkout() {
    let app = TestApp::new().await;

    let product = seed_product(&app, "Herbal Paste", "800.00", 2).await;
    let product_id = product["id"].as_str().expect("product id");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(checkout_payload(product_id, 3)),
        )
        .await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn status_machine_enforces_transition_table() {
    let app = TestApp::new().await;

    let product = seed_product(&app, "Herbal Capsules", "3000.00", 10).await;
    let product_id = product["id"].as_str().expect("product id");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(checkout_payload(product_id, 1)),
        )
        .await;
    let order = response_json(response).await["data"].clone();
    let order_id = order["id"].as_str().expect("order id");
    let status_path = format!("/api/v1/admin/orders/{}/status", order_id);

    // pending cannot jump straight to delivered
    let response = app
        .request(
            Method::PUT,
            &status_path,
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    // pending -> paid -> shipped -> delivered is the happy path
    for status in ["paid", "shipped", "delivered"] {
        let response = app
            .request(Method::PUT, &status_path, Some(json!({ "status": status })))
            .await;
        assert_eq!(response.status(), 200, "transition to {status}");
    }

    // delivered is terminal; it cannot be cancelled or reopened
    let response = app
        .request(
            Method::PUT,
            &status_path,
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(response.status(), 400);

    // repeating the current status is accepted as a no-op
    let response = app
        .request(
            Method::PUT,
            &status_path,
            Some(json!({ "status": "delivered" })),
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
#[ignore = "requires a SQLite integration environment"]
async fn order_lookup_by_number_and_customer_aggregate() {
    let app = TestApp::new().await;

    let product = seed_product(&app, "Herbal Syrup", "1200.00", 10).await;
    let product_id = product["id"].as_str().expect("product id");

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(checkout_payload(product_id, 2)),
        )
        .await;
    let order = response_json(response).await["data"].clone();
    let order_number = order["order_number"].as_str().expect("order number");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/by-number/{}", order_number),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["id"], order["id"]);

    // the checkout maintained the customer aggregate keyed by phone
    let response = app
        .request(
            Method::GET,
            "/api/v1/admin/customers?search=0771234567",
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], json!(1));
    let customer = &body["data"]["customers"][0];
    assert_eq!(customer["total_orders"], json!(1));
    assert_eq!(decimal_field(&customer["total_spent"]), dec!(2400));
}
