use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use storefront_api::{
    middleware::auth::{ADMIN_ROLE, USER_ROLE, issue_token},
    routes::build_app,
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "router-test-secret";

// The pool never connects; every request below is answered before the database is touched.
fn app() -> anyhow::Result<Router> {
    let pool = PgPoolOptions::new().connect_lazy("postgres://storefront@localhost:1/storefront")?;
    Ok(build_app(AppState::new(pool, SECRET)))
}

fn user_token() -> anyhow::Result<String> {
    issue_token(SECRET, Uuid::new_v4(), USER_ROLE, Duration::minutes(5))
}

async fn send(app: Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(body.to_string()))?)
}

#[tokio::test]
async fn health_route_answers_without_database() -> anyhow::Result<()> {
    let request = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn unknown_paths_get_a_json_404() -> anyhow::Result<()> {
    let request = Request::builder().uri("/api/nope").body(Body::empty())?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["path"], "/api/nope");
    Ok(())
}

#[tokio::test]
async fn order_creation_requires_a_token() -> anyhow::Result<()> {
    let request = json_request("POST", "/api/orders", None, json!({ "orderItems": [] }))?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "ValidationError");
    Ok(())
}

#[tokio::test]
async fn forged_tokens_are_rejected() -> anyhow::Result<()> {
    let forged = issue_token("other-secret", Uuid::new_v4(), USER_ROLE, Duration::minutes(5))?;
    let request = json_request("POST", "/api/orders", Some(&forged), json!({}))?;
    let (status, _) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn empty_orders_are_rejected_before_storage() -> anyhow::Result<()> {
    let token = user_token()?;
    let request = json_request(
        "POST",
        "/api/orders",
        Some(&token),
        json!({
            "orderItems": [],
            "shippingAddress": Uuid::new_v4(),
            "paymentMethod": "credit_card",
            "totalPrice": "10.00"
        }),
    )?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "NoOrderItems");
    Ok(())
}

#[tokio::test]
async fn payment_method_is_required() -> anyhow::Result<()> {
    let token = user_token()?;
    let request = json_request(
        "POST",
        "/api/orders",
        Some(&token),
        json!({
            "orderItems": [{ "product": Uuid::new_v4(), "quantity": 1 }],
            "shippingAddress": Uuid::new_v4(),
            "totalPrice": "10.00"
        }),
    )?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "ValidationError");
    Ok(())
}

#[tokio::test]
async fn regular_users_cannot_change_order_status() -> anyhow::Result<()> {
    let token = user_token()?;
    for action in ["pay", "ship", "deliver", "cancel"] {
        let uri = format!("/api/orders/{}/{action}", Uuid::new_v4());
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())?;
        let (status, body) = send(app()?, request).await?;

        assert_eq!(status, StatusCode::FORBIDDEN, "{action}");
        assert_eq!(body["data"]["code"], "AuthorizationError");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_prices_get_the_error_envelope() -> anyhow::Result<()> {
    let token = user_token()?;
    let request = json_request(
        "POST",
        "/api/orders",
        Some(&token),
        json!({
            "orderItems": [{ "product": Uuid::new_v4(), "quantity": 1 }],
            "shippingAddress": Uuid::new_v4(),
            "paymentMethod": "credit_card",
            "itemsPrice": "abc",
            "totalPrice": "10.00"
        }),
    )?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "ValidationError");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("itemsPrice")));
    Ok(())
}

#[tokio::test]
async fn non_string_product_reference_is_a_validation_error() -> anyhow::Result<()> {
    let token = user_token()?;
    let request = json_request(
        "POST",
        "/api/orders",
        Some(&token),
        json!({
            "orderItems": [{ "product": { "id": 1 } }],
            "paymentMethod": "credit_card",
            "totalPrice": "10.00"
        }),
    )?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "ValidationError");
    Ok(())
}

#[tokio::test]
async fn malformed_payment_payload_is_rejected() -> anyhow::Result<()> {
    let token = issue_token(SECRET, Uuid::new_v4(), ADMIN_ROLE, Duration::minutes(5))?;
    let uri = format!("/api/orders/{}/pay", Uuid::new_v4());
    let request = Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("{\"id\": "))?;
    let (status, body) = send(app()?, request).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "ValidationError");
    Ok(())
}
