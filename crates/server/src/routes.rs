use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::Config;
use crate::receipts;
use crate::state::AppState;

pub async fn health_check() -> &'static str {
    "OK"
}

pub fn router(state: AppState, config: &Config) -> Router {
    let receipt_routes = Router::new()
        .route("/create", post(receipts::create_receipt))
        .route("/list", get(receipts::list_receipts))
        .route("/details", get(receipts::receipt_details))
        .route(
            "/delete",
            post(receipts::delete_receipt).delete(receipts::delete_receipt),
        )
        .route("/items", get(receipts::receipt_items))
        .route("/summary", get(receipts::spend_summary))
        .route("/mostBought", get(receipts::most_bought));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/receipts", receipt_routes)
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(RequestBodyLimitLayer::new(config.body_limit))
        .layer(cors_layer(config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let Some(origin) = origin else {
        return CorsLayer::new();
    };
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
        Err(e) => {
            tracing::warn!(origin, error = %e, "ignoring invalid CORS origin");
            CorsLayer::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use basket_ocr::{MockRecognizer, OcrBackend, ReceiptParser, ReceiptPipeline, UnavailableRecognizer};
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use std::path::PathBuf;
    use tower::ServiceExt;

    const WALMART: &str =
        "WALMART SUPERCENTRE\nBananas 1.50\n(2) Apples 3.00\nSubtotal 4.50\nTotal 4.50";

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".into(),
            port: 0,
            db_path: PathBuf::from("unused.db"),
            body_limit: 10 * 1024 * 1024,
            ocr_lang: "eng".into(),
            tessdata: None,
            vocabulary_path: None,
            cors_origin: None,
        }
    }

    async fn test_app(backend: Box<dyn OcrBackend>) -> (tempfile::TempDir, AppState, Router) {
        test_app_with(backend, &test_config()).await
    }

    async fn test_app_with(
        backend: Box<dyn OcrBackend>,
        config: &Config,
    ) -> (tempfile::TempDir, AppState, Router) {
        let dir = tempfile::tempdir().unwrap();
        let db = basket_storage::create_db(&dir.path().join("test.db")).await.unwrap();
        let state = AppState::new(db, ReceiptPipeline::new(backend, ReceiptParser::default()));
        let app = router(state.clone(), config);
        (dir, state, app)
    }

    fn receipt_image_base64() -> String {
        let img: GrayImage = ImageBuffer::from_fn(8, 8, |x, y| Luma([if (x + y) % 2 == 0 { 20 } else { 235 }]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", BASE64.encode(buf))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create(app: &Router, user: &str) -> i64 {
        let (status, body) = send(
            app,
            post_json("/api/receipts/create", json!({ "imageBase64": receipt_image_base64(), "userId": user })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["receiptId"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(""))).await;
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("OK".into()));
    }

    #[tokio::test]
    async fn create_stores_parsed_receipt() {
        let (_dir, state, app) = test_app(Box::new(MockRecognizer::new(WALMART))).await;

        let (status, body) = send(
            &app,
            post_json("/api/receipts/create", json!({ "imageBase64": receipt_image_base64(), "userId": "u1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["items"], json!(2));

        let id = basket_core::ReceiptId(body["receiptId"].as_i64().unwrap());
        let stored = basket_storage::get_receipt_by_id(&state.db, id).await.unwrap().unwrap();
        assert_eq!(stored.store_name, "WALMART SUPERCENTRE");
        assert_eq!(stored.raw_text, WALMART);
    }

    #[tokio::test]
    async fn create_requires_image_and_user() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(WALMART))).await;
        let (status, body) = send(&app, post_json("/api/receipts/create", json!({ "userId": "u1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing data");

        let (status, _) = send(
            &app,
            post_json("/api/receipts/create", json!({ "imageBase64": receipt_image_base64(), "userId": " " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_undecodable_image() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(WALMART))).await;
        let (status, body) = send(
            &app,
            post_json("/api/receipts/create", json!({ "imageBase64": "aGVsbG8=", "userId": "u1" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid image");
    }

    #[tokio::test]
    async fn create_survives_oversized_prices() {
        let text = "Gold 50000000000000000000000000000.00\nPlatinum 50000000000000000000000000000.00\nBread 2.50";
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(text))).await;
        let id = create(&app, "u1").await;

        let (status, body) = send(&app, get(&format!("/api/receipts/details?id={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["receipt"]["total"], json!(2.5));
    }

    #[tokio::test]
    async fn create_reports_ocr_failure() {
        let (_dir, state, app) = test_app(Box::new(UnavailableRecognizer)).await;
        let (status, body) = send(
            &app,
            post_json("/api/receipts/create", json!({ "imageBase64": receipt_image_base64(), "userId": "u1" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "OCR failed");
        let user = basket_core::UserId::new("u1");
        assert!(basket_storage::list_receipts(&state.db, &user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_details_and_items() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(WALMART))).await;
        let id = create(&app, "u1").await;

        let (status, body) = send(&app, get("/api/receipts/list?userId=u1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["receipts"].as_array().unwrap().len(), 1);
        assert_eq!(body["receipts"][0]["id"], json!(id));

        let (status, body) = send(&app, get(&format!("/api/receipts/details?id={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["receipt"]["storeName"], "WALMART SUPERCENTRE");
        assert_eq!(body["receipt"]["total"], json!(4.5));
        assert_eq!(body["items"][1]["name"], "Apples");
        assert_eq!(body["items"][1]["qty"], json!(2));
        assert_eq!(body["items"][1]["unitPrice"], json!(1.5));

        let (status, body) = send(&app, get(&format!("/api/receipts/items?receiptId={id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn details_errors() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(""))).await;
        let (status, body) = send(&app, get("/api/receipts/details?id=404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Receipt not found");

        let (status, _) = send(&app, get("/api/receipts/details")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, get("/api/receipts/details?id=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid receipt id");
    }

    #[tokio::test]
    async fn delete_via_post_and_delete() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(WALMART))).await;
        let first = create(&app, "u1").await;
        let second = create(&app, "u1").await;

        let (status, body) = send(
            &app,
            Request::post(format!("/api/receipts/delete?id={first}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "removed": 1, "removedItems": 2 }));

        let (status, body) = send(
            &app,
            Request::delete(format!("/api/receipts/delete?id={second}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], json!(1));

        let (_, body) = send(&app, get("/api/receipts/list?userId=u1")).await;
        assert!(body["receipts"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn summary_and_most_bought() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(WALMART))).await;

        let (status, body) = send(&app, get("/api/receipts/summary?userId=u1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalSpent"], json!(0.0));

        create(&app, "u1").await;
        create(&app, "u1").await;

        let (_, body) = send(&app, get("/api/receipts/summary?userId=u1")).await;
        assert_eq!(body["totalSpent"], json!(9.0));

        let (status, body) = send(&app, get("/api/receipts/mostBought?userId=u1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0], json!({ "name": "Apples", "timesBought": 4, "totalSpent": 6.0 }));
        assert_eq!(body[1]["name"], "Bananas");

        let (status, _) = send(&app, get("/api/receipts/mostBought")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    fn preflight(uri: &str, origin: &str) -> Request<Body> {
        Request::options(uri)
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    }

    async fn allowed_origin(app: &Router, req: Request<Body>) -> Option<String> {
        let resp = app.clone().oneshot(req).await.unwrap();
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let config = Config {
            cors_origin: Some("https://basket.example".into()),
            ..test_config()
        };
        let (_dir, _state, app) = test_app_with(Box::new(MockRecognizer::new("")), &config).await;

        let origin = allowed_origin(&app, preflight("/api/receipts/list", "https://basket.example")).await;
        assert_eq!(origin.as_deref(), Some("https://basket.example"));
    }

    #[tokio::test]
    async fn cors_is_same_origin_when_unset_or_invalid() {
        let (_dir, _state, app) = test_app(Box::new(MockRecognizer::new(""))).await;
        assert_eq!(allowed_origin(&app, preflight("/api/receipts/list", "https://elsewhere.example")).await, None);

        let config = Config {
            cors_origin: Some("bad\norigin".into()),
            ..test_config()
        };
        let (_dir, _state, app) = test_app_with(Box::new(MockRecognizer::new("")), &config).await;
        let req = Request::get("/health")
            .header(header::ORIGIN, "https://elsewhere.example")
            .body(Body::empty())
            .unwrap();
        assert_eq!(allowed_origin(&app, req).await, None);
    }
}
