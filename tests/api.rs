use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use ndarray::Array4;
use std::io::Cursor;

use tea_disease_api::classifier::{Classifier, Scorer};
use tea_disease_api::handlers;
use tea_disease_api::models::{ErrorResponse, PredictionResponse, TestResponse};
use tea_disease_api::Result;

const BOUNDARY: &str = "2a8ae6ad-f4ad-4d9a-a92c-6d217011fe0f";

struct StubScorer(Vec<f32>);

impl Scorer for StubScorer {
    fn scores(&self, _input: Array4<f32>) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

fn classifier(scores: Vec<f32>, labels: &[&str]) -> web::Data<Classifier> {
    web::Data::new(Classifier::new(
        Box::new(StubScorer(scores)),
        labels.iter().map(|s| s.to_string()).collect(),
    ))
}

fn leaf_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([34, 139, 34, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

fn multipart_body(field_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; \
             filename=\"leaf.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_post(uri: &str, field_name: &str, data: &[u8]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(field_name, data))
}

#[actix_web::test]
async fn valid_upload_returns_top_class_and_confidence() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(
                vec![0.05, 0.85, 0.10],
                &["algal_spot", "healthy", "red_rust"],
            ))
            .configure(handlers::routes("")),
    )
    .await;

    let req = multipart_post("/predict_tea_disease", "image", &leaf_png()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: PredictionResponse = test::read_body_json(resp).await;
    assert_eq!(body.predicted_class, "healthy");
    assert!((body.confidence_score - 0.85).abs() < 1e-6);
}

#[actix_web::test]
async fn tie_goes_to_the_lowest_index() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(
                vec![0.1, 0.45, 0.45],
                &["algal_spot", "healthy", "red_rust"],
            ))
            .configure(handlers::routes("")),
    )
    .await;

    let req = multipart_post("/predict_tea_disease", "image", &leaf_png()).to_request();
    let resp = test::call_service(&app, req).await;
    let body: PredictionResponse = test::read_body_json(resp).await;
    assert_eq!(body.predicted_class, "healthy");
}

#[actix_web::test]
async fn non_image_bytes_are_rejected_with_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(vec![1.0], &["healthy"]))
            .configure(handlers::routes("")),
    )
    .await;

    let req = multipart_post("/predict_tea_disease", "image", b"\x00\x01garbage\x02").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.error.contains("invalid image"));
}

#[actix_web::test]
async fn missing_image_field_is_a_validation_error() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(vec![1.0], &["healthy"]))
            .configure(handlers::routes("")),
    )
    .await;

    let req = multipart_post("/predict_tea_disease", "file", &leaf_png()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert!(body.error.contains("image"));
}

#[actix_web::test]
async fn score_label_mismatch_is_a_server_error() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(
                vec![0.5, 0.5],
                &["algal_spot", "healthy", "red_rust"],
            ))
            .configure(handlers::routes("")),
    )
    .await;

    let req = multipart_post("/predict_tea_disease", "image", &leaf_png()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn test_endpoint_reports_api_is_working() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(vec![1.0], &["healthy"]))
            .configure(handlers::routes("")),
    )
    .await;

    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: TestResponse = test::read_body_json(resp).await;
    assert_eq!(body.message, "API is working");
}

#[actix_web::test]
async fn routes_honor_the_configured_prefix() {
    let app = test::init_service(
        App::new()
            .app_data(classifier(vec![1.0], &["healthy"]))
            .configure(handlers::routes("/api")),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // the unprefixed path must not exist
    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn allow_listed_origin_gets_cors_headers() {
    let origin = "http://localhost:3000";
    let app = test::init_service(
        App::new()
            .wrap(handlers::cors(origin))
            .app_data(classifier(vec![1.0], &["healthy"]))
            .configure(handlers::routes("")),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/test")
        .insert_header((header::ORIGIN, origin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap()),
        Some(origin)
    );
}
