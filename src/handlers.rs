use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use tracing::info;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::error::Error;
use crate::models::{PredictionResponse, TestResponse};
use crate::preprocess::preprocess;

/// Multipart field the frontend uploads the photograph under.
const IMAGE_FIELD: &str = "image";

/// Registers both endpoints under the configured prefix.
pub fn routes(prefix: &str) -> impl FnOnce(&mut web::ServiceConfig) {
    let predict_path = format!("{prefix}/predict_tea_disease");
    let test_path = format!("{prefix}/test");
    move |cfg: &mut web::ServiceConfig| {
        cfg.service(web::resource(predict_path).route(web::post().to(predict_tea_disease)))
            .service(web::resource(test_path).route(web::get().to(test)));
    }
}

/// CORS policy: one allow-listed origin, GET and POST, any header,
/// credentials supported.
pub fn cors(allowed_origin: &str) -> Cors {
    Cors::default()
        .allowed_origin(allowed_origin)
        .allowed_methods(vec!["GET", "POST"])
        .allow_any_header()
        .supports_credentials()
}

/// Predicts the tea-disease class of an uploaded leaf photograph.
pub async fn predict_tea_disease(
    classifier: web::Data<Classifier>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();

    // Buffer the `image` field fully in memory. No size limit is enforced
    // here; capping the body is left to the deployment in front of us.
    let mut image_bytes: Option<Vec<u8>> = None;
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| Error::Multipart(e.to_string()))?;
        if field.content_disposition().get_name() != Some(IMAGE_FIELD) {
            continue;
        }
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| Error::Multipart(e.to_string()))?;
            data.extend_from_slice(&chunk);
        }
        image_bytes = Some(data);
        break;
    }
    let image_bytes = image_bytes.ok_or(Error::MissingImageField)?;

    info!(%request_id, bytes = image_bytes.len(), "received prediction request");

    // Decode and inference are CPU-bound; keep them off the reactor threads.
    let classifier = classifier.clone();
    let prediction = web::block(move || {
        let tensor = preprocess(&image_bytes)?;
        classifier.predict(tensor)
    })
    .await
    .map_err(|e| Error::Inference(e.to_string()))??;

    info!(
        %request_id,
        class = %prediction.label,
        confidence = prediction.confidence,
        "prediction complete"
    );

    Ok(HttpResponse::Ok().json(PredictionResponse {
        predicted_class: prediction.label,
        confidence_score: prediction.confidence,
    }))
}

/// Liveness probe.
pub async fn test() -> HttpResponse {
    HttpResponse::Ok().json(TestResponse {
        message: "API is working".to_string(),
    })
}
