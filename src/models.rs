use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_class: String,
    pub confidence_score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
