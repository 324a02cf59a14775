use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("label file error: {0}")]
    Labels(String),

    #[error("failed to load model: {0}")]
    Model(String),

    #[error("invalid image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("missing multipart field `image`")]
    MissingImageField,

    #[error("malformed multipart payload: {0}")]
    Multipart(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Decode(_) | Error::MissingImageField | Error::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
