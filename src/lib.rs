pub mod classifier;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod preprocess;

pub use error::{Error, Result};
