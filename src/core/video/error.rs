use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Empty frame payload")]
    EmptyPayload,
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Stream is no longer writable")]
    StreamClosed,
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
