//! Error types for the brume fog subsystem

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid fog parameter {name}: {value} (allowed {min}..={max})")]
    InvalidParameter {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("invalid fog color {color:?}: channels must be finite and within 0..=1")]
    InvalidColor { color: [f32; 3] },

    #[error("shader program '{program}' has no '{hook}' hook")]
    MissingHook { program: String, hook: &'static str },

    #[error("shader program '{program}' has a malformed '{hook}' hook")]
    MalformedHook { program: String, hook: &'static str },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
