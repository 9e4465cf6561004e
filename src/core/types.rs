//! Core type aliases and re-exports

pub use glam::{Vec3, Vec4};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Linear RGB triple as uploaded to the GPU
pub type Rgb = [f32; 3];
