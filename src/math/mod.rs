//! Ray casting primitives for the preview scene

pub mod aabb;
pub mod ray;

pub use aabb::Aabb;
pub use ray::Ray;
