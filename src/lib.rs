//! Brume - animated volumetric height fog for WGSL materials

pub mod core;
pub mod math;
pub mod render;
pub mod atmosphere;
pub mod preview;
