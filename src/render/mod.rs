//! Shader composition, materials and GPU interfaces

pub mod gpu;
pub mod material;
pub mod registry;
pub mod shader;

pub use gpu::{FogUniformBuffer, FOG_UNIFORM_SIZE};
pub use material::{Material, ProgramHandle, ProgramId, ShaderProgram, ShadowFlags, SurfaceMaterial};
pub use registry::{allocate_uniform_block, ProgramRegistration, ProgramRegistry};
pub use shader::{build_program_source, is_composed, FogHook, FOG_BIND_GROUP, FOG_INJECTED_MARKER, STANDARD_SURFACE_WGSL};
