//! GPU glue for fog programs: shader modules and the fog uniform buffer.
//!
//! Host call order for one program:
//!
//! 1. Build it with fog through [`FogSystem::register_meshes`] (or
//!    `register_program`) so its source is composed and it owns a block.
//! 2. [`ShaderProgram::create_module`] on the composed source, then build the
//!    pipeline with [`FogUniformBuffer::create_bind_group_layout`] at
//!    [`FOG_BIND_GROUP`].
//! 3. [`FogUniformBuffer::new`] once per program.
//! 4. Each frame, after `FogSystem::tick` and any setters, call
//!    [`FogUniformBuffer::sync_program`]; only changed blocks are uploaded.
//! 5. `set_bind_group(FOG_BIND_GROUP, buffer.bind_group(), &[])` before drawing.
//!
//! [`FogSystem::register_meshes`]: crate::atmosphere::FogSystem::register_meshes
//! [`FOG_BIND_GROUP`]: crate::render::shader::FOG_BIND_GROUP

use crate::atmosphere::state::{FogUniform, FogUniformBlock};
use crate::render::material::ShaderProgram;

/// Byte size of the fog uniform binding (WGSL `FogUniforms`)
pub const FOG_UNIFORM_SIZE: u64 = std::mem::size_of::<FogUniform>() as u64;

impl ShaderProgram {
    /// Compile the program's current source (composed if built).
    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.label()),
            source: wgpu::ShaderSource::Wgsl(self.source().into()),
        })
    }
}

/// GPU buffer for one program's fog uniform block, bound at
/// [`FOG_BIND_GROUP`](crate::render::shader::FOG_BIND_GROUP).
pub struct FogUniformBuffer {
    /// Uniform buffer
    buffer: wgpu::Buffer,
    /// Bind group layout
    bind_group_layout: wgpu::BindGroupLayout,
    /// Bind group
    bind_group: wgpu::BindGroup,
}

impl FogUniformBuffer {
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_fog_uniform")),
            size: FOG_UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = Self::create_bind_group_layout(device);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}_fog_bind_group")),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            buffer,
            bind_group_layout,
            bind_group,
        }
    }

    /// Layout of the fog bind group, shared by every composed program.
    pub fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fog_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(FOG_UNIFORM_SIZE),
                },
                count: None,
            }],
        })
    }

    /// Upload `block` if it changed since the last upload. Returns whether
    /// anything was written.
    pub fn sync(&self, queue: &wgpu::Queue, block: &mut FogUniformBlock) -> bool {
        if !block.take_dirty() {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&block.uniform()));
        true
    }

    /// Upload the fog block of `program`, if it has one and it changed.
    pub fn sync_program(&self, queue: &wgpu::Queue, program: &mut ShaderProgram) -> bool {
        match program.fog_mut() {
            Some(block) => self.sync(queue, block),
            None => false,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Get the raw buffer
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::FOG_BIND_GROUP;

    #[test]
    fn test_uniform_binding_size() {
        assert_eq!(FOG_UNIFORM_SIZE, 32);
        assert_eq!(FOG_UNIFORM_SIZE % 16, 0);
        assert!(wgpu::BufferSize::new(FOG_UNIFORM_SIZE).is_some());
    }

    #[test]
    fn test_composed_program_binds_fog_group() {
        let program = ShaderProgram::standard("bound").into_handle();
        let mut registry = crate::render::registry::ProgramRegistry::new();
        registry
            .register_program(&program, &Default::default(), &Default::default())
            .unwrap();
        let source = program.borrow().source().to_string();
        assert!(source.contains(&format!("@group({FOG_BIND_GROUP}) @binding(0) var<uniform> fog: FogUniforms;")));

        let mut program = program.borrow_mut();
        let block = program.fog_mut().unwrap();
        assert!(block.take_dirty());
        assert!(!block.take_dirty());
    }
}
