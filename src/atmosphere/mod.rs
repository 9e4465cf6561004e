//! Animated height fog.
//!
//! The main entry point is [`FogSystem`], which owns the fog parameters,
//! builds material programs with the fog code and keeps every built
//! program's uniform block in step with the parameters. Call
//! [`tick`](FogSystem::tick) (or [`update`](FogSystem::update)) once per
//! frame to animate the noise.

pub mod broadcast;
pub mod config;
pub mod fog;
pub mod noise_field;
pub mod state;

// Re-exports
pub use broadcast::ParameterBroadcaster;
pub use config::{FogConfig, FogLimits, FogShape, ParamRange, SceneFog};
pub use fog::{apply_fog, compute_fog_factor};
pub use noise_field::{fbm3, gradient_noise3, FractalNoise, GradientNoise};
pub use state::{FogField, FogParameters, FogUniform, FogUniformBlock, UniformSlots};

use glam::Vec3;

use crate::core::time::FrameClock;
use crate::core::{Result, Rgb};
use crate::render::material::{Material, ProgramHandle, ShadowFlags};
use crate::render::registry::ProgramRegistry;

// ---------------------------------------------------------------------------
// FogSystem
// ---------------------------------------------------------------------------

/// Fog facade driven by the host application each frame.
pub struct FogSystem {
    config: FogConfig,
    broadcaster: ParameterBroadcaster,
    clock: FrameClock,
}

impl FogSystem {
    /// Create the system from a validated config.
    ///
    /// When the host scene already carries fog, its density and colour are
    /// adopted; a scene fog outside the configured limits is ignored with a
    /// warning and the config's initial values are kept.
    pub fn new(config: FogConfig, scene_fog: Option<&SceneFog>) -> Result<Self> {
        config.validate()?;

        let params = FogParameters {
            density: config.initial_density,
            height_factor: config.initial_height_factor,
            color: config.color,
            time: 0.0,
        };
        let mut broadcaster = ParameterBroadcaster::new(params, config.limits.clone(), config.shape);

        if let Some(scene) = scene_fog {
            if let Err(e) = broadcaster.adopt_scene_fog(scene) {
                log::warn!("scene fog not adopted: {e}");
            }
        }

        log::info!(
            "Fog system ready: density {} height factor {}",
            broadcaster.params().density,
            broadcaster.params().height_factor
        );

        Ok(Self {
            config,
            broadcaster,
            clock: FrameClock::new(),
        })
    }

    /// Advance fog time by `dt` seconds. Returns `false` if `dt` was ignored.
    pub fn update(&mut self, dt: f32) -> bool {
        self.broadcaster.advance_time(dt)
    }

    /// Measure the frame delta with the internal clock and advance by it.
    /// Returns the delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let dt = self.clock.tick();
        self.update(dt);
        dt
    }

    pub fn set_density(&mut self, density: f32) -> Result<()> {
        self.broadcaster.set_density(density)
    }

    pub fn set_height_factor(&mut self, height_factor: f32) -> Result<()> {
        self.broadcaster.set_height_factor(height_factor)
    }

    pub fn set_color(&mut self, color: Rgb) -> Result<()> {
        self.broadcaster.set_color(color)
    }

    pub fn reset_time(&mut self) {
        self.broadcaster.reset_time();
    }

    pub fn register_program(&mut self, program: &ProgramHandle) -> Result<bool> {
        self.broadcaster.register_program(program)
    }

    pub fn register_material(&mut self, material: &mut dyn Material, flags: ShadowFlags) -> usize {
        self.broadcaster.register_material(material, flags)
    }

    /// Register the flat `(material, flags)` list supplied by the scene.
    pub fn register_meshes<'a, I>(&mut self, meshes: I) -> usize
    where
        I: IntoIterator<Item = (&'a mut dyn Material, ShadowFlags)>,
    {
        let added = self.broadcaster.register_meshes(meshes);
        log::info!(
            "{added} fog program(s) built, {} registered",
            self.broadcaster.registry().len()
        );
        added
    }

    /// Fog factor for `world` seen from `origin` with the current parameters.
    pub fn fog_factor(&self, world: Vec3, origin: Vec3) -> f32 {
        compute_fog_factor(world, origin, self.broadcaster.params(), &self.config.shape)
    }

    /// Blend a shaded surface colour with the current fog.
    pub fn shade(&self, surface: Vec3, world: Vec3, origin: Vec3) -> Vec3 {
        let factor = self.fog_factor(world, origin);
        apply_fog(surface, Vec3::from(self.broadcaster.params().color), factor)
    }

    #[inline]
    pub fn params(&self) -> &FogParameters {
        self.broadcaster.params()
    }

    #[inline]
    pub fn registry(&self) -> &ProgramRegistry {
        self.broadcaster.registry()
    }

    #[inline]
    pub fn config(&self) -> &FogConfig {
        &self.config
    }

    #[inline]
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
