//! Single source of truth for the fog parameters.
//!
//! Every accepted change is pushed into the uniform block of every live
//! registered program before the setter returns, so all programs always
//! agree with [`ParameterBroadcaster::params`].

use crate::atmosphere::config::{check_color, FogLimits, FogShape, SceneFog};
use crate::atmosphere::state::{FogField, FogParameters};
use crate::core::{Result, Rgb};
use crate::render::material::{Material, ProgramHandle, ShadowFlags};
use crate::render::registry::ProgramRegistry;

#[derive(Debug)]
pub struct ParameterBroadcaster {
    params: FogParameters,
    limits: FogLimits,
    shape: FogShape,
    registry: ProgramRegistry,
}

impl ParameterBroadcaster {
    pub fn new(params: FogParameters, limits: FogLimits, shape: FogShape) -> Self {
        Self {
            params,
            limits,
            shape,
            registry: ProgramRegistry::new(),
        }
    }

    pub fn params(&self) -> &FogParameters {
        &self.params
    }

    pub fn limits(&self) -> &FogLimits {
        &self.limits
    }

    pub fn shape(&self) -> &FogShape {
        &self.shape
    }

    pub fn registry(&self) -> &ProgramRegistry {
        &self.registry
    }

    pub fn set_density(&mut self, density: f32) -> Result<()> {
        self.limits.density.check("density", density)?;
        self.params.density = density;
        self.broadcast(FogField::Density);
        Ok(())
    }

    pub fn set_height_factor(&mut self, height_factor: f32) -> Result<()> {
        self.limits.height_factor.check("height_factor", height_factor)?;
        self.params.height_factor = height_factor;
        self.broadcast(FogField::HeightFactor);
        Ok(())
    }

    pub fn set_color(&mut self, color: Rgb) -> Result<()> {
        check_color(color)?;
        self.params.color = color;
        self.broadcast(FogField::Color);
        Ok(())
    }

    /// Advance fog time by `dt` seconds.
    ///
    /// Negative, zero and non-finite deltas are ignored and `false` is
    /// returned; time never runs backwards.
    pub fn advance_time(&mut self, dt: f32) -> bool {
        if !(dt.is_finite() && dt > 0.0) {
            if dt != 0.0 {
                log::debug!("ignoring frame delta {dt}");
            }
            return false;
        }
        self.params.time += f64::from(dt);
        self.broadcast(FogField::Time);
        true
    }

    /// Restart the noise animation from zero.
    pub fn reset_time(&mut self) {
        self.params.time = 0.0;
        self.broadcast(FogField::Time);
    }

    /// Take over density and colour from the host scene's own fog.
    pub fn adopt_scene_fog(&mut self, scene: &SceneFog) -> Result<()> {
        self.limits.density.check("density", scene.density)?;
        check_color(scene.color)?;
        self.params.density = scene.density;
        self.params.color = scene.color;
        self.broadcast(FogField::Density);
        self.broadcast(FogField::Color);
        log::info!(
            "adopted scene fog: density {} color {:?}",
            scene.density,
            scene.color
        );
        Ok(())
    }

    /// Build `program` with fog, seeded from the current parameters.
    pub fn register_program(&mut self, program: &ProgramHandle) -> Result<bool> {
        self.registry.register_program(program, &self.params, &self.shape)
    }

    /// Build every program of `material` with fog. See
    /// [`ProgramRegistry::register_material`].
    pub fn register_material(&mut self, material: &mut dyn Material, flags: ShadowFlags) -> usize {
        self.registry
            .register_material(material, flags, &self.params, &self.shape)
    }

    pub fn register_meshes<'a, I>(&mut self, meshes: I) -> usize
    where
        I: IntoIterator<Item = (&'a mut dyn Material, ShadowFlags)>,
    {
        self.registry.register_meshes(meshes, &self.params, &self.shape)
    }

    fn broadcast(&mut self, field: FogField) {
        let reached = self.registry.broadcast(&[field], &self.params);
        log::trace!("broadcast fog.{} to {reached} program(s)", field.wgsl_name());
    }
}

impl Default for ParameterBroadcaster {
    fn default() -> Self {
        Self::new(FogParameters::default(), FogLimits::default(), FogShape::default())
    }
}
