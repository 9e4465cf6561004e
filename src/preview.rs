//! CPU preview of the fog on a small fallback scene.
//!
//! The scene is a grey ground plane, a dark monolith, a flat sky that fog
//! never touches and one directional light. Each surface is shaded the way
//! the standard template does (ambient plus Lambert) and then fogged from
//! the uniform block of its own program, so the image shows exactly what the
//! registered programs were told.

use glam::Vec3;
use rayon::prelude::*;

use crate::atmosphere::config::{hex_to_rgb, FogShape};
use crate::atmosphere::fog::{apply_fog, compute_fog_factor};
use crate::atmosphere::state::FogParameters;
use crate::core::{Error, Result};
use crate::math::{Aabb, Ray};
use crate::render::material::{Material, ShadowFlags, SurfaceMaterial};

/// Offset along the normal for shadow rays.
const SHADOW_BIAS: f32 = 0.01;

/// Pinhole camera looking at a target point.
#[derive(Clone, Copy, Debug)]
pub struct PreviewCamera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub far: f32,
}

impl Default for PreviewCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(75.0, 50.0, 100.0),
            target: Vec3::ZERO,
            fov_y: 60.0,
            far: 30_000.0,
        }
    }
}

impl PreviewCamera {
    /// Primary ray through the centre of pixel `(x, y)`.
    pub fn ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let forward = (self.target - self.position).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);

        let half = (self.fov_y.to_radians() * 0.5).tan();
        let aspect = width as f32 / height as f32;
        let nx = (2.0 * (x as f32 + 0.5) / width as f32 - 1.0) * aspect * half;
        let ny = (1.0 - 2.0 * (y as f32 + 0.5) / height as f32) * half;

        Ray::new(self.position, forward + right * nx + up * ny)
    }
}

/// What a ray hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Hit {
    Sky,
    Ground { point: Vec3 },
    Monolith { point: Vec3, normal: Vec3 },
}

/// The fallback scene with the materials it draws with.
#[derive(Debug)]
pub struct PreviewScene {
    pub camera: PreviewCamera,
    /// Direction towards the light
    pub light_direction: Vec3,
    pub light_intensity: f32,
    pub ambient: Vec3,
    pub sky_color: Vec3,
    /// Half the side of the square ground plane at y = 0
    pub ground_half_extent: f32,
    pub monolith_box: Aabb,
    pub ground: SurfaceMaterial,
    pub monolith: SurfaceMaterial,
}

impl Default for PreviewScene {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewScene {
    pub fn new() -> Self {
        Self {
            camera: PreviewCamera::default(),
            light_direction: Vec3::new(100.0, 200.0, 100.0).normalize(),
            light_intensity: 1.5,
            ambient: Vec3::from(hex_to_rgb(0x404040)),
            sky_color: Vec3::from(hex_to_rgb(0x8080FF)),
            ground_half_extent: 1000.0,
            monolith_box: Aabb::from_center_size(
                Vec3::new(0.0, 100.0, -150.0),
                Vec3::new(50.0, 200.0, 10.0),
            ),
            ground: SurfaceMaterial::new("ground", hex_to_rgb(0x808080)),
            monolith: SurfaceMaterial::new("monolith", hex_to_rgb(0x111111)),
        }
    }

    /// The flat `(material, flags)` list to hand to the fog registry.
    /// The sky is not in it: it never takes fog.
    pub fn meshes(&mut self) -> Vec<(&mut dyn Material, ShadowFlags)> {
        vec![
            (&mut self.ground as &mut dyn Material, ShadowFlags::new(false, true)),
            (&mut self.monolith as &mut dyn Material, ShadowFlags::BOTH),
        ]
    }

    /// Copy out everything a render needs, including each surface's
    /// current fog uniforms.
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            camera: self.camera,
            light_direction: self.light_direction,
            light_intensity: self.light_intensity,
            ambient: self.ambient,
            sky_color: self.sky_color,
            ground_half_extent: self.ground_half_extent,
            monolith_box: self.monolith_box,
            ground_albedo: Vec3::from(self.ground.albedo),
            monolith_albedo: Vec3::from(self.monolith.albedo),
            ground_receives_shadow: self.ground.shadows().receives_shadow,
            ground_fog: surface_fog(&self.ground),
            monolith_fog: surface_fog(&self.monolith),
        }
    }
}

/// Fog uniforms of a material's first program, if it was built with fog.
fn surface_fog(material: &SurfaceMaterial) -> Option<FogParameters> {
    material
        .programs()
        .first()
        .and_then(|program| program.borrow().fog().map(FogParameters::from))
}

/// Plain-data view of a [`PreviewScene`] at one instant; safe to share
/// across render threads.
#[derive(Clone, Copy, Debug)]
pub struct FrameSnapshot {
    pub camera: PreviewCamera,
    pub light_direction: Vec3,
    pub light_intensity: f32,
    pub ambient: Vec3,
    pub sky_color: Vec3,
    pub ground_half_extent: f32,
    pub monolith_box: Aabb,
    pub ground_albedo: Vec3,
    pub monolith_albedo: Vec3,
    pub ground_receives_shadow: bool,
    pub ground_fog: Option<FogParameters>,
    pub monolith_fog: Option<FogParameters>,
}

impl FrameSnapshot {
    pub fn trace(&self, ray: &Ray) -> Hit {
        let monolith = ray.hit_box(&self.monolith_box);
        let ground = ray.hit_ground(0.0, self.ground_half_extent);

        match (monolith, ground) {
            (Some(tm), Some(tg)) if tg < tm => Hit::Ground { point: ray.point(tg) },
            (Some(tm), _) if tm < self.camera.far => {
                let point = ray.point(tm);
                Hit::Monolith {
                    point,
                    normal: self.monolith_box.face_normal(point),
                }
            }
            (_, Some(tg)) if tg < self.camera.far => Hit::Ground { point: ray.point(tg) },
            _ => Hit::Sky,
        }
    }

    fn lit(&self, albedo: Vec3, normal: Vec3, shadowed: bool) -> Vec3 {
        let lambert = if shadowed {
            0.0
        } else {
            normal.dot(self.light_direction).max(0.0)
        };
        albedo * (self.ambient + Vec3::splat(self.light_intensity * lambert))
    }

    fn in_shadow(&self, point: Vec3) -> bool {
        let ray = Ray::new(point + Vec3::Y * SHADOW_BIAS, self.light_direction);
        ray.hit_box(&self.monolith_box).is_some()
    }

    /// Final linear colour of pixel `(x, y)`.
    pub fn shade_pixel(&self, x: u32, y: u32, width: u32, height: u32, shape: &FogShape) -> Vec3 {
        let ray = self.camera.ray(x, y, width, height);
        let origin = self.camera.position;

        let (surface, point, fog) = match self.trace(&ray) {
            Hit::Sky => return self.sky_color,
            Hit::Ground { point } => {
                let shadowed = self.ground_receives_shadow && self.in_shadow(point);
                (self.lit(self.ground_albedo, Vec3::Y, shadowed), point, self.ground_fog)
            }
            Hit::Monolith { point, normal } => {
                (self.lit(self.monolith_albedo, normal, false), point, self.monolith_fog)
            }
        };

        match fog {
            Some(params) => {
                let factor = compute_fog_factor(point, origin, &params, shape);
                apply_fog(surface, Vec3::from(params.color), factor)
            }
            None => surface,
        }
    }

    /// Render to tightly packed RGB8, rows in parallel.
    pub fn render_rgb8(&self, width: u32, height: u32, shape: &FogShape) -> Vec<u8> {
        let row_len = width as usize * 3;
        let mut pixels = vec![0u8; row_len * height as usize];

        pixels
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..width {
                    let c = self.shade_pixel(x, y as u32, width, height, shape);
                    let i = x as usize * 3;
                    row[i] = to_u8(c.x);
                    row[i + 1] = to_u8(c.y);
                    row[i + 2] = to_u8(c.z);
                }
            });
        pixels
    }

    pub fn render(&self, width: u32, height: u32, shape: &FogShape) -> Result<image::RgbImage> {
        if width == 0 || height == 0 {
            return Err(Error::Config(format!("invalid image size {width}x{height}")));
        }
        let pixels = self.render_rgb8(width, height, shape);
        image::RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| Error::Config("pixel buffer does not match image size".to_string()))
    }
}

#[inline]
fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}
