//! Height-attenuated exponential fog with noise-perturbed depth.
//!
//! CPU reference of the fog evaluated per pixel by every patched program
//! (see `shaders/fog_apply.wgsl`).

use glam::Vec3;

use crate::atmosphere::config::FogShape;
use crate::atmosphere::noise_field::fbm3;
use crate::atmosphere::state::FogParameters;

/// Below this `|direction.y|` the height integral uses its horizontal limit.
pub const SINGULAR_EPSILON: f32 = 1e-7;

#[inline]
fn saturate(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Domain-warped FBM sample in `[0, 1]` for a world position at fog time `time`.
pub fn fog_noise_sample(world_pos: Vec3, time: f32, shape: &FogShape) -> f32 {
    let coord = world_pos * shape.noise_scale + Vec3::new(0.0, 0.0, time * shape.scroll_speed);
    let warped = fbm3(coord + Vec3::splat(fbm3(coord)));
    warped * 0.5 + 0.5
}

/// Scale `depth` by the noise sample near the viewer, fading the noise out
/// between one and two reference distances, then apply the thickening curve.
pub fn perturb_depth(depth: f32, noise: f32, shape: &FogShape) -> f32 {
    let reference = shape.reference_distance;
    let fade = saturate((depth - reference) / reference);
    let mut depth = depth * mix(noise, 1.0, fade);
    if shape.square_depth {
        depth *= depth;
    }
    depth
}

/// Exponential height fog integrated along a ray leaving `origin_y` with
/// vertical direction component `dir_y`, saturated to `[0, 1]`.
///
/// `1 - exp(-x)` is evaluated through `exp_m1` so shallow rays keep their
/// precision, and a horizontal ray takes the analytic limit
/// `height_factor * exp(-origin_y * density) * depth * density`.
pub fn height_fog(origin_y: f32, dir_y: f32, depth: f32, density: f32, height_factor: f32) -> f32 {
    if density <= 0.0 || height_factor <= 0.0 || depth <= 0.0 {
        return 0.0;
    }
    let attenuation = height_factor * (-origin_y * density).exp();
    if attenuation <= 0.0 {
        return 0.0;
    }

    let factor = if dir_y.abs() < SINGULAR_EPSILON {
        attenuation * depth * density
    } else {
        let optical = depth * dir_y * density;
        attenuation * -(-optical).exp_m1() / dir_y
    };

    if factor.is_nan() { 1.0 } else { saturate(factor) }
}

/// Fog blend factor in `[0, 1]` for `world_pos` seen from `origin_pos`.
pub fn compute_fog_factor(
    world_pos: Vec3,
    origin_pos: Vec3,
    params: &FogParameters,
    shape: &FogShape,
) -> f32 {
    if params.density <= 0.0 || params.height_factor <= 0.0 {
        return 0.0;
    }

    let offset = world_pos - origin_pos;
    let depth = offset.length();
    if !(depth > 0.0 && depth.is_finite()) {
        return 0.0;
    }
    let direction = offset / depth;

    let noise = fog_noise_sample(world_pos, params.time as f32, shape);
    let depth = perturb_depth(depth, noise, shape);

    height_fog(origin_pos.y, direction.y, depth, params.density, params.height_factor)
}

/// Blend `surface` toward `fog_color` by `factor`.
#[inline]
pub fn apply_fog(surface: Vec3, fog_color: Vec3, factor: f32) -> Vec3 {
    let t = saturate(factor);
    surface * (1.0 - t) + fog_color * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(density: f32, height_factor: f32) -> FogParameters {
        FogParameters {
            density,
            height_factor,
            color: [0.87, 0.91, 0.95],
            time: 0.0,
        }
    }

    #[test]
    fn test_zero_density_is_clear() {
        let shape = FogShape::default();
        let p = params(0.0, 0.05);
        for (world, time) in [
            (Vec3::new(100.0, 0.0, -300.0), 0.0),
            (Vec3::new(-9000.0, 20.0, 12000.0), 55.0),
            (Vec3::new(0.0, -50.0, 1.0), 1e4),
        ] {
            let p = FogParameters { time, ..p };
            assert_eq!(compute_fog_factor(world, Vec3::new(75.0, 50.0, 100.0), &p, &shape), 0.0);
        }
    }

    #[test]
    fn test_zero_height_factor_is_clear() {
        let shape = FogShape::default();
        let p = params(0.001, 0.0);
        let f = compute_fog_factor(Vec3::new(4000.0, 0.0, 4000.0), Vec3::ZERO, &p, &shape);
        assert_eq!(f, 0.0);
    }

    #[test]
    fn test_coincident_points_are_clear() {
        let shape = FogShape::default();
        let p = params(0.001, 0.05);
        let at = Vec3::new(3.0, 4.0, 5.0);
        assert_eq!(compute_fog_factor(at, at, &p, &shape), 0.0);
    }

    #[test]
    fn test_horizontal_limit_matches_general_formula() {
        for (origin_y, depth, density, hf) in [
            (0.0, 100.0, 0.00005, 0.05),
            (50.0, 2.5e7, 0.00005, 0.05),
            (-20.0, 400.0, 0.002, 0.5),
        ] {
            let limit = height_fog(origin_y, 0.0, depth, density, hf);
            let near = height_fog(origin_y, 1e-6, depth, density, hf);
            let near_neg = height_fog(origin_y, -1e-6, depth, density, hf);
            assert!((limit - near).abs() < 1e-4, "limit {limit} vs general {near}");
            assert!((limit - near_neg).abs() < 1e-4, "limit {limit} vs general {near_neg}");
        }
    }

    #[test]
    fn test_horizontal_ray_is_finite() {
        let shape = FogShape::default();
        let p = params(0.0003, 0.2);
        let origin = Vec3::new(0.0, 10.0, 0.0);
        let f = compute_fog_factor(Vec3::new(800.0, 10.0, -600.0), origin, &p, &shape);
        assert!(f.is_finite());
        assert!((0.0..=1.0).contains(&f));
    }

    #[test]
    fn test_steep_downward_ray_saturates_without_nan() {
        let f = height_fog(0.0, -1.0, 1e12, 0.002, 0.5);
        assert_eq!(f, 1.0);
    }

    #[test]
    fn test_upward_reference_scenario() {
        let shape = FogShape::default();
        let p = params(0.00005, 0.05);
        let f = compute_fog_factor(Vec3::new(0.0, 10_000.0, 0.0), Vec3::ZERO, &p, &shape);
        assert!((0.0..=1.0).contains(&f));
        assert!(f > 0.0);
    }

    #[test]
    fn test_monotonic_in_depth() {
        let mut last = 0.0;
        for step in 0..200 {
            let depth = step as f32 * 50.0;
            let f = height_fog(0.0, 1.0, depth * depth, 0.00005, 0.05);
            assert!(f >= last, "fog decreased at depth {depth}: {f} < {last}");
            assert!((0.0..=1.0).contains(&f));
            last = f;
        }
    }

    #[test]
    fn test_monotonic_in_depth_past_noise_fade() {
        let shape = FogShape::default();
        let p = params(0.00005, 0.05);
        let mut last = 0.0;
        for step in 0..50 {
            let depth = 10_000.0 + step as f32 * 500.0;
            let f = compute_fog_factor(Vec3::new(0.0, depth, 0.0), Vec3::ZERO, &p, &shape);
            assert!(f >= last, "fog decreased at depth {depth}: {f} < {last}");
            last = f;
        }
    }

    #[test]
    fn test_higher_origin_thins_fog() {
        let low = height_fog(0.0, 0.3, 1e6, 0.0005, 0.3);
        let high = height_fog(2000.0, 0.3, 1e6, 0.0005, 0.3);
        assert!(high < low);
    }

    #[test]
    fn test_noise_fades_beyond_two_reference_distances() {
        let shape = FogShape::default();
        assert_eq!(perturb_depth(12_000.0, 0.1, &shape), 12_000.0 * 12_000.0);
        assert_eq!(perturb_depth(100.0, 0.5, &shape), 50.0 * 50.0);
    }

    #[test]
    fn test_unsquared_shape() {
        let shape = FogShape {
            square_depth: false,
            ..Default::default()
        };
        assert_eq!(perturb_depth(100.0, 0.5, &shape), 50.0);
    }

    #[test]
    fn test_noise_sample_scrolls_with_time() {
        let shape = FogShape::default();
        let world = Vec3::new(1200.0, 3.0, -800.0);
        let a = fog_noise_sample(world, 0.0, &shape);
        let b = fog_noise_sample(world, 400.0, &shape);
        assert!((0.0..=1.0).contains(&a));
        assert!((0.0..=1.0).contains(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_apply_fog_endpoints() {
        let surface = Vec3::new(0.2, 0.3, 0.4);
        let fog = Vec3::new(0.9, 0.9, 1.0);
        assert_eq!(apply_fog(surface, fog, 0.0), surface);
        assert_eq!(apply_fog(surface, fog, 1.0), fog);
        assert_eq!(apply_fog(surface, fog, 7.0), fog);
    }
}
