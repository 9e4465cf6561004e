//! Simplex gradient noise and fractal (FBM) summation.
//!
//! Gradients are hashed arithmetically with the `mod289` permutation
//! polynomial instead of a lookup table, so the CPU functions here and the
//! WGSL in `shaders/fog_noise.wgsl` compute the same field from the same
//! single-precision operations.

use glam::{Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};
use noise::NoiseFn;

/// Number of octaves summed by [`fbm3`].
pub const FBM_OCTAVES: u32 = 6;

/// Sum of the six FBM octave amplitudes (0.5 + 0.25 + ... + 1/64), the
/// bound on `|fbm3|`.
pub const FBM_AMPLITUDE_SUM: f32 = 0.984375;

const SKEW: f32 = 1.0 / 3.0;
const UNSKEW: f32 = 1.0 / 6.0;

#[inline]
fn mod289_3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn mod289_4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn permute(x: Vec4) -> Vec4 {
    mod289_4((x * 34.0 + Vec4::ONE) * x)
}

#[inline]
fn taylor_inv_sqrt(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - r * 0.853_734_7
}

/// GLSL `step(edge, x)`: 1 where `x >= edge`.
#[inline]
fn step3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::select(x.cmpge(edge), Vec3::ONE, Vec3::ZERO)
}

#[inline]
fn step4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::select(x.cmpge(edge), Vec4::ONE, Vec4::ZERO)
}

/// 3D simplex noise. Deterministic, continuous, roughly in `[-1, 1]`.
pub fn gradient_noise3(v: Vec3) -> f32 {
    // First corner
    let i = (v + Vec3::splat(v.dot(Vec3::splat(SKEW)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(UNSKEW)));

    // Other corners
    let g = step3(x0.yzx(), x0);
    let l = Vec3::ONE - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + Vec3::splat(UNSKEW);
    let x2 = x0 - i2 + Vec3::splat(SKEW);
    let x3 = x0 - Vec3::splat(0.5);

    // Permutations
    let i = mod289_3(i);
    let p = permute(
        permute(
            permute(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + Vec4::splat(i.y)
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients on a 7x7 grid folded onto an octahedron. `p` holds whole
    // numbers below 289, so dividing (rather than multiplying by 1/49) keeps
    // the floor exact.
    let j = p - (p / 49.0).floor() * 49.0;
    let gx = (j / 7.0).floor();
    let gy = (j - gx * 7.0).floor();

    let step = 2.0 / 7.0;
    let offset = 0.5 / 7.0 - 1.0;
    let x = gx * step + Vec4::splat(offset);
    let y = gy * step + Vec4::splat(offset);
    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);
    let s0 = b0.floor() * 2.0 + Vec4::ONE;
    let s1 = b1.floor() * 2.0 + Vec4::ONE;
    let sh = -step4(h, Vec4::ZERO);

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    // Corner falloff (0.5 - r^2)^4
    let m = (Vec4::splat(0.5) - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
        .max(Vec4::ZERO);
    let m = m * m;
    105.0 * (m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

/// Six octaves of [`gradient_noise3`]: amplitude 0.5 halving, frequency
/// doubling. Not renormalized; bounded by [`FBM_AMPLITUDE_SUM`].
pub fn fbm3(v: Vec3) -> f32 {
    let mut p = v;
    let mut amplitude = 0.5;
    let mut value = 0.0;
    for _ in 0..FBM_OCTAVES {
        value += amplitude * gradient_noise3(p);
        p *= 2.0;
        amplitude *= 0.5;
    }
    value
}

/// [`gradient_noise3`] as a `noise` crate source.
#[derive(Clone, Copy, Debug, Default)]
pub struct GradientNoise;

impl NoiseFn<f64, 3> for GradientNoise {
    fn get(&self, point: [f64; 3]) -> f64 {
        gradient_noise3(Vec3::new(point[0] as f32, point[1] as f32, point[2] as f32)) as f64
    }
}

/// [`fbm3`] as a `noise` crate source.
#[derive(Clone, Copy, Debug, Default)]
pub struct FractalNoise;

impl NoiseFn<f64, 3> for FractalNoise {
    fn get(&self, point: [f64; 3]) -> f64 {
        fbm3(Vec3::new(point[0] as f32, point[1] as f32, point[2] as f32)) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noise::ScaleBias;

    /// Deterministic scatter of sample points over a wide range.
    fn sample_points(count: usize, extent: f32) -> Vec<Vec3> {
        let mut state = 0x2545_f491_u32;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as f32 / u32::MAX as f32) * 2.0 - 1.0
        };
        (0..count)
            .map(|_| Vec3::new(next(), next(), next()) * extent)
            .collect()
    }

    #[test]
    fn test_noise_deterministic() {
        for p in sample_points(256, 100.0) {
            assert_eq!(gradient_noise3(p), gradient_noise3(p));
            assert_eq!(fbm3(p), fbm3(p));
        }
    }

    #[test]
    fn test_noise_range() {
        for p in sample_points(20_000, 60.0) {
            let n = gradient_noise3(p);
            assert!(n.is_finite());
            assert!(n.abs() <= 1.0, "noise({p:?}) = {n}");
        }
    }

    #[test]
    fn test_fbm_bounded_by_amplitude_sum() {
        for p in sample_points(4_000, 60.0) {
            let f = fbm3(p);
            assert!(f.abs() <= FBM_AMPLITUDE_SUM, "fbm({p:?}) = {f}");
        }
    }

    #[test]
    fn test_amplitude_sum_constant() {
        let sum: f32 = (0..FBM_OCTAVES).map(|i| 0.5_f32.powi(i as i32 + 1)).sum();
        assert!((sum - FBM_AMPLITUDE_SUM).abs() < 1e-7);
    }

    #[test]
    fn test_noise_not_constant() {
        let values: Vec<f32> = sample_points(64, 20.0).into_iter().map(gradient_noise3).collect();
        let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(max - min > 0.5, "noise range too narrow: {min}..{max}");
    }

    #[test]
    fn test_noise_continuous() {
        for p in sample_points(500, 30.0) {
            let a = gradient_noise3(p);
            let b = gradient_noise3(p + Vec3::splat(1e-3));
            assert!((a - b).abs() < 0.05, "jump at {p:?}: {a} vs {b}");
        }
    }

    #[test]
    fn test_noise_fn_matches_free_function() {
        let p = Vec3::new(1.25, -3.5, 7.75);
        let via_trait = GradientNoise.get([1.25, -3.5, 7.75]);
        assert_eq!(via_trait as f32, gradient_noise3(p));
        assert_eq!(FractalNoise.get([1.25, -3.5, 7.75]) as f32, fbm3(p));
    }

    #[test]
    fn test_scale_bias_remaps_to_unit_range() {
        let remapped: ScaleBias<f64, FractalNoise, 3> =
            ScaleBias::new(FractalNoise).set_scale(0.5).set_bias(0.5);
        for p in sample_points(200, 40.0) {
            let v = remapped.get([p.x as f64, p.y as f64, p.z as f64]);
            assert!((0.0..=1.0).contains(&v), "remapped = {v}");
        }
    }
}
