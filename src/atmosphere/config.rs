//! Fog configuration: defaults, UI limits and the empirical shape constants.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result, Rgb};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Full fog configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    /// Density used when the scene has no fog of its own.
    pub initial_density: f32,
    /// Initial height factor.
    pub initial_height_factor: f32,
    /// Fog tint (linear RGB) used when the scene has no fog of its own.
    pub color: Rgb,
    /// Accepted ranges for the user-facing controls.
    pub limits: FogLimits,
    /// Empirical constants of the fog model.
    pub shape: FogShape,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            initial_density: 0.00005,
            initial_height_factor: 0.05,
            color: hex_to_rgb(0xDFE9F3),
            limits: FogLimits::default(),
            shape: FogShape::default(),
        }
    }
}

impl FogConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: FogConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Loaded fog config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the initial values sit inside the limits and that the
    /// shape constants are usable.
    pub fn validate(&self) -> Result<()> {
        self.limits.density.check("density", self.initial_density)?;
        self.limits
            .height_factor
            .check("height_factor", self.initial_height_factor)?;
        check_color(self.color)?;

        let shape = &self.shape;
        if !(shape.noise_scale.is_finite() && shape.noise_scale >= 0.0) {
            return Err(Error::Config(format!("noise_scale must be >= 0, got {}", shape.noise_scale)));
        }
        if !shape.scroll_speed.is_finite() {
            return Err(Error::Config(format!("scroll_speed must be finite, got {}", shape.scroll_speed)));
        }
        if !(shape.reference_distance.is_finite() && shape.reference_distance > 0.0) {
            return Err(Error::Config(format!(
                "reference_distance must be > 0, got {}",
                shape.reference_distance
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Inclusive range accepted by a parameter setter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Whether `value` is finite and inside the range.
    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Clamp a finite value into the range; what a slider does before
    /// calling a setter. NaN maps to `min`.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }

    pub(crate) fn check(&self, name: &'static str, value: f32) -> Result<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(Error::InvalidParameter {
                name,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Ranges for the user-facing fog controls. Both lower bounds are 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FogLimits {
    pub density: ParamRange,
    pub height_factor: ParamRange,
}

impl Default for FogLimits {
    fn default() -> Self {
        Self {
            density: ParamRange::new(0.0, 0.002),
            height_factor: ParamRange::new(0.0, 0.5),
        }
    }
}

// ---------------------------------------------------------------------------
// Shape constants
// ---------------------------------------------------------------------------

/// Stylistic constants of the fog model. None of these are physically
/// derived; they are tuned for scenes a few thousand units across.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogShape {
    /// World-to-noise coordinate scale.
    pub noise_scale: f32,
    /// Noise scroll along +Z per second of fog time.
    pub scroll_speed: f32,
    /// Distance over which noise fades out (starts fading at 1x, gone at 2x).
    pub reference_distance: f32,
    /// Square the perturbed depth before the height integral.
    pub square_depth: bool,
}

impl Default for FogShape {
    fn default() -> Self {
        Self {
            noise_scale: 0.00025,
            scroll_speed: 0.025,
            reference_distance: 5000.0,
            square_depth: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Scene fog
// ---------------------------------------------------------------------------

/// Fog settings owned by the host scene, adopted at initialization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneFog {
    pub color: Rgb,
    pub density: f32,
}

impl SceneFog {
    /// Build from a packed `0xRRGGBB` colour.
    pub fn from_hex(hex: u32, density: f32) -> Self {
        Self {
            color: hex_to_rgb(hex),
            density,
        }
    }
}

/// Convert `0xRRGGBB` into an `[r, g, b]` triple in `0..=1`.
pub fn hex_to_rgb(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    ]
}

pub(crate) fn check_color(color: Rgb) -> Result<()> {
    if color.iter().all(|c| c.is_finite() && (0.0..=1.0).contains(c)) {
        Ok(())
    } else {
        Err(Error::InvalidColor { color })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = FogConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.initial_density, 0.00005);
        assert_eq!(cfg.initial_height_factor, 0.05);
    }

    #[test]
    fn test_hex_to_rgb() {
        let c = hex_to_rgb(0xFF8000);
        assert_eq!(c[0], 1.0);
        assert!((c[1] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c[2], 0.0);
    }

    #[test]
    fn test_param_range_rejects_nan_and_inf() {
        let r = ParamRange::new(0.0, 1.0);
        assert!(!r.contains(f32::NAN));
        assert!(!r.contains(f32::INFINITY));
        assert!(!r.contains(-0.1));
        assert!(r.contains(0.0));
        assert!(r.contains(1.0));
        assert_eq!(r.clamp(3.0), 1.0);
        assert_eq!(r.clamp(f32::NAN), 0.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range_density() {
        let cfg = FogConfig {
            initial_density: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidParameter { name: "density", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_reference_distance() {
        let mut cfg = FogConfig::default();
        cfg.shape.reference_distance = 0.0;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_json_file_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "initial_height_factor": 0.2, "shape": {{ "square_depth": false }} }}"#).unwrap();

        let cfg = FogConfig::from_json_file(file.path()).unwrap();
        assert_eq!(cfg.initial_height_factor, 0.2);
        assert_eq!(cfg.initial_density, 0.00005);
        assert!(!cfg.shape.square_depth);
        assert_eq!(cfg.shape.reference_distance, 5000.0);
    }

    #[test]
    fn test_json_file_invalid_values_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "initial_density": -1.0 }}"#).unwrap();
        assert!(FogConfig::from_json_file(file.path()).is_err());
    }

    #[test]
    fn test_json_string_reloads() {
        let mut cfg = FogConfig::default();
        cfg.color = [0.1, 0.2, 0.3];
        let text = cfg.to_json_string().unwrap();
        let back: FogConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
