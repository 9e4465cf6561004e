//! Canonical fog parameters, per-program uniform blocks and the GPU uniform.

use bytemuck::{Pod, Zeroable};

use crate::atmosphere::config::hex_to_rgb;
use crate::core::Rgb;

// ---------------------------------------------------------------------------
// Canonical parameters
// ---------------------------------------------------------------------------

/// The single logical fog parameter set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogParameters {
    pub density: f32,
    pub height_factor: f32,
    pub color: Rgb,
    /// Accumulated fog time in seconds. Kept in `f64` so long sessions keep
    /// sub-frame resolution; uniform blocks receive it as `f32`.
    pub time: f64,
}

impl Default for FogParameters {
    fn default() -> Self {
        Self {
            density: 0.00005,
            height_factor: 0.05,
            color: hex_to_rgb(0xDFE9F3),
            time: 0.0,
        }
    }
}

impl From<&FogUniformBlock> for FogParameters {
    fn from(block: &FogUniformBlock) -> Self {
        Self {
            density: block.density,
            height_factor: block.height_factor,
            color: block.color,
            time: f64::from(block.time),
        }
    }
}

// ---------------------------------------------------------------------------
// Uniform slots
// ---------------------------------------------------------------------------

/// A field of the fog uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FogField {
    Time,
    Density,
    HeightFactor,
    Color,
}

impl FogField {
    pub const ALL: [FogField; 4] = [
        FogField::Time,
        FogField::Density,
        FogField::HeightFactor,
        FogField::Color,
    ];

    /// Member name in the WGSL `FogUniforms` struct.
    pub fn wgsl_name(self) -> &'static str {
        match self {
            FogField::Time => "time",
            FogField::Density => "density",
            FogField::HeightFactor => "height_factor",
            FogField::Color => "color",
        }
    }

    fn bit(self) -> u8 {
        match self {
            FogField::Time => 1,
            FogField::Density => 2,
            FogField::HeightFactor => 4,
            FogField::Color => 8,
        }
    }
}

/// Which fog fields a compiled program actually declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlots(u8);

impl UniformSlots {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    #[inline]
    pub fn contains(self, field: FogField) -> bool {
        self.0 & field.bit() != 0
    }

    #[must_use]
    pub fn with(self, field: FogField) -> Self {
        Self(self.0 | field.bit())
    }

    #[must_use]
    pub fn without(self, field: FogField) -> Self {
        Self(self.0 & !field.bit())
    }

    /// Reflect the members of the `FogUniforms` struct in a WGSL source.
    /// Sources without that struct declare no slots.
    pub fn from_source(source: &str) -> Self {
        let Some(start) = source.find("struct FogUniforms") else {
            return Self::NONE;
        };
        let body = &source[start..];
        let Some(open) = body.find('{') else {
            return Self::NONE;
        };
        let Some(close) = body[open..].find('}') else {
            return Self::NONE;
        };
        let members = &body[open + 1..open + close];

        let mut slots = Self::NONE;
        for member in members.split(',') {
            let name = member.split(':').next().unwrap_or("").trim();
            for field in FogField::ALL {
                if name == field.wgsl_name() {
                    slots = slots.with(field);
                }
            }
        }
        slots
    }
}

impl Default for UniformSlots {
    fn default() -> Self {
        Self::ALL
    }
}

// ---------------------------------------------------------------------------
// Per-program uniform block
// ---------------------------------------------------------------------------

/// Fog uniform values owned by one shader program.
#[derive(Clone, Debug, PartialEq)]
pub struct FogUniformBlock {
    time: f32,
    density: f32,
    height_factor: f32,
    color: Rgb,
    slots: UniformSlots,
    /// Fields already reported missing, so a per-frame broadcast warns once.
    reported_missing: UniformSlots,
    dirty: bool,
}

impl FogUniformBlock {
    /// Allocate a block seeded from `params`. Undeclared fields keep zero.
    pub fn new(params: &FogParameters, slots: UniformSlots) -> Self {
        let mut block = Self {
            time: 0.0,
            density: 0.0,
            height_factor: 0.0,
            color: [0.0; 3],
            slots,
            reported_missing: UniformSlots::NONE,
            dirty: true,
        };
        for field in FogField::ALL {
            if slots.contains(field) {
                block.write_field(field, params);
            }
        }
        block
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn height_factor(&self) -> f32 {
        self.height_factor
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn slots(&self) -> UniformSlots {
        self.slots
    }

    /// Whether the block changed since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear and return the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Copy `field` from `params`. Returns `false` if the program does not
    /// declare that field; the first miss per field is logged as a warning.
    pub fn write(&mut self, field: FogField, params: &FogParameters, program: &str) -> bool {
        if !self.slots.contains(field) {
            if self.reported_missing.contains(field) {
                log::trace!("program '{program}' has no fog.{} slot", field.wgsl_name());
            } else {
                log::warn!(
                    "program '{program}' has no fog.{} slot; skipping it for this program",
                    field.wgsl_name()
                );
                self.reported_missing = self.reported_missing.with(field);
            }
            return false;
        }
        self.write_field(field, params);
        true
    }

    fn write_field(&mut self, field: FogField, params: &FogParameters) {
        match field {
            FogField::Time => self.time = params.time as f32,
            FogField::Density => self.density = params.density,
            FogField::HeightFactor => self.height_factor = params.height_factor,
            FogField::Color => self.color = params.color,
        }
        self.dirty = true;
    }

    /// GPU layout of the block.
    pub fn uniform(&self) -> FogUniform {
        FogUniform::from(self)
    }
}

// ---------------------------------------------------------------------------
// GPU uniform
// ---------------------------------------------------------------------------

/// GPU-ready fog uniform, matching the WGSL `FogUniforms` struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct FogUniform {
    pub color: [f32; 3],
    pub time: f32,
    pub density: f32,
    pub height_factor: f32,
    pub _pad: [f32; 2],
}

impl From<&FogUniformBlock> for FogUniform {
    fn from(block: &FogUniformBlock) -> Self {
        Self {
            color: block.color,
            time: block.time,
            density: block.density,
            height_factor: block.height_factor,
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size_alignment() {
        let size = std::mem::size_of::<FogUniform>();
        assert_eq!(size, 32);
        assert_eq!(size % 16, 0, "FogUniform size {size} is not 16-byte aligned");
    }

    #[test]
    fn test_bytemuck_cast() {
        let block = FogUniformBlock::new(&FogParameters::default(), UniformSlots::ALL);
        let u = block.uniform();
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&u));
        assert_eq!(floats[3], block.time());
        assert_eq!(floats[4], block.density());
        assert_eq!(floats[5], block.height_factor());
    }

    #[test]
    fn test_block_seeded_from_params() {
        let params = FogParameters {
            density: 0.001,
            height_factor: 0.3,
            color: [0.1, 0.2, 0.3],
            time: 4.0,
        };
        let block = FogUniformBlock::new(&params, UniformSlots::ALL);
        assert_eq!(FogParameters::from(&block), params);
        assert!(block.is_dirty());
    }

    #[test]
    fn test_missing_slot_is_skipped() {
        let params = FogParameters::default();
        let slots = UniformSlots::ALL.without(FogField::Time);
        let mut block = FogUniformBlock::new(&params, slots);

        let later = FogParameters { time: 9.0, density: 0.002, ..params };
        assert!(!block.write(FogField::Time, &later, "test"));
        assert!(!block.write(FogField::Time, &later, "test"));
        assert!(block.write(FogField::Density, &later, "test"));
        assert_eq!(block.time(), 0.0);
        assert_eq!(block.density(), 0.002);
    }

    #[test]
    fn test_take_dirty() {
        let mut block = FogUniformBlock::new(&FogParameters::default(), UniformSlots::ALL);
        assert!(block.take_dirty());
        assert!(!block.is_dirty());
        block.write(FogField::Color, &FogParameters::default(), "test");
        assert!(block.take_dirty());
    }

    #[test]
    fn test_slots_from_source() {
        let src = "struct FogUniforms {\n    color: vec3<f32>,\n    time: f32,\n    density: f32,\n}\n";
        let slots = UniformSlots::from_source(src);
        assert!(slots.contains(FogField::Color));
        assert!(slots.contains(FogField::Time));
        assert!(slots.contains(FogField::Density));
        assert!(!slots.contains(FogField::HeightFactor));
        assert_eq!(UniformSlots::from_source("fn main() {}"), UniformSlots::NONE);
    }
}
