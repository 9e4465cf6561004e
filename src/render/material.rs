//! Materials and the shader programs they own.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::atmosphere::state::FogUniformBlock;
use crate::core::Rgb;
use crate::render::shader::STANDARD_SURFACE_WGSL;

static NEXT_PROGRAM_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a shader program instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(u64);

impl ProgramId {
    fn next() -> Self {
        Self(NEXT_PROGRAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Shadow participation of a mesh. Passed through to the material untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadowFlags {
    pub casts_shadow: bool,
    pub receives_shadow: bool,
}

impl ShadowFlags {
    pub const NONE: Self = Self { casts_shadow: false, receives_shadow: false };
    pub const BOTH: Self = Self { casts_shadow: true, receives_shadow: true };

    pub fn new(casts_shadow: bool, receives_shadow: bool) -> Self {
        Self { casts_shadow, receives_shadow }
    }
}

/// A shader program: its base template and, once built, the composed
/// source and the fog uniform block it owns.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    base_source: String,
    composed_source: Option<String>,
    fog: Option<FogUniformBlock>,
}

/// Programs are shared between materials by reference counting.
pub type ProgramHandle = Rc<RefCell<ShaderProgram>>;

impl ShaderProgram {
    pub fn new(label: impl Into<String>, base_source: impl Into<String>) -> Self {
        Self {
            id: ProgramId::next(),
            label: label.into(),
            base_source: base_source.into(),
            composed_source: None,
            fog: None,
        }
    }

    /// A program using the standard Lambert surface template.
    pub fn standard(label: impl Into<String>) -> Self {
        Self::new(label, STANDARD_SURFACE_WGSL)
    }

    pub fn into_handle(self) -> ProgramHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn base_source(&self) -> &str {
        &self.base_source
    }

    /// Final source once the program has been built with fog.
    pub fn composed_source(&self) -> Option<&str> {
        self.composed_source.as_deref()
    }

    /// Source to compile: composed if built, otherwise the base template.
    pub fn source(&self) -> &str {
        self.composed_source.as_deref().unwrap_or(&self.base_source)
    }

    pub fn fog(&self) -> Option<&FogUniformBlock> {
        self.fog.as_ref()
    }

    pub fn fog_mut(&mut self) -> Option<&mut FogUniformBlock> {
        self.fog.as_mut()
    }

    pub fn has_fog(&self) -> bool {
        self.fog.is_some()
    }

    pub(crate) fn install_fog(&mut self, composed_source: String, block: FogUniformBlock) {
        self.composed_source = Some(composed_source);
        self.fog = Some(block);
    }
}

/// A surface material as seen by the fog registry.
pub trait Material {
    fn name(&self) -> &str;

    /// Every program this material may draw with.
    fn programs(&self) -> &[ProgramHandle];

    fn set_shadow_flags(&mut self, flags: ShadowFlags);
}

/// Plain lit surface: an albedo, shadow flags and one or more programs.
#[derive(Debug)]
pub struct SurfaceMaterial {
    name: String,
    pub albedo: Rgb,
    shadows: ShadowFlags,
    programs: Vec<ProgramHandle>,
}

impl SurfaceMaterial {
    /// Material with a single standard-template program of its own.
    pub fn new(name: impl Into<String>, albedo: Rgb) -> Self {
        let name = name.into();
        let program = ShaderProgram::standard(format!("{name}/surface")).into_handle();
        Self::with_programs(name, albedo, vec![program])
    }

    /// Material drawing with the given (possibly shared) programs.
    pub fn with_programs(name: impl Into<String>, albedo: Rgb, programs: Vec<ProgramHandle>) -> Self {
        Self {
            name: name.into(),
            albedo,
            shadows: ShadowFlags::NONE,
            programs,
        }
    }

    pub fn shadows(&self) -> ShadowFlags {
        self.shadows
    }
}

impl Material for SurfaceMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn programs(&self) -> &[ProgramHandle] {
        &self.programs
    }

    fn set_shadow_flags(&mut self, flags: ShadowFlags) {
        self.shadows = flags;
    }
}
