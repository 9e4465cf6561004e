//! Registry of shader programs that carry fog.
//!
//! Building a program composes the fog code into its template and gives it
//! a private [`FogUniformBlock`]. The registry keeps a weak reference to
//! every built program so parameter changes can reach it, without keeping
//! the program alive.

use std::collections::HashSet;
use std::rc::{Rc, Weak};
use std::cell::RefCell;

use crate::atmosphere::config::FogShape;
use crate::atmosphere::state::{FogField, FogParameters, FogUniformBlock, UniformSlots};
use crate::core::Result;
use crate::render::material::{Material, ProgramHandle, ProgramId, ShaderProgram, ShadowFlags};
use crate::render::shader::build_program_source;

/// Allocate the uniform block for a composed program, seeded from `params`.
pub fn allocate_uniform_block(params: &FogParameters, composed_source: &str) -> FogUniformBlock {
    FogUniformBlock::new(params, UniformSlots::from_source(composed_source))
}

/// One built program reachable by parameter broadcasts.
#[derive(Debug)]
pub struct ProgramRegistration {
    id: ProgramId,
    label: String,
    program: Weak<RefCell<ShaderProgram>>,
}

impl ProgramRegistration {
    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the owning material still holds the program.
    pub fn is_live(&self) -> bool {
        self.program.strong_count() > 0
    }
}

#[derive(Debug, Default)]
pub struct ProgramRegistry {
    registrations: Vec<ProgramRegistration>,
    ids: HashSet<ProgramId>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build `program` with fog: compose its source, allocate its uniform
    /// block from `params` and record it.
    ///
    /// Returns `Ok(false)` when the program was already built, leaving its
    /// source and block untouched.
    pub fn register_program(
        &mut self,
        program: &ProgramHandle,
        params: &FogParameters,
        shape: &FogShape,
    ) -> Result<bool> {
        let mut built = program.borrow_mut();
        let id = built.id();
        if self.ids.contains(&id) && built.has_fog() {
            log::trace!("program '{}' already registered", built.label());
            return Ok(false);
        }

        let source = build_program_source(built.label(), built.base_source(), shape)?;
        let block = allocate_uniform_block(params, &source);
        if block.slots() != UniformSlots::ALL {
            log::warn!(
                "program '{}' declares only some fog uniforms ({:?})",
                built.label(),
                block.slots()
            );
        }
        built.install_fog(source, block);

        self.ids.insert(id);
        self.registrations.push(ProgramRegistration {
            id,
            label: built.label().to_string(),
            program: Rc::downgrade(program),
        });
        log::debug!("registered fog program '{}' ({:?})", built.label(), id);
        Ok(true)
    }

    /// Build every program of `material` with fog, passing `flags` through
    /// to the material. Programs whose template cannot take the fog code are
    /// skipped with a warning. Returns the number of newly built programs.
    pub fn register_material(
        &mut self,
        material: &mut dyn Material,
        flags: ShadowFlags,
        params: &FogParameters,
        shape: &FogShape,
    ) -> usize {
        material.set_shadow_flags(flags);

        let mut added = 0;
        for program in material.programs() {
            match self.register_program(program, params, shape) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => log::warn!("material '{}': fog not applied: {}", material.name(), e),
            }
        }
        added
    }

    /// Register a flat list of `(material, flags)` pairs, one per mesh.
    pub fn register_meshes<'a, I>(&mut self, meshes: I, params: &FogParameters, shape: &FogShape) -> usize
    where
        I: IntoIterator<Item = (&'a mut dyn Material, ShadowFlags)>,
    {
        meshes
            .into_iter()
            .map(|(material, flags)| self.register_material(material, flags, params, shape))
            .sum()
    }

    /// Write `fields` of `params` into every live program's block, dropping
    /// registrations whose program is gone. Returns the number of programs
    /// reached.
    pub fn broadcast(&mut self, fields: &[FogField], params: &FogParameters) -> usize {
        let before = self.registrations.len();
        let mut reached = 0;

        self.registrations.retain(|registration| {
            let Some(program) = registration.program.upgrade() else {
                return false;
            };
            let mut program = program.borrow_mut();
            if let Some(block) = program.fog_mut() {
                for &field in fields {
                    block.write(field, params, &registration.label);
                }
            }
            reached += 1;
            true
        });

        if self.registrations.len() != before {
            self.ids = self.registrations.iter().map(|r| r.id).collect();
            log::debug!(
                "pruned {} dropped fog program(s)",
                before - self.registrations.len()
            );
        }
        reached
    }

    /// Drop registrations whose program is gone.
    pub fn prune(&mut self) {
        self.broadcast(&[], &FogParameters::default());
    }

    /// Number of recorded registrations, including not yet pruned dead ones.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Number of registrations whose program is still alive.
    pub fn live_count(&self) -> usize {
        self.registrations.iter().filter(|r| r.is_live()).count()
    }

    pub fn registrations(&self) -> &[ProgramRegistration] {
        &self.registrations
    }

    pub fn contains(&self, id: ProgramId) -> bool {
        self.ids.contains(&id)
    }

    /// Visit every live program.
    pub fn for_each_live(&self, mut f: impl FnMut(&ShaderProgram)) {
        for registration in &self.registrations {
            if let Some(program) = registration.program.upgrade() {
                f(&program.borrow());
            }
        }
    }

    /// Current uniform values of every live program.
    pub fn snapshot(&self) -> Vec<(ProgramId, FogParameters)> {
        let mut out = Vec::with_capacity(self.registrations.len());
        self.for_each_live(|program| {
            if let Some(block) = program.fog() {
                out.push((program.id(), FogParameters::from(block)));
            }
        });
        out
    }
}
