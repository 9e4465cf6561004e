//! Composition of fog code into WGSL program templates.
//!
//! A base template marks where fog code belongs with hook comments:
//!
//! ```text
//! // #hook fog_pars
//! // #hook fog_varyings
//! // #hook fog_vertex(<output var>, <world position expr>)
//! // #hook fog_fragment(<color var>, <input var>, <view origin expr>)
//! ```
//!
//! [`build_program_source`] replaces each hook with the matching fog code and
//! returns a new source. The template itself is never modified, so any number
//! of programs can be composed from the same template independently.

use crate::atmosphere::config::FogShape;
use crate::atmosphere::fog::SINGULAR_EPSILON;
use crate::core::{Error, Result};

/// First line of every composed program.
pub const FOG_INJECTED_MARKER: &str = "// brume: height fog composed";

/// Bind group index of the `fog` uniform in composed programs.
pub const FOG_BIND_GROUP: u32 = 3;

/// Inter-stage location carrying the world position to the fragment stage.
pub const FOG_VARYING_LOCATION: u32 = 14;

const NOISE_WGSL: &str = include_str!("../../shaders/fog_noise.wgsl");
const APPLY_WGSL: &str = include_str!("../../shaders/fog_apply.wgsl");

/// Lambert surface template carrying all four fog hooks.
pub const STANDARD_SURFACE_WGSL: &str = include_str!("../../shaders/standard_surface.wgsl");

const HOOK_PREFIX: &str = "// #hook ";

/// Injection points a template must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FogHook {
    /// Module scope: noise library, uniform block and fog functions.
    Pars,
    /// Vertex output struct: world position varying.
    Varyings,
    /// Vertex stage: world position pass-through.
    Vertex,
    /// Fragment stage: colour blend.
    Fragment,
}

impl FogHook {
    pub const ALL: [FogHook; 4] = [FogHook::Pars, FogHook::Varyings, FogHook::Vertex, FogHook::Fragment];

    pub fn name(self) -> &'static str {
        match self {
            FogHook::Pars => "fog_pars",
            FogHook::Varyings => "fog_varyings",
            FogHook::Vertex => "fog_vertex",
            FogHook::Fragment => "fog_fragment",
        }
    }

    fn arity(self) -> usize {
        match self {
            FogHook::Pars | FogHook::Varyings => 0,
            FogHook::Vertex => 2,
            FogHook::Fragment => 3,
        }
    }

    fn expand(self, args: &[&str], shape: &FogShape) -> String {
        match self {
            FogHook::Pars => fog_pars(shape),
            FogHook::Varyings => format!(
                "@location({FOG_VARYING_LOCATION}) fog_world_position: vec3<f32>,"
            ),
            FogHook::Vertex => format!("{}.fog_world_position = {};", args[0], args[1]),
            FogHook::Fragment => {
                let (color, input, origin) = (args[0], args[1], args[2]);
                format!(
                    "{color} = vec4<f32>(fog_apply({color}.rgb, {input}.fog_world_position, {origin}), {color}.a);"
                )
            }
        }
    }
}

/// A parsed hook line.
struct HookSite<'a> {
    hook: FogHook,
    line: usize,
    indent: &'a str,
    args: Vec<&'a str>,
}

/// Whether `source` already went through [`build_program_source`].
pub fn is_composed(source: &str) -> bool {
    source.lines().next().is_some_and(|l| l.trim() == FOG_INJECTED_MARKER)
}

/// Compose the fog code into `base`, returning the program's final source.
///
/// Pure: the result depends only on the arguments. Composing an already
/// composed source returns it unchanged.
pub fn build_program_source(label: &str, base: &str, shape: &FogShape) -> Result<String> {
    if is_composed(base) {
        log::debug!("program '{label}' already carries fog code");
        return Ok(base.to_string());
    }

    let lines: Vec<&str> = base.lines().collect();
    let mut sites = Vec::with_capacity(FogHook::ALL.len());
    for hook in FogHook::ALL {
        sites.push(find_hook(label, &lines, hook)?);
    }

    let mut out = String::with_capacity(base.len() + NOISE_WGSL.len() + APPLY_WGSL.len() + 512);
    out.push_str(FOG_INJECTED_MARKER);
    out.push('\n');
    for (index, line) in lines.iter().enumerate() {
        match sites.iter().find(|s| s.line == index) {
            Some(site) => {
                for expanded in site.hook.expand(&site.args, shape).lines() {
                    if !expanded.is_empty() {
                        out.push_str(site.indent);
                    }
                    out.push_str(expanded);
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    log::debug!("composed fog into program '{label}' ({} -> {} bytes)", base.len(), out.len());
    Ok(out)
}

fn find_hook<'a>(label: &str, lines: &[&'a str], hook: FogHook) -> Result<HookSite<'a>> {
    let mut found: Option<HookSite<'a>> = None;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix(HOOK_PREFIX) else {
            continue;
        };
        let rest = rest.trim_end();
        let (name, args) = match rest.find('(') {
            Some(open) => (&rest[..open], Some(&rest[open..])),
            None => (rest, None),
        };
        if name.trim() != hook.name() {
            continue;
        }

        let malformed = || Error::MalformedHook {
            program: label.to_string(),
            hook: hook.name(),
        };
        if found.is_some() {
            return Err(malformed());
        }

        let args: Vec<&str> = match args {
            Some(list) => {
                let inner = list
                    .strip_prefix('(')
                    .and_then(|l| l.strip_suffix(')'))
                    .ok_or_else(malformed)?;
                split_top_level(inner).ok_or_else(malformed)?
            }
            None => Vec::new(),
        };
        if args.len() != hook.arity() {
            return Err(malformed());
        }

        found = Some(HookSite {
            hook,
            line: index,
            indent: &line[..line.len() - trimmed.len()],
            args,
        });
    }

    found.ok_or_else(|| Error::MissingHook {
        program: label.to_string(),
        hook: hook.name(),
    })
}

/// Split a hook argument list on commas outside any `()` or `[]`, so
/// arguments may themselves be calls or constructors. `None` if the
/// brackets do not balance.
fn split_top_level(list: &str) -> Option<Vec<&str>> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    args.push(list[start..].trim());
    args.retain(|a| !a.is_empty());
    Some(args)
}

/// Module-scope fog code: shape constants, uniform block, noise and fog functions.
fn fog_pars(shape: &FogShape) -> String {
    format!(
        "const FOG_NOISE_SCALE: f32 = {noise_scale};
const FOG_SCROLL_SPEED: f32 = {scroll_speed};
const FOG_REFERENCE_DISTANCE: f32 = {reference};
const FOG_SQUARE_DEPTH: bool = {square};
const FOG_SINGULAR_EPSILON: f32 = {epsilon};

struct FogUniforms {{
    color: vec3<f32>,
    time: f32,
    density: f32,
    height_factor: f32,
    _pad: vec2<f32>,
}}

@group({FOG_BIND_GROUP}) @binding(0) var<uniform> fog: FogUniforms;

{NOISE_WGSL}
{APPLY_WGSL}",
        noise_scale = wgsl_f32(shape.noise_scale),
        scroll_speed = wgsl_f32(shape.scroll_speed),
        reference = wgsl_f32(shape.reference_distance),
        square = shape.square_depth,
        epsilon = wgsl_f32(SINGULAR_EPSILON),
    )
}

/// WGSL float literal. `Debug` always keeps a `.` or an exponent.
fn wgsl_f32(value: f32) -> String {
    format!("{value:?}")
}
