//! Emulation of source-language builtins the target lacks.
//!
//! The catalog is closed: an entry exists for every (builtin, operand width)
//! pair some target cannot express natively, carrying the replacement
//! function's definition in each affected target language. Emitters record
//! the calls they rewrite; only definitions that were actually recorded are
//! written into the output prelude.

use lazy_static::lazy_static;

use crate::ast::BuiltinOp;
use crate::emit::Target;
use crate::sink::Sink;

/// One emulated (builtin, width) pair.
///
/// `width` is the component count of the distinguishing operand. A target
/// with a `None` source handles the builtin natively.
pub struct Emulation {
    pub op: BuiltinOp,
    pub width: u8,
    /// Name of the emitted replacement function
    pub name: &'static str,
    hlsl: Option<&'static str>,
    msl: Option<&'static str>,
    wgsl: Option<&'static str>,
}

impl Emulation {
    fn source(&self, target: Target) -> Option<&'static str> {
        match target {
            Target::Hlsl => self.hlsl,
            Target::Msl => self.msl,
            Target::Wgsl => self.wgsl,
        }
    }
}

macro_rules! emu {
    ($op:ident, $width:expr, $name:expr, $hlsl:expr, $msl:expr, $wgsl:expr) => {
        Emulation {
            op: BuiltinOp::$op,
            width: $width,
            name: $name,
            hlsl: $hlsl,
            msl: $msl,
            wgsl: $wgsl,
        }
    };
}

lazy_static! {
    /// Closed emulation catalog, sorted by (op, width) for binary search
    static ref EMULATIONS: Vec<Emulation> = {
        // GLSL mod() floors; fmod() and the WGSL `%` truncate, which differs
        // for negative operands.
        let mut entries = vec![
            emu!(Radians, 1, "sx_radians_emu",
                 None,
                 Some("float sx_radians_emu(float d) { return d * 0.017453292519943295; }"),
                 None),
            emu!(Radians, 2, "sx_radians2_emu",
                 None,
                 Some("float2 sx_radians2_emu(float2 d) { return d * 0.017453292519943295; }"),
                 None),
            emu!(Radians, 3, "sx_radians3_emu",
                 None,
                 Some("float3 sx_radians3_emu(float3 d) { return d * 0.017453292519943295; }"),
                 None),
            emu!(Radians, 4, "sx_radians4_emu",
                 None,
                 Some("float4 sx_radians4_emu(float4 d) { return d * 0.017453292519943295; }"),
                 None),
            emu!(Degrees, 1, "sx_degrees_emu",
                 None,
                 Some("float sx_degrees_emu(float r) { return r * 57.29577951308232; }"),
                 None),
            emu!(Degrees, 2, "sx_degrees2_emu",
                 None,
                 Some("float2 sx_degrees2_emu(float2 r) { return r * 57.29577951308232; }"),
                 None),
            emu!(Degrees, 3, "sx_degrees3_emu",
                 None,
                 Some("float3 sx_degrees3_emu(float3 r) { return r * 57.29577951308232; }"),
                 None),
            emu!(Degrees, 4, "sx_degrees4_emu",
                 None,
                 Some("float4 sx_degrees4_emu(float4 r) { return r * 57.29577951308232; }"),
                 None),
            emu!(Mod, 1, "sx_mod_emu",
                 Some("float sx_mod_emu(float x, float y) { return x - y * floor(x / y); }"),
                 Some("float sx_mod_emu(float x, float y) { return x - y * floor(x / y); }"),
                 Some("fn sx_mod_emu(x : f32, y : f32) -> f32 { return x - y * floor(x / y); }")),
            emu!(Mod, 2, "sx_mod2_emu",
                 Some("float2 sx_mod2_emu(float2 x, float2 y) { return x - y * floor(x / y); }"),
                 Some("float2 sx_mod2_emu(float2 x, float2 y) { return x - y * floor(x / y); }"),
                 Some("fn sx_mod2_emu(x : vec2<f32>, y : vec2<f32>) -> vec2<f32> { return x - y * floor(x / y); }")),
            emu!(Mod, 3, "sx_mod3_emu",
                 Some("float3 sx_mod3_emu(float3 x, float3 y) { return x - y * floor(x / y); }"),
                 Some("float3 sx_mod3_emu(float3 x, float3 y) { return x - y * floor(x / y); }"),
                 Some("fn sx_mod3_emu(x : vec3<f32>, y : vec3<f32>) -> vec3<f32> { return x - y * floor(x / y); }")),
            emu!(Mod, 4, "sx_mod4_emu",
                 Some("float4 sx_mod4_emu(float4 x, float4 y) { return x - y * floor(x / y); }"),
                 Some("float4 sx_mod4_emu(float4 x, float4 y) { return x - y * floor(x / y); }"),
                 Some("fn sx_mod4_emu(x : vec4<f32>, y : vec4<f32>) -> vec4<f32> { return x - y * floor(x / y); }")),
            // WGSL dropped isNan/isInf; NaN compares unequal to itself and
            // float overflow range is fixed for f32.
            emu!(IsNan, 1, "sx_isnan_emu",
                 None, None,
                 Some("fn sx_isnan_emu(x : f32) -> bool { return x != x; }")),
            emu!(IsNan, 2, "sx_isnan2_emu",
                 None, None,
                 Some("fn sx_isnan2_emu(x : vec2<f32>) -> vec2<bool> { return x != x; }")),
            emu!(IsNan, 3, "sx_isnan3_emu",
                 None, None,
                 Some("fn sx_isnan3_emu(x : vec3<f32>) -> vec3<bool> { return x != x; }")),
            emu!(IsNan, 4, "sx_isnan4_emu",
                 None, None,
                 Some("fn sx_isnan4_emu(x : vec4<f32>) -> vec4<bool> { return x != x; }")),
            emu!(IsInf, 1, "sx_isinf_emu",
                 None, None,
                 Some("fn sx_isinf_emu(x : f32) -> bool { return abs(x) > 0x1.fffffep+127; }")),
            emu!(IsInf, 2, "sx_isinf2_emu",
                 None, None,
                 Some("fn sx_isinf2_emu(x : vec2<f32>) -> vec2<bool> { return abs(x) > vec2<f32>(0x1.fffffep+127); }")),
            emu!(IsInf, 3, "sx_isinf3_emu",
                 None, None,
                 Some("fn sx_isinf3_emu(x : vec3<f32>) -> vec3<bool> { return abs(x) > vec3<f32>(0x1.fffffep+127); }")),
            emu!(IsInf, 4, "sx_isinf4_emu",
                 None, None,
                 Some("fn sx_isinf4_emu(x : vec4<f32>) -> vec4<bool> { return abs(x) > vec4<f32>(0x1.fffffep+127); }")),
        ];

        entries.sort_by_key(|e| (e.op as u8, e.width));
        entries
    };
}

fn lookup(op: BuiltinOp, width: u8) -> Option<usize> {
    EMULATIONS
        .binary_search_by_key(&(op as u8, width), |e| (e.op as u8, e.width))
        .ok()
}

/// Per-compilation record of which emulations the emitter used
pub struct EmulationRegistry {
    target: Target,
    used: Vec<bool>,
}

impl EmulationRegistry {
    pub fn new(target: Target) -> Self {
        EmulationRegistry {
            target,
            used: vec![false; EMULATIONS.len()],
        }
    }

    /// Record a call the emitter must redirect. Returns the replacement
    /// function name when the target emulates this (builtin, width) pair,
    /// `None` when it is native.
    pub fn record_call(&mut self, op: BuiltinOp, width: u8) -> Option<&'static str> {
        let index = lookup(op, width)?;
        let entry = &EMULATIONS[index];
        entry.source(self.target)?;
        self.used[index] = true;
        Some(entry.name)
    }

    /// True when at least one emulation was recorded
    pub fn any_used(&self) -> bool {
        self.used.iter().any(|u| *u)
    }

    /// Write the definitions of every recorded emulation, in catalog order
    pub fn emit_definitions(&self, sink: &mut Sink) {
        for (index, used) in self.used.iter().enumerate() {
            if !used {
                continue;
            }
            // The used flag is only ever set for entries with a source.
            if let Some(source) = EMULATIONS[index].source(self.target) {
                sink.push(source);
                sink.push("\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_sorted() {
        for pair in EMULATIONS.windows(2) {
            assert!((pair[0].op as u8, pair[0].width) < (pair[1].op as u8, pair[1].width));
        }
    }

    #[test]
    fn native_builtins_are_not_recorded() {
        let mut registry = EmulationRegistry::new(Target::Hlsl);
        assert_eq!(registry.record_call(BuiltinOp::Sin, 1), None);
        assert_eq!(registry.record_call(BuiltinOp::Radians, 1), None);
        assert!(!registry.any_used());
    }

    #[test]
    fn only_recorded_definitions_are_emitted() {
        let mut registry = EmulationRegistry::new(Target::Wgsl);
        assert_eq!(
            registry.record_call(BuiltinOp::Mod, 2),
            Some("sx_mod2_emu")
        );

        let mut sink = Sink::new();
        registry.emit_definitions(&mut sink);
        let text = sink.into_string();
        assert!(text.contains("sx_mod2_emu"));
        assert!(!text.contains("sx_mod_emu("));
        assert!(!text.contains("sx_isnan_emu"));
    }
}
