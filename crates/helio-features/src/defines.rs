//! Shader variant defines
//!
//! The host material keeps one [`MaterialDefines`] record per shader variant.
//! Feature blocks flip their own switches in it; the host compiles (or looks
//! up) a pipeline whenever the record changed.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Shader specialization constant value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShaderDefine {
    Bool(bool),
    U32(u32),
    F32(f32),
}

impl ShaderDefine {
    /// Truthiness as seen by `#ifdef`-style shader code
    pub fn is_set(&self) -> bool {
        match *self {
            ShaderDefine::Bool(b) => b,
            ShaderDefine::U32(v) => v != 0,
            ShaderDefine::F32(v) => v != 0.0,
        }
    }
}

/// Named shader switches plus the host's dirty-tracking state
#[derive(Clone, Debug)]
pub struct MaterialDefines {
    values: BTreeMap<String, ShaderDefine>,
    dirty: bool,
    textures_dirty: bool,
    needs_uvs: bool,
}

impl MaterialDefines {
    /// A fresh record starts fully dirty so every feature runs once
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            dirty: true,
            textures_dirty: true,
            needs_uvs: false,
        }
    }

    pub fn set(&mut self, name: &str, value: ShaderDefine) {
        if self.values.get(name) != Some(&value) {
            self.values.insert(name.to_string(), value);
            self.dirty = true;
        }
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set(name, ShaderDefine::Bool(value));
    }

    pub fn set_u32(&mut self, name: &str, value: u32) {
        self.set(name, ShaderDefine::U32(value));
    }

    pub fn get(&self, name: &str) -> Option<ShaderDefine> {
        self.values.get(name).copied()
    }

    /// Missing defines read as `false`
    pub fn get_bool(&self, name: &str) -> bool {
        self.values.get(name).map_or(false, ShaderDefine::is_set)
    }

    pub fn get_u32(&self, name: &str) -> Option<u32> {
        match self.values.get(name)? {
            ShaderDefine::U32(v) => Some(*v),
            ShaderDefine::Bool(b) => Some(*b as u32),
            ShaderDefine::F32(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn are_textures_dirty(&self) -> bool {
        self.textures_dirty
    }

    pub fn mark_textures_dirty(&mut self) {
        self.dirty = true;
        self.textures_dirty = true;
    }

    /// Called by the host once the variant for this record is compiled
    pub fn mark_as_processed(&mut self) {
        self.dirty = false;
        self.textures_dirty = false;
    }

    pub fn needs_uvs(&self) -> bool {
        self.needs_uvs
    }

    pub fn set_needs_uvs(&mut self, needs_uvs: bool) {
        self.needs_uvs = needs_uvs;
    }

    /// Render the record as WGSL `override` declarations, sorted by name.
    ///
    /// Non-finite floats have no WGSL literal and are left out.
    pub fn overrides_source(&self) -> String {
        let mut result = String::new();

        for (name, value) in &self.values {
            if let ShaderDefine::F32(f) = value {
                if !f.is_finite() {
                    log::warn!("Skipping override '{}': {} is not a WGSL literal", name, f);
                    continue;
                }
            }

            // Writing into a String cannot fail
            let _ = match value {
                ShaderDefine::Bool(b) => writeln!(result, "override {}: bool = {};", name, b),
                ShaderDefine::U32(u) => writeln!(result, "override {}: u32 = {}u;", name, u),
                ShaderDefine::F32(f) => writeln!(result, "override {}: f32 = {:?};", name, f),
            };
        }

        result
    }
}

impl Default for MaterialDefines {
    fn default() -> Self {
        Self::new()
    }
}
