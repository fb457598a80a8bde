//! Scene capability snapshot handed to feature blocks each frame

use bitflags::bitflags;

bitflags! {
    /// Per-feature texture switches.
    ///
    /// Clearing a flag makes the matching feature behave as if it had no
    /// texture attached, without touching the material itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        const ALBEDO = 1 << 0;
        const AMBIENT = 1 << 1;
        const OPACITY = 1 << 2;
        const REFLECTION = 1 << 3;
        const EMISSIVE = 1 << 4;
        const BUMP = 1 << 5;
        const LIGHTMAP = 1 << 6;
        const CLEAR_COAT = 1 << 7;
        const ANISOTROPIC = 1 << 8;
        const SHEEN = 1 << 9;
        const THICKNESS = 1 << 10;
    }
}

/// Capabilities of the scene a material is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneCapabilities {
    /// Global texture switch (false renders every material untextured)
    pub textures_enabled: bool,
    pub texture_flags: TextureFlags,
}

impl SceneCapabilities {
    pub fn new() -> Self {
        Self {
            textures_enabled: true,
            texture_flags: TextureFlags::all(),
        }
    }

    pub fn with_textures_enabled(mut self, enabled: bool) -> Self {
        self.textures_enabled = enabled;
        self
    }

    pub fn with_texture_flags(mut self, flags: TextureFlags) -> Self {
        self.texture_flags = flags;
        self
    }

    /// Disable the texture of a single feature
    pub fn without(mut self, flag: TextureFlags) -> Self {
        self.texture_flags.remove(flag);
        self
    }

    /// Whether textures of the given feature may be sampled.
    ///
    /// Only checks the feature flag; callers combine it with `textures_enabled`
    /// where the global switch applies.
    pub fn feature_textures_enabled(&self, flag: TextureFlags) -> bool {
        self.texture_flags.contains(flag)
    }
}

impl Default for SceneCapabilities {
    fn default() -> Self {
        Self::new()
    }
}
