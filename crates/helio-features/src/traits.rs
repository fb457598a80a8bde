//! Material feature trait definition
//!
//! This is the interface every material feature block implements.

use crate::{
    EffectFallbacks, MaterialDefines, SceneCapabilities, Texture, UniformBuffer, UniformStaging,
};
use std::sync::Arc;

/// Host callback invoked when a property affecting the shader variant changes
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Material feature trait - implemented by all material feature blocks
///
/// **Lifecycle (per frame, driven by the owning material):**
/// 1. `is_ready()` - bail out early while textures are still loading
/// 2. `prepare_defines()` - only when the defines record is stale
/// 3. `bind()` - write uniforms and samplers
///
/// **Ownership:** a block may only write the defines, uniforms and samplers it
/// declares through `declared_defines()`, `declare_uniforms()` and
/// `declare_samplers()`. The registry refuses blocks whose declarations
/// collide.
pub trait MaterialFeature: Send + Sync + AsAny {
    /// Unique name for this feature (lowercase snake_case)
    fn name(&self) -> &str;

    /// Whether the feature can be used this frame.
    ///
    /// Never blocks; the host retries on a later frame when this is false.
    fn is_ready(&self, defines: &MaterialDefines, caps: &SceneCapabilities) -> bool {
        let _ = (defines, caps);
        true
    }

    /// Set this feature's shader switches in `defines`
    fn prepare_defines(&self, defines: &mut MaterialDefines, caps: &SceneCapabilities);

    /// Write uniforms and bind samplers.
    ///
    /// `is_frozen` tells the feature that the material is not expected to
    /// change, so uniform writes may be skipped when the buffer is synchronized.
    fn bind(&self, uniforms: &mut dyn UniformBuffer, caps: &SceneCapabilities, is_frozen: bool);

    /// Register fallbacks starting at `rank`, returning the next free rank
    fn add_fallbacks(
        &self,
        defines: &MaterialDefines,
        fallbacks: &mut EffectFallbacks,
        rank: u32,
    ) -> u32 {
        let _ = (defines, fallbacks);
        rank
    }

    /// Defines this feature writes
    fn declared_defines(&self) -> &'static [&'static str] {
        &[]
    }

    /// Append the uniform names this feature writes
    fn declare_uniforms(&self, uniforms: &mut Vec<String>) {
        let _ = uniforms;
    }

    /// Append the sampler names this feature binds
    fn declare_samplers(&self, samplers: &mut Vec<String>) {
        let _ = samplers;
    }

    /// Declare this feature's uniforms (with sizes) in the staging layout
    fn declare_uniform_layout(&self, uniforms: &mut UniformStaging) {
        let _ = uniforms;
    }

    /// Whether `texture` is used by this feature (identity comparison)
    fn has_texture(&self, texture: &Arc<dyn Texture>) -> bool {
        let _ = texture;
        false
    }

    /// Append every texture this feature references
    fn collect_active_textures(&self, textures: &mut Vec<Arc<dyn Texture>>) {
        let _ = textures;
    }

    /// Append every animated texture this feature references
    fn collect_animatables(&self, animatables: &mut Vec<Arc<dyn Texture>>) {
        let _ = animatables;
    }

    /// Release resources. Textures are only disposed when forced; their
    /// lifetime is otherwise managed by whoever loaded them.
    fn dispose(&mut self, force_dispose_textures: bool) {
        let _ = force_dispose_textures;
    }
}

/// Helper trait for downcasting feature trait objects
pub trait AsAny {
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

impl<T: MaterialFeature + 'static> AsAny for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
