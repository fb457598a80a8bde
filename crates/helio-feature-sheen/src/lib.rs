//! Sheen material feature
//!
//! Adds the soft retro-reflective highlight of fabrics (velvet, satin,
//! peach fuzz) on top of a PBR material. The block owns four shader defines,
//! three uniforms and one sampler; the host material drives it through
//! [`MaterialFeature`] every time it rebuilds or draws.
//!
//! ```ignore
//! let mut sheen = SheenFeature::new(mark_textures_dirty).with_enabled(true);
//! sheen.set_texture(Some(fabric_mask));
//!
//! if sheen.is_ready(&defines, &caps) {
//!     if defines.is_dirty() {
//!         sheen.prepare_defines(&mut defines, &caps);
//!     }
//!     sheen.bind(&mut uniforms, &caps, material.is_frozen());
//! }
//! ```

mod serialization;

pub use serialization::{SheenField, SHEEN_FIELDS};

use glam::Vec3;
use helio_features::{
    bind_texture_matrix, prepare_defines_for_merged_uv, ChangeCallback, EffectFallbacks,
    MaterialDefines, MaterialFeature, SceneCapabilities, Texture, TextureFlags, UniformBuffer,
    UniformStaging,
};
use std::fmt;
use std::sync::Arc;

/// Shader defines owned by the sheen block
pub mod define {
    /// Sheen lobe compiled in
    pub const SHEEN: &str = "SHEEN";
    /// Sheen texture sampled
    pub const TEXTURE: &str = "SHEEN_TEXTURE";
    /// UV channel + 1 read directly, 0 when the texture matrix is used
    pub const TEXTURE_DIRECT_UV: &str = "SHEEN_TEXTUREDIRECTUV";
    /// Sheen color taken from albedo
    pub const LINK_WITH_ALBEDO: &str = "SHEEN_LINKWITHALBEDO";

    pub const ALL: &[&str] = &[SHEEN, TEXTURE, TEXTURE_DIRECT_UV, LINK_WITH_ALBEDO];
}

/// Uniform and sampler names owned by the sheen block
pub mod uniform {
    /// vec4: rgb = color, a = intensity
    pub const COLOR: &str = "vSheenColor";
    /// vec2: x = UV channel, y = texture level
    pub const INFOS: &str = "vSheenInfos";
    /// mat4: UV transform of the sheen texture
    pub const MATRIX: &str = "sheenMatrix";
    pub const SAMPLER: &str = "sheenSampler";
}

const MATRIX_KEY: &str = "sheen";

/// Sheen parameters and shader-variant protocol
pub struct SheenFeature {
    enabled: bool,
    link_with_albedo: bool,
    intensity: f32,
    color: Vec3,
    texture: Option<Arc<dyn Texture>>,
    on_change: ChangeCallback,
}

impl SheenFeature {
    /// Create a disabled sheen block.
    ///
    /// `on_change` is invoked whenever a property that affects the shader
    /// variant changes; hosts usually mark their defines as textures-dirty.
    pub fn new(on_change: ChangeCallback) -> Self {
        Self {
            enabled: false,
            link_with_albedo: false,
            intensity: 1.0,
            color: Vec3::ONE,
            texture: None,
            on_change,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_link_with_albedo(mut self, link: bool) -> Self {
        self.link_with_albedo = link;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, texture: Arc<dyn Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Type tag written into serialized records
    pub fn class_name(&self) -> &'static str {
        "PBRSheenConfiguration"
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            log::debug!("Sheen {}", if enabled { "enabled" } else { "disabled" });
            (self.on_change)();
        }
    }

    pub fn link_with_albedo(&self) -> bool {
        self.link_with_albedo
    }

    pub fn set_link_with_albedo(&mut self, link: bool) {
        if self.link_with_albedo != link {
            self.link_with_albedo = link;
            (self.on_change)();
        }
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Uniform-only property, no variant change
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Uniform-only property, no variant change
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    pub fn texture(&self) -> Option<&Arc<dyn Texture>> {
        self.texture.as_ref()
    }

    /// Attach or detach the sheen texture (compared by identity)
    pub fn set_texture(&mut self, texture: Option<Arc<dyn Texture>>) {
        let unchanged = match (&self.texture, &texture) {
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            log::debug!(
                "Sheen texture {:?}",
                texture.as_ref().map(|t| t.name().to_string())
            );
            self.texture = texture;
            (self.on_change)();
        }
    }

    /// Texture to sample given the scene's per-feature texture switch
    fn sampled_texture(&self, caps: &SceneCapabilities) -> Option<&Arc<dyn Texture>> {
        self.texture
            .as_ref()
            .filter(|_| caps.feature_textures_enabled(TextureFlags::SHEEN))
    }

    /// Append the uniform names the sheen block writes
    pub fn add_uniforms(uniforms: &mut Vec<String>) {
        uniforms.extend([uniform::COLOR, uniform::INFOS, uniform::MATRIX].map(String::from));
    }

    /// Append the sampler names the sheen block binds
    pub fn add_samplers(samplers: &mut Vec<String>) {
        samplers.push(uniform::SAMPLER.to_string());
    }

    /// Declare the sheen uniforms in the material's uniform block
    pub fn prepare_uniform_buffer(staging: &mut UniformStaging) {
        staging.add_uniform(uniform::COLOR, 4);
        staging.add_uniform(uniform::INFOS, 2);
        staging.add_uniform(uniform::MATRIX, 16);
    }

    /// Register the sheen fallback when the lobe is compiled in, returning
    /// the next free rank
    pub fn add_fallbacks(
        defines: &MaterialDefines,
        fallbacks: &mut EffectFallbacks,
        rank: u32,
    ) -> u32 {
        if defines.get_bool(define::SHEEN) {
            fallbacks.add_fallback(rank, define::SHEEN);
            return rank + 1;
        }
        rank
    }
}

impl MaterialFeature for SheenFeature {
    fn name(&self) -> &str {
        "sheen"
    }

    fn is_ready(&self, defines: &MaterialDefines, caps: &SceneCapabilities) -> bool {
        if !defines.are_textures_dirty() || !caps.textures_enabled {
            return true;
        }

        self.sampled_texture(caps)
            .map_or(true, |texture| texture.is_ready_or_not_blocking())
    }

    fn prepare_defines(&self, defines: &mut MaterialDefines, caps: &SceneCapabilities) {
        if !self.enabled {
            defines.set_bool(define::SHEEN, false);
            defines.set_bool(define::TEXTURE, false);
            defines.set_bool(define::LINK_WITH_ALBEDO, false);
            return;
        }

        defines.set_bool(define::SHEEN, true);
        defines.set_bool(define::LINK_WITH_ALBEDO, self.link_with_albedo);

        // Texture switches only move when the host flagged textures dirty
        if defines.are_textures_dirty() && caps.textures_enabled {
            match self.sampled_texture(caps) {
                Some(texture) => {
                    prepare_defines_for_merged_uv(texture.as_ref(), defines, define::TEXTURE)
                }
                None => defines.set_bool(define::TEXTURE, false),
            }
        }
    }

    fn bind(&self, uniforms: &mut dyn UniformBuffer, caps: &SceneCapabilities, is_frozen: bool) {
        let texture = self.sampled_texture(caps);

        if !uniforms.uses_uniform_block() || !is_frozen || !uniforms.is_synchronized() {
            if let Some(texture) = texture {
                uniforms.update_float2(
                    uniform::INFOS,
                    texture.coordinates_index() as f32,
                    texture.level(),
                );
                bind_texture_matrix(texture.as_ref(), uniforms, MATRIX_KEY);
            }
            uniforms.update_float4(
                uniform::COLOR,
                self.color.x,
                self.color.y,
                self.color.z,
                self.intensity,
            );
        } else {
            log::trace!("Sheen uniforms frozen and synchronized, skipping writes");
        }

        if caps.textures_enabled {
            if let Some(texture) = texture {
                uniforms.set_texture(uniform::SAMPLER, texture);
            }
        }
    }

    fn add_fallbacks(
        &self,
        defines: &MaterialDefines,
        fallbacks: &mut EffectFallbacks,
        rank: u32,
    ) -> u32 {
        SheenFeature::add_fallbacks(defines, fallbacks, rank)
    }

    fn declared_defines(&self) -> &'static [&'static str] {
        define::ALL
    }

    fn declare_uniforms(&self, uniforms: &mut Vec<String>) {
        SheenFeature::add_uniforms(uniforms);
    }

    fn declare_samplers(&self, samplers: &mut Vec<String>) {
        SheenFeature::add_samplers(samplers);
    }

    fn declare_uniform_layout(&self, uniforms: &mut UniformStaging) {
        SheenFeature::prepare_uniform_buffer(uniforms);
    }

    fn has_texture(&self, texture: &Arc<dyn Texture>) -> bool {
        self.texture
            .as_ref()
            .map_or(false, |current| Arc::ptr_eq(current, texture))
    }

    fn collect_active_textures(&self, textures: &mut Vec<Arc<dyn Texture>>) {
        if let Some(texture) = &self.texture {
            textures.push(texture.clone());
        }
    }

    fn collect_animatables(&self, animatables: &mut Vec<Arc<dyn Texture>>) {
        if let Some(texture) = &self.texture {
            if texture.animation_count() > 0 {
                animatables.push(texture.clone());
            }
        }
    }

    fn dispose(&mut self, force_dispose_textures: bool) {
        if !force_dispose_textures {
            return;
        }
        if let Some(texture) = &self.texture {
            log::info!("Disposing sheen texture '{}'", texture.name());
            texture.dispose();
        }
    }
}

impl fmt::Debug for SheenFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheenFeature")
            .field("enabled", &self.enabled)
            .field("link_with_albedo", &self.link_with_albedo)
            .field("intensity", &self.intensity)
            .field("color", &self.color)
            .field("texture", &self.texture.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helio_features::ImageTexture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (SheenFeature, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let feature = SheenFeature::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (feature, calls)
    }

    #[test]
    fn defaults() {
        let (sheen, _) = counting();
        assert!(!sheen.is_enabled());
        assert!(!sheen.link_with_albedo());
        assert_eq!(sheen.intensity(), 1.0);
        assert_eq!(sheen.color(), Vec3::ONE);
        assert!(sheen.texture().is_none());
    }

    #[test]
    fn variant_setters_notify_only_on_change() {
        let (mut sheen, calls) = counting();

        sheen.set_enabled(true);
        sheen.set_enabled(true);
        sheen.set_link_with_albedo(true);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let texture = ImageTexture::loaded("sheen.png").into_shared();
        sheen.set_texture(Some(texture.clone()));
        sheen.set_texture(Some(texture));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        sheen.set_texture(None);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn uniform_setters_do_not_notify() {
        let (mut sheen, calls) = counting();
        sheen.set_intensity(0.3);
        sheen.set_color(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn registration_helpers_list_owned_names() {
        let mut names = Vec::new();
        SheenFeature::add_uniforms(&mut names);
        SheenFeature::add_samplers(&mut names);
        assert_eq!(names, ["vSheenColor", "vSheenInfos", "sheenMatrix", "sheenSampler"]);

        let mut staging = UniformStaging::new("sheen");
        SheenFeature::prepare_uniform_buffer(&mut staging);
        assert_eq!(
            staging.uniform_names().collect::<Vec<_>>(),
            ["vSheenColor", "vSheenInfos", "sheenMatrix"]
        );
    }

    #[test]
    fn fallback_rank_advances_only_when_active() {
        let mut fallbacks = EffectFallbacks::new();
        let mut defines = MaterialDefines::new();

        assert_eq!(SheenFeature::add_fallbacks(&defines, &mut fallbacks, 2), 2);
        assert!(fallbacks.is_empty());

        defines.set_bool(define::SHEEN, true);
        assert_eq!(SheenFeature::add_fallbacks(&defines, &mut fallbacks, 2), 3);
        assert_eq!(fallbacks.defines_at(2), ["SHEEN".to_string()]);
    }

    #[test]
    fn debug_shows_texture_name() {
        let (sheen, _) = counting();
        let sheen = sheen.with_texture(ImageTexture::loaded("velvet.png").into_shared());
        assert!(format!("{:?}", sheen).contains("velvet.png"));
    }
}
