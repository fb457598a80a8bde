//! Feature registry composing the feature blocks of one material

use crate::{
    EffectFallbacks, Error, MaterialDefines, MaterialFeature, Result, SceneCapabilities, Texture,
    UniformBuffer, UniformStaging,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered set of feature blocks owned by a material.
///
/// Registration order is binding order and fallback rank order.
pub struct MaterialFeatureRegistry {
    features: Vec<Box<dyn MaterialFeature>>,
    owned_names: HashSet<String>,
}

impl MaterialFeatureRegistry {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            owned_names: HashSet::new(),
        }
    }

    /// Register a feature.
    ///
    /// Fails when the feature name, or any define, uniform or sampler it
    /// declares, is already owned by a registered feature.
    pub fn register(&mut self, feature: Box<dyn MaterialFeature>) -> Result<()> {
        if self.features.iter().any(|f| f.name() == feature.name()) {
            return Err(Error::Feature(format!(
                "Feature '{}' already registered",
                feature.name()
            )));
        }

        let mut names: Vec<String> = feature
            .declared_defines()
            .iter()
            .map(|d| d.to_string())
            .collect();
        feature.declare_uniforms(&mut names);
        feature.declare_samplers(&mut names);

        if let Some(taken) = names.iter().find(|n| self.owned_names.contains(*n)) {
            return Err(Error::Feature(format!(
                "Feature '{}' declares '{}' which is owned by another feature",
                feature.name(),
                taken
            )));
        }

        log::debug!("Registered material feature '{}' ({} names)", feature.name(), names.len());
        self.owned_names.extend(names);
        self.features.push(feature);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Get a feature by name
    pub fn get(&self, name: &str) -> Option<&dyn MaterialFeature> {
        self.features
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    /// Get a mutable reference to a specific feature by type
    pub fn get_typed_mut<T: MaterialFeature + 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.features
            .iter_mut()
            .find(|f| f.name() == name)
            .and_then(|f| f.as_any_mut().downcast_mut::<T>())
    }

    /// True when every feature is ready
    pub fn is_ready(&self, defines: &MaterialDefines, caps: &SceneCapabilities) -> bool {
        self.features.iter().all(|f| f.is_ready(defines, caps))
    }

    pub fn prepare_defines(&self, defines: &mut MaterialDefines, caps: &SceneCapabilities) {
        for feature in &self.features {
            feature.prepare_defines(defines, caps);
        }
    }

    pub fn bind(
        &self,
        uniforms: &mut dyn UniformBuffer,
        caps: &SceneCapabilities,
        is_frozen: bool,
    ) {
        for feature in &self.features {
            feature.bind(uniforms, caps, is_frozen);
        }
    }

    /// Register fallbacks of every feature, returning the next free rank
    pub fn add_fallbacks(
        &self,
        defines: &MaterialDefines,
        fallbacks: &mut EffectFallbacks,
        rank: u32,
    ) -> u32 {
        self.features
            .iter()
            .fold(rank, |rank, f| f.add_fallbacks(defines, fallbacks, rank))
    }

    /// Declare the uniform layout of every feature
    pub fn prepare_uniform_buffer(&self, uniforms: &mut UniformStaging) {
        for feature in &self.features {
            feature.declare_uniform_layout(uniforms);
        }
    }

    pub fn uniform_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for feature in &self.features {
            feature.declare_uniforms(&mut names);
        }
        names
    }

    pub fn sampler_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for feature in &self.features {
            feature.declare_samplers(&mut names);
        }
        names
    }

    pub fn has_texture(&self, texture: &Arc<dyn Texture>) -> bool {
        self.features.iter().any(|f| f.has_texture(texture))
    }

    pub fn active_textures(&self) -> Vec<Arc<dyn Texture>> {
        let mut textures = Vec::new();
        for feature in &self.features {
            feature.collect_active_textures(&mut textures);
        }
        textures
    }

    pub fn animatables(&self) -> Vec<Arc<dyn Texture>> {
        let mut animatables = Vec::new();
        for feature in &self.features {
            feature.collect_animatables(&mut animatables);
        }
        animatables
    }

    pub fn dispose(&mut self, force_dispose_textures: bool) {
        for feature in &mut self.features {
            feature.dispose(force_dispose_textures);
        }
    }
}

impl Default for MaterialFeatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TintFeature {
        name: &'static str,
        enabled: bool,
    }

    impl MaterialFeature for TintFeature {
        fn name(&self) -> &str {
            self.name
        }

        fn prepare_defines(&self, defines: &mut MaterialDefines, _caps: &SceneCapabilities) {
            defines.set_bool("TINT", self.enabled);
        }

        fn bind(
            &self,
            uniforms: &mut dyn UniformBuffer,
            _caps: &SceneCapabilities,
            _is_frozen: bool,
        ) {
            uniforms.update_float4("vTintColor", 1.0, 0.0, 0.0, 1.0);
        }

        fn add_fallbacks(
            &self,
            defines: &MaterialDefines,
            fallbacks: &mut EffectFallbacks,
            rank: u32,
        ) -> u32 {
            if defines.get_bool("TINT") {
                fallbacks.add_fallback(rank, "TINT");
                return rank + 1;
            }
            rank
        }

        fn declared_defines(&self) -> &'static [&'static str] {
            &["TINT"]
        }

        fn declare_uniforms(&self, uniforms: &mut Vec<String>) {
            uniforms.push("vTintColor".into());
        }

        fn declare_uniform_layout(&self, uniforms: &mut UniformStaging) {
            uniforms.add_uniform("vTintColor", 4);
        }
    }

    fn tint(name: &'static str) -> Box<dyn MaterialFeature> {
        Box::new(TintFeature { name, enabled: true })
    }

    #[test]
    fn colliding_declarations_are_rejected() {
        let mut registry = MaterialFeatureRegistry::new();
        registry.register(tint("tint")).unwrap();

        let err = registry.register(tint("tint_again")).unwrap_err();
        assert!(err.to_string().contains("TINT"));
        assert!(registry.register(tint("tint")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn composite_pass_runs_every_feature() {
        let mut registry = MaterialFeatureRegistry::new();
        registry.register(tint("tint")).unwrap();

        let caps = SceneCapabilities::default();
        let mut defines = MaterialDefines::new();
        let mut ubo = UniformStaging::new("material");
        registry.prepare_uniform_buffer(&mut ubo);

        assert!(registry.is_ready(&defines, &caps));
        registry.prepare_defines(&mut defines, &caps);
        registry.bind(&mut ubo, &caps, false);

        assert!(defines.get_bool("TINT"));
        assert_eq!(ubo.float4("vTintColor"), Some([1.0, 0.0, 0.0, 1.0]));

        let mut fallbacks = EffectFallbacks::new();
        assert_eq!(registry.add_fallbacks(&defines, &mut fallbacks, 3), 4);
        assert_eq!(fallbacks.defines_at(3), ["TINT".to_string()]);
    }

    #[test]
    fn typed_access_downcasts() {
        let mut registry = MaterialFeatureRegistry::new();
        registry.register(tint("tint")).unwrap();

        let feature = registry.get_typed_mut::<TintFeature>("tint").unwrap();
        feature.enabled = false;

        let mut defines = MaterialDefines::new();
        registry.prepare_defines(&mut defines, &SceneCapabilities::default());
        assert!(!defines.get_bool("TINT"));
    }
}
