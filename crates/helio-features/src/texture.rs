//! Texture resources as seen by feature blocks
//!
//! Feature blocks never load or decode textures. They hold shared references
//! and poll them: readiness is a non-blocking query, the host's loader flips
//! it once the upload finished.

use glam::Mat4;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Texture resource consumed by material features
pub trait Texture: Send + Sync {
    /// Identifier used when a material is serialized
    fn name(&self) -> &str;

    /// True once the texture can be sampled, or when the host allows drawing
    /// while it is still streaming in
    fn is_ready_or_not_blocking(&self) -> bool;

    /// UV channel sampled by this texture (0-based)
    fn coordinates_index(&self) -> u32;

    /// Intensity multiplier applied to the sampled value
    fn level(&self) -> f32;

    /// UV transform applied before sampling
    fn texture_matrix(&self) -> Mat4;

    /// Number of animation tracks driving this texture
    fn animation_count(&self) -> usize;

    /// Release the GPU resource
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// True when `m` leaves UV coordinates untouched.
///
/// Only the 2D part of the matrix matters for UVs, but the remaining
/// entries must still be identity except the z scale.
pub fn is_identity_as_3x2(m: &Mat4) -> bool {
    let c = m.to_cols_array();

    if c[0] != 1.0 || c[5] != 1.0 || c[15] != 1.0 {
        return false;
    }

    [1, 2, 3, 4, 6, 7, 8, 9, 11, 12, 13, 14]
        .iter()
        .all(|&i| c[i] == 0.0)
}

#[derive(Debug)]
struct LoadState {
    ready: bool,
    non_blocking: bool,
    disposed: bool,
}

/// Image texture shared between materials
#[derive(Debug)]
pub struct ImageTexture {
    name: String,
    coordinates_index: u32,
    level: f32,
    matrix: Mat4,
    animations: Vec<String>,
    state: RwLock<LoadState>,
}

impl ImageTexture {
    /// A texture whose data is still loading
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates_index: 0,
            level: 1.0,
            matrix: Mat4::IDENTITY,
            animations: Vec::new(),
            state: RwLock::new(LoadState {
                ready: false,
                non_blocking: false,
                disposed: false,
            }),
        }
    }

    /// A texture whose data is already resident
    pub fn loaded(name: impl Into<String>) -> Self {
        let texture = Self::new(name);
        texture.set_ready(true);
        texture
    }

    pub fn with_coordinates_index(mut self, index: u32) -> Self {
        self.coordinates_index = index;
        self
    }

    pub fn with_level(mut self, level: f32) -> Self {
        self.level = level;
        self
    }

    pub fn with_matrix(mut self, matrix: Mat4) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_animation(mut self, track: impl Into<String>) -> Self {
        self.animations.push(track.into());
        self
    }

    /// Allow drawing before the data arrived (falls back to a placeholder)
    pub fn with_non_blocking(self, non_blocking: bool) -> Self {
        self.state.write().non_blocking = non_blocking;
        self
    }

    /// Called by the loader when the upload completes
    pub fn set_ready(&self, ready: bool) {
        self.state.write().ready = ready;
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().ready
    }

    pub fn into_shared(self) -> Arc<dyn Texture> {
        Arc::new(self)
    }
}

impl Texture for ImageTexture {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_ready_or_not_blocking(&self) -> bool {
        let state = self.state.read();
        !state.disposed && (state.ready || state.non_blocking)
    }

    fn coordinates_index(&self) -> u32 {
        self.coordinates_index
    }

    fn level(&self) -> f32 {
        self.level
    }

    fn texture_matrix(&self) -> Mat4 {
        self.matrix
    }

    fn animation_count(&self) -> usize {
        self.animations.len()
    }

    fn dispose(&self) {
        let mut state = self.state.write();
        if !state.disposed {
            log::debug!("Disposing texture '{}'", self.name);
            state.disposed = true;
            state.ready = false;
        }
    }

    fn is_disposed(&self) -> bool {
        self.state.read().disposed
    }
}

/// Shared textures by name, used to resolve serialized references
#[derive(Default)]
pub struct TextureLibrary {
    textures: HashMap<String, Arc<dyn Texture>>,
}

impl TextureLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a texture under its own name, replacing any previous entry
    pub fn insert(&mut self, texture: Arc<dyn Texture>) {
        self.textures.insert(texture.name().to_string(), texture);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Texture>> {
        self.textures.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
