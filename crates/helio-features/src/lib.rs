//! Helio material features
//!
//! A material is composed from independent feature blocks (sheen, clear coat,
//! anisotropy, ...). Each block owns a handful of shader defines, uniforms and
//! samplers, and plugs into the host material through the same protocol:
//!
//! 1. `is_ready()` - can the block be used this frame (textures loaded)?
//! 2. `prepare_defines()` - select the shader variant when defines are stale
//! 3. `bind()` - push parameters into the shared uniform staging buffer
//!
//! This crate holds the contracts every block consumes from the host:
//! the defines record, the uniform staging buffer, texture resources,
//! scene capabilities and the shared shading helpers.

mod capabilities;
mod defines;
mod fallbacks;
mod helpers;
mod registry;
mod texture;
mod traits;
mod uniforms;

pub use capabilities::{SceneCapabilities, TextureFlags};
pub use defines::{MaterialDefines, ShaderDefine};
pub use fallbacks::EffectFallbacks;
pub use helpers::{bind_texture_matrix, prepare_defines_for_merged_uv};
pub use registry::MaterialFeatureRegistry;
pub use texture::{is_identity_as_3x2, ImageTexture, Texture, TextureLibrary};
pub use traits::{AsAny, ChangeCallback, MaterialFeature};
pub use uniforms::{UniformBuffer, UniformStaging};

/// Result type for feature operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised outside the per-frame render path
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Feature error: {0}")]
    Feature(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
