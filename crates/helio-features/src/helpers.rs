//! Shading helpers shared by texture-carrying feature blocks

use crate::{is_identity_as_3x2, MaterialDefines, Texture, UniformBuffer};

/// Enable the texture define `key` and select how its UVs are fetched.
///
/// Untransformed textures read their UV channel directly
/// (`{key}DIRECTUV = channel + 1` plus `MAINUV{channel + 1}`); textures with
/// a UV transform go through `{key}Matrix` and get `{key}DIRECTUV = 0`.
pub fn prepare_defines_for_merged_uv(
    texture: &dyn Texture,
    defines: &mut MaterialDefines,
    key: &str,
) {
    defines.set_needs_uvs(true);
    defines.set_bool(key, true);

    let direct_uv = format!("{}DIRECTUV", key);
    if is_identity_as_3x2(&texture.texture_matrix()) {
        let channel = texture.coordinates_index() + 1;
        defines.set_u32(&direct_uv, channel);
        defines.set_bool(&format!("MAINUV{}", channel), true);
    } else {
        defines.set_u32(&direct_uv, 0);
    }
}

/// Write the UV transform of `texture` into `{key}Matrix`
pub fn bind_texture_matrix(texture: &dyn Texture, uniforms: &mut dyn UniformBuffer, key: &str) {
    uniforms.update_matrix(&format!("{}Matrix", key), &texture.texture_matrix());
}
