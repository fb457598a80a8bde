//! Uniform staging buffer shared by all feature blocks of a material
//!
//! Every block declares the uniforms it owns up front
//! (`prepare_uniform_buffer`), then writes them by name during `bind()`.
//! The host uploads the staged floats to the GPU uniform block with
//! [`UniformStaging::flush`].

use crate::Texture;
use glam::Mat4;
use std::collections::HashMap;
use std::sync::Arc;

/// Uniform staging contract used by feature blocks during `bind()`
pub trait UniformBuffer {
    /// Whether values live in a uniform block object (as opposed to loose
    /// uniforms that must be re-set every draw)
    fn uses_uniform_block(&self) -> bool;

    /// True when the staged values already match what the GPU holds
    fn is_synchronized(&self) -> bool;

    fn update_float2(&mut self, name: &str, x: f32, y: f32);

    fn update_float4(&mut self, name: &str, x: f32, y: f32, z: f32, w: f32);

    fn update_matrix(&mut self, name: &str, matrix: &Mat4);

    /// Bind `texture` to the sampler slot `name`
    fn set_texture(&mut self, name: &str, texture: &Arc<dyn Texture>);
}

#[derive(Debug, Clone, Copy)]
struct UniformSlot {
    offset: usize,
    size: usize,
}

/// CPU mirror of a material's uniform block
pub struct UniformStaging {
    label: String,
    use_uniform_block: bool,
    slots: HashMap<String, UniformSlot>,
    order: Vec<String>,
    data: Vec<f32>,
    needs_sync: bool,
    samplers: HashMap<String, Arc<dyn Texture>>,
    uniform_writes: usize,
    sampler_binds: usize,
}

impl UniformStaging {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            use_uniform_block: true,
            slots: HashMap::new(),
            order: Vec::new(),
            data: Vec::new(),
            needs_sync: true,
            samplers: HashMap::new(),
            uniform_writes: 0,
            sampler_binds: 0,
        }
    }

    pub fn with_uniform_block(mut self, use_uniform_block: bool) -> Self {
        self.use_uniform_block = use_uniform_block;
        self
    }

    /// Declare a uniform of `size` floats.
    ///
    /// Scalars and vec2s align to their own size, everything larger to a
    /// full vec4.
    pub fn add_uniform(&mut self, name: &str, size: usize) {
        if self.slots.contains_key(name) {
            log::warn!("Uniform '{}' declared twice in '{}'", name, self.label);
            return;
        }

        let alignment = if size <= 2 { size.max(1) } else { 4 };
        let padding = (alignment - self.data.len() % alignment) % alignment;
        self.data.resize(self.data.len() + padding, 0.0);

        let offset = self.data.len();
        self.data.resize(offset + size, 0.0);
        self.slots.insert(name.to_string(), UniformSlot { offset, size });
        self.order.push(name.to_string());
        self.needs_sync = true;
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Declared uniform names in declaration order
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Size of the GPU uniform block, padded to 16 bytes
    pub fn size_in_bytes(&self) -> u64 {
        let bytes = (self.data.len() * std::mem::size_of::<f32>()) as u64;
        (bytes + 15) & !15
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Upload pending values into `buffer`; no-op when already synchronized
    pub fn flush(&mut self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        if !self.needs_sync {
            return;
        }
        queue.write_buffer(buffer, 0, self.as_bytes());
        log::trace!("Flushed uniform block '{}' ({} bytes)", self.label, self.data.len() * 4);
        self.needs_sync = false;
    }

    /// Record that the GPU copy matches the staged values (the host
    /// uploaded them through its own path)
    pub fn mark_synchronized(&mut self) {
        self.needs_sync = false;
    }

    pub fn float2(&self, name: &str) -> Option<[f32; 2]> {
        let values = self.read(name, 2)?;
        Some([values[0], values[1]])
    }

    pub fn float4(&self, name: &str) -> Option<[f32; 4]> {
        let values = self.read(name, 4)?;
        Some([values[0], values[1], values[2], values[3]])
    }

    pub fn matrix(&self, name: &str) -> Option<Mat4> {
        self.read(name, 16).map(Mat4::from_cols_slice)
    }

    pub fn sampler(&self, name: &str) -> Option<&Arc<dyn Texture>> {
        self.samplers.get(name)
    }

    /// Number of uniform updates issued since the last counter reset
    pub fn uniform_writes(&self) -> usize {
        self.uniform_writes
    }

    /// Number of sampler bindings issued since the last counter reset
    pub fn sampler_binds(&self) -> usize {
        self.sampler_binds
    }

    pub fn reset_counters(&mut self) {
        self.uniform_writes = 0;
        self.sampler_binds = 0;
    }

    fn read(&self, name: &str, size: usize) -> Option<&[f32]> {
        let slot = self.slots.get(name)?;
        if slot.size < size {
            return None;
        }
        Some(&self.data[slot.offset..slot.offset + size])
    }

    fn write(&mut self, name: &str, values: &[f32]) {
        let Some(slot) = self.slots.get(name).copied() else {
            log::warn!("Write to undeclared uniform '{}' in '{}'", name, self.label);
            return;
        };

        if values.len() > slot.size {
            log::warn!(
                "Uniform '{}' holds {} floats, got {}",
                name,
                slot.size,
                values.len()
            );
            return;
        }

        self.uniform_writes += 1;

        let target = &mut self.data[slot.offset..slot.offset + values.len()];
        if *target != *values {
            target.copy_from_slice(values);
            self.needs_sync = true;
        }
    }
}

impl UniformBuffer for UniformStaging {
    fn uses_uniform_block(&self) -> bool {
        self.use_uniform_block
    }

    fn is_synchronized(&self) -> bool {
        !self.needs_sync
    }

    fn update_float2(&mut self, name: &str, x: f32, y: f32) {
        self.write(name, &[x, y]);
    }

    fn update_float4(&mut self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        self.write(name, &[x, y, z, w]);
    }

    fn update_matrix(&mut self, name: &str, matrix: &Mat4) {
        self.write(name, &matrix.to_cols_array());
    }

    fn set_texture(&mut self, name: &str, texture: &Arc<dyn Texture>) {
        self.sampler_binds += 1;
        self.samplers.insert(name.to_string(), texture.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageTexture;
    use rstest::rstest;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn staging() -> UniformStaging {
        let mut ubo = UniformStaging::new("test");
        ubo.add_uniform("vSheenColor", 4);
        ubo.add_uniform("vSheenInfos", 2);
        ubo.add_uniform("sheenMatrix", 16);
        ubo
    }

    // Offsets in floats: scalars and vec2s align to their size, larger to 4
    #[rstest]
    #[case::scalar(&[1], 16)]
    #[case::scalar_vec2_mat4(&[1, 2, 16], 80)]
    #[case::vec4_vec2_mat4(&[4, 2, 16], 96)]
    #[case::vec2_scalar_vec4(&[2, 1, 4], 32)]
    fn layout_pads_to_uniform_block_alignment(#[case] sizes: &[usize], #[case] expected: u64) {
        let mut ubo = UniformStaging::new("layout");
        for (i, size) in sizes.iter().enumerate() {
            ubo.add_uniform(&format!("u{}", i), *size);
        }

        assert_eq!(ubo.size_in_bytes(), expected);
        assert!(ubo.as_bytes().len() as u64 <= expected);
    }

    #[test]
    fn writes_are_read_back() {
        let mut ubo = staging();
        ubo.update_float4("vSheenColor", 0.5, 0.25, 1.0, 2.0);
        ubo.update_float2("vSheenInfos", 1.0, 0.75);
        ubo.update_matrix("sheenMatrix", &Mat4::from_rotation_z(0.5));

        assert_eq!(ubo.float4("vSheenColor"), Some([0.5, 0.25, 1.0, 2.0]));
        assert_eq!(ubo.float2("vSheenInfos"), Some([1.0, 0.75]));
        assert_eq!(ubo.matrix("sheenMatrix"), Some(Mat4::from_rotation_z(0.5)));
        assert_eq!(ubo.uniform_writes(), 3);
    }

    #[test]
    fn unchanged_values_keep_buffer_synchronized() {
        let mut ubo = staging();
        ubo.update_float4("vSheenColor", 1.0, 1.0, 1.0, 1.0);
        ubo.mark_synchronized();

        ubo.update_float4("vSheenColor", 1.0, 1.0, 1.0, 1.0);
        assert!(ubo.is_synchronized());

        ubo.update_float4("vSheenColor", 1.0, 0.0, 1.0, 1.0);
        assert!(!ubo.is_synchronized());
    }

    #[test]
    fn undeclared_uniforms_are_ignored() {
        init_logging();
        let mut ubo = staging();
        ubo.mark_synchronized();
        ubo.update_float4("vAlbedoColor", 1.0, 0.0, 0.0, 1.0);

        assert!(ubo.float4("vAlbedoColor").is_none());
        assert_eq!(ubo.uniform_writes(), 0);
        assert!(ubo.is_synchronized());
    }

    #[test]
    fn samplers_are_bound_by_name() {
        let mut ubo = staging();
        let texture = ImageTexture::loaded("sheen.png").into_shared();
        ubo.set_texture("sheenSampler", &texture);

        assert!(Arc::ptr_eq(ubo.sampler("sheenSampler").unwrap(), &texture));
        assert_eq!(ubo.sampler_binds(), 1);
    }
}
