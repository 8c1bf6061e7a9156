//! Vertex format shared by the model importer and the graphics pipeline.

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// Interleaved vertex: position, flat color, texture coordinate.
///
/// `#[repr(C)]` and `Pod` so vertex slices can be uploaded byte-for-byte;
/// the layout matches the pipeline's attribute descriptions below.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Per-vertex color, used when the fragment has no meaningful texture
    pub color: [f32; 3],
    /// Texture coordinate
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Binding description: one interleaved per-vertex buffer at binding 0.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Attribute descriptions for position (location 0), color (location 1),
    /// and texture coordinate (location 2).
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 3] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32_SFLOAT,
                offset: 24,
            },
        ]
    }

    /// Bitwise key for deduplication during model import.
    ///
    /// Float equality is the wrong tool for a hash map; identical source
    /// vertices have identical bit patterns, which is exactly what OBJ
    /// re-indexing needs.
    pub fn dedup_key(&self) -> [u32; 8] {
        [
            self.position[0].to_bits(),
            self.position[1].to_bits(),
            self.position[2].to_bits(),
            self.color[0].to_bits(),
            self.color[1].to_bits(),
            self.color[2].to_bits(),
            self.tex_coord[0].to_bits(),
            self.tex_coord[1].to_bits(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(Vertex::binding_description().stride, 32);
    }

    #[test]
    fn attribute_offsets_match_field_layout() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[2].offset, 24);
        assert_eq!(attrs[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[2].format, vk::Format::R32G32_SFLOAT);
    }

    #[test]
    fn dedup_key_distinguishes_vertices() {
        let a = Vertex {
            position: [0.0, 1.0, 2.0],
            color: [1.0, 1.0, 1.0],
            tex_coord: [0.5, 0.5],
        };
        let mut b = a;
        assert_eq!(a.dedup_key(), b.dedup_key());

        b.tex_coord[1] = 0.25;
        assert_ne!(a.dedup_key(), b.dedup_key());
    }
}
