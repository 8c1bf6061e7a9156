//! Asset loading: OBJ models, textures, and built-in geometry.

pub mod image_loader;
pub mod obj_loader;

use thiserror::Error;

use crate::render::vertex::Vertex;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to load OBJ model: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),
    #[error("model contains no geometry: {0}")]
    EmptyModel(String),
}

/// CPU-side mesh: interleaved vertices plus a u32 index list.
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Two stacked quads with per-corner colors, half a unit apart in depth.
    ///
    /// Serves as a fixed reference object for eyeballing the depth test and
    /// vertex color interpolation alongside the textured model.
    pub fn reference_quads() -> Self {
        let quad = |z: f32| {
            [
                Vertex {
                    position: [-0.5, -0.5, z],
                    color: [1.0, 0.0, 0.0],
                    tex_coord: [1.0, 0.0],
                },
                Vertex {
                    position: [0.5, -0.5, z],
                    color: [0.0, 1.0, 0.0],
                    tex_coord: [0.0, 0.0],
                },
                Vertex {
                    position: [0.5, 0.5, z],
                    color: [0.0, 0.0, 1.0],
                    tex_coord: [0.0, 1.0],
                },
                Vertex {
                    position: [-0.5, 0.5, z],
                    color: [1.0, 1.0, 1.0],
                    tex_coord: [1.0, 1.0],
                },
            ]
        };

        let mut vertices = Vec::with_capacity(8);
        vertices.extend_from_slice(&quad(0.0));
        vertices.extend_from_slice(&quad(-0.5));

        // Both quads plus a bridge strip connecting them, so the depth
        // relationship between the planes is visible edge-on
        let indices = vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4, 4, 7, 2];

        Self { vertices, indices }
    }
}

/// Decoded RGBA8 texture data.
pub struct ImageData {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_quads_shape() {
        let mesh = MeshData::reference_quads();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 15);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }

    #[test]
    fn reference_quads_sit_on_two_depth_planes() {
        let mesh = MeshData::reference_quads();
        let front = mesh.vertices.iter().filter(|v| v.position[2] == 0.0).count();
        let back = mesh.vertices.iter().filter(|v| v.position[2] == -0.5).count();
        assert_eq!(front, 4);
        assert_eq!(back, 4);
    }
}
