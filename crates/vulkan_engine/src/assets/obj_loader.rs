//! Wavefront OBJ loading with bitwise vertex deduplication.
//!
//! OBJ files index positions and texture coordinates independently, so the
//! same final vertex can appear under many index combinations. Vertices are
//! deduplicated by their exact bit pattern while the flat vertex/index pair
//! the GPU wants is built up.

use std::collections::HashMap;
use std::path::Path;

use crate::assets::{AssetError, MeshData};
use crate::render::vertex::Vertex;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load every mesh in an OBJ file into one vertex/index pair.
pub fn load_obj(path: &Path) -> Result<MeshData, AssetError> {
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    let mesh = convert(&models);
    if mesh.indices.is_empty() {
        return Err(AssetError::EmptyModel(path.display().to_string()));
    }
    log::info!(
        "loaded {}: {} unique vertices, {} indices",
        path.display(),
        mesh.vertices.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

/// Flatten loaded models, deduplicating identical vertices.
///
/// Faces without texture coordinates sample the texture origin; the V axis is
/// flipped to match the top-left image origin.
fn convert(models: &[tobj::Model]) -> MeshData {
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut seen: HashMap<[u32; 8], u32> = HashMap::new();

    for model in models {
        let mesh = &model.mesh;
        for (corner, &position_index) in mesh.indices.iter().enumerate() {
            let p = position_index as usize * 3;
            let tex_coord = if mesh.texcoord_indices.is_empty() || mesh.texcoords.is_empty() {
                [0.0, 0.0]
            } else {
                let t = mesh.texcoord_indices[corner] as usize * 2;
                [mesh.texcoords[t], 1.0 - mesh.texcoords[t + 1]]
            };

            let vertex = Vertex {
                position: [
                    mesh.positions[p],
                    mesh.positions[p + 1],
                    mesh.positions[p + 2],
                ],
                color: [1.0, 1.0, 1.0],
                tex_coord,
            };

            let next_index = vertices.len() as u32;
            let index = *seen.entry(vertex.dedup_key()).or_insert_with(|| {
                vertices.push(vertex);
                next_index
            });
            indices.push(index);
        }
    }

    MeshData { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load_from_str(obj: &str) -> MeshData {
        let (models, _) = tobj::load_obj_buf(&mut Cursor::new(obj), &load_options(), |_| {
            Ok((Vec::new(), Default::default()))
        })
        .unwrap();
        convert(&models)
    }

    #[test]
    fn triangle_loads_three_vertices() {
        let mesh = load_from_str(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 0 1\n\
             f 1/1 2/2 3/3\n",
        );
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn shared_vertices_are_deduplicated() {
        // Two triangles forming a quad share an edge; the shared corners
        // must collapse to single vertices
        let mesh = load_from_str(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             f 1/1 2/2 3/3\nf 3/3 4/4 1/1\n",
        );
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn same_position_different_uv_stays_distinct() {
        let mesh = load_from_str(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 0\nvt 1 1\n\
             f 1/1 2/1 3/1\nf 1/2 2/1 3/1\n",
        );
        // Corner 1 appears with two different texture coordinates
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn missing_texcoords_default_to_origin() {
        let mesh = load_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert_eq!(mesh.vertices.len(), 3);
        assert!(mesh.vertices.iter().all(|v| v.tex_coord == [0.0, 0.0]));
    }

    #[test]
    fn v_axis_is_flipped() {
        let mesh = load_from_str(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 0.25\nvt 0 0.25\nvt 0 0.25\n\
             f 1/1 2/2 3/3\n",
        );
        assert_eq!(mesh.vertices[0].tex_coord[1], 0.75);
    }
}
