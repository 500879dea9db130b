use bevy::{
    prelude::*,
    render::{mesh::Indices, render_asset::RenderAssetUsages, render_resource::PrimitiveTopology},
};
use itertools::iproduct;

#[inline]
fn add_quad(indices: &mut Vec<u32>, a: u32, b: u32, c: u32, d: u32, wireframe: bool) {
    if wireframe {
        indices.extend([a, b, b, c, c, a, a, d, d, c]);
    } else {
        // counter clockwise when viewed from above
        indices.extend([a, d, c, a, c, b]);
    }
}

fn generate_positions(size: u32) -> Vec<[f32; 3]> {
    iproduct!(0..=size, 0..=size)
        .map(|(z, x)| {
            [
                2.0 * x as f32 / size as f32 - 1.0,
                0.0,
                2.0 * z as f32 / size as f32 - 1.0,
            ]
        })
        .collect()
}

fn generate_uvs(size: u32) -> Vec<[f32; 2]> {
    iproduct!(0..=size, 0..=size)
        .map(|(z, x)| [x as f32 / size as f32, z as f32 / size as f32])
        .collect()
}

fn generate_indices(size: u32, wireframe: bool) -> Vec<u32> {
    let mut indices = Vec::new();

    for i in iproduct!(0..size, 0..size).map(|(z, x)| x + z * (size + 1)) {
        add_quad(
            &mut indices,
            i,
            i + 1,
            i + size + 2,
            i + size + 1,
            wireframe,
        );
    }

    indices
}

/// The common grid every chunk is rendered with.
///
/// The grid has `size` cells per side and spans `[-1, 1]` in x and z at height zero,
/// with uvs from zero to one. The world transform of a chunk stretches it over the chunk
/// footprint, while its uv range selects the part of the heightmap it is displaced by.
pub struct GridMesh {
    wireframe: bool,
    positions: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl GridMesh {
    pub fn new(size: u32, wireframe: bool) -> Self {
        let size = size.max(1);

        Self {
            wireframe,
            positions: generate_positions(size),
            uvs: generate_uvs(size),
            indices: generate_indices(size, wireframe),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn into_mesh(self) -> Mesh {
        let topology = if self.wireframe {
            PrimitiveTopology::LineList
        } else {
            PrimitiveTopology::TriangleList
        };

        // the surface is flat until it is displaced
        let normals = vec![[0.0, 1.0, 0.0]; self.positions.len()];

        Mesh::new(topology, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, self.positions)
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
            .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs)
            .with_inserted_indices(Indices::U32(self.indices))
    }
}

/// Creates the triangle mesh of the common grid.
pub fn grid_mesh(grid_size: u32) -> Mesh {
    GridMesh::new(grid_size, false).into_mesh()
}
