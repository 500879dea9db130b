use crate::math::{Footprint, TexelRect, UvRect};
use bevy::{prelude::*, render::primitives::Aabb};

/// The index of a chunk, assigned in pre-order while the quadtree is built.
/// Indices are dense, the root is always `0`.
pub type ChunkIndex = u32;

/// A node of the [`TerrainQuadtree`](super::TerrainQuadtree).
///
/// Each chunk is rendered with the common grid, stretched over its footprint via the
/// `world_transform` and displaced by the part of the heightmap described by the `uv_range`.
/// A chunk is either a leaf or owns exactly four children, one per quadrant of its footprint.
/// Chunks are immutable once the quadtree is built.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub(crate) index: ChunkIndex,
    /// Non-owning handle of the parent, only used for upward queries.
    pub(crate) parent: Option<ChunkIndex>,
    pub(crate) depth: u32,
    pub(crate) footprint: Footprint,
    pub(crate) texels: TexelRect,
    pub(crate) world_transform: Mat4,
    pub(crate) uv_range: UvRect,
    pub(crate) aabb: Aabb,
    pub(crate) geometric_error: f32,
    pub(crate) split_distance: f32,
    /// The number of chunks in the subtree rooted at this chunk, including itself.
    pub(crate) subtree_size: u32,
    pub(crate) children: Option<Box<[Chunk; 4]>>,
}

impl Chunk {
    #[inline]
    pub fn index(&self) -> ChunkIndex {
        self.index
    }

    #[inline]
    pub fn parent(&self) -> Option<ChunkIndex> {
        self.parent
    }

    /// The distance to the root, which has a depth of zero.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    /// The resting position of the chunk, at height zero.
    #[inline]
    pub fn center_position(&self) -> Vec3 {
        self.footprint.position()
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.footprint.scale
    }

    /// The heightmap texels covered by the chunk.
    #[inline]
    pub fn texels(&self) -> TexelRect {
        self.texels
    }

    #[inline]
    pub fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    #[inline]
    pub fn uv_range(&self) -> UvRect {
        self.uv_range
    }

    /// The box enclosing the chunk and all of its descendants, used for culling.
    #[inline]
    pub fn bounding_box(&self) -> &Aabb {
        &self.aabb
    }

    /// The largest height deviation between the surface rendered by this chunk
    /// and the heightmap, which is never smaller than the error of any descendant.
    #[inline]
    pub fn geometric_error(&self) -> f32 {
        self.geometric_error
    }

    /// Viewers closer than this distance exceed the maximum screen space error
    /// and have to use the children instead.
    #[inline]
    pub fn split_distance(&self) -> f32 {
        self.split_distance
    }

    #[inline]
    pub fn subtree_size(&self) -> u32 {
        self.subtree_size
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    #[inline]
    pub fn children(&self) -> Option<&[Chunk; 4]> {
        self.children.as_deref()
    }

    /// The chunks of the subtree rooted at this chunk in pre-order, which is the index order.
    pub fn iter(&self) -> ChunkIter<'_> {
        ChunkIter { stack: vec![self] }
    }

    /// The draw record handed to the renderer.
    pub fn draw(&self) -> ChunkDraw {
        ChunkDraw {
            index: self.index,
            depth: self.depth,
            world_transform: self.world_transform,
            uv_range: self.uv_range,
        }
    }
}

/// Pre-order traversal of a chunk subtree, driven by an explicit stack.
pub struct ChunkIter<'a> {
    stack: Vec<&'a Chunk>,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = &'a Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.stack.pop()?;

        if let Some(children) = chunk.children() {
            self.stack.extend(children.iter().rev());
        }

        Some(chunk)
    }
}

/// Everything needed to draw a chunk with the common grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkDraw {
    pub index: ChunkIndex,
    pub depth: u32,
    pub world_transform: Mat4,
    pub uv_range: UvRect,
}
