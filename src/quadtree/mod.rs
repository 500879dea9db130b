//! The chunk quadtree of a terrain.
//!
//! # Explanation
//! The footprint of the terrain is recursively split into four quadrants, until a chunk
//! is small enough that the common grid samples the heightmap at its native resolution.
//! Every chunk knows its geometric error, the largest height deviation between its coarse
//! grid and the heightmap, which is the basis for choosing the level of detail at runtime.
//!
//! Estimating these errors is expensive, which is why they can be persisted in a
//! [`GeometricErrorCache`] and loaded on subsequent builds of the same terrain.

mod builder;
mod cache;
mod chunk;
mod error_metric;

pub use self::{
    builder::{ErrorSource, QuadtreeBuilder},
    cache::{GeometricErrorCache, CACHE_VERSION},
    chunk::{Chunk, ChunkDraw, ChunkIndex, ChunkIter},
};

use crate::{
    config::TerrainConfig,
    error::{TerrainError, TerrainResult},
    heightmap::Heightmap,
    math::screen_space_error,
};
use bevy::{log::info, math::Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describes the shape of a quadtree and the values its geometric errors depend on.
///
/// Two quadtrees with the same layout have identical topologies and chunk indices.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeLayout {
    /// The side length of the heightmap in texels.
    pub heightmap_size: u32,
    pub grid_size: u32,
    /// The depth of the leaves.
    pub depth: u32,
    pub chunk_count: u32,
    pub terrain_extent: f32,
    pub max_height: f32,
}

impl TreeLayout {
    /// Derives the layout of the quadtree for the heightmap.
    ///
    /// Chunks are subdivided as long as they cover more texels than the grid has cells.
    /// The heightmap has to be square, with a side length of the grid size times a power of two,
    /// so that the grid vertices of every chunk land exactly on texels.
    pub fn new(config: &TerrainConfig, heightmap: &Heightmap) -> TerrainResult<Self> {
        let (width, height) = (heightmap.width(), heightmap.height());
        let grid_size = config.grid_size;

        let mismatch = |reason| TerrainError::ResolutionMismatch {
            width,
            height,
            grid_size,
            reason,
        };

        if width != height {
            return Err(mismatch("the heightmap has to be square"));
        }
        if width < grid_size || width % grid_size != 0 {
            return Err(mismatch(
                "the heightmap size has to be a multiple of the grid size",
            ));
        }
        if !(width / grid_size).is_power_of_two() {
            return Err(mismatch(
                "the heightmap size divided by the grid size has to be a power of two",
            ));
        }

        let depth = (width / grid_size).trailing_zeros();
        let chunk_count = (0..=depth).map(|depth| 1u64 << (2 * depth)).sum::<u64>();
        let chunk_count = u32::try_from(chunk_count)
            .map_err(|_| mismatch("the quadtree would contain too many chunks"))?;

        Ok(Self {
            heightmap_size: width,
            grid_size,
            depth,
            chunk_count,
            terrain_extent: config.terrain_extent,
            max_height: config.max_height,
        })
    }
}

/// The fully built chunk quadtree of a terrain.
///
/// The tree is immutable after it is built and lives as long as its terrain.
/// Each frame it is traversed by [`select_chunks`](crate::selection::select_chunks)
/// to find the chunks that should be rendered.
#[derive(Clone, Debug)]
pub struct TerrainQuadtree {
    pub(crate) root: Chunk,
    pub(crate) layout: TreeLayout,
    pub(crate) perspective_scaling_factor: f32,
    pub(crate) max_screen_space_error: f32,
}

impl TerrainQuadtree {
    /// Builds the quadtree of the heightmap according to the config.
    ///
    /// With `do_preprocessing` enabled, all geometric errors are estimated from the heightmap
    /// and written to the cache (if a `cache_path` is configured).
    /// Otherwise they are loaded from the cache, which has to exist and match the terrain.
    pub fn build(config: &TerrainConfig, heightmap: &Heightmap) -> TerrainResult<Self> {
        let builder = QuadtreeBuilder::new(config, heightmap)?;

        if config.do_preprocessing {
            let quadtree = builder.build(ErrorSource::Compute)?;

            if let Some(cache_path) = &config.cache_path {
                quadtree.error_cache().save(cache_path)?;
            }

            Ok(quadtree)
        } else {
            let cache_path = config.cache_path.as_ref().ok_or_else(|| {
                TerrainError::InvalidConfig(
                    "a cache_path is required when preprocessing is disabled".to_string(),
                )
            })?;

            info!("Loading the geometric errors from {:?}.", cache_path);

            let cache = GeometricErrorCache::load(cache_path)?;
            builder.build(ErrorSource::Cache(cache))
        }
    }

    #[inline]
    pub fn root(&self) -> &Chunk {
        &self.root
    }

    #[inline]
    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    #[inline]
    pub fn chunk_count(&self) -> u32 {
        self.layout.chunk_count
    }

    /// The depth of the leaves, the root has a depth of zero.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.layout.depth
    }

    pub fn leaf_count(&self) -> u32 {
        1 << (2 * self.layout.depth)
    }

    #[inline]
    pub fn perspective_scaling_factor(&self) -> f32 {
        self.perspective_scaling_factor
    }

    #[inline]
    pub fn max_screen_space_error(&self) -> f32 {
        self.max_screen_space_error
    }

    /// All chunks in index order.
    pub fn iter(&self) -> ChunkIter<'_> {
        self.root.iter()
    }

    /// Looks up a chunk by its index.
    pub fn get(&self, index: ChunkIndex) -> Option<&Chunk> {
        let mut chunk = &self.root;

        loop {
            if chunk.index == index {
                return Some(chunk);
            }

            // children are numbered after their parent, in ascending order
            chunk = chunk
                .children()?
                .iter()
                .rev()
                .find(|child| child.index <= index)?;
        }
    }

    /// Looks up the parent of a chunk.
    pub fn parent(&self, index: ChunkIndex) -> Option<&Chunk> {
        self.get(index)?.parent.and_then(|parent| self.get(parent))
    }

    /// The leaf chunk containing the position in the xz-plane.
    pub fn chunk_at(&self, position: Vec2) -> Option<&Chunk> {
        let mut chunk = &self.root;

        if !chunk.footprint.contains(position) {
            return None;
        }

        while let Some(children) = chunk.children() {
            chunk = children
                .iter()
                .find(|child| child.footprint.contains(position))?;
        }

        Some(chunk)
    }

    /// The screen space error in pixels of a chunk viewed from the given distance.
    pub fn screen_space_error(&self, chunk: &Chunk, distance: f32) -> f32 {
        screen_space_error(
            chunk.geometric_error,
            distance,
            self.perspective_scaling_factor,
        )
    }

    /// The geometric errors of all chunks, keyed by their index.
    pub fn geometric_errors(&self) -> BTreeMap<ChunkIndex, f32> {
        self.iter()
            .map(|chunk| (chunk.index, chunk.geometric_error))
            .collect()
    }

    /// Packs the geometric errors into a cache, which can be used to rebuild this quadtree.
    pub fn error_cache(&self) -> GeometricErrorCache {
        GeometricErrorCache::new(self.layout, self.geometric_errors())
    }
}
