use crate::{
    config::TerrainConfig,
    error::TerrainResult,
    heightmap::Heightmap,
    math::{Footprint, TexelRect},
    quadtree::{
        error_metric::chunk_error, Chunk, ChunkIndex, GeometricErrorCache, TerrainQuadtree,
        TreeLayout,
    },
};
use bevy::log::info;
use rayon::prelude::*;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};

/// Where the geometric errors of the chunks come from.
pub enum ErrorSource {
    /// Estimate the errors by sampling the heightmap.
    Compute,
    /// Take the errors from a cache created by a previous build of the same terrain.
    Cache(GeometricErrorCache),
}

/// Builds the [`TerrainQuadtree`] of a heightmap.
///
/// The build happens in three passes:
/// 1. The topology is constructed recursively, assigning indices in pre-order and deriving
///    the transform, uv range and bounding box of every chunk from its footprint.
/// 2. The raw error of every chunk is estimated (in parallel) or taken from the cache.
/// 3. The errors are propagated bottom up, so that no chunk has a smaller error than
///    any of its children, and the split distances are derived from them.
pub struct QuadtreeBuilder<'a> {
    config: &'a TerrainConfig,
    heightmap: &'a Heightmap,
    layout: TreeLayout,
}

impl<'a> QuadtreeBuilder<'a> {
    /// Validates the config and checks that the heightmap can be subdivided.
    pub fn new(config: &'a TerrainConfig, heightmap: &'a Heightmap) -> TerrainResult<Self> {
        config.validate()?;
        let layout = TreeLayout::new(config, heightmap)?;

        Ok(Self {
            config,
            heightmap,
            layout,
        })
    }

    #[inline]
    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    pub fn build(&self, source: ErrorSource) -> TerrainResult<TerrainQuadtree> {
        self.build_with_progress(source, |_| {})
    }

    /// Builds the quadtree, reporting the completed fraction of the error estimation.
    pub fn build_with_progress(
        &self,
        source: ErrorSource,
        progress: impl Fn(f64) + Sync,
    ) -> TerrainResult<TerrainQuadtree> {
        let start = Instant::now();

        let mut next_index = 0;
        let mut root = self.build_chunk(
            Footprint::root(self.config.terrain_extent),
            TexelRect::new(0, 0, self.layout.heightmap_size),
            0,
            None,
            &mut next_index,
        );
        debug_assert_eq!(next_index, self.layout.chunk_count);

        let errors = match source {
            ErrorSource::Compute => self.estimate_errors(&root, &progress),
            ErrorSource::Cache(cache) => {
                cache.validate(&self.layout)?;
                cache.errors.into_values().collect()
            }
        };

        let perspective_scaling_factor = self.config.perspective_scaling_factor();
        let max_screen_space_error = self.config.max_screen_space_error;

        propagate_errors(
            &mut root,
            &errors,
            perspective_scaling_factor / max_screen_space_error,
        );

        info!(
            "Built a terrain quadtree with {} chunks and a depth of {} in {:?}.",
            self.layout.chunk_count,
            self.layout.depth,
            start.elapsed()
        );

        Ok(TerrainQuadtree {
            root,
            layout: self.layout,
            perspective_scaling_factor,
            max_screen_space_error,
        })
    }

    fn build_chunk(
        &self,
        footprint: Footprint,
        texels: TexelRect,
        depth: u32,
        parent: Option<ChunkIndex>,
        next_index: &mut ChunkIndex,
    ) -> Chunk {
        let index = *next_index;
        *next_index += 1;

        // stop once the grid samples every texel of the chunk
        let children = (texels.size > self.layout.grid_size).then(|| {
            let footprints = footprint.quadrants();
            let texels = texels.quadrants();

            Box::new([0, 1, 2, 3].map(|quadrant| {
                self.build_chunk(
                    footprints[quadrant],
                    texels[quadrant],
                    depth + 1,
                    Some(index),
                    next_index,
                )
            }))
        });

        let subtree_size = 1 + children
            .iter()
            .flat_map(|children| children.iter())
            .map(|child| child.subtree_size)
            .sum::<u32>();

        Chunk {
            index,
            parent,
            depth,
            footprint,
            texels,
            world_transform: footprint.world_transform(),
            uv_range: footprint.uv_range(self.config.terrain_extent),
            aabb: footprint.bounding_box(self.config.max_height),
            geometric_error: 0.0,
            split_distance: 0.0,
            subtree_size,
            children,
        }
    }

    /// Estimates the raw error of every chunk, indexed by chunk index.
    ///
    /// Leaves render the heightmap at its native resolution and have no error.
    fn estimate_errors(&self, root: &Chunk, progress: &(impl Fn(f64) + Sync)) -> Vec<f32> {
        let branches = root
            .iter()
            .filter(|chunk| !chunk.is_leaf())
            .collect::<Vec<_>>();
        let completed = AtomicUsize::new(0);

        let raw_errors = branches
            .par_iter()
            .map(|chunk| {
                let error = chunk_error(
                    self.heightmap,
                    chunk.texels,
                    self.layout.grid_size,
                    self.config.max_height,
                );

                let completed = completed.fetch_add(1, Ordering::Relaxed) + 1;
                progress(completed as f64 / branches.len() as f64);

                (chunk.index, error)
            })
            .collect::<Vec<_>>();

        let mut errors = vec![0.0; self.layout.chunk_count as usize];

        for (index, error) in raw_errors {
            errors[index as usize] = error;
        }

        errors
    }
}

/// Accumulates the errors bottom up and derives the split distances.
///
/// Returns the final error of the chunk.
fn propagate_errors(chunk: &mut Chunk, errors: &[f32], distance_per_error: f32) -> f32 {
    let mut error = errors[chunk.index as usize];

    if let Some(children) = &mut chunk.children {
        for child in children.iter_mut() {
            error = error.max(propagate_errors(child, errors, distance_per_error));
        }
    }

    chunk.geometric_error = error;
    chunk.split_distance = error * distance_per_error;

    error
}
