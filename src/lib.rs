//! This crate renders large height-field terrains with a chunked level of detail,
//! driven by the geometric error of every chunk.
//!
//! # Background
//! Even a small terrain with a height map of 1000x1000 pixels would require 1 million vertices
//! to be rendered each frame per view, with a naive approach without any lod strategy.
//! Instead, the terrain is subdivided into a quadtree of chunks, which are all rendered with
//! the same small grid mesh, stretched over their footprint and displaced by their part
//! of the heightmap. Deeper chunks cover less area and thus show more detail.
//!
//! ## How much detail is needed?
//! While the quadtree is built, the geometric error of every chunk is estimated,
//! the largest deviation between its coarse grid and the heightmap.
//! See the [`quadtree`] module for more information.
//! Because this is expensive, the errors are cached on disk and reused by later builds.
//!
//! ## Which chunks are drawn?
//! Each frame and for each view the quadtree is traversed and a chunk is replaced by its
//! children once its error, projected onto the screen, exceeds the tolerated number of pixels.
//! Chunks outside of the view frustum are skipped.
//! See the [`selection`] module for more information.

pub mod config;
pub mod debug;
pub mod error;
pub mod grid;
pub mod heightmap;
pub mod math;
pub mod plugin;
pub mod quadtree;
pub mod selection;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        config::TerrainConfig,
        debug::{camera::DebugCamera, DebugTerrain, TerrainDebugPlugin},
        error::{TerrainError, TerrainResult},
        grid::{grid_mesh, GridMesh},
        heightmap::Heightmap,
        plugin::{Terrain, TerrainPlugin, TerrainView, TerrainViewComponents, TerrainViewState},
        quadtree::{
            Chunk, ChunkDraw, ChunkIndex, ErrorSource, GeometricErrorCache, QuadtreeBuilder,
            TerrainQuadtree,
        },
        selection::{
            select_chunks, select_visible_chunks, ChunkSelection, TerrainViewer, ViewerSnapshot,
        },
    };
}
