//! Chooses the chunks that are drawn each frame.
//!
//! The quadtree is walked from the root. Chunks whose bounding box lies entirely outside the
//! view frustum are skipped together with their subtree. A visible chunk is expanded into
//! its children while its projected screen space error exceeds the tolerated maximum,
//! which is the case when the viewer is closer than the split distance of the chunk.
//! Otherwise the chunk itself is drawn.
//!
//! Without culling, the drawn chunks cover the footprint of the terrain without gaps or overlaps.

use crate::quadtree::{Chunk, ChunkDraw, ChunkIndex, TerrainQuadtree};
use bevy::{math::Affine3A, prelude::*, render::primitives::Frustum};

/// Read only access to a camera, the only thing the chunk selection needs to know about it.
///
/// All values are expected in the local space of the terrain.
pub trait TerrainViewer {
    fn position(&self) -> Vec3;

    /// Transforms from the local space of the terrain into view space.
    fn view_matrix(&self) -> Mat4;

    /// Transforms from view space into clip space.
    fn projection_matrix(&self) -> Mat4;

    fn frustum(&self) -> Frustum {
        Frustum::from_clip_from_world(&(self.projection_matrix() * self.view_matrix()))
    }
}

/// The state of a viewer captured at one point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerSnapshot {
    pub position: Vec3,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
}

impl ViewerSnapshot {
    /// Creates a snapshot from the transform of the viewer and its projection.
    pub fn new(local_from_view: Mat4, projection_matrix: Mat4) -> Self {
        Self {
            position: local_from_view.w_axis.truncate(),
            view_matrix: local_from_view.inverse(),
            projection_matrix,
        }
    }

    /// A viewer at `position` looking towards `target`.
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3, projection_matrix: Mat4) -> Self {
        let transform = Transform::from_translation(position).looking_at(target, up);

        Self::new(transform.compute_matrix(), projection_matrix)
    }

    /// Captures a camera, given the transform between the view and the terrain.
    pub fn from_camera(local_from_view: &GlobalTransform, camera: &Camera) -> Self {
        Self::new(local_from_view.compute_matrix(), camera.clip_from_view())
    }
}

impl TerrainViewer for ViewerSnapshot {
    #[inline]
    fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    #[inline]
    fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }
}

/// The result of selecting the chunks of a quadtree for one viewer.
///
/// The buffers are reused from frame to frame.
#[derive(Clone, Debug, Default)]
pub struct ChunkSelection {
    draws: Vec<ChunkDraw>,
    expanded: Vec<bool>,
    visited: u32,
    culled: u32,
}

impl ChunkSelection {
    /// The chunks to draw, in the order they were selected.
    #[inline]
    pub fn draws(&self) -> &[ChunkDraw] {
        &self.draws
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Whether the chunk was replaced by its children during the last selection.
    pub fn is_expanded(&self, index: ChunkIndex) -> bool {
        self.expanded.get(index as usize).copied().unwrap_or(false)
    }

    pub fn is_drawn(&self, index: ChunkIndex) -> bool {
        self.draws.iter().any(|draw| draw.index == index)
    }

    pub fn expanded_count(&self) -> usize {
        self.expanded.iter().filter(|&&expanded| expanded).count()
    }

    /// The number of chunks the selection looked at.
    #[inline]
    pub fn visited(&self) -> u32 {
        self.visited
    }

    /// The number of chunks skipped together with their subtree, because they were not visible.
    #[inline]
    pub fn culled(&self) -> u32 {
        self.culled
    }

    fn clear(&mut self, chunk_count: u32) {
        self.draws.clear();
        self.expanded.clear();
        self.expanded.resize(chunk_count as usize, false);
        self.visited = 0;
        self.culled = 0;
    }
}

/// Selects the chunks of the quadtree that should be drawn for the viewer.
///
/// The previous contents of the selection are replaced.
pub fn select_chunks(
    quadtree: &TerrainQuadtree,
    viewer: &impl TerrainViewer,
    selection: &mut ChunkSelection,
) {
    selection.clear(quadtree.chunk_count());

    let position = viewer.position();
    let frustum = viewer.frustum();

    select_chunk(quadtree.root(), position, &frustum, selection);
}

/// Like [`select_chunks`], but allocates a new selection.
pub fn select_visible_chunks(
    quadtree: &TerrainQuadtree,
    viewer: &impl TerrainViewer,
) -> ChunkSelection {
    let mut selection = ChunkSelection::default();
    select_chunks(quadtree, viewer, &mut selection);
    selection
}

fn select_chunk(chunk: &Chunk, position: Vec3, frustum: &Frustum, selection: &mut ChunkSelection) {
    selection.visited += 1;

    if !frustum.intersects_obb(chunk.bounding_box(), &Affine3A::IDENTITY, true, true) {
        selection.culled += 1;
        return;
    }

    // the distance ignores the height of the surface below the chunk center
    let distance = position.distance(chunk.center_position());

    match chunk.children() {
        Some(children) if distance < chunk.split_distance() => {
            selection.expanded[chunk.index() as usize] = true;

            for child in children {
                select_chunk(child, position, frustum, selection);
            }
        }
        _ => selection.draws.push(chunk.draw()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TerrainConfig,
        heightmap::Heightmap,
        quadtree::{ErrorSource, QuadtreeBuilder},
    };

    fn quadtree() -> TerrainQuadtree {
        let config = TerrainConfig {
            grid_size: 4,
            ..default()
        };
        let heightmap = Heightmap::from_fn(32, 32, |x, y| ((x * 17 + y * 31) % 11) as f32 / 11.0);

        QuadtreeBuilder::new(&config, &heightmap)
            .unwrap()
            .build(ErrorSource::Compute)
            .unwrap()
    }

    /// A viewer looking straight down, whose frustum contains the entire terrain.
    ///
    /// The orientation is not derived from a target point, which would coincide with
    /// the position at large heights.
    fn omniscient(position: Vec3) -> ViewerSnapshot {
        let transform = Transform::from_translation(position)
            .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2));

        ViewerSnapshot::new(
            transform.compute_matrix(),
            Mat4::orthographic_rh(-1e5, 1e5, -1e5, 1e5, -1e12, 1e12),
        )
    }

    #[test]
    fn distant_viewer_looks_down() {
        let viewer = omniscient(Vec3::new(0.0, 1e9, 0.0));
        let below = viewer.view_matrix().transform_point3(Vec3::ZERO);

        // the origin lies straight ahead, a billion units away
        assert!(below.xy().length() < 1e3, "{below}");
        assert!((below.z + 1e9).abs() < 1e3, "{below}");
    }

    #[test]
    fn snapshot_inverts_the_view_transform() {
        let viewer = ViewerSnapshot::looking_at(
            Vec3::new(10.0, 20.0, 30.0),
            Vec3::ZERO,
            Vec3::Y,
            Mat4::IDENTITY,
        );

        assert_eq!(viewer.position(), Vec3::new(10.0, 20.0, 30.0));
        let origin = viewer.view_matrix().transform_point3(viewer.position());
        assert!(origin.length() < 1e-4);
    }

    #[test]
    fn distant_viewer_draws_the_root() {
        let quadtree = quadtree();
        let selection = select_visible_chunks(&quadtree, &omniscient(Vec3::new(0.0, 1e9, 0.0)));

        assert_eq!(selection.len(), 1);
        assert_eq!(selection.draws()[0].index, 0);
        assert_eq!(selection.draws()[0].world_transform, quadtree.root().world_transform());
        assert_eq!(selection.expanded_count(), 0);
        assert_eq!(selection.visited(), 1);
        assert_eq!(selection.culled(), 0);
    }

    #[test]
    fn frontier_covers_the_terrain() {
        let quadtree = quadtree();
        let root_area = quadtree.root().footprint().area();

        for position in [
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(-900.0, 50.0, 400.0),
            Vec3::new(2000.0, 300.0, -2000.0),
        ] {
            let selection = select_visible_chunks(&quadtree, &omniscient(position));

            let area: f32 = selection
                .draws()
                .iter()
                .map(|draw| quadtree.get(draw.index).unwrap().footprint().area())
                .sum();
            assert_eq!(area, root_area);

            for draw in selection.draws() {
                assert!(!selection.is_expanded(draw.index));

                // all ancestors of a drawn chunk are expanded
                let mut index = draw.index;
                while let Some(parent) = quadtree.parent(index) {
                    assert!(selection.is_expanded(parent.index()));
                    index = parent.index();
                }
            }
        }
    }

    #[test]
    fn close_viewer_expands_down_to_the_leaves() {
        let quadtree = quadtree();
        let chunk = quadtree.chunk_at(Vec2::new(10.0, 10.0)).unwrap();
        let position = chunk.center_position() + Vec3::Y * 1e-3;

        let selection = select_visible_chunks(&quadtree, &omniscient(position));

        assert!(chunk.is_leaf());
        assert!(selection.is_drawn(chunk.index()));
        assert_eq!(selection.visited(), selection.expanded_count() as u32 * 4 + 1);
    }

    #[test]
    fn selection_is_reused() {
        let quadtree = quadtree();
        let mut selection = ChunkSelection::default();

        select_chunks(&quadtree, &omniscient(Vec3::new(0.0, 1.0, 0.0)), &mut selection);
        assert!(selection.len() > 1);

        select_chunks(&quadtree, &omniscient(Vec3::new(0.0, 1e9, 0.0)), &mut selection);
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.expanded_count(), 0);
        assert!(!selection.is_expanded(quadtree.chunk_count() + 10));
    }
}
