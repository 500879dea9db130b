//! Contains a debug resource and systems controlling it to visualize the chunk selection.
use crate::{
    debug::camera::debug_camera_control,
    plugin::{select_terrain_chunks, Terrain, TerrainViewComponents},
    selection::ChunkSelection,
};
use bevy::prelude::*;

pub mod camera;

/// Adds a terrain debug config, a debug camera and debug control systems.
pub struct TerrainDebugPlugin;

impl Plugin for TerrainDebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugTerrain>()
            .add_systems(Update, (debug_camera_control, toggle_debug))
            .add_systems(
                PostUpdate,
                (draw_selected_chunks, log_selection_changes).after(select_terrain_chunks),
            );
    }
}

#[derive(Clone, Debug, Resource)]
pub struct DebugTerrain {
    /// Outlines the footprint of every drawn chunk.
    pub show_chunks: bool,
    /// Draws the bounding boxes used for culling.
    pub show_bounds: bool,
    /// Keeps the current selection, so that it can be inspected from a different angle.
    pub freeze: bool,
}

impl Default for DebugTerrain {
    fn default() -> Self {
        Self {
            show_chunks: true,
            show_bounds: false,
            freeze: false,
        }
    }
}

pub fn toggle_debug(input: Res<ButtonInput<KeyCode>>, mut debug: ResMut<DebugTerrain>) {
    if input.just_pressed(KeyCode::KeyC) {
        debug.show_chunks = !debug.show_chunks;
        println!(
            "Toggled the chunk view {}.",
            if debug.show_chunks { "on" } else { "off" }
        )
    }
    if input.just_pressed(KeyCode::KeyB) {
        debug.show_bounds = !debug.show_bounds;
        println!(
            "Toggled the bounding box view {}.",
            if debug.show_bounds { "on" } else { "off" }
        )
    }
    if input.just_pressed(KeyCode::KeyF) {
        debug.freeze = !debug.freeze;
        println!(
            "{} the chunk selection.",
            if debug.freeze { "Froze" } else { "Unfroze" }
        )
    }
}

/// A distinct color per quadtree depth.
pub fn depth_color(depth: u32) -> Color {
    Color::hsl((depth as f32 * 67.0) % 360.0, 0.9, 0.55)
}

pub(crate) fn draw_selected_chunks(
    mut gizmos: Gizmos,
    debug: Res<DebugTerrain>,
    selections: Res<TerrainViewComponents<ChunkSelection>>,
    terrains: Query<(&Terrain, &GlobalTransform)>,
) {
    if !debug.show_chunks && !debug.show_bounds {
        return;
    }

    for (&(terrain, _view), selection) in selections.iter() {
        let Ok((terrain, transform)) = terrains.get(terrain) else {
            continue;
        };

        for draw in selection.draws() {
            let Some(chunk) = terrain.quadtree().get(draw.index) else {
                continue;
            };
            let color = depth_color(chunk.depth());

            if debug.show_chunks {
                let (min, max) = (chunk.footprint().min(), chunk.footprint().max());

                gizmos.linestrip(
                    [
                        Vec3::new(min.x, 0.0, min.y),
                        Vec3::new(max.x, 0.0, min.y),
                        Vec3::new(max.x, 0.0, max.y),
                        Vec3::new(min.x, 0.0, max.y),
                        Vec3::new(min.x, 0.0, min.y),
                    ]
                    .map(|corner| transform.transform_point(corner)),
                    color,
                );
            }

            if debug.show_bounds {
                let aabb = chunk.bounding_box();
                let local = Transform::from_translation(aabb.center.into())
                    .with_scale(Vec3::from(aabb.half_extents) * 2.0);

                gizmos.cuboid(transform.mul_transform(local), color);
            }
        }
    }
}

pub(crate) fn log_selection_changes(
    selections: Res<TerrainViewComponents<ChunkSelection>>,
    mut counts: Local<Vec<usize>>,
) {
    let current = selections
        .values()
        .map(ChunkSelection::len)
        .collect::<Vec<_>>();

    if *counts != current {
        for selection in selections.values() {
            debug!(
                "Selected {} chunks, expanded {}, visited {} and culled {}.",
                selection.len(),
                selection.expanded_count(),
                selection.visited(),
                selection.culled()
            );
        }

        *counts = current;
    }
}
