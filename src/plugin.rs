use crate::{
    config::TerrainConfig,
    debug::DebugTerrain,
    error::TerrainResult,
    heightmap::Heightmap,
    quadtree::TerrainQuadtree,
    selection::{select_chunks, ChunkSelection, TerrainViewer, ViewerSnapshot},
};
use bevy::{
    prelude::*, render::camera::CameraUpdateSystem, transform::TransformSystem, utils::HashMap,
};
use std::path::Path;

/// Stores a value per terrain and view pair, keyed by `(terrain, view)`.
#[derive(Resource, Deref, DerefMut)]
pub struct TerrainViewComponents<C>(pub HashMap<(Entity, Entity), C>);

impl<C> Default for TerrainViewComponents<C> {
    fn default() -> Self {
        Self(HashMap::default())
    }
}

/// Marks a camera whose view drives the chunk selection of all terrains.
#[derive(Clone, Copy, Default, Component)]
pub struct TerrainView;

/// A terrain entity, owning its heightmap and the chunk quadtree built from it.
///
/// The terrain footprint is centered at the origin of the entity's transform.
#[derive(Component)]
#[require(Transform)]
pub struct Terrain {
    config: TerrainConfig,
    heightmap: Heightmap,
    quadtree: TerrainQuadtree,
}

impl Terrain {
    /// Builds the quadtree of the terrain, see [`TerrainQuadtree::build`].
    ///
    /// A terrain either exists fully built, or not at all.
    pub fn new(config: TerrainConfig, heightmap: Heightmap) -> TerrainResult<Self> {
        let quadtree = TerrainQuadtree::build(&config, &heightmap)?;

        Ok(Self {
            config,
            heightmap,
            quadtree,
        })
    }

    /// Loads the config and the heightmap from disk and builds the terrain.
    pub fn load(
        config_path: impl AsRef<Path>,
        heightmap_path: impl AsRef<Path>,
    ) -> TerrainResult<Self> {
        let config = TerrainConfig::load_file(config_path)?;
        let heightmap = Heightmap::load_file(heightmap_path)?;

        Self::new(config, heightmap)
    }

    #[inline]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    #[inline]
    pub fn heightmap(&self) -> &Heightmap {
        &self.heightmap
    }

    #[inline]
    pub fn quadtree(&self) -> &TerrainQuadtree {
        &self.quadtree
    }

    /// The height of the displaced surface at the local xz position.
    ///
    /// The heightmap is sampled bilinearly, like the grid is displaced while rendering.
    pub fn height_at(&self, position: Vec2) -> f32 {
        let extent = self.config.terrain_extent;
        let uv = (position + extent) / (2.0 * extent);

        self.heightmap.sample_bilinear(uv) * self.config.max_height
    }
}

/// Per view information about a terrain, updated every frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerrainViewState {
    /// The position of the view in the local space of the terrain.
    pub local_position: Vec3,
    /// The height of the terrain surface directly below the view.
    pub height_under_viewer: f32,
}

/// Selects the chunks of every terrain for every terrain view.
pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TerrainViewComponents<ChunkSelection>>()
            .init_resource::<TerrainViewComponents<TerrainViewState>>()
            .add_systems(
                PostUpdate,
                select_terrain_chunks
                    .after(TransformSystem::TransformPropagate)
                    .after(CameraUpdateSystem),
            );
    }
}

pub(crate) fn select_terrain_chunks(
    debug: Option<Res<DebugTerrain>>,
    mut selections: ResMut<TerrainViewComponents<ChunkSelection>>,
    mut view_states: ResMut<TerrainViewComponents<TerrainViewState>>,
    terrains: Query<(Entity, &Terrain, &GlobalTransform)>,
    views: Query<(Entity, &Camera, &GlobalTransform), With<TerrainView>>,
) {
    selections.retain(|&(terrain, view), _| terrains.contains(terrain) && views.contains(view));
    view_states.retain(|&(terrain, view), _| terrains.contains(terrain) && views.contains(view));

    let freeze = debug.is_some_and(|debug| debug.freeze);

    for (terrain_entity, terrain, terrain_transform) in &terrains {
        let terrain_from_world = terrain_transform.affine().inverse();

        for (view_entity, camera, view_transform) in &views {
            let key = (terrain_entity, view_entity);
            let local_from_view =
                GlobalTransform::from(terrain_from_world * view_transform.affine());
            let viewer = ViewerSnapshot::from_camera(&local_from_view, camera);

            let local_position = viewer.position();
            view_states.insert(
                key,
                TerrainViewState {
                    local_position,
                    height_under_viewer: terrain.height_at(local_position.xz()),
                },
            );

            if freeze && selections.contains_key(&key) {
                continue;
            }

            select_chunks(
                terrain.quadtree(),
                &viewer,
                selections.entry(key).or_default(),
            );
        }
    }
}
