//! Builds the chunk quadtree of a heightmap and draws the selected chunks.
//!
//! Run with `cargo run --example terrain [heightmap] [config.lod.ron]`.
//! Without arguments a procedural heightmap is generated.
//! Press `T` to control the camera, `C`, `B` and `F` toggle the debug views.

use anyhow::Context;
use bevy::prelude::*;
use bevy_terrain_lod::{debug::depth_color, prelude::*};
use std::env;

const HEIGHTMAP_SIZE: u32 = 512;

#[derive(Resource)]
struct ChunkAssets {
    mesh: Handle<Mesh>,
    materials: Vec<Handle<StandardMaterial>>,
}

#[derive(Component)]
struct ChunkMesh;

fn main() -> anyhow::Result<()> {
    let args = env::args().skip(1).collect::<Vec<_>>();

    let terrain = match args.as_slice() {
        [heightmap_path, config_path] => Terrain::load(config_path, heightmap_path)
            .with_context(|| format!("failed to load the terrain {heightmap_path}"))?,
        [] => Terrain::new(TerrainConfig::default(), procedural_heightmap())
            .context("failed to build the procedural terrain")?,
        _ => anyhow::bail!("usage: terrain [<heightmap> <config.lod.ron>]"),
    };

    let mut app = App::new();

    app.add_plugins((DefaultPlugins, TerrainPlugin, TerrainDebugPlugin))
        .insert_resource(ClearColor(Color::srgb(0.05, 0.05, 0.08)))
        .add_systems(Startup, setup)
        .add_systems(Update, sync_chunk_meshes);

    // the terrain is centered at the origin of its transform
    app.world_mut().spawn(terrain);
    app.run();

    Ok(())
}

fn procedural_heightmap() -> Heightmap {
    Heightmap::from_fn(HEIGHTMAP_SIZE, HEIGHTMAP_SIZE, |x, y| {
        let (x, y) = (x as f32 / 64.0, y as f32 / 64.0);

        0.5 + 0.25 * (x.sin() * y.cos()) + 0.1 * (3.1 * x + 1.7 * y).sin() * (2.3 * y).cos()
    })
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    terrains: Query<&Terrain>,
) {
    let Ok(terrain) = terrains.get_single() else {
        return;
    };
    let config = terrain.config();

    commands.insert_resource(ChunkAssets {
        mesh: meshes.add(grid_mesh(config.grid_size)),
        materials: (0..=terrain.quadtree().depth())
            .map(|depth| {
                materials.add(StandardMaterial {
                    base_color: depth_color(depth),
                    perceptual_roughness: 1.0,
                    ..default()
                })
            })
            .collect(),
    });

    commands.spawn((
        TerrainView,
        DebugCamera::default(),
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: config.vertical_fov,
            far: 20.0 * config.terrain_extent,
            ..default()
        }),
        Transform::from_xyz(
            config.terrain_extent,
            config.max_height * 2.0,
            config.terrain_extent,
        )
        .looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            ..default()
        },
        Transform::from_xyz(1.0, 1.0, 0.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Places one entity with the common grid per selected chunk, reusing them between frames.
fn sync_chunk_meshes(
    mut commands: Commands,
    assets: Option<Res<ChunkAssets>>,
    selections: Res<TerrainViewComponents<ChunkSelection>>,
    mut pool: Query<
        (
            &mut Transform,
            &mut MeshMaterial3d<StandardMaterial>,
            &mut Visibility,
        ),
        With<ChunkMesh>,
    >,
) {
    let Some(assets) = assets else {
        return;
    };
    let draws = selections
        .values()
        .next()
        .map(ChunkSelection::draws)
        .unwrap_or_default();

    let material = |draw: &ChunkDraw| {
        assets.materials[(draw.depth as usize).min(assets.materials.len() - 1)].clone()
    };

    let mut pool = pool.iter_mut();

    for draw in draws {
        let transform = Transform::from_matrix(draw.world_transform);

        if let Some((mut pooled_transform, mut pooled_material, mut visibility)) = pool.next() {
            *pooled_transform = transform;
            pooled_material.0 = material(draw);
            *visibility = Visibility::Inherited;
        } else {
            commands.spawn((
                ChunkMesh,
                Mesh3d(assets.mesh.clone()),
                MeshMaterial3d(material(draw)),
                transform,
            ));
        }
    }

    for (_, _, mut visibility) in pool {
        *visibility = Visibility::Hidden;
    }
}
