#![allow(dead_code)]

use bevy_terrain_lod::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A rolling heightmap: random coarse control points, bilinearly interpolated,
/// with a little noise on top.
pub fn random_heightmap(size: u32, seed: u64) -> Heightmap {
    let mut rng = StdRng::seed_from_u64(seed);

    const CONTROL: usize = 9;
    let control = (0..CONTROL * CONTROL)
        .map(|_| rng.random::<f32>())
        .collect::<Vec<_>>();
    let noise = (0..size * size)
        .map(|_| rng.random_range(-0.02..0.02))
        .collect::<Vec<f32>>();

    Heightmap::from_fn(size, size, |x, y| {
        let fx = x as f32 / size as f32 * (CONTROL - 1) as f32;
        let fy = y as f32 / size as f32 * (CONTROL - 1) as f32;
        let (i, j) = (fx as usize, fy as usize);
        let (tx, ty) = (fx.fract(), fy.fract());

        let at = |i: usize, j: usize| control[j.min(CONTROL - 1) * CONTROL + i.min(CONTROL - 1)];
        let top = at(i, j) * (1.0 - tx) + at(i + 1, j) * tx;
        let bottom = at(i, j + 1) * (1.0 - tx) + at(i + 1, j + 1) * tx;

        0.1 + 0.8 * (top * (1.0 - ty) + bottom * ty) + noise[(y * size + x) as usize]
    })
}

/// The configuration of the reference terrain, a 256x256 heightmap rendered with a grid of 16.
pub fn reference_config() -> TerrainConfig {
    TerrainConfig {
        terrain_extent: 1024.0,
        max_height: 256.0,
        grid_size: 16,
        max_screen_space_error: 0.075,
        viewport_height: 768.0,
        vertical_fov: std::f32::consts::FRAC_PI_4,
        do_preprocessing: true,
        cache_path: None,
    }
}

pub fn reference_quadtree() -> TerrainQuadtree {
    TerrainQuadtree::build(&reference_config(), &random_heightmap(256, 42)).unwrap()
}
