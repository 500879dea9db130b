mod common;

use bevy::prelude::*;
use bevy_terrain_lod::prelude::*;
use common::{random_heightmap, reference_config, reference_quadtree};

#[test]
fn reference_terrain_has_a_finite_deterministic_tree() {
    let quadtree = reference_quadtree();

    assert_eq!(quadtree.depth(), 4);
    assert_eq!(quadtree.chunk_count(), 1 + 4 + 16 + 64 + 256);
    assert_eq!(quadtree.leaf_count(), 256);
    assert_eq!(quadtree.iter().filter(|chunk| chunk.is_leaf()).count(), 256);

    // every index in [0, chunk_count) exactly once, in pre-order
    let indices = quadtree.iter().map(Chunk::index).collect::<Vec<_>>();
    assert_eq!(indices, (0..quadtree.chunk_count()).collect::<Vec<_>>());

    // leaves stop at a scale to extent ratio of 16 / 256
    for leaf in quadtree.iter().filter(|chunk| chunk.is_leaf()) {
        assert_eq!(leaf.depth(), 4);
        assert_eq!(leaf.scale() / 1024.0, 16.0 / 256.0);
        assert_eq!(leaf.texels().size, 16);
    }

    let rebuilt = reference_quadtree();
    assert_eq!(rebuilt.geometric_errors(), quadtree.geometric_errors());
}

#[test]
fn children_tile_their_parent() {
    let quadtree = reference_quadtree();

    for chunk in quadtree.iter() {
        let Some(children) = chunk.children() else {
            continue;
        };
        let parent = chunk.footprint();

        let area: f32 = children.iter().map(|child| child.footprint().area()).sum();
        assert_eq!(area, parent.area());

        let min = children
            .iter()
            .fold(Vec2::MAX, |min, child| min.min(child.footprint().min()));
        let max = children
            .iter()
            .fold(Vec2::MIN, |max, child| max.max(child.footprint().max()));
        assert_eq!((min, max), (parent.min(), parent.max()));

        // pairwise disjoint interiors
        for (i, a) in children.iter().enumerate() {
            for b in &children[i + 1..] {
                let (a, b) = (a.footprint(), b.footprint());
                let overlap = a.min().max(b.min()) - a.max().min(b.max());
                assert!(overlap.x >= 0.0 || overlap.y >= 0.0);
            }
        }

        for child in children {
            assert_eq!(child.parent(), Some(chunk.index()));
            assert_eq!(child.depth(), chunk.depth() + 1);
        }
    }
}

#[test]
fn errors_never_decrease_towards_the_root() {
    let quadtree = reference_quadtree();

    assert!(quadtree.root().geometric_error() > 0.0);

    for chunk in quadtree.iter() {
        assert!(chunk.geometric_error() >= 0.0);
        assert!(chunk.geometric_error() <= quadtree.root().geometric_error());

        if let Some(children) = chunk.children() {
            for child in children {
                assert!(chunk.geometric_error() >= child.geometric_error());
            }
        } else {
            assert_eq!(chunk.geometric_error(), 0.0);
        }
    }
}

#[test]
fn bounding_boxes_contain_their_subtree() {
    let quadtree = reference_quadtree();

    for chunk in quadtree.iter() {
        let aabb = chunk.bounding_box();
        assert_eq!(aabb.min().y, 0.0);
        assert_eq!(aabb.max().y, 256.0);

        for descendant in chunk.iter() {
            let inner = descendant.bounding_box();
            assert!(inner.min().cmpge(aabb.min()).all());
            assert!(inner.max().cmple(aabb.max()).all());
        }
    }
}

#[test]
fn split_distance_matches_the_screen_space_error() {
    let config = reference_config();
    let quadtree = reference_quadtree();

    for chunk in quadtree.iter().filter(|chunk| !chunk.is_leaf()) {
        let expected = chunk.geometric_error() / config.max_screen_space_error
            * config.perspective_scaling_factor();
        assert!((chunk.split_distance() - expected).abs() <= expected * 1e-5);

        // at the split distance the projected error equals the tolerated maximum
        let error = quadtree.screen_space_error(chunk, chunk.split_distance());
        assert!((error - config.max_screen_space_error).abs() < 1e-5);
    }
}

#[test]
fn chunk_lookups() {
    let quadtree = reference_quadtree();

    for chunk in quadtree.iter() {
        assert_eq!(quadtree.get(chunk.index()).unwrap().index(), chunk.index());
    }
    assert!(quadtree.get(quadtree.chunk_count()).is_none());

    let leaf = quadtree.chunk_at(Vec2::new(1000.0, -1000.0)).unwrap();
    assert!(leaf.is_leaf());
    assert!(leaf.footprint().contains(Vec2::new(1000.0, -1000.0)));
    assert!(quadtree.chunk_at(Vec2::new(1100.0, 0.0)).is_none());

    let parent = quadtree.parent(leaf.index()).unwrap();
    assert!(parent.children().unwrap().iter().any(|child| child.index() == leaf.index()));
}

#[test]
fn rejects_incompatible_heightmaps() {
    let config = reference_config();

    for size in [200, 8, 96] {
        let result = TerrainQuadtree::build(&config, &random_heightmap(size, 1));
        assert!(
            matches!(result, Err(TerrainError::ResolutionMismatch { .. })),
            "size {size}"
        );
    }

    let heightmap = Heightmap::from_fn(256, 128, |_, _| 0.5);
    assert!(matches!(
        TerrainQuadtree::build(&config, &heightmap),
        Err(TerrainError::ResolutionMismatch { .. })
    ));
}

#[test]
fn rejects_invalid_configs() {
    let heightmap = random_heightmap(64, 3);

    let config = TerrainConfig {
        max_screen_space_error: 0.0,
        ..reference_config()
    };
    assert!(matches!(
        TerrainQuadtree::build(&config, &heightmap),
        Err(TerrainError::InvalidConfig(_))
    ));

    // loading from the cache requires to know where it is
    let config = TerrainConfig {
        do_preprocessing: false,
        ..reference_config()
    };
    assert!(matches!(
        TerrainQuadtree::build(&config, &heightmap),
        Err(TerrainError::InvalidConfig(_))
    ));
}
