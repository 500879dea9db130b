//! Pure geometry of the chunk footprints.
//!
//! The terrain lies in the xz-plane, centered at the origin, and covers
//! `[-terrain_extent, terrain_extent]` on both axes.
//! The heightmap is stretched over this area, with the u coordinate following x
//! and the v coordinate following z.

use bevy::{prelude::*, render::primitives::Aabb};

/// The square area of the terrain covered by a chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    /// The center of the footprint in the xz-plane.
    pub center: Vec2,
    /// Half the side length of the footprint.
    pub scale: f32,
}

impl Footprint {
    pub fn new(center: Vec2, scale: f32) -> Self {
        Self { center, scale }
    }

    /// The footprint covering the entire terrain.
    pub fn root(terrain_extent: f32) -> Self {
        Self::new(Vec2::ZERO, terrain_extent)
    }

    #[inline]
    pub fn min(self) -> Vec2 {
        self.center - self.scale
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.center + self.scale
    }

    #[inline]
    pub fn area(self) -> f32 {
        4.0 * self.scale * self.scale
    }

    /// The center at height zero.
    #[inline]
    pub fn position(self) -> Vec3 {
        Vec3::new(self.center.x, 0.0, self.center.y)
    }

    pub fn contains(self, position: Vec2) -> bool {
        let min = self.min();
        let max = self.max();

        position.x >= min.x && position.x <= max.x && position.y >= min.y && position.y <= max.y
    }

    /// Splits the footprint into its four quadrants.
    ///
    /// The order is `(-x, -z)`, `(+x, -z)`, `(-x, +z)`, `(+x, +z)`.
    pub fn quadrants(self) -> [Footprint; 4] {
        let scale = self.scale / 2.0;

        QUADRANTS.map(|offset| Footprint::new(self.center + offset * scale, scale))
    }

    /// Maps the common grid, which spans `[-1, 1]` in x and z, onto the footprint.
    pub fn world_transform(self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.scale, 1.0, self.scale),
            Quat::IDENTITY,
            self.position(),
        )
    }

    /// The part of the heightmap this footprint displaces from.
    pub fn uv_range(self, terrain_extent: f32) -> UvRect {
        let to_uv = |position: Vec2| (position + terrain_extent) / (2.0 * terrain_extent);

        UvRect {
            min: to_uv(self.min()),
            max: to_uv(self.max()),
        }
    }

    /// A box enclosing every possible surface above the footprint.
    pub fn bounding_box(self, max_height: f32) -> Aabb {
        let min = self.min();
        let max = self.max();

        Aabb::from_min_max(
            Vec3::new(min.x, 0.0, min.y),
            Vec3::new(max.x, max_height, max.y),
        )
    }
}

const QUADRANTS: [Vec2; 4] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(1.0, 1.0),
];

/// A rectangle in heightmap uv coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UvRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl UvRect {
    #[inline]
    pub fn size(self) -> Vec2 {
        self.max - self.min
    }

    /// Scale and offset that map the uvs of the common grid onto this rectangle.
    #[inline]
    pub fn scale_offset(self) -> Vec4 {
        self.size().extend(self.min.x).extend(self.min.y)
    }
}

/// A square block of heightmap texels, the integer counterpart of a [`UvRect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexelRect {
    pub x: u32,
    pub y: u32,
    /// The side length in texels.
    pub size: u32,
}

impl TexelRect {
    pub fn new(x: u32, y: u32, size: u32) -> Self {
        Self { x, y, size }
    }

    /// Splits the rectangle in the same order as [`Footprint::quadrants`].
    pub fn quadrants(self) -> [TexelRect; 4] {
        let size = self.size / 2;

        [(0, 0), (1, 0), (0, 1), (1, 1)]
            .map(|(x, y)| TexelRect::new(self.x + x * size, self.y + y * size, size))
    }
}

/// Projects a world space error at the given distance into pixels.
#[inline]
pub fn screen_space_error(
    geometric_error: f32,
    distance: f32,
    perspective_scaling_factor: f32,
) -> f32 {
    geometric_error / distance * perspective_scaling_factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrants_tile_the_parent() {
        let parent = Footprint::new(Vec2::new(256.0, -128.0), 64.0);
        let children = parent.quadrants();

        let area: f32 = children.iter().map(|child| child.area()).sum();
        assert_eq!(area, parent.area());

        let min = children
            .iter()
            .fold(Vec2::MAX, |min, child| min.min(child.min()));
        let max = children
            .iter()
            .fold(Vec2::MIN, |max, child| max.max(child.max()));
        assert_eq!(min, parent.min());
        assert_eq!(max, parent.max());

        // neighbouring quadrants share their edges
        assert_eq!(children[0].max().x, children[1].min().x);
        assert_eq!(children[0].max().y, children[2].min().y);
    }

    #[test]
    fn uv_range_of_root_covers_heightmap() {
        let root = Footprint::root(1024.0);
        let uv = root.uv_range(1024.0);

        assert_eq!(uv.min, Vec2::ZERO);
        assert_eq!(uv.max, Vec2::ONE);

        let quadrant = root.quadrants()[3].uv_range(1024.0);
        assert_eq!(quadrant.min, Vec2::splat(0.5));
        assert_eq!(quadrant.size(), Vec2::splat(0.5));
    }

    #[test]
    fn world_transform_maps_grid_onto_footprint() {
        let footprint = Footprint::new(Vec2::new(100.0, 50.0), 25.0);
        let transform = footprint.world_transform();

        let min = transform.transform_point3(Vec3::new(-1.0, 0.0, -1.0));
        let max = transform.transform_point3(Vec3::new(1.0, 0.0, 1.0));

        assert_eq!(min, Vec3::new(75.0, 0.0, 25.0));
        assert_eq!(max, Vec3::new(125.0, 0.0, 75.0));
    }

    #[test]
    fn bounding_box_spans_height_range() {
        let aabb = Footprint::new(Vec2::ZERO, 10.0).bounding_box(40.0);

        assert_eq!(Vec3::from(aabb.min()), Vec3::new(-10.0, 0.0, -10.0));
        assert_eq!(Vec3::from(aabb.max()), Vec3::new(10.0, 40.0, 10.0));
    }

    #[test]
    fn texel_quadrants_follow_footprint_order() {
        let texels = TexelRect::new(32, 64, 32).quadrants();

        assert_eq!(texels[0], TexelRect::new(32, 64, 16));
        assert_eq!(texels[1], TexelRect::new(48, 64, 16));
        assert_eq!(texels[2], TexelRect::new(32, 80, 16));
        assert_eq!(texels[3], TexelRect::new(48, 80, 16));
    }
}
