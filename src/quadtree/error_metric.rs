use crate::{
    heightmap::{lerp, Heightmap},
    math::TexelRect,
};
use ndarray::Array2;

/// Measures how far the coarse grid of a chunk deviates from the heightmap.
///
/// The grid places `grid_size + 1` vertices per side evenly over the texels of the chunk,
/// each vertex taking the height of the texel it lies on.
/// Every texel which does not coincide with a vertex is compared against the grid surface
/// interpolated at its position: linearly along grid edges, bilinearly inside grid cells.
/// The largest absolute difference, scaled to height units, is the raw error of the chunk.
///
/// Heights are looked up with nearest sampling, while rendering samples bilinearly.
/// The resulting bound is therefore slightly inexact, which is accepted.
///
/// The texel size has to be a multiple of the grid size.
pub(crate) fn chunk_error(
    heightmap: &Heightmap,
    texels: TexelRect,
    grid_size: u32,
    max_height: f32,
) -> f32 {
    debug_assert_eq!(texels.size % grid_size, 0);

    let step = texels.size / grid_size;

    if step <= 1 {
        // every texel is a grid vertex
        return 0.0;
    }

    let vertices = Array2::from_shape_fn(
        (grid_size as usize + 1, grid_size as usize + 1),
        |(j, i)| heightmap.texel(texels.x + i as u32 * step, texels.y + j as u32 * step),
    );
    let vertex = |i: u32, j: u32| vertices[[j as usize, i as usize]];

    let mut max_error: f32 = 0.0;

    for y in 0..=texels.size {
        let (j, fy) = (y / step, y % step);
        let ty = fy as f32 / step as f32;

        for x in 0..=texels.size {
            let (i, fx) = (x / step, x % step);
            let tx = fx as f32 / step as f32;

            let interpolated = match (fx, fy) {
                (0, 0) => continue,
                // on a horizontal grid edge
                (_, 0) => lerp(vertex(i, j), vertex(i + 1, j), tx),
                // on a vertical grid edge
                (0, _) => lerp(vertex(i, j), vertex(i, j + 1), ty),
                _ => lerp(
                    lerp(vertex(i, j), vertex(i + 1, j), tx),
                    lerp(vertex(i, j + 1), vertex(i + 1, j + 1), tx),
                    ty,
                ),
            };

            let height = heightmap.texel(texels.x + x, texels.y + y);
            max_error = max_error.max((interpolated - height).abs());
        }
    }

    max_error * max_height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_surfaces_have_no_error() {
        let heightmap = Heightmap::from_fn(64, 64, |x, y| (x + y) as f32 / 256.0);

        let error = chunk_error(&heightmap, TexelRect::new(0, 0, 32), 4, 100.0);
        assert!(error < 1e-4, "error: {error}");
    }

    #[test]
    fn leaf_resolution_has_no_error() {
        let heightmap = Heightmap::from_fn(16, 16, |x, y| ((x * 7 + y * 13) % 5) as f32 / 5.0);

        assert_eq!(chunk_error(&heightmap, TexelRect::new(0, 0, 16), 16, 10.0), 0.0);
    }

    #[test]
    fn detects_single_spike() {
        // a spike between two grid vertices on a horizontal edge
        let heightmap = Heightmap::from_fn(32, 32, |x, y| if (x, y) == (2, 0) { 1.0 } else { 0.0 });
        assert_eq!(chunk_error(&heightmap, TexelRect::new(0, 0, 16), 4, 50.0), 50.0);

        // a spike inside of a grid cell
        let heightmap = Heightmap::from_fn(32, 32, |x, y| if (x, y) == (6, 5) { 0.5 } else { 0.0 });
        assert_eq!(chunk_error(&heightmap, TexelRect::new(0, 0, 16), 4, 50.0), 25.0);
    }

    #[test]
    fn spike_on_a_vertex_lifts_the_surrounding_grid() {
        let heightmap = Heightmap::from_fn(32, 32, |x, y| if (x, y) == (4, 4) { 1.0 } else { 0.0 });

        // the vertex matches the spike, but the interpolated neighbours deviate by 3/4
        let error = chunk_error(&heightmap, TexelRect::new(0, 0, 16), 4, 1.0);
        assert!((error - 0.75).abs() < 1e-6, "error: {error}");
    }

    #[test]
    fn only_samples_inside_the_chunk() {
        let heightmap = Heightmap::from_fn(64, 64, |x, _| if x > 40 { 1.0 } else { 0.0 });

        assert_eq!(chunk_error(&heightmap, TexelRect::new(0, 0, 32), 4, 1.0), 0.0);
        assert!(chunk_error(&heightmap, TexelRect::new(32, 0, 32), 4, 1.0) > 0.0);
    }
}
