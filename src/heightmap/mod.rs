//! The heightmap the terrain is displaced with.

mod tiff_reader;

use crate::error::{TerrainError, TerrainResult};
use bevy::{log::info, math::Vec2};
use image::DynamicImage;
use ndarray::Array2;
use std::path::Path;

/// A square grid of normalized height samples in the range `[0, 1]`.
///
/// The heightmap is read only once it is loaded.
/// Samples are addressed with texel coordinates (x to the right, y downwards)
/// or uv coordinates in `[0, 1]`, where the uv `(x, y) / size` corresponds to the texel `(x, y)`.
#[derive(Clone, Debug)]
pub struct Heightmap {
    data: Array2<f32>,
}

impl Heightmap {
    /// Creates a heightmap by evaluating `f(x, y)` for every texel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Self {
        let data = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            f(x as u32, y as u32).clamp(0.0, 1.0)
        });

        Self { data }
    }

    /// Creates a heightmap from row major samples.
    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>) -> Option<Self> {
        let data = Array2::from_shape_vec((height as usize, width as usize), samples).ok()?;

        Some(Self {
            data: data.mapv(|sample| sample.clamp(0.0, 1.0)),
        })
    }

    /// Converts the luminance of the image into heights.
    pub fn from_image(image: &DynamicImage) -> Self {
        let image = image.to_luma16();

        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x, y).0[0] as f32 / u16::MAX as f32
        })
    }

    /// Loads a heightmap from disk.
    ///
    /// Tiff files are decoded directly, so that floating point elevation models are supported,
    /// all other formats go through the `image` crate.
    pub fn load_file<P: AsRef<Path>>(path: P) -> TerrainResult<Self> {
        let path = path.as_ref();

        let is_tiff = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| matches!(extension, "tif" | "tiff"));

        let heightmap = if is_tiff {
            tiff_reader::load_tiff(path)?
        } else {
            let image = image::ImageReader::open(path)
                .map_err(TerrainError::io(path))?
                .with_guessed_format()
                .map_err(TerrainError::io(path))?
                .decode()?;

            Self::from_image(&image)
        };

        info!(
            "Loaded heightmap {:?} with {}x{} texels.",
            path,
            heightmap.width(),
            heightmap.height()
        );

        Ok(heightmap)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }

    /// The sample at the texel coordinate, clamped to the border of the heightmap.
    #[inline]
    pub fn texel(&self, x: u32, y: u32) -> f32 {
        let x = (x as usize).min(self.data.ncols() - 1);
        let y = (y as usize).min(self.data.nrows() - 1);

        self.data[[y, x]]
    }

    /// Looks up the texel closest to the uv coordinate.
    ///
    /// The geometric error estimation samples the heightmap like this.
    pub fn sample_nearest(&self, uv: Vec2) -> f32 {
        let position = self.texel_position(uv).round();

        self.texel(position.x as u32, position.y as u32)
    }

    /// Bilinearly interpolates the four texels surrounding the uv coordinate,
    /// the way the displaced grid is sampled while rendering.
    pub fn sample_bilinear(&self, uv: Vec2) -> f32 {
        let position = self.texel_position(uv);
        let base = position.floor();
        let t = position - base;
        let (x, y) = (base.x as u32, base.y as u32);

        let top = lerp(self.texel(x, y), self.texel(x + 1, y), t.x);
        let bottom = lerp(self.texel(x, y + 1), self.texel(x + 1, y + 1), t.x);

        lerp(top, bottom, t.y)
    }

    fn texel_position(&self, uv: Vec2) -> Vec2 {
        let size = Vec2::new(self.width() as f32, self.height() as f32);

        (uv.clamp(Vec2::ZERO, Vec2::ONE) * size).min(size - 1.0)
    }
}

#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
