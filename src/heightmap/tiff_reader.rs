use crate::{
    error::{TerrainError, TerrainResult},
    heightmap::Heightmap,
};
use std::{fs::File, io::BufReader, path::Path};
use tiff::decoder::{Decoder, DecodingResult};

/// Decodes a single channel tiff elevation model.
///
/// Integer samples are normalized by the range of their data type, floating point samples
/// by the minimum and maximum elevation found in the file.
pub(super) fn load_tiff(path: &Path) -> TerrainResult<Heightmap> {
    let file = File::open(path).map_err(TerrainError::io(path))?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    let (width, height) = decoder.dimensions()?;

    let samples = match decoder.read_image()? {
        DecodingResult::U8(data) => {
            normalize_range(data.into_iter().map(f64::from), u8::MAX as f64)
        }
        DecodingResult::U16(data) => {
            normalize_range(data.into_iter().map(f64::from), u16::MAX as f64)
        }
        DecodingResult::U32(data) => {
            normalize_range(data.into_iter().map(f64::from), u32::MAX as f64)
        }
        DecodingResult::U64(data) => {
            normalize_range(data.into_iter().map(|value| value as f64), u64::MAX as f64)
        }
        DecodingResult::F32(data) => normalize_min_max(data.into_iter().map(f64::from)),
        DecodingResult::F64(data) => normalize_min_max(data.into_iter()),
        DecodingResult::I8(data) => normalize_min_max(data.into_iter().map(f64::from)),
        DecodingResult::I16(data) => normalize_min_max(data.into_iter().map(f64::from)),
        DecodingResult::I32(data) => normalize_min_max(data.into_iter().map(f64::from)),
        DecodingResult::I64(data) => normalize_min_max(data.into_iter().map(|value| value as f64)),
    };

    Heightmap::from_samples(width, height, samples).ok_or_else(|| {
        TerrainError::UnsupportedHeightmap(format!(
            "{path:?} has more than one channel, only grayscale elevation models are supported"
        ))
    })
}

fn normalize_range(data: impl Iterator<Item = f64>, max: f64) -> Vec<f32> {
    data.map(|value| (value / max) as f32).collect()
}

fn normalize_min_max(data: impl Iterator<Item = f64>) -> Vec<f32> {
    let data: Vec<f64> = data.collect();

    let (min, max) = data
        .iter()
        .filter(|value| value.is_finite())
        .fold((f64::MAX, f64::MIN), |(min, max), &value| {
            (min.min(value), max.max(value))
        });
    let range = (max - min).max(f64::EPSILON);

    data.into_iter()
        .map(|value| {
            if value.is_finite() {
                ((value - min) / range) as f32
            } else {
                0.0
            }
        })
        .collect()
}

