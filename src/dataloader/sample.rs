use std::path::Path;

use image::imageops::FilterType;

use super::config::ImageShape;
use super::error::DatasetError;

/// One decoded image, pixels interleaved as height × width × channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    pub pixels: Vec<u8>,
    pub label: usize,
}

impl LabeledSample {
    pub fn pixel_range(&self) -> Option<(u8, u8)> {
        let min = *self.pixels.iter().min()?;
        let max = *self.pixels.iter().max()?;
        Some((min, max))
    }
}

/// Decodes `path` and brings it to `shape`, resizing and converting channels
/// as needed.
pub fn decode_sample(path: &Path, label: usize, shape: ImageShape) -> Result<LabeledSample, DatasetError> {
    let img = image::open(path).map_err(|source| DatasetError::Decode {
        path: path.to_owned(),
        source,
    })?;

    let (width, height) = (shape.width as u32, shape.height as u32);
    let img = if img.width() != width || img.height() != height {
        img.resize_exact(width, height, FilterType::Triangle)
    } else {
        img
    };

    let pixels = match shape.channels {
        1 => img.into_luma8().into_raw(),
        3 => img.into_rgb8().into_raw(),
        4 => img.into_rgba8().into_raw(),
        channels => {
            return Err(DatasetError::UnsupportedImageShape {
                height: shape.height,
                width: shape.width,
                channels,
            })
        }
    };

    Ok(LabeledSample { pixels, label })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn resizes_and_converts_to_requested_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::from_pixel(12, 6, Rgb([200, 10, 30])).save(&path).unwrap();

        let sample = decode_sample(&path, 3, ImageShape::new(4, 4, 1)).unwrap();
        assert_eq!(sample.label, 3);
        assert_eq!(sample.pixels.len(), 16);

        let rgb = decode_sample(&path, 0, ImageShape::new(6, 12, 3)).unwrap();
        assert_eq!(&rgb.pixels[..3], &[200, 10, 30]);
        assert_eq!(rgb.pixel_range(), Some((10, 200)));
    }

    #[test]
    fn garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = decode_sample(&path, 0, ImageShape::new(4, 4, 3)).unwrap_err();
        assert_eq!(err.reason(), "decode");
    }
}
