//! Raw frame to JPEG transform for the transcoding variant
//!
//! The producer sends uncompressed pixels in the payload messages, shaped by
//! the most recent dimensions message. They are encoded once on ingest and
//! the result is shared by every multipart consumer.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};

use crate::error::EncodeError;
use crate::protocol::Dimensions;

/// Layout of raw pixel payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// 4 bytes per pixel, alpha ignored (Android `RGBX_8888` surfaces)
    #[default]
    Rgba8,
    Rgb8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Expected payload size for the given geometry
    pub fn frame_size(self, dims: Dimensions) -> Option<usize> {
        dims.pixel_count()?.checked_mul(self.bytes_per_pixel())
    }
}

/// Turns a raw frame into an encoded still image
pub trait FrameEncoder: Send + Sync + 'static {
    fn encode(&self, raw: &[u8], dims: Dimensions) -> Result<Bytes, EncodeError>;

    /// MIME type of the encoded output
    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }
}

/// JPEG encoder backed by the `image` crate
#[derive(Debug, Clone)]
pub struct JpegFrameEncoder {
    format: PixelFormat,
    quality: u8,
}

impl JpegFrameEncoder {
    pub fn new(format: PixelFormat, quality: u8) -> Self {
        Self {
            format,
            quality: quality.clamp(1, 100),
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(PixelFormat::default(), 80)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, raw: &[u8], dims: Dimensions) -> Result<Bytes, EncodeError> {
        let expected = self
            .format
            .frame_size(dims)
            .ok_or(EncodeError::InvalidGeometry {
                width: dims.width,
                height: dims.height,
            })?;
        if raw.len() != expected {
            return Err(EncodeError::SizeMismatch {
                expected,
                actual: raw.len(),
            });
        }

        let (width, height) = (dims.width as u32, dims.height as u32);
        let mut out = Vec::new();
        let result = {
            let mut encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
            match self.format {
                PixelFormat::Gray8 => {
                    let img = GrayImage::from_raw(width, height, raw.to_vec())
                        .ok_or_else(|| EncodeError::Codec("gray buffer too small".into()))?;
                    encoder.encode_image(&img)
                }
                PixelFormat::Rgb8 => {
                    let img = RgbImage::from_raw(width, height, raw.to_vec())
                        .ok_or_else(|| EncodeError::Codec("rgb buffer too small".into()))?;
                    encoder.encode_image(&img)
                }
                PixelFormat::Rgba8 => {
                    // JPEG has no alpha channel
                    let rgb: Vec<u8> = raw
                        .chunks_exact(4)
                        .flat_map(|px| [px[0], px[1], px[2]])
                        .collect();
                    let img = RgbImage::from_raw(width, height, rgb)
                        .ok_or_else(|| EncodeError::Codec("rgb buffer too small".into()))?;
                    encoder.encode_image(&img)
                }
            }
        };
        result.map_err(|e| EncodeError::Codec(e.to_string()))?;

        Ok(Bytes::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size() {
        let dims = Dimensions::new(4, 2);
        assert_eq!(PixelFormat::Rgba8.frame_size(dims), Some(32));
        assert_eq!(PixelFormat::Rgb8.frame_size(dims), Some(24));
        assert_eq!(PixelFormat::Gray8.frame_size(dims), Some(8));
        assert_eq!(PixelFormat::Rgba8.frame_size(Dimensions::new(0, 2)), None);
    }

    #[test]
    fn test_encode_rgba_jpeg() {
        let encoder = JpegFrameEncoder::default();
        let raw = vec![128u8; 2 * 2 * 4];

        let jpeg = encoder.encode(&raw, Dimensions::new(2, 2)).unwrap();

        // SOI marker
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_encode_gray_jpeg() {
        let encoder = JpegFrameEncoder::new(PixelFormat::Gray8, 90);
        let raw = vec![0u8, 64, 128, 255];

        let jpeg = encoder.encode(&raw, Dimensions::new(2, 2)).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_size_mismatch() {
        let encoder = JpegFrameEncoder::new(PixelFormat::Rgb8, 80);

        let err = encoder.encode(&[0u8; 5], Dimensions::new(2, 2)).unwrap_err();
        assert_eq!(
            err,
            EncodeError::SizeMismatch {
                expected: 12,
                actual: 5
            }
        );
    }

    #[test]
    fn test_invalid_geometry() {
        let encoder = JpegFrameEncoder::default();

        let err = encoder.encode(&[], Dimensions::new(-2, 2)).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(JpegFrameEncoder::new(PixelFormat::Rgb8, 0).quality(), 1);
        assert_eq!(JpegFrameEncoder::new(PixelFormat::Rgb8, 200).quality(), 100);
    }
}
