//! Image decoding with format-specific fast paths.
//!
//! JPEG goes through zune-jpeg, HEIC through an external converter, and
//! everything else through the image crate.

use crate::core::scanner::MediaKind;
use crate::error::HashError;
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Decoder that picks the fastest available path per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode an image file.
    ///
    /// - JPEG: zune-jpeg, image crate on failure
    /// - HEIC/HEIF: converted to a temporary JPEG by `sips` (macOS) or
    ///   `heif-convert` (libheif), image crate on failure
    /// - Other formats: image crate
    pub fn decode(path: &Path) -> Result<DynamicImage, HashError> {
        match MediaKind::from_path(path) {
            MediaKind::Jpeg => Self::decode_jpeg(path).or_else(|_| Self::decode_fallback(path)),
            MediaKind::Heic => Self::decode_heic(path).or_else(|_| Self::decode_fallback(path)),
            _ => Self::decode_fallback(path),
        }
    }

    fn decode_jpeg(path: &Path) -> Result<DynamicImage, HashError> {
        let file_bytes = fs::read(path).map_err(|e| HashError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(&file_bytes, options);

        let pixels = decoder.decode().map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: "Failed to get image info".to_string(),
        })?;
        let width = info.width as u32;
        let height = info.height as u32;

        let buffer_error = || HashError::DecodeError {
            path: path.to_path_buf(),
            reason: "Decoded pixel buffer has the wrong size".to_string(),
        };

        match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                Ok(DynamicImage::ImageRgb8(buffer))
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                Ok(DynamicImage::ImageRgba8(buffer))
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(buffer_error)?;
                Ok(DynamicImage::ImageLuma8(buffer))
            }
            _ => Self::decode_fallback(path),
        }
    }

    fn decode_heic(path: &Path) -> Result<DynamicImage, HashError> {
        let decode_error = |reason: String| HashError::DecodeError {
            path: path.to_path_buf(),
            reason,
        };

        let converted = tempfile::Builder::new()
            .prefix("media_archiver_heic_")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| HashError::IoError {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut command = heic_converter(path, converted.path());
        let program = command.get_program().to_string_lossy().into_owned();
        debug!(%program, path = %path.display(), "converting HEIC");

        let output = command
            .output()
            .map_err(|e| decode_error(format!("Failed to run {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(decode_error(format!(
                "{} conversion failed: {}",
                program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // The temporary file is removed when `converted` drops.
        image::open(converted.path())
            .map_err(|e| decode_error(format!("Failed to read converted HEIC: {}", e)))
    }

    fn decode_fallback(path: &Path) -> Result<DynamicImage, HashError> {
        image::open(path).map_err(|e| HashError::DecodeError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[cfg(target_os = "macos")]
fn heic_converter(input: &Path, output: &Path) -> Command {
    let mut command = Command::new("sips");
    command
        .args(["-s", "format", "jpeg"])
        .arg(input)
        .arg("--out")
        .arg(output);
    command
}

#[cfg(not(target_os = "macos"))]
fn heic_converter(input: &Path, output: &Path) -> Command {
    let mut command = Command::new("heif-convert");
    command.arg(input).arg(output);
    command
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use tempfile::TempDir;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(32, 32, |x, y| {
            Rgb([(x * 8) as u8, (y * 8) as u8, 128])
        }))
    }

    #[test]
    fn decodes_jpeg_written_by_image_crate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        gradient().save_with_format(&path, ImageFormat::Jpeg).unwrap();

        let image = FastDecoder::decode(&path).unwrap();
        assert_eq!((image.width(), image.height()), (32, 32));
    }

    #[test]
    fn decodes_png_through_fallback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        gradient().save_with_format(&path, ImageFormat::Png).unwrap();

        let image = FastDecoder::decode(&path).unwrap();
        assert_eq!(image.width(), 32);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"this is not a valid image file").unwrap();

        assert!(FastDecoder::decode(&path).is_err());
    }
}
