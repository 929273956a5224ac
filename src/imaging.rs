//! Image decoding, resizing, and the target-size quality search.
//!
//! The quality search re-encodes a JPEG at decreasing quality levels
//! until the output fits the requested size. Lower quality is assumed
//! to give smaller (or equal) output, which holds for standard lossy
//! encoders. The loop carries an explicit floor so it terminates even
//! on images that never reach the target.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use thiserror::Error;

/// Quality the search starts from, on the encoder's 0-100 scale.
pub const INITIAL_QUALITY: u8 = 80;
/// How much quality drops between attempts.
pub const QUALITY_STEP: u8 = 5;
/// Lowest quality the search will try before giving up and returning
/// the smallest result achieved.
pub const QUALITY_FLOOR: u8 = 5;

/// Errors produced while decoding or encoding images.
#[derive(Debug, Error)]
pub enum ImagingError {
    /// The input bytes are not a decodable image.
    #[error("could not decode image: {0}")]
    Decode(image::ImageError),
    /// JPEG encoding failed.
    #[error("could not encode image: {0}")]
    Encode(image::ImageError),
    /// A numeric input was not usable.
    #[error("invalid target: {0}")]
    InvalidTarget(String),
}

/// Result of a target-size search: the encoded bytes plus the
/// parameters that produced them.
#[derive(Debug)]
pub struct EncodedImage {
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Quality level used for the final encoding.
    pub quality: u8,
    /// Pixel width of the encoded image.
    pub width: u32,
    /// Pixel height of the encoded image.
    pub height: u32,
}

/// Decode an image from raw bytes.
///
/// # Errors
///
/// Returns [`ImagingError::Decode`] for unrecognised or corrupt data.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    image::load_from_memory(bytes).map_err(ImagingError::Decode)
}

/// Encode `img` as JPEG at the given quality.
///
/// # Errors
///
/// Returns [`ImagingError::Encode`] if encoding fails.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImagingError> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    // JPEG has no alpha; encode from RGB8.
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(ImagingError::Encode)?;
    Ok(buf.into_inner())
}

/// Find an encoding of `img` no larger than `target_kb` kilobytes.
///
/// Starts at [`INITIAL_QUALITY`] and steps down by [`QUALITY_STEP`]
/// until the encoded size fits the target. If the target is already
/// met at the initial quality the first encoding is returned as-is.
/// If [`QUALITY_FLOOR`] is reached first, the floor-quality encoding
/// is returned even though it misses the target; the search never
/// loops indefinitely.
///
/// # Errors
///
/// Returns [`ImagingError::InvalidTarget`] for a non-positive target,
/// or an encoding error.
pub fn shrink_to_target(img: &DynamicImage, target_kb: f64) -> Result<EncodedImage, ImagingError> {
    if !target_kb.is_finite() || target_kb <= 0.0 {
        return Err(ImagingError::InvalidTarget(format!(
            "target must be a positive number of kilobytes, got {target_kb}"
        )));
    }

    let mut quality = INITIAL_QUALITY;
    loop {
        let bytes = encode_jpeg(img, quality)?;
        let size_kb = bytes.len() as f64 / 1024.0;
        if size_kb <= target_kb || quality <= QUALITY_FLOOR {
            return Ok(EncodedImage {
                bytes,
                quality,
                width: img.width(),
                height: img.height(),
            });
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(QUALITY_FLOOR);
    }
}

/// Fit `img` into a `max_width` x `max_height` bounding box,
/// preserving aspect ratio. Images already inside the box are returned
/// unchanged rather than upscaled.
#[must_use]
pub fn fit_within(img: &DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    if img.width() <= max_width && img.height() <= max_height {
        return img.clone();
    }
    img.resize(max_width, max_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// A noisy image that compresses progressively worse at higher
    /// quality, giving the search something to chew on.
    fn noisy_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let v = ((x * 7 + y * 13) % 251) as u8;
            *px = Rgb([v, v.wrapping_mul(3), v.wrapping_add(89)]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn generous_target_returns_initial_quality() {
        let img = noisy_image(64, 64);
        let out = shrink_to_target(&img, 10_000.0).expect("search");
        assert_eq!(out.quality, INITIAL_QUALITY);
        assert!(out.bytes.len() as f64 / 1024.0 <= 10_000.0);
    }

    #[test]
    fn impossible_target_stops_at_floor() {
        let img = noisy_image(400, 400);
        // Fraction of a kilobyte: unreachable for any quality.
        let out = shrink_to_target(&img, 0.01).expect("search");
        assert_eq!(out.quality, QUALITY_FLOOR);
    }

    #[test]
    fn achievable_target_is_met() {
        let img = noisy_image(200, 200);
        let full = encode_jpeg(&img, INITIAL_QUALITY).expect("encode");
        let target_kb = (full.len() as f64 / 1024.0) * 0.7;
        let floor = encode_jpeg(&img, QUALITY_FLOOR).expect("encode");
        if (floor.len() as f64 / 1024.0) <= target_kb {
            let out = shrink_to_target(&img, target_kb).expect("search");
            assert!(out.bytes.len() as f64 / 1024.0 <= target_kb);
        }
    }

    #[test]
    fn non_positive_target_is_rejected() {
        let img = noisy_image(8, 8);
        assert!(shrink_to_target(&img, 0.0).is_err());
        assert!(shrink_to_target(&img, -3.0).is_err());
        assert!(shrink_to_target(&img, f64::NAN).is_err());
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        let img = noisy_image(400, 200);
        let out = fit_within(&img, 100, 100);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn fit_never_upscales() {
        let img = noisy_image(50, 40);
        let out = fit_within(&img, 100, 100);
        assert_eq!((out.width(), out.height()), (50, 40));
    }
}
