//! Garment image encoding.
//!
//! The try-on service accepts the garment as a self-contained `data:` URL. Images are
//! re-encoded as JPEG, the same transport format a browser canvas export produces.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

const JPEG_QUALITY: u8 = 92;

/// A garment image encoded as a `data:image/jpeg;base64,...` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarmentImage(String);

impl GarmentImage {
    /// Encode already-decoded pixels.
    pub fn from_image(image: &DynamicImage) -> Result<Self, EncodeError> {
        // JPEG has no alpha channel.
        let rgb = image.to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(EncodeError::Encode)?;

        let payload = base64::engine::general_purpose::STANDARD.encode(&jpeg);
        Ok(Self(format!("data:image/jpeg;base64,{payload}")))
    }

    /// Sniff, decode and re-encode raw uploaded bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodeError> {
        image::guess_format(bytes).map_err(|_| EncodeError::UnsupportedFormat)?;
        let decoded = image::load_from_memory(bytes).map_err(EncodeError::Decode)?;
        Self::from_image(&decoded)
    }

    pub fn as_data_url(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode image as JPEG: {0}")]
    Encode(#[source] image::ImageError),
}
