//! Fixed payloads and images shared by the integration tests

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tryon_overlay::services::encode::GarmentImage;

pub const API_KEY: &str = "test-key";
pub const API_PATH: &str = "/fashn/tryon";
pub const REQUEST_ID: &str = "abc123";
pub const RESULT_URL: &str = "https://out/1.jpg";
pub const ORIGINAL_SRC: &str = "https://shop.example/shirt.jpg";

/// A small striped "garment" picture.
pub fn garment_pixels(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, _| {
        if (x / 4) % 2 == 0 {
            Rgb([20, 60, 160])
        } else {
            Rgb([240, 240, 240])
        }
    });
    DynamicImage::ImageRgb8(img)
}

pub fn garment() -> GarmentImage {
    GarmentImage::from_image(&garment_pixels(32, 32)).expect("fixture garment encodes")
}

pub fn garment_png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    garment_pixels(16, 16)
        .write_to(&mut out, ImageFormat::Png)
        .expect("fixture png encodes");
    out.into_inner()
}
