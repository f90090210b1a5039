use super::document::Dimensions;

/// Minimum natural size an image needs before it gets an overlay.
///
/// Filters out icons, spacers and tracking pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePolicy {
    pub min_width: u32,
    pub min_height: u32,
}

impl SizePolicy {
    pub fn new(min_width: u32, min_height: u32) -> Self {
        Self {
            min_width,
            min_height,
        }
    }

    pub fn admits(&self, size: Dimensions) -> bool {
        size.width >= self.min_width && size.height >= self.min_height
    }
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self::new(100, 100)
    }
}
