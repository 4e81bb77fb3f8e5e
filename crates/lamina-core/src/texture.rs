use serde::{Deserialize, Serialize};

/// A texture asset owned by the document: name, dimensions, and raw pixels.
///
/// `pixel_width` is the byte width of one pixel; the pixel buffer length is
/// always `width * height * pixel_width`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixel_width: u8,
    pub pixels: Vec<u8>,
}

impl TextureInfo {
    pub fn new(name: &str, width: u32, height: u32, pixel_width: u8, pixels: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            pixel_width,
            pixels,
        }
    }

    pub fn pixel_len(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_width as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_len() {
        let t = TextureInfo::new("grass", 4, 2, 3, vec![0; 24]);
        assert_eq!(t.pixel_len(), 24);
        assert_eq!(t.pixels.len(), t.pixel_len());
    }
}
