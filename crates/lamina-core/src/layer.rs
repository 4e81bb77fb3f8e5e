use serde::{Deserialize, Serialize};

/// RGB color of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for LayerColor {
    fn default() -> Self {
        Self {
            r: 128,
            g: 128,
            b: 128,
        }
    }
}

impl LayerColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packs the color into a `u32`. Layer action records carry no payload
    /// bucket, so their color rides in the index entry's slot field.
    pub fn pack(&self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn unpack(v: u32) -> Self {
        Self {
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }

    pub fn to_f32_array(&self, opacity: f32) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            opacity,
        ]
    }
}

/// A drawing layer: a color, a visibility flag, and the ordered list of
/// polygon arena indices it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub color: LayerColor,
    pub visible: bool,
    pub(crate) polys: Vec<u32>,
}

impl Layer {
    pub fn new(color: LayerColor) -> Self {
        Self {
            color,
            visible: true,
            polys: Vec::new(),
        }
    }

    pub fn polygons(&self) -> &[u32] {
        &self.polys
    }

    pub fn polygon_count(&self) -> usize {
        self.polys.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_pack_roundtrip() {
        let c = LayerColor::new(0x12, 0xAB, 0xFE);
        assert_eq!(LayerColor::unpack(c.pack()), c);
        assert_eq!(c.pack(), 0x0012ABFE);
    }
}
