//! Host-side image produced by a render pass.

/// Pack 8-bit channels into a `0x00RRGGBB` cell.
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split a `0x00RRGGBB` cell into channels. The top byte is ignored.
pub fn unpack_rgb(cell: u32) -> [u8; 3] {
    [(cell >> 16) as u8, (cell >> 8) as u8, cell as u8]
}

/// Row-major pixel cells, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl PixelBuffer {
    /// Black image of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Cell at column `x`, row `y` (row 0 is the top).
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Resize and clear to black.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, 0);
    }

    /// Expand to tightly packed RGBA8 with opaque alpha.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for cell in &self.pixels {
            let [r, g, b] = unpack_rgb(*cell);
            out.extend_from_slice(&[r, g, b, 255]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        assert_eq!(pack_rgb(0x12, 0x34, 0x56), 0x0012_3456);
        assert_eq!(unpack_rgb(0x0012_3456), [0x12, 0x34, 0x56]);
        assert_eq!(unpack_rgb(0xff00_00ff), [0, 0, 255]);
    }

    #[test]
    fn test_get_is_row_major() {
        let mut image = PixelBuffer::new(3, 2);
        for (i, p) in image.pixels_mut().iter_mut().enumerate() {
            *p = i as u32;
        }
        assert_eq!(image.get(0, 0), Some(0));
        assert_eq!(image.get(2, 0), Some(2));
        assert_eq!(image.get(0, 1), Some(3));
        assert_eq!(image.get(3, 0), None);
        assert_eq!(image.get(0, 2), None);
    }

    #[test]
    fn test_resize_clears() {
        let mut image = PixelBuffer::new(2, 2);
        image.pixels_mut()[0] = 7;
        image.resize(4, 3);
        assert_eq!(image.pixels().len(), 12);
        assert!(image.pixels().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_to_rgba8() {
        let mut image = PixelBuffer::new(2, 1);
        image.pixels_mut()[0] = pack_rgb(255, 0, 0);
        image.pixels_mut()[1] = pack_rgb(0, 128, 64);
        assert_eq!(image.to_rgba8(), vec![255, 0, 0, 255, 0, 128, 64, 255]);
    }
}
