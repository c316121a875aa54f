//! In-memory RGB canvas used to draw placeholder screens.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use crate::error::{HarnessError, HarnessResult};

/// Width and height of one font8x8 glyph at scale 1
pub const GLYPH_SIZE: u32 = 8;

/// A virtual framebuffer for programmatic drawing
///
/// - `fill()` - Fill entire buffer with a color
/// - `draw_rect()` / `stroke_rect()` - Filled or outlined rectangles
/// - `draw_text()` - Text using font8x8 glyphs, scaled by an integer factor
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl Framebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the buffer
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for py in y..y_end {
            for px in x..x_end {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw a rectangle outline `thickness` pixels wide, inside the given bounds
    pub fn stroke_rect(&mut self, x: u32, y: u32, w: u32, h: u32, thickness: u32, color: [u8; 3]) {
        let t = thickness.min(w).min(h);
        self.draw_rect(x, y, w, t, color);
        self.draw_rect(x, (y + h).saturating_sub(t), w, t, color);
        self.draw_rect(x, y, t, h, color);
        self.draw_rect((x + w).saturating_sub(t), y, t, h, color);
    }

    /// Draw text, each glyph `8 * scale` pixels square. Text does not wrap;
    /// the background is left untouched.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, scale: u32, fg: [u8; 3]) {
        let scale = scale.max(1);
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, scale, fg);
            cursor_x = cursor_x.saturating_add(GLYPH_SIZE * scale);
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, scale: u32, fg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            for bit in 0..GLYPH_SIZE {
                // font8x8 stores LSB as leftmost pixel
                if (*row >> bit) & 1 == 1 {
                    self.draw_rect(
                        x + bit * scale,
                        y + row_idx as u32 * scale,
                        scale,
                        scale,
                        fg,
                    );
                }
            }
        }
    }

    /// Pixel width of `text` at `scale`
    pub fn text_width(text: &str, scale: u32) -> u32 {
        text.chars().count() as u32 * GLYPH_SIZE * scale.max(1)
    }

    /// Get the color of a pixel
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = self.offset(x, y);
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.offset(x, y);
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 3
    }

    /// Convert to an image buffer
    pub fn to_image(&self) -> HarnessResult<RgbImage> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| HarnessError::Render("buffer size does not match dimensions".to_string()))
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> HarnessResult<Vec<u8>> {
        let img = self.to_image()?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| HarnessError::Render(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framebuffer_new() {
        let fb = Framebuffer::new(100, 50);
        assert_eq!(fb.width(), 100);
        assert_eq!(fb.height(), 50);
        assert_eq!(fb.get_pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_fill_and_rect() {
        let mut fb = Framebuffer::with_color(50, 50, [10, 20, 30]);
        fb.draw_rect(10, 10, 5, 5, [255, 0, 0]);
        assert_eq!(fb.get_pixel(12, 12), [255, 0, 0]);
        assert_eq!(fb.get_pixel(15, 15), [10, 20, 30]);
        assert_eq!(fb.get_pixel(0, 0), [10, 20, 30]);
    }

    #[test]
    fn test_stroke_rect_leaves_interior() {
        let mut fb = Framebuffer::with_color(100, 100, [255, 255, 255]);
        fb.stroke_rect(10, 10, 50, 50, 3, [0, 0, 255]);
        assert_eq!(fb.get_pixel(10, 10), [0, 0, 255]);
        assert_eq!(fb.get_pixel(59, 59), [0, 0, 255]);
        assert_eq!(fb.get_pixel(35, 35), [255, 255, 255]);
    }

    #[test]
    fn test_draw_text_scaled() {
        let mut fb = Framebuffer::with_color(64, 32, [0, 0, 0]);
        fb.draw_text(0, 0, "A", 2, [255, 255, 255]);
        let lit = (0..16)
            .flat_map(|y| (0..16).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.get_pixel(x, y) == [255, 255, 255])
            .count();
        assert!(lit > 0);
        assert_eq!(Framebuffer::text_width("AB", 2), 32);
    }

    #[test]
    fn test_png_roundtrip() {
        let fb = Framebuffer::with_color(20, 10, [1, 2, 3]);
        let png = fb.to_png().unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (20, 10));
    }
}
