use thiserror::Error;

/// Bytes per pixel (R, G, B, A)
pub const BYTES_PER_PIXEL: usize = 4;

/// Raw bytes handed to [`PixelBuffer::from_rgba`] don't match the declared size
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Pixel data is {len} bytes, expected {width}x{height}x4")]
pub struct GeometryMismatch {
    pub width: u32,
    pub height: u32,
    pub len: usize,
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Convert a blended channel value back into a byte.
/// Clamps to 0..=255 and rounds half to even, like a clamped byte array.
#[inline]
fn quantize(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// Row-major RGBA pixel buffer.
/// Byte `4 * (y * width + x)` is the red component of pixel (x, y).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a black, fully opaque buffer
    pub fn with_size(width: u32, height: u32) -> Self {
        let mut pixels = vec![0; Self::byte_len(width, height)];
        for alpha in pixels.iter_mut().skip(3).step_by(BYTES_PER_PIXEL) {
            *alpha = 255;
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Wrap raw RGBA bytes. The length must be exactly `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, GeometryMismatch> {
        if data.len() != Self::byte_len(width, height) {
            return Err(GeometryMismatch {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            pixels: data,
            width,
            height,
        })
    }

    /// Build a buffer from a list of RGB triples, alpha set to 255.
    /// Returns `None` if the triple count doesn't match the dimensions.
    pub fn from_rgb_pixels(width: u32, height: u32, colors: &[(u8, u8, u8)]) -> Option<Self> {
        if colors.len() * BYTES_PER_PIXEL != Self::byte_len(width, height) {
            return None;
        }
        let pixels = colors
            .iter()
            .flat_map(|&(r, g, b)| [r, g, b, 255])
            .collect();
        Some(Self {
            pixels,
            width,
            height,
        })
    }

    #[inline]
    fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Bytes per row
    #[inline]
    pub fn row_stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Calculate byte offset for pixel at (x, y)
    #[inline]
    pub fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Read one component byte.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn component(&self, index: usize) -> u8 {
        self.pixels[index]
    }

    /// Write one component, clamping and rounding `value` into a byte.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn set_component(&mut self, index: usize, value: f64) {
        self.pixels[index] = quantize(value);
    }

    /// RGB of the pixel starting at byte `index`
    #[inline]
    pub fn rgb(&self, index: usize) -> (u8, u8, u8) {
        let px = &self.pixels[index..index + 3];
        (px[0], px[1], px[2])
    }

    /// Unweighted R+G+B sum of the pixel starting at byte `index` (0..=765)
    #[inline]
    pub fn brightness(&self, index: usize) -> u16 {
        let (r, g, b) = self.rgb(index);
        r as u16 + g as u16 + b as u16
    }

    /// RGB of pixel (x, y), `None` when outside the buffer
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x < self.width && y < self.height {
            Some(self.rgb(self.pixel_index(x, y)))
        } else {
            None
        }
    }

    /// Set pixel (x, y) to an opaque color. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) {
        if x < self.width && y < self.height {
            let idx = self.pixel_index(x, y);
            self.pixels[idx..idx + 4].copy_from_slice(&[r, g, b, 255]);
        }
    }

    /// Raw bytes for texture upload / encoding
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable access to raw pixels
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Consume the buffer and return its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_size_is_opaque_black() {
        let buf = PixelBuffer::with_size(3, 2);
        assert_eq!(buf.len(), 3 * 2 * 4);
        for px in buf.as_bytes().chunks_exact(4) {
            assert_eq!(px, &[0, 0, 0, 255]);
        }
    }

    #[test]
    fn test_from_rgba_rejects_wrong_length() {
        let err = PixelBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            GeometryMismatch {
                width: 2,
                height: 2,
                len: 15
            }
        );
        assert_eq!(err.to_string(), "Pixel data is 15 bytes, expected 2x2x4");
    }

    #[test]
    fn test_set_component_clamps_and_rounds() {
        let mut buf = PixelBuffer::with_size(1, 1);
        buf.set_component(0, 300.0);
        assert_eq!(buf.component(0), 255);
        buf.set_component(0, -12.0);
        assert_eq!(buf.component(0), 0);
        buf.set_component(0, 10.4);
        assert_eq!(buf.component(0), 10);
        buf.set_component(0, 10.5);
        assert_eq!(buf.component(0), 10);
        buf.set_component(0, 11.5);
        assert_eq!(buf.component(0), 12);
    }

    #[test]
    fn test_brightness_is_plain_sum() {
        let buf = PixelBuffer::from_rgb_pixels(2, 1, &[(10, 20, 30), (255, 255, 255)]).unwrap();
        assert_eq!(buf.brightness(0), 60);
        assert_eq!(buf.brightness(4), 765);
    }

    #[test]
    fn test_pixel_index_row_major() {
        let buf = PixelBuffer::with_size(5, 4);
        assert_eq!(buf.pixel_index(0, 0), 0);
        assert_eq!(buf.pixel_index(1, 0), 4);
        assert_eq!(buf.pixel_index(0, 1), buf.row_stride());
        assert_eq!(buf.pixel_index(4, 3), buf.len() - 4);
    }

    #[test]
    fn test_get_set_pixel_bounds() {
        let mut buf = PixelBuffer::with_size(2, 2);
        buf.set_pixel(1, 1, 9, 8, 7);
        buf.set_pixel(5, 5, 1, 1, 1);
        assert_eq!(buf.get_pixel(1, 1), Some((9, 8, 7)));
        assert_eq!(buf.get_pixel(2, 0), None);
    }

    #[test]
    #[should_panic]
    fn test_component_out_of_range_panics() {
        let buf = PixelBuffer::with_size(1, 1);
        let _ = buf.component(4);
    }
}
