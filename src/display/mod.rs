pub mod pixel_buffer;
#[cfg(feature = "window")]
mod sdl;

pub use pixel_buffer::PixelBuffer;
#[cfg(feature = "window")]
pub use sdl::{SdlDisplay, SdlWindow};

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

/// Presentation rate used when the host doesn't report one
pub const FALLBACK_REFRESH_HZ: u32 = 60;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("SDL error: {0}")]
    Sdl(String),

    #[error("Failed to write snapshot {path}: {source}")]
    Snapshot {
        path: std::path::PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Keys the effect reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    V,
    R,
    Space,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    KeyDown(Key),
    Resized { width: u32, height: u32 },
}

/// Copies the pixel buffer to a display surface
pub trait Presenter {
    /// Show the buffer as of the last completed pass
    fn present(&mut self, buffer: &PixelBuffer) -> Result<(), DisplayError>;

    /// Pending input (non-blocking)
    fn poll_events(&mut self) -> Vec<InputEvent>;

    /// How often `present` should be called
    fn refresh_interval(&self) -> Duration;
}

/// Interval for a refresh rate in Hz, falling back to 60 Hz for 0
pub fn interval_for_hz(hz: u32) -> Duration {
    let hz = if hz == 0 { FALLBACK_REFRESH_HZ } else { hz };
    Duration::from_nanos(1_000_000_000 / u64::from(hz))
}

/// Presenter without a window: keeps the latest frame so it can be written
/// out at the end of a run
pub struct HeadlessDisplay {
    interval: Duration,
    frames: u64,
    last: Option<PixelBuffer>,
}

impl HeadlessDisplay {
    pub fn new(refresh_hz: u32) -> Self {
        Self {
            interval: interval_for_hz(refresh_hz),
            frames: 0,
            last: None,
        }
    }

    /// Frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&PixelBuffer> {
        self.last.as_ref()
    }

    /// Write the last presented frame as an image (format from extension)
    pub fn save_last_frame(&self, path: &Path) -> Result<bool, DisplayError> {
        let Some(frame) = &self.last else {
            return Ok(false);
        };
        image::save_buffer(
            path,
            frame.as_bytes(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|source| DisplayError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), frames = self.frames, "Snapshot written");
        Ok(true)
    }
}

impl Presenter for HeadlessDisplay {
    fn present(&mut self, buffer: &PixelBuffer) -> Result<(), DisplayError> {
        match &mut self.last {
            Some(last) if last.width() == buffer.width() && last.height() == buffer.height() => {
                last.as_bytes_mut().copy_from_slice(buffer.as_bytes());
            }
            _ => self.last = Some(buffer.clone()),
        }
        self.frames += 1;
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<InputEvent> {
        Vec::new()
    }

    fn refresh_interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_interval_for_hz() {
        assert_eq!(interval_for_hz(50), Duration::from_millis(20));
        assert_eq!(interval_for_hz(0), interval_for_hz(60));
    }

    #[test]
    fn test_headless_keeps_latest_frame() {
        let mut display = HeadlessDisplay::new(60);
        let mut buf = PixelBuffer::with_size(2, 2);
        display.present(&buf).unwrap();
        buf.set_pixel(0, 0, 1, 2, 3);
        display.present(&buf).unwrap();
        assert_eq!(display.frames(), 2);
        assert_eq!(display.last_frame().unwrap().get_pixel(0, 0), Some((1, 2, 3)));

        let tall = PixelBuffer::with_size(1, 4);
        display.present(&tall).unwrap();
        assert_eq!(display.last_frame().unwrap().width(), 1);
    }

    #[test]
    fn test_headless_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.png");
        let mut display = HeadlessDisplay::new(60);
        assert!(!display.save_last_frame(&path).unwrap());

        let mut buf = PixelBuffer::with_size(3, 1);
        buf.set_pixel(2, 0, 200, 100, 50);
        display.present(&buf).unwrap();
        assert!(display.save_last_frame(&path).unwrap());

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (3, 1));
        assert_eq!(back.get_pixel(2, 0).0, [200, 100, 50, 255]);
    }
}
