use std::time::Duration;

use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};
use sdl2::EventPump;

use super::{interval_for_hz, DisplayError, InputEvent, Key, PixelBuffer, Presenter};

// SDL names packed formats by u32 layout; these are the ones whose bytes in
// memory read R, G, B, A.
#[cfg(target_endian = "little")]
const RGBA_BYTES: PixelFormatEnum = PixelFormatEnum::ABGR8888;
#[cfg(target_endian = "big")]
const RGBA_BYTES: PixelFormatEnum = PixelFormatEnum::RGBA8888;

fn sdl_err(e: impl ToString) -> DisplayError {
    DisplayError::Sdl(e.to_string())
}

/// An SDL window plus its event pump
pub struct SdlWindow {
    canvas: Canvas<Window>,
    event_pump: EventPump,
    refresh: Duration,
}

impl SdlWindow {
    /// Open a resizable window. The refresh interval comes from the current
    /// display mode, or `fallback_hz` when SDL can't report one.
    pub fn open(
        title: &str,
        width: u32,
        height: u32,
        fallback_hz: u32,
    ) -> Result<(Self, TextureCreator<WindowContext>), DisplayError> {
        let sdl_context = sdl2::init().map_err(sdl_err)?;
        let video_subsystem = sdl_context.video().map_err(sdl_err)?;

        let refresh_hz = match video_subsystem.current_display_mode(0) {
            Ok(mode) if mode.refresh_rate > 0 => mode.refresh_rate as u32,
            Ok(_) | Err(_) => {
                tracing::debug!(fallback_hz, "Display refresh rate unknown");
                fallback_hz
            }
        };

        let window = video_subsystem
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(sdl_err)?;

        // No vsync: presentation is paced by the scheduler so passes can run
        // between frames instead of blocking in present()
        let canvas = window.into_canvas().accelerated().build().map_err(sdl_err)?;

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump().map_err(sdl_err)?;

        tracing::info!(width, height, refresh_hz, "Window opened");

        Ok((
            Self {
                canvas,
                event_pump,
                refresh: interval_for_hz(refresh_hz),
            },
            texture_creator,
        ))
    }
}

/// Streaming texture sized to the current image
struct RenderTarget<'a> {
    texture: Texture<'a>,
    width: u32,
    height: u32,
}

/// Window presenter. Borrows the texture creator returned by
/// [`SdlWindow::open`] so the texture can be recreated when the image size
/// changes.
pub struct SdlDisplay<'a> {
    window: SdlWindow,
    texture_creator: &'a TextureCreator<WindowContext>,
    target: Option<RenderTarget<'a>>,
}

impl<'a> SdlDisplay<'a> {
    pub fn new(window: SdlWindow, texture_creator: &'a TextureCreator<WindowContext>) -> Self {
        Self {
            window,
            texture_creator,
            target: None,
        }
    }

    fn target_for(&mut self, width: u32, height: u32) -> Result<&mut RenderTarget<'a>, DisplayError> {
        let stale = self
            .target
            .as_ref()
            .map_or(true, |t| t.width != width || t.height != height);

        if stale {
            let texture = self
                .texture_creator
                .create_texture_streaming(RGBA_BYTES, width, height)
                .map_err(sdl_err)?;
            self.window
                .canvas
                .window_mut()
                .set_size(width, height)
                .map_err(sdl_err)?;
            tracing::debug!(width, height, "Render target resized");
            self.target = Some(RenderTarget {
                texture,
                width,
                height,
            });
        }

        self.target
            .as_mut()
            .ok_or_else(|| DisplayError::Sdl("render target missing".to_string()))
    }
}

impl Presenter for SdlDisplay<'_> {
    fn present(&mut self, buffer: &PixelBuffer) -> Result<(), DisplayError> {
        let target = self.target_for(buffer.width(), buffer.height())?;
        target
            .texture
            .update(None, buffer.as_bytes(), buffer.row_stride())
            .map_err(sdl_err)?;

        // Re-borrow: the texture lives in self.target, the canvas in self.window
        let Some(target) = &self.target else {
            return Ok(());
        };
        self.window
            .canvas
            .copy(&target.texture, None, None)
            .map_err(sdl_err)?;
        self.window.canvas.present();
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();

        for event in self.window.event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => events.push(InputEvent::Quit),
                Event::KeyDown {
                    keycode: Some(k), ..
                } => {
                    if let Some(key) = map_key(k) {
                        events.push(InputEvent::KeyDown(key));
                    }
                }
                Event::Window {
                    win_event: WindowEvent::Resized(w, h),
                    ..
                } => events.push(InputEvent::Resized {
                    width: w.max(0) as u32,
                    height: h.max(0) as u32,
                }),
                _ => {}
            }
        }

        events
    }

    fn refresh_interval(&self) -> Duration {
        self.window.refresh
    }
}

fn map_key(key: Keycode) -> Option<Key> {
    match key {
        Keycode::Up => Some(Key::Up),
        Keycode::Down => Some(Key::Down),
        Keycode::Left => Some(Key::Left),
        Keycode::Right => Some(Key::Right),
        Keycode::V => Some(Key::V),
        Keycode::R => Some(Key::R),
        Keycode::Space => Some(Key::Space),
        Keycode::Escape => Some(Key::Escape),
        _ => None,
    }
}
